//! Record types persisted by this application.

mod palette;

pub use palette::PaletteState;

use crate::{Registry, Result};

/// A registry holding every record type this application persists.
pub fn default_registry() -> Result<Registry> {
    let mut registry = Registry::new();
    registry.register::<PaletteState>()?;
    Ok(registry)
}
