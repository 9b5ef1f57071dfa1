//! Well-known identifiers.

use appstate_core::Identifier;

/// The empty palette.
pub const UUID_BLANK: Identifier = Identifier::from_u128(0);

/// The placeholder palette used while exporting.
pub const UUID_EXPORT: Identifier = Identifier::from_u128(1);

/// The built-in Portal 2 palette, selected by default.
pub const UUID_PORTAL2: Identifier = Identifier::from_u128(2);

/// Built-in palettes that can never be hidden.
pub const PALETTE_FORCE_SHOWN: &[Identifier] = &[UUID_PORTAL2];
