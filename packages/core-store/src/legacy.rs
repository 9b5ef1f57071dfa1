//! The read-only view of the legacy flat configuration.

use std::collections::BTreeMap;

use crate::conv::parse_bool;

/// A flat key/value store organised into named sections.
///
/// This is what `Record::from_legacy` reads during migration. It is handed
/// down explicitly; nothing here reaches for a global configuration.
pub trait LegacySource {
    /// The raw string stored at `section`/`key`.
    fn get(&self, section: &str, key: &str) -> Option<&str>;

    /// Read a boolean.
    ///
    /// Returns `None` if the key is missing or the value is not a recognised
    /// boolean spelling.
    fn get_bool(&self, section: &str, key: &str) -> Option<bool> {
        self.get(section, key).and_then(parse_bool)
    }
}

impl<T: LegacySource + ?Sized> LegacySource for &T {
    fn get(&self, section: &str, key: &str) -> Option<&str> {
        (**self).get(section, key)
    }
}

/// A legacy source with no values at all.
///
/// Used when no legacy configuration exists on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySource;

impl LegacySource for EmptySource {
    fn get(&self, _section: &str, _key: &str) -> Option<&str> {
        None
    }
}

/// `(section, key) -> value` maps work as sources, which keeps tests short.
impl LegacySource for BTreeMap<(String, String), String> {
    fn get(&self, section: &str, key: &str) -> Option<&str> {
        BTreeMap::get(self, &(section.to_string(), key.to_string())).map(String::as_str)
    }
}
