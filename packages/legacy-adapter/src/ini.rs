//! INI parsing.

use std::collections::BTreeMap;
use std::{fs, io, path};

use appstate_core::{Error, Format, LegacySource};

/// A parsed legacy INI file.
///
/// Section names are exact; keys are case-insensitive, matching how the
/// legacy application wrote and read them. Parsing never fails: lines that
/// cannot be understood are skipped with a warning, because a broken legacy
/// file must degrade to defaults rather than block migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyConfig {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl LegacyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse INI text.
    pub fn parse(text: &str) -> Self {
        let mut conf = Self::new();
        let mut current: Option<String> = None;

        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                match rest.strip_suffix(']') {
                    Some(name) if !name.trim().is_empty() => {
                        let name = name.trim().to_string();
                        conf.sections.entry(name.clone()).or_default();
                        current = Some(name);
                    }
                    _ => {
                        tracing::warn!(line = i + 1, "ignoring malformed legacy section header");
                        current = None;
                    }
                }
                continue;
            }

            let Some((key, value)) = split_entry(line) else {
                tracing::warn!(line = i + 1, "ignoring legacy line without '=' or ':'");
                continue;
            };
            let Some(section) = &current else {
                tracing::warn!(line = i + 1, key, "ignoring legacy key outside any section");
                continue;
            };
            conf.sections
                .entry(section.clone())
                .or_default()
                .insert(key.to_ascii_lowercase(), value.to_string());
        }

        conf
    }

    /// Read and parse a legacy file.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    pub fn read(path: &path::Path) -> appstate_core::Result<Option<Self>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!("Reading legacy config {}...", path.display());
        let text = String::from_utf8(bytes).map_err(|e| {
            Error::malformed(Format::LEGACY, format!("not valid UTF-8: {}", e.utf8_error()))
        })?;
        Ok(Some(Self::parse(&text)))
    }

    /// Read a legacy file, treating every failure as an empty configuration.
    pub fn load(path: &path::Path) -> Self {
        match Self::read(path) {
            Ok(Some(conf)) => conf,
            Ok(None) => {
                tracing::debug!("No legacy config at {}", path.display());
                Self::new()
            }
            Err(e) => {
                tracing::warn!("Could not read legacy config {}: {}", path.display(), e);
                Self::new()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(BTreeMap::is_empty)
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}

/// Split `key = value` or `key: value`, whichever delimiter comes first.
fn split_entry(line: &str) -> Option<(&str, &str)> {
    let pos = line.find(['=', ':'])?;
    let key = line[..pos].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, line[pos + 1..].trim()))
}

impl LegacySource for LegacyConfig {
    fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)?
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }
}
