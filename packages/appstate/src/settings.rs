//! Where and how records are stored.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use appstate_core::Format;
use serde::{Deserialize, Serialize};

use crate::{Result, StoreError};

/// Environment variable overriding the config directory.
pub const DIR_ENV: &str = "APPSTATE_DIR";

/// Environment variable overriding the active format.
pub const FORMAT_ENV: &str = "APPSTATE_FORMAT";

/// The structured encoding records are saved in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageFormat {
    #[default]
    Text,
    Binary,
}

impl StorageFormat {
    /// Container file name inside the config directory.
    pub fn file_name(self) -> &'static str {
        match self {
            StorageFormat::Text => "config.vdf",
            StorageFormat::Binary => "config.dmx",
        }
    }

    pub fn other(self) -> Self {
        match self {
            StorageFormat::Text => StorageFormat::Binary,
            StorageFormat::Binary => StorageFormat::Text,
        }
    }

    pub fn format(self) -> Format {
        match self {
            StorageFormat::Text => Format::TEXT,
            StorageFormat::Binary => Format::BINARY,
        }
    }
}

impl fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageFormat::Text => f.write_str("text"),
            StorageFormat::Binary => f.write_str("binary"),
        }
    }
}

impl FromStr for StorageFormat {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "vdf" => Ok(StorageFormat::Text),
            "binary" | "dmx" => Ok(StorageFormat::Binary),
            other => Err(StoreError::Setting {
                name: "format".to_string(),
                message: format!("expected \"text\" or \"binary\", got {:?}", other),
            }),
        }
    }
}

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding the container files.
    pub dir: PathBuf,
    /// Format new data is written in.
    #[serde(default)]
    pub format: StorageFormat,
    /// Legacy INI file. Defaults to `config.ini` in `dir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_file: Option<PathBuf>,
}

impl Settings {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            format: StorageFormat::default(),
            legacy_file: None,
        }
    }

    pub fn with_format(mut self, format: StorageFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_legacy_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.legacy_file = Some(path.into());
        self
    }

    /// Defaults overridden by the `APPSTATE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let dir = match lookup(DIR_ENV).filter(|d| !d.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => default_dir(),
        };
        let format = match lookup(FORMAT_ENV).filter(|f| !f.is_empty()) {
            Some(f) => f.parse()?,
            None => StorageFormat::default(),
        };
        Ok(Self::new(dir).with_format(format))
    }

    pub fn path_for(&self, format: StorageFormat) -> PathBuf {
        self.dir.join(format.file_name())
    }

    pub fn active_path(&self) -> PathBuf {
        self.path_for(self.format)
    }

    pub fn legacy_path(&self) -> PathBuf {
        match &self.legacy_file {
            Some(path) => path.clone(),
            None => self.dir.join("config.ini"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn default_dir() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("appstate"),
        None => {
            tracing::warn!("No user config directory; storing state in the working directory");
            PathBuf::from(".")
        }
    }
}
