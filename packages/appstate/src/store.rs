//! The on-disk record store.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::{fs, io};

use appstate_core::Record;
use appstate_element::Element;
use appstate_kv::Property;
use appstate_legacy::LegacyConfig;

use crate::dispatcher::{Dispatcher, LoadReport, RecordStatus};
use crate::records::default_registry;
use crate::registry::Registry;
use crate::settings::{Settings, StorageFormat};
use crate::{Result, StoreError};

/// Persisted application state.
///
/// Opening reads the active container, then the other format's container
/// for anything still missing, then migrates whatever remains from the
/// legacy configuration. Saving always writes the active container whole.
pub struct StateStore {
    settings: Settings,
    dispatcher: Dispatcher,
    report: LoadReport,
}

enum Container {
    Text(Property),
    Binary(Element),
}

fn read_container(path: &Path, format: StorageFormat) -> Result<Option<Container>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    tracing::debug!("Reading {}...", path.display());

    let container = match format {
        StorageFormat::Text => {
            let text = String::from_utf8(data).map_err(|e| StoreError::Container {
                path: path.to_path_buf(),
                source: appstate_core::Error::malformed(format.format(), e.to_string()),
            })?;
            Property::parse(&text).map(Container::Text)
        }
        StorageFormat::Binary => appstate_element::decode(&data).map(Container::Binary),
    };
    container
        .map(Some)
        .map_err(|source| StoreError::Container {
            path: path.to_path_buf(),
            source,
        })
}

/// Replace `path` with `data` without leaving a partial file behind.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let err = |source: io::Error| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(err)?;

    tracing::debug!("Writing {}...", path.display());
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(err)?;
    file.write_all(data).map_err(err)?;
    file.as_file().sync_all().map_err(err)?;
    file.persist(path).map_err(|e| err(e.error))?;
    Ok(())
}

impl StateStore {
    /// Open with every built-in record type registered.
    pub fn open(settings: Settings) -> Result<Self> {
        Self::open_with(settings, default_registry()?)
    }

    pub fn open_with(settings: Settings, registry: Registry) -> Result<Self> {
        let mut dispatcher = Dispatcher::new(registry);
        let mut report = LoadReport::default();

        for format in [settings.format, settings.format.other()] {
            if !dispatcher.has_unloaded() {
                break;
            }
            let path = settings.path_for(format);
            match read_container(&path, format)? {
                Some(Container::Text(root)) => report.merge(dispatcher.load_text(&root)),
                Some(Container::Binary(root)) => report.merge(dispatcher.load_binary(&root)),
                None => {}
            }
        }

        if dispatcher.has_unloaded() {
            let legacy = LegacyConfig::load(&settings.legacy_path());
            report.merge(dispatcher.load_legacy(&legacy));
        }

        for (name, error) in &report.failed {
            tracing::warn!("{} is unavailable: {}", name, error);
        }
        if !report.migrated.is_empty() {
            tracing::info!("Migrated from legacy configuration: {}", report.migrated.join(", "));
        }

        Ok(Self {
            settings,
            dispatcher,
            report,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// What happened while opening.
    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn status(&self) -> Vec<(&'static str, RecordStatus)> {
        self.dispatcher.status()
    }

    pub fn load<R: Record>(&self) -> Result<Arc<R>> {
        self.dispatcher.get::<R>()
    }

    pub fn load_keyed<R: Record>(&self, key: &str) -> Result<Arc<R>> {
        self.dispatcher.get_keyed::<R>(key)
    }

    pub fn keys<R: Record>(&self) -> Result<Vec<String>> {
        self.dispatcher.keys::<R>()
    }

    /// Replace a record and persist the active container.
    pub fn save<R: Record>(&mut self, record: R) -> Result<()> {
        self.dispatcher.update(record)?;
        self.flush()
    }

    pub fn save_keyed<R: Record>(&mut self, key: &str, record: R) -> Result<()> {
        self.dispatcher.update_keyed(key, record)?;
        self.flush()
    }

    /// Replace a record in memory only.
    pub fn stage<R: Record>(&mut self, record: R) -> Result<()> {
        self.dispatcher.update(record)
    }

    /// Write every record to the active container.
    pub fn flush(&mut self) -> Result<()> {
        let path = self.settings.active_path();
        let data = match self.settings.format {
            StorageFormat::Text => self.dispatcher.export_text().serialize().into_bytes(),
            StorageFormat::Binary => appstate_element::encode(&self.dispatcher.export_binary())?.to_vec(),
        };
        write_atomic(&path, &data)?;
        self.dispatcher.mark_saved();
        Ok(())
    }

    /// Switch the active format and write everything in it.
    ///
    /// The old container is left in place.
    pub fn convert(&mut self, format: StorageFormat) -> Result<()> {
        if format != self.settings.format {
            tracing::info!("Converting state from {} to {}", self.settings.format, format);
        }
        self.settings.format = format;
        self.flush()
    }

    pub fn dump_json(&self) -> Result<serde_json::Value> {
        self.dispatcher.to_json()
    }

    pub fn record_json(&self, name: &str) -> Result<serde_json::Value> {
        self.dispatcher.record_json(name)
    }
}
