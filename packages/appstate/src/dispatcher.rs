//! Routing records between containers and record types.
//!
//! A container is one whole file: a text property tree or a binary element
//! graph with one block (or element) per record type, named after the record.
//! Each block carries the version it was written with under `_version`.
//! Record types that use sub-keys nest one child block per sub-key.
//!
//! The dispatcher owns the in-memory records. Every record type moves from
//! unloaded to loaded exactly once, from whichever source has it first;
//! after that only explicit replacement changes it.

use std::collections::BTreeMap;
use std::sync::Arc;

use appstate_core::{conv, Error, LegacySource, Node, Record, SchemaVersion, Value};
use appstate_element::{Attribute, Element};
use appstate_kv::Property;

use crate::registry::{AnyRecord, RecordKind, Registry};
use crate::{Result, StoreError};

/// Key of the version field inside every record block.
pub const VERSION_KEY: &str = "_version";

/// Name of the root element of a binary container.
pub const BINARY_ROOT: &str = "AppState";

/// Class given to every element the dispatcher writes.
pub const ELEMENT_CLASS: &str = "DmElement";

/// Container data of a record that failed to load.
#[derive(Clone, Debug)]
enum Preserved {
    Text(Property),
    Binary(Element),
}

enum Slot {
    Unloaded,
    /// Loading failed; the raw block is written back on save.
    Failed {
        error: Arc<Error>,
        raw: Preserved,
    },
    Loaded {
        records: BTreeMap<String, AnyRecord>,
        pending_migration: bool,
    },
}

/// What happened to each record type during a load step.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Parsed from a structured container.
    pub loaded: Vec<&'static str>,
    /// Built from the legacy configuration.
    pub migrated: Vec<&'static str>,
    pub failed: Vec<(&'static str, Arc<Error>)>,
}

impl LoadReport {
    pub fn merge(&mut self, other: LoadReport) {
        self.loaded.extend(other.loaded);
        self.migrated.extend(other.migrated);
        self.failed.extend(other.failed);
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Where a loaded record type stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    Unloaded,
    /// Loaded from a structured container.
    Loaded,
    /// Migrated from the legacy configuration and not yet saved.
    PendingMigration,
    Failed(String),
}

/// Owns every record and moves them between containers.
pub struct Dispatcher {
    registry: Registry,
    slots: Vec<Slot>,
}

fn text_version(kind: &dyn RecordKind, block: &Property) -> std::result::Result<SchemaVersion, Error> {
    let Some(value) = block.get(VERSION_KEY) else {
        return Ok(SchemaVersion::V1);
    };
    let raw = value.as_str().unwrap_or_default();
    conv::parse_int(raw)
        .and_then(SchemaVersion::from_raw)
        .filter(|v| *v <= kind.version())
        .ok_or_else(|| Error::UnknownVersion {
            record: kind.name(),
            found: raw.to_string(),
            newest: kind.version(),
        })
}

fn binary_version(kind: &dyn RecordKind, elem: &Element) -> std::result::Result<SchemaVersion, Error> {
    let found = match elem.get(VERSION_KEY) {
        None => return Ok(SchemaVersion::V1),
        Some(Value::Integer(i)) => {
            if let Some(v) = SchemaVersion::from_raw(*i).filter(|v| *v <= kind.version()) {
                return Ok(v);
            }
            i.to_string()
        }
        Some(other) => format!("<{}>", other.kind()),
    };
    Err(Error::UnknownVersion {
        record: kind.name(),
        found,
        newest: kind.version(),
    })
}

fn parse_text_block(
    kind: &dyn RecordKind,
    block: &Property,
) -> std::result::Result<BTreeMap<String, AnyRecord>, Error> {
    let version = text_version(kind, block)?;
    let mut records = BTreeMap::new();
    if kind.uses_id() {
        for child in block.children().iter().filter(|c| c.is_block()) {
            records.insert(child.name().to_string(), kind.parse_text(child, version)?);
        }
    } else {
        records.insert(String::new(), kind.parse_text(block, version)?);
    }
    Ok(records)
}

fn parse_element(
    kind: &dyn RecordKind,
    elem: &Element,
) -> std::result::Result<BTreeMap<String, AnyRecord>, Error> {
    let version = binary_version(kind, elem)?;
    let mut records = BTreeMap::new();
    if kind.uses_id() {
        for (key, child) in elem.children() {
            records.insert(key.to_string(), kind.parse_binary(child, version)?);
        }
    } else {
        records.insert(String::new(), kind.parse_binary(elem, version)?);
    }
    Ok(records)
}

impl Dispatcher {
    pub fn new(registry: Registry) -> Self {
        let slots = registry.kinds().map(|_| Slot::Unloaded).collect();
        Self { registry, slots }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn index_of<R: Record>(&self) -> Result<usize> {
        self.registry
            .index_of::<R>()
            .ok_or_else(|| Error::UnknownRecord(R::NAME.to_string()).into())
    }

    /// Record types that no source has provided yet.
    pub fn has_unloaded(&self) -> bool {
        self.slots.iter().any(|s| matches!(s, Slot::Unloaded))
    }

    fn settle(
        &mut self,
        index: usize,
        name: &'static str,
        outcome: std::result::Result<BTreeMap<String, AnyRecord>, Error>,
        raw: impl FnOnce() -> Preserved,
        report: &mut LoadReport,
    ) {
        match outcome {
            Ok(records) => {
                self.slots[index] = Slot::Loaded {
                    records,
                    pending_migration: false,
                };
                report.loaded.push(name);
            }
            Err(e) => {
                tracing::warn!("Could not load {}: {}", name, e);
                let error = Arc::new(e);
                report.failed.push((name, Arc::clone(&error)));
                self.slots[index] = Slot::Failed { error, raw: raw() };
            }
        }
    }

    /// Load every still-unloaded record type present in a text container.
    pub fn load_text(&mut self, root: &Property) -> LoadReport {
        let mut report = LoadReport::default();
        for child in root.children() {
            if !child.is_block() || self.registry.index_of_name(child.name()).is_none() {
                tracing::warn!("Skipping unknown section {:?} in text container", child.name());
            }
        }

        for index in 0..self.slots.len() {
            if !matches!(self.slots[index], Slot::Unloaded) {
                continue;
            }
            let Some(kind) = self.registry.kind(index).cloned() else {
                continue;
            };
            let Some(block) = root.find_block(kind.name()) else {
                continue;
            };
            let outcome = parse_text_block(kind.as_ref(), block);
            self.settle(
                index,
                kind.name(),
                outcome,
                || Preserved::Text(block.clone()),
                &mut report,
            );
        }
        report
    }

    /// Load every still-unloaded record type present in a binary container.
    pub fn load_binary(&mut self, root: &Element) -> LoadReport {
        let mut report = LoadReport::default();
        for (key, attr) in root.attributes() {
            let known = self.registry.index_of_name(key).is_some();
            if !known || !matches!(attr, Attribute::Element(_)) {
                tracing::warn!("Skipping unknown attribute {:?} in binary container", key);
            }
        }

        for index in 0..self.slots.len() {
            if !matches!(self.slots[index], Slot::Unloaded) {
                continue;
            }
            let Some(kind) = self.registry.kind(index).cloned() else {
                continue;
            };
            let Some((_, elem)) = root
                .children()
                .find(|(key, _)| key.eq_ignore_ascii_case(kind.name()))
            else {
                continue;
            };
            let outcome = parse_element(kind.as_ref(), elem);
            self.settle(
                index,
                kind.name(),
                outcome,
                || Preserved::Binary(elem.clone()),
                &mut report,
            );
        }
        report
    }

    /// Migrate every still-unloaded record type from the legacy configuration.
    ///
    /// Never fails; migrated records are marked pending until saved.
    pub fn load_legacy(&mut self, source: &dyn LegacySource) -> LoadReport {
        let mut report = LoadReport::default();
        for (kind, slot) in self.registry.kinds().zip(self.slots.iter_mut()) {
            if !matches!(slot, Slot::Unloaded) {
                continue;
            }
            tracing::debug!("Migrating {} from legacy configuration", kind.name());
            *slot = Slot::Loaded {
                records: kind.from_legacy(source),
                pending_migration: true,
            };
            report.migrated.push(kind.name());
        }
        report
    }

    /// The record of a type without sub-keys.
    pub fn get<R: Record>(&self) -> Result<Arc<R>> {
        self.get_keyed::<R>("")
    }

    pub fn get_keyed<R: Record>(&self, key: &str) -> Result<Arc<R>> {
        let index = self.index_of::<R>()?;
        match &self.slots[index] {
            Slot::Unloaded => Err(Error::NotLoaded(R::NAME.to_string()).into()),
            Slot::Failed { error, .. } => Err(StoreError::Record {
                name: R::NAME.to_string(),
                source: Arc::clone(error),
            }),
            Slot::Loaded { records, .. } => {
                let record = records.get(key).ok_or_else(|| StoreError::UnknownKey {
                    record: R::NAME.to_string(),
                    key: key.to_string(),
                })?;
                Arc::clone(record)
                    .downcast::<R>()
                    .map_err(|_| Error::UnknownRecord(R::NAME.to_string()).into())
            }
        }
    }

    /// Sub-keys present for a loaded record type.
    pub fn keys<R: Record>(&self) -> Result<Vec<String>> {
        let index = self.index_of::<R>()?;
        match &self.slots[index] {
            Slot::Loaded { records, .. } => Ok(records.keys().cloned().collect()),
            _ => Err(Error::NotLoaded(R::NAME.to_string()).into()),
        }
    }

    /// Replace the record of a type without sub-keys.
    pub fn update<R: Record>(&mut self, record: R) -> Result<()> {
        self.update_keyed("", record)
    }

    /// Replace one record. This also replaces a record that failed to load,
    /// discarding its preserved data.
    pub fn update_keyed<R: Record>(&mut self, key: &str, record: R) -> Result<()> {
        if !R::USES_ID && !key.is_empty() {
            return Err(StoreError::UnknownKey {
                record: R::NAME.to_string(),
                key: key.to_string(),
            });
        }
        let index = self.index_of::<R>()?;
        let record: AnyRecord = Arc::new(record);
        match &mut self.slots[index] {
            Slot::Loaded { records, .. } => {
                records.insert(key.to_string(), record);
            }
            slot => {
                if matches!(slot, Slot::Failed { .. }) {
                    tracing::warn!("{}: replacing a record that failed to load", R::NAME);
                }
                *slot = Slot::Loaded {
                    records: BTreeMap::from([(key.to_string(), record)]),
                    pending_migration: false,
                };
            }
        }
        Ok(())
    }

    pub fn status(&self) -> Vec<(&'static str, RecordStatus)> {
        self.registry
            .kinds()
            .zip(&self.slots)
            .map(|(kind, slot)| {
                let status = match slot {
                    Slot::Unloaded => RecordStatus::Unloaded,
                    Slot::Failed { error, .. } => RecordStatus::Failed(error.to_string()),
                    Slot::Loaded {
                        pending_migration: true,
                        ..
                    } => RecordStatus::PendingMigration,
                    Slot::Loaded { .. } => RecordStatus::Loaded,
                };
                (kind.name(), status)
            })
            .collect()
    }

    /// Clear pending-migration marks after the records have been written.
    pub fn mark_saved(&mut self) {
        for slot in &mut self.slots {
            if let Slot::Loaded {
                pending_migration, ..
            } = slot
            {
                *pending_migration = false;
            }
        }
    }

    /// Build a text container from every loaded or preserved record.
    pub fn export_text(&self) -> Property {
        let mut root = Property::root(Vec::new());
        for (kind, slot) in self.registry.kinds().zip(&self.slots) {
            match slot {
                Slot::Unloaded => {}
                Slot::Failed {
                    raw: Preserved::Text(block),
                    ..
                } => root.push(block.clone()),
                Slot::Failed {
                    raw: Preserved::Binary(_),
                    ..
                } => {
                    tracing::warn!(
                        "{} failed to load from the binary container and is not written as text",
                        kind.name()
                    );
                }
                Slot::Loaded { records, .. } => {
                    let mut block = Property::block(kind.name(), Vec::new());
                    block.set(VERSION_KEY, Value::Integer(kind.version().get().into()));
                    if kind.uses_id() {
                        for (key, record) in records {
                            let mut child = Property::block(key.as_str(), Vec::new());
                            kind.export_text(record, &mut child);
                            block.push(child);
                        }
                    } else if let Some(record) = records.get("") {
                        kind.export_text(record, &mut block);
                    }
                    root.push(block);
                }
            }
        }
        root
    }

    /// Build a binary container from every loaded or preserved record.
    pub fn export_binary(&self) -> Element {
        let mut root = Element::new(BINARY_ROOT, ELEMENT_CLASS);
        for (kind, slot) in self.registry.kinds().zip(&self.slots) {
            match slot {
                Slot::Unloaded => {}
                Slot::Failed {
                    raw: Preserved::Binary(elem),
                    ..
                } => {
                    root.insert(kind.name(), Attribute::Element(elem.clone()));
                }
                Slot::Failed {
                    raw: Preserved::Text(_),
                    ..
                } => {
                    tracing::warn!(
                        "{} failed to load from the text container and is not written as binary",
                        kind.name()
                    );
                }
                Slot::Loaded { records, .. } => {
                    let mut elem = Element::new(kind.name(), ELEMENT_CLASS);
                    elem.set(VERSION_KEY, Value::Integer(kind.version().get().into()));
                    if kind.uses_id() {
                        for (key, record) in records {
                            let mut child = Element::new(key.as_str(), ELEMENT_CLASS);
                            kind.export_binary(record, &mut child);
                            elem.insert(key.as_str(), Attribute::Element(child));
                        }
                    } else if let Some(record) = records.get("") {
                        kind.export_binary(record, &mut elem);
                    }
                    root.insert(kind.name(), Attribute::Element(elem));
                }
            }
        }
        root
    }

    fn loaded_json(
        kind: &dyn RecordKind,
        records: &BTreeMap<String, AnyRecord>,
    ) -> Result<serde_json::Value> {
        if !kind.uses_id() {
            return match records.get("") {
                Some(record) => Ok(kind.to_json(record)?),
                None => Ok(serde_json::Value::Null),
            };
        }
        let mut map = serde_json::Map::new();
        for (key, record) in records {
            map.insert(key.clone(), kind.to_json(record)?);
        }
        Ok(serde_json::Value::Object(map))
    }

    /// JSON view of one record type, by name.
    pub fn record_json(&self, name: &str) -> Result<serde_json::Value> {
        let index = self
            .registry
            .index_of_name(name)
            .ok_or_else(|| Error::UnknownRecord(name.to_string()))?;
        let Some(kind) = self.registry.kind(index) else {
            return Err(Error::UnknownRecord(name.to_string()).into());
        };
        match &self.slots[index] {
            Slot::Unloaded => Err(Error::NotLoaded(kind.name().to_string()).into()),
            Slot::Failed { error, .. } => Err(StoreError::Record {
                name: kind.name().to_string(),
                source: Arc::clone(error),
            }),
            Slot::Loaded { records, .. } => Self::loaded_json(kind.as_ref(), records),
        }
    }

    /// JSON view of every loaded record, keyed by record name.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut out = serde_json::Map::new();
        for (kind, slot) in self.registry.kinds().zip(&self.slots) {
            if let Slot::Loaded { records, .. } = slot {
                out.insert(
                    kind.name().to_string(),
                    Self::loaded_json(kind.as_ref(), records)?,
                );
            }
        }
        Ok(serde_json::Value::Object(out))
    }
}
