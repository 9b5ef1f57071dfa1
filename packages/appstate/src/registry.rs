//! Record type registration and type erasure.
//!
//! The dispatcher holds records of many types side by side. `RecordKind` is
//! the object-safe face of a `Record` implementation: it parses into and
//! exports from `AnyRecord` payloads, which are downcast back to the concrete
//! type at the typed API boundary.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;

use appstate_core::{Error, LegacySource, Node, Record, SchemaVersion};

use crate::StoreError;

/// A loaded record of some registered type.
pub type AnyRecord = Arc<dyn Any + Send + Sync>;

/// A record type, with its concrete type erased.
pub trait RecordKind: Send + Sync {
    fn name(&self) -> &'static str;

    /// The newest version this build can parse.
    fn version(&self) -> SchemaVersion;

    fn uses_id(&self) -> bool;

    fn record_type(&self) -> TypeId;

    fn from_legacy(&self, source: &dyn LegacySource) -> BTreeMap<String, AnyRecord>;

    fn parse_text(&self, data: &dyn Node, version: SchemaVersion) -> Result<AnyRecord, Error>;

    /// Does nothing if `record` is not of this kind.
    fn export_text(&self, record: &AnyRecord, out: &mut dyn Node);

    fn parse_binary(&self, data: &dyn Node, version: SchemaVersion) -> Result<AnyRecord, Error>;

    fn export_binary(&self, record: &AnyRecord, out: &mut dyn Node);

    fn to_json(&self, record: &AnyRecord) -> serde_json::Result<serde_json::Value>;
}

struct Kind<R>(PhantomData<fn() -> R>);

impl<R: Record> Kind<R> {
    fn downcast(record: &AnyRecord) -> Option<&R> {
        let found = record.downcast_ref::<R>();
        if found.is_none() {
            tracing::error!("{}: stored record has the wrong type", R::NAME);
        }
        found
    }
}

impl<R: Record> RecordKind for Kind<R> {
    fn name(&self) -> &'static str {
        R::NAME
    }

    fn version(&self) -> SchemaVersion {
        R::VERSION
    }

    fn uses_id(&self) -> bool {
        R::USES_ID
    }

    fn record_type(&self) -> TypeId {
        TypeId::of::<R>()
    }

    fn from_legacy(&self, source: &dyn LegacySource) -> BTreeMap<String, AnyRecord> {
        R::from_legacy(source)
            .into_iter()
            .map(|(key, record)| (key, Arc::new(record) as AnyRecord))
            .collect()
    }

    fn parse_text(&self, data: &dyn Node, version: SchemaVersion) -> Result<AnyRecord, Error> {
        let record: AnyRecord = Arc::new(R::parse_text(data, version)?);
        Ok(record)
    }

    fn export_text(&self, record: &AnyRecord, out: &mut dyn Node) {
        if let Some(record) = Self::downcast(record) {
            record.export_text(out);
        }
    }

    fn parse_binary(&self, data: &dyn Node, version: SchemaVersion) -> Result<AnyRecord, Error> {
        let record: AnyRecord = Arc::new(R::parse_binary(data, version)?);
        Ok(record)
    }

    fn export_binary(&self, record: &AnyRecord, out: &mut dyn Node) {
        if let Some(record) = Self::downcast(record) {
            record.export_binary(out);
        }
    }

    fn to_json(&self, record: &AnyRecord) -> serde_json::Result<serde_json::Value> {
        match Self::downcast(record) {
            Some(record) => serde_json::to_value(record),
            None => Ok(serde_json::Value::Null),
        }
    }
}

/// The set of record types a dispatcher knows about.
///
/// Names are matched case-insensitively, as container keys are.
#[derive(Default)]
pub struct Registry {
    kinds: Vec<Arc<dyn RecordKind>>,
    by_name: BTreeMap<String, usize>,
    by_type: HashMap<TypeId, usize>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("kinds", &self.kinds.iter().map(|k| k.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `R`. Fails if a type with the same name is already registered.
    pub fn register<R: Record>(&mut self) -> crate::Result<&mut Self> {
        let key = R::NAME.to_ascii_lowercase();
        if self.by_name.contains_key(&key) {
            return Err(StoreError::DuplicateRecord(R::NAME.to_string()));
        }
        let index = self.kinds.len();
        self.kinds.push(Arc::new(Kind::<R>(PhantomData)));
        self.by_name.insert(key, index);
        self.by_type.insert(TypeId::of::<R>(), index);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &Arc<dyn RecordKind>> {
        self.kinds.iter()
    }

    pub(crate) fn kind(&self, index: usize) -> Option<&Arc<dyn RecordKind>> {
        self.kinds.get(index)
    }

    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn index_of<R: Record>(&self) -> Option<usize> {
        self.by_type.get(&TypeId::of::<R>()).copied()
    }

    pub fn lookup(&self, name: &str) -> Option<&Arc<dyn RecordKind>> {
        self.index_of_name(name).and_then(|i| self.kind(i))
    }
}
