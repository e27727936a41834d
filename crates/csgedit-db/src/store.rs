//! The directory-entry store.
//!
//! [`ObjectStore`] is the contract the editing engines consume; [`Database`]
//! is the in-memory implementation backed by a slot map, with a name index
//! kept in sorted order so enumeration is deterministic.

use std::collections::BTreeMap;
use std::path::Path;

use csgedit_math::Transform;
use csgedit_primitives::Primitive;
use slotmap::SlotMap;

use crate::error::{DbError, Result};
use crate::{Combination, DirectoryEntry, Document, EntryId, Internal, Object, ObjectKind};

/// Named object store.
///
/// Implementations must keep names unique at every observable instant:
/// [`create`](ObjectStore::create) and [`rename`](ObjectStore::rename) fail
/// rather than shadow an existing name.
pub trait ObjectStore {
    /// Resolve a name to an entry.
    fn lookup(&self, name: &str) -> Option<EntryId>;

    /// The directory entry for `id`.
    fn entry(&self, id: EntryId) -> Option<&DirectoryEntry>;

    /// Every entry id, ordered by name.
    fn ids(&self) -> Vec<EntryId>;

    /// Maximum name length, if the store has one.
    fn name_limit(&self) -> Option<usize>;

    /// Add an entry with no stored representation yet.
    fn create(&mut self, name: &str, kind: ObjectKind) -> Result<EntryId>;

    /// Remove an entry and its representation.
    fn delete(&mut self, id: EntryId) -> Result<()>;

    /// Give an entry a new unique name.
    fn rename(&mut self, id: EntryId, new_name: &str) -> Result<()>;

    /// Read an object's representation.
    ///
    /// For solids, `matrix` is applied to the parameters on the way out; it
    /// is ignored for combinations.
    fn read_internal(&self, id: EntryId, matrix: Option<&Transform>) -> Result<Internal>;

    /// Replace an object's representation. The body must match the entry's
    /// kind (a combination body may switch the region flag).
    fn write_internal(&mut self, id: EntryId, internal: Internal) -> Result<()>;

    /// Name of `id`, if it exists.
    fn name(&self, id: EntryId) -> Option<&str> {
        self.entry(id).map(|e| e.name.as_str())
    }

    /// Read a combination body.
    fn read_comb(&self, id: EntryId) -> Result<Combination> {
        match self.read_internal(id, None)? {
            Internal::Combination(comb) => Ok(comb),
            Internal::Solid(_) => Err(DbError::WrongKind {
                name: self.name(id).unwrap_or_default().to_string(),
                expected: "combination",
            }),
        }
    }

    /// Read a solid with `matrix` applied.
    fn read_solid(&self, id: EntryId, matrix: Option<&Transform>) -> Result<Primitive> {
        match self.read_internal(id, matrix)? {
            Internal::Solid(prim) => Ok(prim),
            Internal::Combination(_) => Err(DbError::WrongKind {
                name: self.name(id).unwrap_or_default().to_string(),
                expected: "solid",
            }),
        }
    }
}

#[derive(Debug, Clone)]
struct Record {
    entry: DirectoryEntry,
    body: Option<Internal>,
}

/// In-memory object store.
#[derive(Debug, Clone, Default)]
pub struct Database {
    records: SlotMap<EntryId, Record>,
    names: BTreeMap<String, EntryId>,
    name_limit: Option<usize>,
}

impl Database {
    /// Create an empty database with no name length limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty database whose names may not exceed `limit` characters.
    pub fn with_name_limit(limit: usize) -> Self {
        Self {
            name_limit: Some(limit),
            ..Self::default()
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the database has no entries.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Create an entry and write its body in one step.
    pub fn insert(&mut self, name: &str, body: Internal) -> Result<EntryId> {
        let id = self.create(name, body.kind())?;
        self.write_internal(id, body)?;
        Ok(id)
    }

    /// Convenience: insert a solid.
    pub fn put_solid(&mut self, name: &str, prim: Primitive) -> Result<EntryId> {
        self.insert(name, Internal::Solid(prim))
    }

    /// Convenience: insert a combination.
    pub fn put_comb(&mut self, name: &str, comb: Combination) -> Result<EntryId> {
        self.insert(name, Internal::Combination(comb))
    }

    /// Build a database from a document.
    pub fn from_document(doc: Document) -> Result<Self> {
        let mut db = Self {
            name_limit: doc.name_limit,
            ..Self::default()
        };
        for obj in doc.objects {
            db.insert(&obj.name, obj.body)?;
        }
        Ok(db)
    }

    /// Snapshot as a document. Entries that were created but never written
    /// carry no representation and are left out.
    pub fn to_document(&self) -> Document {
        let objects = self
            .names
            .iter()
            .filter_map(|(name, id)| {
                let body = self.records.get(*id)?.body.clone()?;
                Some(Object {
                    name: name.clone(),
                    body,
                })
            })
            .collect();
        Document {
            name_limit: self.name_limit,
            objects,
            ..Document::default()
        }
    }

    /// Load a JSON database file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_document(Document::from_json(&json)?)
    }

    /// Write the database to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_document().to_json()?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn check_name(&self, name: &str) -> Result<()> {
        if let Some(limit) = self.name_limit {
            if name.chars().count() > limit {
                return Err(DbError::NameTooLong {
                    name: name.to_string(),
                    limit,
                });
            }
        }
        if self.names.contains_key(name) {
            return Err(DbError::AlreadyExists(name.to_string()));
        }
        Ok(())
    }

    fn record(&self, id: EntryId) -> Result<&Record> {
        self.records
            .get(id)
            .ok_or_else(|| DbError::NotFound(format!("{id:?}")))
    }
}

impl ObjectStore for Database {
    fn lookup(&self, name: &str) -> Option<EntryId> {
        self.names.get(name).copied()
    }

    fn entry(&self, id: EntryId) -> Option<&DirectoryEntry> {
        self.records.get(id).map(|r| &r.entry)
    }

    fn ids(&self) -> Vec<EntryId> {
        self.names.values().copied().collect()
    }

    fn name_limit(&self) -> Option<usize> {
        self.name_limit
    }

    fn create(&mut self, name: &str, kind: ObjectKind) -> Result<EntryId> {
        self.check_name(name)?;
        let id = self.records.insert(Record {
            entry: DirectoryEntry {
                name: name.to_string(),
                kind,
            },
            body: None,
        });
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    fn delete(&mut self, id: EntryId) -> Result<()> {
        let record = self
            .records
            .remove(id)
            .ok_or_else(|| DbError::NotFound(format!("{id:?}")))?;
        self.names.remove(&record.entry.name);
        Ok(())
    }

    fn rename(&mut self, id: EntryId, new_name: &str) -> Result<()> {
        let old = self.record(id)?.entry.name.clone();
        if old == new_name {
            return Ok(());
        }
        self.check_name(new_name)?;
        self.names.remove(&old);
        self.names.insert(new_name.to_string(), id);
        if let Some(record) = self.records.get_mut(id) {
            record.entry.name = new_name.to_string();
        }
        Ok(())
    }

    fn read_internal(&self, id: EntryId, matrix: Option<&Transform>) -> Result<Internal> {
        let record = self.record(id)?;
        let body = record
            .body
            .as_ref()
            .ok_or_else(|| DbError::NoData(record.entry.name.clone()))?;
        match (body, matrix) {
            (Internal::Solid(prim), Some(m)) => {
                let moved = prim.transform(m).map_err(|source| DbError::Primitive {
                    name: record.entry.name.clone(),
                    source,
                })?;
                Ok(Internal::Solid(moved))
            }
            _ => Ok(body.clone()),
        }
    }

    fn write_internal(&mut self, id: EntryId, internal: Internal) -> Result<()> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| DbError::NotFound(format!("{id:?}")))?;
        let kind = internal.kind();
        if kind.is_solid() != record.entry.kind.is_solid() {
            return Err(DbError::WrongKind {
                name: record.entry.name.clone(),
                expected: if record.entry.kind.is_solid() {
                    "solid"
                } else {
                    "combination"
                },
            });
        }
        record.entry.kind = kind;
        record.body = Some(internal);
        Ok(())
    }
}
