// In-memory record store for one session.
// The store is the explicit shared-state handle: the engine and the rules
// never read ambient state, they receive this (or slices of it) as input.

use crate::record::Record;

// ============================================================================
// RECORD STORE
// ============================================================================

/// Owns every record of the session, in insertion order. Soft deletes flip
/// a flag and keep the record resolvable; hard deletes remove it entirely
/// and its id never comes back.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    pub fn new() -> Self {
        RecordStore { records: Vec::new() }
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        RecordStore { records }
    }

    /// Add a single record. Ids are assigned upstream by the normalizer;
    /// the store never mints or rewrites them.
    pub fn add(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: Vec<Record>) {
        self.records.extend(records);
    }

    /// All records, soft-deleted included, in insertion order.
    pub fn all(&self) -> &[Record] {
        &self.records
    }

    /// Active view: records not soft-deleted.
    pub fn active(&self) -> Vec<&Record> {
        self.records.iter().filter(|r| r.is_active()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Mutate a record in place. Returns false when the id is unknown.
    pub fn update<F>(&mut self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Record),
    {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                f(record);
                true
            }
            None => false,
        }
    }

    /// Soft delete: the record stays resolvable and in the full view, but
    /// drops out of `active()`.
    pub fn soft_delete(&mut self, id: &str) -> bool {
        self.update(id, |r| r.flags.is_deleted = true)
    }

    /// Revert a soft delete.
    pub fn restore(&mut self, id: &str) -> bool {
        self.update(id, |r| r.flags.is_deleted = false)
    }

    /// Hard delete: the record is gone and its id is no longer resolvable.
    pub fn hard_delete(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        self.records.len() < before
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
