//! Local record set for the currently selected group.
//!
//! The store itself is synchronous and side-effect free; command round-trips
//! and rollback sequencing live in the client so this state has exactly one
//! writer.

use shared::{domain::RecordId, protocol::Record};

#[derive(Debug, Default)]
pub(crate) struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    /// Replaces the whole set with the latest authoritative push.
    pub fn replace_all(&mut self, records: Vec<Record>) {
        self.records = records;
    }

    pub fn snapshot(&self) -> Vec<Record> {
        self.records.clone()
    }

    /// Removes the record with the given id, preserving the order of the
    /// rest.
    pub fn remove(&mut self, id: RecordId) -> Option<Record> {
        let index = self.records.iter().position(|record| record.id == id)?;
        Some(self.records.remove(index))
    }

    /// Patches the name of the record with the given id and returns the
    /// previous name for rollback.
    pub fn rename(&mut self, id: RecordId, new_name: &str) -> Option<String> {
        let record = self.records.iter_mut().find(|record| record.id == id)?;
        Some(std::mem::replace(&mut record.name, new_name.to_string()))
    }
}
