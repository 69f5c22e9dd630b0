//! In-memory list of saved locations.
//!
//! The store only ever holds records that were created remotely, so every
//! entry has a server-assigned id and ids are unique.

use crate::{
    error::{Error, Result},
    model::{LocationId, SavedLocation},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationStore {
    records: Vec<SavedLocation>,
}

impl LocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a full remote listing. Fails on the first repeated id.
    pub fn from_records(records: impl IntoIterator<Item = SavedLocation>) -> Result<Self> {
        let mut store = Self::new();
        for record in records {
            store.add(record)?;
        }
        Ok(store)
    }

    /// All records in insertion order.
    pub fn all(&self) -> &[SavedLocation] {
        &self.records
    }

    pub fn get(&self, id: LocationId) -> Option<&SavedLocation> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: LocationId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn add(&mut self, record: SavedLocation) -> Result<()> {
        if self.contains(record.id) {
            return Err(Error::DuplicateId(record.id));
        }
        self.records.push(record);
        Ok(())
    }

    /// Remove the record with `id`. Removing an absent id is not an error.
    pub fn remove(&mut self, id: LocationId) -> Option<SavedLocation> {
        let pos = self.records.iter().position(|r| r.id == id)?;
        Some(self.records.remove(pos))
    }

    /// Swap the record with `id` for `record`, keeping its position.
    pub fn replace(&mut self, id: LocationId, record: SavedLocation) -> Result<()> {
        let pos = self.records.iter().position(|r| r.id == id).ok_or(Error::NotFound(id))?;

        if record.id != id && self.contains(record.id) {
            return Err(Error::DuplicateId(record.id));
        }

        self.records[pos] = record;
        Ok(())
    }
}
