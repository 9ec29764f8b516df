//! In-memory table backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::TableBackend;
use crate::error::Result;
use crate::record::AircraftEntity;

type Key = (String, String);

/// A table held in process memory.
///
/// Clones share the same rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    rows: Arc<Mutex<HashMap<Key, AircraftEntity>>>,
}

impl MemoryTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a row directly.
    #[must_use]
    pub fn get(&self, partition_key: &str, row_key: &str) -> Option<AircraftEntity> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(partition_key.to_string(), row_key.to_string()))
            .cloned()
    }

    /// Number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TableBackend for MemoryTable {
    async fn get_entity(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<AircraftEntity>> {
        Ok(self.get(partition_key, row_key))
    }

    async fn put_entity(&self, entity: &AircraftEntity) -> Result<()> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                (entity.partition_key.clone(), entity.row_key.clone()),
                entity.clone(),
            );
        Ok(())
    }
}
