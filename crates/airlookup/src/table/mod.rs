//! Aircraft table storage.
//!
//! [`TableStore`] implements the read, merge and write logic over any
//! [`TableBackend`]. Backends are chosen from the connection string:
//! `sqlite:` URLs open a local database, everything else is treated as an
//! Azure Storage connection string.

pub mod azure;
pub mod connection;
pub mod memory;
pub mod sqlite;

use std::fmt;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::TableConfig;
use crate::error::Result;
use crate::record::{AircraftEntity, AircraftRecord, FillOutcome, Icao24, RecordPatch};

pub use azure::AzureTable;
pub use connection::StorageAccount;
pub use memory::MemoryTable;
pub use sqlite::SqliteTable;

/// Prefix selecting the local SQLite backend.
pub const SQLITE_SCHEME: &str = "sqlite:";

/// Key-addressed access to aircraft rows.
#[async_trait]
pub trait TableBackend: Send + Sync + fmt::Debug {
    /// Fetch one row. A missing row or missing table is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or answers unexpectedly.
    async fn get_entity(&self, partition_key: &str, row_key: &str)
        -> Result<Option<AircraftEntity>>;

    /// Insert `entity`, replacing any row with the same keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn put_entity(&self, entity: &AircraftEntity) -> Result<()>;

    /// Create the table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be created.
    async fn ensure_table(&self) -> Result<()> {
        Ok(())
    }
}

/// Aircraft metadata store over a single table partition.
#[derive(Debug)]
pub struct TableStore {
    backend: Box<dyn TableBackend>,
    partition_key: String,
}

impl TableStore {
    /// Create a store over an existing backend.
    #[must_use]
    pub fn new(backend: Box<dyn TableBackend>, partition_key: impl Into<String>) -> Self {
        Self {
            backend,
            partition_key: partition_key.into(),
        }
    }

    /// Open the backend named by `connection_string`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is invalid, the backend
    /// cannot be opened, or table creation fails when requested.
    pub async fn connect(connection_string: &str, config: &TableConfig) -> Result<Self> {
        let backend: Box<dyn TableBackend> =
            if let Some(location) = connection_string.strip_prefix(SQLITE_SCHEME) {
                Box::new(SqliteTable::open_location(location, &config.name)?)
            } else {
                let account = StorageAccount::parse(connection_string)?;
                Box::new(AzureTable::new(account, &config.name))
            };

        if config.create_if_missing {
            backend.ensure_table().await?;
        }

        Ok(Self::new(backend, config.partition_key.clone()))
    }

    /// The partition every row is written to.
    #[must_use]
    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    async fn fetch(&self, icao24: &Icao24) -> Result<Option<AircraftEntity>> {
        self.backend
            .get_entity(&self.partition_key, icao24.row_key())
            .await
    }

    /// Look up one aircraft. Unknown addresses yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the stored row is unreadable.
    pub async fn get_by_icao24(&self, icao24: &Icao24) -> Result<Option<AircraftRecord>> {
        self.fetch(icao24)
            .await?
            .map(|entity| AircraftRecord::from_entity(&entity))
            .transpose()
    }

    /// Merge `patch` into the stored row and write it back.
    ///
    /// Supplied fields overwrite stored ones; the rest keep their stored
    /// values. A missing row is created from the supplied fields alone. The
    /// write replaces the whole row and is not conditional on what was read.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or the write fails.
    pub async fn upsert(&self, icao24: &Icao24, patch: &RecordPatch) -> Result<AircraftRecord> {
        let mut entity = match self.fetch(icao24).await? {
            Some(existing) => existing,
            None => AircraftEntity::new(&self.partition_key, icao24),
        };
        patch.merge_into(&mut entity);

        self.backend.put_entity(&entity).await?;
        debug!("Upserted {icao24}");
        AircraftRecord::from_entity(&entity)
    }

    /// Overwrite the row with exactly the supplied fields, without reading it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn replace(&self, icao24: &Icao24, patch: &RecordPatch) -> Result<AircraftRecord> {
        let mut entity = AircraftEntity::new(&self.partition_key, icao24);
        patch.merge_into(&mut entity);

        self.backend.put_entity(&entity).await?;
        debug!("Replaced {icao24}");
        AircraftRecord::from_entity(&entity)
    }

    /// Create the row if absent, otherwise fill only its blank fields.
    ///
    /// Nothing is written when no blank field would change.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or the write fails.
    pub async fn fill_missing(&self, icao24: &Icao24, patch: &RecordPatch) -> Result<FillOutcome> {
        let Some(mut entity) = self.fetch(icao24).await? else {
            let mut entity = AircraftEntity::new(&self.partition_key, icao24);
            patch.merge_into(&mut entity);
            self.backend.put_entity(&entity).await?;
            info!("Inserted {icao24}");
            return Ok(FillOutcome::Inserted);
        };

        if !patch.fill_missing(&mut entity) {
            return Ok(FillOutcome::Unchanged);
        }
        self.backend.put_entity(&entity).await?;
        info!("Updated {icao24}");
        Ok(FillOutcome::Updated)
    }
}
