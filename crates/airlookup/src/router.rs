//! Command dispatch.
//!
//! The [`Router`] turns a parsed command into an [`Outcome`] using the online
//! client, the secret resolver and a table connector. It does no printing;
//! rendering and exit codes are left to the binary.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::{Config, TableConfig};
use crate::credential::DefaultCredentialChain;
use crate::error::Result;
use crate::online::{OnlineLookupClient, OnlineMetadata};
use crate::record::{AircraftRecord, Icao24, RecordPatch};
use crate::secrets::{KeyVaultSecrets, SecretResolver, StaticSecret};
use crate::sync::{self, SyncReport};
use crate::table::TableStore;

/// Result of a routed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Metadata from the online service.
    Online(OnlineMetadata),
    /// A record read from the table.
    Found(AircraftRecord),
    /// A record after an upsert or replace.
    Written(AircraftRecord),
    /// No data for the requested address.
    NotFound {
        /// The address as the user typed it.
        requested: String,
    },
    /// Summary of a bulk sync.
    Synced(SyncReport),
}

impl Outcome {
    /// Check if this outcome reports a missing aircraft.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Process exit status for this outcome: 1 for a missing aircraft, else 0.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        u8::from(self.is_not_found())
    }
}

/// How a `table` command should treat the supplied fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Merge supplied fields into the stored row.
    #[default]
    Merge,
    /// Overwrite the row with exactly the supplied fields.
    Replace,
}

/// A `table` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRequest {
    /// The address as the user typed it.
    pub icao24: String,
    /// Fields to write; empty means read.
    pub patch: RecordPatch,
    /// Write behaviour when fields are supplied.
    pub mode: WriteMode,
}

/// Opens a [`TableStore`] from a connection string.
#[async_trait]
pub trait TableConnector: Send + Sync + fmt::Debug {
    /// Open the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is invalid or the backend
    /// cannot be opened.
    async fn connect(&self, connection_string: &str, config: &TableConfig) -> Result<TableStore>;
}

/// Connector choosing the backend from the connection string.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConnector;

#[async_trait]
impl TableConnector for DefaultConnector {
    async fn connect(&self, connection_string: &str, config: &TableConfig) -> Result<TableStore> {
        TableStore::connect(connection_string, config).await
    }
}

/// Dispatches commands to the lookup components.
#[derive(Debug)]
pub struct Router {
    config: Config,
    online: OnlineLookupClient,
    secrets: OnceCell<SecretResolver>,
    connector: Box<dyn TableConnector>,
}

impl Router {
    /// Create a router from explicit components.
    ///
    /// # Errors
    ///
    /// Returns an error if the online client cannot be built.
    pub fn new(
        config: Config,
        secrets: SecretResolver,
        connector: Box<dyn TableConnector>,
    ) -> Result<Self> {
        let online = OnlineLookupClient::new(&config.online)?;
        Ok(Self {
            config,
            online,
            secrets: OnceCell::new_with(Some(secrets)),
            connector,
        })
    }

    /// Create a router for production use.
    ///
    /// The secret source is built on first table access. A configured
    /// `table.connection_string` is used as-is; otherwise the connection
    /// string is read from the key vault with the default credential chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the online HTTP client cannot be built.
    pub fn from_config(config: Config) -> Result<Self> {
        let online = OnlineLookupClient::new(&config.online)?;
        Ok(Self {
            config,
            online,
            secrets: OnceCell::new(),
            connector: Box::new(DefaultConnector),
        })
    }

    fn default_secrets(config: &Config) -> Result<SecretResolver> {
        Ok(match &config.table.connection_string {
            Some(value) => SecretResolver::new(Box::new(StaticSecret::new(value.clone()))),
            None => {
                let credential = Arc::new(DefaultCredentialChain::new()?);
                SecretResolver::new(Box::new(KeyVaultSecrets::new(&config.vault.url, credential)))
            }
        })
    }

    async fn secrets(&self) -> Result<&SecretResolver> {
        self.secrets
            .get_or_try_init(|| async { Self::default_secrets(&self.config) })
            .await
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Look up an aircraft with the online service.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or the service fails.
    pub async fn online(&self, icao24: &str) -> Result<Outcome> {
        let address = Icao24::parse(icao24)?;
        Ok(match self.online.lookup(&address).await? {
            Some(metadata) => Outcome::Online(metadata),
            None => Outcome::NotFound {
                requested: icao24.trim().to_string(),
            },
        })
    }

    /// Read or write one aircraft in the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid, the connection secret is
    /// unavailable, or the table operation fails.
    pub async fn table(&self, request: &TableRequest) -> Result<Outcome> {
        let address = Icao24::parse(&request.icao24)?;
        let store = self.open_store().await?;

        if request.patch.is_empty() {
            return Ok(match store.get_by_icao24(&address).await? {
                Some(record) => Outcome::Found(record),
                None => Outcome::NotFound {
                    requested: request.icao24.trim().to_string(),
                },
            });
        }

        let record = match request.mode {
            WriteMode::Merge => store.upsert(&address, &request.patch).await?,
            WriteMode::Replace => store.replace(&address, &request.patch).await?,
        };
        Ok(Outcome::Written(record))
    }

    /// Import an aircraft database CSV into the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection secret is unavailable, the file
    /// cannot be parsed, or a write fails.
    pub async fn sync(&self, path: &Path) -> Result<Outcome> {
        let store = self.open_store().await?;
        Ok(Outcome::Synced(sync::sync_file(&store, path).await?))
    }

    async fn open_store(&self) -> Result<TableStore> {
        let secrets = self.secrets().await?;
        let connection_string = secrets.require(&self.config.vault.secret_name).await?;
        debug!("Resolved table connection from {}", secrets.location());
        self.connector
            .connect(&connection_string, &self.config.table)
            .await
    }
}
