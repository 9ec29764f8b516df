//! Local `SQLite` table backend.
//!
//! Stores aircraft rows in a single table keyed by partition and row key,
//! mirroring the cloud table schema so either can serve as the store.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::TableBackend;
use crate::error::{Error, Result};
use crate::record::AircraftEntity;

/// Location string selecting an in-memory database.
const MEMORY_LOCATION: &str = ":memory:";

/// `SQLite`-backed aircraft table.
#[derive(Debug)]
pub struct SqliteTable {
    /// Path to the database file.
    path: PathBuf,
    /// Quoted table identifier.
    table: String,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl SqliteTable {
    /// Open the location given after the `sqlite:` prefix.
    ///
    /// An empty location or `:memory:` opens an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open_location(location: &str, table: &str) -> Result<Self> {
        let location = location.trim_start_matches("//");
        if location.is_empty() || location == MEMORY_LOCATION {
            Self::open_in_memory(table)
        } else {
            Self::open(location, table)
        }
    }

    /// Open or create a database file.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the table cannot be created.
    pub fn open(path: impl AsRef<Path>, table: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let opened = Self::with_connection(path, conn, table)?;
        info!("Database opened at {}", opened.path.display());
        Ok(opened)
    }

    /// Create an in-memory table.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory(table: &str) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(MEMORY_LOCATION),
            source,
        })?;
        Self::with_connection(PathBuf::from(MEMORY_LOCATION), conn, table)
    }

    fn with_connection(path: PathBuf, conn: Connection, table: &str) -> Result<Self> {
        let table = quote_table_name(table)?;
        conn.execute(
            &format!(
                r"
                CREATE TABLE IF NOT EXISTS {table} (
                    partition_key TEXT NOT NULL,
                    row_key TEXT NOT NULL,
                    registration TEXT,
                    icao_aircraft_type TEXT,
                    icao_operator TEXT,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (partition_key, row_key)
                )
                "
            ),
            [],
        )?;
        Ok(Self {
            path,
            table,
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count stored rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    fn row_to_entity(row: &rusqlite::Row) -> rusqlite::Result<AircraftEntity> {
        Ok(AircraftEntity {
            partition_key: row.get(0)?,
            row_key: row.get(1)?,
            registration: row.get(2)?,
            icao_aircraft_type: row.get(3)?,
            icao_operator: row.get(4)?,
        })
    }
}

#[async_trait]
impl TableBackend for SqliteTable {
    async fn get_entity(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<AircraftEntity>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let entity = conn
            .query_row(
                &format!(
                    r"
                    SELECT partition_key, row_key, registration, icao_aircraft_type, icao_operator
                    FROM {} WHERE partition_key = ?1 AND row_key = ?2
                    ",
                    self.table
                ),
                params![partition_key, row_key],
                Self::row_to_entity,
            )
            .optional()?;
        Ok(entity)
    }

    async fn put_entity(&self, entity: &AircraftEntity) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            &format!(
                r"
                INSERT OR REPLACE INTO {}
                    (partition_key, row_key, registration, icao_aircraft_type, icao_operator, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
                self.table
            ),
            params![
                entity.partition_key,
                entity.row_key,
                entity.registration,
                entity.icao_aircraft_type,
                entity.icao_operator,
                Utc::now().to_rfc3339(),
            ],
        )?;
        debug!("Wrote row {}/{}", entity.partition_key, entity.row_key);
        Ok(())
    }
}

/// Validate a table name and quote it as an SQL identifier.
///
/// Accepts the cloud table naming rule: a letter followed by 2 to 62
/// alphanumeric characters.
fn quote_table_name(name: &str) -> Result<String> {
    let valid = (3..=63).contains(&name.len())
        && name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric());
    if valid {
        Ok(format!("\"{name}\""))
    } else {
        Err(Error::ConfigValidation {
            message: format!("invalid table name: {name}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(row_key: &str, registration: Option<&str>) -> AircraftEntity {
        AircraftEntity {
            partition_key: "Aircraft".to_string(),
            row_key: row_key.to_string(),
            registration: registration.map(str::to_string),
            ..AircraftEntity::default()
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let table = SqliteTable::open_in_memory("Aircraft").unwrap();
        table.put_entity(&entity("ABC123", Some("N1"))).await.unwrap();

        let fetched = table.get_entity("Aircraft", "ABC123").await.unwrap();
        assert_eq!(fetched, Some(entity("ABC123", Some("N1"))));
        assert!(table.get_entity("Aircraft", "FFFFFF").await.unwrap().is_none());
        assert!(table.get_entity("Other", "ABC123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_whole_row() {
        let table = SqliteTable::open_in_memory("Aircraft").unwrap();
        let mut full = entity("ABC123", Some("N1"));
        full.icao_operator = Some("ACME".to_string());
        table.put_entity(&full).await.unwrap();
        table.put_entity(&entity("ABC123", Some("N2"))).await.unwrap();

        let fetched = table.get_entity("Aircraft", "ABC123").await.unwrap().unwrap();
        assert_eq!(fetched.registration.as_deref(), Some("N2"));
        assert!(fetched.icao_operator.is_none());
        assert_eq!(table.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_open_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("aircraft.db");

        {
            let table = SqliteTable::open(&db_path, "Aircraft").unwrap();
            assert_eq!(table.path(), db_path);
            table.put_entity(&entity("ABC123", Some("N1"))).await.unwrap();
        }

        let reopened = SqliteTable::open(&db_path, "Aircraft").unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
    }

    #[test]
    fn test_open_location_memory_forms() {
        for location in ["", ":memory:", "//:memory:"] {
            let table = SqliteTable::open_location(location, "Aircraft").unwrap();
            assert_eq!(table.path(), Path::new(":memory:"));
        }
    }

    #[test]
    fn test_rejects_bad_table_names() {
        for name in ["", "ab", "1abc", "Air craft", "x\";DROP"] {
            assert!(SqliteTable::open_in_memory(name).is_err(), "{name}");
        }
        assert!(SqliteTable::open_in_memory("Fleet2024").is_ok());
    }
}
