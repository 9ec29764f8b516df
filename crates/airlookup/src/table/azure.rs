//! Azure Table service backend.
//!
//! Talks to the table REST API directly: point reads by key, insert-or-replace
//! writes, and table creation. Requests are authorized with `SharedKeyLite`
//! or a shared access signature.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use reqwest::{header, Method, RequestBuilder, StatusCode, Url};
use ring::hmac;
use serde_json::json;
use tracing::debug;

use super::connection::{StorageAccount, StorageCredentials};
use super::TableBackend;
use crate::error::{Error, Result};
use crate::record::AircraftEntity;

const SERVICE: &str = "table service";

/// Table service REST API version.
const API_VERSION: &str = "2019-02-02";

/// OData protocol version sent with every request.
const DATA_SERVICE_VERSION: &str = "3.0;NetFx";

/// Response payload without OData annotations.
const ACCEPT_NO_METADATA: &str = "application/json;odata=nometadata";

/// A table in an Azure storage account.
#[derive(Debug)]
pub struct AzureTable {
    account: StorageAccount,
    table: String,
    http: reqwest::Client,
}

impl AzureTable {
    /// Create a backend for `table` in `account`.
    #[must_use]
    pub fn new(account: StorageAccount, table: &str) -> Self {
        Self {
            account,
            table: table.to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn resource_url(&self, resource: &str) -> Result<Url> {
        let base = Url::parse(&format!("{}/", self.account.table_endpoint))
            .map_err(|e| Error::connection_string(format!("invalid table endpoint: {e}")))?;
        let mut url = base
            .join(resource)
            .map_err(|e| Error::connection_string(format!("invalid table resource: {e}")))?;
        if let StorageCredentials::Sas(token) = &self.account.credentials {
            url.set_query(Some(token));
        }
        Ok(url)
    }

    /// URL addressing one entity by its keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured endpoint is not a valid URL.
    pub fn entity_url(&self, partition_key: &str, row_key: &str) -> Result<Url> {
        self.resource_url(&format!(
            "{}(PartitionKey='{}',RowKey='{}')",
            self.table,
            odata_literal(partition_key),
            odata_literal(row_key)
        ))
    }

    /// Build a request with the protocol headers and authorization applied.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let mut builder = self
            .http
            .request(method, url.clone())
            .header("x-ms-date", &date)
            .header("x-ms-version", API_VERSION)
            .header("DataServiceVersion", DATA_SERVICE_VERSION)
            .header("MaxDataServiceVersion", DATA_SERVICE_VERSION)
            .header(header::ACCEPT, ACCEPT_NO_METADATA);

        if let StorageCredentials::SharedKey(key) = &self.account.credentials {
            let signature = shared_key_lite_signature(key, &date, &self.account.account_name, &url);
            builder = builder.header(
                header::AUTHORIZATION,
                format!("SharedKeyLite {}:{signature}", self.account.account_name),
            );
        }
        builder
    }
}

#[async_trait]
impl TableBackend for AzureTable {
    async fn get_entity(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<AircraftEntity>> {
        let url = self.entity_url(partition_key, row_key)?;
        debug!("GET {}", url.path());

        let response = self.request(Method::GET, url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            // Either the entity or the whole table is missing.
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream(SERVICE, status.as_u16(), &body));
        }

        Ok(Some(response.json().await?))
    }

    async fn put_entity(&self, entity: &AircraftEntity) -> Result<()> {
        let url = self.entity_url(&entity.partition_key, &entity.row_key)?;
        debug!("PUT {}", url.path());

        // No If-Match header: the service inserts or replaces unconditionally.
        let response = self
            .request(Method::PUT, url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(entity)?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream(SERVICE, status.as_u16(), &body));
        }
        Ok(())
    }

    async fn ensure_table(&self) -> Result<()> {
        let url = self.resource_url("Tables")?;
        let response = self
            .request(Method::POST, url)
            .header(header::CONTENT_TYPE, "application/json")
            .header("Prefer", "return-no-content")
            .body(serde_json::to_vec(&json!({ "TableName": self.table }))?)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            debug!("Table {} already exists", self.table);
            return Ok(());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream(SERVICE, status.as_u16(), &body));
        }
        debug!("Created table {}", self.table);
        Ok(())
    }
}

/// Escape a value for use inside a quoted OData string literal.
fn odata_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Compute the `SharedKeyLite` signature for a table request.
///
/// The string to sign is the request date and the canonicalized resource:
/// the account name followed by the encoded request path.
#[must_use]
pub fn shared_key_lite_signature(key: &[u8], date: &str, account: &str, url: &Url) -> String {
    let string_to_sign = format!("{date}\n/{account}{}", url.path());
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    STANDARD.encode(hmac::sign(&key, string_to_sign.as_bytes()).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CannedResponse, CannedServer};

    fn table_for(server: &CannedServer) -> AzureTable {
        let account = StorageAccount::parse(&format!(
            "AccountName=devstoreaccount1;AccountKey=a2V5;TableEndpoint={}/devstoreaccount1",
            server.url()
        ))
        .unwrap();
        AzureTable::new(account, "Aircraft")
    }

    fn sample_entity() -> AircraftEntity {
        AircraftEntity {
            partition_key: "Aircraft".to_string(),
            row_key: "A4A3F2".to_string(),
            registration: Some("N400QX".to_string()),
            icao_aircraft_type: Some("DH8D".to_string()),
            icao_operator: None,
        }
    }

    #[test]
    fn test_entity_url() {
        let table = AzureTable::new(
            StorageAccount::parse("AccountName=pw;AccountKey=a2V5").unwrap(),
            "Aircraft",
        );
        let url = table.entity_url("Aircraft", "A4A3F2").unwrap();
        assert_eq!(
            url.as_str(),
            "https://pw.table.core.windows.net/Aircraft(PartitionKey='Aircraft',RowKey='A4A3F2')"
        );
    }

    #[test]
    fn test_entity_url_escapes_quotes() {
        let table = AzureTable::new(
            StorageAccount::parse("AccountName=pw;AccountKey=a2V5").unwrap(),
            "Aircraft",
        );
        let url = table.entity_url("O'Hare", "ABC123").unwrap();
        assert!(url.path().contains("PartitionKey='O''Hare'"));
    }

    #[test]
    fn test_entity_url_appends_sas() {
        let account = StorageAccount::parse(
            "TableEndpoint=https://pw.table.core.windows.net;SharedAccessSignature=sv=2019-02-02&sig=abc",
        )
        .unwrap();
        let table = AzureTable::new(account, "Aircraft");
        let url = table.entity_url("Aircraft", "ABC123").unwrap();
        assert_eq!(url.query(), Some("sv=2019-02-02&sig=abc"));
    }

    #[test]
    fn test_signature_is_deterministic() {
        let url = Url::parse("https://pw.table.core.windows.net/Aircraft").unwrap();
        let date = "Mon, 01 Jan 2024 00:00:00 GMT";
        let first = shared_key_lite_signature(b"key", date, "pw", &url);
        let second = shared_key_lite_signature(b"key", date, "pw", &url);
        let other = shared_key_lite_signature(b"other", date, "pw", &url);

        assert_eq!(first, second);
        assert_ne!(first, other);
        // 32-byte HMAC-SHA256 tag in base64
        assert_eq!(first.len(), 44);
    }

    #[tokio::test]
    async fn test_get_entity_found() {
        let server = CannedServer::start(vec![CannedResponse::json(
            200,
            r#"{"PartitionKey":"Aircraft","RowKey":"A4A3F2","Timestamp":"2024-01-01T00:00:00Z","Registration":"N400QX","IcaoAircraftType":"DH8D"}"#,
        )])
        .await;
        let table = table_for(&server);

        let entity = table.get_entity("Aircraft", "A4A3F2").await.unwrap();
        assert_eq!(entity, Some(sample_entity()));

        let request = server.requests()[0].to_ascii_lowercase();
        assert!(request.starts_with(
            "get /devstoreaccount1/aircraft(partitionkey='aircraft',rowkey='a4a3f2') "
        ));
        assert!(request.contains("authorization: sharedkeylite devstoreaccount1:"));
        assert!(request.contains("x-ms-version: 2019-02-02"));
        assert!(request.contains("accept: application/json;odata=nometadata"));
    }

    #[tokio::test]
    async fn test_get_entity_missing() {
        let server = CannedServer::start(vec![CannedResponse::json(
            404,
            r#"{"odata.error":{"code":"ResourceNotFound"}}"#,
        )])
        .await;
        let table = table_for(&server);

        assert!(table.get_entity("Aircraft", "FFFFFF").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_entity_forbidden_is_error() {
        let server = CannedServer::start(vec![CannedResponse::json(403, "denied")]).await;
        let table = table_for(&server);

        let err = table.get_entity("Aircraft", "A4A3F2").await.unwrap_err();
        assert!(matches!(err, Error::UpstreamStatus { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_put_entity_sends_full_row() {
        let server = CannedServer::start(vec![CannedResponse::json(204, "")]).await;
        let table = table_for(&server);

        table.put_entity(&sample_entity()).await.unwrap();

        let request = &server.requests()[0];
        assert!(request.starts_with("PUT /devstoreaccount1/Aircraft(PartitionKey='Aircraft',RowKey='A4A3F2') "));
        assert!(!request.to_ascii_lowercase().contains("if-match"));
        assert!(request.contains(r#""Registration":"N400QX""#));
        assert!(request.contains(r#""IcaoAircraftType":"DH8D""#));
        assert!(!request.contains("IcaoOperator"));
    }

    #[tokio::test]
    async fn test_ensure_table_tolerates_conflict() {
        let server = CannedServer::start(vec![
            CannedResponse::json(204, ""),
            CannedResponse::json(409, r#"{"odata.error":{"code":"TableAlreadyExists"}}"#),
        ])
        .await;
        let table = table_for(&server);

        table.ensure_table().await.unwrap();
        table.ensure_table().await.unwrap();

        let requests = server.requests();
        assert!(requests[0].starts_with("POST /devstoreaccount1/Tables "));
        assert!(requests[0].contains(r#""TableName":"Aircraft""#));
    }
}
