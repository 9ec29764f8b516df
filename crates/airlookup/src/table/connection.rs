//! Azure Storage connection string parsing.

use std::collections::HashMap;
use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{Error, Result};

/// Account name used by the local storage emulator.
const EMULATOR_ACCOUNT: &str = "devstoreaccount1";

/// Published key of the local storage emulator.
const EMULATOR_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

/// Table endpoint of the local storage emulator.
const EMULATOR_TABLE_ENDPOINT: &str = "http://127.0.0.1:10002/devstoreaccount1";

/// How requests to the account are authorized.
#[derive(Clone, PartialEq, Eq)]
pub enum StorageCredentials {
    /// Shared account key, already base64-decoded.
    SharedKey(Vec<u8>),
    /// Shared access signature query string, without the leading `?`.
    Sas(String),
}

impl fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SharedKey(_) => f.write_str("SharedKey(****)"),
            Self::Sas(_) => f.write_str("Sas(****)"),
        }
    }
}

/// A storage account resolved from a connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAccount {
    /// Account name; empty for SAS-only strings with an explicit endpoint.
    pub account_name: String,
    /// Table service endpoint, without a trailing slash.
    pub table_endpoint: String,
    /// Request authorization.
    pub credentials: StorageCredentials,
}

impl StorageAccount {
    /// The local storage emulator account.
    #[must_use]
    pub fn emulator() -> Self {
        Self {
            account_name: EMULATOR_ACCOUNT.to_string(),
            table_endpoint: EMULATOR_TABLE_ENDPOINT.to_string(),
            credentials: StorageCredentials::SharedKey(
                STANDARD.decode(EMULATOR_KEY).unwrap_or_default(),
            ),
        }
    }

    /// Parse a `Key=Value;Key=Value` connection string.
    ///
    /// Keys are matched case-insensitively. Supported keys are
    /// `UseDevelopmentStorage`, `DefaultEndpointsProtocol`, `AccountName`,
    /// `AccountKey`, `SharedAccessSignature`, `TableEndpoint` and
    /// `EndpointSuffix`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionString`] if the string is malformed or lacks
    /// what is needed to reach and authorize against a table endpoint.
    pub fn parse(connection_string: &str) -> Result<Self> {
        let mut settings = HashMap::new();
        for part in connection_string.split(';').map(str::trim) {
            if part.is_empty() {
                continue;
            }
            let (key, value) = part.split_once('=').ok_or_else(|| {
                Error::connection_string(format!("malformed segment '{}'", redact(part)))
            })?;
            settings.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        if settings
            .get("usedevelopmentstorage")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            return Ok(Self::emulator());
        }

        let account_name = settings.get("accountname").cloned().unwrap_or_default();

        let credentials = if let Some(key) = settings.get("accountkey") {
            if account_name.is_empty() {
                return Err(Error::connection_string("AccountKey requires AccountName"));
            }
            StorageCredentials::SharedKey(
                STANDARD
                    .decode(key)
                    .map_err(|_| Error::connection_string("AccountKey is not valid base64"))?,
            )
        } else if let Some(sas) = settings.get("sharedaccesssignature") {
            StorageCredentials::Sas(sas.trim_start_matches('?').to_string())
        } else {
            return Err(Error::connection_string(
                "expected AccountKey or SharedAccessSignature",
            ));
        };

        let table_endpoint = if let Some(endpoint) = settings.get("tableendpoint") {
            endpoint.trim_end_matches('/').to_string()
        } else if account_name.is_empty() {
            return Err(Error::connection_string(
                "expected AccountName or TableEndpoint",
            ));
        } else {
            let protocol = settings
                .get("defaultendpointsprotocol")
                .map_or("https", String::as_str);
            let suffix = settings
                .get("endpointsuffix")
                .map_or("core.windows.net", String::as_str);
            format!("{protocol}://{account_name}.table.{suffix}")
        };

        Ok(Self {
            account_name,
            table_endpoint,
            credentials,
        })
    }
}

/// Keep only the first few characters of a segment for diagnostics.
fn redact(segment: &str) -> String {
    let head: String = segment.chars().take(4).collect();
    format!("{head}…")
}
