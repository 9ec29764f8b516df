//! Secret resolution for the table connection string.
//!
//! Failures never propagate from [`SecretResolver::resolve`]: they are logged
//! and turned into `None`, leaving the caller to decide whether that is fatal.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::credential::TokenCredential;
use crate::error::{Error, Result};

/// Token scope for the key vault data plane.
const VAULT_SCOPE: &str = "https://vault.azure.net/.default";

/// Key vault REST API version.
const VAULT_API_VERSION: &str = "7.4";

/// A store of named secrets.
#[async_trait]
pub trait SecretSource: Send + Sync + fmt::Debug {
    /// Human-readable location of this source, for diagnostics.
    fn location(&self) -> String;

    /// Read one secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret cannot be read for any reason.
    async fn get_secret(&self, name: &str) -> Result<String>;
}

#[derive(Deserialize)]
struct SecretBundle {
    value: String,
}

/// Reads secrets from an Azure key vault.
#[derive(Debug)]
pub struct KeyVaultSecrets {
    vault_url: String,
    credential: Arc<dyn TokenCredential>,
    http: reqwest::Client,
}

impl KeyVaultSecrets {
    /// Create a client for the vault at `vault_url`.
    #[must_use]
    pub fn new(vault_url: &str, credential: Arc<dyn TokenCredential>) -> Self {
        Self {
            vault_url: vault_url.trim_end_matches('/').to_string(),
            credential,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SecretSource for KeyVaultSecrets {
    fn location(&self) -> String {
        self.vault_url.clone()
    }

    async fn get_secret(&self, name: &str) -> Result<String> {
        let token = self.credential.get_token(VAULT_SCOPE).await?;
        let url = format!("{}/secrets/{name}", self.vault_url);
        debug!("GET {url}");

        let response = self
            .http
            .get(&url)
            .query(&[("api-version", VAULT_API_VERSION)])
            .bearer_auth(token.secret())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream("key vault", status.as_u16(), &body));
        }

        let bundle: SecretBundle = response.json().await?;
        Ok(bundle.value)
    }
}

/// A secret supplied directly through configuration.
#[derive(Clone)]
pub struct StaticSecret(String);

impl StaticSecret {
    /// Wrap a configured value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Debug for StaticSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticSecret(****)")
    }
}

#[async_trait]
impl SecretSource for StaticSecret {
    fn location(&self) -> String {
        "configuration".to_string()
    }

    async fn get_secret(&self, _name: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Resolves secrets with soft-failure semantics.
#[derive(Debug)]
pub struct SecretResolver {
    source: Box<dyn SecretSource>,
}

impl SecretResolver {
    /// Create a resolver over `source`.
    #[must_use]
    pub fn new(source: Box<dyn SecretSource>) -> Self {
        Self { source }
    }

    /// Where secrets are read from.
    #[must_use]
    pub fn location(&self) -> String {
        self.source.location()
    }

    /// Read `name`, logging a warning and returning `None` on any failure.
    pub async fn resolve(&self, name: &str) -> Option<String> {
        match self.source.get_secret(name).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    "Could not read secret '{name}' from {}: {e}",
                    self.source.location()
                );
                None
            }
        }
    }

    /// Read `name`, treating a missing secret as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SecretUnavailable`] if [`Self::resolve`] yields `None`.
    pub async fn require(&self, name: &str) -> Result<String> {
        self.resolve(name)
            .await
            .ok_or_else(|| Error::SecretUnavailable {
                name: name.to_string(),
                source_name: self.location(),
            })
    }
}
