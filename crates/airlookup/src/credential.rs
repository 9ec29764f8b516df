//! Ambient cloud credentials.
//!
//! A small default chain: service principal from the environment, then the
//! managed identity endpoint, then the Azure CLI. The first source that yields
//! a token wins.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Public cloud login host.
const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Managed identity token endpoint on Azure hosts.
const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// A bearer token for one scope.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token value.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(****)")
    }
}

/// A source of bearer tokens.
#[async_trait]
pub trait TokenCredential: Send + Sync + fmt::Debug {
    /// The name of this source (for logging/debugging).
    fn name(&self) -> &'static str;

    /// Obtain a token for `scope`, e.g. `https://vault.azure.net/.default`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot produce a token.
    async fn get_token(&self, scope: &str) -> Result<AccessToken>;
}

#[derive(Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
}

/// Service principal credential read from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`
/// and `AZURE_CLIENT_SECRET`.
#[derive(Debug)]
pub struct EnvironmentCredential {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority_host: String,
    http: reqwest::Client,
}

impl EnvironmentCredential {
    /// Create a credential with explicit values.
    #[must_use]
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        authority_host: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority_host: authority_host.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Read the credential from the environment, if all variables are set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Some(Self::new(
            var("AZURE_TENANT_ID")?,
            var("AZURE_CLIENT_ID")?,
            var("AZURE_CLIENT_SECRET")?,
            var("AZURE_AUTHORITY_HOST").unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
        ))
    }
}

#[async_trait]
impl TokenCredential for EnvironmentCredential {
    fn name(&self) -> &'static str {
        "environment"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host, self.tenant_id
        );
        let response = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", scope),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream("token endpoint", status.as_u16(), &body));
        }

        let token: OAuthTokenResponse = response.json().await?;
        Ok(AccessToken::new(token.access_token))
    }
}

/// Managed identity credential using the instance metadata endpoint.
#[derive(Debug)]
pub struct ManagedIdentityCredential {
    endpoint: String,
    http: reqwest::Client,
}

impl ManagedIdentityCredential {
    /// Create a credential against the standard metadata endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_endpoint(IMDS_ENDPOINT)
    }

    /// Create a credential against a custom token endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self> {
        // Off Azure the endpoint never answers; keep the probe short.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    fn name(&self) -> &'static str {
        "managed identity"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let resource = scope.trim_end_matches("/.default");
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("api-version", "2018-02-01"), ("resource", resource)])
            .header("Metadata", "true")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream(
                "managed identity endpoint",
                status.as_u16(),
                &body,
            ));
        }

        let token: OAuthTokenResponse = response.json().await?;
        Ok(AccessToken::new(token.access_token))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenResponse {
    access_token: String,
}

/// Credential borrowed from a logged-in Azure CLI session.
#[derive(Debug, Default)]
pub struct AzureCliCredential;

#[async_trait]
impl TokenCredential for AzureCliCredential {
    fn name(&self) -> &'static str {
        "azure cli"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let output = tokio::process::Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--output",
                "json",
                "--scope",
                scope,
            ])
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::credential(format!(
                "az exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let token: CliTokenResponse = serde_json::from_slice(&output.stdout)?;
        Ok(AccessToken::new(token.access_token))
    }
}

/// Tries each credential in order and returns the first token obtained.
#[derive(Debug)]
pub struct DefaultCredentialChain {
    sources: Vec<Box<dyn TokenCredential>>,
}

impl DefaultCredentialChain {
    /// Build the standard chain for this environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let mut sources: Vec<Box<dyn TokenCredential>> = Vec::new();
        if let Some(env) = EnvironmentCredential::from_env() {
            sources.push(Box::new(env));
        }
        sources.push(Box::new(ManagedIdentityCredential::new()?));
        sources.push(Box::new(AzureCliCredential));
        Ok(Self { sources })
    }

    /// Build a chain from explicit sources.
    #[must_use]
    pub fn from_sources(sources: Vec<Box<dyn TokenCredential>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl TokenCredential for DefaultCredentialChain {
    fn name(&self) -> &'static str {
        "default chain"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let mut failures = Vec::new();
        for source in &self.sources {
            match source.get_token(scope).await {
                Ok(token) => {
                    debug!("Obtained token from {} credential", source.name());
                    return Ok(token);
                }
                Err(e) => {
                    debug!("{} credential unavailable: {e}", source.name());
                    failures.push(format!("{}: {e}", source.name()));
                }
            }
        }
        Err(Error::credential(if failures.is_empty() {
            "no credential sources configured".to_string()
        } else {
            failures.join("; ")
        }))
    }
}
