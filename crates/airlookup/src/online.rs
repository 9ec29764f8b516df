//! Online aircraft metadata lookup.
//!
//! Queries a public REST service for a single aircraft by ICAO24 address.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::{OnlineConfig, ICAO24_PLACEHOLDER};
use crate::error::{Error, Result};
use crate::record::Icao24;

const SERVICE: &str = "metadata service";

/// Metadata returned by the online service.
///
/// Every field is optional; the service omits what it does not know.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OnlineMetadata {
    /// Transponder address as reported by the service.
    pub icao24: Option<String>,
    /// Registration mark.
    pub registration: Option<String>,
    /// ICAO aircraft type designator.
    pub typecode: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// ICAO manufacturer code.
    pub manufacturericao: Option<String>,
    /// Operator name.
    pub operator: Option<String>,
    /// Manufacturer serial number.
    pub serialnumber: Option<String>,
}

impl OnlineMetadata {
    /// Extract the known fields from a response body.
    ///
    /// Non-string scalars are kept in their JSON text form; `null` and missing
    /// keys become `None`.
    #[must_use]
    pub fn from_json(body: &Value) -> Self {
        let field = |key: &str| match body.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        Self {
            icao24: field("icao24"),
            registration: field("registration"),
            typecode: field("typecode"),
            model: field("model"),
            manufacturericao: field("manufacturericao"),
            operator: field("operator"),
            serialnumber: field("serialnumber"),
        }
    }

    /// The seven displayed fields, labelled, in display order.
    #[must_use]
    pub fn labelled_fields(&self) -> [(&'static str, Option<&str>); 7] {
        [
            ("ICAO24", self.icao24.as_deref()),
            ("Registration", self.registration.as_deref()),
            ("ICAO Type", self.typecode.as_deref()),
            ("Model", self.model.as_deref()),
            ("Manufacturer", self.manufacturericao.as_deref()),
            ("Operator", self.operator.as_deref()),
            ("Serial", self.serialnumber.as_deref()),
        ]
    }
}

/// Client for the online metadata service.
#[derive(Debug, Clone)]
pub struct OnlineLookupClient {
    http: reqwest::Client,
    url_template: String,
}

impl OnlineLookupClient {
    /// Create a client with the configured endpoint and timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &OnlineConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            url_template: config.url_template.clone(),
        })
    }

    /// The request URL for an aircraft.
    #[must_use]
    pub fn url_for(&self, icao24: &Icao24) -> String {
        self.url_template
            .replace(ICAO24_PLACEHOLDER, &icao24.query_form())
    }

    /// Look up one aircraft.
    ///
    /// Returns `Ok(None)` when the service answers 404.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, any other non-success status, or
    /// a body that is not JSON.
    pub async fn lookup(&self, icao24: &Icao24) -> Result<Option<OnlineMetadata>> {
        let url = self.url_for(icao24);
        debug!("GET {url}");

        let response = self.http.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            debug!("{SERVICE} has no entry for {icao24}");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream(SERVICE, status.as_u16(), &body));
        }

        let body: Value = response.json().await?;
        Ok(Some(OnlineMetadata::from_json(&body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CannedResponse, CannedServer};

    fn client_for(server: &CannedServer) -> OnlineLookupClient {
        OnlineLookupClient::new(&OnlineConfig {
            url_template: format!("{}/api/metadata/aircraft/icao/{{icao24}}", server.url()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_url_uses_lowercase_address() {
        let client = OnlineLookupClient::new(&OnlineConfig::default()).unwrap();
        let icao = Icao24::parse("A4A3F2").unwrap();
        assert_eq!(
            client.url_for(&icao),
            "https://opensky-network.org/api/metadata/aircraft/icao/a4a3f2"
        );
    }

    #[test]
    fn test_from_json_missing_fields() {
        let body = serde_json::json!({
            "icao24": "a4a3f2",
            "registration": "N400QX",
            "typecode": null,
            "serialnumber": 12345
        });
        let meta = OnlineMetadata::from_json(&body);

        assert_eq!(meta.icao24.as_deref(), Some("a4a3f2"));
        assert_eq!(meta.registration.as_deref(), Some("N400QX"));
        assert!(meta.typecode.is_none());
        assert!(meta.model.is_none());
        assert_eq!(meta.serialnumber.as_deref(), Some("12345"));
    }

    #[test]
    fn test_labelled_fields_order() {
        let labels: Vec<_> = OnlineMetadata::default()
            .labelled_fields()
            .iter()
            .map(|(label, _)| *label)
            .collect();
        assert_eq!(
            labels,
            [
                "ICAO24",
                "Registration",
                "ICAO Type",
                "Model",
                "Manufacturer",
                "Operator",
                "Serial"
            ]
        );
    }

    #[tokio::test]
    async fn test_lookup_success() {
        let server = CannedServer::start(vec![CannedResponse::json(
            200,
            r#"{"icao24":"a4a3f2","registration":"N400QX","typecode":"DH8D","model":"Dash 8","manufacturericao":"BOMBARDIER","operator":"Horizon","serialnumber":"4123"}"#,
        )])
        .await;
        let client = client_for(&server);

        let meta = client
            .lookup(&Icao24::parse("A4A3F2").unwrap())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(meta.typecode.as_deref(), Some("DH8D"));
        assert_eq!(meta.operator.as_deref(), Some("Horizon"));

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with("GET /api/metadata/aircraft/icao/a4a3f2 "));
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let server = CannedServer::start(vec![CannedResponse::json(404, "")]).await;
        let client = client_for(&server);

        let result = client.lookup(&Icao24::parse("000001").unwrap()).await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_lookup_server_error() {
        let server = CannedServer::start(vec![CannedResponse::json(500, "boom")]).await;
        let client = client_for(&server);

        let err = client
            .lookup(&Icao24::parse("000001").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UpstreamStatus { status: 500, .. }));
    }
}
