// MIT License - Copyright (c) 2026 Peter Wright
// AlarmDecoder REST API client

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::Serialize;
use tokio::time::Duration;
use tracing::{debug, error, info};

use crate::config::{AlarmDecoderConfig, Endpoint, Endpoints};
use crate::devices::system::{RawPanelStatus, TargetState};
use crate::error::{BridgeError, Result};
use crate::transport::PanelApi;

/// Body of a keypad command: `{"keys": "<code><key>"}`.
#[derive(Debug, Serialize)]
struct KeysBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    keys: Option<&'a str>,
}

/// REST client for the AlarmDecoder web API.
///
/// Every request carries the configured key in the `Authorization` header
/// and JSON content/accept headers.
#[derive(Debug, Clone)]
pub struct AlarmDecoderClient {
    http: Client,
    key: String,
    endpoints: Endpoints,
}

impl AlarmDecoderClient {
    pub fn new(config: &AlarmDecoderConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            http,
            key: config.key.clone(),
            endpoints: config.endpoints.clone(),
        })
    }

    /// Issue a call and fail on transport errors or non-2xx statuses.
    async fn call(&self, endpoint: &Endpoint, body: String) -> Result<reqwest::Response> {
        let method = Method::from_bytes(endpoint.method.to_uppercase().as_bytes()).map_err(|_| {
            BridgeError::InvalidConfig {
                details: format!("invalid HTTP method: {}", endpoint.method),
            }
        })?;

        debug!("{} {} {}", method, endpoint.url, body);
        let response = self
            .http
            .request(method.clone(), &endpoint.url)
            .header(AUTHORIZATION, &self.key)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!("Failed: {} {} [0] {}", method, endpoint.url, e);
                BridgeError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Failed: {} {} [{}]", method, endpoint.url, status.as_u16());
            return Err(BridgeError::HttpStatus {
                method: method.to_string(),
                url: endpoint.url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

impl PanelApi for AlarmDecoderClient {
    async fn read_status(&self) -> Result<RawPanelStatus> {
        let endpoint = self.endpoints.status()?;
        let response = self.call(endpoint, String::new()).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| BridgeError::InvalidResponse {
            details: format!("status body: {e}"),
        })
    }

    async fn send_command(&self, target: TargetState) -> Result<()> {
        let endpoint = self.endpoints.for_target(target)?;
        let body = serde_json::to_string(&KeysBody {
            keys: endpoint.body.as_deref(),
        })
        .map_err(|e| BridgeError::InvalidConfig {
            details: format!("keys body: {e}"),
        })?;
        self.call(endpoint, body).await?;
        info!("Panel command sent: {}", target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_body() {
        let body = serde_json::to_string(&KeysBody { keys: Some("12343") }).unwrap();
        assert_eq!(body, r#"{"keys":"12343"}"#);
        let body = serde_json::to_string(&KeysBody { keys: None }).unwrap();
        assert_eq!(body, "{}");
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_configuration_error() {
        let config = AlarmDecoderConfig {
            key: "secret".to_string(),
            timeout_ms: 1000,
            endpoints: Endpoints::default(),
        };
        let client = AlarmDecoderClient::new(&config).unwrap();
        assert!(matches!(
            client.read_status().await,
            Err(BridgeError::ConfigurationMissing { .. })
        ));
        assert!(matches!(
            client.send_command(TargetState::NightArm).await,
            Err(BridgeError::ConfigurationMissing { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_method_rejected() {
        let config = AlarmDecoderConfig {
            key: String::new(),
            timeout_ms: 1000,
            endpoints: Endpoints {
                get: Some(Endpoint {
                    method: "GE T".to_string(),
                    url: "http://127.0.0.1:9/api".to_string(),
                    body: None,
                }),
                ..Endpoints::default()
            },
        };
        let client = AlarmDecoderClient::new(&config).unwrap();
        assert!(matches!(
            client.read_status().await,
            Err(BridgeError::InvalidConfig { .. })
        ));
    }
}
