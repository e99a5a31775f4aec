// MIT License - Copyright (c) 2026 Peter Wright
// AlarmDecoder bridge

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::devices::system::TargetState;
use crate::error::{BridgeError, Result};

/// Top-level bridge configuration, loaded from a TOML file.
///
/// ```toml
/// [alarmdecoder]
/// key = "0123456789abcdef"
///
/// [alarmdecoder.endpoints.get]
/// method = "GET"
/// url = "http://alarmdecoder.local:5000/api/v1/alarmdecoder"
///
/// [alarmdecoder.endpoints.away]
/// method = "POST"
/// url = "http://alarmdecoder.local:5000/api/v1/alarmdecoder/send"
/// body = "12342"
///
/// [mqtt]
/// url = "mqtt://localhost:1883"
///
/// [[zones]]
/// id = "12"
/// type = "contact"
/// name = "Front Door"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    pub alarmdecoder: AlarmDecoderConfig,
    #[serde(default)]
    pub listener: ListenerConfig,
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub panel: PanelInfo,
    #[serde(default)]
    pub zones: Vec<ZoneEntry>,
}

impl BridgeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

/// AlarmDecoder REST API access.
#[derive(Debug, Clone, Deserialize)]
pub struct AlarmDecoderConfig {
    /// API key, sent verbatim in the `Authorization` header
    #[serde(default)]
    pub key: String,
    /// Upper bound for every call to the panel controller
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub endpoints: Endpoints,
}

fn default_timeout_ms() -> u64 {
    10000
}

/// One endpoint per panel operation. Missing endpoints surface as
/// [`BridgeError::ConfigurationMissing`] when the operation is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Endpoints {
    #[serde(default)]
    pub get: Option<Endpoint>,
    #[serde(default)]
    pub away: Option<Endpoint>,
    #[serde(default)]
    pub stay: Option<Endpoint>,
    #[serde(default)]
    pub night: Option<Endpoint>,
    #[serde(default)]
    pub disarm: Option<Endpoint>,
}

impl Endpoints {
    pub fn status(&self) -> Result<&Endpoint> {
        self.get.as_ref().ok_or_else(|| BridgeError::ConfigurationMissing {
            what: "alarmdecoder.endpoints.get".to_string(),
        })
    }

    pub fn for_target(&self, target: TargetState) -> Result<&Endpoint> {
        let (endpoint, name) = match target {
            TargetState::StayArm => (&self.stay, "stay"),
            TargetState::AwayArm => (&self.away, "away"),
            TargetState::NightArm => (&self.night, "night"),
            TargetState::Disarm => (&self.disarm, "disarm"),
        };
        endpoint
            .as_ref()
            .ok_or_else(|| BridgeError::ConfigurationMissing {
                what: format!("alarmdecoder.endpoints.{name}"),
            })
    }
}

/// A single control-API call.
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoint {
    #[serde(default = "default_method")]
    pub method: String,
    pub url: String,
    /// Key sequence typed on the keypad (e.g. user code followed by the arm key)
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Inbound notification listener.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    51827
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    pub url: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_subscribe_topic")]
    pub subscribe_topic: String,
    #[serde(default = "default_publish_topic")]
    pub publish_topic: String,
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_secs: u64,
}

fn default_client_id() -> String {
    "alarmdecoder-bridge".to_string()
}
fn default_subscribe_topic() -> String {
    "alarmdecoder/cmd".to_string()
}
fn default_publish_topic() -> String {
    "alarmdecoder".to_string()
}
fn default_snapshot_interval() -> u64 {
    60
}

impl MqttConfig {
    /// Parse the broker URL (`mqtt://host:port`) into (host, port).
    pub fn host_port(&self) -> Result<(String, u16)> {
        let stripped = self
            .url
            .strip_prefix("mqtt://")
            .or_else(|| self.url.strip_prefix("tcp://"))
            .unwrap_or(&self.url);

        let (host, port_str) =
            stripped
                .rsplit_once(':')
                .ok_or_else(|| BridgeError::InvalidConfig {
                    details: "MQTT URL must be in format mqtt://host:port".to_string(),
                })?;

        let port: u16 = port_str.parse().map_err(|_| BridgeError::InvalidConfig {
            details: format!("invalid MQTT port number: {port_str}"),
        })?;

        Ok((host.to_string(), port))
    }
}

/// Accessory information for the security system.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PanelInfo {
    #[serde(default = "default_panel_name")]
    pub name: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub serialnumber: String,
    #[serde(default)]
    pub firmware: String,
}

impl Default for PanelInfo {
    fn default() -> Self {
        Self {
            name: default_panel_name(),
            manufacturer: String::new(),
            model: String::new(),
            serialnumber: String::new(),
            firmware: String::new(),
        }
    }
}

fn default_panel_name() -> String {
    "Alarm System".to_string()
}

/// A `[[zones]]` entry. The type is validated when the zone registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZoneEntry {
    #[serde(deserialize_with = "deserialize_zone_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub zone_type: String,
    pub name: String,
    #[serde(default)]
    pub fullname: Option<String>,
}

/// Zone ids are compared as strings; accept `id = 12` as well as `id = "12"`.
fn deserialize_zone_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Text(s) if s.is_empty() => Err(serde::de::Error::custom("empty zone ID")),
        RawId::Text(s) => Ok(s),
        RawId::Number(n) => Ok(n.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[alarmdecoder]
key = "secret"
timeout_ms = 2500

[alarmdecoder.endpoints.get]
method = "GET"
url = "http://alarmdecoder.local:5000/api/v1/alarmdecoder"

[alarmdecoder.endpoints.disarm]
method = "POST"
url = "http://alarmdecoder.local:5000/api/v1/alarmdecoder/send"
body = "12341"

[mqtt]
url = "mqtt://broker.local:1883"

[panel]
name = "House Alarm"
manufacturer = "Honeywell"

[[zones]]
id = "012"
type = "contact"
name = "Front Door"
fullname = "FRONT DOOR"

[[zones]]
id = 7
type = "smoke"
name = "Kitchen Smoke"
"#;

    #[test]
    fn test_parse_sample() {
        let config = BridgeConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.alarmdecoder.key, "secret");
        assert_eq!(config.alarmdecoder.timeout_ms, 2500);
        assert_eq!(config.listener.port, 51827);
        assert_eq!(config.mqtt.publish_topic, "alarmdecoder");
        assert_eq!(config.panel.name, "House Alarm");
        assert_eq!(config.panel.model, "");
        assert_eq!(config.zones.len(), 2);
        assert_eq!(config.zones[0].id, "012");
        assert_eq!(config.zones[0].fullname.as_deref(), Some("FRONT DOOR"));
        assert_eq!(config.zones[1].id, "7");
        assert_eq!(config.zones[1].zone_type, "smoke");
    }

    #[test]
    fn test_endpoint_lookup() {
        let config = BridgeConfig::from_toml_str(SAMPLE).unwrap();
        let endpoints = &config.alarmdecoder.endpoints;
        assert_eq!(endpoints.status().unwrap().method, "GET");
        let disarm = endpoints.for_target(TargetState::Disarm).unwrap();
        assert_eq!(disarm.body.as_deref(), Some("12341"));

        let err = endpoints.for_target(TargetState::AwayArm).unwrap_err();
        assert!(
            matches!(err, BridgeError::ConfigurationMissing { ref what } if what == "alarmdecoder.endpoints.away")
        );
    }

    #[test]
    fn test_missing_status_endpoint() {
        let endpoints = Endpoints::default();
        assert!(matches!(
            endpoints.status(),
            Err(BridgeError::ConfigurationMissing { .. })
        ));
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::from_toml_str(
            "[alarmdecoder]\n[mqtt]\nurl = \"mqtt://localhost:1883\"\n",
        )
        .unwrap();
        assert_eq!(config.alarmdecoder.timeout_ms, 10000);
        assert!(config.alarmdecoder.key.is_empty());
        assert_eq!(config.listener.bind, "0.0.0.0");
        assert_eq!(config.mqtt.subscribe_topic, "alarmdecoder/cmd");
        assert_eq!(config.mqtt.snapshot_interval_secs, 60);
        assert_eq!(config.panel, PanelInfo::default());
        assert!(config.zones.is_empty());
    }

    #[test]
    fn test_empty_zone_id_rejected() {
        let text = "[alarmdecoder]\n[mqtt]\nurl = \"mqtt://h:1\"\n[[zones]]\nid = \"\"\ntype = \"motion\"\nname = \"x\"\n";
        assert!(matches!(
            BridgeConfig::from_toml_str(text),
            Err(BridgeError::Config(_))
        ));
    }

    #[test]
    fn test_mqtt_host_port() {
        let mqtt = |url: &str| MqttConfig {
            url: url.to_string(),
            client_id: default_client_id(),
            subscribe_topic: default_subscribe_topic(),
            publish_topic: default_publish_topic(),
            snapshot_interval_secs: 60,
        };
        assert_eq!(
            mqtt("mqtt://broker.local:1883").host_port().unwrap(),
            ("broker.local".to_string(), 1883)
        );
        assert_eq!(
            mqtt("10.0.0.5:8883").host_port().unwrap(),
            ("10.0.0.5".to_string(), 8883)
        );
        assert!(mqtt("mqtt://broker.local").host_port().is_err());
        assert!(mqtt("mqtt://broker.local:abc").host_port().is_err());
    }
}
