// MIT License - Copyright (c) 2026 Peter Wright
// MQTT wire format and accessory sink

use chrono::Utc;
use rumqttc::{AsyncClient, QoS};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::bridge::{AccessorySink, Reconciler};
use crate::config::PanelInfo;
use crate::devices::system::{PanelState, TargetState};
use crate::devices::zone::{ZoneDescriptor, ZoneValue};
use crate::error::{BridgeError, Result};
use crate::transport::PanelApi;

// Published messages share a flat {now, op, ...} structure

#[derive(Debug, Clone, Serialize)]
pub struct PanelStateMessage {
    pub now: u64,
    pub op: String,
    pub state: String,
    pub value: u8,
}

impl PanelStateMessage {
    pub fn new(state: PanelState) -> Self {
        Self {
            now: now_epoch_ms(),
            op: "PANEL_STATE".to_string(),
            state: state.as_str().to_string(),
            value: state.hap_value(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ZoneStateMessage {
    pub now: u64,
    pub op: String,
    pub zone: String,
    pub name: String,
    #[serde(rename = "type")]
    pub zone_type: String,
    pub state: String,
    pub value: u8,
}

impl ZoneStateMessage {
    pub fn new(zone: &ZoneDescriptor, value: ZoneValue) -> Self {
        Self {
            now: now_epoch_ms(),
            op: "ZONE_STATE".to_string(),
            zone: zone.id.clone(),
            name: zone.name.clone(),
            zone_type: zone.zone_type.as_str().to_string(),
            state: value.as_str().to_string(),
            value: value.hap_value(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotMessage {
    pub now: u64,
    pub op: String,
    pub panel: PanelInfo,
    pub state: SnapshotState,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotState {
    /// `null` until the panel has been read successfully
    pub panel: Option<SnapshotPanel>,
    pub zones: Vec<SnapshotZone>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotPanel {
    pub state: String,
    pub value: u8,
}

impl From<PanelState> for SnapshotPanel {
    fn from(state: PanelState) -> Self {
        Self {
            state: state.as_str().to_string(),
            value: state.hap_value(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotZone {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub zone_type: String,
    pub faulted: bool,
    pub state: String,
    pub value: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct CmdAck {
    pub now: u64,
    pub op: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Inbound command (subscribed)
#[derive(Debug, Clone, Deserialize)]
pub struct MqttCommand {
    pub op: String,
    #[serde(default)]
    pub state: Option<String>,
}

pub fn now_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

pub async fn publish_json(
    client: &AsyncClient,
    topic: &str,
    payload: &impl Serialize,
    retain: bool,
) -> Result<()> {
    let json = serde_json::to_string(payload).map_err(|e| BridgeError::Sink {
        details: format!("failed to serialize MQTT payload: {e}"),
    })?;
    client
        .publish(topic, QoS::AtLeastOnce, retain, json)
        .await
        .map_err(|e| {
            error!("Failed to publish to {topic}: {e}");
            BridgeError::Sink {
                details: format!("publish to {topic}: {e}"),
            }
        })
}

/// Publishes accessory state as retained MQTT messages.
#[derive(Clone)]
pub struct MqttSink {
    client: AsyncClient,
    topic: String,
}

impl MqttSink {
    pub fn new(client: AsyncClient, topic: impl Into<String>) -> Self {
        Self {
            client,
            topic: topic.into(),
        }
    }
}

impl AccessorySink for MqttSink {
    async fn publish_panel_state(&self, state: PanelState) -> Result<()> {
        publish_json(&self.client, &self.topic, &PanelStateMessage::new(state), true).await
    }

    async fn publish_zone_state(&self, zone: &ZoneDescriptor, value: ZoneValue) -> Result<()> {
        publish_json(
            &self.client,
            &self.topic,
            &ZoneStateMessage::new(zone, value),
            true,
        )
        .await
    }
}

pub async fn build_snapshot<A, S>(reconciler: &Reconciler<A, S>, panel: &PanelInfo) -> SnapshotMessage
where
    A: PanelApi,
    S: AccessorySink,
{
    let zones = reconciler
        .zone_snapshot()
        .await
        .into_iter()
        .map(|(zone, faulted)| {
            let value = zone.zone_type.encode(faulted);
            SnapshotZone {
                id: zone.id.clone(),
                name: zone.name.clone(),
                zone_type: zone.zone_type.as_str().to_string(),
                faulted,
                state: value.as_str().to_string(),
                value: value.hap_value(),
            }
        })
        .collect();

    SnapshotMessage {
        now: now_epoch_ms(),
        op: "SNAPSHOT".to_string(),
        panel: panel.clone(),
        state: SnapshotState {
            panel: reconciler.panel_state().await.map(SnapshotPanel::from),
            zones,
        },
    }
}

/// Result of executing one inbound command, before it is acknowledged.
#[derive(Debug, Clone)]
pub struct CommandReply {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    /// Set by `SNAPSHOT`; the caller publishes it retained as well.
    pub snapshot: Option<SnapshotMessage>,
}

impl CommandReply {
    fn ok(data: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            data,
            error: None,
            snapshot: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            snapshot: None,
        }
    }

    pub fn into_ack(self, src: Option<serde_json::Value>) -> CmdAck {
        CmdAck {
            now: now_epoch_ms(),
            op: "CMD_ACK".to_string(),
            success: self.success,
            src,
            data: self.data,
            error: self.error,
        }
    }
}

fn state_data(state: PanelState) -> Option<serde_json::Value> {
    serde_json::to_value(SnapshotPanel::from(state)).ok()
}

pub async fn execute_command<A, S>(
    cmd: &MqttCommand,
    reconciler: &Reconciler<A, S>,
    panel: &PanelInfo,
) -> CommandReply
where
    A: PanelApi,
    S: AccessorySink,
{
    match cmd.op.as_str() {
        "PING" => {
            info!("Command: PING");
            CommandReply::ok(None)
        }

        "SNAPSHOT" => {
            let snapshot = build_snapshot(reconciler, panel).await;
            let mut reply = CommandReply::ok(serde_json::to_value(&snapshot).ok());
            reply.snapshot = Some(snapshot);
            reply
        }

        "GET_STATE" => match reconciler.resolve().await {
            Ok(state) => {
                info!("Command: GET_STATE -> {state}");
                CommandReply::ok(state_data(state))
            }
            Err(e) => CommandReply::failed(e.to_string()),
        },

        "SET_TARGET_STATE" => {
            let Some(requested) = cmd.state.as_deref() else {
                warn!("SET_TARGET_STATE: missing state");
                return CommandReply::failed("missing state");
            };
            let Some(target) = TargetState::from_name(requested) else {
                warn!("SET_TARGET_STATE: unknown state {requested}");
                return CommandReply::failed(format!("unknown target state: {requested}"));
            };
            match reconciler.set_target_state(target).await {
                Ok(state) => {
                    info!("Command: SET_TARGET_STATE {target} -> {state}");
                    CommandReply::ok(state_data(state))
                }
                Err(e) => CommandReply::failed(e.to_string()),
            }
        }

        other => {
            warn!("Unknown command: {other}");
            CommandReply::failed(format!("unknown command: {other}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::zone::ZoneType;
    use serde_json::json;

    #[test]
    fn test_panel_state_message() {
        let msg = PanelStateMessage::new(PanelState::NightArm);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["op"], "PANEL_STATE");
        assert_eq!(value["state"], "NIGHT_ARM");
        assert_eq!(value["value"], 2);
        assert!(value["now"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_zone_state_message() {
        let zone = ZoneDescriptor::new("012", ZoneType::Contact, "Back Door");
        let msg = ZoneStateMessage::new(&zone, ZoneType::Contact.encode(true));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["zone"], "012");
        assert_eq!(value["type"], "contact");
        assert_eq!(value["state"], "not detected");
        assert_eq!(value["value"], 1);
    }

    #[test]
    fn test_ack_skips_empty_fields() {
        let ack = CommandReply::ok(None).into_ack(None);
        let value = serde_json::to_value(&ack).unwrap();
        assert_eq!(value["op"], "CMD_ACK");
        assert_eq!(value["success"], true);
        assert!(value.get("src").is_none());
        assert!(value.get("data").is_none());
        assert!(value.get("error").is_none());

        let ack = CommandReply::failed("nope").into_ack(Some(json!({"op": "X"})));
        let value = serde_json::to_value(&ack).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "nope");
        assert_eq!(value["src"]["op"], "X");
    }

    #[test]
    fn test_command_parse() {
        let cmd: MqttCommand =
            serde_json::from_str(r#"{"op":"SET_TARGET_STATE","state":"AWAY_ARM"}"#).unwrap();
        assert_eq!(cmd.op, "SET_TARGET_STATE");
        assert_eq!(cmd.state.as_deref(), Some("AWAY_ARM"));
        let cmd: MqttCommand = serde_json::from_str(r#"{"op":"PING","op_id":"1"}"#).unwrap();
        assert_eq!(cmd.state, None);
    }
}
