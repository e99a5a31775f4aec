// MIT License - Copyright (c) 2026 Peter Wright
// AlarmDecoder bridge
//
//! # alarmdecoder-bridge
//!
//! Bridges an AlarmDecoder-connected security panel to home-automation
//! accessories: one security system plus contact, motion, carbon monoxide
//! and smoke sensors.
//!
//! AlarmDecoder pushes human-readable notifications ("Zone Front Door (12)
//! has been faulted.") to the [`NotificationListener`]. Each one is parsed
//! into a [`NotificationEvent`] and applied by the [`Reconciler`], which
//! re-reads the panel through [`PanelApi`] when needed and publishes
//! accessory state through an [`AccessorySink`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use alarmdecoder_bridge::{
//!     notification_channel, AlarmDecoderClient, BridgeConfig, NotificationListener,
//!     Reconciler, ZoneRegistry,
//! };
//! use alarmdecoder_bridge::mqtt::MqttSink;
//! use rumqttc::{AsyncClient, MqttOptions};
//! use tokio::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BridgeConfig::load("config.toml")?;
//!     let (host, port) = config.mqtt.host_port()?;
//!     let (client, _eventloop) = AsyncClient::new(MqttOptions::new("bridge", host, port), 64);
//!
//!     let reconciler = Reconciler::new(
//!         AlarmDecoderClient::new(&config.alarmdecoder)?,
//!         MqttSink::new(client, &config.mqtt.publish_topic),
//!         ZoneRegistry::from_config(&config.zones),
//!         Duration::from_millis(config.alarmdecoder.timeout_ms),
//!     );
//!
//!     let (tx, mut rx) = notification_channel(64);
//!     let listener =
//!         NotificationListener::bind(&config.listener.bind, config.listener.port, tx).await?;
//!     tokio::spawn(listener.run());
//!
//!     while let Some(event) = rx.recv().await {
//!         if let Err(e) = reconciler.handle_event(event).await {
//!             eprintln!("notification failed: {e}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod devices;
pub mod error;
pub mod event;
pub mod mqtt;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use bridge::{AccessorySink, Reconciler};
pub use config::{BridgeConfig, PanelInfo, ZoneEntry};
pub use devices::registry::ZoneRegistry;
pub use devices::system::{PanelState, PanelStatusFlags, RawPanelStatus, TargetState};
pub use devices::zone::{ZoneDescriptor, ZoneType, ZoneValue};
pub use error::{BridgeError, Result};
pub use event::{notification_channel, NotificationEvent, NotificationReceiver, NotificationSender};
pub use protocol::parse_notification;
pub use transport::{AlarmDecoderClient, NotificationListener, PanelApi};
