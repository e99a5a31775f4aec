// MIT License - Copyright (c) 2026 Peter Wright
// Reconciliation between AlarmDecoder notifications and published accessory state

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

use crate::devices::registry::ZoneRegistry;
use crate::devices::system::{PanelState, PanelStatusFlags, RawPanelStatus, TargetState};
use crate::devices::zone::{ZoneDescriptor, ZoneType, ZoneValue};
use crate::error::{BridgeError, Result};
use crate::event::{NotificationEvent, NotificationReceiver};
use crate::protocol::parse_notification;
use crate::transport::PanelApi;

/// Where resolved accessory state is published.
///
/// [`crate::mqtt::MqttSink`] publishes retained MQTT messages. Descriptor
/// lookups are not part of the sink; they are served by [`ZoneRegistry`].
pub trait AccessorySink: Send + Sync {
    fn publish_panel_state(&self, state: PanelState) -> impl Future<Output = Result<()>> + Send;

    fn publish_zone_state(
        &self,
        zone: &ZoneDescriptor,
        value: ZoneValue,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl<T: AccessorySink> AccessorySink for Arc<T> {
    fn publish_panel_state(&self, state: PanelState) -> impl Future<Output = Result<()>> + Send {
        (**self).publish_panel_state(state)
    }

    fn publish_zone_state(
        &self,
        zone: &ZoneDescriptor,
        value: ZoneValue,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).publish_zone_state(zone, value)
    }
}

#[derive(Debug, Default)]
struct PanelCell {
    state: Option<PanelState>,
    flags: Option<PanelStatusFlags>,
}

/// Keeps the published panel and zone state in line with the panel.
///
/// Panel state is only ever set from a successful status read, never from
/// a requested target. All read-then-publish sequences for the panel run
/// under one lock so publishes follow the order of reads.
pub struct Reconciler<A, S> {
    api: A,
    sink: S,
    registry: ZoneRegistry,
    call_timeout: Duration,
    panel: Mutex<PanelCell>,
    zone_states: RwLock<HashMap<String, bool>>,
}

impl<A: PanelApi, S: AccessorySink> Reconciler<A, S> {
    pub fn new(api: A, sink: S, registry: ZoneRegistry, call_timeout: Duration) -> Self {
        let zone_states = registry
            .iter()
            .map(|zone| (zone.id.clone(), false))
            .collect();
        Self {
            api,
            sink,
            registry,
            call_timeout,
            panel: Mutex::new(PanelCell::default()),
            zone_states: RwLock::new(zone_states),
        }
    }

    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    /// Last successfully resolved panel state, if any.
    pub async fn panel_state(&self) -> Option<PanelState> {
        self.panel.lock().await.state
    }

    pub async fn zone_state(&self, id: &str) -> Option<bool> {
        self.zone_states.read().await.get(id).copied()
    }

    /// Every registered zone with its current faulted flag, in config order.
    pub async fn zone_snapshot(&self) -> Vec<(&ZoneDescriptor, bool)> {
        let states = self.zone_states.read().await;
        self.registry
            .iter()
            .map(|zone| (zone, states.get(&zone.id).copied().unwrap_or(false)))
            .collect()
    }

    async fn bounded<T>(&self, operation: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        timeout(self.call_timeout, call)
            .await
            .map_err(|_| BridgeError::Timeout {
                operation: operation.to_string(),
                timeout_ms: self.call_timeout.as_millis() as u64,
            })?
    }

    async fn read_status(&self) -> Result<RawPanelStatus> {
        self.bounded("read panel status", self.api.read_status())
            .await
            .inspect_err(|e| warn!("Failed to read panel status: {}", e))
    }

    /// Query the panel and return its current state without publishing.
    pub async fn resolve(&self) -> Result<PanelState> {
        let status = self.read_status().await?;
        let state = PanelState::from_flags(status.flags());
        debug!("Resolved panel state: {}", state);
        Ok(state)
    }

    /// Query the panel, publish the result and store it.
    ///
    /// The stored state only changes once the publish succeeded, so it is
    /// always the last published state. On a failed read nothing is published.
    pub async fn sync_panel_state(&self) -> Result<PanelState> {
        let mut cell = self.panel.lock().await;

        let status = self.read_status().await?;
        let flags = status.flags();
        if let Some(old) = cell.flags {
            let changed = PanelStatusFlags::changed(old, flags);
            if !changed.is_empty() {
                let set = PanelStatusFlags::set_event_names(changed, flags);
                let unset = PanelStatusFlags::unset_event_names(changed, flags);
                info!("Panel status changed: +{:?} -{:?}", set, unset);
            }
        }

        let state = PanelState::from_flags(flags);
        self.bounded("publish panel state", self.sink.publish_panel_state(state))
            .await
            .inspect_err(|e| warn!("Failed to publish panel state {}: {}", state, e))?;

        if cell.state != Some(state) {
            info!("Panel state: {}", state);
        }
        cell.flags = Some(flags);
        cell.state = Some(state);
        Ok(state)
    }

    /// Send the command for a target state to the panel.
    pub async fn dispatch(&self, target: TargetState) -> Result<()> {
        self.bounded("send panel command", self.api.send_command(target))
            .await
            .inspect_err(|e| error!("Failed to send {} command: {}", target, e))
    }

    /// Handle a user request for a new target state.
    ///
    /// Returns the state the panel reports after the command, which may
    /// differ from the target. A failed command is not followed by a read.
    pub async fn set_target_state(&self, target: TargetState) -> Result<PanelState> {
        info!("Target state requested: {}", target);
        self.dispatch(target).await?;
        self.sync_panel_state().await
    }

    /// Parse a raw notification message and apply it.
    pub async fn handle_notification(&self, message: &str) -> Result<()> {
        self.handle_event(parse_notification(message)).await
    }

    /// Apply notification events one at a time until the channel closes.
    ///
    /// Each event is fully handled before the next is taken, so zone and
    /// smoke updates land in arrival order.
    pub async fn run(&self, mut rx: NotificationReceiver) {
        while let Some(event) = rx.recv().await {
            if let Err(e) = self.handle_event(event).await {
                if e.is_skippable() {
                    warn!("Notification: {}", e);
                } else {
                    error!("Notification failed: {}", e);
                }
            }
        }
        info!("Notification channel closed");
    }

    pub async fn handle_event(&self, event: NotificationEvent) -> Result<()> {
        match event {
            NotificationEvent::PanelStatusChanged => {
                // Cleared before the read so a fire reported meanwhile wins
                let smoke = self.set_zones_of_type(ZoneType::Smoke, false).await;
                let resolved = self.sync_panel_state().await;
                resolved.and(smoke)
            }
            NotificationEvent::FireAlarm => {
                warn!("Fire reported by panel");
                self.set_zones_of_type(ZoneType::Smoke, true).await
            }
            NotificationEvent::ZoneChanged {
                fullname,
                id,
                faulted,
            } => {
                let zone = self
                    .registry
                    .get(&id)
                    .ok_or_else(|| BridgeError::UnknownZone { id: id.clone() })?;
                if zone.full_name.as_deref().is_some_and(|name| name != fullname) {
                    debug!(
                        "Zone {} reported as '{}', configured as '{:?}'",
                        id, fullname, zone.full_name
                    );
                }
                self.set_zone(zone, faulted).await.map(|_| ())
            }
            NotificationEvent::Unrecognized { raw, parse_failed: true } => {
                Err(BridgeError::ParseFailure { message: raw })
            }
            NotificationEvent::Unrecognized { raw, .. } => {
                debug!("Ignoring notification: {}", raw);
                Ok(())
            }
        }
    }

    async fn set_zone(&self, zone: &ZoneDescriptor, faulted: bool) -> Result<ZoneValue> {
        let mut states = self.zone_states.write().await;
        states.insert(zone.id.clone(), faulted);
        let value = zone.zone_type.encode(faulted);
        debug!("Zone {} ({}) -> {}", zone.id, zone.name, value);
        self.bounded("publish zone state", self.sink.publish_zone_state(zone, value))
            .await?;
        Ok(value)
    }

    /// Set and publish every zone of one type.
    ///
    /// All zones are attempted; the first failure is returned.
    pub async fn set_zones_of_type(&self, zone_type: ZoneType, faulted: bool) -> Result<()> {
        let mut first_error = None;
        for zone in self.registry.by_type(zone_type) {
            if let Err(e) = self.set_zone(zone, faulted).await {
                warn!("Failed to publish zone {}: {}", zone.id, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Publish the current state of every registered zone.
    pub async fn publish_zones(&self) -> Result<()> {
        let mut first_error = None;
        for (zone, faulted) in self.zone_snapshot().await {
            let value = zone.zone_type.encode(faulted);
            if let Err(e) = self
                .bounded("publish zone state", self.sink.publish_zone_state(zone, value))
                .await
            {
                warn!("Failed to publish zone {}: {}", zone.id, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
