// In-memory doubles for the panel API and the accessory sink.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alarmdecoder_bridge::{
    AccessorySink, BridgeError, PanelApi, PanelState, RawPanelStatus, Reconciler, Result,
    TargetState, ZoneDescriptor, ZoneRegistry, ZoneType, ZoneValue,
};
use tokio::time::Duration;

/// Panel controller double. `status` of `None` makes reads fail.
#[derive(Default)]
pub struct FakePanel {
    pub status: Mutex<Option<RawPanelStatus>>,
    pub fail_commands: AtomicBool,
    pub read_calls: AtomicUsize,
    pub commands: Mutex<Vec<TargetState>>,
    pub delay: Mutex<Option<Duration>>,
}

impl FakePanel {
    pub fn with_status(status: RawPanelStatus) -> Arc<Self> {
        let panel = Self::default();
        *panel.status.lock().unwrap() = Some(status);
        Arc::new(panel)
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_status(&self, status: RawPanelStatus) {
        *self.status.lock().unwrap() = Some(status);
    }

    pub fn reads(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<TargetState> {
        self.commands.lock().unwrap().clone()
    }
}

impl PanelApi for FakePanel {
    async fn read_status(&self) -> Result<RawPanelStatus> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let status = self.status.lock().unwrap().clone();
        status.ok_or(BridgeError::HttpStatus {
            method: "GET".to_string(),
            url: "http://alarmdecoder.test/api".to_string(),
            status: 503,
        })
    }

    async fn send_command(&self, target: TargetState) -> Result<()> {
        self.commands.lock().unwrap().push(target);
        if self.fail_commands.load(Ordering::SeqCst) {
            return Err(BridgeError::HttpStatus {
                method: "POST".to_string(),
                url: "http://alarmdecoder.test/api/send".to_string(),
                status: 500,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    Panel(PanelState),
    Zone(String, ZoneValue),
}

/// Sink double recording every publish. Zones listed in `failing` error out,
/// as do panel publishes while `fail_panel` is set.
#[derive(Default)]
pub struct RecordingSink {
    pub published: Mutex<Vec<Published>>,
    pub failing: Mutex<Vec<String>>,
    pub fail_panel: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn take(&self) -> Vec<Published> {
        std::mem::take(&mut *self.published.lock().unwrap())
    }

    pub fn fail_zone(&self, id: &str) {
        self.failing.lock().unwrap().push(id.to_string());
    }
}

impl AccessorySink for RecordingSink {
    async fn publish_panel_state(&self, state: PanelState) -> Result<()> {
        if self.fail_panel.load(Ordering::SeqCst) {
            return Err(BridgeError::Sink {
                details: "panel state rejected".to_string(),
            });
        }
        self.published.lock().unwrap().push(Published::Panel(state));
        Ok(())
    }

    async fn publish_zone_state(&self, zone: &ZoneDescriptor, value: ZoneValue) -> Result<()> {
        if self.failing.lock().unwrap().contains(&zone.id) {
            return Err(BridgeError::Sink {
                details: format!("zone {} rejected", zone.id),
            });
        }
        self.published
            .lock()
            .unwrap()
            .push(Published::Zone(zone.id.clone(), value));
        Ok(())
    }
}

pub fn zone_registry() -> ZoneRegistry {
    let mut registry = ZoneRegistry::new();
    for zone in [
        ZoneDescriptor::new("12", ZoneType::Contact, "Front Door").with_full_name("Front Door"),
        ZoneDescriptor::new("7", ZoneType::Motion, "Hall Motion"),
        ZoneDescriptor::new("9", ZoneType::Smoke, "Hall Smoke"),
        ZoneDescriptor::new("10", ZoneType::Smoke, "Kitchen Smoke"),
        ZoneDescriptor::new("11", ZoneType::Smoke, "Landing Smoke"),
        ZoneDescriptor::new("3", ZoneType::CarbonMonoxide, "Boiler CO"),
    ] {
        registry.insert(zone).unwrap();
    }
    registry
}

pub type TestBridge = Reconciler<Arc<FakePanel>, Arc<RecordingSink>>;

pub fn bridge(panel: &Arc<FakePanel>, sink: &Arc<RecordingSink>) -> TestBridge {
    Reconciler::new(
        Arc::clone(panel),
        Arc::clone(sink),
        zone_registry(),
        Duration::from_millis(200),
    )
}

pub fn disarmed() -> RawPanelStatus {
    RawPanelStatus {
        powered: true,
        last_message: Some("****DISARMED****  Ready to Arm".to_string()),
        ..RawPanelStatus::default()
    }
}

pub fn armed_away() -> RawPanelStatus {
    RawPanelStatus {
        armed_away: true,
        powered: true,
        last_message: Some("ARMED ***AWAY***".to_string()),
        ..RawPanelStatus::default()
    }
}
