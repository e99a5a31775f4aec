//! Example: Receive AlarmDecoder notifications and print the resulting
//! accessory updates instead of publishing them over MQTT.
//!
//! Run with `cargo run --example notifications -- config.toml`, then point
//! the AlarmDecoder custom notification at this host (see config.example.toml).

use alarmdecoder_bridge::{
    notification_channel, AccessorySink, AlarmDecoderClient, BridgeConfig, NotificationListener,
    PanelState, Reconciler, Result, ZoneDescriptor, ZoneRegistry, ZoneValue,
};
use tokio::time::Duration;

struct PrintSink;

impl AccessorySink for PrintSink {
    async fn publish_panel_state(&self, state: PanelState) -> Result<()> {
        println!("Panel: {} ({})", state, state.hap_value());
        Ok(())
    }

    async fn publish_zone_state(&self, zone: &ZoneDescriptor, value: ZoneValue) -> Result<()> {
        println!("Zone {:3}: {:20} {}", zone.id, zone.name, value);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = BridgeConfig::load(&path)?;

    let registry = ZoneRegistry::from_config(&config.zones);
    println!("{} zones configured", registry.len());

    let api = AlarmDecoderClient::new(&config.alarmdecoder)?;
    let bridge = Reconciler::new(
        api,
        PrintSink,
        registry,
        Duration::from_millis(config.alarmdecoder.timeout_ms),
    );

    match bridge.sync_panel_state().await {
        Ok(state) => println!("Panel is {}", state),
        Err(e) => println!("Panel not reachable yet: {}", e),
    }

    let (tx, rx) = notification_channel(16);
    let listener = NotificationListener::bind(&config.listener.bind, config.listener.port, tx).await?;
    println!("Waiting for notifications on {}", listener.local_addr()?);
    tokio::spawn(listener.run());

    tokio::select! {
        _ = bridge.run(rx) => {}
        _ = tokio::signal::ctrl_c() => println!("\nStopping"),
    }
    Ok(())
}
