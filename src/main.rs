// MIT License - Copyright (c) 2026 Peter Wright
// MQTT bridge

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

use alarmdecoder_bridge::mqtt::{build_snapshot, execute_command, publish_json, MqttCommand, MqttSink};
use alarmdecoder_bridge::{
    notification_channel, AlarmDecoderClient, BridgeConfig, BridgeError, NotificationListener,
    PanelInfo, Reconciler, ZoneRegistry,
};

type Bridge = Reconciler<AlarmDecoderClient, MqttSink>;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "alarmdecoder2mqtt")]
#[command(about = "Bridge between an AlarmDecoder security panel and MQTT")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn log_failure(what: &str, e: &BridgeError) {
    if e.is_skippable() {
        warn!("{what}: {e}");
    } else {
        error!("{what} failed: {e}");
    }
}

async fn publish_snapshot(client: &AsyncClient, topic: &str, bridge: &Bridge, panel: &PanelInfo) {
    let snapshot = build_snapshot(bridge, panel).await;
    if let Err(e) = publish_json(client, topic, &snapshot, true).await {
        warn!("Snapshot not published: {e}");
    }
}

async fn handle_command(
    payload: &str,
    client: &AsyncClient,
    topic: &str,
    bridge: &Bridge,
    panel: &PanelInfo,
) {
    // Parse the raw payload as a JSON value for the CMD_ACK src field
    let src_json = serde_json::from_str::<serde_json::Value>(payload).ok();

    let cmd = match serde_json::from_str::<MqttCommand>(payload) {
        Ok(cmd) => cmd,
        Err(e) => {
            warn!("Failed to parse MQTT command: {e}");
            return;
        }
    };
    if cmd.op == "SNAPSHOT" {
        debug!("MQTT command received: {payload}");
    } else {
        info!("MQTT command received: {payload}");
    }

    let reply = execute_command(&cmd, bridge, panel).await;
    if let Some(snapshot) = &reply.snapshot
        && let Err(e) = publish_json(client, topic, snapshot, true).await
    {
        warn!("Snapshot not published: {e}");
    }
    if let Err(e) = publish_json(client, topic, &reply.into_ack(src_json), false).await {
        warn!("CMD_ACK not published: {e}");
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=alarmdecoder_bridge=trace).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();

    let mut config = BridgeConfig::load(&cli.config).context("Failed to load config file")?;

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    loop {
        let (mqtt_host, mqtt_port) = config.mqtt.host_port().context("Invalid MQTT URL")?;
        let publish_topic = config.mqtt.publish_topic.clone();
        let subscribe_topic = config.mqtt.subscribe_topic.clone();
        let panel_info = Arc::new(config.panel.clone());

        let registry = ZoneRegistry::from_config(&config.zones);
        info!("{} zone(s) configured", registry.len());
        let api = AlarmDecoderClient::new(&config.alarmdecoder)
            .context("Failed to create AlarmDecoder client")?;

        // Set up MQTT
        let mut mqtt_opts = MqttOptions::new(&config.mqtt.client_id, &mqtt_host, mqtt_port);
        mqtt_opts.set_keep_alive(Duration::from_secs(30));
        let (client, mut eventloop) = AsyncClient::new(mqtt_opts, 256);

        client
            .subscribe(&subscribe_topic, QoS::AtLeastOnce)
            .await
            .context("Failed to subscribe to MQTT topic")?;
        info!("MQTT: subscribed to {subscribe_topic}");

        let bridge: Arc<Bridge> = Arc::new(Reconciler::new(
            api,
            MqttSink::new(client.clone(), &publish_topic),
            registry,
            Duration::from_millis(config.alarmdecoder.timeout_ms),
        ));

        let (notify_tx, notify_rx) = notification_channel(256);
        let listener =
            NotificationListener::bind(&config.listener.bind, config.listener.port, notify_tx)
                .await
                .context("Failed to start notification listener")?;
        let listener_handle = tokio::spawn(listener.run());

        // Task 1: AlarmDecoder notifications -> reconciler
        let bridge_events = Arc::clone(&bridge);
        let event_handle = tokio::spawn(async move { bridge_events.run(notify_rx).await });

        // Task 2: MQTT event loop (receives messages, handles commands)
        let bridge_cmds = Arc::clone(&bridge);
        let client_cmds = client.clone();
        let topic_cmds = publish_topic.clone();
        let panel_cmds = Arc::clone(&panel_info);
        let sub_topic = subscribe_topic.clone();
        let mqtt_handle = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        // rumqttc does not resubscribe after a broker reconnect
                        info!("MQTT: connected, subscribing to {sub_topic}");
                        if let Err(e) = client_cmds.subscribe(&sub_topic, QoS::AtLeastOnce).await {
                            error!("Failed to subscribe to {sub_topic}: {e}");
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(msg))) => {
                        if msg.topic == sub_topic {
                            let payload = String::from_utf8_lossy(&msg.payload).into_owned();
                            let bridge = Arc::clone(&bridge_cmds);
                            let client = client_cmds.clone();
                            let topic = topic_cmds.clone();
                            let panel = Arc::clone(&panel_cmds);
                            // Commands wait on the panel; keep polling meanwhile
                            tokio::spawn(async move {
                                handle_command(&payload, &client, &topic, &bridge, &panel).await;
                            });
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("MQTT event loop error: {e}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        // Task 3: startup sync, then the snapshot timer
        let bridge_snap = Arc::clone(&bridge);
        let client_snap = client.clone();
        let topic_snap = publish_topic.clone();
        let panel_snap = Arc::clone(&panel_info);
        let snapshot_interval_secs = config.mqtt.snapshot_interval_secs.max(1);
        let snap_handle = tokio::spawn(async move {
            if let Err(e) = bridge_snap.publish_zones().await {
                log_failure("Initial zone publish", &e);
            }
            match bridge_snap.sync_panel_state().await {
                Ok(state) => info!("Initial panel state: {state}"),
                Err(e) => log_failure("Initial panel sync", &e),
            }
            publish_snapshot(&client_snap, &topic_snap, &bridge_snap, &panel_snap).await;

            let mut ticker = interval(Duration::from_secs(snapshot_interval_secs));
            // Skip the first immediate tick (we already published an initial snapshot)
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = bridge_snap.sync_panel_state().await {
                    warn!("Status poll failed: {e}");
                }
                publish_snapshot(&client_snap, &topic_snap, &bridge_snap, &panel_snap).await;
            }
        });

        // Wait for a signal
        info!("MQTT bridge running. Send SIGHUP to restart, SIGINT/SIGTERM to stop.");
        let restart = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down...");
                false
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                false
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading config and restarting connections...");
                true
            }
        };

        // Abort tasks
        listener_handle.abort();
        event_handle.abort();
        mqtt_handle.abort();
        snap_handle.abort();
        // Wait for the listener socket to be released before rebinding
        let _ = listener_handle.await;

        if let Err(e) = client.disconnect().await {
            debug!("MQTT disconnect: {e}");
        }

        if !restart {
            break;
        }

        // Reload config from disk; keep previous config on failure
        info!("Reloading config from {}", cli.config);
        match BridgeConfig::load(&cli.config) {
            Ok(new_config) => match new_config.mqtt.host_port() {
                Ok(_) => {
                    config = new_config;
                    info!("Config reloaded successfully");
                }
                Err(e) => warn!("Invalid MQTT URL in new config, keeping previous: {e}"),
            },
            Err(e) => warn!("Failed to reload config, keeping previous: {e}"),
        }

        info!("Reconnecting...");
    }

    info!("Shutdown complete");
    Ok(())
}
