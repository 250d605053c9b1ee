//! Example: A Scripted Relay Session
//!
//! This example plays the relay's side of a short session against a mock
//! channel: the relay sends bridge settings, the user toggles the light
//! while the phone's outbox is busy, and the relay later asks for the
//! settings back with a brightness change bundled in.
//!
//! Run with: `RUST_LOG=debug cargo run --example relay_session`

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use quickhue_core::{
    ControlEvent, Dictionary, EventDispatcher, EventObserver, LightController, MemoryStorage,
    MessageKey, MockChannel, SettingsStore, Tuple,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("quickhue_core=info".parse()?))
        .init();

    let channel = Arc::new(MockChannel::new());
    let events = EventDispatcher::default();
    let observer = Arc::new(EventObserver::new(events.clone()));
    let mut rx = events.subscribe();

    let controller = LightController::new(
        channel.clone(),
        Arc::new(SettingsStore::new(Arc::new(MemoryStorage::new()))),
        observer,
    )
    .with_events(events);

    println!("Relay sends bridge settings...");
    let settings = Dictionary::new()
        .with(Tuple::cstring(MessageKey::BridgeAddress, "192.168.1.20"))
        .with(Tuple::cstring(
            MessageKey::BridgeCredential,
            "1028d66426293e821ecfd9ef1a0731df",
        ))
        .with(Tuple::int8(MessageKey::LightId, 1));
    controller.inbox_received_bytes(&settings.encode()?).await;

    println!("Relay reports the light on at 50%...");
    let state = Dictionary::new()
        .with(Tuple::int8(MessageKey::LightState, 1))
        .with(Tuple::int16(MessageKey::Brightness, 128));
    controller.inbox_received(&state).await;

    println!("User toggles while the outbox is busy...");
    channel.set_busy_failures(3);
    controller.request_toggle().await;
    println!("  {} attempts", channel.send_count());

    println!("Relay restarted and asks for settings, with a brightness change...");
    channel.reset();
    let request = Dictionary::new()
        .with(Tuple::int8(MessageKey::SettingsRequest, 1))
        .with(Tuple::int16(MessageKey::Brightness, 64));
    controller.inbox_received(&request).await;
    for message in channel.sent() {
        let keys: Vec<String> = message
            .iter()
            .map(|t| match MessageKey::from_id(t.key) {
                Some(key) => key.to_string(),
                None => t.key.to_string(),
            })
            .collect();
        println!("  sent {}", keys.join(", "));
    }

    println!();
    println!("Events:");
    while let Ok(event) = rx.try_recv() {
        let line = match &event {
            ControlEvent::CommandFailed { command, error } => {
                format!("{} failed: {}", command, error)
            }
            other => serde_json::to_string(other)?,
        };
        println!("  {}", line);
    }

    println!();
    println!(
        "Light is {} at {}",
        controller.light_state().await,
        controller.brightness().await
    );

    Ok(())
}
