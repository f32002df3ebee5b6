//! Notification-driven monitoring example
//!
//! Run with: cargo run --example notify_monitor

use sensordata_ble::{Result, SensorSession, SessionConfig, SessionEvent};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sensordata_ble=debug".parse().unwrap()),
        )
        .init();

    let session = SensorSession::new(SessionConfig::default());
    let mut events = session.events();
    let shutdown = session.shutdown_handle();

    println!("Scanning for '{}'...", session.config().device_name);

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        println!("\nStopping notifications...");
        shutdown.shutdown();
    });

    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let SessionEvent::Value(value) = event {
                println!("{value}");
            }
        }
    });

    println!("Listening for notifications. Press Ctrl+C to exit.\n");

    if let Err(e) = session.run_push().await {
        eprintln!("Session ended: {e}");
    }

    printer.abort();

    Ok(())
}
