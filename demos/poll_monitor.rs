//! Polling acquisition example
//!
//! Run with: cargo run --example poll_monitor

use sensordata_ble::{Result, SensorSample, SensorSession, SensorValue, SessionConfig, SessionEvent};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (minimal)
    tracing_subscriber::fmt().with_env_filter("warn").init();

    let session = SensorSession::new(SessionConfig::default());
    let mut events = session.events();
    let shutdown = session.shutdown_handle();

    println!("Scanning for '{}'...", session.config().device_name);
    println!("Press Ctrl+C to exit.\n");

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        println!("\nStopped reading sensor data.");
        shutdown.shutdown();
    });

    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let SessionEvent::Sample(sample) = event {
                print_sample(&sample);
            }
        }
    });

    if let Err(e) = session.run_pull().await {
        eprintln!("Session ended: {e}");
    }

    printer.abort();

    Ok(())
}

fn print_sample(sample: &SensorSample) {
    let mut axes = Vec::new();

    for value in &sample.values {
        if let ("x" | "y" | "z", SensorValue::Float(v)) = (value.name, value.value) {
            axes.push(format!("{} = {:.2}", value.name.to_uppercase(), v));
        }
    }

    println!("[{}]", sample.captured_at.format("%H:%M:%S%.3f"));

    if !axes.is_empty() {
        println!("Accelerometer Data: {}", axes.join(", "));
    }

    for value in &sample.values {
        if let SensorValue::Unsigned(v) = value.value {
            println!("{}: {}", display_name(value.name), v);
        }
    }

    // Separator for readability
    println!("{}", "-".repeat(30));
}

/// Render a logical name for display, e.g. "hall_signal" -> "Hall Signal".
fn display_name(name: &str) -> String {
    name.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
