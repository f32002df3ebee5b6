// Allow holding locks across await points - we use parking_lot which is designed for this
#![allow(clippy::await_holding_lock)]
// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # sensordata-ble
//!
//! A cross-platform Rust library for reading telemetry from a SensorData
//! Bluetooth Low Energy peripheral.
//!
//! The peripheral exposes five GATT characteristics: accelerometer x/y/z as
//! little-endian 32-bit floats, plus hall_signal and gundata as little-endian
//! unsigned 32-bit integers.
//!
//! ## Features
//!
//! - **Discovery**: Find the peripheral by its advertised name
//! - **Push acquisition**: Subscribe to all five characteristics and decode
//!   notifications in arrival order
//! - **Pull acquisition**: Poll the characteristics on a fixed interval and
//!   emit timestamped samples
//! - **Typed decoding**: A fixed registry maps each characteristic to its
//!   payload layout; unknown identifiers and malformed payloads are
//!   surfaced, never silently dropped
//! - **Cooperative shutdown**: Sessions stop cleanly on request and always
//!   unsubscribe and disconnect on the way out
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sensordata_ble::{Result, SensorSession, SessionConfig, SessionEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let session = SensorSession::new(SessionConfig::default());
//!     let mut events = session.events();
//!     let shutdown = session.shutdown_handle();
//!
//!     // Stop the session on Ctrl+C
//!     tokio::spawn(async move {
//!         tokio::signal::ctrl_c().await.ok();
//!         shutdown.shutdown();
//!     });
//!
//!     // Print decoded values as they arrive
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             match event {
//!                 SessionEvent::Value(value) => println!("{value}"),
//!                 SessionEvent::Sample(sample) => println!("{:?}", sample.values),
//!             }
//!         }
//!     });
//!
//!     session.run_push().await
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization for decoded values and samples

// Public modules
pub mod ble;
pub mod device;
pub mod error;
pub mod protocol;
pub mod session;

// Re-exports for convenience
pub use device::{FrameSource, SensorDevice};
pub use error::{DecodeError, Error, Result};
pub use session::{
    SensorSample, SensorSession, SessionConfig, SessionEvent, ShutdownHandle,
    DEFAULT_DEVICE_NAME, DEFAULT_POLL_INTERVAL, DEFAULT_SCAN_TIMEOUT,
};

// Re-export commonly used types from submodules
pub use ble::connection::ConnectionState;
pub use ble::scanner::{DiscoveredDevice, SensorScanner};
pub use protocol::frames::{
    CharacteristicSpec, DecodeKind, DecodedValue, FrameDecoder, RawFrame, SensorValue, FRAME_LEN,
    SENSOR_CHARACTERISTICS,
};
