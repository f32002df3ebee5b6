//! Error types for the sensordata-ble crate.

use thiserror::Error;
use uuid::Uuid;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available or is disabled on this system.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// No peripheral advertising the requested name was seen before the
    /// scan deadline.
    #[error("Device not found: {name}")]
    DeviceNotFound {
        /// The advertised name that was searched for.
        name: String,
    },

    /// Failed to establish a connection to the device.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// Description of why the connection failed.
        reason: String,
    },

    /// A sensor characteristic is not present on the connected device.
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID of the characteristic that was not found.
        uuid: Uuid,
    },

    /// A frame could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Per-frame decode failures.
///
/// These never end an acquisition session; each frame is decoded
/// independently of the next.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The frame arrived under a characteristic outside the sensor registry.
    #[error("Unknown characteristic: {uuid}")]
    UnknownIdentifier {
        /// The unregistered characteristic UUID.
        uuid: Uuid,
    },

    /// The payload is not exactly one little-endian 32-bit value.
    #[error("Malformed payload for {name}: expected {expected} bytes, got {actual}")]
    MalformedPayload {
        /// Logical name of the characteristic the payload arrived under.
        name: &'static str,
        /// The expected payload length.
        expected: usize,
        /// The length that was actually received.
        actual: usize,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
