//! SensorData device facade.
//!
//! Ties together the connection, characteristic access, and the sensor
//! registry for a single peripheral.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ble::characteristics::CharacteristicHandler;
use crate::ble::connection::{ConnectionManager, ConnectionState};
use crate::ble::scanner::DiscoveredDevice;
use crate::error::Result;
use crate::protocol::frames::{RawFrame, SENSOR_CHARACTERISTICS};

/// Source of raw frames for the polling acquisition path.
///
/// Abstracts the synchronous characteristic read so the polling loop can be
/// exercised against a scripted implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrameSource {
    /// Read the current payload of a characteristic.
    async fn read_frame(&self, characteristic: &Uuid) -> Result<Vec<u8>>;
}

/// A single SensorData peripheral.
pub struct SensorDevice {
    /// Advertised local name.
    name: String,
    /// Platform address or identifier.
    address: String,
    /// Connection manager.
    connection: ConnectionManager,
    /// Characteristic handler.
    characteristics: CharacteristicHandler,
}

impl SensorDevice {
    /// Create a device facade from a scan result.
    pub fn new(discovered: DiscoveredDevice) -> Self {
        let DiscoveredDevice {
            name,
            address,
            peripheral,
            ..
        } = discovered;

        Self {
            name: name.unwrap_or_else(|| "<unnamed>".to_string()),
            address,
            connection: ConnectionManager::new(peripheral.clone()),
            characteristics: CharacteristicHandler::new(peripheral),
        }
    }

    /// Advertised local name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Platform address or identifier.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Connect to the peripheral and resolve its GATT table.
    pub async fn connect(&self) -> Result<()> {
        self.connection.connect().await?;
        self.characteristics.resolve();

        info!("Connected to {} ({})", self.name, self.address);

        Ok(())
    }

    /// Subscribe to notifications from every sensor characteristic.
    pub async fn subscribe_sensors(&self) -> Result<()> {
        for spec in &SENSOR_CHARACTERISTICS {
            debug!("Subscribing to {} ({})", spec.name, spec.uuid);
            self.characteristics.subscribe(&spec.uuid).await?;
        }

        Ok(())
    }

    /// Start forwarding notifications into the frame queue.
    pub async fn start_notifications(&self) -> Result<()> {
        self.characteristics.start_notifications().await
    }

    /// Get a receiver draining the notification frame queue.
    pub fn frames(&self) -> broadcast::Receiver<RawFrame> {
        self.characteristics.frames()
    }

    /// Tear the device down: unsubscribe, stop the pump, disconnect.
    ///
    /// Runs on every session exit path. Failures are logged, never
    /// propagated, so teardown cannot mask the session's own result.
    pub async fn teardown(&self) {
        self.characteristics.unsubscribe_all().await;
        self.characteristics.stop_notifications().await;

        if let Err(e) = self.connection.disconnect().await {
            warn!("Failed to disconnect from {}: {}", self.name, e);
        }
    }
}

#[async_trait]
impl FrameSource for SensorDevice {
    async fn read_frame(&self, characteristic: &Uuid) -> Result<Vec<u8>> {
        self.characteristics.read(characteristic).await
    }
}
