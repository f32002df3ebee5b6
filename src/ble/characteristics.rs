//! GATT characteristic handling.
//!
//! Provides reads, subscriptions, and the notification pump for a connected
//! SensorData peripheral.

use btleplug::api::{Characteristic, Peripheral as _};
use btleplug::platform::Peripheral;
use futures::stream::StreamExt;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::frames::RawFrame;

/// Capacity of the notification frame queue.
///
/// Frames beyond this are dropped; the consumer observes the loss as lag
/// and reports how many frames went missing.
const FRAME_QUEUE_CAPACITY: usize = 256;

/// Handler for GATT characteristics on a connected peripheral.
pub struct CharacteristicHandler {
    /// The peripheral to communicate with.
    peripheral: Peripheral,
    /// Cached characteristics by UUID.
    characteristics: Arc<RwLock<HashMap<Uuid, Characteristic>>>,
    /// Characteristics we currently hold a notification subscription on.
    subscribed: Arc<RwLock<HashSet<Uuid>>>,
    /// Bounded queue of incoming frames, drained by a single consumer.
    frame_tx: broadcast::Sender<RawFrame>,
    /// Whether the notification pump is running.
    is_listening: Arc<RwLock<bool>>,
    /// Handle to the notification pump task.
    listener_handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
}

impl CharacteristicHandler {
    /// Create a new characteristic handler for a peripheral.
    ///
    /// Note: services must be discovered before calling [`Self::resolve`].
    pub fn new(peripheral: Peripheral) -> Self {
        let (frame_tx, _) = broadcast::channel(FRAME_QUEUE_CAPACITY);

        Self {
            peripheral,
            characteristics: Arc::new(RwLock::new(HashMap::new())),
            subscribed: Arc::new(RwLock::new(HashSet::new())),
            frame_tx,
            is_listening: Arc::new(RwLock::new(false)),
            listener_handle: Arc::new(RwLock::new(None)),
        }
    }

    /// Discover and cache all characteristics.
    ///
    /// This should be called after connecting and discovering services.
    pub fn resolve(&self) {
        let services = self.peripheral.services();

        let mut chars = self.characteristics.write();
        chars.clear();

        for service in services {
            for characteristic in service.characteristics {
                trace!(
                    "Found characteristic: {} in service {}",
                    characteristic.uuid,
                    service.uuid
                );
                chars.insert(characteristic.uuid, characteristic);
            }
        }

        debug!("Resolved {} characteristics", chars.len());
    }

    /// Check if a characteristic exists on the peripheral.
    pub fn has_characteristic(&self, uuid: &Uuid) -> bool {
        self.characteristics.read().contains_key(uuid)
    }

    /// Read a characteristic value.
    pub async fn read(&self, uuid: &Uuid) -> Result<Vec<u8>> {
        let characteristic = self.require(uuid)?;

        let data = self
            .peripheral
            .read(&characteristic)
            .await
            .map_err(Error::Bluetooth)?;

        trace!("Read {} bytes from characteristic {}", data.len(), uuid);

        Ok(data)
    }

    /// Subscribe to notifications from a characteristic.
    pub async fn subscribe(&self, uuid: &Uuid) -> Result<()> {
        let characteristic = self.require(uuid)?;

        self.peripheral
            .subscribe(&characteristic)
            .await
            .map_err(Error::Bluetooth)?;

        self.subscribed.write().insert(*uuid);

        debug!("Subscribed to notifications from {}", uuid);

        Ok(())
    }

    /// Unsubscribe from notifications from a characteristic.
    pub async fn unsubscribe(&self, uuid: &Uuid) -> Result<()> {
        let characteristic = self.require(uuid)?;

        self.peripheral
            .unsubscribe(&characteristic)
            .await
            .map_err(Error::Bluetooth)?;

        self.subscribed.write().remove(uuid);

        debug!("Unsubscribed from notifications from {}", uuid);

        Ok(())
    }

    /// Drop every notification subscription currently held.
    ///
    /// Failures are logged and the remaining subscriptions are still
    /// released.
    pub async fn unsubscribe_all(&self) {
        let held: Vec<Uuid> = self.subscribed.read().iter().copied().collect();

        for uuid in held {
            if let Err(e) = self.unsubscribe(&uuid).await {
                warn!("Failed to unsubscribe from {}: {}", uuid, e);
            }
        }
    }

    /// Start the notification pump.
    ///
    /// Incoming notifications are forwarded, in arrival order, into the
    /// bounded frame queue returned by [`Self::frames`].
    pub async fn start_notifications(&self) -> Result<()> {
        if *self.is_listening.read() {
            return Ok(());
        }

        *self.is_listening.write() = true;

        let peripheral = self.peripheral.clone();
        let is_listening = self.is_listening.clone();
        let frame_tx = self.frame_tx.clone();

        let handle = tokio::spawn(async move {
            let mut notifications = match peripheral.notifications().await {
                Ok(n) => n,
                Err(e) => {
                    error!("Failed to get notifications stream: {}", e);
                    return;
                }
            };

            while *is_listening.read() {
                tokio::select! {
                    Some(notification) = notifications.next() => {
                        trace!(
                            "Notification from {}: {} bytes",
                            notification.uuid,
                            notification.value.len()
                        );

                        let frame = RawFrame {
                            characteristic: notification.uuid,
                            payload: notification.value,
                        };

                        let _ = frame_tx.send(frame);
                    }
                    _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {
                        // Check if we should stop
                        if !*is_listening.read() {
                            break;
                        }
                    }
                }
            }

            debug!("Notification pump stopped");
        });

        *self.listener_handle.write() = Some(handle);

        Ok(())
    }

    /// Stop the notification pump.
    pub async fn stop_notifications(&self) {
        *self.is_listening.write() = false;

        if let Some(handle) = self.listener_handle.write().take() {
            let _ = handle.await;
        }
    }

    /// Get a receiver draining the notification frame queue.
    pub fn frames(&self) -> broadcast::Receiver<RawFrame> {
        self.frame_tx.subscribe()
    }

    fn require(&self, uuid: &Uuid) -> Result<Characteristic> {
        self.characteristics
            .read()
            .get(uuid)
            .cloned()
            .ok_or(Error::CharacteristicNotFound { uuid: *uuid })
    }
}

impl Drop for CharacteristicHandler {
    fn drop(&mut self) {
        *self.is_listening.write() = false;
    }
}
