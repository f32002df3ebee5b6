//! BLE scanning functionality.
//!
//! Provides one-shot discovery of nearby peripherals and name-based lookup
//! of the SensorData device.

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::stream::StreamExt;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};

/// A peripheral seen during a scan.
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    /// Advertised local name, if any.
    pub name: Option<String>,
    /// Platform address or identifier of the peripheral.
    pub address: String,
    /// Signal strength in dBm.
    pub rssi: Option<i16>,
    /// The peripheral handle.
    pub peripheral: Peripheral,
}

/// BLE scanner for locating SensorData peripherals.
pub struct SensorScanner {
    /// The BLE adapter to use for scanning.
    adapter: Adapter,
}

impl SensorScanner {
    /// Create a new scanner on the first available Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self { adapter })
    }

    /// Create a scanner with a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self { adapter }
    }

    /// Scan for the given duration and return every peripheral seen.
    pub async fn discover(&self, timeout: Duration) -> Result<Vec<DiscoveredDevice>> {
        info!("Scanning for BLE devices ({:?})", timeout);

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(Error::Bluetooth)?;

        let mut events = self.adapter.events().await.map_err(Error::Bluetooth)?;

        let deadline = Instant::now() + timeout;
        let mut seen: HashMap<PeripheralId, DiscoveredDevice> = HashMap::new();

        loop {
            tokio::select! {
                Some(event) = events.next() => {
                    if let Some((id, device)) = self.device_from_event(event).await {
                        seen.insert(id, device);
                    }
                }
                _ = tokio::time::sleep_until(deadline) => break,
            }
        }

        self.stop_scan().await;

        debug!("Scan finished, {} peripherals seen", seen.len());

        Ok(seen.into_values().collect())
    }

    /// Scan until a peripheral advertising `name` shows up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if the deadline passes without a
    /// matching advertisement.
    pub async fn find_by_name(&self, name: &str, timeout: Duration) -> Result<DiscoveredDevice> {
        info!("Scanning for '{}' ({:?})", name, timeout);

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(Error::Bluetooth)?;

        let mut events = self.adapter.events().await.map_err(Error::Bluetooth)?;

        let deadline = Instant::now() + timeout;
        let found = loop {
            tokio::select! {
                Some(event) = events.next() => {
                    if let Some((_, device)) = self.device_from_event(event).await {
                        if device.name.as_deref() == Some(name) {
                            info!("Found '{}' at address: {}", name, device.address);
                            break Some(device);
                        }
                    }
                }
                _ = tokio::time::sleep_until(deadline) => break None,
            }
        };

        self.stop_scan().await;

        found.ok_or_else(|| Error::DeviceNotFound {
            name: name.to_string(),
        })
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    async fn stop_scan(&self) {
        if let Err(e) = self.adapter.stop_scan().await {
            warn!("Failed to stop scan: {}", e);
        }
    }

    /// Resolve a central event into a discovered device, if it names a
    /// peripheral we can fetch properties for.
    async fn device_from_event(
        &self,
        event: CentralEvent,
    ) -> Option<(PeripheralId, DiscoveredDevice)> {
        let id = match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
            _ => return None,
        };

        let peripheral = match self.adapter.peripheral(&id).await {
            Ok(p) => p,
            Err(e) => {
                trace!("Failed to get peripheral: {}", e);
                return None;
            }
        };

        let properties = match peripheral.properties().await {
            Ok(Some(p)) => p,
            _ => return None,
        };

        let device = DiscoveredDevice {
            name: properties.local_name,
            address: properties.address.to_string(),
            rssi: properties.rssi,
            peripheral,
        };

        trace!("Saw peripheral {:?} ({})", device.name, device.address);

        Some((id, device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovered_device_clone() {
        // Just verify the struct is Clone
        fn assert_clone<T: Clone>() {}
        assert_clone::<DiscoveredDevice>();
    }
}
