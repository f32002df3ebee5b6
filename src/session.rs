//! Acquisition sessions.
//!
//! The push session subscribes to notifications; the pull session polls the
//! characteristics on a fixed interval. Both feed raw frames through the
//! [`FrameDecoder`] and emit the results on a broadcast channel.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::ble::scanner::SensorScanner;
use crate::device::{FrameSource, SensorDevice};
use crate::error::Result;
use crate::protocol::frames::{DecodedValue, FrameDecoder, RawFrame, SENSOR_CHARACTERISTICS};

/// Local name the SensorData peripheral advertises.
pub const DEFAULT_DEVICE_NAME: &str = "SensorData";

/// Default scan deadline when looking for the device.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delay between polling iterations.
///
/// A rate limiter for the BLE connection, not a deadline.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for an acquisition session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Local name to scan for.
    pub device_name: String,
    /// How long to scan before giving up with
    /// [`Error::DeviceNotFound`](crate::Error::DeviceNotFound).
    pub scan_timeout: Duration,
    /// Delay between polling iterations.
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl SessionConfig {
    /// Configuration for a device advertising the given name.
    pub fn for_device(name: impl Into<String>) -> Self {
        Self {
            device_name: name.into(),
            ..Self::default()
        }
    }
}

/// One polling iteration's worth of decoded values.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SensorSample {
    /// When the sample was read.
    pub captured_at: DateTime<Utc>,
    /// Decoded values in read order.
    pub values: Vec<DecodedValue>,
}

/// Value emission from a running session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A single decoded notification (push sessions).
    Value(DecodedValue),
    /// A full polling sample (pull sessions).
    Sample(SensorSample),
}

/// Cooperative stop signal shared with a running session.
#[derive(Clone)]
pub struct ShutdownHandle {
    /// Sticky stop flag, checked between frames and iterations.
    flag: Arc<AtomicBool>,
    /// Wakes a session blocked on its frame queue or interval sleep.
    wake_tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    fn new() -> Self {
        let (wake_tx, _) = broadcast::channel(1);

        Self {
            flag: Arc::new(AtomicBool::new(false)),
            wake_tx,
        }
    }

    /// Request shutdown.
    ///
    /// Idempotent. A running session observes the request between frames or
    /// iterations and exits cleanly; stopping is not an error.
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let _ = self.wake_tx.send(());
    }

    /// Check whether shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn wake(&self) -> broadcast::Receiver<()> {
        self.wake_tx.subscribe()
    }
}

/// An acquisition session against one SensorData peripheral.
///
/// Create a session, subscribe to [`Self::events`], then drive it with
/// [`Self::run_push`] or [`Self::run_pull`]. Both block until the shutdown
/// handle fires or a connection-level failure surfaces, and both tear the
/// connection down on every exit path.
pub struct SensorSession {
    config: SessionConfig,
    decoder: FrameDecoder,
    event_tx: broadcast::Sender<SessionEvent>,
    shutdown: ShutdownHandle,
}

impl SensorSession {
    /// Create a session with the given configuration.
    pub fn new(config: SessionConfig) -> Self {
        let (event_tx, _) = broadcast::channel(64);

        Self {
            config,
            decoder: FrameDecoder::new(),
            event_tx,
            shutdown: ShutdownHandle::new(),
        }
    }

    /// Subscribe to decoded value emissions.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Get a handle that can stop this session from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run the notification-driven session.
    ///
    /// Subscribes to all five sensor characteristics and decodes frames in
    /// arrival order until shutdown. Decode failures are reported and the
    /// session continues; connection-level failures end it.
    pub async fn run_push(&self) -> Result<()> {
        let device = self.acquire().await?;

        let result = async {
            device.subscribe_sensors().await?;
            device.start_notifications().await?;

            info!(
                "Listening for notifications from '{}'",
                self.config.device_name
            );

            self.push_loop(device.frames()).await
        }
        .await;

        device.teardown().await;

        result
    }

    /// Run the polling session.
    ///
    /// Reads the five characteristics in registry order, emits each
    /// iteration as one sample, and sleeps the configured interval between
    /// iterations until shutdown.
    pub async fn run_pull(&self) -> Result<()> {
        let device = self.acquire().await?;

        info!(
            "Polling '{}' every {:?}",
            self.config.device_name, self.config.poll_interval
        );

        let result = self.pull_loop(&device).await;

        device.teardown().await;

        result
    }

    /// Scan for the configured device and connect to it.
    async fn acquire(&self) -> Result<SensorDevice> {
        let scanner = SensorScanner::new().await?;

        let discovered = scanner
            .find_by_name(&self.config.device_name, self.config.scan_timeout)
            .await?;

        let device = SensorDevice::new(discovered);
        device.connect().await?;

        Ok(device)
    }

    /// Drain the frame queue until shutdown, decoding in arrival order.
    async fn push_loop(&self, mut frames: broadcast::Receiver<RawFrame>) -> Result<()> {
        let mut wake = self.shutdown.wake();

        while !self.shutdown.is_shutdown() {
            tokio::select! {
                _ = wake.recv() => {}
                received = frames.recv() => match received {
                    Ok(frame) => self.emit_frame(&frame),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Dropped {} frames: consumer fell behind the queue", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        Ok(())
    }

    /// Decode one frame and emit it, or report the failure.
    fn emit_frame(&self, frame: &RawFrame) {
        match self.decoder.decode_frame(frame) {
            Ok(value) => {
                debug!("Notification from {}: {}", frame.characteristic, value);
                let _ = self.event_tx.send(SessionEvent::Value(value));
            }
            Err(e) => warn!("Failed to decode frame: {}", e),
        }
    }

    /// Poll on the fixed interval until shutdown.
    async fn pull_loop<S>(&self, source: &S) -> Result<()>
    where
        S: FrameSource + Sync,
    {
        let mut wake = self.shutdown.wake();

        while !self.shutdown.is_shutdown() {
            let sample = self.read_sample(source).await?;
            let _ = self.event_tx.send(SessionEvent::Sample(sample));

            tokio::select! {
                _ = wake.recv() => {}
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        Ok(())
    }

    /// Read all five characteristics in registry order as one sample.
    ///
    /// Read failures end the session; decode failures are reported and the
    /// remaining characteristics are still read.
    async fn read_sample<S>(&self, source: &S) -> Result<SensorSample>
    where
        S: FrameSource + Sync,
    {
        let mut values = Vec::with_capacity(SENSOR_CHARACTERISTICS.len());

        for spec in &SENSOR_CHARACTERISTICS {
            let payload = source.read_frame(&spec.uuid).await?;

            match self.decoder.decode(&spec.uuid, &payload) {
                Ok(value) => values.push(value),
                Err(e) => warn!("Failed to decode {}: {}", spec.name, e),
            }
        }

        Ok(SensorSample {
            captured_at: Utc::now(),
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::uuids::{
        ACCEL_X_UUID, ACCEL_Y_UUID, ACCEL_Z_UUID, GUNDATA_UUID, HALL_SIGNAL_UUID,
    };
    use crate::device::MockFrameSource;
    use crate::error::Error;
    use crate::protocol::frames::SensorValue;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use uuid::Uuid;

    /// Mock source scripted with one full sample in registry order.
    fn scripted_source() -> MockFrameSource {
        let mut source = MockFrameSource::new();
        let mut seq = Sequence::new();

        let reads: [(Uuid, Vec<u8>); 5] = [
            (ACCEL_X_UUID, 1.23f32.to_le_bytes().to_vec()),
            (ACCEL_Y_UUID, 4.56f32.to_le_bytes().to_vec()),
            (ACCEL_Z_UUID, 7.89f32.to_le_bytes().to_vec()),
            (HALL_SIGNAL_UUID, 123u32.to_le_bytes().to_vec()),
            (GUNDATA_UUID, 456u32.to_le_bytes().to_vec()),
        ];

        for (uuid, payload) in reads {
            source
                .expect_read_frame()
                .with(eq(uuid))
                .once()
                .in_sequence(&mut seq)
                .returning(move |_| Ok(payload.clone()));
        }

        source
    }

    #[tokio::test]
    async fn read_sample_reads_in_registry_order() {
        let session = SensorSession::new(SessionConfig::default());
        let source = scripted_source();

        let sample = session.read_sample(&source).await.unwrap();

        let names: Vec<_> = sample.values.iter().map(|v| v.name).collect();
        assert_eq!(names, ["x", "y", "z", "hall_signal", "gundata"]);
        assert_eq!(sample.values[0].value, SensorValue::Float(1.23));
        assert_eq!(sample.values[1].value, SensorValue::Float(4.56));
        assert_eq!(sample.values[2].value, SensorValue::Float(7.89));
        assert_eq!(sample.values[3].value, SensorValue::Unsigned(123));
        assert_eq!(sample.values[4].value, SensorValue::Unsigned(456));
    }

    #[tokio::test]
    async fn pull_loop_emits_one_sample_per_iteration() {
        let session = SensorSession::new(SessionConfig::default());
        let mut events = session.events();
        let shutdown = session.shutdown_handle();
        let source = scripted_source();

        let loop_fut = session.pull_loop(&source);
        tokio::pin!(loop_fut);

        let event = tokio::select! {
            _ = &mut loop_fut => panic!("loop ended before emitting"),
            event = events.recv() => event.unwrap(),
        };

        let SessionEvent::Sample(sample) = event else {
            panic!("expected a sample event");
        };
        assert_eq!(sample.values.len(), 5);

        shutdown.shutdown();
        loop_fut.await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_pull_loop_issues_no_reads() {
        let session = SensorSession::new(SessionConfig::default());
        session.shutdown_handle().shutdown();

        // No expectations: any read would panic the mock.
        let source = MockFrameSource::new();

        session.pull_loop(&source).await.unwrap();
    }

    #[tokio::test]
    async fn read_failure_ends_the_sample() {
        let session = SensorSession::new(SessionConfig::default());

        let mut source = MockFrameSource::new();
        source.expect_read_frame().returning(|uuid| {
            Err(Error::CharacteristicNotFound { uuid: *uuid })
        });

        let err = session.read_sample(&source).await.unwrap_err();
        assert!(matches!(err, Error::CharacteristicNotFound { .. }));
    }

    #[tokio::test]
    async fn push_loop_decodes_in_arrival_order_and_reports_unregistered() {
        let session = SensorSession::new(SessionConfig::default());
        let mut events = session.events();

        let (tx, rx) = broadcast::channel(16);
        tx.send(RawFrame {
            characteristic: ACCEL_X_UUID,
            payload: 1.23f32.to_le_bytes().to_vec(),
        })
        .unwrap();
        tx.send(RawFrame {
            characteristic: Uuid::from_u128(0xdead_beef),
            payload: vec![0; 4],
        })
        .unwrap();
        tx.send(RawFrame {
            characteristic: HALL_SIGNAL_UUID,
            payload: 123u32.to_le_bytes().to_vec(),
        })
        .unwrap();
        drop(tx);

        session.push_loop(rx).await.unwrap();

        let SessionEvent::Value(first) = events.try_recv().unwrap() else {
            panic!("expected a value event");
        };
        assert_eq!(first.name, "x");

        let SessionEvent::Value(second) = events.try_recv().unwrap() else {
            panic!("expected a value event");
        };
        assert_eq!(second.name, "hall_signal");
        assert_eq!(second.value, SensorValue::Unsigned(123));

        // The unregistered frame was reported, not emitted
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.device_name, DEFAULT_DEVICE_NAME);
        assert_eq!(config.scan_timeout, DEFAULT_SCAN_TIMEOUT);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn for_device_overrides_name_only() {
        let config = SessionConfig::for_device("OtherSensor");
        assert_eq!(config.device_name, "OtherSensor");
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn shutdown_handle_is_sticky() {
        let handle = ShutdownHandle::new();
        assert!(!handle.is_shutdown());

        handle.shutdown();
        assert!(handle.is_shutdown());

        handle.shutdown();
        assert!(handle.is_shutdown());
    }
}
