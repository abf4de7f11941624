use std::{
    future::Future,
    io::BufRead,
    path::Path,
    pin::Pin,
    time::Duration,
};

use btleplug::api::{
    Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter, ValueNotification,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::{Stream, StreamExt};
use log::{debug, info, warn};
use snafu::ResultExt;
use uuid::Uuid;

use crate::errors::{LifestreamError, ReplayFileSnafu};

/// Address of the LifeStream sensor board.
pub const DEFAULT_DEVICE_ADDRESS: &str = "F4:12:FA:70:A9:11";
/// Characteristic the sensor board publishes its JSON readings on.
pub const DEFAULT_CHARACTERISTIC: Uuid = Uuid::from_u128(0x19B10010_E8F2_537E_4F6C_D104768A1214);
pub const DEFAULT_CONNECT_TIMEOUT_S: u64 = 60;

type NotificationStream = Pin<Box<dyn Stream<Item = ValueNotification> + Send>>;

/// A source of raw sensor notifications.
///
/// # Lifecycle
///
/// 1. Call `connect()` once to establish the link and subscribe to notifications
/// 2. Call `next_payload()` repeatedly; `None` means the link is gone for good
pub trait NotificationSource {
    /// Name of the device behind this source, used in logs and status messages.
    fn describe(&self) -> String;

    /// Establish the connection and subscribe.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be found, connected or subscribed to.
    fn connect(&mut self) -> impl Future<Output = Result<(), LifestreamError>>;

    /// Wait for the next raw notification payload.
    fn next_payload(&mut self) -> impl Future<Output = Option<Vec<u8>>>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeviceConfig {
    pub address: String,
    pub characteristic: Uuid,
    pub connect_timeout: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_DEVICE_ADDRESS.to_string(),
            characteristic: DEFAULT_CHARACTERISTIC,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_S),
        }
    }
}

/// First value `accept` produces for an item of `events`, or `None` once the stream ends.
async fn first_accepted<S, T, F, Fut>(mut events: S, mut accept: F) -> Option<T>
where
    S: Stream + Unpin,
    F: FnMut(S::Item) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    while let Some(event) = events.next().await {
        if let Some(accepted) = accept(event).await {
            return Some(accepted);
        }
    }
    None
}

/// Reads notifications from the sensor board over Bluetooth Low Energy.
///
/// The connect timeout covers the whole sequence: scanning, connecting, service discovery
/// and subscribing. A sensor that never shows up ends in `ConnectionTimeout`;
/// `DeviceNotFound` means the adapter closed its event stream before the sensor appeared.
pub struct BleSource {
    config: DeviceConfig,
    notifications: Option<NotificationStream>,
}

impl BleSource {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            config,
            notifications: None,
        }
    }

    async fn matches_address(&self, peripheral: &Peripheral) -> bool {
        match peripheral.properties().await {
            Ok(Some(props)) => props
                .address
                .to_string()
                .eq_ignore_ascii_case(&self.config.address),
            _ => false,
        }
    }

    async fn find_peripheral(&self, adapter: &Adapter) -> Result<Peripheral, LifestreamError> {
        let events = adapter.events().await?;
        adapter.start_scan(ScanFilter::default()).await?;

        // the adapter may already know about the device from an earlier scan
        for peripheral in adapter.peripherals().await? {
            if self.matches_address(&peripheral).await {
                return Ok(peripheral);
            }
        }

        let found = first_accepted(events, |event| async move {
            let (CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id)) = event
            else {
                return None;
            };
            let peripheral = adapter.peripheral(&id).await.ok()?;
            self.matches_address(&peripheral).await.then_some(peripheral)
        })
        .await;

        found.ok_or_else(|| {
            warn!("Adapter stopped reporting scan events");
            LifestreamError::DeviceNotFound {
                address: self.config.address.clone(),
            }
        })
    }

    async fn establish(&mut self) -> Result<(), LifestreamError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(LifestreamError::NoAdapter)?;

        debug!("Scanning for sensor {}", self.config.address);
        let peripheral = self.find_peripheral(&adapter).await?;
        if let Err(e) = adapter.stop_scan().await {
            warn!("Could not stop BLE scan: {}", e);
        }

        peripheral.connect().await?;
        let connected = peripheral.is_connected().await?;
        info!("Connected: {}", connected);
        if !connected {
            return Err(LifestreamError::NotConnected {
                address: self.config.address.clone(),
            });
        }

        peripheral.discover_services().await?;
        let characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == self.config.characteristic)
            .ok_or_else(|| LifestreamError::MissingCharacteristic {
                uuid: self.config.characteristic.to_string(),
            })?;

        // grab the stream before subscribing so no early notification is lost
        let notifications = peripheral.notifications().await?;
        peripheral.subscribe(&characteristic).await?;
        debug!("Subscribed to characteristic {}", characteristic.uuid);

        self.notifications = Some(notifications);
        Ok(())
    }
}

impl NotificationSource for BleSource {
    fn describe(&self) -> String {
        self.config.address.clone()
    }

    async fn connect(&mut self) -> Result<(), LifestreamError> {
        let timeout = self.config.connect_timeout;
        match tokio::time::timeout(timeout, self.establish()).await {
            Ok(result) => result,
            Err(_) => Err(LifestreamError::ConnectionTimeout {
                address: self.config.address.clone(),
                timeout_s: timeout.as_secs(),
            }),
        }
    }

    async fn next_payload(&mut self) -> Option<Vec<u8>> {
        let characteristic = self.config.characteristic;
        let notifications = self.notifications.as_mut()?;
        while let Some(notification) = notifications.next().await {
            if notification.uuid == characteristic {
                return Some(notification.value);
            }
        }
        self.notifications = None;
        None
    }
}

/// Replays recorded payloads as if they were coming from the sensor.
///
/// Each line of a replay file is one raw notification payload, which is the format the
/// readings writer produces. Lines are fed through the decoder untouched, so malformed
/// lines are dropped exactly like malformed notifications.
pub struct ReplaySource {
    name: String,
    payloads: std::vec::IntoIter<Vec<u8>>,
    interval: Duration,
}

impl ReplaySource {
    pub fn from_payloads(payloads: Vec<Vec<u8>>, interval: Duration) -> Self {
        Self {
            name: "replay".to_string(),
            payloads: payloads.into_iter(),
            interval,
        }
    }

    pub fn from_file(path: &Path, interval: Duration) -> Result<Self, LifestreamError> {
        let path_str = path.display().to_string();
        let file = std::fs::File::open(path).context(ReplayFileSnafu { path: &path_str })?;
        let payloads = std::io::BufReader::new(file)
            .lines()
            .map(|line| line.map(String::into_bytes))
            .collect::<Result<Vec<_>, _>>()
            .context(ReplayFileSnafu { path: &path_str })?;

        if payloads.is_empty() {
            return Err(LifestreamError::InvalidReplayFile { path: path_str });
        }

        Ok(Self {
            name: path_str,
            payloads: payloads.into_iter(),
            interval,
        })
    }
}

impl NotificationSource for ReplaySource {
    fn describe(&self) -> String {
        self.name.clone()
    }

    async fn connect(&mut self) -> Result<(), LifestreamError> {
        Ok(())
    }

    async fn next_payload(&mut self) -> Option<Vec<u8>> {
        let payload = self.payloads.next()?;
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
        Some(payload)
    }
}
