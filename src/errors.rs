// Error types for lifestream

use crate::sensor::SensorEvent;
use snafu::Snafu;
use std::{io, str::Utf8Error, sync::mpsc::SendError};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LifestreamError {
    // Errors decoding sensor notifications
    #[snafu(display("Notification payload is not valid UTF-8"))]
    PayloadEncoding { source: Utf8Error },
    #[snafu(display("Could not decode sensor reading from payload {payload:?}"))]
    PayloadDecode {
        payload: String,
        source: serde_json::Error,
    },

    // Errors for the BLE link
    #[snafu(display("Bluetooth error: {source}"))]
    Bluetooth { source: btleplug::Error },
    #[snafu(display("No Bluetooth adapter available"))]
    NoAdapter,
    // covers scanning, connecting, service discovery and subscribing
    #[snafu(display("Timeout waiting for sensor {address} after {timeout_s}s"))]
    ConnectionTimeout { address: String, timeout_s: u64 },
    // the adapter closed its scan event stream before the sensor appeared
    #[snafu(display("Sensor {address} not found while scanning"))]
    DeviceNotFound { address: String },
    #[snafu(display("Sensor {address} reported not connected after connect"))]
    NotConnected { address: String },
    #[snafu(display("Sensor does not expose characteristic {uuid}"))]
    MissingCharacteristic { uuid: String },
    #[snafu(display("Could not start async runtime"))]
    AsyncRuntime { source: io::Error },

    // Errors while forwarding readings
    #[snafu(display("Error broadcasting sensor event"))]
    SensorBroadcast { source: Box<SendError<SensorEvent>> },

    // Errors for the remote document store
    #[snafu(display("Could not configure document store: {source}"))]
    StoreConfig { source: mongodb::error::Error },
    #[snafu(display("Could not insert document: {reason}"))]
    StoreWrite { reason: String },

    // Errors for the reading writer and replay files
    #[snafu(display("Error writing readings file"))]
    WriterError { source: io::Error },
    #[snafu(display("Error reading replay file {path}"))]
    ReplayFile { path: String, source: io::Error },
    #[snafu(display("Invalid replay file: {path}"))]
    InvalidReplayFile { path: String },

    // UI errors
    #[snafu(display("Could not start the monitor window: {reason}"))]
    Gui { reason: String },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error reading or writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },
}

impl From<SendError<SensorEvent>> for LifestreamError {
    fn from(value: SendError<SensorEvent>) -> Self {
        LifestreamError::SensorBroadcast {
            source: Box::new(value),
        }
    }
}

impl From<btleplug::Error> for LifestreamError {
    fn from(value: btleplug::Error) -> Self {
        LifestreamError::Bluetooth { source: value }
    }
}
