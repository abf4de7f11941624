pub mod producer;
pub mod session;

pub use producer::{BleSource, DeviceConfig, NotificationSource, ReplaySource};
pub use session::{run_session, spawn_session};

use crate::reading::Reading;

/// Connection state reported by a running sensor session.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionStatus {
    Connecting,
    Connected,
    /// The link dropped or the source ran out of notifications. Sessions never reconnect.
    Disconnected,
    Failed(String),
}

/// Messages sent from a sensor session to the UI thread.
#[derive(Clone, Debug, PartialEq)]
pub enum SensorEvent {
    Status(SessionStatus),
    Reading(Reading),
}
