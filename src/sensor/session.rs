use std::{
    sync::mpsc::Sender,
    thread::{self, JoinHandle},
};

use log::{debug, error, info, warn};
use snafu::ResultExt;

use crate::{
    errors::{AsyncRuntimeSnafu, LifestreamError},
    reading::{Reading, decode_reading},
};

use super::{NotificationSource, SensorEvent, SessionStatus};

/// Drive one sensor connection until the link drops.
///
/// Valid readings are forwarded to the UI channel and, if present, to the writer channel.
/// Malformed payloads are logged and dropped. There is no reconnect: once the source stops
/// producing payloads the session reports `Disconnected` and returns the number of readings
/// it forwarded.
pub async fn run_session(
    mut source: impl NotificationSource,
    event_sender: Sender<SensorEvent>,
    mut writer_sender: Option<Sender<Reading>>,
) -> Result<usize, LifestreamError> {
    let device = source.describe();
    event_sender.send(SensorEvent::Status(SessionStatus::Connecting))?;

    if let Err(e) = source.connect().await {
        error!("Could not connect to sensor {}: {}", device, e);
        event_sender.send(SensorEvent::Status(SessionStatus::Failed(e.to_string())))?;
        return Err(e);
    }
    info!("Receiving notifications from sensor {}", device);
    event_sender.send(SensorEvent::Status(SessionStatus::Connected))?;

    let mut forwarded = 0;
    while let Some(payload) = source.next_payload().await {
        let reading = match decode_reading(&payload) {
            Ok(reading) => reading,
            Err(e) => {
                error!("Dropping sensor payload: {}", e);
                continue;
            }
        };
        debug!("Reading from {}: {:?}", device, reading);

        event_sender.send(SensorEvent::Reading(reading)).map_err(|e| {
            warn!("UI stopped listening, closing session with {}", device);
            LifestreamError::from(e)
        })?;

        let writer_gone = writer_sender
            .as_ref()
            .is_some_and(|writer| writer.send(reading).is_err());
        if writer_gone {
            error!("Readings writer stopped, no longer capturing readings to file");
            writer_sender = None;
        }
        forwarded += 1;
    }

    warn!("Sensor {} stopped sending notifications", device);
    event_sender.send(SensorEvent::Status(SessionStatus::Disconnected))?;
    Ok(forwarded)
}

fn report_failure(event_sender: &Sender<SensorEvent>, reason: String) {
    if event_sender
        .send(SensorEvent::Status(SessionStatus::Failed(reason)))
        .is_err()
    {
        warn!("UI stopped listening, could not report session failure");
    }
}

/// Run a sensor session on a dedicated thread with its own async runtime, so the UI
/// thread never waits on radio I/O.
pub fn spawn_session<S>(
    source: S,
    event_sender: Sender<SensorEvent>,
    writer_sender: Option<Sender<Reading>>,
) -> Result<JoinHandle<()>, LifestreamError>
where
    S: NotificationSource + Send + 'static,
{
    thread::Builder::new()
        .name("sensor-session".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("Could not start sensor session runtime: {}", e);
                    report_failure(&event_sender, e.to_string());
                    return;
                }
            };
            match runtime.block_on(run_session(source, event_sender, writer_sender)) {
                Ok(forwarded) => info!("Sensor session ended after {} readings", forwarded),
                Err(e) => error!("Sensor session ended: {}", e),
            }
        })
        .context(AsyncRuntimeSnafu)
}
