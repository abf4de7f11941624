mod ui;

use std::{
    path::PathBuf,
    sync::{Arc, mpsc},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use clap::{Parser, Subcommand};
use egui::Vec2;
use log::{error, info, warn};
use snafu::ResultExt;
use tokio::runtime::Runtime;
use uuid::Uuid;

use lifestream::{
    LifestreamError, Reading, Uploader,
    errors::AsyncRuntimeSnafu,
    upload::MongoDocumentStore,
    writer,
};
use ui::{MonitorApp, SessionLauncher, config::AppConfig};

const DEFAULT_REPLAY_INTERVAL_MS: u64 = 1000;
// live sessions keep their writer sender until the link drops, so exit does not wait forever
const WRITER_SHUTDOWN_WAIT: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to the sensor over Bluetooth and monitor it live
    Live {
        /// Sensor address, overrides the config file
        #[arg(short, long)]
        address: Option<String>,

        /// Notification characteristic, overrides the config file
        #[arg(short, long)]
        characteristic: Option<Uuid>,

        /// Also capture every reading to this JSON Lines file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Monitor readings from a file captured with `live --output`
    Replay {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long, default_value_t = DEFAULT_REPLAY_INTERVAL_MS)]
        interval_ms: u64,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn spawn_writer(
    output: Option<PathBuf>,
) -> Option<(mpsc::Sender<Reading>, JoinHandle<()>)> {
    let output_file = output?;
    let (writer_tx, writer_rx) = mpsc::channel::<Reading>();
    let handle = thread::spawn(move || match writer::write_readings(&output_file, writer_rx) {
        Ok(written) => info!("Wrote {} readings to {:?}", written, output_file),
        Err(e) => error!("Readings writer failed: {}", e),
    });
    Some((writer_tx, handle))
}

/// Give the writer thread a bounded amount of time to see every sender dropped.
fn finish_writer(handle: JoinHandle<()>, wait: Duration) {
    let deadline = Instant::now() + wait;
    while !handle.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    if handle.is_finished() {
        if handle.join().is_err() {
            error!("Readings writer thread panicked");
        }
    } else {
        warn!("A sensor session is still running, leaving the readings writer behind");
    }
}

fn monitor(
    launcher: SessionLauncher,
    app_config: AppConfig,
    output: Option<PathBuf>,
) -> Result<(), LifestreamError> {
    // uploads and database I/O run here; sensor sessions bring their own runtime
    let runtime = Runtime::new().context(AsyncRuntimeSnafu)?;
    let document_store = match runtime.block_on(MongoDocumentStore::connect(
        &MongoDocumentStore::uri_from_env(),
        &app_config.database,
        &app_config.collection,
    )) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            error!("Recording disabled: {}", e);
            None
        }
    };

    let (writer_sender, writer_handle) = spawn_writer(output).unzip();
    let upload_interval = app_config.upload_interval();
    let runtime_handle = runtime.handle().clone();
    let app = MonitorApp::new(launcher, app_config, writer_sender, |snapshot| {
        document_store
            .map(|store| Uploader::new(store, runtime_handle, upload_interval, snapshot))
    });

    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = native_options
        .viewport
        .with_title("LifeStream IoT Health Monitoring")
        .with_inner_size(Vec2::new(800., 650.));

    // the app owns the last UI-side writer sender and is dropped when the window closes
    let result = eframe::run_native(
        "LifeStream IoT Health Monitoring",
        native_options,
        Box::new(|cc| Ok(Box::new(app.with_visuals(cc)))),
    )
    .map_err(|e| LifestreamError::Gui {
        reason: e.to_string(),
    });

    if let Some(handle) = writer_handle {
        finish_writer(handle, WRITER_SHUTDOWN_WAIT);
    }
    result
}

fn live(
    address: Option<String>,
    characteristic: Option<Uuid>,
    output: Option<PathBuf>,
) -> Result<(), LifestreamError> {
    let mut app_config = AppConfig::from_local_file().unwrap_or_default();
    if let Some(address) = address {
        app_config.device_address = address;
    }
    if let Some(characteristic) = characteristic {
        app_config.characteristic_uuid = characteristic;
    }
    let launcher = SessionLauncher::Ble(app_config.device_config());
    monitor(launcher, app_config, output)
}

fn replay(input: PathBuf, interval_ms: u64, output: Option<PathBuf>) -> Result<(), LifestreamError> {
    if !input.exists() {
        return Err(LifestreamError::InvalidReplayFile {
            path: format!("{:?}", input),
        });
    }
    let app_config = AppConfig::from_local_file().unwrap_or_default();
    let launcher = SessionLauncher::Replay {
        input,
        interval: Duration::from_millis(interval_ms),
    };
    monitor(launcher, app_config, output)
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();

    let cli = Args::parse();
    if let Err(e) = ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    }) {
        error!("Could not set Ctrl-C handler: {}", e);
    }

    let result = match cli.command {
        Commands::Live {
            address,
            characteristic,
            output,
        } => live(address, characteristic, output),
        Commands::Replay {
            input,
            interval_ms,
            output,
        } => replay(input, interval_ms, output),
    };
    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_live_overrides() {
        let args = Args::try_parse_from([
            "lifestream",
            "live",
            "--address",
            "AA:BB:CC:DD:EE:FF",
            "--characteristic",
            "19b10010-e8f2-537e-4f6c-d104768a1214",
        ])
        .unwrap();
        match args.command {
            Commands::Live {
                address,
                characteristic,
                output,
            } => {
                assert_eq!(address.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
                assert_eq!(
                    characteristic,
                    Some(lifestream::sensor::producer::DEFAULT_CHARACTERISTIC)
                );
                assert_eq!(output, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_replay_defaults() {
        let args = Args::try_parse_from(["lifestream", "replay", "-i", "readings.jsonl"]).unwrap();
        match args.command {
            Commands::Replay {
                input, interval_ms, ..
            } => {
                assert_eq!(input, PathBuf::from("readings.jsonl"));
                assert_eq!(interval_ms, DEFAULT_REPLAY_INTERVAL_MS);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_writer_finishes_once_senders_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.jsonl");
        let (sender, handle) = spawn_writer(Some(path.clone())).unwrap();
        sender.send(Reading::new(36.6, 420., 71.)).unwrap();
        drop(sender);

        finish_writer(handle, Duration::from_secs(5));
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn test_writer_wait_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let (sender, handle) = spawn_writer(Some(dir.path().join("capture.jsonl"))).unwrap();

        let started = Instant::now();
        finish_writer(handle, Duration::from_millis(100));
        assert!(started.elapsed() < Duration::from_secs(5));
        drop(sender);
    }

    #[test]
    fn test_no_writer_without_output() {
        assert!(spawn_writer(None).is_none());
    }

    #[test]
    fn test_rejects_bad_characteristic() {
        let result = Args::try_parse_from(["lifestream", "live", "-c", "not-a-uuid"]);
        assert!(result.is_err());
    }
}
