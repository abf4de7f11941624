pub(crate) mod config;
mod monitor_view;

use std::{
    path::PathBuf,
    sync::mpsc::{self, Receiver, Sender},
    time::{Duration, Instant},
};

use egui::{Color32, Visuals, style::Widgets};
use log::{debug, error, info, warn};
use tokio::sync::watch;

use config::AppConfig;
use lifestream::{
    ChartSnapshot, DocumentStore, LifestreamError, Reading, SampleStore, SensorEvent,
    SessionStatus, UploadSnapshot, Uploader,
    schedule::Ticker,
    sensor::{BleSource, DeviceConfig, ReplaySource, spawn_session},
};

pub(crate) const PALETTE_BLACK: Color32 = Color32::from_rgb(16, 18, 22);
pub(crate) const PALETTE_PANEL: Color32 = Color32::from_rgb(28, 32, 38);
pub(crate) const PALETTE_TEMPERATURE: Color32 = Color32::from_rgb(220, 60, 50);
pub(crate) const PALETTE_GSR: Color32 = Color32::from_rgb(60, 120, 220);
pub(crate) const PALETTE_BPM: Color32 = Color32::from_rgb(60, 180, 90);

pub(crate) const STATUS_IDLE: &str = "Press 'Start BLE Communication' to connect.";
const STATUS_CONNECTING: &str = "Trying to connect...";
const STATUS_RECEIVING: &str = "Data is being received...";

/// Where a started session gets its notifications from.
#[derive(Clone, Debug)]
pub(crate) enum SessionLauncher {
    Ble(DeviceConfig),
    Replay { input: PathBuf, interval: Duration },
}

impl SessionLauncher {
    fn launch(
        &self,
        event_sender: Sender<SensorEvent>,
        writer_sender: Option<Sender<Reading>>,
    ) -> Result<(), LifestreamError> {
        match self {
            Self::Ble(device) => {
                spawn_session(BleSource::new(device.clone()), event_sender, writer_sender)?;
            }
            Self::Replay { input, interval } => {
                let source = ReplaySource::from_file(input, *interval)?;
                spawn_session(source, event_sender, writer_sender)?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RecordingState {
    Idle,
    Recording,
}

/// `MonitorApp` shows live sensor readings and records them to a document store.
///
/// Readings arrive from background sensor sessions over a channel and are drained into the
/// sample store at the start of every frame. Charts are rebuilt from the store once per
/// refresh period. While recording, an [`Uploader`] pushes the latest reading to the store
/// on its own schedule; the app publishes the latest reading and username to it through a
/// watch channel.
pub(crate) struct MonitorApp<S: DocumentStore> {
    launcher: SessionLauncher,
    event_sender: Sender<SensorEvent>,
    event_receiver: Receiver<SensorEvent>,
    writer_sender: Option<Sender<Reading>>,
    samples: SampleStore,
    charts: ChartSnapshot,
    chart_ticker: Ticker,
    snapshot_sender: watch::Sender<UploadSnapshot>,
    uploader: Option<Uploader<S>>,
    recording: RecordingState,
    sessions_started: usize,
    username: String,
    status: String,
    app_config: AppConfig,
}

impl<S: DocumentStore> MonitorApp<S> {
    /// `uploader_factory` builds the uploader from the snapshot channel; it returns `None`
    /// when no document store could be configured, in which case recording is unavailable.
    pub(crate) fn new(
        launcher: SessionLauncher,
        app_config: AppConfig,
        writer_sender: Option<Sender<Reading>>,
        uploader_factory: impl FnOnce(watch::Receiver<UploadSnapshot>) -> Option<Uploader<S>>,
    ) -> Self {
        let (event_sender, event_receiver) = mpsc::channel();
        let username = app_config.username.clone();
        let (snapshot_sender, snapshot_receiver) = watch::channel(UploadSnapshot {
            username: username.clone(),
            latest: None,
        });

        Self {
            launcher,
            event_sender,
            event_receiver,
            writer_sender,
            samples: SampleStore::new(),
            charts: ChartSnapshot::default(),
            chart_ticker: Ticker::new(app_config.chart_refresh(), Instant::now()),
            snapshot_sender,
            uploader: uploader_factory(snapshot_receiver),
            recording: RecordingState::Idle,
            sessions_started: 0,
            username,
            status: STATUS_IDLE.to_string(),
            app_config,
        }
    }

    pub(crate) fn with_visuals(self, cc: &eframe::CreationContext<'_>) -> Self {
        cc.egui_ctx.set_visuals(Visuals {
            dark_mode: true,
            panel_fill: PALETTE_BLACK,
            window_fill: PALETTE_PANEL,
            faint_bg_color: PALETTE_PANEL,
            widgets: Widgets::dark(),
            ..Default::default()
        });
        self
    }

    /// Spawn a new sensor session. Every call spawns another one.
    pub(crate) fn start_session(&mut self) {
        self.status = STATUS_CONNECTING.to_string();
        match self
            .launcher
            .launch(self.event_sender.clone(), self.writer_sender.clone())
        {
            Ok(()) => {
                self.sessions_started += 1;
                info!("Started sensor session #{}", self.sessions_started);
            }
            Err(e) => {
                error!("Could not start sensor session: {}", e);
                self.status = format!("Could not start session: {}", e);
            }
        }
    }

    pub(crate) fn toggle_recording(&mut self) {
        match self.recording {
            RecordingState::Idle => {
                let Some(uploader) = self.uploader.as_mut() else {
                    warn!("No document store configured, cannot record readings");
                    return;
                };
                uploader.start();
                self.recording = RecordingState::Recording;
                info!("Recording readings for '{}'", self.username);
            }
            RecordingState::Recording => {
                if let Some(uploader) = self.uploader.as_mut() {
                    uploader.stop();
                }
                self.recording = RecordingState::Idle;
                info!("Stopped recording readings");
            }
        }
    }

    /// Clear all samples and the charts. Running sessions and recording are untouched.
    pub(crate) fn reset(&mut self) {
        self.samples.reset();
        self.charts = ChartSnapshot::from_store(&self.samples);
        self.status = STATUS_IDLE.to_string();
        self.snapshot_sender.send_modify(|s| s.latest = None);
        debug!("Samples cleared");
    }

    pub(crate) fn username_changed(&mut self) {
        let username = self.username.clone();
        self.snapshot_sender.send_modify(|s| s.username = username);
    }

    /// Move every pending sensor event into the app state.
    pub(crate) fn drain_events(&mut self) -> usize {
        let mut received = 0;
        while let Ok(event) = self.event_receiver.try_recv() {
            match event {
                SensorEvent::Reading(reading) => {
                    self.samples.push(reading);
                    self.status = STATUS_RECEIVING.to_string();
                    received += 1;
                }
                SensorEvent::Status(status) => self.status = status_text(&status),
            }
        }
        if received > 0 {
            let latest = self.samples.latest();
            self.snapshot_sender.send_modify(|s| s.latest = latest);
        }
        received
    }

    /// Rebuild the charts if the refresh period elapsed.
    pub(crate) fn refresh_charts(&mut self, now: Instant) -> bool {
        if !self.chart_ticker.poll(now) {
            return false;
        }
        self.charts = ChartSnapshot::from_store(&self.samples);
        true
    }
}

fn status_text(status: &SessionStatus) -> String {
    match status {
        SessionStatus::Connecting => STATUS_CONNECTING.to_string(),
        SessionStatus::Connected => "Connected, waiting for data...".to_string(),
        SessionStatus::Disconnected => {
            "Sensor disconnected. Press 'Start BLE Communication' to reconnect.".to_string()
        }
        SessionStatus::Failed(reason) => format!("Connection failed: {}", reason),
    }
}

impl<S: DocumentStore> eframe::App for MonitorApp<S> {
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Some(uploader) = self.uploader.as_mut() {
            uploader.stop();
        }
        self.app_config.username = self.username.clone();
        if let Err(e) = self.app_config.save() {
            error!("Error while saving config file: {}", e);
        }
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        let now = Instant::now();
        self.refresh_charts(now);

        self.monitor_view(ctx);

        // sessions have no handle on the egui context, so poll at least once per refresh
        ctx.request_repaint_after(self.chart_ticker.time_until_due(now));
    }
}
