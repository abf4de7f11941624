pub mod mongo;

use std::{future::Future, sync::Arc, time::Duration};

use log::{debug, error, info};
use mongodb::bson::DateTime;
use serde::Serialize;
use tokio::{
    runtime::Handle,
    sync::watch,
    task::JoinHandle,
    time::MissedTickBehavior,
};

pub use mongo::MongoDocumentStore;

use crate::{errors::LifestreamError, reading::Reading};

pub const UPLOAD_INTERVAL_S: u64 = 10;

/// Document inserted into the remote store for every upload tick.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SensorDocument {
    pub username: String,
    pub temperature: f64,
    pub gsr: f64,
    pub bpm: f64,
    pub timestamp: DateTime,
}

impl SensorDocument {
    pub fn new(username: &str, reading: Reading, timestamp: DateTime) -> Self {
        Self {
            username: username.to_string(),
            temperature: reading.temperature,
            gsr: reading.conductance,
            bpm: reading.heart_rate,
            timestamp,
        }
    }
}

/// A remote store that accepts sensor documents.
pub trait DocumentStore: Send + Sync + 'static {
    /// Insert a single document.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or rejects the document.
    fn insert(
        &self,
        document: SensorDocument,
    ) -> impl Future<Output = Result<(), LifestreamError>> + Send;
}

/// What the uploader needs to know at tick time: who is recording and the most recent
/// reading. The UI publishes a fresh snapshot whenever either changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UploadSnapshot {
    pub username: String,
    pub latest: Option<Reading>,
}

/// Pushes the most recent reading to a [`DocumentStore`] on a fixed interval while
/// recording is on.
///
/// The first upload happens as soon as recording starts. Failed uploads are logged and
/// never retried; the next tick fires regardless. Stopping aborts the recurring task, so
/// no upload happens after [`Uploader::stop`] returns.
pub struct Uploader<S: DocumentStore> {
    store: Arc<S>,
    runtime: Handle,
    interval: Duration,
    snapshot: watch::Receiver<UploadSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl<S: DocumentStore> Uploader<S> {
    pub fn new(
        store: Arc<S>,
        runtime: Handle,
        interval: Duration,
        snapshot: watch::Receiver<UploadSnapshot>,
    ) -> Self {
        Self {
            store,
            runtime,
            interval,
            snapshot,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        debug!("Uploading latest reading every {:?}", self.interval);
        self.task = Some(self.runtime.spawn(upload_loop(
            self.store.clone(),
            self.snapshot.clone(),
            self.interval,
        )));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Stopped uploading readings");
        }
    }
}

impl<S: DocumentStore> Drop for Uploader<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn upload_loop<S: DocumentStore>(
    store: Arc<S>,
    snapshot: watch::Receiver<UploadSnapshot>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;

        let document = {
            let current = snapshot.borrow();
            current
                .latest
                .map(|reading| SensorDocument::new(&current.username, reading, DateTime::now()))
        };
        let Some(document) = document else {
            debug!("No readings yet, nothing to upload");
            continue;
        };

        match store.insert(document.clone()).await {
            Ok(()) => info!("Data sent to DB: {:?}", document),
            Err(e) => error!("Error sending data to DB: {}", e),
        }
    }
}
