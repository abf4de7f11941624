// Integration tests for the sensor -> sample store -> charts/uploader pipeline
//
// A recorded session is replayed through the same session code the BLE source uses, and
// the UI-side steps (draining events, rebuilding charts, uploading) are driven by hand.

use std::{
    path::Path,
    sync::{Arc, Mutex, mpsc},
    time::Duration,
};

use lifestream::{
    ChartSnapshot, DocumentStore, LifestreamError, Reading, SampleStore, SensorDocument,
    SensorEvent, SessionStatus, UploadSnapshot, Uploader,
    sensor::{ReplaySource, run_session, spawn_session},
    writer::write_readings,
};
use tokio::sync::watch;

const SAMPLE_SESSION: &str = "tests/data/session_sample.jsonl";

#[derive(Default)]
struct MemoryStore {
    documents: Mutex<Vec<SensorDocument>>,
}

impl DocumentStore for MemoryStore {
    async fn insert(&self, document: SensorDocument) -> Result<(), LifestreamError> {
        self.documents.lock().unwrap().push(document);
        Ok(())
    }
}

/// Drain every event the way the monitor does at the start of a frame.
fn drain_into(store: &mut SampleStore, events: &mpsc::Receiver<SensorEvent>) -> Vec<SessionStatus> {
    let mut statuses = Vec::new();
    for event in events.try_iter() {
        match event {
            SensorEvent::Reading(reading) => store.push(reading),
            SensorEvent::Status(status) => statuses.push(status),
        }
    }
    statuses
}

#[tokio::test]
async fn test_replayed_session_fills_store() {
    let (tx, rx) = mpsc::channel();
    let source = ReplaySource::from_file(Path::new(SAMPLE_SESSION), Duration::ZERO).unwrap();

    let forwarded = run_session(source, tx, None).await.unwrap();
    assert_eq!(forwarded, 4, "three malformed lines must be dropped");

    let mut store = SampleStore::new();
    let statuses = drain_into(&mut store, &rx);
    assert_eq!(
        statuses,
        vec![
            SessionStatus::Connecting,
            SessionStatus::Connected,
            SessionStatus::Disconnected
        ]
    );

    assert_eq!(store.len(), 4);
    assert_eq!(store.index(), &[1, 2, 3, 4]);
    assert_eq!(store.temperature(), &[36.4, 36.5, 36.6, 36.7]);
    assert_eq!(store.conductance().len(), 4);
    assert_eq!(store.heart_rate().len(), 4);
    assert_eq!(store.latest(), Some(Reading::new(36.7, 421., 75.)));
}

#[tokio::test]
async fn test_captured_readings_replay_identically() {
    let dir = tempfile::tempdir().unwrap();
    let capture = dir.path().join("capture.jsonl");

    // live session with the writer attached
    let (tx, rx) = mpsc::channel();
    let (writer_tx, writer_rx) = mpsc::channel();
    let source = ReplaySource::from_file(Path::new(SAMPLE_SESSION), Duration::ZERO).unwrap();
    run_session(source, tx, Some(writer_tx)).await.unwrap();
    assert_eq!(write_readings(&capture, writer_rx).unwrap(), 4);
    let mut live_store = SampleStore::new();
    drain_into(&mut live_store, &rx);

    // replay of the capture
    let (tx, rx) = mpsc::channel();
    let source = ReplaySource::from_file(&capture, Duration::ZERO).unwrap();
    assert_eq!(run_session(source, tx, None).await.unwrap(), 4);
    let mut replay_store = SampleStore::new();
    drain_into(&mut replay_store, &rx);

    assert_eq!(live_store, replay_store);
}

#[test]
fn test_background_sessions_share_one_channel() {
    let (tx, rx) = mpsc::channel();
    let first = spawn_session(
        ReplaySource::from_file(Path::new(SAMPLE_SESSION), Duration::ZERO).unwrap(),
        tx.clone(),
        None,
    )
    .unwrap();
    let second = spawn_session(
        ReplaySource::from_file(Path::new(SAMPLE_SESSION), Duration::ZERO).unwrap(),
        tx,
        None,
    )
    .unwrap();
    first.join().unwrap();
    second.join().unwrap();

    let mut store = SampleStore::new();
    drain_into(&mut store, &rx);
    assert_eq!(store.len(), 8);
    assert_eq!(store.index().last(), Some(&8));
}

#[tokio::test]
async fn test_reset_then_charts_are_empty_and_stable() {
    let (tx, rx) = mpsc::channel();
    let source = ReplaySource::from_file(Path::new(SAMPLE_SESSION), Duration::ZERO).unwrap();
    run_session(source, tx, None).await.unwrap();

    let mut store = SampleStore::new();
    drain_into(&mut store, &rx);
    let before = ChartSnapshot::from_store(&store);
    assert_eq!(before, ChartSnapshot::from_store(&store));
    assert_eq!(before.sample_count(), 4);

    store.reset();
    assert!(store.is_empty());
    assert_eq!(ChartSnapshot::from_store(&store).sample_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_recording_uploads_latest_replayed_reading() {
    let (tx, rx) = mpsc::channel();
    let source = ReplaySource::from_file(Path::new(SAMPLE_SESSION), Duration::ZERO).unwrap();
    run_session(source, tx, None).await.unwrap();
    let mut samples = SampleStore::new();
    drain_into(&mut samples, &rx);

    let store = Arc::new(MemoryStore::default());
    let (snapshot_tx, snapshot_rx) = watch::channel(UploadSnapshot {
        username: "alice".to_string(),
        latest: samples.latest(),
    });
    let mut uploader = Uploader::new(
        store.clone(),
        tokio::runtime::Handle::current(),
        Duration::from_secs(10),
        snapshot_rx,
    );

    uploader.start();
    tokio::time::sleep(Duration::from_secs(1)).await;
    {
        let documents = store.documents.lock().unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].username, "alice");
        assert_eq!(documents[0].bpm, 75.);
    }

    // a reset leaves nothing to send, so the next tick is skipped
    samples.reset();
    snapshot_tx.send_modify(|s| s.latest = samples.latest());
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(store.documents.lock().unwrap().len(), 1);

    uploader.stop();
}
