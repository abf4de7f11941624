use std::{fs::File, io::BufWriter, path::Path, sync::mpsc::Receiver};

use log::error;
use serde_jsonlines::JsonLinesWriter;

use crate::{LifestreamError, reading::Reading};

/// Append every reading received on `reading_receiver` to `file` as JSON Lines, until all
/// senders are dropped. Each line has the same shape as a sensor notification, so the file
/// can be fed back through `ReplaySource`.
///
/// The file is flushed every time the channel runs dry, so whatever has been received is on
/// disk even while a session still holds a sender.
pub fn write_readings(
    file: &Path,
    reading_receiver: Receiver<Reading>,
) -> Result<usize, LifestreamError> {
    let readings_file = File::create(file).map_err(|e| LifestreamError::WriterError { source: e })?;
    let mut readings_writer = JsonLinesWriter::new(BufWriter::new(readings_file));
    let mut written = 0;
    while let Ok(first) = reading_receiver.recv() {
        for reading in std::iter::once(first).chain(reading_receiver.try_iter()) {
            match readings_writer.write(&reading) {
                Ok(()) => written += 1,
                Err(e) => error!("Error while writing reading to output file: {}", e),
            }
        }
        readings_writer
            .flush()
            .map_err(|e| LifestreamError::WriterError { source: e })?;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::decode_reading;
    use std::{
        sync::mpsc,
        thread,
        time::{Duration, Instant},
    };

    #[test]
    fn test_written_lines_decode_as_notifications() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.jsonl");
        let (tx, rx) = mpsc::channel();
        tx.send(Reading::new(20., 1., 60.)).unwrap();
        tx.send(Reading::new(36.6, 420., 71.)).unwrap();
        drop(tx);

        assert_eq!(write_readings(&path, rx).unwrap(), 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        let readings: Vec<Reading> = contents
            .lines()
            .map(|line| decode_reading(line.as_bytes()).unwrap())
            .collect();
        assert_eq!(
            readings,
            vec![Reading::new(20., 1., 60.), Reading::new(36.6, 420., 71.)]
        );
    }

    #[test]
    fn test_readings_reach_disk_while_sender_is_alive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.jsonl");
        let (tx, rx) = mpsc::channel();
        let writer_path = path.clone();
        let writer = thread::spawn(move || write_readings(&writer_path, rx));

        for i in 0..50 {
            tx.send(Reading::new(36. + i as f64 * 0.01, 400., 70.)).unwrap();
        }

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut lines = 0;
        while Instant::now() < deadline {
            lines = std::fs::read_to_string(&path)
                .map(|contents| contents.lines().count())
                .unwrap_or(0);
            if lines == 50 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(lines, 50, "readings must be flushed before the sender is dropped");

        drop(tx);
        assert_eq!(writer.join().unwrap().unwrap(), 50);
    }

    #[test]
    fn test_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("readings.jsonl");
        let (_tx, rx) = mpsc::channel::<Reading>();
        assert!(matches!(
            write_readings(&path, rx),
            Err(LifestreamError::WriterError { .. })
        ));
    }
}
