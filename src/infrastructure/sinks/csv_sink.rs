use crate::domain::detection::Detection;
use crate::domain::errors::SinkError;
use crate::domain::ports::StorageSink;
use crate::infrastructure::sinks::row::{DetectionRow, now_millis};
use async_trait::async_trait;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Appends one CSV record per detection; writes the header on a new file
pub struct CsvSink {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl CsvSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every stored row
    pub fn read_all(&self) -> Result<Vec<DetectionRow>, SinkError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        reader
            .deserialize()
            .map(|record| record.map_err(SinkError::from))
            .collect()
    }

    fn append(path: &Path, row: &DetectionRow) -> Result<(), SinkError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let needs_header = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(row)?;
        writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl StorageSink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    async fn persist(&self, detection: &Detection) -> Result<(), SinkError> {
        let row = DetectionRow::from_detection(detection, now_millis());
        let path = self.path.clone();
        let lock = self.write_lock.clone();

        tokio::task::spawn_blocking(move || {
            // A poisoned lock only means an earlier append panicked; the file is still usable
            let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            Self::append(&path, &row)
        })
        .await
        .map_err(|e| SinkError::Io(std::io::Error::other(e.to_string())))??;

        debug!("CsvSink: appended {} to {:?}", detection.id, self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::sample_detection;

    #[tokio::test]
    async fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("out/detections.csv"));

        sink.persist(&sample_detection("BTC-USD", 0)).await.unwrap();
        sink.persist(&sample_detection("ETH-USD", 60_000)).await.unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(content.matches("pct_over").count(), 1);
        assert_eq!(content.lines().count(), 3);
        assert_eq!(sink.read_all().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("none.csv"));
        assert!(sink.read_all().unwrap().is_empty());
    }
}
