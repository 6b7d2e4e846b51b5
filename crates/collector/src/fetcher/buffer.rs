use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use normalizer::RepositoryRecord;
use tracing::{debug, warn};

use crate::metrics;
use crate::sink::RecordSink;

struct Destination {
    sink: Arc<dyn RecordSink>,
    path: PathBuf,
}

/// Records accumulated by one fetch operation, checkpointed to the sink
/// every `checkpoint_interval` pushes.
pub struct RecordBuffer {
    records: Vec<RepositoryRecord>,
    destination: Option<Destination>,
    checkpoint_interval: usize,
}

impl RecordBuffer {
    pub fn new(
        sink: Arc<dyn RecordSink>,
        path: impl Into<PathBuf>,
        checkpoint_interval: usize,
    ) -> Self {
        Self {
            records: Vec::new(),
            destination: Some(Destination {
                sink,
                path: path.into(),
            }),
            checkpoint_interval,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            records: Vec::new(),
            destination: None,
            checkpoint_interval: 0,
        }
    }

    pub fn push(&mut self, record: RepositoryRecord) {
        self.records.push(record);
        if self.checkpoint_interval > 0 && self.records.len() % self.checkpoint_interval == 0 {
            metrics::CHECKPOINTS_TOTAL.inc();
            if let Err(err) = self.flush() {
                warn!(
                    records = self.records.len(),
                    error = ?err,
                    "checkpoint save failed; continuing"
                );
            }
        }
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = RepositoryRecord>) {
        for record in records {
            self.push(record);
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        let Some(destination) = &self.destination else {
            return Ok(());
        };
        if self.records.is_empty() {
            return Ok(());
        }
        destination.sink.save(&self.records, &destination.path)?;
        debug!(
            records = self.records.len(),
            path = %destination.path.display(),
            "saved progress"
        );
        Ok(())
    }

    pub fn finish(&mut self) -> Result<()> {
        self.flush()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[RepositoryRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingSink {
        saves: Mutex<Vec<usize>>,
    }

    impl RecordSink for CountingSink {
        fn save(&self, records: &[RepositoryRecord], _destination: &Path) -> Result<()> {
            self.saves.lock().unwrap().push(records.len());
            Ok(())
        }
    }

    struct FailingSink;

    impl RecordSink for FailingSink {
        fn save(&self, _records: &[RepositoryRecord], _destination: &Path) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[test]
    fn checkpoints_at_interval_multiples_and_finish() {
        let sink = Arc::new(CountingSink::default());
        let mut buffer = RecordBuffer::new(sink.clone(), "out.csv", 100);

        buffer.extend((0..250).map(|_| RepositoryRecord::default()));
        buffer.finish().unwrap();

        assert_eq!(*sink.saves.lock().unwrap(), vec![100, 200, 250]);
    }

    #[test]
    fn empty_flush_never_reaches_sink() {
        let sink = Arc::new(CountingSink::default());
        let mut buffer = RecordBuffer::new(sink.clone(), "out.csv", 100);

        buffer.finish().unwrap();

        assert!(sink.saves.lock().unwrap().is_empty());
    }

    #[test]
    fn failed_checkpoint_keeps_records() {
        let mut buffer = RecordBuffer::new(Arc::new(FailingSink), "out.csv", 1);

        buffer.push(RepositoryRecord::default());
        buffer.push(RepositoryRecord::default());

        assert_eq!(buffer.len(), 2);
        assert!(buffer.finish().is_err());
    }
}
