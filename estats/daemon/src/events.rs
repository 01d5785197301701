//! Record ingestion from per-category streams
//!
//! Runs one loop per category. Each loop reads raw samples from its source,
//! decodes them and applies them to the shared store, strictly in stream
//! order. Loops only meet through the store.

use crate::{
    db::EstatsDb,
    error::EstatsError,
    record::Record,
    source::{RecordSource, SourceError},
    types::Category,
};
use log::{debug, info, warn};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{task::JoinHandle, time::interval};

/// Counters shared by every ingestion loop
#[derive(Debug, Default)]
pub struct IngestCounters {
    applied: AtomicU64,
    dropped: AtomicU64,
    read_errors: AtomicU64,
}

impl IngestCounters {
    /// Records applied to the store
    pub fn applied(&self) -> u64 {
        self.applied.load(Ordering::Relaxed)
    }

    /// Samples discarded because they failed to decode
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Transient read errors reported by sources
    pub fn read_errors(&self) -> u64 {
        self.read_errors.load(Ordering::Relaxed)
    }
}

/// Outcome of one loop that stopped because its source closed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub applied: u64,
    pub dropped: u64,
    pub read_errors: u64,
}

/// Drive one category's stream into the store until the source closes
///
/// Malformed samples and transient read errors are skipped. The loop only
/// fails when a record names a variable the category does not have.
pub async fn ingest_loop<S: RecordSource>(
    db: &EstatsDb,
    category: Category,
    mut source: S,
    counters: &IngestCounters,
    verbose: bool,
) -> Result<IngestStats, EstatsError> {
    let mut stats = IngestStats::default();

    loop {
        let raw = match source.read().await {
            Ok(raw) => raw,
            Err(SourceError::Closed) => break,
            Err(e) => {
                warn!("Error reading {} table: {}", category.name(), e);
                stats.read_errors += 1;
                counters.read_errors.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };

        let record = match Record::decode(&raw) {
            Ok(record) => record,
            Err(e) => {
                debug!("Dropping {} table entry: {}", category.name(), e);
                stats.dropped += 1;
                counters.dropped.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };

        let value = db.ingest(category, &record)?;

        if verbose {
            debug!("{} table: {} => {}", category.name(), record, value);
        }

        stats.applied += 1;
        counters.applied.fetch_add(1, Ordering::Relaxed);
    }

    debug!(
        "{} table loop stopped: {} applied, {} dropped, {} read errors",
        category.name(),
        stats.applied,
        stats.dropped,
        stats.read_errors
    );

    Ok(stats)
}

/// Spawns and tracks the ingestion tasks
pub struct EventProcessor {
    db: Arc<EstatsDb>,
    counters: Arc<IngestCounters>,
    verbose: bool,
}

impl EventProcessor {
    /// Create a new event processor
    ///
    /// # Arguments
    ///
    /// * `db` - Shared connection store
    /// * `verbose` - Log every applied record
    pub fn new(db: Arc<EstatsDb>, verbose: bool) -> Self {
        Self {
            db,
            counters: Arc::new(IngestCounters::default()),
            verbose,
        }
    }

    pub fn counters(&self) -> &Arc<IngestCounters> {
        &self.counters
    }

    /// Spawn the ingestion loop for one category
    ///
    /// # Arguments
    ///
    /// * `category` - Table the source's records belong to
    /// * `source` - Stream of raw samples for that table
    ///
    /// # Returns
    ///
    /// Handle resolving to the loop's outcome
    pub fn spawn_reader<S>(
        &self,
        category: Category,
        source: S,
    ) -> JoinHandle<Result<IngestStats, EstatsError>>
    where
        S: RecordSource + 'static,
    {
        let db = Arc::clone(&self.db);
        let counters = Arc::clone(&self.counters);
        let verbose = self.verbose;

        info!("Spawning reader for {} table", category.name());

        tokio::spawn(async move { ingest_loop(&db, category, source, &counters, verbose).await })
    }

    /// Spawn progress reporter
    ///
    /// Creates a task that periodically reports ingestion progress.
    ///
    /// # Arguments
    ///
    /// * `interval_secs` - Reporting interval in seconds, 0 disables reporting
    ///
    /// # Returns
    ///
    /// Handle of the reporter task, `None` when reporting is disabled
    pub fn spawn_progress_reporter(&self, interval_secs: u64) -> Option<JoinHandle<()>> {
        if interval_secs == 0 {
            return None;
        }

        let db = Arc::clone(&self.db);
        let counters = Arc::clone(&self.counters);

        Some(tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(interval_secs));
            // first tick fires immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;

                info!(
                    "Progress: {} records applied, {} dropped, {} unique connections",
                    counters.applied(),
                    counters.dropped(),
                    db.len()
                );
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Operation, RECORD_SIZE};
    use crate::source::channel;
    use crate::types::ConnectionKey;
    use bytes::Bytes;
    use estats_common::{PerfVar, StackVar};
    use std::collections::VecDeque;

    /// Replays a fixed script, then reports closed
    struct ScriptedSource {
        script: VecDeque<Result<Bytes, SourceError>>,
    }

    impl RecordSource for ScriptedSource {
        async fn read(&mut self) -> Result<Bytes, SourceError> {
            self.script.pop_front().unwrap_or(Err(SourceError::Closed))
        }
    }

    fn key() -> ConnectionKey {
        ConnectionKey {
            pid_tgid: 1,
            saddr: 0x0100007f,
            daddr: 0x0200007f,
            sport: 40000,
            dport: 80,
        }
    }

    fn record(op: Operation, var: u32, val: u32) -> Bytes {
        Record {
            key: key(),
            op,
            var,
            val,
        }
        .encode()
    }

    #[tokio::test]
    async fn test_event_processor_creation() {
        let processor = EventProcessor::new(Arc::new(EstatsDb::new()), false);

        assert_eq!(processor.counters().applied(), 0);
        assert!(!processor.verbose);
    }

    #[tokio::test]
    async fn test_progress_reporter_disabled_at_zero() {
        let processor = EventProcessor::new(Arc::new(EstatsDb::new()), false);

        assert!(processor.spawn_progress_reporter(0).is_none());

        let reporter = processor.spawn_progress_reporter(60).unwrap();
        reporter.abort();
    }

    #[tokio::test]
    async fn test_set_then_add_on_perf_stream() {
        let db = Arc::new(EstatsDb::new());
        let processor = EventProcessor::new(Arc::clone(&db), true);
        let (tx, source) = channel(8);

        let handle = processor.spawn_reader(Category::Perf, source);
        tx.send(record(Operation::Set, PerfVar::SegsOut as u32, 10))
            .await
            .unwrap();
        tx.send(record(Operation::Add, PerfVar::SegsOut as u32, 5))
            .await
            .unwrap();
        drop(tx);

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.applied, 2);

        let export = db.snapshot().to_export();
        assert_eq!(export.len(), 1);
        assert_eq!(export[0].tables.perf["PERF_TABLE_SEGSOUT"], 15);
    }

    #[tokio::test]
    async fn test_closed_source_stops_immediately() {
        let db = EstatsDb::new();
        let counters = IngestCounters::default();
        let (tx, source) = channel(1);
        drop(tx);

        let stats = ingest_loop(&db, Category::Global, source, &counters, false)
            .await
            .unwrap();

        assert_eq!(stats, IngestStats::default());
        assert!(db.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_and_transient_errors_do_not_stop_loop() {
        let db = EstatsDb::new();
        let counters = IngestCounters::default();
        let var = StackVar::MaxMss as u32;

        let source = ScriptedSource {
            script: VecDeque::from(vec![
                Ok(Bytes::from_static(&[0u8; RECORD_SIZE - 4])),
                Err(SourceError::Io(std::io::Error::other("interrupted"))),
                Ok(record(Operation::Max, var, 1460)),
                Ok(Bytes::from(vec![0u8; RECORD_SIZE + 1])),
                Ok(record(Operation::Max, var, 536)),
            ]),
        };

        let stats = ingest_loop(&db, Category::Stack, source, &counters, false)
            .await
            .unwrap();

        assert_eq!(
            stats,
            IngestStats {
                applied: 2,
                dropped: 2,
                read_errors: 1
            }
        );
        assert_eq!(counters.dropped(), 2);
        assert_eq!(counters.read_errors(), 1);

        let estats = db.get(&key()).unwrap();
        assert_eq!(estats.table(Category::Stack).get(var), 1460);
    }

    #[tokio::test]
    async fn test_unknown_variable_is_fatal() {
        let db = EstatsDb::new();
        let counters = IngestCounters::default();

        let source = ScriptedSource {
            script: VecDeque::from(vec![
                Ok(record(Operation::Set, 3, 1)),
                Ok(record(Operation::Set, 0, 1)),
            ]),
        };

        let result = ingest_loop(&db, Category::Extras, source, &counters, false).await;

        assert_eq!(
            result,
            Err(EstatsError::UnknownVariable {
                category: Category::Extras,
                var: 3
            })
        );
        assert_eq!(counters.applied(), 0);
    }
}
