use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::AppConfig;
use crate::db::StagingStore;
use crate::document::{self, parse_document};
use crate::emitter::{MergeEmitter, MergeReport};
use crate::error::Result;
use crate::ingest::{IngestStats, Ingestor};
use crate::logging::OperationTimer;
use crate::metrics::MetricsCollector;

/// Outcome of one merge run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Documents ingested
    pub documents: usize,
    /// Totals across all documents
    pub ingest: IngestStats,
    /// SMS rows in the staging store after ingestion
    pub sms_staged: usize,
    /// Emission results
    pub merge: MergeReport,
}

impl RunSummary {
    /// SMS plus MMS rows loaded into the staging store
    #[must_use]
    pub const fn messages_staged(&self) -> usize {
        self.sms_staged + self.merge.mms_staged
    }
}

/// Stages a set of exports and writes the merged document
pub struct MergeService {
    store: StagingStore,
    emitter: MergeEmitter,
    metrics: MetricsCollector,
}

impl MergeService {
    /// Service over an open staging store
    #[must_use]
    pub fn new(config: &AppConfig, store: StagingStore) -> Self {
        Self {
            store,
            emitter: MergeEmitter::new(config.merge.progress_interval),
            metrics: MetricsCollector::default(),
        }
    }

    /// Totals recorded so far
    #[must_use]
    pub const fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Merge `inputs` into `output`.
    ///
    /// The staging store is cleared first, so a run never sees rows from an
    /// earlier one. The output is serialized completely before the file is
    /// written; any error leaves `output` untouched.
    pub fn run(&mut self, inputs: &[PathBuf], output: &Path) -> Result<RunSummary> {
        self.store.clear()?;

        let timer = OperationTimer::new("ingest");
        let ingest = self.ingest_all(inputs)?;
        self.metrics.record_stage("ingest", timer.finish());

        let sms_staged = self.store.sms_count()?;
        info!(
            messages = sms_staged + self.store.mms_count()?,
            skipped = ingest.skipped(),
            "Staging complete"
        );

        let timer = OperationTimer::new("emit");
        let (root, merge) = self.emitter.merge(&self.store)?;
        self.metrics.record_merge(&merge);
        let bytes = document::to_bytes(&root)?;
        fs::write(output, bytes)?;
        self.metrics.record_stage("emit", timer.finish());

        info!(
            output = %output.display(),
            sms = merge.sms_emitted,
            mms = merge.mms_emitted,
            duplicates = merge.duplicates_skipped,
            "Wrote merged document"
        );

        Ok(RunSummary {
            documents: inputs.len(),
            ingest,
            sms_staged,
            merge,
        })
    }

    fn ingest_all(&mut self, inputs: &[PathBuf]) -> Result<IngestStats> {
        let mut ingestor = Ingestor::new()?;

        for path in inputs {
            info!(path = %path.display(), "Loading document");
            let root = parse_document(path)?;

            let mut batch = self.store.begin_batch()?;
            let stats = ingestor.ingest_document(&mut batch, &root)?;
            batch.commit()?;

            debug!(
                path = %path.display(),
                loaded = stats.loaded,
                duplicates = stats.duplicates,
                rejected = stats.rejected,
                ignored = stats.ignored,
                "Document staged"
            );
            self.metrics.record_document(&stats);
        }

        Ok(ingestor.stats())
    }
}
