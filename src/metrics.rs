use std::time::Duration;

use ::metrics::{counter, histogram};

use crate::emitter::MergeReport;
use crate::ingest::IngestStats;

/// Run totals, mirrored to the `metrics` facade.
///
/// Without an installed recorder the facade calls are no-ops; the totals
/// kept here are what the final summary reads.
#[derive(Debug, Default, Clone)]
pub struct MetricsCollector {
    /// Records staged
    pub records_loaded_total: u64,
    /// Exact duplicates refused by the store
    pub records_duplicate_total: u64,
    /// Malformed records refused by the store
    pub records_rejected_total: u64,
    /// Top-level elements that were neither SMS nor MMS
    pub records_ignored_total: u64,
    /// SMS written to the output
    pub sms_emitted_total: u64,
    /// MMS written to the output
    pub mms_emitted_total: u64,
    /// MMS dropped as duplicates of an SMS
    pub mms_duplicates_total: u64,
    /// Input documents ingested
    pub documents_total: u64,
}

impl MetricsCollector {
    /// Counter name for staged records
    pub const RECORDS_LOADED: &'static str = "sms_merge_records_loaded_total";
    /// Counter name for records not staged, labelled by reason
    pub const RECORDS_SKIPPED: &'static str = "sms_merge_records_skipped_total";
    /// Counter name for emitted elements, labelled by kind
    pub const RECORDS_EMITTED: &'static str = "sms_merge_records_emitted_total";
    /// Counter name for MMS dropped as SMS duplicates
    pub const MMS_DUPLICATES: &'static str = "sms_merge_mms_duplicates_total";
    /// Counter name for ingested documents
    pub const DOCUMENTS: &'static str = "sms_merge_documents_total";
    /// Histogram name for stage durations, labelled by stage
    pub const STAGE_DURATION: &'static str = "sms_merge_stage_duration_seconds";

    /// Record one document's ingestion counts
    pub fn record_document(&mut self, stats: &IngestStats) {
        self.documents_total += 1;
        self.records_loaded_total += stats.loaded as u64;
        self.records_duplicate_total += stats.duplicates as u64;
        self.records_rejected_total += stats.rejected as u64;
        self.records_ignored_total += stats.ignored as u64;

        counter!(Self::DOCUMENTS).increment(1);
        counter!(Self::RECORDS_LOADED).increment(stats.loaded as u64);
        counter!(Self::RECORDS_SKIPPED, "reason" => "duplicate").increment(stats.duplicates as u64);
        counter!(Self::RECORDS_SKIPPED, "reason" => "rejected").increment(stats.rejected as u64);
        counter!(Self::RECORDS_SKIPPED, "reason" => "ignored").increment(stats.ignored as u64);
    }

    /// Record the emission passes
    pub fn record_merge(&mut self, report: &MergeReport) {
        self.sms_emitted_total += report.sms_emitted as u64;
        self.mms_emitted_total += report.mms_emitted as u64;
        self.mms_duplicates_total += report.duplicates_skipped as u64;

        counter!(Self::RECORDS_EMITTED, "kind" => "sms").increment(report.sms_emitted as u64);
        counter!(Self::RECORDS_EMITTED, "kind" => "mms").increment(report.mms_emitted as u64);
        counter!(Self::MMS_DUPLICATES).increment(report.duplicates_skipped as u64);
    }

    /// Record how long a pipeline stage took
    pub fn record_stage(&self, stage: &'static str, duration: Duration) {
        histogram!(Self::STAGE_DURATION, "stage" => stage).record(duration.as_secs_f64());
    }

    /// Records not staged, for any reason
    #[must_use]
    pub const fn records_skipped_total(&self) -> u64 {
        self.records_duplicate_total + self.records_rejected_total + self.records_ignored_total
    }
}
