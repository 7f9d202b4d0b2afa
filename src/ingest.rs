//! Record ingestion: export elements into staging rows.

use regex::Regex;
use tracing::{debug, warn};

use crate::db::{InsertOutcome, StagingBatch};
use crate::document::Element;
use crate::error::{MergeError, Result};
use crate::models::{AddrRecord, MmsRecord, PartRecord, Record, SmsRecord};
use crate::schema::{mmss, smss};

/// Top-level tag of an SMS entry
pub const SMS_TAG: &str = "sms";
/// Top-level tag of an MMS entry
pub const MMS_TAG: &str = "mms";
/// Container and item tags nested under an MMS
pub const PARTS_TAG: &str = "parts";
/// A single part
pub const PART_TAG: &str = "part";
/// Address container
pub const ADDRS_TAG: &str = "addrs";
/// A single address
pub const ADDR_TAG: &str = "addr";

/// Counters accumulated over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Records staged
    pub loaded: usize,
    /// Records already staged (exact duplicates)
    pub duplicates: usize,
    /// Records refused as malformed
    pub rejected: usize,
    /// Top-level elements that are neither SMS nor MMS
    pub ignored: usize,
}

impl IngestStats {
    /// Everything that was not staged
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.duplicates + self.rejected + self.ignored
    }

    fn record(&mut self, outcome: &InsertOutcome) {
        match outcome {
            InsertOutcome::Inserted => self.loaded += 1,
            InsertOutcome::Duplicate => self.duplicates += 1,
            InsertOutcome::Rejected(_) => self.rejected += 1,
        }
    }
}

impl std::ops::Sub for IngestStats {
    type Output = Self;

    fn sub(self, earlier: Self) -> Self {
        Self {
            loaded: self.loaded - earlier.loaded,
            duplicates: self.duplicates - earlier.duplicates,
            rejected: self.rejected - earlier.rejected,
            ignored: self.ignored - earlier.ignored,
        }
    }
}

/// Stages export documents. Owns the MMS id counter, so one ingestor must be
/// used for every document of a run.
pub struct Ingestor {
    next_mms_id: i64,
    stats: IngestStats,
    vendor_extension: Regex,
}

impl Ingestor {
    /// Ingestor whose first MMS gets id 0
    pub fn new() -> Result<Self> {
        Self::starting_at(0)
    }

    /// Ingestor whose first MMS gets `first_id`
    pub fn starting_at(first_id: i64) -> Result<Self> {
        Ok(Self {
            next_mms_id: first_id,
            stats: IngestStats::default(),
            vendor_extension: Regex::new(mmss::VENDOR_EXTENSION_PATTERN)?,
        })
    }

    /// Id the next MMS will receive
    #[must_use]
    pub const fn next_mms_id(&self) -> i64 {
        self.next_mms_id
    }

    /// Totals so far
    #[must_use]
    pub const fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Stage every top-level record of one document. Returns this
    /// document's counts; run totals are kept in [`Self::stats`].
    pub fn ingest_document(&mut self, batch: &mut StagingBatch<'_>, root: &Element) -> Result<IngestStats> {
        let before = self.stats;
        for child in &root.children {
            match child.tag.as_str() {
                SMS_TAG => {
                    let outcome = self.ingest_sms(batch, child)?;
                    self.stats.record(&outcome);
                }
                MMS_TAG => {
                    let outcome = self.ingest_mms(batch, child)?;
                    self.stats.record(&outcome);
                }
                other => {
                    debug!(tag = other, "Ignoring unrecognized element");
                    self.stats.ignored += 1;
                }
            }
        }
        Ok(self.stats - before)
    }

    fn ingest_sms(&self, batch: &StagingBatch<'_>, element: &Element) -> Result<InsertOutcome> {
        let attributes = element
            .attributes
            .iter()
            .filter(|(name, _)| !smss::DROPPED.contains(&name.as_str()))
            .map(|(name, value)| (name.as_str(), value.as_str()));

        let outcome = match SmsRecord::from_attributes(attributes) {
            Ok(sms) => batch.insert_sms(&sms)?,
            Err(err @ MergeError::UnknownAttribute { .. }) => InsertOutcome::Rejected(err.to_string()),
            Err(err) => return Err(err),
        };
        log_outcome(element, &outcome);
        Ok(outcome)
    }

    fn ingest_mms(&mut self, batch: &mut StagingBatch<'_>, element: &Element) -> Result<InsertOutcome> {
        let id = self.next_mms_id;
        self.next_mms_id += 1;

        let outcome = match self.build_mms(id, element) {
            Ok(mms) => batch.insert_mms(&mms)?,
            Err(err @ MergeError::UnknownAttribute { .. }) => InsertOutcome::Rejected(err.to_string()),
            Err(err) => return Err(err),
        };
        log_outcome(element, &outcome);
        Ok(outcome)
    }

    fn build_mms(&self, id: i64, element: &Element) -> Result<MmsRecord> {
        if let Some(sequence_time) = element.attribute(mmss::SEQUENCE_TIME) {
            let date = element.attribute(mmss::DATE);
            if !sequence_time.is_empty() && Some(sequence_time) != date {
                debug!(id, sequence_time, date, "Found sequence_time different from date");
            }
        }
        if let Some(star_status) = element.attribute(mmss::STAR_STATUS) {
            if !star_status.is_empty() && star_status != "null" {
                debug!(id, star_status, "Found unhandled star_status value");
            }
        }

        let attributes = element
            .attributes
            .iter()
            .filter(|(name, _)| !self.is_dropped_mms_attribute(name))
            .map(|(name, value)| (name.as_str(), value.as_str()));
        let fields = Record::from_attributes(&mmss::SCHEMA, attributes)?;

        let parts = element
            .find(PARTS_TAG)
            .into_iter()
            .flat_map(|container| container.find_all(PART_TAG))
            .map(|part| PartRecord::from_attributes(pairs(part)))
            .collect::<Result<Vec<_>>>()?;

        let addrs = element
            .find(ADDRS_TAG)
            .into_iter()
            .flat_map(|container| container.find_all(ADDR_TAG))
            .map(|addr| AddrRecord::from_attributes(pairs(addr)))
            .collect::<Result<Vec<_>>>()?;

        Ok(MmsRecord { id, fields, parts, addrs })
    }

    fn is_dropped_mms_attribute(&self, name: &str) -> bool {
        name == mmss::SEQUENCE_TIME
            || name == mmss::SOURCE_ID
            || name == mmss::STAR_STATUS
            || self.vendor_extension.is_match(name)
    }
}

fn pairs(element: &Element) -> impl Iterator<Item = (&str, &str)> {
    element
        .attributes
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
}

fn log_outcome(element: &Element, outcome: &InsertOutcome) {
    match outcome {
        InsertOutcome::Inserted => {}
        InsertOutcome::Duplicate => debug!(tag = %element.tag, "Skipping record already staged"),
        InsertOutcome::Rejected(reason) => {
            warn!(tag = %element.tag, %reason, "Skipping record the staging store refused");
        }
    }
}
