//! Merged document emission.
//!
//! Two passes over the staging store: every SMS, then every MMS that does
//! not duplicate one of those SMS.

use std::collections::HashSet;

use tracing::debug;

use crate::db::StagingStore;
use crate::dedup::IdentityKey;
use crate::document::Element;
use crate::error::Result;
use crate::ingest::{ADDRS_TAG, ADDR_TAG, MMS_TAG, PARTS_TAG, PART_TAG, SMS_TAG};
use crate::models::MmsRecord;

/// Root tag of an export document
pub const ROOT_TAG: &str = "smses";
/// Root attribute carrying the declared record count
pub const COUNT_ATTRIBUTE: &str = "count";

/// What the two emission passes produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// SMS elements written
    pub sms_emitted: usize,
    /// MMS rows staged, before duplicate filtering
    pub mms_staged: usize,
    /// MMS elements written
    pub mms_emitted: usize,
    /// MMS dropped as duplicates of an SMS
    pub duplicates_skipped: usize,
}

/// Builds the merged document from a filled staging store
#[derive(Debug, Clone)]
pub struct MergeEmitter {
    progress_interval: u64,
}

impl Default for MergeEmitter {
    fn default() -> Self {
        Self { progress_interval: 250 }
    }
}

impl MergeEmitter {
    /// Emitter that logs progress every `progress_interval` MMS rows
    #[must_use]
    pub const fn new(progress_interval: u64) -> Self {
        Self { progress_interval }
    }

    /// Run both passes and return the finished root element.
    pub fn merge(&self, store: &StagingStore) -> Result<(Element, MergeReport)> {
        let mut root = Element::new(ROOT_TAG);
        let mut report = MergeReport::default();

        let sms_keys = self.emit_sms(store, &mut root, &mut report)?;
        self.emit_mms(store, &mut root, &sms_keys, &mut report)?;

        Ok((root, report))
    }

    /// SMS pass. Returns the identity keys of every emitted SMS.
    pub fn emit_sms(
        &self,
        store: &StagingStore,
        root: &mut Element,
        report: &mut MergeReport,
    ) -> Result<HashSet<IdentityKey>> {
        let sms_count = store.sms_count()?;
        root.set_attribute(COUNT_ATTRIBUTE, sms_count.to_string());
        debug!(sms_count, "Writing SMS");

        let mut keys = HashSet::with_capacity(sms_count);
        store.for_each_sms(|sms| {
            keys.insert(IdentityKey::for_sms(&sms));
            root.push(sms.fields.to_element(SMS_TAG));
            report.sms_emitted += 1;
            Ok(())
        })?;
        Ok(keys)
    }

    /// MMS pass. Sets the root count to the staged MMS total, which
    /// includes the duplicates this pass goes on to drop.
    pub fn emit_mms(
        &self,
        store: &StagingStore,
        root: &mut Element,
        sms_keys: &HashSet<IdentityKey>,
        report: &mut MergeReport,
    ) -> Result<()> {
        let mms_count = store.mms_count()?;
        root.set_attribute(COUNT_ATTRIBUTE, mms_count.to_string());
        report.mms_staged = mms_count;
        debug!(mms_count, "Writing MMS");

        let mut row_num: u64 = 0;
        store.for_each_mms(|mms| {
            if self.progress_interval > 0 && row_num % self.progress_interval == 0 {
                debug!("Progress: {}/{}...", row_num, mms_count);
            }
            row_num += 1;

            let element = mms_element(&mms);
            match duplicate_key(&mms, sms_keys) {
                Some(key) => {
                    debug!(id = mms.id, ?key, "Found duplicate key");
                    report.duplicates_skipped += 1;
                }
                None => {
                    root.push(element);
                    report.mms_emitted += 1;
                }
            }
            Ok(())
        })
    }
}

/// Full `mms` element with its `parts` and `addrs` children.
#[must_use]
pub fn mms_element(mms: &MmsRecord) -> Element {
    let mut element = mms.fields.to_element(MMS_TAG);

    let mut parts = Element::new(PARTS_TAG);
    parts.children = mms.parts.iter().map(|part| part.fields.to_element(PART_TAG)).collect();
    element.push(parts);

    let mut addrs = Element::new(ADDRS_TAG);
    addrs.children = mms.addrs.iter().map(|addr| addr.fields.to_element(ADDR_TAG)).collect();
    element.push(addrs);

    element
}

/// First participant key of `mms` that matches an SMS key.
#[must_use]
pub fn duplicate_key<'a>(mms: &MmsRecord, sms_keys: &'a HashSet<IdentityKey>) -> Option<&'a IdentityKey> {
    mms.addrs
        .iter()
        .filter_map(|addr| IdentityKey::for_mms_addr(mms, addr))
        .find_map(|key| sms_keys.get(&key))
}
