mod common;

use common::*;
use sms_backup_merge::db::StagingStore;
use sms_backup_merge::document::parse_str;
use sms_backup_merge::emitter::mms_element;
use sms_backup_merge::ingest::{IngestStats, Ingestor};
use sms_backup_merge::models::MmsRecord;

fn ingest(xml: &str) -> (StagingStore, IngestStats) {
    let mut store = StagingStore::open_in_memory().expect("Failed to open store");
    let mut ingestor = Ingestor::new().expect("Failed to create ingestor");
    let root = parse_str(xml).expect("Failed to parse fixture");
    let mut batch = store.begin_batch().expect("Failed to begin batch");
    let stats = ingestor.ingest_document(&mut batch, &root).expect("Failed to ingest");
    batch.commit().expect("Failed to commit");
    (store, stats)
}

fn staged_mms(store: &StagingStore) -> Vec<MmsRecord> {
    let mut all = Vec::new();
    store
        .for_each_mms(|mms| {
            all.push(mms);
            Ok(())
        })
        .unwrap();
    all
}

#[test]
fn test_sms_sub_id_is_dropped() {
    let (store, stats) = ingest(&document(&[sms_xml(&sms_attributes("+15551234567", "2", "1", "Jan 1, 2020"))]));

    assert_eq!(stats.loaded, 1);
    let mut seen = Vec::new();
    store
        .for_each_sms(|sms| {
            seen.push(sms.fields.to_element("sms"));
            Ok(())
        })
        .unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].attribute("sub_id"), None);
    assert_eq!(seen[0].attributes.len(), 15);
}

#[test]
fn test_mms_export_only_attributes_are_dropped() {
    let attributes = mms_attributes("5551234567", "100", "Jan 1, 2020");
    let attributes = with(attributes, "sequence_time", "100");
    let attributes = with(attributes, "_id", "4411");
    let attributes = with(attributes, "star_status", "0");
    let attributes = with(attributes, "oppo_sim_slot", "1");
    let attributes = with(attributes, "oppo_collapsed", "0");

    let (store, stats) = ingest(&document(&[mms_xml(&attributes, &[], &[])]));

    assert_eq!(stats.loaded, 1);
    assert_eq!(stats.rejected, 0);
    let element = mms_element(&staged_mms(&store)[0]);
    for dropped in ["sequence_time", "_id", "star_status", "oppo_sim_slot", "oppo_collapsed"] {
        assert_eq!(element.attribute(dropped), None, "{dropped} should not be emitted");
    }
}

#[test]
fn test_mms_sequence_time_mismatch_is_only_logged() {
    let attributes = with(mms_attributes("5551234567", "100", "Jan 1, 2020"), "sequence_time", "999");

    let (_, stats) = ingest(&document(&[mms_xml(&attributes, &[], &[])]));

    assert_eq!(stats.loaded, 1);
}

#[test]
fn test_unknown_attribute_rejects_record() {
    let sms = with(sms_attributes("+15551234567", "2", "1", "Jan 1, 2020"), "bogus", "x");
    let mms = with(mms_attributes("5551234567", "100", "Jan 1, 2020"), "bogus", "x");

    let (store, stats) = ingest(&document(&[sms_xml(&sms), mms_xml(&mms, &[], &[])]));

    assert_eq!(stats.loaded, 0);
    assert_eq!(stats.rejected, 2);
    assert_eq!(store.sms_count().unwrap(), 0);
    assert_eq!(store.mms_count().unwrap(), 0);
}

#[test]
fn test_unknown_part_attribute_rejects_parent_mms() {
    let part = with(part_attributes("hi"), "bogus", "x");

    let (store, stats) = ingest(&document(&[mms_xml(
        &mms_attributes("5551234567", "100", "Jan 1, 2020"),
        &[part],
        &[addr_attributes("5551234567", "151")],
    )]));

    assert_eq!(stats.rejected, 1);
    assert_eq!(store.mms_count().unwrap(), 0);
    assert_eq!(store.addr_count().unwrap(), 0);
}

#[test]
fn test_malformed_mms_does_not_stop_the_document() {
    let broken = without(mms_attributes("5551234567", "100", "Jan 1, 2020"), "m_type");
    let sms = sms_xml(&sms_attributes("+15551234567", "2", "1", "Jan 1, 2020"));
    let good = mms_xml(&mms_attributes("5551234567", "200", "Jan 2, 2020"), &[], &[]);

    let (store, stats) = ingest(&document(&[mms_xml(&broken, &[], &[]), sms, good]));

    assert_eq!(stats, IngestStats { loaded: 2, duplicates: 0, rejected: 1, ignored: 0 });
    assert_eq!(stats.skipped(), 1);
    assert_eq!(store.mms_count().unwrap(), 1);
    assert_eq!(store.sms_count().unwrap(), 1);
}

#[test]
fn test_other_top_level_elements_are_ignored() {
    let xml = document(&[
        "<call number=\"5551234567\" duration=\"12\" />".to_string(),
        sms_xml(&sms_attributes("+15551234567", "2", "1", "Jan 1, 2020")),
    ]);

    let (store, stats) = ingest(&xml);

    assert_eq!(stats.ignored, 1);
    assert_eq!(stats.loaded, 1);
    assert_eq!(store.sms_count().unwrap(), 1);
}

#[test]
fn test_optional_mms_attributes_survive_staging() {
    let attributes = with(mms_attributes("5551234567", "100", "Jan 1, 2020"), "favorite", "0");

    let (store, _) = ingest(&document(&[mms_xml(&attributes, &[], &[])]));

    let mms = &staged_mms(&store)[0];
    assert_eq!(mms.fields.get("favorite"), Some("0"));
    assert_eq!(mms.fields.get("using_mode"), None);
}

#[test]
fn test_stats_accumulate_across_documents() {
    let mut store = StagingStore::open_in_memory().expect("Failed to open store");
    let mut ingestor = Ingestor::new().expect("Failed to create ingestor");
    let xml = document(&[sms_xml(&sms_attributes("+15551234567", "2", "1", "Jan 1, 2020"))]);

    for _ in 0..2 {
        let root = parse_str(&xml).unwrap();
        let mut batch = store.begin_batch().unwrap();
        ingestor.ingest_document(&mut batch, &root).unwrap();
        batch.commit().unwrap();
    }

    assert_eq!(ingestor.stats(), IngestStats { loaded: 1, duplicates: 1, rejected: 0, ignored: 0 });
}
