//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use sms_backup_merge::document::escape_attribute;

/// Attribute list in document order
pub type Attributes = Vec<(String, String)>;

fn attrs(pairs: &[(&str, &str)]) -> Attributes {
    pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

/// Every SMS attribute an exporter writes, `sub_id` included
pub fn sms_attributes(address: &str, message_type: &str, date_sent: &str, readable_date: &str) -> Attributes {
    attrs(&[
        ("protocol", "0"),
        ("address", address),
        ("date", date_sent),
        ("type", message_type),
        ("subject", "null"),
        ("body", "Hello there"),
        ("toa", "null"),
        ("sc_toa", "null"),
        ("service_center", "null"),
        ("read", "1"),
        ("status", "-1"),
        ("locked", "0"),
        ("date_sent", date_sent),
        ("readable_date", readable_date),
        ("contact_name", "Alice"),
        ("sub_id", "1"),
    ])
}

/// The required MMS attributes only
pub fn mms_attributes(address: &str, date_sent: &str, readable_date: &str) -> Attributes {
    attrs(&[
        ("text_only", "1"),
        ("ct_t", "application/vnd.wap.multipart.related"),
        ("msg_box", "2"),
        ("v", "18"),
        ("retr_txt_cs", "null"),
        ("ct_cls", "null"),
        ("st", "null"),
        ("tr_id", "T17a"),
        ("read", "1"),
        ("m_id", "mid-1"),
        ("m_type", "128"),
        ("retr_txt", "null"),
        ("locked", "0"),
        ("resp_txt", "null"),
        ("retr_st", "null"),
        ("sub", "null"),
        ("rr", "129"),
        ("seen", "1"),
        ("ct_l", "null"),
        ("m_size", "null"),
        ("exp", "604800"),
        ("sub_cs", "null"),
        ("sub_id", "1"),
        ("resp_st", "null"),
        ("date", date_sent),
        ("date_sent", date_sent),
        ("pri", "129"),
        ("address", address),
        ("read_status", "null"),
        ("d_tm", "null"),
        ("d_rpt", "129"),
        ("rpt_a", "null"),
        ("m_cls", "personal"),
        ("readable_date", readable_date),
        ("contact_name", "Alice"),
    ])
}

/// A text part
pub fn part_attributes(text: &str) -> Attributes {
    attrs(&[
        ("seq", "0"),
        ("ct", "text/plain"),
        ("name", "null"),
        ("chset", "106"),
        ("cd", "null"),
        ("fn", "null"),
        ("cid", "<text_0>"),
        ("cl", "text_0.txt"),
        ("ctt_s", "null"),
        ("ctt_t", "null"),
        ("text", text),
    ])
}

/// An MMS participant
pub fn addr_attributes(address: &str, direction: &str) -> Attributes {
    attrs(&[("address", address), ("type", direction), ("charset", "106")])
}

/// Replace or append one attribute
pub fn with(mut attributes: Attributes, name: &str, value: &str) -> Attributes {
    match attributes.iter_mut().find(|(key, _)| key == name) {
        Some(entry) => entry.1 = value.to_string(),
        None => attributes.push((name.to_string(), value.to_string())),
    }
    attributes
}

/// Remove one attribute
pub fn without(mut attributes: Attributes, name: &str) -> Attributes {
    attributes.retain(|(key, _)| key != name);
    attributes
}

fn open_tag(tag: &str, attributes: &Attributes) -> String {
    let mut out = format!("<{tag}");
    for (key, value) in attributes {
        let _ = write!(out, " {key}=\"{}\"", escape_attribute(value));
    }
    out
}

/// `<sms .../>`
pub fn sms_xml(attributes: &Attributes) -> String {
    format!("{} />", open_tag("sms", attributes))
}

/// `<mms ...>` with `parts` and `addrs` containers
pub fn mms_xml(attributes: &Attributes, parts: &[Attributes], addrs: &[Attributes]) -> String {
    let mut out = format!("{}>\n<parts>\n", open_tag("mms", attributes));
    for part in parts {
        out.push_str(&open_tag("part", part));
        out.push_str(" />\n");
    }
    out.push_str("</parts>\n<addrs>\n");
    for addr in addrs {
        out.push_str(&open_tag("addr", addr));
        out.push_str(" />\n");
    }
    out.push_str("</addrs>\n</mms>");
    out
}

/// Complete export document around `records`
pub fn document(records: &[String]) -> String {
    format!(
        "<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>\n<smses count=\"{}\">\n{}\n</smses>\n",
        records.len(),
        records.join("\n")
    )
}

/// Write `contents` to `dir/name` and return the path
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("Failed to write fixture");
    path
}
