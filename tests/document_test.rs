mod common;

use common::write_file;
use sms_backup_merge::document::{parse_document, parse_str, to_bytes, Element};
use sms_backup_merge::error::MergeError;
use tempfile::TempDir;

#[test]
fn test_parse_nested_elements_in_order() {
    let root = parse_str(
        "<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>\n\
         <smses count=\"2\"><sms address=\"1\" /><mms m_id=\"x\"><parts><part seq=\"0\" /></parts></mms></smses>",
    )
    .unwrap();

    assert_eq!(root.tag, "smses");
    assert_eq!(root.attribute("count"), Some("2"));
    let tags: Vec<&str> = root.children.iter().map(|child| child.tag.as_str()).collect();
    assert_eq!(tags, vec!["sms", "mms"]);
    let part = root.children[1].find("parts").and_then(|parts| parts.find("part"));
    assert_eq!(part.and_then(|part| part.attribute("seq")), Some("0"));
}

#[test]
fn test_mismatched_end_tag_is_tolerated() {
    let root = parse_str("<smses><sms address=\"1\"></mms></smses>").unwrap();
    assert_eq!(root.children.len(), 1);
    assert_eq!(root.children[0].tag, "sms");
}

#[test]
fn test_stray_end_tag_after_root_is_ignored() {
    let root = parse_str("<smses><sms address=\"1\" /></smses></smses>").unwrap();
    assert_eq!(root.children.len(), 1);
}

#[test]
fn test_truncated_document_keeps_complete_records() {
    let root = parse_str("<smses count=\"3\"><sms address=\"1\" /><sms address=\"2\" />").unwrap();
    assert_eq!(root.tag, "smses");
    assert_eq!(root.children.len(), 2);
}

#[test]
fn test_content_after_root_is_ignored() {
    let root = parse_str("<smses><sms address=\"1\" /></smses><smses><sms address=\"2\" /></smses>").unwrap();
    assert_eq!(root.children.len(), 1);
    assert_eq!(root.children[0].attribute("address"), Some("1"));
}

#[test]
fn test_document_without_root_is_fatal() {
    let result = parse_str("<?xml version='1.0' ?>");
    assert!(matches!(result, Err(MergeError::Parse { .. })));
}

#[test]
fn test_unterminated_tag_is_fatal() {
    assert!(parse_str("<smses><sms address=\"1\"").is_err());
}

#[test]
fn test_emoji_surrogate_pair_attribute() {
    let root = parse_str("<smses><sms body=\"ok &#55357;&#56397;\" /></smses>").unwrap();
    assert_eq!(root.children[0].attribute("body"), Some("ok \u{1F44D}"));
}

#[test]
fn test_bare_ampersand_keeps_later_newline() {
    let root = parse_str("<smses><sms body=\"Tom & Jerry&#10;line\" /></smses>").unwrap();
    assert_eq!(root.children[0].attribute("body"), Some("Tom & Jerry\nline"));

    let text = String::from_utf8(to_bytes(&root).unwrap()).unwrap();
    assert!(text.contains("body=\"Tom &amp; Jerry&#10;line\""));
}

#[test]
fn test_serialized_output_shape() {
    let mut root = Element::new("smses");
    root.set_attribute("count", "1");
    let mut sms = Element::new("sms");
    sms.set_attribute("body", "a < b & \"c\"");
    root.push(sms);

    let text = String::from_utf8(to_bytes(&root).unwrap()).unwrap();

    assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n"));
    assert!(text.contains("<smses count=\"1\">"));
    assert!(text.contains("\n  <sms body=\"a &lt; b &amp; &quot;c&quot;\"/>"));
    assert!(text.ends_with("</smses>\n"));
}

#[test]
fn test_multiline_body_round_trips() {
    let mut root = Element::new("smses");
    let mut sms = Element::new("sms");
    sms.set_attribute("body", "first\nsecond\r\n\tindented");
    root.push(sms);

    let reparsed = parse_str(&String::from_utf8(to_bytes(&root).unwrap()).unwrap()).unwrap();

    assert_eq!(reparsed, root);
}

#[test]
fn test_parse_document_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "empty.xml", "");

    match parse_document(&path) {
        Err(MergeError::Parse { source_name, .. }) => assert!(source_name.ends_with("empty.xml")),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_parse_document_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = parse_document(&dir.path().join("absent.xml"));
    assert!(matches!(result, Err(MergeError::Io(_))));
}
