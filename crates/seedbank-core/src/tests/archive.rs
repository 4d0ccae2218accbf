use chrono::{TimeZone, Utc};
use serde_json::json;

use crate::archive::{Archive, NO_DESCRIPTION};
use crate::error::SeedbankError;

fn sample() -> Archive {
    let mut archive = Archive::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());
    archive.description = "Seed photos\nsecond line".into();
    archive.file_list = vec!["a.txt".into(), "sub/b.txt".into()];
    archive.size = 4096;
    archive
}

#[test]
fn uid_is_derived_from_create_time() {
    let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
    assert_eq!(Archive::new(t).uid, Archive::new(t).uid);
    assert_ne!(
        Archive::new(t).uid,
        Archive::new(t + chrono::Duration::nanoseconds(1)).uid
    );
    assert_eq!(Archive::new(t).uid.as_str().len(), 64);
}

#[test]
fn metadata_roundtrip_preserves_every_field() {
    let mut archive = sample();
    archive.remote_id = "remote-1".into();
    archive.transfer_receipt = json!({"remote_id": "remote-1", "location": "/v/1"});
    let back = Archive::from_json(&archive.to_json().unwrap(), "test").unwrap();
    assert_eq!(back, archive);
}

#[test]
fn metadata_roundtrip_with_empty_fields() {
    let archive = Archive::new(Utc::now());
    assert!(archive.file_list.is_empty());
    assert!(archive.description.is_empty());
    let back = Archive::from_json(&archive.to_json().unwrap(), "test").unwrap();
    assert_eq!(back, archive);
    assert!(!back.is_uploaded());
}

#[test]
fn serialized_field_order_is_fixed() {
    let text = String::from_utf8(sample().to_json().unwrap()).unwrap();
    let keys = [
        "\"uid\"",
        "\"description\"",
        "\"create_time\"",
        "\"file_list\"",
        "\"size\"",
        "\"remote_id\"",
        "\"transfer_receipt\"",
    ];
    let positions: Vec<usize> = keys.iter().map(|k| text.find(k).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
    assert!(text.ends_with('\n'));
}

#[test]
fn legacy_receipt_key_is_accepted() {
    let data = br#"{
        "uid": "abc",
        "description": "",
        "create_time": "2024-03-01T12:30:00Z",
        "file_list": [],
        "size": 10,
        "remote_id": "r",
        "aws_response": {"archiveId": "r"}
    }"#;
    let archive = Archive::from_json(data, "legacy.json").unwrap();
    assert_eq!(archive.transfer_receipt, json!({"archiveId": "r"}));
    assert!(archive.is_uploaded());
}

#[test]
fn malformed_record_names_its_origin() {
    let err = Archive::from_json(b"{\"uid\": 3}", "meta/bad.json").unwrap_err();
    match err {
        SeedbankError::MalformedMetadataRecord { path, .. } => assert_eq!(path, "meta/bad.json"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn save_then_load() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = sample();
    let written = archive.save(tmp.path()).unwrap();
    let path = archive.metadata_path(tmp.path());
    assert_eq!(std::fs::read(&path).unwrap(), written);
    assert_eq!(Archive::load(&path).unwrap(), archive);
}

#[test]
fn summary_uses_first_line() {
    assert_eq!(sample().summary(), "Seed photos");
}

#[test]
fn summary_truncates_to_forty_chars() {
    let mut archive = sample();
    archive.description = "x".repeat(100);
    assert_eq!(archive.summary(), "x".repeat(40));
    archive.description = "é".repeat(41);
    assert_eq!(archive.summary().chars().count(), 40);
}

#[test]
fn summary_placeholder_when_empty() {
    let mut archive = sample();
    archive.description = String::new();
    assert_eq!(archive.summary(), NO_DESCRIPTION);
    archive.description = "\r\nlater".into();
    assert_eq!(archive.summary(), NO_DESCRIPTION);
}
