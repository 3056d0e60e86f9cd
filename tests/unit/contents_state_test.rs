//! Integration-level unit tests for navigation-history blobs.
//!
//! Covers writing and reading each generation's layout and upgrading older
//! blobs to the latest generation.

use tabstate::services::contents_state::{decode, encode, read_history, upgrade};
use tabstate::types::errors::DecodeError;
use tabstate::types::tab_state::{Generation, NavigationEntry, NavigationHistory};

fn rich_entry(index: i32, url: &str, title: &str) -> NavigationEntry {
    NavigationEntry {
        page_state: vec![1, 2, 3, 4, 5],
        transition_type: 8,
        has_post_data: true,
        referrer_url: "https://search.example/?q=tabs".to_string(),
        referrer_policy: 3,
        original_request_url: url.to_string(),
        is_overriding_user_agent: true,
        timestamp_micros: 13_345_678_901_234_567,
        http_status_code: 301,
        ..NavigationEntry::new(index, url, title)
    }
}

fn three_page_history() -> NavigationHistory {
    NavigationHistory::new(
        false,
        1,
        vec![
            rich_entry(0, "https://www.google.com/", "Google"),
            rich_entry(1, "https://www.baidu.com/", "百度一下，你就知道"),
            rich_entry(2, "https://www.haaretz.co.il/", "הארץ"),
        ],
    )
    .unwrap()
}

#[test]
fn test_each_generation_reads_back_what_it_wrote() {
    for version in [Generation::V0, Generation::V1, Generation::V2] {
        let written = encode(three_page_history(), version).unwrap();
        let read = decode(written.buffer().to_vec(), version).unwrap();

        assert_eq!(read.version(), version);
        assert_eq!(read.history(), written.history(), "generation {}", version);
        assert_eq!(read.history().current_index(), 1);
        assert_eq!(
            read.history().current_entry().unwrap().title,
            "百度一下，你就知道"
        );
    }
}

#[test]
fn test_generation_0_drops_newer_entry_fields() {
    let written = encode(three_page_history(), Generation::V0).unwrap();
    let entry = &written.history().entries()[0];

    assert_eq!(entry.virtual_url, "https://www.google.com/");
    assert_eq!(entry.page_state, vec![1, 2, 3, 4, 5]);
    assert_eq!(entry.transition_type, 8);
    assert!(!entry.has_post_data);
    assert!(entry.referrer_url.is_empty());
    assert_eq!(entry.http_status_code, 0);
}

#[test]
fn test_generation_1_keeps_referrer_but_not_status() {
    let written = encode(three_page_history(), Generation::V1).unwrap();
    let entry = &written.history().entries()[2];

    assert!(entry.has_post_data);
    assert_eq!(entry.referrer_policy, 3);
    assert!(entry.is_overriding_user_agent);
    assert_eq!(entry.timestamp_micros, 0);
    assert_eq!(entry.http_status_code, 0);
}

#[test]
fn test_generation_0_and_1_layouts_differ() {
    let v0 = encode(three_page_history(), Generation::V0).unwrap();
    let v1 = encode(three_page_history(), Generation::V1).unwrap();
    assert_ne!(v0.buffer(), v1.buffer());
}

/// With no entries there is nothing to nest, so generations 0 and 1 write the
/// same bytes and the history reads back the same under either layout.
#[test]
fn test_empty_history_is_identical_in_generation_0_and_1() {
    let v0 = encode(NavigationHistory::empty(false), Generation::V0).unwrap();
    let v1 = encode(NavigationHistory::empty(false), Generation::V1).unwrap();

    assert_eq!(v0.buffer(), v1.buffer());
    let as_v0 = read_history(v1.buffer(), Generation::V0).unwrap();
    assert_eq!(&as_v0, v1.history());
}

#[test]
fn test_upgrade_from_generation_0() {
    let legacy = encode(three_page_history(), Generation::V0).unwrap();

    let upgraded = upgrade(&legacy).unwrap();

    assert_eq!(upgraded.version(), Generation::V2);
    assert_eq!(upgraded.history(), legacy.history());
    let reread = read_history(upgraded.buffer(), Generation::V2).unwrap();
    assert_eq!(&reread, upgraded.history());
}

#[test]
fn test_upgrade_from_generation_1_keeps_referrers() {
    let older = encode(three_page_history(), Generation::V1).unwrap();

    let upgraded = upgrade(&older).unwrap();

    let entry = &upgraded.history().entries()[1];
    assert_eq!(entry.referrer_url, "https://search.example/?q=tabs");
    assert_eq!(entry.original_request_url, "https://www.baidu.com/");
    assert_eq!(entry.http_status_code, 0);
}

#[test]
fn test_upgrade_of_latest_is_unchanged() {
    let latest = encode(three_page_history(), Generation::V2).unwrap();
    assert_eq!(upgrade(&latest).unwrap(), latest);
}

#[test]
fn test_empty_history_roundtrips() {
    let written = encode(NavigationHistory::empty(true), Generation::V2).unwrap();
    let read = decode(written.buffer().to_vec(), Generation::V2).unwrap();

    assert!(read.history().is_off_the_record());
    assert!(read.history().entries().is_empty());
    assert_eq!(read.history().current_index(), -1);
    assert!(read.history().current_entry().is_none());
}

#[test]
fn test_current_index_must_select_an_entry() {
    let result = NavigationHistory::new(false, 0, Vec::new());
    assert_eq!(
        result.unwrap_err(),
        DecodeError::InvalidCurrentIndex { index: 0, count: 0 }
    );
    assert!(NavigationHistory::new(false, -1, vec![NavigationEntry::default()]).is_err());
}

#[test]
fn test_short_buffer_is_truncated() {
    let written = encode(three_page_history(), Generation::V1).unwrap();
    let mut cut = written.buffer()[..written.buffer().len() - 8].to_vec();
    let payload = (cut.len() - 4) as u32;
    cut[..4].copy_from_slice(&payload.to_le_bytes());

    assert!(matches!(
        decode(cut, Generation::V1),
        Err(DecodeError::Truncated(_))
    ));
}

#[test]
fn test_huge_entry_count_fails_without_allocating() {
    let mut payload = Vec::new();
    payload.extend_from_slice(&0i32.to_le_bytes());
    payload.extend_from_slice(&i32::MAX.to_le_bytes());
    payload.extend_from_slice(&0i32.to_le_bytes());
    let mut bytes = (payload.len() as u32).to_le_bytes().to_vec();
    bytes.extend(payload);

    assert!(matches!(
        decode(bytes, Generation::V0),
        Err(DecodeError::Truncated(_))
    ));
}
