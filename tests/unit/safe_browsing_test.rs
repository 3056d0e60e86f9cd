//! Integration-level unit tests for the URL threat-lookup handlers.

use std::collections::HashMap;

use rstest::rstest;
use tabstate::services::safe_browsing::{
    handler_from_config, parse_metadata, HandlerConfig, MockSafeBrowsingApiHandler,
    SafeBrowsingApiHandler,
};
use tabstate::types::errors::LookupError;
use tabstate::types::safe_browsing::ThreatType;

const PHISHING_URL: &str = "https://phishing.example/login";
const BILLING_URL: &str = "https://billing.example/";

fn all_threats() -> Vec<ThreatType> {
    vec![
        ThreatType::UnwantedSoftware,
        ThreatType::PotentiallyHarmfulApplication,
        ThreatType::SocialEngineering,
        ThreatType::SubresourceFilter,
        ThreatType::Billing,
        ThreatType::CsdAllowlist,
    ]
}

fn mock() -> MockSafeBrowsingApiHandler {
    MockSafeBrowsingApiHandler::new()
        .with_response(PHISHING_URL, r#"{"matches":[{"threat_type":"5"}]}"#)
        .unwrap()
        .with_response(
            BILLING_URL,
            r#"{"matches":[{"threat_type":"15"},{"threat_type":"3"}]}"#,
        )
        .unwrap()
}

#[test]
fn test_listed_url_reports_its_threats() {
    let result = mock().start_uri_lookup(PHISHING_URL, &all_threats());
    assert_eq!(result.url, PHISHING_URL);
    assert_eq!(result.matches, vec![ThreatType::SocialEngineering]);
    assert!(!result.is_safe());
}

#[test]
fn test_matches_are_filtered_to_threats_of_interest() {
    let handler = mock();

    let billing_only = handler.start_uri_lookup(BILLING_URL, &[ThreatType::Billing]);
    assert_eq!(billing_only.matches, vec![ThreatType::Billing]);

    let none_of_interest = handler.start_uri_lookup(PHISHING_URL, &[ThreatType::Billing]);
    assert!(none_of_interest.is_safe());
}

#[test]
fn test_unlisted_url_is_safe() {
    let result = mock().start_uri_lookup("https://www.google.com/", &all_threats());
    assert!(result.is_safe());
}

#[test]
fn test_empty_metadata_means_no_matches() {
    let handler = MockSafeBrowsingApiHandler::new()
        .with_response("https://clean.example/", "{}")
        .unwrap();
    assert_eq!(handler.len(), 1);
    assert!(handler
        .start_uri_lookup("https://clean.example/", &all_threats())
        .is_safe());
}

#[rstest]
#[case("not json")]
#[case(r#"{"matches": 5}"#)]
#[case(r#"{"matches":[{"type":"5"}]}"#)]
fn test_malformed_metadata_is_rejected(#[case] metadata: &str) {
    let result = MockSafeBrowsingApiHandler::new().with_response(PHISHING_URL, metadata);
    assert!(matches!(result, Err(LookupError::InvalidMetadata { .. })));
}

#[test]
fn test_non_numeric_threat_code_is_rejected() {
    let err = parse_metadata(PHISHING_URL, r#"{"matches":[{"threat_type":"phish"}]}"#).unwrap_err();
    assert_eq!(
        err,
        LookupError::InvalidThreatType {
            url: PHISHING_URL.to_string(),
            code: "phish".to_string(),
        }
    );
}

#[test]
fn test_unknown_code_is_kept() {
    let threats = parse_metadata(PHISHING_URL, r#"{"matches":[{"threat_type":"42"}]}"#).unwrap();
    assert_eq!(threats, vec![ThreatType::Other(42)]);
    assert_eq!(threats[0].code(), 42);
}

#[test]
fn test_config_selects_mock_handler() {
    let config: HandlerConfig = serde_json::from_str(
        r#"{"kind":"mock","responses":{"https://phishing.example/login":"{\"matches\":[{\"threat_type\":\"5\"}]}"}}"#,
    )
    .unwrap();

    let handler = handler_from_config(config).unwrap();

    assert!(!handler
        .start_uri_lookup(PHISHING_URL, &[ThreatType::SocialEngineering])
        .is_safe());
}

#[test]
fn test_config_selects_disabled_handler() {
    let config: HandlerConfig = serde_json::from_str(r#"{"kind":"disabled"}"#).unwrap();
    assert_eq!(config, HandlerConfig::Disabled);

    let handler = handler_from_config(config).unwrap();

    assert!(handler.start_uri_lookup(PHISHING_URL, &all_threats()).is_safe());
}

#[test]
fn test_bad_table_in_config_is_rejected() {
    let mut table = HashMap::new();
    table.insert(PHISHING_URL.to_string(), "{".to_string());
    assert!(handler_from_config(HandlerConfig::Mock(table)).is_err());
}
