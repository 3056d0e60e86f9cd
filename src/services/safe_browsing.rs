//! URL threat lookup.
//!
//! The browsing host asks a [`SafeBrowsingApiHandler`] whether a URL is known
//! to be dangerous. Which handler is used is decided by [`HandlerConfig`];
//! the mock handler answers from a response table handed to it up front.

use std::collections::HashMap;

use serde::Deserialize;

use crate::types::errors::LookupError;
use crate::types::safe_browsing::{LookupResult, ThreatType};

/// Trait implemented by URL threat-lookup backends.
pub trait SafeBrowsingApiHandler: Send + Sync {
    /// Looks up `url`, reporting only threats listed in `threats_of_interest`.
    fn start_uri_lookup(&self, url: &str, threats_of_interest: &[ThreatType]) -> LookupResult;
}

/// Selects the lookup backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", content = "responses", rename_all = "lowercase")]
pub enum HandlerConfig {
    /// Every URL is reported safe.
    Disabled,
    /// Answers from a table of URL to threat-metadata JSON.
    Mock(HashMap<String, String>),
}

/// Builds the handler named by `config`.
pub fn handler_from_config(
    config: HandlerConfig,
) -> Result<Box<dyn SafeBrowsingApiHandler>, LookupError> {
    match config {
        HandlerConfig::Disabled => Ok(Box::new(NoopSafeBrowsingApiHandler)),
        HandlerConfig::Mock(table) => Ok(Box::new(MockSafeBrowsingApiHandler::from_table(table)?)),
    }
}

/// Handler that never reports a threat.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSafeBrowsingApiHandler;

impl SafeBrowsingApiHandler for NoopSafeBrowsingApiHandler {
    fn start_uri_lookup(&self, url: &str, _threats_of_interest: &[ThreatType]) -> LookupResult {
        LookupResult {
            url: url.to_string(),
            matches: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct RawMetadata {
    #[serde(default)]
    matches: Vec<RawMatch>,
}

#[derive(Deserialize)]
struct RawMatch {
    threat_type: String,
}

/// Handler answering from a fixed response table.
///
/// Metadata uses the lookup service's JSON shape, for example
/// `{"matches":[{"threat_type":"5"}]}`. Unlisted URLs are safe.
#[derive(Debug, Clone, Default)]
pub struct MockSafeBrowsingApiHandler {
    responses: HashMap<String, Vec<ThreatType>>,
}

impl MockSafeBrowsingApiHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses every entry of `table`; any malformed metadata rejects the table.
    pub fn from_table(table: HashMap<String, String>) -> Result<Self, LookupError> {
        let mut handler = Self::new();
        for (url, metadata) in table {
            handler = handler.with_response(&url, &metadata)?;
        }
        Ok(handler)
    }

    pub fn with_response(mut self, url: &str, metadata: &str) -> Result<Self, LookupError> {
        let threats = parse_metadata(url, metadata)?;
        self.responses.insert(url.to_string(), threats);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

impl SafeBrowsingApiHandler for MockSafeBrowsingApiHandler {
    fn start_uri_lookup(&self, url: &str, threats_of_interest: &[ThreatType]) -> LookupResult {
        let matches = self
            .responses
            .get(url)
            .map(|threats| {
                threats
                    .iter()
                    .copied()
                    .filter(|threat| threats_of_interest.contains(threat))
                    .collect()
            })
            .unwrap_or_default();
        LookupResult {
            url: url.to_string(),
            matches,
        }
    }
}

/// Parses threat metadata JSON into threat types.
pub fn parse_metadata(url: &str, metadata: &str) -> Result<Vec<ThreatType>, LookupError> {
    let raw: RawMetadata =
        serde_json::from_str(metadata).map_err(|e| LookupError::InvalidMetadata {
            url: url.to_string(),
            message: e.to_string(),
        })?;
    raw.matches
        .into_iter()
        .map(|m| {
            m.threat_type
                .trim()
                .parse::<i32>()
                .map(ThreatType::from_code)
                .map_err(|_| LookupError::InvalidThreatType {
                    url: url.to_string(),
                    code: m.threat_type.clone(),
                })
        })
        .collect()
}
