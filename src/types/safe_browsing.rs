use serde::{Deserialize, Serialize};

/// Threat categories reported by the URL lookup service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreatType {
    UnwantedSoftware,
    PotentiallyHarmfulApplication,
    SocialEngineering,
    SubresourceFilter,
    Billing,
    CsdAllowlist,
    /// A code this client has no name for.
    Other(i32),
}

impl ThreatType {
    pub fn from_code(code: i32) -> Self {
        match code {
            3 => ThreatType::UnwantedSoftware,
            4 => ThreatType::PotentiallyHarmfulApplication,
            5 => ThreatType::SocialEngineering,
            13 => ThreatType::SubresourceFilter,
            15 => ThreatType::Billing,
            16 => ThreatType::CsdAllowlist,
            other => ThreatType::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            ThreatType::UnwantedSoftware => 3,
            ThreatType::PotentiallyHarmfulApplication => 4,
            ThreatType::SocialEngineering => 5,
            ThreatType::SubresourceFilter => 13,
            ThreatType::Billing => 15,
            ThreatType::CsdAllowlist => 16,
            ThreatType::Other(code) => code,
        }
    }
}

/// Result of a single URL lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupResult {
    pub url: String,
    pub matches: Vec<ThreatType>,
}

impl LookupResult {
    pub fn is_safe(&self) -> bool {
        self.matches.is_empty()
    }
}
