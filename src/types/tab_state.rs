use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::{DecodeError, ParseChannelError};

/// Theme color value meaning "the page did not specify one".
pub const UNSPECIFIED_THEME_COLOR: i32 = 0;

/// Tab id meaning "no tab" for parent and root references.
pub const INVALID_TAB_ID: i32 = -1;

/// Serialization generation of a tab's navigation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Generation {
    /// Single inline pickle, no in-band version field in the outer record.
    V0,
    /// One nested pickle per entry; adds referrer and post-data fields.
    V1,
    /// Adds per-entry timestamp and HTTP status code.
    V2,
}

impl Generation {
    /// The generation written by this crate.
    pub const LATEST: Generation = Generation::V2;

    pub fn as_i32(self) -> i32 {
        match self {
            Generation::V0 => 0,
            Generation::V1 => 1,
            Generation::V2 => 2,
        }
    }

    /// Maps an explicit version tag to a generation.
    pub fn from_i32(version: i32) -> Result<Self, DecodeError> {
        match version {
            0 => Ok(Generation::V0),
            1 => Ok(Generation::V1),
            2 => Ok(Generation::V2),
            other => Err(DecodeError::UnsupportedGeneration(other)),
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.as_i32())
    }
}

/// Release channel of the application that wrote a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Stable,
    Beta,
    Dev,
    Canary,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Stable => "stable",
            Channel::Beta => "beta",
            Channel::Dev => "dev",
            Channel::Canary => "canary",
        }
    }

    /// Generation of records that predate the explicit version field.
    ///
    /// Stable shipped generation 0 first; every other channel was already on
    /// generation 1 when the version field was introduced.
    ///
    /// A legacy record with an empty history is byte-identical in generations
    /// 0 and 1, so such a generation-1 record read with the stable hint comes
    /// back as generation 0. Nothing is lost: both layouts hold the same empty
    /// history, and encoding rewrites it with an explicit version.
    pub fn legacy_generation(self) -> Generation {
        match self {
            Channel::Stable => Generation::V0,
            Channel::Beta | Channel::Dev | Channel::Canary => Generation::V1,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = ParseChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stable" => Ok(Channel::Stable),
            "beta" => Ok(Channel::Beta),
            "dev" => Ok(Channel::Dev),
            "canary" => Ok(Channel::Canary),
            _ => Err(ParseChannelError(s.to_string())),
        }
    }
}

/// One entry of a tab's back/forward list.
///
/// Fields a generation does not carry are left at their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NavigationEntry {
    pub index: i32,
    pub virtual_url: String,
    pub title: String,
    #[serde(skip)]
    pub page_state: Vec<u8>,
    pub transition_type: i32,
    // Generation 1
    pub has_post_data: bool,
    pub referrer_url: String,
    pub referrer_policy: i32,
    pub original_request_url: String,
    pub is_overriding_user_agent: bool,
    // Generation 2
    pub timestamp_micros: i64,
    pub http_status_code: i32,
}

impl NavigationEntry {
    pub fn new(index: i32, virtual_url: &str, title: &str) -> Self {
        Self {
            index,
            virtual_url: virtual_url.to_string(),
            title: title.to_string(),
            ..Self::default()
        }
    }

    /// Copy of this entry holding only the fields `version` can carry.
    pub fn truncated_to(&self, version: Generation) -> Self {
        let mut entry = self.clone();
        if version < Generation::V2 {
            entry.timestamp_micros = 0;
            entry.http_status_code = 0;
        }
        if version < Generation::V1 {
            entry.has_post_data = false;
            entry.referrer_url.clear();
            entry.referrer_policy = 0;
            entry.original_request_url.clear();
            entry.is_overriding_user_agent = false;
        }
        entry
    }

    /// The stored title, or the URL when the page had no title.
    pub fn title_for_display(&self) -> &str {
        if self.title.is_empty() {
            &self.virtual_url
        } else {
            &self.title
        }
    }
}

/// Decoded navigation history of a tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationHistory {
    is_off_the_record: bool,
    current_index: i32,
    entries: Vec<NavigationEntry>,
}

impl NavigationHistory {
    /// Builds a history, checking that `current_index` selects an entry
    /// (or is `-1` for an empty history).
    pub fn new(
        is_off_the_record: bool,
        current_index: i32,
        entries: Vec<NavigationEntry>,
    ) -> Result<Self, DecodeError> {
        let valid = if entries.is_empty() {
            current_index == -1
        } else {
            usize::try_from(current_index).map_or(false, |i| i < entries.len())
        };
        if !valid {
            return Err(DecodeError::InvalidCurrentIndex {
                index: current_index,
                count: entries.len(),
            });
        }
        Ok(Self {
            is_off_the_record,
            current_index,
            entries,
        })
    }

    /// History with no entries, as saved for a placeholder tab.
    pub fn empty(is_off_the_record: bool) -> Self {
        Self {
            is_off_the_record,
            current_index: -1,
            entries: Vec::new(),
        }
    }

    /// History holding a single entry that is also the current one.
    pub fn single(entry: NavigationEntry, is_off_the_record: bool) -> Self {
        Self {
            is_off_the_record,
            current_index: 0,
            entries: vec![entry],
        }
    }

    /// Copy of this history whose entries hold only what `version` can carry.
    pub fn truncated_to(&self, version: Generation) -> Self {
        Self {
            is_off_the_record: self.is_off_the_record,
            current_index: self.current_index,
            entries: self
                .entries
                .iter()
                .map(|entry| entry.truncated_to(version))
                .collect(),
        }
    }

    pub fn is_off_the_record(&self) -> bool {
        self.is_off_the_record
    }

    pub fn current_index(&self) -> i32 {
        self.current_index
    }

    pub fn entries(&self) -> &[NavigationEntry] {
        &self.entries
    }

    pub fn current_entry(&self) -> Option<&NavigationEntry> {
        usize::try_from(self.current_index)
            .ok()
            .and_then(|i| self.entries.get(i))
    }
}

/// The embedded navigation-history blob together with its generation tag.
///
/// `buffer` is kept exactly as read so that re-encoding an untouched state
/// reproduces the original bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentsState {
    #[serde(skip)]
    pub(crate) buffer: Vec<u8>,
    pub(crate) version: Generation,
    pub(crate) history: NavigationHistory,
}

impl ContentsState {
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn version(&self) -> Generation {
        self.version
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }
}

/// Persisted state of one browser tab.
///
/// Produced by decoding a stored record, or built with the `with_*` methods
/// before encoding. There are no setters: a value never changes once shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabState {
    timestamp_millis: i64,
    contents_state: ContentsState,
    parent_id: i32,
    opener_app_id: Option<String>,
    theme_color: i32,
    launch_type_at_creation: Option<i32>,
    root_id: i32,
    user_agent: i32,
    last_navigation_committed_timestamp_millis: Option<i64>,
}

impl TabState {
    pub fn new(contents_state: ContentsState) -> Self {
        Self {
            timestamp_millis: -1,
            contents_state,
            parent_id: INVALID_TAB_ID,
            opener_app_id: None,
            theme_color: UNSPECIFIED_THEME_COLOR,
            launch_type_at_creation: None,
            root_id: INVALID_TAB_ID,
            user_agent: 0,
            last_navigation_committed_timestamp_millis: None,
        }
    }

    pub fn with_timestamp_millis(mut self, timestamp_millis: i64) -> Self {
        self.timestamp_millis = timestamp_millis;
        self
    }

    pub fn with_contents_state(mut self, contents_state: ContentsState) -> Self {
        self.contents_state = contents_state;
        self
    }

    pub fn with_parent_id(mut self, parent_id: i32) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// An empty id is stored as "no opener".
    pub fn with_opener_app_id(mut self, opener_app_id: Option<String>) -> Self {
        self.opener_app_id = opener_app_id.filter(|id| !id.is_empty());
        self
    }

    pub fn with_theme_color(mut self, theme_color: i32) -> Self {
        self.theme_color = theme_color;
        self
    }

    pub fn with_launch_type_at_creation(mut self, launch_type: Option<i32>) -> Self {
        self.launch_type_at_creation = launch_type;
        self
    }

    pub fn with_root_id(mut self, root_id: i32) -> Self {
        self.root_id = root_id;
        self
    }

    pub fn with_user_agent(mut self, user_agent: i32) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_last_navigation_committed_timestamp_millis(mut self, timestamp: Option<i64>) -> Self {
        self.last_navigation_committed_timestamp_millis = timestamp;
        self
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }

    pub fn contents_state(&self) -> &ContentsState {
        &self.contents_state
    }

    pub fn parent_id(&self) -> i32 {
        self.parent_id
    }

    pub fn opener_app_id(&self) -> Option<&str> {
        self.opener_app_id.as_deref()
    }

    pub fn theme_color(&self) -> i32 {
        self.theme_color
    }

    pub fn has_theme_color(&self) -> bool {
        self.theme_color != UNSPECIFIED_THEME_COLOR
    }

    pub fn launch_type_at_creation(&self) -> Option<i32> {
        self.launch_type_at_creation
    }

    pub fn root_id(&self) -> i32 {
        self.root_id
    }

    pub fn user_agent(&self) -> i32 {
        self.user_agent
    }

    pub fn last_navigation_committed_timestamp_millis(&self) -> Option<i64> {
        self.last_navigation_committed_timestamp_millis
    }

    pub fn is_incognito(&self) -> bool {
        self.contents_state.history.is_off_the_record()
    }

    /// URL of the current entry; `None` for a placeholder tab.
    pub fn virtual_url(&self) -> Option<&str> {
        self.contents_state
            .history
            .current_entry()
            .map(|entry| entry.virtual_url.as_str())
            .filter(|url| !url.is_empty())
    }

    /// Title of the current entry, falling back to its URL when untitled.
    pub fn display_title(&self) -> &str {
        self.contents_state
            .history
            .current_entry()
            .map(NavigationEntry::title_for_display)
            .unwrap_or("")
    }
}
