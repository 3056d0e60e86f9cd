//! Versioned tab-state codec.
//!
//! Reads the outer record (big-endian, fixed field order) that wraps a tab's
//! navigation history, decides which generation produced the history, and
//! hands the embedded blob to the matching parser.
//!
//! Records written before the contents-version field existed end right after
//! the opener app id. For those the release channel decides the generation;
//! without a channel hint the record is rejected rather than guessed at.

use crate::services::contents_state;
use crate::types::errors::{DecodeError, EncodeError};
use crate::types::tab_state::{Channel, Generation, TabState};

/// Launch type and navigation timestamp sentinel for "not recorded".
const UNKNOWN: i32 = -1;

/// Trait defining the tab-state codec interface.
pub trait TabStateCodecTrait {
    fn decode(&self, bytes: &[u8]) -> Result<TabState, DecodeError>;
    fn encode(&self, state: &TabState) -> Result<Vec<u8>, EncodeError>;
    fn upgrade(&self, state: &TabState) -> Result<TabState, EncodeError>;
}

/// Codec configured with the channel hint used for legacy records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabStateCodec {
    channel: Option<Channel>,
}

impl TabStateCodec {
    pub fn new(channel: Option<Channel>) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> Option<Channel> {
        self.channel
    }
}

impl TabStateCodecTrait for TabStateCodec {
    fn decode(&self, bytes: &[u8]) -> Result<TabState, DecodeError> {
        decode(bytes, self.channel)
    }

    fn encode(&self, state: &TabState) -> Result<Vec<u8>, EncodeError> {
        encode(state)
    }

    /// Rewrites the navigation history in the latest generation, keeping
    /// every outer-record field.
    fn upgrade(&self, state: &TabState) -> Result<TabState, EncodeError> {
        let contents = contents_state::upgrade(state.contents_state())?;
        Ok(state.clone().with_contents_state(contents))
    }
}

/// Picks the generation of a record.
///
/// An explicit version field always wins. Without one, the channel hint maps
/// to the generation that channel wrote before the field was introduced.
pub fn detect_generation(
    explicit_version: Option<i32>,
    channel_hint: Option<Channel>,
) -> Result<Generation, DecodeError> {
    match (explicit_version, channel_hint) {
        (Some(version), _) => Generation::from_i32(version),
        (None, Some(channel)) => Ok(channel.legacy_generation()),
        (None, None) => Err(DecodeError::AmbiguousGeneration),
    }
}

/// Decodes one persisted tab record.
///
/// `bytes` is only read. On error nothing is returned for this record; the
/// caller decides whether to go on with other tabs.
pub fn decode(bytes: &[u8], channel_hint: Option<Channel>) -> Result<TabState, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut record = RecordReader::new(bytes);
    let timestamp_millis = record.read_i64("timestamp")?;
    let contents_len = record.read_i32("contents length")?;
    let contents_len = usize::try_from(contents_len).map_err(|_| DecodeError::InvalidLength {
        field: "contents",
        len: i64::from(contents_len),
    })?;
    let contents = record.read_slice(contents_len, "contents")?.to_vec();
    let parent_id = record.read_i32("parent id")?;

    // Everything from here on was appended by later releases.
    let opener_app_id = record.optional(|r| r.read_utf("opener app id"))?.flatten();
    let explicit_version = record.optional(|r| r.read_i32("contents version"))?;
    let generation = detect_generation(explicit_version, channel_hint)?;
    let _sync_id = record.optional(|r| r.read_i64("sync id"))?;
    let _should_preserve = record.optional(|r| r.read_u8("should preserve"))?;
    let theme_color = record.optional(|r| r.read_i32("theme color"))?;
    let launch_type = record.optional(|r| r.read_i32("launch type"))?;
    let root_id = record.optional(|r| r.read_i32("root id"))?;
    let user_agent = record.optional(|r| r.read_i32("user agent"))?;
    let last_navigation = record.optional(|r| r.read_i64("last navigation timestamp"))?;

    let contents_state = contents_state::decode(contents, generation)?;
    tracing::debug!(
        generation = %generation,
        legacy = explicit_version.is_none(),
        entries = contents_state.history().entries().len(),
        "decoded tab state"
    );

    let mut state = TabState::new(contents_state)
        .with_timestamp_millis(timestamp_millis)
        .with_parent_id(parent_id)
        .with_opener_app_id(opener_app_id)
        .with_launch_type_at_creation(launch_type.filter(|t| *t != UNKNOWN))
        .with_last_navigation_committed_timestamp_millis(
            last_navigation.filter(|t| *t != i64::from(UNKNOWN)),
        );
    if let Some(color) = theme_color {
        state = state.with_theme_color(color);
    }
    if let Some(root) = root_id {
        state = state.with_root_id(root);
    }
    if let Some(agent) = user_agent {
        state = state.with_user_agent(agent);
    }
    Ok(state)
}

/// Encodes a tab state in the current record layout.
///
/// The contents-version field is always written, so records produced here
/// never depend on a channel hint to decode.
pub fn encode(state: &TabState) -> Result<Vec<u8>, EncodeError> {
    let contents = state.contents_state().buffer();
    let contents_len = i32::try_from(contents.len()).map_err(|_| EncodeError::TooLong {
        field: "contents",
        len: contents.len(),
    })?;
    let opener = state.opener_app_id().unwrap_or("");
    let opener_len = u16::try_from(opener.len()).map_err(|_| EncodeError::TooLong {
        field: "opener app id",
        len: opener.len(),
    })?;

    let mut out = Vec::with_capacity(contents.len() + 64 + opener.len());
    out.extend_from_slice(&state.timestamp_millis().to_be_bytes());
    out.extend_from_slice(&contents_len.to_be_bytes());
    out.extend_from_slice(contents);
    out.extend_from_slice(&state.parent_id().to_be_bytes());
    out.extend_from_slice(&opener_len.to_be_bytes());
    out.extend_from_slice(opener.as_bytes());
    out.extend_from_slice(&state.contents_state().version().as_i32().to_be_bytes());
    out.extend_from_slice(&(-1i64).to_be_bytes());
    out.push(0);
    out.extend_from_slice(&state.theme_color().to_be_bytes());
    out.extend_from_slice(&state.launch_type_at_creation().unwrap_or(UNKNOWN).to_be_bytes());
    out.extend_from_slice(&state.root_id().to_be_bytes());
    out.extend_from_slice(&state.user_agent().to_be_bytes());
    out.extend_from_slice(
        &state
            .last_navigation_committed_timestamp_millis()
            .unwrap_or(i64::from(UNKNOWN))
            .to_be_bytes(),
    );
    Ok(out)
}

/// Big-endian cursor over a record.
struct RecordReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> RecordReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Reads a trailing field, or `None` when the record ends cleanly before it.
    fn optional<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<Option<T>, DecodeError> {
        if self.at_end() {
            Ok(None)
        } else {
            read(self).map(Some)
        }
    }

    fn read_slice(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(DecodeError::Truncated(field))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DecodeError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_slice(N, field)?);
        Ok(buf)
    }

    fn read_u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>(field)?[0])
    }

    fn read_i32(&mut self, field: &'static str) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.read_array(field)?))
    }

    fn read_i64(&mut self, field: &'static str) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.read_array(field)?))
    }

    /// `u16` byte length followed by UTF-8; the empty string means "absent".
    fn read_utf(&mut self, field: &'static str) -> Result<Option<String>, DecodeError> {
        let len = u16::from_be_bytes(self.read_array(field)?);
        let bytes = self.read_slice(usize::from(len), field)?;
        let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidText(field))?;
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}
