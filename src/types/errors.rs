use thiserror::Error;

// === DecodeError ===

/// Errors raised while decoding a persisted tab-state record.
///
/// A decode error is terminal for that one record: callers report the tab as
/// unrecoverable and carry on with the rest of the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The record contains no bytes at all.
    #[error("Tab state is empty")]
    Empty,
    /// The record ended in the middle of the named field.
    #[error("Tab state truncated while reading {0}")]
    Truncated(&'static str),
    /// The record declares a generation this reader does not know.
    #[error("Unsupported tab state generation: {0}")]
    UnsupportedGeneration(i32),
    /// A legacy record without a version field was decoded with no channel hint.
    #[error("Ambiguous tab state generation: record has no version field and no channel hint was given")]
    AmbiguousGeneration,
    /// A length prefix is negative or larger than the data that follows it.
    #[error("Invalid length for {field}: {len}")]
    InvalidLength { field: &'static str, len: i64 },
    /// A text field is not valid UTF-8 / UTF-16.
    #[error("Invalid text in {0}")]
    InvalidText(&'static str),
    /// The selected entry does not exist in the navigation history.
    #[error("Current entry index {index} out of range for {count} entries")]
    InvalidCurrentIndex { index: i32, count: usize },
}

// === EncodeError ===

/// Errors raised while encoding a tab-state record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// A field is longer than its length prefix can describe.
    #[error("Field {field} is too long to encode: {len} bytes")]
    TooLong { field: &'static str, len: usize },
}

// === ParseChannelError ===

/// Returned when a release channel name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown release channel: {0}")]
pub struct ParseChannelError(pub String);

// === CryptoError ===

/// Errors related to cryptographic operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Failed to derive encryption key from a passphrase.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
    /// Encryption operation failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),
    /// Decryption operation failed.
    #[error("Decryption failed: {0}")]
    Decryption(String),
    /// Failed to generate random bytes.
    #[error("Random generation failed: {0}")]
    RandomGeneration(String),
    /// The provided key is invalid.
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

// === StoreError ===

/// Errors related to reading and writing tab-state files.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No tab-state file exists for the requested tab.
    #[error("Tab state not found: {0}")]
    NotFound(String),
    /// A file system error occurred.
    #[error("Tab state I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// An incognito tab was saved or restored without a session key.
    #[error("No incognito key configured for tab {0}")]
    MissingKey(i32),
    /// Tab ids are non-negative; a negative id has no file name that `list` can read back.
    #[error("Invalid tab id: {0}")]
    InvalidTabId(i32),
    /// A background restore task panicked or was cancelled.
    #[error("Restore task failed: {0}")]
    Join(String),
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    #[error("Settings I/O error: {0}")]
    IoError(String),
    /// Failed to serialize or deserialize settings.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The provided settings key is invalid.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The provided settings value is invalid.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

// === LookupError ===

/// Errors related to the URL threat-lookup handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The threat metadata configured for a URL is not valid JSON.
    #[error("Invalid threat metadata for {url}: {message}")]
    InvalidMetadata { url: String, message: String },
    /// A threat type code in the metadata is not a number.
    #[error("Invalid threat type code for {url}: {code}")]
    InvalidThreatType { url: String, code: String },
}
