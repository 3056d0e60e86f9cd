//! Tab-state files on disk.
//!
//! Each tab is persisted as one file in the state directory: `tab<ID>` for a
//! regular tab, `cryptonito<ID>` for an incognito tab. Incognito files are
//! sealed with AES-256-GCM under a session key that is never written to disk.
//!
//! Restoring a whole directory never stops at a bad file: the tab is logged,
//! recorded in the report, and the sweep continues.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;
use zeroize::Zeroizing;

use crate::services::crypto_service::{
    CryptoService, CryptoServiceTrait, KEY_LENGTH, NONCE_LENGTH, TAG_LENGTH,
};
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::services::tab_state_codec::{TabStateCodec, TabStateCodecTrait};
use crate::types::credential::EncryptedData;
use crate::types::errors::{CryptoError, StoreError};
use crate::types::restore::{RestoreFailure, RestoreReport, RestoredTab};
use crate::types::tab_state::TabState;

pub const SAVED_TAB_STATE_FILE_PREFIX: &str = "tab";
pub const SAVED_TAB_STATE_FILE_PREFIX_INCOGNITO: &str = "cryptonito";

/// Salt for passphrase-derived incognito keys.
const INCOGNITO_KEY_SALT: &[u8] = b"tabstate-cryptonito";

/// A tab-state file found in the state directory.
///
/// Orders by tab id, regular before incognito.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TabStateFile {
    pub tab_id: i32,
    pub incognito: bool,
    pub path: PathBuf,
}

/// File name used for a tab's state.
pub fn file_name(tab_id: i32, incognito: bool) -> String {
    let prefix = if incognito {
        SAVED_TAB_STATE_FILE_PREFIX_INCOGNITO
    } else {
        SAVED_TAB_STATE_FILE_PREFIX
    };
    format!("{}{}", prefix, tab_id)
}

/// Parses a tab-state file name into `(tab_id, incognito)`.
///
/// Anything else in the directory (temp files, metadata) yields `None`.
pub fn parse_file_name(name: &str) -> Option<(i32, bool)> {
    let (digits, incognito) = match name.strip_prefix(SAVED_TAB_STATE_FILE_PREFIX_INCOGNITO) {
        Some(rest) => (rest, true),
        None => (name.strip_prefix(SAVED_TAB_STATE_FILE_PREFIX)?, false),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|id| (id, incognito))
}

/// Replaces `path` with `bytes` by writing `<path>.tmp` and renaming it over
/// the target. Missing parent directories are created.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(StoreError::Io(e));
    }
    Ok(())
}

/// Trait defining tab-state persistence operations.
pub trait TabStateStoreTrait {
    fn save(&self, tab_id: i32, state: &TabState) -> Result<(), StoreError>;
    fn restore(&self, tab_id: i32, incognito: bool) -> Result<TabState, StoreError>;
    fn delete(&self, tab_id: i32, incognito: bool) -> Result<(), StoreError>;
    fn list(&self) -> Result<Vec<TabStateFile>, StoreError>;
    fn restore_all(&self) -> Result<RestoreReport, StoreError>;
}

/// Tab-state store rooted at one directory.
#[derive(Clone)]
pub struct TabStateStore {
    dir: PathBuf,
    codec: TabStateCodec,
    crypto: CryptoService,
    incognito_key: Option<Arc<Zeroizing<Vec<u8>>>>,
    restore_incognito: bool,
}

impl TabStateStore {
    pub fn new<P: AsRef<Path>>(dir: P, codec: TabStateCodec) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            codec,
            crypto: CryptoService::new(),
            incognito_key: None,
            restore_incognito: true,
        }
    }

    /// Builds a store from loaded settings.
    pub fn from_settings(engine: &SettingsEngine) -> Self {
        let settings = engine.get_settings();
        Self::new(engine.state_dir(), TabStateCodec::new(settings.channel))
            .with_restore_incognito(settings.restore_incognito)
    }

    /// Uses `key` to seal and open incognito files.
    pub fn with_incognito_key(mut self, key: Zeroizing<Vec<u8>>) -> Result<Self, StoreError> {
        if key.len() != KEY_LENGTH {
            return Err(CryptoError::InvalidKey(format!(
                "Key must be {} bytes, got {}",
                KEY_LENGTH,
                key.len()
            ))
            .into());
        }
        self.incognito_key = Some(Arc::new(key));
        Ok(self)
    }

    /// Derives the incognito key from a passphrase.
    pub fn with_incognito_passphrase(self, passphrase: &str) -> Result<Self, StoreError> {
        let key = self.crypto.derive_key(passphrase, INCOGNITO_KEY_SALT)?;
        self.with_incognito_key(key)
    }

    /// Generates a fresh random incognito key for this session.
    pub fn with_session_incognito_key(self) -> Result<Self, StoreError> {
        let key = self.crypto.generate_key()?;
        self.with_incognito_key(key)
    }

    pub fn with_restore_incognito(mut self, restore_incognito: bool) -> Self {
        self.restore_incognito = restore_incognito;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn codec(&self) -> TabStateCodec {
        self.codec
    }

    /// Path of the file holding `tab_id`. Negative ids are rejected.
    pub fn path_for(&self, tab_id: i32, incognito: bool) -> Result<PathBuf, StoreError> {
        if tab_id < 0 {
            return Err(StoreError::InvalidTabId(tab_id));
        }
        Ok(self.dir.join(file_name(tab_id, incognito)))
    }

    /// Reads, decrypts and decodes one file.
    pub fn restore_file(&self, file: &TabStateFile) -> Result<TabState, StoreError> {
        let bytes = fs::read(&file.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound(file.path.display().to_string()),
            _ => StoreError::Io(e),
        })?;
        let plain = if file.incognito {
            self.open(file.tab_id, &bytes)?
        } else {
            bytes
        };
        Ok(self.codec.decode(&plain)?)
    }

    /// Restores every tab, decoding files concurrently on the blocking pool.
    ///
    /// The report is ordered the same way as [`TabStateStoreTrait::restore_all`].
    pub async fn restore_all_parallel(&self) -> Result<RestoreReport, StoreError> {
        let store = self.clone();
        let files = tokio::task::spawn_blocking(move || store.list())
            .await
            .map_err(|e| StoreError::Join(e.to_string()))??;

        let mut report = RestoreReport::default();
        let mut tasks = JoinSet::new();
        for file in files {
            if file.incognito && !self.restore_incognito {
                report.skipped.push(file.tab_id);
                continue;
            }
            let store = self.clone();
            tasks.spawn_blocking(move || {
                let result = store.restore_file(&file);
                (file, result)
            });
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            outcomes.push(joined.map_err(|e| StoreError::Join(e.to_string()))?);
        }
        outcomes.sort_by(|a, b| a.0.cmp(&b.0));
        for (file, result) in outcomes {
            record_outcome(&mut report, &file, result);
        }
        Ok(report)
    }

    fn seal(&self, tab_id: i32, plaintext: &[u8]) -> Result<Vec<u8>, StoreError> {
        let key = self.incognito_key.as_ref().ok_or(StoreError::MissingKey(tab_id))?;
        let encrypted = self.crypto.encrypt_aes256gcm(plaintext, key)?;
        let mut sealed = Vec::with_capacity(NONCE_LENGTH + encrypted.ciphertext.len() + TAG_LENGTH);
        sealed.extend_from_slice(&encrypted.iv);
        sealed.extend_from_slice(&encrypted.ciphertext);
        sealed.extend_from_slice(&encrypted.auth_tag);
        Ok(sealed)
    }

    fn open(&self, tab_id: i32, sealed: &[u8]) -> Result<Vec<u8>, StoreError> {
        let key = self.incognito_key.as_ref().ok_or(StoreError::MissingKey(tab_id))?;
        if sealed.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(CryptoError::Decryption(format!(
                "Sealed tab state is {} bytes, shorter than IV and tag",
                sealed.len()
            ))
            .into());
        }
        let (iv, rest) = sealed.split_at(NONCE_LENGTH);
        let (ciphertext, auth_tag) = rest.split_at(rest.len() - TAG_LENGTH);
        let encrypted = EncryptedData {
            ciphertext: ciphertext.to_vec(),
            iv: iv.to_vec(),
            auth_tag: auth_tag.to_vec(),
        };
        Ok(self.crypto.decrypt_aes256gcm(&encrypted, key)?)
    }
}

impl TabStateStoreTrait for TabStateStore {
    /// Encodes and writes a tab's state, replacing any previous file.
    ///
    /// The file is written under a temporary name and renamed into place so a
    /// crash mid-write never leaves a half-written record behind.
    fn save(&self, tab_id: i32, state: &TabState) -> Result<(), StoreError> {
        let incognito = state.is_incognito();
        let path = self.path_for(tab_id, incognito)?;
        let encoded = self.codec.encode(state)?;
        let bytes = if incognito {
            self.seal(tab_id, &encoded)?
        } else {
            encoded
        };

        write_atomic(&path, &bytes)?;

        tracing::info!(tab_id, incognito, bytes = bytes.len(), "saved tab state");
        Ok(())
    }

    fn restore(&self, tab_id: i32, incognito: bool) -> Result<TabState, StoreError> {
        let file = TabStateFile {
            tab_id,
            incognito,
            path: self.path_for(tab_id, incognito)?,
        };
        self.restore_file(&file)
    }

    fn delete(&self, tab_id: i32, incognito: bool) -> Result<(), StoreError> {
        let path = self.path_for(tab_id, incognito)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(tab_id, incognito, "deleted tab state");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Lists tab-state files, sorted by tab id. A missing directory is empty.
    fn list(&self) -> Result<Vec<TabStateFile>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some((tab_id, incognito)) = name.to_str().and_then(parse_file_name) else {
                continue;
            };
            files.push(TabStateFile {
                tab_id,
                incognito,
                path: entry.path(),
            });
        }
        files.sort();
        Ok(files)
    }

    fn restore_all(&self) -> Result<RestoreReport, StoreError> {
        let mut report = RestoreReport::default();
        for file in self.list()? {
            if file.incognito && !self.restore_incognito {
                report.skipped.push(file.tab_id);
                continue;
            }
            let result = self.restore_file(&file);
            record_outcome(&mut report, &file, result);
        }
        tracing::info!(
            restored = report.restored.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "restored tab states"
        );
        Ok(report)
    }
}

fn record_outcome(report: &mut RestoreReport, file: &TabStateFile, result: Result<TabState, StoreError>) {
    match result {
        Ok(state) => report.restored.push(RestoredTab {
            tab_id: file.tab_id,
            incognito: file.incognito,
            state,
        }),
        Err(e) => {
            tracing::warn!(
                tab_id = file.tab_id,
                incognito = file.incognito,
                error = %e,
                "skipping unrecoverable tab state"
            );
            report.failed.push(RestoreFailure {
                tab_id: file.tab_id,
                incognito: file.incognito,
                error: e.to_string(),
            });
        }
    }
}
