//! Sealing primitives for incognito tab-state files.
//!
//! A sealed file is only ever opened by the browser session that wrote it, so
//! each seal draws a fresh random IV and the key lives in `Zeroizing` memory.

use ring::aead::{self, Aad, BoundKey, Nonce, NonceSequence, UnboundKey, AES_256_GCM};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;
use zeroize::Zeroizing;

use crate::types::credential::EncryptedData;
use crate::types::errors::CryptoError;

/// PBKDF2-HMAC-SHA256 rounds applied to an incognito passphrase.
const PBKDF2_ITERATIONS: u32 = 100_000;

/// Length of an incognito session key.
pub const KEY_LENGTH: usize = 32;

/// Length of the IV stored at the start of a `cryptonito` file.
pub const NONCE_LENGTH: usize = 12;

/// Length of the GCM tag stored at the end of a `cryptonito` file.
pub const TAG_LENGTH: usize = 16;

/// Trait defining the cryptographic operations used for incognito tab state.
pub trait CryptoServiceTrait {
    /// Stretches a passphrase into a session key.
    fn derive_key(&self, passphrase: &str, salt: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError>;

    /// Seals an encoded tab record under `key` with a fresh IV.
    fn encrypt_aes256gcm(
        &self,
        plaintext: &[u8],
        key: &[u8],
    ) -> Result<EncryptedData, CryptoError>;

    /// Opens a sealed tab record, failing if the key is wrong or the file was altered.
    fn decrypt_aes256gcm(
        &self,
        encrypted: &EncryptedData,
        key: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// Random session key, wiped from memory on drop.
    fn generate_key(&self) -> Result<Zeroizing<Vec<u8>>, CryptoError>;
}

/// Hands `ring` the IV of a single tab file, then refuses to advance.
struct FileNonce(Option<[u8; NONCE_LENGTH]>);

impl NonceSequence for FileNonce {
    fn advance(&mut self) -> Result<Nonce, ring::error::Unspecified> {
        self.0
            .take()
            .map(Nonce::assume_unique_for_key)
            .ok_or(ring::error::Unspecified)
    }
}

fn check_key_length(key: &[u8]) -> Result<(), CryptoError> {
    if key.len() == KEY_LENGTH {
        Ok(())
    } else {
        Err(CryptoError::InvalidKey(format!(
            "Incognito key must be {} bytes, got {}",
            KEY_LENGTH,
            key.len()
        )))
    }
}

/// `ring`-backed sealing for `cryptonito` files.
#[derive(Clone)]
pub struct CryptoService {
    rng: SystemRandom,
}

impl CryptoService {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl Default for CryptoService {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoServiceTrait for CryptoService {
    fn derive_key(&self, passphrase: &str, salt: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let rounds = NonZeroU32::new(PBKDF2_ITERATIONS)
            .ok_or_else(|| CryptoError::KeyDerivation("PBKDF2 needs at least one round".to_string()))?;

        let mut key = Zeroizing::new(vec![0u8; KEY_LENGTH]);
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            rounds,
            salt,
            passphrase.as_bytes(),
            key.as_mut_slice(),
        );
        Ok(key)
    }

    fn encrypt_aes256gcm(
        &self,
        plaintext: &[u8],
        key: &[u8],
    ) -> Result<EncryptedData, CryptoError> {
        check_key_length(key)?;

        let mut iv = [0u8; NONCE_LENGTH];
        self.rng
            .fill(&mut iv)
            .map_err(|_| CryptoError::RandomGeneration("No randomness for tab file IV".to_string()))?;

        let unbound = UnboundKey::new(&AES_256_GCM, key)
            .map_err(|_| CryptoError::Encryption("Incognito key rejected".to_string()))?;
        let mut sealing_key = aead::SealingKey::new(unbound, FileNonce(Some(iv)));

        let mut ciphertext = plaintext.to_vec();
        sealing_key
            .seal_in_place_append_tag(Aad::empty(), &mut ciphertext)
            .map_err(|_| CryptoError::Encryption("Could not seal tab record".to_string()))?;
        // `ring` leaves the tag on the end; the file format stores it separately.
        let auth_tag = ciphertext.split_off(ciphertext.len() - TAG_LENGTH);

        Ok(EncryptedData {
            ciphertext,
            iv: iv.to_vec(),
            auth_tag,
        })
    }

    fn decrypt_aes256gcm(
        &self,
        encrypted: &EncryptedData,
        key: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        check_key_length(key)?;

        let iv: [u8; NONCE_LENGTH] = encrypted.iv.as_slice().try_into().map_err(|_| {
            CryptoError::Decryption(format!(
                "Tab file IV must be {} bytes, got {}",
                NONCE_LENGTH,
                encrypted.iv.len()
            ))
        })?;
        if encrypted.auth_tag.len() != TAG_LENGTH {
            return Err(CryptoError::Decryption(format!(
                "Tab file tag must be {} bytes, got {}",
                TAG_LENGTH,
                encrypted.auth_tag.len()
            )));
        }

        let unbound = UnboundKey::new(&AES_256_GCM, key)
            .map_err(|_| CryptoError::Decryption("Incognito key rejected".to_string()))?;
        let mut opening_key = aead::OpeningKey::new(unbound, FileNonce(Some(iv)));

        let mut sealed = [encrypted.ciphertext.as_slice(), encrypted.auth_tag.as_slice()].concat();
        let plaintext = opening_key
            .open_in_place(Aad::empty(), &mut sealed)
            .map_err(|_| {
                CryptoError::Decryption("wrong incognito key or damaged tab file".to_string())
            })?;
        Ok(plaintext.to_vec())
    }

    fn generate_key(&self) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let mut key = Zeroizing::new(vec![0u8; KEY_LENGTH]);
        self.rng
            .fill(key.as_mut_slice())
            .map_err(|_| CryptoError::RandomGeneration("No randomness for session key".to_string()))?;
        Ok(key)
    }
}
