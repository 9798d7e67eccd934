//! AES-256-GCM field encryption.
//!
//! Protects individual sensitive values (bank details, identity numbers,
//! aggregator credentials) before they are stored.
//!
//! # Wire Format
//!
//! ```text
//! base64( [12 bytes nonce][N bytes ciphertext][16 bytes auth tag] )
//! ```
//!
//! Standard (padded) base64 alphabet. The nonce is fresh from the OS RNG for
//! every call, so equal plaintexts produce different blobs. The GCM tag means
//! a blob decrypted under the wrong key, or modified in storage, fails with
//! [`CodecError::DecryptFailed`] instead of yielding garbage plaintext.
//!
//! The empty string is the identity: it encrypts to `""` and `""` decrypts to
//! `""`.
//!
//! # Key
//!
//! One 256-bit key per process, resolved at startup by
//! [`FieldCipher::from_config`] and never mutated afterwards.

mod fields;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::{keys, ConfigSource, RuntimeMode};
use crate::{LeasekitError, Result};

/// Size of the key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits for GCM).
pub const NONCE_SIZE: usize = 12;

/// Size of the authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Prefix marking a configured key as raw base64 key material rather than a
/// passphrase.
pub const RAW_KEY_PREFIX: &str = "base64:";

/// Passphrase used when no key is configured in development mode only.
const DEVELOPMENT_PASSPHRASE: &str = "leasekit-development-field-key";

/// Codec error types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("encryption failed: {0}")]
    EncryptFailed(String),
    #[error("ciphertext is not valid base64")]
    InvalidEncoding,
    #[error("ciphertext too short: must be at least {} bytes", NONCE_SIZE + TAG_SIZE)]
    TooShort,
    #[error("decryption failed -- wrong key or corrupted ciphertext")]
    DecryptFailed,
    #[error("decrypted value is not valid UTF-8")]
    InvalidUtf8,
}

/// Result type for codec operations.
pub type CodecResult<T> = std::result::Result<T, CodecError>;

impl From<CodecError> for LeasekitError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::EncryptFailed(msg) => LeasekitError::Encryption(msg),
            other => LeasekitError::Decryption(other.to_string()),
        }
    }
}

/// Symmetric cipher for individual field values.
///
/// Key material is wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct FieldCipher {
    key: [u8; KEY_SIZE],
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher").finish_non_exhaustive()
    }
}

impl FieldCipher {
    /// Create a cipher from raw key material.
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Derive the key as SHA-256 of a passphrase.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&Sha256::digest(passphrase.as_bytes()));
        Self { key }
    }

    /// Resolve the key from the `encryption_key` setting.
    ///
    /// A value prefixed with `base64:` must decode to exactly 32 bytes and is
    /// used as-is; any other value is treated as a passphrase. When the key is
    /// unset, production mode fails and development mode falls back to a
    /// built-in passphrase.
    pub fn from_config(source: &dyn ConfigSource, mode: RuntimeMode) -> Result<Self> {
        match source.get(keys::ENCRYPTION_KEY) {
            Some(value) => Self::from_setting(&value),
            None if mode.is_production() => Err(LeasekitError::config(
                keys::ENCRYPTION_KEY,
                "an encryption key is required in production",
            )),
            None => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "no {} configured; using the development fallback key",
                    keys::ENCRYPTION_KEY
                );
                Ok(Self::from_passphrase(DEVELOPMENT_PASSPHRASE))
            }
        }
    }

    fn from_setting(value: &str) -> Result<Self> {
        let Some(encoded) = value.strip_prefix(RAW_KEY_PREFIX) else {
            return Ok(Self::from_passphrase(value));
        };
        let mut bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| LeasekitError::config(keys::ENCRYPTION_KEY, "raw key is not base64"))?;
        if bytes.len() != KEY_SIZE {
            bytes.zeroize();
            return Err(LeasekitError::config(
                keys::ENCRYPTION_KEY,
                format!("raw key must be {} bytes", KEY_SIZE),
            ));
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self { key })
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key))
    }

    /// Encrypt a value into a base64 blob.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(len = plaintext.len())))]
    pub fn encrypt(&self, plaintext: &str) -> CodecResult<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher()
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CodecError::EncryptFailed(e.to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(blob))
    }

    /// Decrypt a blob produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// - [`CodecError::InvalidEncoding`] if the blob is not base64
    /// - [`CodecError::TooShort`] if it cannot hold a nonce and tag
    /// - [`CodecError::DecryptFailed`] on wrong key or tampering
    /// - [`CodecError::InvalidUtf8`] if the plaintext is not text
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(len = blob.len())))]
    pub fn decrypt(&self, blob: &str) -> CodecResult<String> {
        if blob.is_empty() {
            return Ok(String::new());
        }

        let data = STANDARD
            .decode(blob)
            .map_err(|_| CodecError::InvalidEncoding)?;
        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CodecError::TooShort);
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher()
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CodecError::DecryptFailed)?;

        String::from_utf8(plaintext).map_err(|_| CodecError::InvalidUtf8)
    }
}

/// Advisory check: is `value` base64 long enough to be one of our blobs?
///
/// Not a proof. Plaintext that happens to be long base64 passes too.
pub fn looks_encrypted(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    STANDARD
        .decode(value)
        .map(|data| data.len() > NONCE_SIZE + TAG_SIZE)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfig;

    fn test_cipher() -> FieldCipher {
        let mut key = [0u8; KEY_SIZE];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8;
        }
        FieldCipher::new(key)
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = test_cipher();
        let blob = cipher.encrypt("CI93 1234 5678 9012").unwrap();
        assert_ne!(blob, "CI93 1234 5678 9012");
        assert_eq!(cipher.decrypt(&blob).unwrap(), "CI93 1234 5678 9012");
    }

    #[test]
    fn test_empty_is_identity() {
        let cipher = test_cipher();
        assert_eq!(cipher.encrypt("").unwrap(), "");
        assert_eq!(cipher.decrypt("").unwrap(), "");
    }

    #[test]
    fn test_blob_layout() {
        let cipher = test_cipher();
        let blob = cipher.encrypt("abc").unwrap();
        let raw = STANDARD.decode(&blob).unwrap();
        assert_eq!(raw.len(), NONCE_SIZE + 3 + TAG_SIZE);
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let cipher = test_cipher();
        let a = cipher.encrypt("same").unwrap();
        let b = cipher.encrypt("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails_closed() {
        let blob = test_cipher().encrypt("secret").unwrap();
        let other = FieldCipher::from_passphrase("another key");
        assert_eq!(other.decrypt(&blob), Err(CodecError::DecryptFailed));
    }

    #[test]
    fn test_tampered_blob_fails() {
        let cipher = test_cipher();
        let blob = cipher.encrypt("secret").unwrap();
        let mut raw = STANDARD.decode(&blob).unwrap();
        raw[NONCE_SIZE] ^= 0x01;
        let tampered = STANDARD.encode(raw);
        assert_eq!(cipher.decrypt(&tampered), Err(CodecError::DecryptFailed));
    }

    #[test]
    fn test_malformed_input() {
        let cipher = test_cipher();
        assert_eq!(cipher.decrypt("not base64!"), Err(CodecError::InvalidEncoding));
        assert_eq!(
            cipher.decrypt(&STANDARD.encode([0u8; 8])),
            Err(CodecError::TooShort)
        );
    }

    #[test]
    fn test_looks_encrypted() {
        let cipher = test_cipher();
        let blob = cipher.encrypt("x").unwrap();
        assert!(looks_encrypted(&blob));
        assert!(!looks_encrypted(""));
        assert!(!looks_encrypted("plain text value"));
        assert!(!looks_encrypted("aGVsbG8=")); // "hello": base64, but too short
    }

    #[test]
    fn test_passphrase_is_deterministic() {
        let blob = FieldCipher::from_passphrase("pass").encrypt("v").unwrap();
        assert_eq!(FieldCipher::from_passphrase("pass").decrypt(&blob).unwrap(), "v");
    }

    #[test]
    fn test_from_config_production_requires_key() {
        let config = MemoryConfig::new();
        let err = FieldCipher::from_config(&config, RuntimeMode::Production).unwrap_err();
        assert_eq!(err.code(), crate::LeasekitErrorCode::Config);

        assert!(FieldCipher::from_config(&config, RuntimeMode::Development).is_ok());
    }

    #[test]
    fn test_from_config_raw_key() {
        let raw = STANDARD.encode([7u8; KEY_SIZE]);
        let config = MemoryConfig::new().with(keys::ENCRYPTION_KEY, format!("base64:{raw}"));
        let cipher = FieldCipher::from_config(&config, RuntimeMode::Production).unwrap();
        let blob = cipher.encrypt("v").unwrap();
        assert_eq!(FieldCipher::new([7u8; KEY_SIZE]).decrypt(&blob).unwrap(), "v");

        let short = MemoryConfig::new().with(keys::ENCRYPTION_KEY, "base64:AAAA");
        assert!(FieldCipher::from_config(&short, RuntimeMode::Production).is_err());
    }

    #[test]
    fn test_codec_error_conversion() {
        let err: LeasekitError = CodecError::DecryptFailed.into();
        assert_eq!(err.code(), crate::LeasekitErrorCode::Decryption);
        let err: LeasekitError = CodecError::EncryptFailed("rng".into()).into();
        assert_eq!(err.code(), crate::LeasekitErrorCode::Encryption);
    }
}
