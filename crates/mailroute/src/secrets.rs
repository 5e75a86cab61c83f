//! Secret handling: resolution of service secrets, at-rest encryption of
//! stored credentials and masking for browser-facing reads.
//!
//! Service-level secrets (the at-rest key) resolve from several sources in
//! priority order:
//!
//! 1. **Direct value** - e.g. `MAILROUTE_TOKEN_KEY=...`
//! 2. **File reference** - Docker secrets pattern, e.g. `MAILROUTE_TOKEN_KEY_FILE=/run/secrets/key`

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use secrecy::SecretString;
use std::fs;

/// Error type for secret resolution and encryption failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need a direct value or a file path)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Encryption error: {0}")]
    EncryptionError(String),

    #[error("Decryption error: {0}")]
    DecryptionError(String),

    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("Stored credentials are encrypted but no encryption key is configured")]
    KeyRequired,
}

/// Result type for secret operations.
pub type Result<T> = std::result::Result<T, SecretError>;

/// Prefix shown in place of the hidden part of a masked secret.
pub const MASK_PREFIX: &str = "***";

/// Number of trailing characters left visible by [`mask_secret`].
pub const MASK_VISIBLE_CHARS: usize = 4;

/// Masks a secret as `***` followed by its last four characters.
///
/// Empty values stay empty. Values shorter than four characters keep all of
/// them after the prefix. Counting is by `char`, so multi-byte input never
/// splits inside a code point.
pub fn mask_secret(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let count = value.chars().count();
    let tail: String = value
        .chars()
        .skip(count.saturating_sub(MASK_VISIBLE_CHARS))
        .collect();
    format!("{}{}", MASK_PREFIX, tail)
}

/// Resolves a secret from a direct value first, then from a file.
///
/// File contents are trimmed (secret files usually end with a newline).
pub fn resolve_secret(direct: Option<&str>, file_path: Option<&str>) -> Result<SecretString> {
    if let Some(value) = direct {
        if !value.is_empty() {
            return Ok(SecretString::from(value.to_string()));
        }
    }

    if let Some(path) = file_path {
        if !path.is_empty() {
            let expanded = expand_home(path);
            return match fs::read_to_string(&expanded) {
                Ok(content) => Ok(SecretString::from(content.trim().to_string())),
                Err(e) => Err(SecretError::FileReadError {
                    path: expanded,
                    source: e,
                }),
            };
        }
    }

    Err(SecretError::NoSourceProvided)
}

/// Resolves a secret, returning None if no source is provided instead of an error.
pub fn resolve_secret_optional(
    direct: Option<&str>,
    file_path: Option<&str>,
) -> Result<Option<SecretString>> {
    match resolve_secret(direct, file_path) {
        Ok(secret) => Ok(Some(secret)),
        Err(SecretError::NoSourceProvided) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Expands a leading `~` to the user's home directory.
///
/// `~user/path` is not supported.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let home = home.to_string_lossy();
            if path == "~" {
                return home.into_owned();
            }
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}

/// Marker on values sealed by [`SecretCipher`]. Bumped if the layout changes.
const SEALED_PREFIX: &str = "v1:";

/// AES-256-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Seals stored credential fields with AES-256-GCM.
///
/// Sealed values are `v1:` followed by hex of `nonce || ciphertext`, so they
/// fit the existing TEXT columns.
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

impl SecretCipher {
    /// Builds a cipher from a 64-character hex key.
    pub fn from_hex_key(key_hex: &str) -> Result<Self> {
        let key = from_hex(key_hex.trim())
            .ok_or_else(|| SecretError::InvalidKey("key is not valid hex".to_string()))?;
        if key.len() != 32 {
            return Err(SecretError::InvalidKey(format!(
                "expected 32 bytes (64 hex chars), got {}",
                key.len()
            )));
        }

        Aes256Gcm::new_from_slice(&key)
            .map(|cipher| Self { cipher })
            .map_err(|e| SecretError::InvalidKey(e.to_string()))
    }

    /// Seals `plaintext` under a fresh random nonce.
    pub fn seal(&self, plaintext: &str) -> Result<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| SecretError::EncryptionError(e.to_string()))?;

        let mut out = String::with_capacity(SEALED_PREFIX.len() + (NONCE_LEN + sealed.len()) * 2);
        out.push_str(SEALED_PREFIX);
        out.push_str(&to_hex(&nonce));
        out.push_str(&to_hex(&sealed));
        Ok(out)
    }

    /// Opens a value produced by [`seal`](Self::seal).
    pub fn open(&self, sealed: &str) -> Result<String> {
        let body = sealed.strip_prefix(SEALED_PREFIX).ok_or_else(|| {
            SecretError::DecryptionError("value is not in sealed format".to_string())
        })?;
        let bytes = from_hex(body)
            .ok_or_else(|| SecretError::DecryptionError("sealed value is not valid hex".to_string()))?;
        if bytes.len() <= NONCE_LEN {
            return Err(SecretError::DecryptionError(
                "sealed value is truncated".to_string(),
            ));
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| SecretError::DecryptionError("authentication failed".to_string()))?;

        String::from_utf8(plain).map_err(|e| SecretError::DecryptionError(e.to_string()))
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn from_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    hex.as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
        })
        .collect()
}
