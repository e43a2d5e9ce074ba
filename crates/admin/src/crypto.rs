//! Symmetric encryption for setting values.
//!
//! Two formats coexist in stored data:
//!
//! - **Authenticated** (`encrypt` / `decrypt`): AES-256-GCM with a 16-byte IV,
//!   encoded as `hex(iv):hex(tag):hex(ciphertext)`.
//! - **Simple** (`simple_encrypt` / `simple_decrypt`): AES-256-CBC with PKCS#7
//!   padding, encoded as `hex(iv):hex(ciphertext)`. This is what the settings
//!   accessor writes.
//!
//! Both derive the key with scrypt (N=2^14, r=8, p=1) from a passphrase and a
//! fixed salt. The passphrase comes from `ENCRYPTION_KEY`, then `JWT_SECRET`,
//! then a hardcoded fallback; the fallback makes every ciphertext readable by
//! anyone who knows the constant, so using it is logged as a warning.
//!
//! Decryption never fails. Values written by older releases may be plain
//! base64 or not encrypted at all, so each decrypt walks
//! versioned format → base64 → input unchanged.

use std::sync::Arc;

use aes::Aes256;
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{AesGcm, Nonce, Tag};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use thiserror::Error;

use crate::settings::EnvSource;

/// Fallback passphrase used when neither `ENCRYPTION_KEY` nor `JWT_SECRET`
/// is set.
pub const DEFAULT_PASSPHRASE: &str = "default-key-change-in-production";

const KDF_SALT: &[u8] = b"salt";
const KDF_LOG_N: u8 = 14;
const KDF_R: u32 = 8;
const KDF_P: u32 = 1;
const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;

type Aes256Gcm16 = AesGcm<Aes256, U16>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Internal failures. Public operations never surface these; they log and
/// fall back instead.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
    #[error("malformed ciphertext: {0}")]
    Malformed(String),
    #[error("cipher operation failed")]
    Cipher,
    #[error("decrypted bytes are not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Where the encryption passphrase came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassphraseSource {
    EncryptionKey,
    JwtSecret,
    Default,
}

/// Pick the passphrase: `ENCRYPTION_KEY`, then `JWT_SECRET`, then
/// [`DEFAULT_PASSPHRASE`].
pub fn resolve_passphrase(env: &impl EnvSource) -> (String, PassphraseSource) {
    let set = |name: &str| env.var(name).filter(|v| !v.is_empty());

    if let Some(key) = set("ENCRYPTION_KEY") {
        (key, PassphraseSource::EncryptionKey)
    } else if let Some(secret) = set("JWT_SECRET") {
        (secret, PassphraseSource::JwtSecret)
    } else {
        (DEFAULT_PASSPHRASE.to_owned(), PassphraseSource::Default)
    }
}

/// Cipher for setting values, holding the derived key.
///
/// Deriving the scrypt key is deliberately slow, so it happens once at
/// construction and the cipher is cheap to clone afterwards.
#[derive(Clone)]
pub struct SettingsCipher {
    key: Arc<[u8; KEY_LEN]>,
}

impl std::fmt::Debug for SettingsCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl SettingsCipher {
    /// Derive the key from an explicit passphrase.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::KeyDerivation` if scrypt rejects its parameters.
    pub fn from_passphrase(passphrase: &str) -> Result<Self, CryptoError> {
        let params = scrypt::Params::new(KDF_LOG_N, KDF_R, KDF_P, KEY_LEN)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

        let mut key = [0u8; KEY_LEN];
        scrypt::scrypt(passphrase.as_bytes(), KDF_SALT, &params, &mut key)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

        Ok(Self { key: Arc::new(key) })
    }

    /// Derive the key from the environment (see [`resolve_passphrase`]).
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::KeyDerivation` if scrypt rejects its parameters.
    pub fn from_env(env: &impl EnvSource) -> Result<Self, CryptoError> {
        let (passphrase, source) = resolve_passphrase(env);
        match source {
            PassphraseSource::EncryptionKey => {}
            PassphraseSource::JwtSecret => {
                tracing::info!("ENCRYPTION_KEY not set, deriving settings key from JWT_SECRET");
            }
            PassphraseSource::Default => {
                tracing::warn!(
                    "Neither ENCRYPTION_KEY nor JWT_SECRET is set; encrypted settings use the \
                     built-in default passphrase and are NOT confidential"
                );
            }
        }
        Self::from_passphrase(&passphrase)
    }

    // =========================================================================
    // Authenticated format (AES-256-GCM)
    // =========================================================================

    /// Encrypt with AES-256-GCM, falling back to [`Self::simple_encrypt`].
    #[must_use]
    pub fn encrypt(&self, text: &str) -> String {
        self.try_encrypt_gcm(text).unwrap_or_else(|e| {
            tracing::error!(error = %e, "GCM encryption failed, using simple encryption");
            self.simple_encrypt(text)
        })
    }

    /// Decrypt an authenticated value, falling back to
    /// [`Self::simple_decrypt`] for anything that is not three hex parts or
    /// fails authentication.
    #[must_use]
    pub fn decrypt(&self, data: &str) -> String {
        let parts: Vec<&str> = data.split(':').collect();
        let [iv, tag, ciphertext] = parts.as_slice() else {
            return self.simple_decrypt(data);
        };

        self.try_decrypt_gcm(iv, tag, ciphertext)
            .unwrap_or_else(|e| {
                tracing::debug!(error = %e, "GCM decryption failed, trying simple format");
                self.simple_decrypt(data)
            })
    }

    fn try_encrypt_gcm(&self, text: &str) -> Result<String, CryptoError> {
        let cipher = Aes256Gcm16::new_from_slice(self.key.as_slice())
            .map_err(|_| CryptoError::Cipher)?;

        let iv = random_iv();
        let mut buffer = text.as_bytes().to_vec();
        let tag = cipher
            .encrypt_in_place_detached(Nonce::<U16>::from_slice(&iv), b"", &mut buffer)
            .map_err(|_| CryptoError::Cipher)?;

        Ok(format!(
            "{}:{}:{}",
            hex::encode(iv),
            hex::encode(tag),
            hex::encode(buffer)
        ))
    }

    fn try_decrypt_gcm(&self, iv: &str, tag: &str, ciphertext: &str) -> Result<String, CryptoError> {
        let iv = decode_hex_exact(iv, IV_LEN, "iv")?;
        let tag = decode_hex_exact(tag, TAG_LEN, "auth tag")?;
        let mut buffer =
            hex::decode(ciphertext).map_err(|e| CryptoError::Malformed(e.to_string()))?;

        let cipher = Aes256Gcm16::new_from_slice(self.key.as_slice())
            .map_err(|_| CryptoError::Cipher)?;
        cipher
            .decrypt_in_place_detached(
                Nonce::<U16>::from_slice(&iv),
                b"",
                &mut buffer,
                Tag::<U16>::from_slice(&tag),
            )
            .map_err(|_| CryptoError::Cipher)?;

        Ok(String::from_utf8(buffer)?)
    }

    // =========================================================================
    // Simple format (AES-256-CBC)
    // =========================================================================

    /// Encrypt with AES-256-CBC. Falls back to plain base64 if the cipher
    /// cannot be constructed.
    #[must_use]
    pub fn simple_encrypt(&self, text: &str) -> String {
        let iv = random_iv();
        match Aes256CbcEnc::new_from_slices(self.key.as_slice(), &iv) {
            Ok(cipher) => {
                let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(text.as_bytes());
                format!("{}:{}", hex::encode(iv), hex::encode(ciphertext))
            }
            Err(e) => {
                tracing::error!(error = %e, "CBC encryption failed, storing base64");
                BASE64.encode(text)
            }
        }
    }

    /// Decrypt a simple-format value.
    ///
    /// Never fails: two hex parts are decrypted with CBC, anything else (or a
    /// failed decryption) is tried as base64, and if that is not valid UTF-8
    /// either the input is returned unchanged.
    #[must_use]
    pub fn simple_decrypt(&self, data: &str) -> String {
        if let Some((iv, ciphertext)) = data.split_once(':')
            && !ciphertext.contains(':')
        {
            match self.try_decrypt_cbc(iv, ciphertext) {
                Ok(plain) => return plain,
                Err(e) => tracing::debug!(error = %e, "CBC decryption failed, trying base64"),
            }
        }
        fallback_decode(data)
    }

    fn try_decrypt_cbc(&self, iv: &str, ciphertext: &str) -> Result<String, CryptoError> {
        let iv = decode_hex_exact(iv, IV_LEN, "iv")?;
        let ciphertext =
            hex::decode(ciphertext).map_err(|e| CryptoError::Malformed(e.to_string()))?;

        let plain = Aes256CbcDec::new_from_slices(self.key.as_slice(), &iv)
            .map_err(|_| CryptoError::Cipher)?
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| CryptoError::Cipher)?;

        Ok(String::from_utf8(plain)?)
    }
}

/// Last two stages of the decrypt chain: base64, then passthrough.
fn fallback_decode(data: &str) -> String {
    BASE64
        .decode(data)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| data.to_owned())
}

fn random_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);
    iv
}

fn decode_hex_exact(value: &str, len: usize, what: &str) -> Result<Vec<u8>, CryptoError> {
    let bytes = hex::decode(value).map_err(|e| CryptoError::Malformed(format!("{what}: {e}")))?;
    if bytes.len() != len {
        return Err(CryptoError::Malformed(format!(
            "{what} must be {len} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(bytes)
}
