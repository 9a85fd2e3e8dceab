//! AES-256-GCM helpers.
//!
//! IVs are always random and returned alongside the ciphertext,
//! callers cannot supply their own.

use crate::*;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use zeroize::Zeroizing;

/// Length of an aes-gcm iv.
pub const IV_BYTES: usize = 12;

/// Length of an aes-256 key.
pub const KEY_BYTES: usize = 32;

/// A symmetric key usable for authenticated encryption.
#[derive(Clone)]
pub struct AeadKey(Zeroizing<[u8; KEY_BYTES]>);

impl std::fmt::Debug for AeadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AeadKey").finish()
    }
}

impl AeadKey {
    /// Build a key from the leading KEY_BYTES of some key material.
    pub(crate) fn from_material(material: &[u8]) -> SealResult<Self> {
        if material.len() < KEY_BYTES {
            return Err(SealError::other(format!(
                "key material too short: {} bytes",
                material.len()
            )));
        }
        let mut key = Zeroizing::new([0; KEY_BYTES]);
        key.copy_from_slice(&material[..KEY_BYTES]);
        Ok(Self(key))
    }

    /// Raw key bytes.
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_BYTES] {
        &self.0
    }
}

/// Newtype for the iv for safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AeadIv([u8; IV_BYTES]);

impl AeadIv {
    fn new_random() -> Self {
        let mut bytes = [0; IV_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }
}

impl AsRef<[u8]> for AeadIv {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::convert::TryFrom<&[u8]> for AeadIv {
    type Error = SealError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        if slice.len() == IV_BYTES {
            let mut inner = [0; IV_BYTES];
            inner.copy_from_slice(slice);
            Ok(Self(inner))
        } else {
            Err(SealError::format(format!(
                "expected {IV_BYTES} byte iv, got {}",
                slice.len()
            )))
        }
    }
}

/// Encrypt `plaintext` under `key` with a fresh random iv,
/// authenticating (but not hiding) `aad`.
pub fn encrypt(
    key: &AeadKey,
    plaintext: &[u8],
    aad: &[u8],
) -> SealResult<(AeadIv, Vec<u8>)> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| SealError::other(format!("aead key: {e}")))?;
    let iv = AeadIv::new_random();
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&iv.0),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| SealError::other(format!("aead encrypt: {e}")))?;
    Ok((iv, ciphertext))
}

/// Exact inverse of [encrypt]. Returns `None` if authentication fails,
/// callers decide whether that is an error.
pub fn decrypt(
    key: &AeadKey,
    iv: &AeadIv,
    ciphertext: &[u8],
    aad: &[u8],
) -> Option<Zeroizing<Vec<u8>>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).ok()?;
    cipher
        .decrypt(
            Nonce::from_slice(&iv.0),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .ok()
        .map(Zeroizing::new)
}
