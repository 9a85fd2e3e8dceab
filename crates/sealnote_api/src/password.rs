//! Password hashing and key derivation.
//!
//! The stored [Password] record never contains the derived key, only a
//! second hash of it. Deriving the key again from a guess and hashing it
//! is the only way to check the guess.

use crate::aead::{AeadKey, KEY_BYTES};
use crate::wire::{CodecReader, CodecWriter, LenWidth};
use crate::*;
use rand::RngCore;
use sha2::Digest;
use zeroize::Zeroizing;

/// Salt length for newly created passwords.
pub const SALT_BYTES: usize = 64;

/// Iteration count for newly created passwords.
pub const ITERATIONS: u32 = 128;

/// Key derivation function used by a stored password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordHasher {
    /// PBKDF2-HMAC-SHA256
    Pbkdf2Sha256,
}

impl PasswordHasher {
    /// Wire tag.
    pub const fn tag(self) -> u8 {
        match self {
            Self::Pbkdf2Sha256 => 0,
        }
    }

    /// Look up a hasher by wire tag.
    pub fn from_tag(tag: u8) -> SealResult<Self> {
        match tag {
            0 => Ok(Self::Pbkdf2Sha256),
            oth => Err(SealError::outdated(format!(
                "unknown password hasher: {oth}"
            ))),
        }
    }
}

/// The persisted password record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Password {
    /// Random salt.
    pub salt: BinData,

    /// Kdf iteration count.
    pub iterations: u32,

    /// Kdf algorithm.
    pub hasher: PasswordHasher,

    /// Hash of the derived key.
    pub hash: BinData,
}

impl Password {
    /// Parse a password record.
    pub fn parse(reader: &mut CodecReader<'_>) -> SealResult<Self> {
        let salt = reader.read_len_bytes(LenWidth::U8)?.into();
        let iterations = reader.read_u32()?;
        let hasher = PasswordHasher::from_tag(reader.read_u8()?)?;
        let hash = reader.read_len_bytes(LenWidth::U8)?.into();
        Ok(Self {
            salt,
            iterations,
            hasher,
            hash,
        })
    }

    /// Append this record to the writer.
    pub fn write(&self, writer: &mut CodecWriter) -> SealResult<()> {
        writer.write_len_bytes(LenWidth::U8, &self.salt)?;
        writer.write_u32(self.iterations)?;
        writer.write_u8(self.hasher.tag())?;
        writer.write_len_bytes(LenWidth::U8, &self.hash)
    }
}

/// A password record together with the key it derives.
/// Only ever lives in memory.
#[derive(Debug, Clone)]
pub struct UnlockedPassword {
    password: Password,
    key: AeadKey,
}

impl UnlockedPassword {
    /// Derive a new record from a fresh random salt.
    pub async fn create(password: &str) -> SealResult<Self> {
        let mut salt = vec![0; SALT_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        let salt: BinData = salt.into();

        let hasher = PasswordHasher::Pbkdf2Sha256;
        let (key, hash) =
            derive(hasher, password, salt.clone(), ITERATIONS).await?;

        Ok(Self {
            password: Password {
                salt,
                iterations: ITERATIONS,
                hasher,
                hash,
            },
            key,
        })
    }

    /// Re-derive the key for `guess` and check it against `password`.
    pub async fn unlock(password: &Password, guess: &str) -> SealResult<Self> {
        use subtle::ConstantTimeEq;

        let (key, hash) = derive(
            password.hasher,
            guess,
            password.salt.clone(),
            password.iterations,
        )
        .await?;

        if !bool::from(hash[..].ct_eq(&password.hash[..])) {
            tracing::debug!("password guess rejected");
            return Err(SealError::IncorrectPassword);
        }

        Ok(Self {
            password: password.clone(),
            key,
        })
    }

    /// The persisted half.
    pub fn password(&self) -> &Password {
        &self.password
    }

    /// The derived aead key.
    pub fn key(&self) -> &AeadKey {
        &self.key
    }
}

async fn derive(
    hasher: PasswordHasher,
    password: &str,
    salt: BinData,
    iterations: u32,
) -> SealResult<(AeadKey, BinData)> {
    let password = Zeroizing::new(password.as_bytes().to_vec());
    tokio::task::spawn_blocking(move || -> SealResult<_> {
        let mut derived = Zeroizing::new([0; KEY_BYTES]);
        match hasher {
            PasswordHasher::Pbkdf2Sha256 => {
                pbkdf2::pbkdf2_hmac::<sha2::Sha256>(
                    &password,
                    &salt,
                    iterations,
                    &mut *derived,
                );
            }
        }
        let hash = sha2::Sha256::digest(&*derived).to_vec();
        Ok((AeadKey::from_material(&*derived)?, hash.into()))
    })
    .await?
}
