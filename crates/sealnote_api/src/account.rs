//! Accounts, contacts, and the lock / unlock protocol.
//!
//! An [UnlockedAccount] holds the live key material. Locking it encrypts
//! the private bundle under the password-derived key, using the exact
//! serialized [AccountPublic] bytes as associated data, so the public
//! fields cannot be swapped without unlock failing.

use crate::aead::{self, AeadIv};
use crate::keys::*;
use crate::password::*;
use crate::wire::{CodecReader, CodecWriter, LenWidth};
use crate::*;

const ACCOUNT_PUBLIC_VERSION: u8 = 0;
const PRIVATE_BUNDLE_VERSION: u8 = 0;
const LOCKED_ACCOUNT_VERSION: u8 = 0;

/// Curve used for newly created accounts.
pub const ACCOUNT_CURVE: Curve = Curve::P256;

/// Hash used when signing our own contact card.
pub const CONTACT_HASH: HashAlgorithm = HashAlgorithm::Sha256;

fn check_name(name: &str) -> SealResult<()> {
    if name.len() > LenWidth::U16.max_len() {
        return Err(SealError::format(format!(
            "account name too long: {} bytes",
            name.len()
        )));
    }
    Ok(())
}

/// The public, unencrypted part of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountPublic {
    /// Display name.
    pub name: String,

    /// Identity (signing) key.
    pub dsa: StoredPublicKey,
}

impl AccountPublic {
    /// Parse an account public record.
    pub fn parse(reader: &mut CodecReader<'_>) -> SealResult<Self> {
        match reader.read_u8()? {
            ACCOUNT_PUBLIC_VERSION => (),
            oth => {
                return Err(SealError::outdated(format!(
                    "account public version {oth}"
                )))
            }
        }
        let name = reader.read_len_str(LenWidth::U16)?;
        let dsa = StoredPublicKey::parse(reader)?;
        Ok(Self { name, dsa })
    }

    /// Append this record to the writer.
    pub fn write(&self, writer: &mut CodecWriter) -> SealResult<()> {
        writer.write_u8(ACCOUNT_PUBLIC_VERSION)?;
        writer.write_len_str(LenWidth::U16, &self.name)?;
        self.dsa.write(writer)
    }
}

/// What one party shares with another: an identity key and a key
/// agreement key, the latter signed by the former.
///
/// There is no way to construct one whose signature does not verify.
/// Equality compares the identity (dsa) key only.
#[derive(Debug, Clone)]
pub struct SharedContact {
    dsa: StoredPublicKey,
    dh: StoredPublicKey,
    hash: HashAlgorithm,
    signature: BinData,
}

impl PartialEq for SharedContact {
    fn eq(&self, other: &Self) -> bool {
        self.dsa == other.dsa
    }
}

impl Eq for SharedContact {}

impl SharedContact {
    fn create(
        dsa_public: &StoredPublicKey,
        dsa_private: &StoredPrivateKey,
        dh: &StoredPublicKey,
    ) -> SealResult<Self> {
        let signature = dsa_private.sign(CONTACT_HASH, dh.as_bytes())?;
        Ok(Self {
            dsa: dsa_public.clone(),
            dh: dh.clone(),
            hash: CONTACT_HASH,
            signature: signature.into(),
        })
    }

    /// Parse a shared contact, verifying its signature.
    /// A signature that does not verify is a format error.
    pub fn parse(reader: &mut CodecReader<'_>) -> SealResult<Self> {
        let dsa = StoredPublicKey::parse(reader)?;
        let dh = StoredPublicKey::parse(reader)?;
        let hash = HashAlgorithm::from_tag(reader.read_u8()?)?;
        let signature: BinData = reader.read_len_bytes(LenWidth::U16)?.into();
        if !dsa.verify(hash, dh.as_bytes(), &signature) {
            return Err(SealError::format("shared contact signature invalid"));
        }
        Ok(Self {
            dsa,
            dh,
            hash,
            signature,
        })
    }

    /// Append this contact to the writer.
    pub fn write(&self, writer: &mut CodecWriter) -> SealResult<()> {
        self.dsa.write(writer)?;
        self.dh.write(writer)?;
        writer.write_u8(self.hash.tag())?;
        writer.write_len_bytes(LenWidth::U16, &self.signature)
    }

    /// Serialize to a standalone byte sequence.
    pub fn to_bytes(&self) -> SealResult<BinData> {
        let mut writer = CodecWriter::new();
        self.write(&mut writer)?;
        Ok(writer.into_bin_data())
    }

    /// Identity key.
    pub fn dsa(&self) -> &StoredPublicKey {
        &self.dsa
    }

    /// Key agreement key.
    pub fn dh(&self) -> &StoredPublicKey {
        &self.dh
    }

    /// Hash used for the dh key signature.
    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }
}

/// An entry in an account's contact list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// The verified keys.
    pub shared: SharedContact,

    /// User chosen name.
    pub nickname: String,

    /// Freeform note.
    pub note: String,
}

impl Contact {
    /// Parse a contact.
    pub fn parse(reader: &mut CodecReader<'_>) -> SealResult<Self> {
        let shared = SharedContact::parse(reader)?;
        let nickname = reader.read_len_str(LenWidth::U16)?;
        let note = reader.read_len_str(LenWidth::U32)?;
        Ok(Self {
            shared,
            nickname,
            note,
        })
    }

    /// Append this contact to the writer.
    pub fn write(&self, writer: &mut CodecWriter) -> SealResult<()> {
        self.shared.write(writer)?;
        writer.write_len_str(LenWidth::U16, &self.nickname)?;
        writer.write_len_str(LenWidth::U32, &self.note)
    }
}

/// How a [SharedContact] resolves against an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Peer {
    /// The account itself.
    Me,

    /// A contact in the account's list.
    Contact(Contact),

    /// Someone the account does not know.
    Unknown(SharedContact),
}

/// Result of [UnlockedAccount::add_contact].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddContact {
    /// Appended at this index.
    Added(usize),

    /// The card belongs to this account.
    IsSelf,

    /// Already present at this index, nothing changed.
    AlreadyKnown(usize),
}

/// A logged in account, with live key material.
#[derive(Debug, Clone)]
pub struct UnlockedAccount {
    password: UnlockedPassword,
    public: AccountPublic,
    dsa: StoredPrivateKey,
    dh: StoredKeyPair,
    contacts: Vec<Contact>,
}

impl UnlockedAccount {
    /// Create a brand new account with fresh keys and no contacts.
    pub async fn create(name: &str, password: &str) -> SealResult<Self> {
        check_name(name)?;
        let password = UnlockedPassword::create(password).await?;
        let dsa = StoredKeyPair::generate(ACCOUNT_CURVE);
        let dh = StoredKeyPair::generate(ACCOUNT_CURVE);
        tracing::debug!(%name, "created account");
        Ok(Self {
            password,
            public: AccountPublic {
                name: name.to_string(),
                dsa: dsa.public,
            },
            dsa: dsa.private,
            dh,
            contacts: Vec::new(),
        })
    }

    /// Encrypt the current state into a [LockedAccount].
    ///
    /// Works from `&self`, so the locked result always reflects one
    /// consistent snapshot.
    pub async fn lock(&self) -> SealResult<LockedAccount> {
        let mut public_writer = CodecWriter::new();
        self.public.write(&mut public_writer)?;
        let public_bytes = public_writer.into_bin_data();

        let mut writer = CodecWriter::new();
        writer.write_u8(PRIVATE_BUNDLE_VERSION)?;
        self.dsa.write(&mut writer)?;
        self.dh.write(&mut writer)?;
        writer.write_count(self.contacts.len())?;
        for contact in self.contacts.iter() {
            contact.write(&mut writer)?;
        }
        let plaintext = zeroize::Zeroizing::new(writer.into_vec());

        let (iv, ciphertext) =
            aead::encrypt(self.password.key(), &plaintext, &public_bytes)?;

        tracing::trace!(name = %self.public.name, "locked account");
        Ok(LockedAccount {
            password: self.password.password().clone(),
            iv,
            ciphertext: ciphertext.into(),
            public_bytes,
            public: self.public.clone(),
        })
    }

    /// The public part of this account.
    pub fn public(&self) -> &AccountPublic {
        &self.public
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.public.name
    }

    /// The ordered contact list.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub(crate) fn dh(&self) -> &StoredKeyPair {
        &self.dh
    }

    pub(crate) fn dsa_private(&self) -> &StoredPrivateKey {
        &self.dsa
    }

    /// A freshly signed card for this account.
    pub fn shared_contact(&self) -> SealResult<SharedContact> {
        SharedContact::create(&self.public.dsa, &self.dsa, &self.dh.public)
    }

    /// True if `shared` is this account's own identity.
    pub fn is_account(&self, shared: &SharedContact) -> bool {
        shared.dsa == self.public.dsa
    }

    /// Find a contact by identity key.
    pub fn find_contact(&self, shared: &SharedContact) -> Option<usize> {
        self.contacts.iter().position(|c| c.shared == *shared)
    }

    /// Resolve `shared` to me, a known contact, or an unknown party.
    pub fn resolve(&self, shared: &SharedContact) -> Peer {
        if self.is_account(shared) {
            return Peer::Me;
        }
        match self.find_contact(shared) {
            Some(idx) => Peer::Contact(self.contacts[idx].clone()),
            None => Peer::Unknown(shared.clone()),
        }
    }

    /// Add a verified card to the contact list.
    pub fn add_contact(
        &mut self,
        shared: SharedContact,
        nickname: String,
        note: String,
    ) -> AddContact {
        if self.is_account(&shared) {
            return AddContact::IsSelf;
        }
        if let Some(idx) = self.find_contact(&shared) {
            return AddContact::AlreadyKnown(idx);
        }
        self.contacts.push(Contact {
            shared,
            nickname,
            note,
        });
        AddContact::Added(self.contacts.len() - 1)
    }

    /// Remove the contact at `index`.
    pub fn remove_contact(&mut self, index: usize) -> Option<Contact> {
        if index < self.contacts.len() {
            Some(self.contacts.remove(index))
        } else {
            None
        }
    }

    /// Move a contact from one list position to another.
    pub fn move_contact(&mut self, from: usize, to: usize) -> bool {
        if from >= self.contacts.len() || to >= self.contacts.len() {
            return false;
        }
        let contact = self.contacts.remove(from);
        self.contacts.insert(to, contact);
        true
    }

    /// Mutable access to a contact, e.g. to edit its nickname or note.
    pub fn contact_mut(&mut self, index: usize) -> Option<&mut Contact> {
        self.contacts.get_mut(index)
    }

    /// Change the display name.
    pub fn rename(&mut self, name: &str) -> SealResult<()> {
        check_name(name)?;
        self.public.name = name.to_string();
        Ok(())
    }

    /// Re-derive the account key from a new password and fresh salt.
    /// Takes effect at the next [UnlockedAccount::lock].
    pub async fn change_password(&mut self, password: &str) -> SealResult<()> {
        self.password = UnlockedPassword::create(password).await?;
        tracing::debug!(name = %self.public.name, "changed account password");
        Ok(())
    }
}

/// An account at rest: encrypted private bundle plus verbatim public data.
///
/// Equality compares the identity key only.
#[derive(Debug, Clone)]
pub struct LockedAccount {
    password: Password,
    iv: AeadIv,
    ciphertext: BinData,
    public_bytes: BinData,
    public: AccountPublic,
}

impl PartialEq for LockedAccount {
    fn eq(&self, other: &Self) -> bool {
        self.public.dsa == other.public.dsa
    }
}

impl Eq for LockedAccount {}

impl LockedAccount {
    /// Parse a locked account.
    pub fn parse(reader: &mut CodecReader<'_>) -> SealResult<Self> {
        match reader.read_u8()? {
            LOCKED_ACCOUNT_VERSION => (),
            oth => {
                return Err(SealError::outdated(format!(
                    "locked account version {oth}"
                )))
            }
        }
        let password = Password::parse(reader)?;
        let iv = AeadIv::try_from(reader.read_len_bytes(LenWidth::U8)?)?;
        let ciphertext = reader.read_len_bytes(LenWidth::U32)?.into();

        let start = reader.position();
        let public = AccountPublic::parse(reader)?;
        let public_bytes = reader.slice(start, reader.position())?.into();

        Ok(Self {
            password,
            iv,
            ciphertext,
            public_bytes,
            public,
        })
    }

    /// Append this account to the writer.
    pub fn write(&self, writer: &mut CodecWriter) -> SealResult<()> {
        writer.write_u8(LOCKED_ACCOUNT_VERSION)?;
        self.password.write(writer)?;
        writer.write_len_bytes(LenWidth::U8, self.iv.as_ref())?;
        writer.write_len_bytes(LenWidth::U32, &self.ciphertext)?;
        writer.write_bytes(&self.public_bytes)
    }

    /// Decode a locked account that must span all of `data`,
    /// e.g. one pasted in for import.
    pub fn from_bytes(data: &[u8]) -> SealResult<Self> {
        let mut reader = CodecReader::new(data);
        let out = Self::parse(&mut reader)?;
        reader.expect_end("locked account")?;
        Ok(out)
    }

    /// Serialize to a standalone byte sequence for export.
    pub fn to_bytes(&self) -> SealResult<BinData> {
        let mut writer = CodecWriter::new();
        self.write(&mut writer)?;
        Ok(writer.into_bin_data())
    }

    /// The public part of this account.
    pub fn public(&self) -> &AccountPublic {
        &self.public
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.public.name
    }

    /// Verify `guess` and decrypt the private bundle.
    ///
    /// A wrong guess is [SealError::IncorrectPassword]. A correct guess
    /// whose decryption fails authentication is [SealError::TamperedData].
    pub async fn unlock(&self, guess: &str) -> SealResult<UnlockedAccount> {
        let password = UnlockedPassword::unlock(&self.password, guess).await?;

        let plaintext = match aead::decrypt(
            password.key(),
            &self.iv,
            &self.ciphertext,
            &self.public_bytes,
        ) {
            Some(plaintext) => plaintext,
            None => {
                tracing::warn!(name = %self.public.name, "locked account failed authentication");
                return Err(SealError::TamperedData);
            }
        };

        let mut reader = CodecReader::new(&plaintext);
        match reader.read_u8()? {
            PRIVATE_BUNDLE_VERSION => (),
            oth => {
                return Err(SealError::outdated(format!(
                    "private bundle version {oth}"
                )))
            }
        }
        let dsa = StoredPrivateKey::parse(&mut reader, &self.public.dsa)?;
        let dh = StoredKeyPair::parse(&mut reader)?;
        let count = reader.read_u32()?;
        let mut contacts = Vec::new();
        for _ in 0..count {
            contacts.push(Contact::parse(&mut reader)?);
        }
        reader.expect_end("private bundle")?;

        tracing::debug!(name = %self.public.name, "unlocked account");
        Ok(UnlockedAccount {
            password,
            public: self.public.clone(),
            dsa,
            dh,
            contacts,
        })
    }
}
