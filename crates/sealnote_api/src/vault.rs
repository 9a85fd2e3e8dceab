//! The persisted collection of locked accounts.

use crate::account::LockedAccount;
use crate::wire::{CodecReader, CodecWriter};
use crate::*;

const VAULT_VERSION: u8 = 0;

/// Number of boolean flags packed into the vault.
pub const FLAG_COUNT: usize = 8;

/// Every locked account, a bin of deleted ones, and some feature flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vault {
    accounts: Vec<LockedAccount>,
    bin: Vec<LockedAccount>,
    flags: u8,
}

fn parse_list(reader: &mut CodecReader<'_>) -> SealResult<Vec<LockedAccount>> {
    let count = reader.read_u32()?;
    let mut out = Vec::new();
    for _ in 0..count {
        out.push(LockedAccount::parse(reader)?);
    }
    Ok(out)
}

fn write_list(
    writer: &mut CodecWriter,
    list: &[LockedAccount],
) -> SealResult<()> {
    writer.write_count(list.len())?;
    for account in list {
        account.write(writer)?;
    }
    Ok(())
}

impl Vault {
    /// An empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a vault that must span all of `data`.
    pub fn from_bytes(data: &[u8]) -> SealResult<Self> {
        let mut reader = CodecReader::new(data);
        match reader.read_u8()? {
            VAULT_VERSION => (),
            oth => {
                return Err(SealError::outdated(format!("vault version {oth}")))
            }
        }
        let accounts = parse_list(&mut reader)?;
        let bin = parse_list(&mut reader)?;
        let flags = reader.read_u8()?;
        reader.expect_end("vault")?;
        Ok(Self {
            accounts,
            bin,
            flags,
        })
    }

    /// Encode the whole vault.
    pub fn to_bytes(&self) -> SealResult<BinData> {
        let mut writer = CodecWriter::new();
        writer.write_u8(VAULT_VERSION)?;
        write_list(&mut writer, &self.accounts)?;
        write_list(&mut writer, &self.bin)?;
        writer.write_u8(self.flags)?;
        Ok(writer.into_bin_data())
    }

    /// Live accounts.
    pub fn accounts(&self) -> &[LockedAccount] {
        &self.accounts
    }

    /// Deleted accounts that can still be restored.
    pub fn bin(&self) -> &[LockedAccount] {
        &self.bin
    }

    /// Index of the first live account named `name`.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.accounts.iter().position(|a| a.name() == name)
    }

    /// Index of the first binned account named `name`.
    pub fn find_in_bin(&self, name: &str) -> Option<usize> {
        self.bin.iter().position(|a| a.name() == name)
    }

    /// Add an account. An account with the same identity key is
    /// replaced in place instead.
    pub fn add(&mut self, account: LockedAccount) {
        if !self.replace(account.clone()) {
            self.accounts.push(account);
        }
    }

    /// Replace the live account with the same identity key.
    /// Returns false if there is none.
    pub fn replace(&mut self, account: LockedAccount) -> bool {
        match self.accounts.iter_mut().find(|a| **a == account) {
            Some(slot) => {
                *slot = account;
                true
            }
            None => false,
        }
    }

    /// Move a live account to the bin.
    pub fn move_to_bin(&mut self, index: usize) -> bool {
        if index >= self.accounts.len() {
            return false;
        }
        let account = self.accounts.remove(index);
        self.bin.push(account);
        true
    }

    /// Move a binned account back to the live list.
    pub fn restore(&mut self, index: usize) -> bool {
        if index >= self.bin.len() {
            return false;
        }
        let account = self.bin.remove(index);
        self.add(account);
        true
    }

    /// Permanently drop a binned account.
    pub fn purge(&mut self, index: usize) -> Option<LockedAccount> {
        if index < self.bin.len() {
            Some(self.bin.remove(index))
        } else {
            None
        }
    }

    /// Read feature flag `index`. Out of range flags are always unset.
    pub fn flag(&self, index: usize) -> bool {
        index < FLAG_COUNT && self.flags & (1 << index) != 0
    }

    /// Set feature flag `index`. Returns false if out of range.
    pub fn set_flag(&mut self, index: usize, value: bool) -> bool {
        if index >= FLAG_COUNT {
            return false;
        }
        if value {
            self.flags |= 1 << index;
        } else {
            self.flags &= !(1 << index);
        }
        true
    }
}
