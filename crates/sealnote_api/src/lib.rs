// store handles return `impl Future + Send` explicitly
#![allow(clippy::manual_async_fn)]
#![deny(missing_docs)]
//! Password protected accounts that encrypt, sign, and decode short
//! messages and contact cards exchanged over untrusted channels.
//!
//! - [account]: accounts, contacts, and the lock / unlock protocol
//! - [codec]: encrypted message, signed message, and contact card formats
//! - [vault]: the persisted collection of locked accounts
//! - [updater]: single-flight persistence of account changes

/// Re-exported dependencies.
pub mod dependencies {
    pub use futures;
    pub use tokio;
    pub use tracing;
}

mod error;
pub use error::*;

mod encoding_types;
pub use encoding_types::*;

pub mod wire;

pub mod aead;

pub mod keys;

pub mod password;

pub mod account;

pub mod message;

pub mod codec;

pub mod vault;

pub mod store;

pub mod mem_store;

pub mod updater;

pub mod config;

/// Sealnote api prelude.
pub mod prelude {
    pub use crate::account::{
        AccountPublic, AddContact, Contact, LockedAccount, Peer,
        SharedContact, UnlockedAccount,
    };
    pub use crate::codec::Decoded;
    pub use crate::config::SealConfig;
    pub use crate::message::Message;
    pub use crate::store::traits::AsVaultStore;
    pub use crate::store::VaultStore;
    pub use crate::updater::VaultUpdater;
    pub use crate::vault::Vault;
    pub use crate::{BinData, SealError, SealResult};
}
