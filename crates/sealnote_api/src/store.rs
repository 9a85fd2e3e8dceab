//! Items related to persisting the vault (e.g. to disk).
//!
//! A store holds exactly one opaque blob. It knows nothing about the
//! vault format, it only gives bytes back on load and accepts bytes on save.

use crate::vault::Vault;
use crate::*;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Helper traits for store types - you probably don't need these unless
/// you are implementing a new storage backend.
pub mod traits {
    use super::*;

    /// Defines a vault storage mechanism.
    pub trait AsVaultStore: 'static + Send + Sync {
        /// True if this instance may not write, e.g. because another
        /// instance currently owns the storage.
        fn is_disabled(&self) -> bool;

        /// Load the stored blob, `None` if nothing has been saved yet.
        fn load(&self) -> BoxFuture<'static, SealResult<Option<BinData>>>;

        /// Replace the stored blob.
        fn save(&self, data: BinData) -> BoxFuture<'static, SealResult<()>>;
    }
}
use traits::*;

/// A handle to a vault storage backend.
#[derive(Clone)]
pub struct VaultStore(pub Arc<dyn AsVaultStore>);

impl VaultStore {
    /// See [AsVaultStore::is_disabled].
    pub fn is_disabled(&self) -> bool {
        AsVaultStore::is_disabled(&*self.0)
    }

    /// Load the raw stored blob.
    pub fn load(
        &self,
    ) -> impl Future<Output = SealResult<Option<BinData>>> + 'static + Send
    {
        AsVaultStore::load(&*self.0)
    }

    /// Save a raw blob. Disabled stores refuse.
    pub fn save(
        &self,
        data: BinData,
    ) -> impl Future<Output = SealResult<()>> + 'static + Send {
        let inner = self.0.clone();
        async move {
            if inner.is_disabled() {
                return Err(SealError::StoreDisabled);
            }
            inner.save(data).await
        }
    }

    /// Load and decode the vault, an empty one if nothing is stored.
    pub fn load_vault(
        &self,
    ) -> impl Future<Output = SealResult<Vault>> + 'static + Send {
        let fut = self.load();
        async move {
            match fut.await? {
                Some(data) => Vault::from_bytes(&data),
                None => Ok(Vault::new()),
            }
        }
    }

    /// Encode and save the vault.
    pub fn save_vault(
        &self,
        vault: &Vault,
    ) -> impl Future<Output = SealResult<()>> + 'static + Send {
        let this = self.clone();
        let data = vault.to_bytes();
        async move { this.save(data?).await }
    }
}
