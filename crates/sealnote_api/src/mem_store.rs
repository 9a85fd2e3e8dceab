//! In-memory vault store - usually for testing

use crate::store::traits::*;
use crate::store::*;
use crate::*;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use std::sync::Arc;

/// Create an in-memory VaultStore.
pub fn create_mem_store() -> VaultStore {
    VaultStore(Arc::new(PrivMemStore {
        disabled: false,
        data: RwLock::new(None),
    }))
}

/// Create an in-memory VaultStore that reports itself as disabled,
/// pre-loaded with `data`.
pub fn create_disabled_mem_store(data: Option<BinData>) -> VaultStore {
    VaultStore(Arc::new(PrivMemStore {
        disabled: true,
        data: RwLock::new(data),
    }))
}

// -- private -- //

struct PrivMemStore {
    disabled: bool,
    data: RwLock<Option<BinData>>,
}

impl AsVaultStore for PrivMemStore {
    fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn load(&self) -> BoxFuture<'static, SealResult<Option<BinData>>> {
        let data = self.data.read().clone();
        async move { Ok(data) }.boxed()
    }

    fn save(&self, data: BinData) -> BoxFuture<'static, SealResult<()>> {
        *self.data.write() = Some(data);
        async move { Ok(()) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::Vault;

    #[tokio::test(flavor = "multi_thread")]
    async fn mem_store_save_and_load() {
        let store = create_mem_store();
        assert!(store.load().await.unwrap().is_none());
        assert_eq!(Vault::new(), store.load_vault().await.unwrap());

        let mut vault = Vault::new();
        vault.set_flag(0, true);
        store.save_vault(&vault).await.unwrap();
        assert!(store.load_vault().await.unwrap().flag(0));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn disabled_store_refuses_saves() {
        let data = Vault::new().to_bytes().unwrap();
        let store = create_disabled_mem_store(Some(data.clone()));
        assert!(store.is_disabled());
        assert!(matches!(
            store.save(BinData::from(vec![1])).await,
            Err(SealError::StoreDisabled)
        ));
        assert_eq!(Some(data), store.load().await.unwrap());
    }
}
