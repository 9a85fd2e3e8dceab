//! Single-flight persistence of account changes.
//!
//! Each change to an unlocked account has to be locked (encrypted) again
//! and written out. Changes can arrive faster than that, so only the most
//! recent snapshot per account is queued, and at most one caller at a time
//! runs the lock / encode / save loop. Callers arriving while a flush is in
//! progress queue their change and wait for the pass that writes it.

use crate::account::UnlockedAccount;
use crate::store::VaultStore;
use crate::vault::Vault;
use crate::*;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;

struct Queued {
    account: UnlockedAccount,
    create: bool,
}

struct UpdaterInner {
    vault: Vault,
    queued: Vec<Queued>,
    dirty: bool,
    waiters: Vec<oneshot::Sender<SealResult<()>>>,
    flushing: bool,
}

impl UpdaterInner {
    // one slot per identity key, latest snapshot wins
    fn enqueue(&mut self, account: UnlockedAccount, create: bool) {
        let dsa = &account.public().dsa;
        match self.queued.iter_mut().find(|q| &q.account.public().dsa == dsa) {
            Some(slot) => {
                slot.account = account;
                slot.create |= create;
            }
            None => self.queued.push(Queued { account, create }),
        }
    }
}

/// Serializes writes of the vault to its store.
#[derive(Clone)]
pub struct VaultUpdater {
    inner: Arc<Mutex<UpdaterInner>>,
    store: VaultStore,
}

// releases the flushing flag if a flush is dropped mid-way.
// Waiters of that flush see a cancellation error, queued snapshots
// stay queued for the next flush.
struct FlushGuard {
    inner: Arc<Mutex<UpdaterInner>>,
    armed: bool,
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        if self.armed {
            let mut inner = self.inner.lock();
            inner.flushing = false;
            inner.waiters.clear();
        }
    }
}

impl VaultUpdater {
    /// Load the current vault from `store`.
    pub async fn load(store: VaultStore) -> SealResult<Self> {
        let vault = store.load_vault().await?;
        Ok(Self {
            inner: Arc::new(Mutex::new(UpdaterInner {
                vault,
                queued: Vec::new(),
                dirty: false,
                waiters: Vec::new(),
                flushing: false,
            })),
            store,
        })
    }

    /// The backing store.
    pub fn store(&self) -> &VaultStore {
        &self.store
    }

    /// A snapshot of the in-memory vault. Queued account updates
    /// that are not flushed yet are not reflected.
    pub fn vault(&self) -> Vault {
        self.inner.lock().vault.clone()
    }

    /// Add `account` to the live list, replacing any live account with
    /// the same identity key, and persist it.
    pub async fn add(&self, account: UnlockedAccount) -> SealResult<()> {
        self.submit(move |inner| inner.enqueue(account, true)).await
    }

    /// Record a new state for a live `account` and persist it.
    ///
    /// Resolves once a save that includes this snapshot has finished,
    /// with that save's result. A snapshot of an account that is no
    /// longer live by the time it is written (binned, purged) is dropped.
    pub async fn update(&self, account: UnlockedAccount) -> SealResult<()> {
        self.submit(move |inner| inner.enqueue(account, false)).await
    }

    /// Apply `f` to the vault itself (add, bin, restore, flags...)
    /// and persist the result through the same single-flight queue.
    /// The in-memory change stays applied even if the save fails.
    pub async fn modify<R, F>(&self, f: F) -> SealResult<R>
    where
        F: FnOnce(&mut Vault) -> R,
    {
        self.submit(move |inner| {
            inner.dirty = true;
            f(&mut inner.vault)
        })
        .await
    }

    async fn submit<R, F>(&self, f: F) -> SealResult<R>
    where
        F: FnOnce(&mut UpdaterInner) -> R,
    {
        let (send, recv) = oneshot::channel();
        let (out, run) = {
            let mut inner = self.inner.lock();
            let out = f(&mut *inner);
            inner.waiters.push(send);
            let run = !inner.flushing;
            inner.flushing = true;
            (out, run)
        };

        if run {
            self.flush().await;
        } else {
            tracing::trace!("change queued behind running flush");
        }

        match recv.await {
            Ok(res) => res.map(|()| out),
            Err(_) => Err("vault flush was cancelled".into()),
        }
    }

    async fn flush(&self) {
        let mut guard = FlushGuard {
            inner: self.inner.clone(),
            armed: true,
        };
        loop {
            let (queued, waiters) = {
                let mut inner = self.inner.lock();
                if inner.queued.is_empty()
                    && inner.waiters.is_empty()
                    && !inner.dirty
                {
                    // released under the same lock that saw the queue empty
                    inner.flushing = false;
                    guard.armed = false;
                    return;
                }
                inner.dirty = false;
                (
                    std::mem::take(&mut inner.queued),
                    std::mem::take(&mut inner.waiters),
                )
            };

            let res = self.write(queued).await;
            match &res {
                Ok(()) => tracing::debug!("flushed vault"),
                Err(err) => tracing::warn!(?err, "vault flush failed"),
            }
            for waiter in waiters {
                let _ = waiter.send(match &res {
                    Ok(()) => Ok(()),
                    Err(err) => Err(err.duplicate()),
                });
            }
        }
    }

    async fn write(&self, queued: Vec<Queued>) -> SealResult<()> {
        for Queued { account, create } in queued {
            let locked = account.lock().await?;
            let mut inner = self.inner.lock();
            if create {
                inner.vault.add(locked);
            } else if !inner.vault.replace(locked) {
                tracing::debug!(
                    name = %account.name(),
                    "dropped update for an account that is not live",
                );
            }
        }

        let data = self.inner.lock().vault.to_bytes()?;
        self.store.save(data).await
    }
}
