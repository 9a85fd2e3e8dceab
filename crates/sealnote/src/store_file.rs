//! Vault store backed by a single base64 text file.

use futures::future::{BoxFuture, FutureExt};
use sealnote_api::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

/// Create a VaultStore keeping the vault blob as url-safe base64 text
/// in the file at `path`. A disabled store still loads, but refuses saves.
pub fn create_file_store(path: PathBuf, disabled: bool) -> VaultStore {
    VaultStore(Arc::new(PrivFileStore {
        path: Arc::new(path),
        disabled,
    }))
}

// -- private -- //

struct PrivFileStore {
    path: Arc<PathBuf>,
    disabled: bool,
}

impl AsVaultStore for PrivFileStore {
    fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn load(&self) -> BoxFuture<'static, SealResult<Option<BinData>>> {
        load_file(self.path.clone()).boxed()
    }

    fn save(&self, data: BinData) -> BoxFuture<'static, SealResult<()>> {
        save_file(self.path.clone(), data).boxed()
    }
}

async fn load_file(path: Arc<PathBuf>) -> SealResult<Option<BinData>> {
    let text = match tokio::fs::read_to_string(&*path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(?path, "no vault file yet");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    if text.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(text.parse()?))
}

async fn save_file(path: Arc<PathBuf>, data: BinData) -> SealResult<()> {
    use tokio::io::AsyncWriteExt;

    // a crash mid-write must leave the previous vault intact
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(data.to_string().as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp, &*path).await?;
    tracing::trace!(?path, bytes = data.len(), "wrote vault file");
    Ok(())
}
