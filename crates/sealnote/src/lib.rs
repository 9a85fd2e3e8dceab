#![deny(missing_docs)]
//! File backed storage for the sealnote vault, and the setup helpers
//! used by the `sealnote` command line tool.

use sealnote_api::config::CONFIG_FILE;
use sealnote_api::prelude::*;
use std::path::Path;

/// Re-exported dependencies.
pub mod dependencies {
    pub use sealnote_api;
    pub use sealnote_api::dependencies::*;
}

pub mod store_file;
pub use store_file::create_file_store;

/// Write a default config and an empty vault into `root`, creating the
/// directory if needed. Refuses to overwrite an existing config.
pub async fn init_root(root: &Path) -> SealResult<SealConfig> {
    use tokio::io::AsyncWriteExt;

    tokio::fs::DirBuilder::new()
        .recursive(true)
        .create(root)
        .await?;

    let config_path = root.join(CONFIG_FILE);
    if tokio::fs::metadata(&config_path).await.is_ok() {
        return Err(format!(
            "{config_path:?} already exists - refusing to overwrite existing config"
        )
        .into());
    }

    let config = SealConfig::default();

    let mut config_f = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&config_path)
        .await?;
    config_f.write_all(&config.to_bytes()?).await?;
    config_f.shutdown().await?;
    drop(config_f);

    let store = create_file_store(config.vault_path(root), false);
    if store.load().await?.is_none() {
        store.save_vault(&Vault::new()).await?;
    }

    tracing::info!(?root, "initialized sealnote root");
    Ok(config)
}

/// Read the config in `root` and load its vault.
pub async fn open_root(root: &Path) -> SealResult<(SealConfig, VaultUpdater)> {
    let config_path = root.join(CONFIG_FILE);
    let bytes = match tokio::fs::read(&config_path).await {
        Err(e) => {
            return Err(format!(
                "Could not read config file {config_path:?}, did you run 'sealnote init'? - {e}",
            )
            .into());
        }
        Ok(b) => b,
    };
    let config = SealConfig::from_bytes(&bytes)?;

    let store = create_file_store(config.vault_path(root), config.disabled);
    let updater = VaultUpdater::load(store).await?;
    Ok((config, updater))
}
