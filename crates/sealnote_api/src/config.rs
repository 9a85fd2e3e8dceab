//! Sealnote configuration types.

use crate::*;
use std::path::{Path, PathBuf};

/// File name of the config file inside the root directory.
pub const CONFIG_FILE: &str = "sealnote-config.yaml";

/// Default vault file name, relative to the root directory.
pub const DEFAULT_VAULT_FILE: &str = "sealnote-vault.b64";

fn is_false(b: impl std::borrow::Borrow<bool>) -> bool {
    !b.borrow()
}

/// Sealnote configuration, stored as yaml.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealConfig {
    /// Where the vault blob lives. Relative paths are taken relative to
    /// the root directory.
    pub vault_file: PathBuf,

    /// Open the vault read-only, refusing every save.
    #[serde(skip_serializing_if = "is_false", default)]
    pub disabled: bool,
}

impl Default for SealConfig {
    fn default() -> Self {
        Self {
            vault_file: DEFAULT_VAULT_FILE.into(),
            disabled: false,
        }
    }
}

impl SealConfig {
    /// Decode yaml config bytes.
    pub fn from_bytes(bytes: &[u8]) -> SealResult<Self> {
        serde_yaml::from_slice(bytes)
            .map_err(|e| SealError::format(format!("bad config: {e}")))
    }

    /// Encode as yaml, with a short commented header.
    pub fn to_bytes(&self) -> SealResult<Vec<u8>> {
        let yaml = serde_yaml::to_string(self).map_err(SealError::other)?;
        let mut out = String::from(
            "# sealnote configuration\n\
             # vaultFile: path of the vault blob, relative to this directory\n\
             # disabled: open the vault read-only\n",
        );
        out.push_str(&yaml);
        Ok(out.into_bytes())
    }

    /// Resolve the vault file against `root`.
    pub fn vault_path(&self, root: &Path) -> PathBuf {
        if self.vault_file.is_absolute() {
            self.vault_file.clone()
        } else {
            root.join(&self.vault_file)
        }
    }
}
