use super::*;

pub(crate) async fn exec(root: PathBuf) -> SealResult<()> {
    let config = sealnote::init_root(&root).await?;

    println!("\n# sealnote init config:\n{:?}", root.join(sealnote_api::config::CONFIG_FILE));
    println!("\n# sealnote init vault:\n{:?}", config.vault_path(&root));

    Ok(())
}
