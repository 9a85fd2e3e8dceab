use super::*;

pub(crate) async fn create(
    updater: VaultUpdater,
    opt: OptAccount,
) -> SealResult<()> {
    if updater.vault().find(&opt.account).is_some() {
        return Err(format!("an account named {:?} already exists", opt.account).into());
    }

    let secrets = if opt.piped.piped {
        Secrets::read(true, &["password"]).await?
    } else {
        let secrets = Secrets::read(
            false,
            &["\n# new account password> ", "\n# confirm password> "],
        )
        .await?;
        if secrets.passwords[0] != secrets.passwords[1] {
            return Err("passwords do not match".into());
        }
        secrets
    };

    println!("\n# sealnote generating account keys...");
    let account =
        UnlockedAccount::create(&opt.account, &secrets.passwords[0]).await?;
    updater.add(account).await?;

    println!("\n# sealnote created account {:?}", opt.account);
    Ok(())
}

pub(crate) async fn list(updater: VaultUpdater) -> SealResult<()> {
    let vault = updater.vault();
    println!("# accounts");
    for account in vault.accounts() {
        println!("{}", account.name());
    }
    if !vault.bin().is_empty() {
        println!("# bin");
        for account in vault.bin() {
            println!("{}", account.name());
        }
    }
    Ok(())
}

pub(crate) async fn delete(updater: VaultUpdater, name: String) -> SealResult<()> {
    let moved = updater
        .modify(|vault| match vault.find(&name) {
            Some(idx) => vault.move_to_bin(idx),
            None => false,
        })
        .await?;
    if !moved {
        return Err(format!("no account named {name:?}").into());
    }
    println!("# moved {name:?} to the bin");
    Ok(())
}

pub(crate) async fn restore(updater: VaultUpdater, name: String) -> SealResult<()> {
    let restored = updater
        .modify(|vault| match vault.find_in_bin(&name) {
            Some(idx) => vault.restore(idx),
            None => false,
        })
        .await?;
    if !restored {
        return Err(format!("no account named {name:?} in the bin").into());
    }
    println!("# restored {name:?}");
    Ok(())
}

pub(crate) async fn passwd(updater: VaultUpdater, opt: OptAccount) -> SealResult<()> {
    let secrets = Secrets::read(
        opt.piped.piped,
        &["\n# current password> ", "\n# new password> "],
    )
    .await?;
    let mut account = unlock(&updater, &opt.account, &secrets.passwords[0]).await?;
    account.change_password(&secrets.passwords[1]).await?;
    updater.update(account).await?;

    println!("# password changed for {:?}", opt.account);
    Ok(())
}
