use super::*;
use sealnote_api::codec;

pub(crate) async fn share(updater: VaultUpdater, opt: OptAccount) -> SealResult<()> {
    let secrets = Secrets::read(opt.piped.piped, &["\n# password> "]).await?;
    let account = unlock(&updater, &opt.account, &secrets.passwords[0]).await?;
    let card = codec::share_contact(&account).await?;
    println!("{card}");
    Ok(())
}

pub(crate) async fn add(updater: VaultUpdater, opt: OptAddContact) -> SealResult<()> {
    let card: BinData = opt.card.parse()?;

    let secrets = Secrets::read(opt.piped.piped, &["\n# password> "]).await?;
    let mut account = unlock(&updater, &opt.account, &secrets.passwords[0]).await?;

    if account.contacts().iter().any(|c| c.nickname == opt.nickname) {
        return Err(format!("a contact named {:?} already exists", opt.nickname).into());
    }

    let shared = match codec::decode(&account, &card).await? {
        Decoded::SharedContact { contact, .. } => contact,
        _ => return Err("that is not a contact card".into()),
    };

    match account.add_contact(shared, opt.nickname.clone(), opt.note) {
        AddContact::Added(_) => (),
        AddContact::IsSelf => {
            return Err("that is your own contact card".into());
        }
        AddContact::AlreadyKnown(idx) => {
            return Err(format!(
                "already a contact, as {:?}",
                account.contacts()[idx].nickname
            )
            .into());
        }
    }
    updater.update(account).await?;

    println!("# added contact {:?}", opt.nickname);
    Ok(())
}

pub(crate) async fn remove(
    updater: VaultUpdater,
    opt: OptRemoveContact,
) -> SealResult<()> {
    let secrets = Secrets::read(opt.piped.piped, &["\n# password> "]).await?;
    let mut account = unlock(&updater, &opt.account, &secrets.passwords[0]).await?;
    let idx = contact_index(&account, &opt.nickname)?;
    account.remove_contact(idx);
    updater.update(account).await?;

    println!("# removed contact {:?}", opt.nickname);
    Ok(())
}
