use super::*;
use sealnote_api::codec;

pub(crate) async fn encrypt(updater: VaultUpdater, opt: OptEncrypt) -> SealResult<()> {
    let secrets = Secrets::read(opt.piped.piped, &["\n# password> "]).await?;
    let account = unlock(&updater, &opt.account, &secrets.passwords[0]).await?;
    let recipient = match &opt.to {
        Some(nickname) => Some(contact_index(&account, nickname)?),
        None => None,
    };

    let message = Message::Text(secrets.message().await?);
    let recipient = recipient.map(|idx| &account.contacts()[idx]);
    let sealed = codec::encrypt(&account, recipient, &message).await?;
    println!("{sealed}");
    Ok(())
}

pub(crate) async fn sign(updater: VaultUpdater, opt: OptAccount) -> SealResult<()> {
    let secrets = Secrets::read(opt.piped.piped, &["\n# password> "]).await?;
    let account = unlock(&updater, &opt.account, &secrets.passwords[0]).await?;

    let message = Message::Text(secrets.message().await?);
    let signed = codec::sign(&account, &message).await?;
    println!("{signed}");
    Ok(())
}

fn print_message(message: &Message) {
    match message {
        Message::Text(text) => println!("{text}"),
    }
}

pub(crate) async fn decode(updater: VaultUpdater, opt: OptDecode) -> SealResult<()> {
    let data: BinData = opt.data.parse()?;

    let secrets = Secrets::read(opt.piped.piped, &["\n# password> "]).await?;
    let account = unlock(&updater, &opt.account, &secrets.passwords[0]).await?;

    match codec::decode(&account, &data).await? {
        Decoded::SentToUnknownRecipient => {
            println!("# sent by you, to someone no longer in your contacts");
        }
        Decoded::Sent { recipient, message } => {
            println!("# sent by you, to {}", describe_peer(&recipient));
            print_message(&message);
        }
        Decoded::Received { sender, message } => match message {
            Some(message) => {
                println!("# from {}", describe_peer(&sender));
                print_message(&message);
            }
            None => {
                println!(
                    "# from {}, but not readable by this account",
                    describe_peer(&sender)
                );
            }
        },
        Decoded::Signed {
            sender,
            message,
            verified,
        } => {
            if verified {
                println!("# signed by {}", describe_peer(&sender));
            } else {
                println!(
                    "# claims to be signed by {}, but the signature is INVALID",
                    describe_peer(&sender)
                );
            }
            print_message(&message);
        }
        Decoded::SharedContact { sender, .. } => {
            println!("# contact card for {}", describe_peer(&sender));
        }
    }
    Ok(())
}
