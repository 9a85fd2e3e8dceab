//! Encoding and decoding of the three exchanged formats:
//! encrypted messages, signed messages, and contact cards.
//!
//! Encrypted messages carry no recipient field. Decoding works out who
//! a message was for by trying the keys the account knows about.

use crate::account::*;
use crate::aead::{self, AeadIv};
use crate::keys::StoredPublicKey;
use crate::message::Message;
use crate::wire::{CodecReader, CodecWriter, LenWidth};
use crate::*;

const TAG_ENCRYPTED: u8 = 0;
const TAG_SIGNED: u8 = 1;
const TAG_CONTACT_CARD: u8 = 2;

/// The outcome of [decode].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// We sent this, but to nobody we still know.
    SentToUnknownRecipient,

    /// We sent this, to `recipient` ([Peer::Me] for a note to self).
    Sent {
        /// Who it was encrypted for.
        recipient: Peer,

        /// The decrypted message.
        message: Message,
    },

    /// Someone else sent this. `message` is `None` if it was not
    /// addressed to us (or could not be authenticated).
    Received {
        /// The nominal sender.
        sender: Peer,

        /// The decrypted message, if readable.
        message: Option<Message>,
    },

    /// A signed plaintext message. The message is returned even if
    /// `verified` is false, as best-effort text if the body no longer
    /// decodes.
    Signed {
        /// The claimed signer.
        sender: Peer,

        /// The signed message.
        message: Message,

        /// Whether the signature verified.
        verified: bool,
    },

    /// A contact card.
    SharedContact {
        /// The verified card.
        contact: SharedContact,

        /// How the card resolves against this account.
        sender: Peer,
    },
}

/// Encrypt `message` for `recipient`, or for ourselves if `None`.
pub async fn encrypt(
    me: &UnlockedAccount,
    recipient: Option<&Contact>,
    message: &Message,
) -> SealResult<BinData> {
    let dh = match recipient {
        Some(contact) => contact.shared.dh(),
        None => &me.dh().public,
    };
    let key = me.dh().private.agree(dh).ok_or_else(|| {
        SealError::format("recipient key agreement key is on another curve")
    })?;

    let sender = me.shared_contact()?.to_bytes()?;
    let body = zeroize::Zeroizing::new(message.to_body()?);
    let (iv, ciphertext) = aead::encrypt(&key, &body, &sender)?;

    let mut writer = CodecWriter::with_capacity(
        1 + sender.len() + 1 + iv.as_ref().len() + 4 + ciphertext.len(),
    );
    writer.write_u8(TAG_ENCRYPTED)?;
    writer.write_bytes(&sender)?;
    writer.write_len_bytes(LenWidth::U8, iv.as_ref())?;
    writer.write_len_bytes(LenWidth::U32, &ciphertext)?;
    Ok(writer.into_bin_data())
}

/// Sign `message` in the clear.
pub async fn sign(me: &UnlockedAccount, message: &Message) -> SealResult<BinData> {
    let sender = me.shared_contact()?;
    let body = message.to_body()?;
    let signature = me.dsa_private().sign(sender.hash(), &body)?;

    let mut writer = CodecWriter::new();
    writer.write_u8(TAG_SIGNED)?;
    sender.write(&mut writer)?;
    writer.write_len_bytes(LenWidth::U16, &signature)?;
    writer.write_bytes(&body)?;
    Ok(writer.into_bin_data())
}

/// Produce a contact card for `me`.
pub async fn share_contact(me: &UnlockedAccount) -> SealResult<BinData> {
    let mut writer = CodecWriter::new();
    writer.write_u8(TAG_CONTACT_CARD)?;
    me.shared_contact()?.write(&mut writer)?;
    Ok(writer.into_bin_data())
}

/// Decode any of the exchanged formats from the point of view of `me`.
///
/// Structurally invalid bytes are errors. A bad signature or a message
/// addressed to someone else is not, and is reported in the result.
pub async fn decode(me: &UnlockedAccount, data: &[u8]) -> SealResult<Decoded> {
    let mut reader = CodecReader::new(data);
    match reader.read_u8()? {
        TAG_CONTACT_CARD => {
            let contact = SharedContact::parse(&mut reader)?;
            reader.expect_end("contact card")?;
            let sender = me.resolve(&contact);
            Ok(Decoded::SharedContact { contact, sender })
        }
        TAG_SIGNED => {
            let sender = SharedContact::parse(&mut reader)?;
            let signature = reader.read_len_bytes(LenWidth::U16)?;
            let body = reader.read_remaining();
            let verified = sender.dsa().verify(sender.hash(), body, signature);
            // a body that fails verification is never an error
            let message = match Message::from_body(body) {
                Ok(message) => message,
                Err(err) if verified => return Err(err),
                Err(_) => Message::from_body_lossy(body),
            };
            tracing::trace!(%verified, "decoded signed message");
            Ok(Decoded::Signed {
                sender: me.resolve(&sender),
                message,
                verified,
            })
        }
        TAG_ENCRYPTED => decode_encrypted(me, &mut reader),
        oth => Err(SealError::outdated(format!("message format tag {oth}"))),
    }
}

fn decode_encrypted(
    me: &UnlockedAccount,
    reader: &mut CodecReader<'_>,
) -> SealResult<Decoded> {
    let start = reader.position();
    let sender = SharedContact::parse(reader)?;
    let sender_bytes = reader.slice(start, reader.position())?;
    let iv = AeadIv::try_from(reader.read_len_bytes(LenWidth::U8)?)?;
    let ciphertext = reader.read_len_bytes(LenWidth::U32)?;
    reader.expect_end("encrypted message")?;

    let open = |dh: &StoredPublicKey| -> Option<zeroize::Zeroizing<Vec<u8>>> {
        let key = me.dh().private.agree(dh)?;
        aead::decrypt(&key, &iv, ciphertext, sender_bytes)
    };

    let from_me = me.is_account(&sender);

    if let Some(body) = open(sender.dh()) {
        let message = Message::from_body(&body)?;
        if from_me {
            tracing::trace!("decoded note to self");
            return Ok(Decoded::Sent {
                recipient: Peer::Me,
                message,
            });
        }
        tracing::trace!("decoded received message");
        return Ok(Decoded::Received {
            sender: me.resolve(&sender),
            message: Some(message),
        });
    }

    if !from_me {
        tracing::trace!("received message is not readable by this account");
        return Ok(Decoded::Received {
            sender: me.resolve(&sender),
            message: None,
        });
    }

    // we sent this to someone else, find out who
    for contact in me.contacts() {
        if let Some(body) = open(contact.shared.dh()) {
            tracing::trace!(nickname = %contact.nickname, "decoded sent message");
            return Ok(Decoded::Sent {
                recipient: Peer::Contact(contact.clone()),
                message: Message::from_body(&body)?,
            });
        }
    }

    tracing::trace!("sent message recipient is no longer a contact");
    Ok(Decoded::SentToUnknownRecipient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn pair() -> (UnlockedAccount, UnlockedAccount) {
        let mut alice = UnlockedAccount::create("alice", "a").await.unwrap();
        let mut bob = UnlockedAccount::create("bob", "b").await.unwrap();
        alice.add_contact(bob.shared_contact().unwrap(), "bob".into(), "".into());
        bob.add_contact(alice.shared_contact().unwrap(), "alice".into(), "".into());
        (alice, bob)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn encrypted_message_resolves_both_ways() {
        let (mut alice, bob) = pair().await;
        let msg = Message::Text("hello bob".into());
        let wire = encrypt(&alice, Some(&alice.contacts()[0]), &msg)
            .await
            .unwrap();

        match decode(&bob, &wire).await.unwrap() {
            Decoded::Received {
                sender: Peer::Contact(c),
                message,
            } => {
                assert_eq!("alice", c.nickname);
                assert_eq!(Some(msg.clone()), message);
            }
            oth => panic!("unexpected {oth:?}"),
        }

        match decode(&alice, &wire).await.unwrap() {
            Decoded::Sent {
                recipient: Peer::Contact(c),
                message,
            } => {
                assert_eq!("bob", c.nickname);
                assert_eq!(msg, message);
            }
            oth => panic!("unexpected {oth:?}"),
        }

        alice.remove_contact(0).unwrap();
        assert_eq!(
            Decoded::SentToUnknownRecipient,
            decode(&alice, &wire).await.unwrap()
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn note_to_self() {
        let (alice, bob) = pair().await;
        let msg = Message::Text("remember the milk".into());
        let wire = encrypt(&alice, None, &msg).await.unwrap();
        assert_eq!(
            Decoded::Sent {
                recipient: Peer::Me,
                message: msg,
            },
            decode(&alice, &wire).await.unwrap()
        );

        match decode(&bob, &wire).await.unwrap() {
            Decoded::Received {
                sender: Peer::Contact(_),
                message: None,
            } => (),
            oth => panic!("unexpected {oth:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_sender_is_reported() {
        let (alice, _bob) = pair().await;
        let carol = UnlockedAccount::create("carol", "c").await.unwrap();
        let wire = encrypt(&alice, None, &Message::Text("x".into()))
            .await
            .unwrap();
        match decode(&carol, &wire).await.unwrap() {
            Decoded::Received {
                sender: Peer::Unknown(shared),
                message: None,
            } => assert!(alice.is_account(&shared)),
            oth => panic!("unexpected {oth:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tampered_ciphertext_is_unreadable_not_an_error() {
        let (alice, bob) = pair().await;
        let wire = encrypt(&alice, Some(&alice.contacts()[0]), &Message::Text("x".into()))
            .await
            .unwrap();
        let mut bad = wire.to_vec();
        let last = bad.len() - 1;
        bad[last] ^= 0x01;
        assert!(matches!(
            decode(&bob, &bad).await.unwrap(),
            Decoded::Received { message: None, .. }
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn signed_message_verification() {
        let (alice, bob) = pair().await;
        let msg = Message::Text("signed text".into());
        let wire = sign(&alice, &msg).await.unwrap();

        match decode(&bob, &wire).await.unwrap() {
            Decoded::Signed {
                sender: Peer::Contact(c),
                message,
                verified: true,
            } => {
                assert_eq!("alice", c.nickname);
                assert_eq!(msg, message);
            }
            oth => panic!("unexpected {oth:?}"),
        }

        let mut bad = wire.to_vec();
        let last = bad.len() - 1;
        bad[last] ^= 0x01;
        match decode(&alice, &bad).await.unwrap() {
            Decoded::Signed {
                sender: Peer::Me,
                message: Message::Text(text),
                verified: false,
            } => assert_eq!("signed texu", text),
            oth => panic!("unexpected {oth:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn contact_card_decoding() {
        let (alice, bob) = pair().await;
        let card = share_contact(&alice).await.unwrap();

        match decode(&bob, &card).await.unwrap() {
            Decoded::SharedContact {
                contact,
                sender: Peer::Contact(_),
            } => assert!(alice.is_account(&contact)),
            oth => panic!("unexpected {oth:?}"),
        }
        assert!(matches!(
            decode(&alice, &card).await.unwrap(),
            Decoded::SharedContact {
                sender: Peer::Me,
                ..
            }
        ));

        let mut trailing = card.to_vec();
        trailing.push(0);
        assert!(matches!(
            decode(&bob, &trailing).await,
            Err(SealError::Format(_))
        ));

        let mut forged = card.to_vec();
        let last = forged.len() - 1;
        forged[last] ^= 0x01;
        assert!(matches!(
            decode(&bob, &forged).await,
            Err(SealError::Format(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn structural_errors() {
        let (alice, _bob) = pair().await;
        assert!(matches!(
            decode(&alice, &[3]).await,
            Err(SealError::OutdatedVersion(_))
        ));
        assert!(matches!(
            decode(&alice, &[]).await,
            Err(SealError::Format(_))
        ));

        let wire = encrypt(&alice, None, &Message::Text("x".into()))
            .await
            .unwrap();
        let mut trailing = wire.to_vec();
        trailing.push(0);
        assert!(matches!(
            decode(&alice, &trailing).await,
            Err(SealError::Format(_))
        ));
        assert!(matches!(
            decode(&alice, &wire[..wire.len() - 3]).await,
            Err(SealError::Format(_))
        ));
    }
}
