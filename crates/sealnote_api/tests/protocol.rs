use sealnote_api::codec;
use sealnote_api::mem_store::create_mem_store;
use sealnote_api::prelude::*;
use std::sync::Once;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env(),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

async fn befriend(
    a: &mut UnlockedAccount,
    b: &mut UnlockedAccount,
) -> (usize, usize) {
    let a_card = codec::share_contact(a).await.unwrap();
    let b_card = codec::share_contact(b).await.unwrap();

    let a_shared = match codec::decode(b, &a_card).await.unwrap() {
        Decoded::SharedContact {
            contact,
            sender: Peer::Unknown(_),
        } => contact,
        oth => panic!("unexpected {oth:?}"),
    };
    let b_shared = match codec::decode(a, &b_card).await.unwrap() {
        Decoded::SharedContact { contact, .. } => contact,
        oth => panic!("unexpected {oth:?}"),
    };

    let in_a = match a.add_contact(b_shared, b.name().into(), String::new()) {
        AddContact::Added(idx) => idx,
        oth => panic!("unexpected {oth:?}"),
    };
    let in_b = match b.add_contact(a_shared, a.name().into(), String::new()) {
        AddContact::Added(idx) => idx,
        oth => panic!("unexpected {oth:?}"),
    };
    (in_a, in_b)
}

#[tokio::test(flavor = "multi_thread")]
async fn full_exchange_survives_lock_and_persist() {
    init_tracing();

    let mut alice = UnlockedAccount::create("alice", "alice pw").await.unwrap();
    let mut bob = UnlockedAccount::create("bob", "bob pw").await.unwrap();
    let (bob_idx, _) = befriend(&mut alice, &mut bob).await;
    alice.contact_mut(bob_idx).unwrap().note = "met at the conference".into();

    // persist both through the updater and read them back
    let store = create_mem_store();
    let updater = VaultUpdater::load(store.clone()).await.unwrap();
    updater.add(alice.clone()).await.unwrap();
    updater.add(bob.clone()).await.unwrap();

    let vault = store.load_vault().await.unwrap();
    assert_eq!(2, vault.accounts().len());
    let alice2 = vault.accounts()[vault.find("alice").unwrap()]
        .unlock("alice pw")
        .await
        .unwrap();
    let bob2 = vault.accounts()[vault.find("bob").unwrap()]
        .unlock("bob pw")
        .await
        .unwrap();

    assert_eq!(alice.public(), alice2.public());
    assert_eq!(alice.contacts(), alice2.contacts());
    assert_eq!("met at the conference", alice2.contacts()[0].note);

    // keys survived: a message from the old alice reads with the new bob
    let text = "the quick brown fox ".repeat(5);
    let msg = Message::Text(text.clone());
    let wire = codec::encrypt(&alice, Some(&alice.contacts()[bob_idx]), &msg)
        .await
        .unwrap();

    match codec::decode(&bob2, &wire).await.unwrap() {
        Decoded::Received {
            sender: Peer::Contact(c),
            message: Some(Message::Text(got)),
        } => {
            assert_eq!("alice", c.nickname);
            assert_eq!(text, got);
        }
        oth => panic!("unexpected {oth:?}"),
    }

    match codec::decode(&alice2, &wire).await.unwrap() {
        Decoded::Sent {
            recipient: Peer::Contact(c),
            message,
        } => {
            assert_eq!("bob", c.nickname);
            assert_eq!(msg, message);
        }
        oth => panic!("unexpected {oth:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn sender_sees_unknown_recipient_after_removing_contact() {
    init_tracing();

    let mut alice = UnlockedAccount::create("alice", "a").await.unwrap();
    let mut bob = UnlockedAccount::create("bob", "b").await.unwrap();
    let mut carol = UnlockedAccount::create("carol", "c").await.unwrap();
    befriend(&mut alice, &mut bob).await;
    let (carol_idx, _) = befriend(&mut alice, &mut carol).await;

    let wire = codec::encrypt(
        &alice,
        Some(&alice.contacts()[carol_idx]),
        &Message::Text("for carol".into()),
    )
    .await
    .unwrap();

    match codec::decode(&alice, &wire).await.unwrap() {
        Decoded::Sent {
            recipient: Peer::Contact(c),
            ..
        } => assert_eq!("carol", c.nickname),
        oth => panic!("unexpected {oth:?}"),
    }

    // bob is a contact of alice, but the message was not for him
    assert!(matches!(
        codec::decode(&bob, &wire).await.unwrap(),
        Decoded::Received {
            sender: Peer::Contact(_),
            message: None,
        }
    ));

    alice.remove_contact(carol_idx).unwrap();
    assert_eq!(
        Decoded::SentToUnknownRecipient,
        codec::decode(&alice, &wire).await.unwrap()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn locked_account_byte_flips_are_tampering() {
    init_tracing();

    let acct = UnlockedAccount::create("alice", "pw").await.unwrap();
    let raw = acct.lock().await.unwrap().to_bytes().unwrap().to_vec();

    // version + len1(salt 64) + u32 + u8 + len1(hash 32), then len1(iv)
    let iv_at = 1 + 1 + 64 + 4 + 1 + 1 + 32 + 1;
    // u8 version + len2 name + 33 byte P-256 key
    let public_len = 1 + 2 + "alice".len() + 33;
    let public_at = raw.len() - public_len;

    for at in [iv_at, iv_at + 11, public_at - 1, public_at - 20, public_at + 3]
    {
        let mut bad = raw.clone();
        bad[at] ^= 0x01;
        let locked = LockedAccount::from_bytes(&bad).unwrap();
        assert!(
            matches!(locked.unlock("pw").await, Err(SealError::TamperedData)),
            "flip at {at} was not detected",
        );
    }

    let locked = LockedAccount::from_bytes(&raw).unwrap();
    assert!(matches!(
        locked.unlock("Pw").await,
        Err(SealError::IncorrectPassword)
    ));
    locked.unlock("pw").await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn signed_messages_report_verification() {
    init_tracing();

    let alice = UnlockedAccount::create("alice", "a").await.unwrap();
    let carol = UnlockedAccount::create("carol", "c").await.unwrap();
    let text = "x".repeat(80);
    let wire = codec::sign(&alice, &Message::Text(text.clone()))
        .await
        .unwrap();

    match codec::decode(&carol, &wire).await.unwrap() {
        Decoded::Signed {
            sender: Peer::Unknown(shared),
            message: Message::Text(got),
            verified: true,
        } => {
            assert!(alice.is_account(&shared));
            assert_eq!(text, got);
        }
        oth => panic!("unexpected {oth:?}"),
    }

    // flip a byte inside the (raw, uncompressed) body of a short message
    let wire = codec::sign(&alice, &Message::Text("pay bob 10".into()))
        .await
        .unwrap();
    let mut bad = wire.to_vec();
    let last = bad.len() - 1;
    bad[last] = b'9';
    match codec::decode(&carol, &bad).await.unwrap() {
        Decoded::Signed {
            message: Message::Text(got),
            verified: false,
            ..
        } => assert_eq!("pay bob 19", got),
        oth => panic!("unexpected {oth:?}"),
    }

    // breaking the utf-8 of a raw body still decodes
    let mut bad = wire.to_vec();
    bad[last] ^= 0x80;
    assert!(matches!(
        codec::decode(&carol, &bad).await.unwrap(),
        Decoded::Signed {
            verified: false,
            ..
        }
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn every_flipped_byte_of_a_compressed_signed_body_fails_verification() {
    init_tracing();

    let alice = UnlockedAccount::create("alice", "a").await.unwrap();
    let bob = UnlockedAccount::create("bob", "b").await.unwrap();

    let message = Message::Text("hello world, ".repeat(10));
    let body = message.to_body().unwrap();
    assert_eq!(1, body[0], "expected a compressed body");

    let wire = codec::sign(&alice, &message).await.unwrap();
    let body_at = wire.len() - body.len();
    assert_eq!(&body[..], &wire[body_at..]);

    for i in body_at..wire.len() {
        let mut bad = wire.to_vec();
        bad[i] ^= 0xc5;
        match codec::decode(&bob, &bad).await {
            Ok(Decoded::Signed {
                sender: Peer::Unknown(_),
                verified: false,
                ..
            }) => (),
            oth => panic!("byte {i}: unexpected {oth:?}"),
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn contact_card_export_import() {
    init_tracing();

    let alice = UnlockedAccount::create("alice", "a").await.unwrap();
    let mut bob = UnlockedAccount::create("bob", "b").await.unwrap();

    // cards travel as text
    let text = codec::share_contact(&alice).await.unwrap().to_string();
    let card: BinData = text.parse().unwrap();

    let shared = match codec::decode(&bob, &card).await.unwrap() {
        Decoded::SharedContact { contact, .. } => contact,
        oth => panic!("unexpected {oth:?}"),
    };
    assert_eq!(
        AddContact::Added(0),
        bob.add_contact(shared.clone(), "al".into(), String::new())
    );
    assert_eq!(
        AddContact::AlreadyKnown(0),
        bob.add_contact(shared, "al".into(), String::new())
    );

    // dh key signature byte flipped
    let mut forged = card.to_vec();
    let last = forged.len() - 5;
    forged[last] ^= 0x40;
    assert!(matches!(
        codec::decode(&bob, &forged).await,
        Err(SealError::Format(_))
    ));
}
