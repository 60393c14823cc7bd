use merch_ledger::domain::coins::Balance;
use merch_ledger::domain::ports::LedgerStore;
use merch_ledger::error::{ErrorKind, LedgerError, PartyRole};

mod common;

#[tokio::test]
async fn test_alice_buys_a_cup() {
    let (service, store) = common::seeded_service(&[("alice", 100)]).await;

    let result = service.purchase("alice", "cup").await.unwrap();
    assert_eq!(result.message, "purchase successful");
    assert_eq!(result.balance, Balance::new(80));

    let alice = store.employee_by_username("alice").await.unwrap().unwrap();
    assert_eq!(alice.balance, Balance::new(80));
    let purchases = store.purchases_by(alice.id).await.unwrap();
    assert_eq!(purchases.len(), 1);
    let cup = store.catalog_item_by_name("cup").await.unwrap().unwrap();
    assert_eq!(purchases[0].item_id, cup.id);
}

#[tokio::test]
async fn test_alice_sends_bob_thirty_twice() {
    let (service, store) = common::seeded_service(&[("alice", 100), ("bob", 100)]).await;

    let first = service.transfer("alice", "bob", 30).await.unwrap();
    assert_eq!(
        (first.sender_balance, first.receiver_balance),
        (Balance::new(70), Balance::new(130))
    );
    let second = service.transfer("alice", "bob", 30).await.unwrap();
    assert_eq!(
        (second.sender_balance, second.receiver_balance),
        (Balance::new(40), Balance::new(160))
    );

    let alice = store.employee_by_username("alice").await.unwrap().unwrap();
    let sent = store.transfers_sent_by(alice.id).await.unwrap();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|t| t.amount.value() == 30));
    assert_eq!(common::coins(store.as_ref(), "bob").await, 160);
}

#[tokio::test]
async fn test_poor_alice_cannot_buy() {
    let (service, store) = common::seeded_service(&[("alice", 5)]).await;

    let err = service.purchase("alice", "cup").await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientFunds {
            balance: 5,
            required: 20,
            ..
        }
    ));

    let alice = store.employee_by_username("alice").await.unwrap().unwrap();
    assert_eq!(alice.balance, Balance::new(5));
    assert!(store.purchases_by(alice.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_self_transfer_always_rejected() {
    let (service, store) = common::seeded_service(&[("alice", 100)]).await;

    for amount in [10, 0, -10, 100, 1_000] {
        let err = service.transfer("alice", "alice", amount).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    let alice = store.employee_by_username("alice").await.unwrap().unwrap();
    assert_eq!(alice.balance, Balance::new(100));
    assert!(store.transfers_sent_by(alice.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_insufficient_transfer_changes_nothing() {
    let (service, store) = common::seeded_service(&[("alice", 10), ("bob", 10)]).await;

    let err = service.transfer("alice", "bob", 11).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);

    assert_eq!(common::coins(store.as_ref(), "alice").await, 10);
    assert_eq!(common::coins(store.as_ref(), "bob").await, 10);
    let bob = store.employee_by_username("bob").await.unwrap().unwrap();
    assert!(store.transfers_received_by(bob.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_transfer_to_unknown_receiver() {
    let (service, store) = common::seeded_service(&[("alice", 100)]).await;

    let err = service.transfer("alice", "zoe", 10).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::EmployeeNotFound {
            role: PartyRole::Receiver,
            ref username,
        } if username == "zoe"
    ));
    assert_eq!(common::coins(store.as_ref(), "alice").await, 100);
}

#[tokio::test]
async fn test_balance_matches_ledger_history() {
    let (service, store) =
        common::seeded_service(&[("alice", 1000), ("bob", 1000), ("carol", 1000)]).await;

    service.purchase("alice", "hoody").await.unwrap();
    service.purchase("alice", "pen").await.unwrap();
    service.transfer("alice", "bob", 120).await.unwrap();
    service.transfer("carol", "alice", 45).await.unwrap();
    service.transfer("bob", "alice", 3).await.unwrap();
    let _ = service.purchase("alice", "nonexistent").await;
    let _ = service.transfer("alice", "bob", 10_000).await;

    let alice = store.employee_by_username("alice").await.unwrap().unwrap();
    let mut derived: i64 = 1000;
    for purchase in store.purchases_by(alice.id).await.unwrap() {
        let item = store.catalog_item_by_id(purchase.item_id).await.unwrap().unwrap();
        derived -= item.price.value() as i64;
    }
    for sent in store.transfers_sent_by(alice.id).await.unwrap() {
        derived -= sent.amount.value() as i64;
    }
    for received in store.transfers_received_by(alice.id).await.unwrap() {
        derived += received.amount.value() as i64;
    }

    assert_eq!(derived, 1000 - 300 - 10 - 120 + 45 + 3);
    assert_eq!(alice.balance.coins() as i64, derived);
}

#[tokio::test]
async fn test_activity_counts_match_history() {
    let (service, _) = common::seeded_service(&[("alice", 1000), ("bob", 1000)]).await;

    for item in ["cup", "cup", "socks", "book", "cup"] {
        service.purchase("alice", item).await.unwrap();
    }
    for amount in [1, 2, 3] {
        service.transfer("alice", "bob", amount).await.unwrap();
    }
    service.transfer("bob", "alice", 50).await.unwrap();

    let activity = service.activity("alice").await.unwrap();
    assert_eq!(activity.items_owned(), 5);
    assert_eq!(activity.inventory.len(), 3);
    assert_eq!(activity.coin_history.sent.len(), 3);
    assert_eq!(activity.coin_history.received.len(), 1);

    let amounts: Vec<u64> = activity.coin_history.sent.iter().map(|s| s.amount).collect();
    assert_eq!(amounts, vec![1, 2, 3]);

    let bob = service.activity("bob").await.unwrap();
    assert_eq!(bob.coin_history.received.len(), 3);
    assert_eq!(bob.coin_history.received[0].from_user, "alice");
    assert_eq!(bob.coin_history.sent[0].to_user, "alice");
}
