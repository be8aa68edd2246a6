// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
mod common;

use common::{eventually, init_tracing, start_peer};
use witness_kernel::{EventId, IgnoreReason, Status};
use witness_node::config::DEFAULT_DB_ADDRESS;
use witness_node::network::LocalBroker;
use witness_node::persistence::MemoryDocumentStore;
use witness_node::{ActionOutcome, NodeError, Peer};

async fn has_confirmations(peer: &Peer, id: EventId, n: u32) -> bool {
    matches!(peer.handle().event(id).await, Ok(Some(entry)) if entry.event.confirmed_by == n)
}

#[tokio::test]
async fn test_rumor_promoted_to_news_across_peers() {
    init_tracing();
    let broker = LocalBroker::new();
    let store = MemoryDocumentStore::new();

    let p1 = start_peer("12D3KooWpeer0001", &broker, &store).await;
    let p2 = start_peer("12D3KooWpeer0002", &broker, &store).await;
    let p3 = start_peer("12D3KooWpeer0003", &broker, &store).await;
    let p4 = start_peer("12D3KooWpeer0004", &broker, &store).await;
    let peers = [&p1, &p2, &p3, &p4];

    let outcome = p1
        .handle()
        .submit_event("Fire on Main St", "Flames on the second floor", "Main St")
        .await
        .unwrap();
    let ActionOutcome::Published(created) = outcome else {
        panic!("submit should publish");
    };
    let id = created.id;
    assert_eq!(id, EventId(1));

    for peer in peers {
        eventually("event replicated", || has_confirmations(peer, id, 0)).await;
    }

    p2.handle().confirm_rumor(id, Some("Fire trucks arriving".into())).await.unwrap();
    eventually("first confirmation reaches p3", || has_confirmations(&p3, id, 1)).await;
    p3.handle().confirm_rumor(id, None).await.unwrap();

    for peer in peers {
        eventually("second confirmation replicated", || has_confirmations(peer, id, 2)).await;
    }
    p4.handle().add_detail(id, "Smoke visible from block 5").await.unwrap();

    for peer in peers {
        eventually("detail replicated", move || async move {
            matches!(peer.handle().event(id).await, Ok(Some(entry)) if entry.event.details.len() == 3)
        })
        .await;
        let entry = peer.handle().event(id).await.unwrap().unwrap();
        assert_eq!(entry.event.confirmed_by, 2);
        assert_eq!(entry.status(), Status::News);
        assert_eq!(
            entry.event.witnesses,
            vec![p2.citizen_id().clone(), p3.citizen_id().clone()]
        );
        assert_eq!(entry.event.details[2], "Smoke visible from block 5");
        assert!(peer.handle().has_news().await.unwrap());
    }

    let hash = p1.handle().state_hash().await.unwrap();
    for peer in peers {
        assert_eq!(peer.handle().state_hash().await.unwrap(), hash);
    }

    // The shared collection holds the latest version.
    assert_eq!(store.len(DEFAULT_DB_ADDRESS).await, 1);

    for peer in [p1, p2, p3, p4] {
        peer.shutdown().await;
    }
}

#[tokio::test]
async fn test_confirmation_rules_enforced_per_peer() {
    let broker = LocalBroker::new();
    let store = MemoryDocumentStore::new();
    let reporter = start_peer("12D3KooWreporter", &broker, &store).await;
    let witness = start_peer("12D3KooWwitness1", &broker, &store).await;

    reporter.handle().submit_event("Bridge closed", "Police tape", "River Rd").await.unwrap();
    let id = EventId(1);
    eventually("event reaches witness", || has_confirmations(&witness, id, 0)).await;

    let own = reporter.handle().confirm_rumor(id, None).await.unwrap();
    assert_eq!(own, ActionOutcome::Ignored(IgnoreReason::SelfConfirmation));

    witness.handle().confirm_rumor(id, None).await.unwrap();
    let again = witness.handle().confirm_rumor(id, None).await.unwrap();
    assert_eq!(again, ActionOutcome::Ignored(IgnoreReason::AlreadyWitness));

    let entry = witness.handle().event(id).await.unwrap().unwrap();
    assert_eq!(entry.event.confirmed_by, 1);
    assert!(entry.flags.witnessed_by_me);
    assert!(!entry.flags.can_confirm());

    let missing = witness.handle().confirm_rumor(EventId(99), None).await;
    assert!(matches!(missing, Err(NodeError::Kernel(_))));

    let duplicate = witness.handle().submit_event("Bridge closed", "again", "River Rd").await.unwrap();
    assert_eq!(duplicate, ActionOutcome::Ignored(IgnoreReason::DuplicateTitle));
}

#[tokio::test]
async fn test_sequential_ids_across_peers() {
    let broker = LocalBroker::new();
    let store = MemoryDocumentStore::new();
    let a = start_peer("12D3KooWalpha001", &broker, &store).await;
    let b = start_peer("12D3KooWbravo002", &broker, &store).await;

    a.handle().submit_event("First", "one", "here").await.unwrap();
    eventually("first event reaches b", || has_confirmations(&b, EventId(1), 0)).await;

    let ActionOutcome::Published(second) = b.handle().submit_event("Second", "two", "there").await.unwrap() else {
        panic!("submit should publish");
    };
    assert_eq!(second.id, EventId(2));

    eventually("second event reaches a", || has_confirmations(&a, EventId(2), 0)).await;
    let rumors = a.handle().rumors().await.unwrap();
    assert_eq!(rumors.len(), 2);
    assert!(a.handle().news().await.unwrap().is_empty());
    assert!(rumors[1].flags.can_confirm());
    assert!(!rumors[0].flags.can_confirm());
}
