//! Version-guarded commits against a live PostgreSQL store.
//!
//! Ignored by default. Run with:
//!   DATABASE_URL=postgres://... cargo test -p dotrack-workflow --test postgres_store -- --ignored

use std::sync::Arc;

use dotrack_core::{Actor, OrderNumber, PartyId, Role, Timestamp, UserId};
use dotrack_state::{evaluate, DeliveryOrder, NewOrder, Operation, OrderStatus};
use dotrack_workflow::{init_pool, PgStore, StoreError, WorkflowEngine, WorkflowStore};
use uuid::Uuid;

async fn store() -> Option<PgStore> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping");
        return None;
    };
    let pool = init_pool(&url, 5).await.unwrap();
    Some(PgStore::new(pool))
}

fn new_order() -> NewOrder {
    NewOrder {
        order_number: OrderNumber::new(format!("DO-PG-{}", Uuid::new_v4().simple())).unwrap(),
        party_id: PartyId::new(),
        authorized_person: "S. Nair".into(),
        valid_from: Timestamp::parse("valid_from", "2026-07-01T00:00:00Z").unwrap(),
        valid_to: Timestamp::parse("valid_to", "2026-07-31T00:00:00Z").unwrap(),
        notes: None,
    }
}

fn admin() -> Actor {
    Actor::new(UserId::new(), Role::Admin)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn concurrent_forwards_commit_once() {
    let Some(store) = store().await else { return };
    let engine = WorkflowEngine::new(Arc::new(store));
    let (first, second) = (admin(), admin());
    let order = engine.create(new_order(), &first).await.unwrap();

    let (a, b) = tokio::join!(
        engine.forward(order.id, OrderStatus::AtAreaOffice, &first, None),
        engine.forward(order.id, OrderStatus::AtAreaOffice, &second, None),
    );
    let results = [a, b];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(
        matches!(loser.kind(), "CONFLICT" | "INVALID_TRANSITION"),
        "unexpected failure {loser:?}"
    );

    let history = engine.history(order.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].to_status, OrderStatus::AtAreaOffice);
    engine.verify_history(order.id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn stale_version_is_rejected_without_history() {
    let Some(store) = store().await else { return };
    let actor = admin();
    let (base, entry) = DeliveryOrder::create(new_order(), &actor, Timestamp::now()).unwrap();
    store.insert_order(&base, &entry).await.unwrap();

    let planned = evaluate(
        &base,
        &[],
        Operation::Forward {
            to: OrderStatus::AtAreaOffice,
        },
        &actor,
    )
    .unwrap();
    let expected = base.version;

    let mut first = base.clone();
    let first_entry = first.apply(&planned, &actor, None, Timestamp::now());
    store
        .commit_transition(&first, expected, &first_entry)
        .await
        .unwrap();

    let mut second = base.clone();
    let second_entry = second.apply(&planned, &actor, Some("late"), Timestamp::now());
    let err = store
        .commit_transition(&second, expected, &second_entry)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::VersionConflict { order_id, expected_version }
            if order_id == base.id && expected_version == expected
    ));

    let history = store.history_for_order(base.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|e| e.note != "late"));
    let reloaded = store.get_order(base.id).await.unwrap().unwrap();
    assert_eq!(reloaded.version, first.version);
}
