// ============================================================================
// PASS STORE TESTS - issuance and redemption against a live Postgres
// ============================================================================
//
// These tests need a database; set DATABASE_URL and run with
// `cargo test -- --ignored`.

use chrono::{DateTime, Utc};
use epass_rust_ws::db;
use epass_rust_ws::domains::passes::models::{
    IssuePassRequest, Pass, PassError, PassKind, PaymentMode, RedeemOutcome, Redemption,
};
use epass_rust_ws::domains::passes::store::PassStore;
use epass_rust_ws::domains::passes::token::PassTokenCodec;
use sqlx::PgPool;
use uuid::Uuid;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

async fn setup_store() -> (PassStore, PgPool) {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = db::create_pg_pool(&database_url)
        .await
        .expect("Failed to connect to test database");
    db::init_schema(&pool).await.expect("Failed to init schema");
    (PassStore::new(pool.clone()), pool)
}

/// Unique holder per test run so the (name1, phone1) constraint never
/// collides across runs.
fn unique_holder(label: &str) -> (String, String) {
    let nonce = Uuid::new_v4();
    let name = format!("{} {}", label, nonce);
    let phone = format!("9{:09}", nonce.as_u128() % 1_000_000_000);
    (name, phone)
}

fn single_request(name: &str, phone: &str) -> IssuePassRequest {
    IssuePassRequest {
        name1: name.to_string(),
        phone1: phone.to_string(),
        name2: None,
        phone2: None,
        pass_type: PassKind::Single,
        payment_mode: PaymentMode::Cash,
        txn_info: None,
        timing: "7pm".to_string(),
    }
}

async fn cleanup_pass(pool: &PgPool, pass_id: Uuid) {
    let _ = sqlx::query("DELETE FROM passes WHERE pass_id = $1")
        .bind(pass_id)
        .execute(pool)
        .await;
}

// ============================================================================
// ISSUANCE
// ============================================================================

#[tokio::test]
#[ignore]
async fn issue_single_pass_sets_derived_fields() {
    let (store, pool) = setup_store().await;
    let (name, phone) = unique_holder("Issue Single");

    let pass = store
        .create(single_request(&name, &phone))
        .await
        .expect("create should succeed");

    assert_eq!(pass.kind(), PassKind::Single);
    assert_eq!(pass.amount, 499);
    assert_eq!(pass.holders.primary().name, name);
    assert_eq!(pass.redemption, Redemption::Unredeemed);

    cleanup_pass(&pool, pass.id).await;
}

#[tokio::test]
#[ignore]
async fn duplicate_primary_holder_is_rejected() {
    let (store, pool) = setup_store().await;
    let (name, phone) = unique_holder("Dup Holder");

    let first = store
        .create(single_request(&name, &phone))
        .await
        .expect("first create should succeed");

    let second = store.create(single_request(&name, &phone)).await;
    match second {
        Err(PassError::DuplicateHolder {
            name: dup_name,
            phone: dup_phone,
        }) => {
            assert_eq!(dup_name, name);
            assert_eq!(dup_phone, phone);
        }
        other => panic!("expected DuplicateHolder, got {:?}", other.map(|p| p.id)),
    }

    cleanup_pass(&pool, first.id).await;
}

#[tokio::test]
#[ignore]
async fn concurrent_duplicate_creates_yield_one_pass() {
    let (store, pool) = setup_store().await;
    let (name, phone) = unique_holder("Race Create");

    let mut handles = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        let name = name.clone();
        let phone = phone.clone();
        handles.push(tokio::spawn(async move {
            store.create(single_request(&name, &phone)).await
        }));
    }

    let results: Vec<Result<Pass, _>> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked"))
        .collect();

    let created: Vec<&Pass> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(created.len(), 1, "exactly one create may win");
    for result in &results {
        if let Err(e) = result {
            assert!(
                matches!(e, PassError::DuplicateHolder { .. }),
                "losers must see DuplicateHolder, got {:?}",
                e
            );
        }
    }

    cleanup_pass(&pool, created[0].id).await;
}

// ============================================================================
// REDEMPTION
// ============================================================================

#[tokio::test]
#[ignore]
async fn scenario_issue_encode_decode_redeem() {
    let (store, pool) = setup_store().await;
    let codec = PassTokenCodec::new(b"test-signing-secret").expect("codec builds");
    let (name, phone) = unique_holder("Alice");

    let pass = store
        .create(single_request(&name, &phone))
        .await
        .expect("create should succeed");
    assert_eq!(pass.amount, 499);
    assert_eq!(pass.redemption, Redemption::Unredeemed);

    let token = codec.encode(&pass.id.to_string());
    let decoded = codec.decode(&token).expect("token should verify");
    assert_eq!(decoded, pass.id.to_string());

    match store.redeem(pass.id, "admin1").await.expect("redeem works") {
        RedeemOutcome::Success(summary) => assert_eq!(summary.name1, name),
        other => panic!("expected Success, got {:?}", other),
    }

    match store.redeem(pass.id, "admin2").await.expect("redeem works") {
        RedeemOutcome::AlreadyRedeemed { scanned_by, .. } => assert_eq!(scanned_by, "admin1"),
        other => panic!("expected AlreadyRedeemed, got {:?}", other),
    }

    cleanup_pass(&pool, pass.id).await;
}

#[tokio::test]
#[ignore]
async fn redeem_unknown_pass_reports_not_found() {
    let (store, _pool) = setup_store().await;
    let outcome = store
        .redeem(Uuid::new_v4(), "admin1")
        .await
        .expect("redeem works");
    assert!(matches!(outcome, RedeemOutcome::NotFound));
}

#[tokio::test]
#[ignore]
async fn concurrent_scans_redeem_exactly_once() {
    let (store, pool) = setup_store().await;
    let (name, phone) = unique_holder("Race Scan");

    let pass = store
        .create(single_request(&name, &phone))
        .await
        .expect("create should succeed");

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        let pass_id = pass.id;
        handles.push(tokio::spawn(async move {
            store
                .redeem(pass_id, &format!("station{}", i))
                .await
                .expect("redeem should not fail")
        }));
    }

    let outcomes: Vec<RedeemOutcome> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked"))
        .collect();

    let successes = outcomes
        .iter()
        .filter(|o| matches!(o, RedeemOutcome::Success(_)))
        .count();
    assert_eq!(successes, 1, "exactly one scan may win");

    // Every loser saw the same winner.
    let mut first_winner: Option<(DateTime<Utc>, String)> = None;
    let mut losers = 0;
    for outcome in &outcomes {
        if let RedeemOutcome::AlreadyRedeemed {
            scanned_at,
            scanned_by,
            ..
        } = outcome
        {
            losers += 1;
            match &first_winner {
                None => first_winner = Some((*scanned_at, scanned_by.clone())),
                Some((at, by)) => {
                    assert_eq!(at, scanned_at);
                    assert_eq!(by, scanned_by);
                }
            }
        }
    }
    assert_eq!(losers, 7);

    cleanup_pass(&pool, pass.id).await;
}

#[tokio::test]
#[ignore]
async fn redeemed_state_is_observed_identically_forever() {
    let (store, pool) = setup_store().await;
    let (name, phone) = unique_holder("Idempotent");

    let pass = store
        .create(single_request(&name, &phone))
        .await
        .expect("create should succeed");
    store.redeem(pass.id, "admin1").await.expect("redeem works");

    let mut seen: Option<(DateTime<Utc>, String)> = None;
    for _ in 0..3 {
        match store.redeem(pass.id, "admin2").await.expect("redeem works") {
            RedeemOutcome::AlreadyRedeemed {
                scanned_at,
                scanned_by,
                ..
            } => match &seen {
                None => seen = Some((scanned_at, scanned_by)),
                Some((at, by)) => {
                    assert_eq!(*at, scanned_at);
                    assert_eq!(*by, scanned_by);
                }
            },
            other => panic!("expected AlreadyRedeemed, got {:?}", other),
        }
    }
    assert_eq!(seen.expect("observed").1, "admin1");

    cleanup_pass(&pool, pass.id).await;
}
