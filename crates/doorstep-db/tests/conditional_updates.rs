//! Integration tests for the conditional-update core.
//!
//! These run against a live PostgreSQL with PostGIS; point DATABASE_URL at
//! one and run with `cargo test -- --ignored`. They are ignored by default
//! so the unit suite stays self-contained.

use chrono::{Duration, Utc};
use doorstep_core::models::GeoPoint;
use doorstep_db::{DocumentRepository, GeoIndex, RequestRepository, MIGRATOR};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

async fn setup_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for DB tests");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("connect to test database");
    MIGRATOR.run(&pool).await.expect("run migrations");
    pool
}

fn fee() -> Decimal {
    "20.00".parse().unwrap()
}

async fn create_paid_request(repo: &RequestRepository, point: GeoPoint) -> Uuid {
    let req = repo
        .create(
            Uuid::new_v4(),
            "Prinsengracht 100, Amsterdam",
            Some(point),
            "Guest",
            2,
            Utc::now() + Duration::hours(4),
            None,
            fee(),
        )
        .await
        .expect("create request");
    let applied = repo
        .apply_payment_succeeded(req.id, "4.00".parse().unwrap(), "16.00".parse().unwrap())
        .await
        .expect("apply payment");
    assert_eq!(applied, 1);
    req.id
}

#[tokio::test]
#[ignore = "requires PostgreSQL with PostGIS via DATABASE_URL"]
async fn concurrent_claims_let_exactly_one_through() {
    let pool = setup_pool().await;
    let repo = RequestRepository::new(pool.clone());

    let request_id = create_paid_request(&repo, GeoPoint::new(52.37, 4.89)).await;

    let agents: Vec<Uuid> = (0..8).map(|_| Uuid::new_v4()).collect();
    let mut handles = Vec::new();
    for agent_id in agents.clone() {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            (agent_id, repo.claim(request_id, agent_id).await.unwrap())
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        let (agent_id, affected) = handle.await.unwrap();
        if affected == 1 {
            winners.push(agent_id);
        }
    }

    assert_eq!(winners.len(), 1, "exactly one claim must succeed");

    let refreshed = repo.get(request_id).await.unwrap().unwrap();
    assert_eq!(refreshed.agent_id, Some(winners[0]));
    assert_eq!(refreshed.status.as_str(), "accepted");
}

#[tokio::test]
#[ignore = "requires PostgreSQL with PostGIS via DATABASE_URL"]
async fn unpaid_request_is_not_claimable() {
    let pool = setup_pool().await;
    let repo = RequestRepository::new(pool);

    let req = repo
        .create(
            Uuid::new_v4(),
            "Somewhere 1",
            Some(GeoPoint::new(52.0, 4.0)),
            "Guest",
            1,
            Utc::now() + Duration::hours(2),
            None,
            fee(),
        )
        .await
        .unwrap();

    let affected = repo.claim(req.id, Uuid::new_v4()).await.unwrap();
    assert_eq!(affected, 0);

    let unchanged = repo.get(req.id).await.unwrap().unwrap();
    assert!(unchanged.agent_id.is_none());
    assert_eq!(unchanged.status.as_str(), "pending");
}

#[tokio::test]
#[ignore = "requires PostgreSQL with PostGIS via DATABASE_URL"]
async fn payment_success_replay_does_not_double_apply() {
    let pool = setup_pool().await;
    let repo = RequestRepository::new(pool);

    let req = repo
        .create(
            Uuid::new_v4(),
            "Somewhere 2",
            None,
            "Guest",
            1,
            Utc::now() + Duration::hours(2),
            None,
            fee(),
        )
        .await
        .unwrap();

    let first = repo
        .apply_payment_succeeded(req.id, "4.00".parse().unwrap(), "16.00".parse().unwrap())
        .await
        .unwrap();
    let replay = repo
        .apply_payment_succeeded(req.id, "9.99".parse().unwrap(), "0.01".parse().unwrap())
        .await
        .unwrap();

    assert_eq!(first, 1);
    assert_eq!(replay, 0, "replayed success signal must be a no-op");

    let row = repo.get(req.id).await.unwrap().unwrap();
    assert_eq!(row.platform_fee, Some("4.00".parse().unwrap()));
    assert_eq!(row.agent_payout, Some("16.00".parse().unwrap()));
}

#[tokio::test]
#[ignore = "requires PostgreSQL with PostGIS via DATABASE_URL"]
async fn expiry_and_claim_race_resolves_to_one_winner() {
    let pool = setup_pool().await;
    let repo = RequestRepository::new(pool);

    // Scheduled in the past so the sweep is eligible immediately.
    let req = repo
        .create(
            Uuid::new_v4(),
            "Somewhere 3",
            Some(GeoPoint::new(51.9, 4.4)),
            "Guest",
            1,
            Utc::now() - Duration::minutes(1),
            None,
            fee(),
        )
        .await
        .unwrap();
    repo.apply_payment_succeeded(req.id, "4.00".parse().unwrap(), "16.00".parse().unwrap())
        .await
        .unwrap();

    let agent = Uuid::new_v4();
    let (expired, claimed) = tokio::join!(repo.expire_due(Utc::now()), repo.claim(req.id, agent));

    expired.unwrap();
    let claimed = claimed.unwrap();
    // expire_due may sweep unrelated leftover rows; for this row exactly one
    // of the two operations won, never both.
    let row = repo.get(req.id).await.unwrap().unwrap();
    match row.status.as_str() {
        "expired" => assert_eq!(claimed, 0),
        "accepted" => {
            assert_eq!(claimed, 1);
            assert_eq!(row.agent_id, Some(agent));
        }
        other => panic!("unexpected status after race: {}", other),
    }

    // Once settled, a late claim always loses.
    assert_eq!(repo.claim(req.id, Uuid::new_v4()).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires PostgreSQL with PostGIS via DATABASE_URL"]
async fn nearby_results_are_ordered_and_filtered() {
    let pool = setup_pool().await;
    let repo = RequestRepository::new(pool.clone());
    let geo = GeoIndex::new(pool);

    let origin = GeoPoint::new(52.3700, 4.8900);
    // Offsets in latitude: ~1.1 km per 0.01 degrees.
    let near = create_paid_request(&repo, GeoPoint::new(52.3750, 4.8900)).await;
    let mid = create_paid_request(&repo, GeoPoint::new(52.3900, 4.8900)).await;
    let far = create_paid_request(&repo, GeoPoint::new(52.4200, 4.8900)).await;

    // Ineligible rows: unpaid, unlocated, and past-scheduled.
    repo.create(
        Uuid::new_v4(),
        "Unpaid",
        Some(GeoPoint::new(52.3710, 4.8900)),
        "Guest",
        1,
        Utc::now() + Duration::hours(2),
        None,
        fee(),
    )
    .await
    .unwrap();
    repo.create(
        Uuid::new_v4(),
        "Unlocated",
        None,
        "Guest",
        1,
        Utc::now() + Duration::hours(2),
        None,
        fee(),
    )
    .await
    .unwrap();
    let past = repo
        .create(
            Uuid::new_v4(),
            "Past",
            Some(GeoPoint::new(52.3711, 4.8901)),
            "Guest",
            1,
            Utc::now() - Duration::minutes(5),
            None,
            fee(),
        )
        .await
        .unwrap();
    repo.apply_payment_succeeded(past.id, "4.00".parse().unwrap(), "16.00".parse().unwrap())
        .await
        .unwrap();

    let results = geo
        .nearby_claimable_requests(origin, 25.0, Utc::now(), 50)
        .await
        .unwrap();

    let ids: Vec<Uuid> = results.iter().map(|(r, _)| r.id).collect();
    assert!(ids.contains(&near));
    assert!(ids.contains(&mid));
    assert!(ids.contains(&far));
    assert!(!ids.contains(&past.id));

    let this_batch: Vec<&(_, f64)> = results
        .iter()
        .filter(|(r, _)| [near, mid, far].contains(&r.id))
        .collect();
    assert_eq!(this_batch.len(), 3);

    // Non-decreasing distance over the full result set.
    for pair in results.windows(2) {
        assert!(pair[0].1 <= pair[1].1, "results must be nearest-first");
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL with PostGIS via DATABASE_URL"]
async fn expired_documents_are_scanned_and_deleted_idempotently() {
    let pool = setup_pool().await;
    let requests = RequestRepository::new(pool.clone());
    let documents = DocumentRepository::new(pool);

    let request_id = create_paid_request(&requests, GeoPoint::new(52.0, 5.0)).await;

    let doc = documents
        .create(
            Uuid::new_v4(),
            request_id,
            Uuid::new_v4(),
            "documents/test/expired.jpg",
            "expired.jpg",
            "image/jpeg",
            Utc::now() - Duration::hours(1),
        )
        .await
        .unwrap();

    let expired = documents.find_expired(Utc::now(), 100).await.unwrap();
    assert!(expired.iter().any(|d| d.id == doc.id));

    assert!(documents.delete(doc.id).await.unwrap());
    // Second delete over the already-reclaimed row is a no-op.
    assert!(!documents.delete(doc.id).await.unwrap());
    assert!(documents.get(doc.id).await.unwrap().is_none());
}
