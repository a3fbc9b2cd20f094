//! End-to-end service flows against a live PostgreSQL with PostGIS.
//!
//! Run with `DATABASE_URL=postgresql://... cargo test -- --ignored`.
//! Storage uses a tempdir-backed local backend.

use std::sync::Arc;

use chrono::{Duration, Utc};
use doorstep_core::models::{
    Actor, CheckInStatus, CreateCheckInRequest, PaymentOutcome, PaymentStatus, UploadGrantRequest,
};
use doorstep_core::AppError;
use doorstep_db::{
    AgentLocationRepository, DocumentRepository, GeoIndex, RequestRepository, MIGRATOR,
};
use doorstep_services::{
    DocumentLifecycleManager, Geocoder, LifecycleController, MatchingEngine,
};
use doorstep_storage::{LocalStorage, Storage};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tempfile::TempDir;
use uuid::Uuid;

struct TestStack {
    matching: MatchingEngine,
    lifecycle: Arc<LifecycleController>,
    documents: DocumentLifecycleManager,
    document_repo: DocumentRepository,
    storage: Arc<dyn Storage>,
    _temp_dir: TempDir,
}

async fn setup() -> TestStack {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for DB tests");
    let pool: PgPool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("connect to test database");
    MIGRATOR.run(&pool).await.expect("run migrations");

    let temp_dir = TempDir::new().unwrap();
    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(temp_dir.path(), "http://localhost:4000/files".to_string())
            .await
            .unwrap(),
    );

    let requests = RequestRepository::new(pool.clone());
    let document_repo = DocumentRepository::new(pool.clone());
    let lifecycle = Arc::new(LifecycleController::new(
        requests.clone(),
        "0.20".parse().unwrap(),
    ));
    let matching = MatchingEngine::new(
        requests.clone(),
        GeoIndex::new(pool.clone()),
        AgentLocationRepository::new(pool.clone()),
        Arc::new(Geocoder::new(None)),
        "20.00".parse().unwrap(),
        10.0,
        50.0,
    );
    let documents = DocumentLifecycleManager::new(
        document_repo.clone(),
        requests,
        storage.clone(),
        lifecycle.clone(),
        48,
        3600,
        900,
        vec![
            "image/jpeg".to_string(),
            "image/png".to_string(),
            "application/pdf".to_string(),
        ],
        3600,
    );

    TestStack {
        matching,
        lifecycle,
        documents,
        document_repo,
        storage,
        _temp_dir: temp_dir,
    }
}

fn payload() -> CreateCheckInRequest {
    CreateCheckInRequest {
        property_address: "Keizersgracht 123, Amsterdam".to_string(),
        guest_name: "A. Visitor".to_string(),
        guest_count: 2,
        check_in_time: Utc::now() + Duration::hours(6),
        notes: Some("Key in the lockbox".to_string()),
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL with PostGIS via DATABASE_URL"]
async fn payment_then_race_scenario() {
    let stack = setup().await;
    let host = Uuid::new_v4();

    // Geocoder is unconfigured, so the request lands without a location.
    let request = stack.matching.create_request(host, payload()).await.unwrap();
    assert_eq!(request.status, CheckInStatus::Pending);
    assert_eq!(request.payment_status, PaymentStatus::Pending);
    assert!(request.location.is_none());

    // Claim before payment is gated.
    let premature = stack.matching.claim(request.id, Uuid::new_v4()).await;
    assert!(matches!(premature, Err(AppError::PaymentNotSucceeded(_))));

    // Payment callback records the 80/20 split off the stored fee.
    let paid = stack
        .lifecycle
        .apply_payment_outcome(request.id, PaymentOutcome::Succeeded, None)
        .await
        .unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Succeeded);
    assert_eq!(paid.platform_fee, Some("4.00".parse().unwrap()));
    assert_eq!(paid.agent_payout, Some("16.00".parse().unwrap()));

    // Two agents race; exactly one wins, the other sees AlreadyClaimed.
    let (a1, a2) = (Uuid::new_v4(), Uuid::new_v4());
    let (r1, r2) = tokio::join!(
        stack.matching.claim(request.id, a1),
        stack.matching.claim(request.id, a2)
    );

    let winners = [r1.is_ok(), r2.is_ok()].iter().filter(|w| **w).count();
    assert_eq!(winners, 1, "exactly one claim must succeed");
    for r in [r1, r2] {
        if let Err(e) = r {
            assert!(matches!(e, AppError::AlreadyClaimed(_)), "got {:?}", e);
        }
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL with PostGIS via DATABASE_URL"]
async fn authorization_precedes_transition_legality() {
    let stack = setup().await;
    let host = Uuid::new_v4();
    let request = stack.matching.create_request(host, payload()).await.unwrap();

    // A stranger gets AccessDenied even for a transition that would be legal
    // for the host.
    let stranger = Actor::host(Uuid::new_v4());
    let denied = stack
        .lifecycle
        .transition(request.id, stranger, CheckInStatus::CancelledByHost, None)
        .await;
    assert!(matches!(denied, Err(AppError::AccessDenied(_))));

    // The bound host cannot jump pending -> completed.
    let illegal = stack
        .lifecycle
        .transition(request.id, Actor::host(host), CheckInStatus::Completed, None)
        .await;
    assert!(matches!(illegal, Err(AppError::IllegalTransition { .. })));

    // The row is unmutated by the rejected attempts.
    let unchanged = stack.matching.get_request(request.id).await.unwrap();
    assert_eq!(unchanged.status, CheckInStatus::Pending);
    assert_eq!(unchanged.updated_at, request.updated_at);

    // And the legal host cancellation goes through, recording the reason.
    let cancelled = stack
        .lifecycle
        .transition(
            request.id,
            Actor::host(host),
            CheckInStatus::CancelledByHost,
            Some("Guest cancelled the stay".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(cancelled.status, CheckInStatus::CancelledByHost);
    assert_eq!(
        cancelled.cancellation_reason.as_deref(),
        Some("Guest cancelled the stay")
    );
}

#[tokio::test]
#[ignore = "requires PostgreSQL with PostGIS via DATABASE_URL"]
async fn agent_upload_starts_job_and_documents_expire() {
    let stack = setup().await;
    let host = Uuid::new_v4();
    let agent = Uuid::new_v4();

    let request = stack.matching.create_request(host, payload()).await.unwrap();
    stack
        .lifecycle
        .apply_payment_outcome(request.id, PaymentOutcome::Succeeded, None)
        .await
        .unwrap();
    stack.matching.claim(request.id, agent).await.unwrap();

    // A third party cannot obtain an upload grant.
    let outsider = stack
        .documents
        .issue_upload_grant(
            Actor::agent(Uuid::new_v4()),
            UploadGrantRequest {
                check_in_request_id: request.id,
                file_name: "sneaky.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
            },
        )
        .await;
    assert!(matches!(outsider, Err(AppError::AccessDenied(_))));

    // Disallowed MIME types are rejected up front.
    let bad_mime = stack
        .documents
        .issue_upload_grant(
            Actor::agent(agent),
            UploadGrantRequest {
                check_in_request_id: request.id,
                file_name: "clip.mp4".to_string(),
                content_type: "video/mp4".to_string(),
            },
        )
        .await;
    assert!(matches!(bad_mime, Err(AppError::Validation(_))));

    // The bound agent's first upload grant implicitly starts the job.
    let grant = stack
        .documents
        .issue_upload_grant(
            Actor::agent(agent),
            UploadGrantRequest {
                check_in_request_id: request.id,
                file_name: "door.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
            },
        )
        .await
        .unwrap();

    let started = stack.matching.get_request(request.id).await.unwrap();
    assert_eq!(started.status, CheckInStatus::InProgress);

    // Simulate the client PUT, then the host can fetch a download grant.
    let stored = stack
        .document_repo
        .get(grant.document.id)
        .await
        .unwrap()
        .unwrap();
    stack
        .storage
        .upload(&stored.file_key, "image/jpeg", b"jpeg bytes".to_vec())
        .await
        .unwrap();

    let download = stack
        .documents
        .issue_download_grant(grant.document.id, Actor::host(host))
        .await
        .unwrap();
    assert!(download.download_url.contains(&stored.file_key));

    // Insert an already-expired document and verify the logical boundary,
    // then reclaim it and check the sweep is idempotent.
    let expired_id = Uuid::new_v4();
    let expired = stack
        .document_repo
        .create(
            expired_id,
            request.id,
            agent,
            &format!("documents/{}/{}_old.jpg", request.id, expired_id),
            "old.jpg",
            "image/jpeg",
            Utc::now() - Duration::minutes(1),
        )
        .await
        .unwrap();
    stack
        .storage
        .upload(&expired.file_key, "image/jpeg", b"stale".to_vec())
        .await
        .unwrap();

    let gone = stack
        .documents
        .issue_download_grant(expired.id, Actor::host(host))
        .await;
    assert!(matches!(gone, Err(AppError::Expired(_))));

    let swept = stack.documents.sweep_expired().await.unwrap();
    assert!(swept >= 1);
    assert!(stack.document_repo.get(expired.id).await.unwrap().is_none());
    assert!(!stack.storage.exists(&expired.file_key).await.unwrap());

    // Live document survives the sweep.
    assert!(stack
        .document_repo
        .get(grant.document.id)
        .await
        .unwrap()
        .is_some());
}
