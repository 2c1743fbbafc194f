//! Integration tests for engagement status writes and report versioning.
//!
//! Exercises the repositories against a real database:
//! - `begin_processing` flips DRAFT/ERROR rows exactly once
//! - `reset_stuck_processing` moves orphaned PROCESSING rows to ERROR
//! - `next_version` continues from the current maximum
//! - `delete_expired` removes only rows past their retention window
//! - `create_completing_engagement` writes the report and COMPLETE together
//!
//! These need a PostgreSQL instance at `DATABASE_URL` and are ignored by
//! default; run them with `cargo test -p vantage-db -- --ignored`.

use chrono::{Duration, NaiveDate, Utc};
use sqlx::PgPool;
use vantage_db::models::engagement::CreateEngagement;
use vantage_db::models::generated_report::CreateGeneratedReport;
use vantage_db::models::status::EngagementStatus;
use vantage_db::repositories::{EngagementRepo, GeneratedReportRepo, UserRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_engagement(pool: &PgPool, email: &str) -> i64 {
    let owner = UserRepo::create(pool, email, "Analyst").await.unwrap();
    let engagement = EngagementRepo::create(
        pool,
        &CreateEngagement {
            owner_id: owner.id,
            report_type: "409A".to_string(),
            company_name: "Acme Corp".to_string(),
            valuation_date: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            model_file_path: Some("/tmp/acme.json".to_string()),
            selected_approaches: vec!["income".to_string(), "market".to_string()],
            qualitative_context: None,
        },
    )
    .await
    .unwrap();
    engagement.id
}

fn report(engagement_id: i64, version: i32, expires_in: Duration) -> CreateGeneratedReport {
    CreateGeneratedReport {
        engagement_id,
        file_path: format!("/reports/engagement-{engagement_id}-v{version}.md"),
        version,
        expires_at: Utc::now() + expires_in,
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_new_engagement_is_draft(pool: PgPool) {
    let id = seed_engagement(&pool, "draft@example.com").await;
    let engagement = EngagementRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(engagement.status(), Some(EngagementStatus::Draft));
    assert_eq!(engagement.selected_approaches, vec!["income", "market"]);
    assert_eq!(
        UserRepo::find_email(&pool, engagement.owner_id).await.unwrap().as_deref(),
        Some("draft@example.com")
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_begin_processing_flips_once(pool: PgPool) {
    let id = seed_engagement(&pool, "flip@example.com").await;

    assert!(EngagementRepo::begin_processing(&pool, id).await.unwrap());
    assert!(
        !EngagementRepo::begin_processing(&pool, id).await.unwrap(),
        "second flip must lose"
    );

    let engagement = EngagementRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(engagement.status(), Some(EngagementStatus::Processing));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_begin_processing_clears_previous_error(pool: PgPool) {
    let id = seed_engagement(&pool, "retry@example.com").await;
    EngagementRepo::set_status(&pool, id, EngagementStatus::Error, Some("boom"))
        .await
        .unwrap();

    assert!(EngagementRepo::begin_processing(&pool, id).await.unwrap());
    let engagement = EngagementRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(engagement.status(), Some(EngagementStatus::Processing));
    assert!(engagement.error_message.is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_reset_stuck_processing(pool: PgPool) {
    let stuck = seed_engagement(&pool, "stuck@example.com").await;
    let idle = seed_engagement(&pool, "idle@example.com").await;
    EngagementRepo::begin_processing(&pool, stuck).await.unwrap();

    let reset = EngagementRepo::reset_stuck_processing(&pool, "interrupted")
        .await
        .unwrap();
    assert_eq!(reset, 1);

    let stuck = EngagementRepo::find_by_id(&pool, stuck).await.unwrap().unwrap();
    assert_eq!(stuck.status(), Some(EngagementStatus::Error));
    assert_eq!(stuck.error_message.as_deref(), Some("interrupted"));

    let idle = EngagementRepo::find_by_id(&pool, idle).await.unwrap().unwrap();
    assert_eq!(idle.status(), Some(EngagementStatus::Draft));
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_versions_start_at_one_and_increase(pool: PgPool) {
    let id = seed_engagement(&pool, "versions@example.com").await;
    assert_eq!(GeneratedReportRepo::next_version(&pool, id).await.unwrap(), 1);

    GeneratedReportRepo::create(&pool, &report(id, 1, Duration::days(30)))
        .await
        .unwrap();
    GeneratedReportRepo::create(&pool, &report(id, 2, Duration::days(30)))
        .await
        .unwrap();

    assert_eq!(GeneratedReportRepo::next_version(&pool, id).await.unwrap(), 3);
    let latest = GeneratedReportRepo::find_latest(&pool, id).await.unwrap().unwrap();
    assert_eq!(latest.version, 2);

    let all = GeneratedReportRepo::list_by_engagement(&pool, id).await.unwrap();
    let versions: Vec<i32> = all.iter().map(|r| r.version).collect();
    assert_eq!(versions, vec![2, 1]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_version_rejected(pool: PgPool) {
    let id = seed_engagement(&pool, "dup@example.com").await;
    GeneratedReportRepo::create(&pool, &report(id, 1, Duration::days(30)))
        .await
        .unwrap();
    let result = GeneratedReportRepo::create(&pool, &report(id, 1, Duration::days(30))).await;
    assert!(result.is_err(), "unique (engagement_id, version) must hold");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_expired_keeps_max_version_monotonic(pool: PgPool) {
    let id = seed_engagement(&pool, "expired@example.com").await;
    GeneratedReportRepo::create(&pool, &report(id, 1, Duration::days(-1)))
        .await
        .unwrap();
    GeneratedReportRepo::create(&pool, &report(id, 2, Duration::days(30)))
        .await
        .unwrap();

    let deleted = GeneratedReportRepo::delete_expired(&pool, Utc::now()).await.unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].version, 1);

    assert_eq!(GeneratedReportRepo::next_version(&pool, id).await.unwrap(), 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_create_completing_engagement_writes_both(pool: PgPool) {
    let id = seed_engagement(&pool, "complete@example.com").await;
    EngagementRepo::begin_processing(&pool, id).await.unwrap();

    let created = GeneratedReportRepo::create_completing_engagement(
        &pool,
        &report(id, 1, Duration::days(30)),
    )
    .await
    .unwrap()
    .expect("engagement exists");
    assert_eq!(created.version, 1);

    let engagement = EngagementRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(engagement.status(), Some(EngagementStatus::Complete));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_create_completing_engagement_rolls_back_on_duplicate(pool: PgPool) {
    let id = seed_engagement(&pool, "rollback@example.com").await;
    GeneratedReportRepo::create(&pool, &report(id, 1, Duration::days(30)))
        .await
        .unwrap();
    EngagementRepo::begin_processing(&pool, id).await.unwrap();

    let result =
        GeneratedReportRepo::create_completing_engagement(&pool, &report(id, 1, Duration::days(30)))
            .await;
    assert!(result.is_err());

    let engagement = EngagementRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(engagement.status(), Some(EngagementStatus::Processing));
    let all = GeneratedReportRepo::list_by_engagement(&pool, id).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_create_completing_engagement_missing_engagement(pool: PgPool) {
    let result = GeneratedReportRepo::create_completing_engagement(
        &pool,
        &report(9_999, 1, Duration::days(30)),
    )
    .await
    .unwrap();
    assert!(result.is_none());
}
