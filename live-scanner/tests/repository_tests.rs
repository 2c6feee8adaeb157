//! SQLite repositories against an in-memory database.

mod common;

use std::sync::Arc;

use live_scanner::Error;
use live_scanner::database::repositories::{
    ChannelRepository, HistoryRepository, SqlxChannelRepository, SqlxHistoryRepository,
    SqlxStatusRepository, StatusRepository,
};
use live_scanner::database::time::{ms_to_datetime, now_ms};
use live_scanner::database::{DbPool, init_pool, run_migrations};
use live_scanner::domain::{Channel, ChannelStatus, CheckOutcome, CheckResult, StreamFormat};
use live_scanner::monitor::{BreakerConfig, ChannelChecker, CircuitBreaker, RetryConfig};
use live_scanner::scheduler::{Scanner, SchedulerConfig};

/// Helper to create a test database pool with migrations applied.
async fn setup_test_db() -> DbPool {
    let pool = init_pool("sqlite::memory:")
        .await
        .expect("Failed to create test pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

#[tokio::test]
async fn test_migrations_create_tables() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(&pool)
            .await
            .expect("Failed to query tables");
    let names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();

    assert!(names.contains(&"channels"), "channels table missing");
    assert!(names.contains(&"channel_status"), "channel_status table missing");
    assert!(names.contains(&"check_history"), "check_history table missing");
}

#[tokio::test]
async fn test_channel_repository() {
    let pool = setup_test_db().await;
    let repo = SqlxChannelRepository::new(pool);

    let a = Channel::new("Alpha", "UCabcdefghijklmnopqrstuv");
    let b = Channel::new("Beta", "@beta");
    repo.create_channel(&a).await.unwrap();
    repo.create_channel(&b).await.unwrap();

    let fetched = repo.get_channel(&a.id).await.unwrap();
    assert_eq!(fetched, a);
    assert_eq!(
        fetched.live_url,
        "https://www.youtube.com/channel/UCabcdefghijklmnopqrstuv/live"
    );

    repo.set_enabled(&b.id, false).await.unwrap();
    let enabled = repo.list_enabled().await.unwrap();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].id, a.id);

    assert!(matches!(
        repo.get_channel("missing").await,
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(
        repo.set_enabled("missing", true).await,
        Err(Error::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_duplicate_channel_ref_is_rejected() {
    let pool = setup_test_db().await;
    let repo = SqlxChannelRepository::new(pool);

    repo.create_channel(&Channel::new("One", "@same")).await.unwrap();
    let err = repo
        .create_channel(&Channel::new("Two", "@same"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DatabaseSqlx(_)));
}

#[tokio::test]
async fn test_status_upsert_overwrites() {
    let pool = setup_test_db().await;
    let channels = SqlxChannelRepository::new(pool.clone());
    let statuses = SqlxStatusRepository::new(pool);

    let channel = Channel::new("Alpha", "@alpha");
    channels.create_channel(&channel).await.unwrap();
    assert!(statuses.get_status(&channel.id).await.unwrap().is_none());

    let checked_at = ms_to_datetime(now_ms());
    let online = CheckOutcome::online(
        "v1",
        "https://cdn.example.com/live/index.m3u8",
        StreamFormat::Hls,
        Some(200),
    );
    let first = ChannelStatus::from_outcome(&channel.id, &online, checked_at);
    statuses.upsert(&first).await.unwrap();
    assert_eq!(statuses.get_status(&channel.id).await.unwrap(), Some(first));

    let offline = CheckOutcome::no_live();
    let second = ChannelStatus::from_outcome(&channel.id, &offline, checked_at);
    statuses.upsert(&second).await.unwrap();

    let stored = statuses.get_status(&channel.id).await.unwrap().unwrap();
    assert!(!stored.is_online);
    assert_eq!(stored.stream_url, None);
    assert_eq!(stored.last_error_code, Some(CheckResult::NoLive));
}

#[tokio::test]
async fn test_history_is_append_only_and_newest_first() {
    let pool = setup_test_db().await;
    let channels = SqlxChannelRepository::new(pool.clone());
    let history = SqlxHistoryRepository::new(pool);

    let channel = Channel::new("Alpha", "@alpha");
    channels.create_channel(&channel).await.unwrap();

    let blocked = CheckOutcome::blocked("HTTP Error 429", 600);
    history
        .add(&channel.id, CheckResult::NoLive, &CheckOutcome::no_live().details(), 12)
        .await
        .unwrap();
    let last_id = history
        .add(&channel.id, CheckResult::Blocked, &blocked.details(), 34)
        .await
        .unwrap();

    let entries = history.list_for_channel(&channel.id, 10).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, last_id);
    assert_eq!(entries[0].result, CheckResult::Blocked);
    assert_eq!(entries[0].duration_ms, 34);
    assert_eq!(entries[0].details["cooldown_secs"], 600);
    assert_eq!(entries[1].result, CheckResult::NoLive);

    assert_eq!(history.list_for_channel(&channel.id, 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_scan_persists_outcomes() {
    let pool = setup_test_db().await;
    let channels = Arc::new(SqlxChannelRepository::new(pool.clone()));
    let statuses = Arc::new(SqlxStatusRepository::new(pool.clone()));
    let history = Arc::new(SqlxHistoryRepository::new(pool));

    let live = Channel::new("Live", "@live");
    let idle = Channel::new("Idle", "@idle");
    channels.create_channel(&live).await.unwrap();
    channels.create_channel(&idle).await.unwrap();

    let detector = common::ScriptedDetector::live();
    detector.set_for_channel(&idle.id, live_scanner::monitor::Detection::NotLive);

    let checker = Arc::new(ChannelChecker::new(
        Arc::new(detector),
        Arc::new(common::ScriptedResolver::ok()),
        Arc::new(common::ScriptedValidator::online()),
        Arc::new(CircuitBreaker::new(BreakerConfig::default())),
        statuses.clone(),
        history.clone(),
        RetryConfig::default(),
    ));
    let scanner = Scanner::new(channels, checker, SchedulerConfig::default());

    assert_eq!(scanner.run_once().await.unwrap(), 2);

    let live_status = statuses.get_status(&live.id).await.unwrap().unwrap();
    assert!(live_status.is_online);
    assert_eq!(live_status.stream_format, Some(StreamFormat::Hls));
    assert_eq!(live_status.last_http_code, Some(200));

    let idle_status = statuses.get_status(&idle.id).await.unwrap().unwrap();
    assert!(!idle_status.is_live);
    assert_eq!(idle_status.last_error_code, Some(CheckResult::NoLive));

    assert_eq!(history.list_for_channel(&live.id, 10).await.unwrap().len(), 1);
    assert_eq!(history.list_for_channel(&idle.id, 10).await.unwrap().len(), 1);
}
