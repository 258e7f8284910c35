//! Player service integration tests
//!
//! Runs the register / login / update flows against the in-memory store:
//! - Concurrent updates for one player
//! - Rejected writes: contention and database failures
//! - Strict and lenient event validation
//! - Disabled accounts
//! - Streaks across several server days
//! - Activity log output

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use quizhero::auth::JwtValidator;
use quizhero::logging::ActivityLogger;
use quizhero::progress::{ProgressEvaluator, UpdateRequest, ValidationMode};
use quizhero::services::{Credentials, PlayerService, PlayerSettings};
use quizhero::store::{MemoryUserStore, NewUser, ProgressWrite, UserRecord, UserStore};
use quizhero::{QuizError, Result};

fn creds(username: &str, password: &str) -> Credentials {
    Credentials {
        username: username.into(),
        password: password.into(),
    }
}

fn service_with(store: Arc<dyn UserStore>, settings: PlayerSettings) -> PlayerService {
    PlayerService::new(
        store,
        ProgressEvaluator::standard(),
        JwtValidator::new_dev(),
        ActivityLogger::new("test-node".into()),
        settings,
    )
}

fn service() -> PlayerService {
    service_with(Arc::new(MemoryUserStore::new()), PlayerSettings::default())
}

fn may_day(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, day).unwrap()
}

async fn register(players: &PlayerService, username: &str) -> (String, UserRecord) {
    let auth = players.register(creds(username, "secret1")).await.unwrap();
    let bearer = format!("Bearer {}", auth.token);
    let user = players.authenticate(Some(&bearer)).await.unwrap();
    (bearer, user)
}

// =============================================================================
// Store that never accepts a progress write
// =============================================================================

struct RejectingStore {
    inner: MemoryUserStore,
    attempts: AtomicU32,
    error: fn() -> QuizError,
}

impl RejectingStore {
    fn new(error: fn() -> QuizError) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryUserStore::new(),
            attempts: AtomicU32::new(0),
            error,
        })
    }

    fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserStore for RejectingStore {
    fn backend(&self) -> &'static str {
        "rejecting"
    }

    async fn create_user(&self, user: NewUser) -> Result<UserRecord> {
        self.inner.create_user(user).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        self.inner.find_by_username(username).await
    }

    async fn load(&self, user_id: &str) -> Result<UserRecord> {
        self.inner.load(user_id).await
    }

    async fn save_progress(
        &self,
        _user_id: &str,
        _expected_revision: i64,
        _write: ProgressWrite,
    ) -> Result<i64> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err((self.error)())
    }

    async fn set_active(&self, user_id: &str, active: bool) -> Result<()> {
        self.inner.set_active(user_id, active).await
    }

    async fn top_by_xp(&self, limit: usize) -> Result<Vec<UserRecord>> {
        self.inner.top_by_xp(limit).await
    }

    async fn count_ahead_of(&self, xp: u64) -> Result<u64> {
        self.inner.count_ahead_of(xp).await
    }
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_lose_nothing() {
    let players = Arc::new(service_with(
        Arc::new(MemoryUserStore::new()),
        PlayerSettings {
            update_retries: 16,
            ..PlayerSettings::default()
        },
    ));
    let (bearer, snapshot) = register(&players, "ada").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let players = Arc::clone(&players);
        let snapshot = snapshot.clone();
        handles.push(tokio::spawn(async move {
            let request = UpdateRequest {
                category: Some("Math".into()),
                ..Default::default()
            };
            players.update_on(snapshot, &request, may_day(1)).await
        }));
    }

    let mut unlock_count = 0;
    for handle in handles {
        let view = handle.await.unwrap().unwrap();
        unlock_count += view
            .unlocked_achievements
            .iter()
            .filter(|u| u.id == "math_master")
            .count();
    }

    let stored = players.authenticate(Some(&bearer)).await.unwrap();
    assert_eq!(stored.progress.category_count("Math"), 8);
    assert_eq!(stored.revision, 8);
    assert_eq!(unlock_count, 1);
    assert_eq!(stored.progress.xp, 200);
    assert_eq!(
        stored
            .progress
            .achievements
            .iter()
            .filter(|id| *id == "math_master")
            .count(),
        1
    );
}

#[tokio::test]
async fn test_contended_write_gives_up_after_retries() {
    let store = RejectingStore::new(|| QuizError::WriteConflict("always behind".into()));
    let players = service_with(store.clone(), PlayerSettings::default());
    let (_, user) = register(&players, "ada").await;

    let request = UpdateRequest {
        xp: Some(json!(10)),
        ..Default::default()
    };
    let err = players.update_on(user, &request, may_day(1)).await.unwrap_err();

    assert!(matches!(err, QuizError::WriteConflict(_)));
    assert_eq!(err.status_code(), hyper::StatusCode::CONFLICT);
    assert_eq!(store.attempts(), 3);
}

#[tokio::test]
async fn test_database_failure_is_not_reported_as_success() {
    let path = std::env::temp_dir().join(format!("quizhero-dbfail-{}.jsonl", uuid::Uuid::new_v4()));
    let activity = ActivityLogger::new("node-a".into());
    activity.init_file(path.clone()).await.unwrap();

    let store = RejectingStore::new(|| QuizError::Database("connection reset".into()));
    let players = PlayerService::new(
        store.clone(),
        ProgressEvaluator::standard(),
        JwtValidator::new_dev(),
        activity,
        PlayerSettings::default(),
    );
    let (bearer, user) = register(&players, "ada").await;

    let request = UpdateRequest {
        achievement_id: Some("first_win".into()),
        ..Default::default()
    };
    let err = players.update_on(user, &request, may_day(1)).await.unwrap_err();

    assert!(matches!(err, QuizError::Database(_)));
    assert_eq!(err.status_code(), hyper::StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(store.attempts(), 1);

    let stored = players.authenticate(Some(&bearer)).await.unwrap();
    assert!(stored.progress.achievements.is_empty());

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("\"registered\""));
    assert!(!contents.contains("progress_updated"));
    assert!(!contents.contains("achievement_unlocked"));

    let _ = std::fs::remove_file(&path);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_lenient_mode_drops_bad_fields() {
    let players = service_with(
        Arc::new(MemoryUserStore::new()),
        PlayerSettings {
            validation_mode: ValidationMode::Lenient,
            ..PlayerSettings::default()
        },
    );
    let (bearer, user) = register(&players, "ada").await;

    let request = UpdateRequest {
        xp: Some(json!(-40)),
        category: Some("Math".into()),
        time_taken: Some("fast".into()),
        is_perfect: Some(true.into()),
        ..Default::default()
    };
    let view = players.update_on(user, &request, may_day(1)).await.unwrap();

    assert_eq!(view.xp, 100);
    let ids: Vec<&str> = view.unlocked_achievements.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["perfect_score"]);

    let stored = players.authenticate(Some(&bearer)).await.unwrap();
    assert_eq!(stored.progress.category_count("Math"), 1);
}

#[tokio::test]
async fn test_lenient_mode_skips_wrongly_typed_fields() {
    let players = service_with(
        Arc::new(MemoryUserStore::new()),
        PlayerSettings {
            validation_mode: ValidationMode::Lenient,
            ..PlayerSettings::default()
        },
    );
    let (bearer, user) = register(&players, "ada").await;

    let request: UpdateRequest =
        serde_json::from_str(r#"{"category": 5, "isPerfect": true}"#).unwrap();
    let view = players.update_on(user, &request, may_day(1)).await.unwrap();

    let ids: Vec<&str> = view.unlocked_achievements.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["perfect_score"]);

    let stored = players.authenticate(Some(&bearer)).await.unwrap();
    assert!(stored.progress.category_progress.is_empty());
}

#[tokio::test]
async fn test_strict_mode_rejects_wrongly_typed_fields() {
    let players = service();
    let (bearer, user) = register(&players, "ada").await;

    let request: UpdateRequest =
        serde_json::from_str(r#"{"category": 5, "isPerfect": true}"#).unwrap();
    let err = players.update_on(user, &request, may_day(1)).await.unwrap_err();
    assert_eq!(err.status_code(), hyper::StatusCode::UNPROCESSABLE_ENTITY);

    let stored = players.authenticate(Some(&bearer)).await.unwrap();
    assert_eq!(stored.revision, 0);
}

// =============================================================================
// Account state
// =============================================================================

#[tokio::test]
async fn test_disabled_player_token_is_rejected() {
    let players = service();
    let (bearer, ada) = register(&players, "ada").await;
    register(&players, "bob").await;

    players.store().set_active(&ada.id, false).await.unwrap();

    let err = players.authenticate(Some(&bearer)).await.unwrap_err();
    assert!(matches!(err, QuizError::Unauthorized(_)));
    assert!(matches!(
        players.login(creds("ada", "secret1")).await,
        Err(QuizError::Unauthorized(_))
    ));
    let names: Vec<String> = players
        .leaderboard()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.username)
        .collect();
    assert_eq!(names, vec!["bob"]);

    // Re-enabled players log in again, but old tokens stay revoked
    players.store().set_active(&ada.id, true).await.unwrap();
    assert!(players.authenticate(Some(&bearer)).await.is_err());
    let fresh = players.login(creds("ada", "secret1")).await.unwrap();
    assert!(players
        .authenticate(Some(&format!("Bearer {}", fresh.token)))
        .await
        .is_ok());
}

// =============================================================================
// Multi-day play
// =============================================================================

#[tokio::test]
async fn test_three_day_streak_through_service() {
    let players = service();
    let (bearer, _) = register(&players, "ada").await;
    let request = UpdateRequest::default();

    let mut streaks = Vec::new();
    let mut rewards = Vec::new();
    for day in [1, 2, 2, 3, 4] {
        let user = players.authenticate(Some(&bearer)).await.unwrap();
        let view = players.update_on(user, &request, may_day(day)).await.unwrap();
        streaks.push(view.streak);
        rewards.extend(view.unlocked_achievements.into_iter().map(|u| u.id));
    }

    assert_eq!(streaks, vec![1, 2, 2, 3, 4]);
    assert_eq!(rewards, vec!["streak_3"]);

    let profile = players
        .profile(&players.authenticate(Some(&bearer)).await.unwrap())
        .await
        .unwrap();
    assert_eq!(profile.xp, 100);
    assert_eq!(profile.level, 3);
    assert_eq!(profile.leaderboard_position, 1);
}

#[test]
fn test_login_after_progress_reports_current_rank() {
    tokio_test::block_on(async {
        let players = service();
        let (_, user) = register(&players, "ada").await;

        let request = UpdateRequest {
            xp: Some(json!(1000)),
            ..Default::default()
        };
        players.update_on(user, &request, may_day(1)).await.unwrap();

        let auth = players.login(creds(" Ada ", "secret1")).await.unwrap();
        assert_eq!(auth.user.rank, "Gold I");
        assert_eq!(auth.user.xp, 1250);
        assert_eq!(auth.user.level, 26);
    });
}

// =============================================================================
// Activity log
// =============================================================================

#[tokio::test]
async fn test_activity_log_records_flow() {
    let path = std::env::temp_dir().join(format!("quizhero-flow-{}.jsonl", uuid::Uuid::new_v4()));
    let activity = ActivityLogger::new("node-a".into());
    activity.init_file(path.clone()).await.unwrap();

    let players = PlayerService::new(
        Arc::new(MemoryUserStore::new()),
        ProgressEvaluator::standard(),
        JwtValidator::new_dev(),
        activity,
        PlayerSettings::default(),
    );

    let (_, user) = register(&players, "ada").await;
    let request = UpdateRequest {
        achievement_id: Some("first_win".into()),
        ..Default::default()
    };
    players.update_on(user, &request, may_day(1)).await.unwrap();
    let _ = players.login(creds("ada", "wrong-password")).await;

    let contents = std::fs::read_to_string(&path).unwrap();
    let kinds: Vec<String> = contents
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["node_id"], "node-a");
            assert!(!line.contains("wrong-password"));
            value["kind"].as_str().unwrap().to_string()
        })
        .collect();

    assert_eq!(
        kinds,
        vec![
            "registered",
            "achievement_unlocked",
            "progress_updated",
            "auth_failure"
        ]
    );

    let _ = std::fs::remove_file(&path);
}
