//! Player activity log
//!
//! One JSON object per line: registrations, logins, progress writes,
//! unlocks and failed authentications. Disabled unless a path is set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Registered,
    LoggedIn,
    ProgressUpdated,
    AchievementUnlocked,
    AuthFailure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: ActivityKind,
    /// Node that handled the request
    pub node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achievement_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp_reward: Option<u64>,
    /// Failure reason, never the submitted credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ActivityEvent {
    pub fn new(kind: ActivityKind, node_id: String) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            node_id,
            user_id: None,
            username: None,
            xp: None,
            achievement_id: None,
            xp_reward: None,
            reason: None,
        }
    }

    pub fn with_user(mut self, user_id: &str, username: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self.username = Some(username.to_string());
        self
    }

    pub fn with_xp(mut self, xp: u64) -> Self {
        self.xp = Some(xp);
        self
    }

    pub fn with_achievement(mut self, id: &str, xp_reward: u64) -> Self {
        self.achievement_id = Some(id.to_string());
        self.xp_reward = Some(xp_reward);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Appends activity events to a JSONL file
#[derive(Clone)]
pub struct ActivityLogger {
    inner: Arc<Mutex<Option<BufWriter<File>>>>,
    node_id: String,
}

impl ActivityLogger {
    /// Logger that drops everything until [`init_file`](Self::init_file)
    pub fn new(node_id: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
            node_id,
        }
    }

    pub async fn init_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        *self.inner.lock().await = Some(BufWriter::new(file));

        info!("Activity logging initialized to {}", path.display());
        Ok(())
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub async fn log(&self, event: ActivityEvent) {
        let mut inner = self.inner.lock().await;
        let Some(writer) = inner.as_mut() else {
            return;
        };

        let line = match event.to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize activity event: {}", e);
                return;
            }
        };

        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            error!("Failed to write activity event: {}", e);
        }
    }

    fn event(&self, kind: ActivityKind) -> ActivityEvent {
        ActivityEvent::new(kind, self.node_id.clone())
    }

    pub async fn log_registered(&self, user_id: &str, username: &str) {
        self.log(self.event(ActivityKind::Registered).with_user(user_id, username))
            .await;
    }

    pub async fn log_logged_in(&self, user_id: &str, username: &str) {
        self.log(self.event(ActivityKind::LoggedIn).with_user(user_id, username))
            .await;
    }

    pub async fn log_progress(&self, user_id: &str, username: &str, xp: u64) {
        self.log(
            self.event(ActivityKind::ProgressUpdated)
                .with_user(user_id, username)
                .with_xp(xp),
        )
        .await;
    }

    pub async fn log_unlock(&self, user_id: &str, username: &str, id: &str, xp_reward: u64) {
        self.log(
            self.event(ActivityKind::AchievementUnlocked)
                .with_user(user_id, username)
                .with_achievement(id, xp_reward),
        )
        .await;
    }

    pub async fn log_auth_failure(&self, reason: &str) {
        self.log(self.event(ActivityKind::AuthFailure).with_reason(reason))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = ActivityEvent::new(ActivityKind::AchievementUnlocked, "node-1".into())
            .with_user("u1", "ada")
            .with_achievement("streak_3", 100);

        let line = event.to_jsonl().unwrap();
        assert!(line.contains("achievement_unlocked"));
        assert!(line.contains("\"xp_reward\":100"));
        assert!(!line.contains("reason"));
    }

    #[tokio::test]
    async fn test_writes_jsonl_file() {
        let path = std::env::temp_dir().join(format!("quizhero-activity-{}.jsonl", uuid::Uuid::new_v4()));
        let logger = ActivityLogger::new("node-1".into());
        logger.init_file(path.clone()).await.unwrap();

        logger.log_registered("u1", "ada").await;
        logger.log_auth_failure("Invalid credentials").await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let kinds: Vec<ActivityKind> = contents
            .lines()
            .map(|line| serde_json::from_str::<ActivityEvent>(line).unwrap().kind)
            .collect();
        assert_eq!(kinds, vec![ActivityKind::Registered, ActivityKind::AuthFailure]);

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_without_file_is_silent() {
        let logger = ActivityLogger::new("node-1".into());
        logger.log_logged_in("u1", "ada").await;
    }
}
