//! In-memory player store for dev mode and tests

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::cmp::Reverse;
use uuid::Uuid;

use super::{NewUser, ProgressWrite, UserRecord, UserStore, DEFAULT_AVATAR, DEFAULT_COUNTRY};
use crate::progress::UserProgress;
use crate::types::{QuizError, Result};

/// Players keyed by id, with a username index
#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<String, UserRecord>,
    usernames: DashMap<String, String>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryUserStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create_user(&self, user: NewUser) -> Result<UserRecord> {
        // Holding the username entry makes check-and-insert atomic
        match self.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(QuizError::Conflict("Username already taken".into())),
            Entry::Vacant(slot) => {
                let record = UserRecord {
                    id: Uuid::new_v4().to_string(),
                    username: user.username,
                    password_hash: user.password_hash,
                    avatar: DEFAULT_AVATAR.to_string(),
                    country: DEFAULT_COUNTRY.to_string(),
                    current_rank: user.current_rank,
                    progress: UserProgress::new(),
                    revision: 0,
                    token_version: 1,
                    active: true,
                };
                self.users.insert(record.id.clone(), record.clone());
                slot.insert(record.id.clone());
                Ok(record)
            }
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .usernames
            .get(username)
            .and_then(|id| self.users.get(id.value()).map(|u| u.clone()))
            .filter(|u| u.active))
    }

    async fn load(&self, user_id: &str) -> Result<UserRecord> {
        self.users
            .get(user_id)
            .map(|u| u.clone())
            .ok_or_else(|| QuizError::NotFound("User not found".into()))
    }

    async fn save_progress(
        &self,
        user_id: &str,
        expected_revision: i64,
        write: ProgressWrite,
    ) -> Result<i64> {
        let mut user = self
            .users
            .get_mut(user_id)
            .filter(|u| u.active)
            .ok_or_else(|| QuizError::NotFound("User not found".into()))?;

        if user.revision != expected_revision {
            return Err(QuizError::WriteConflict(format!(
                "expected revision {}, found {}",
                expected_revision, user.revision
            )));
        }

        user.progress = write.progress;
        user.current_rank = write.current_rank;
        if let Some(avatar) = write.avatar {
            user.avatar = avatar;
        }
        user.revision += 1;
        Ok(user.revision)
    }

    async fn set_active(&self, user_id: &str, active: bool) -> Result<()> {
        let mut user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| QuizError::NotFound("User not found".into()))?;

        if user.active && !active {
            user.token_version += 1;
        }
        user.active = active;
        Ok(())
    }

    async fn top_by_xp(&self, limit: usize) -> Result<Vec<UserRecord>> {
        let mut users: Vec<UserRecord> = self
            .users
            .iter()
            .filter(|u| u.active)
            .map(|u| u.value().clone())
            .collect();
        users.sort_by(|a, b| {
            (Reverse(a.progress.xp), &a.username).cmp(&(Reverse(b.progress.xp), &b.username))
        });
        users.truncate(limit);
        Ok(users)
    }

    async fn count_ahead_of(&self, xp: u64) -> Result<u64> {
        Ok(self
            .users
            .iter()
            .filter(|u| u.active && u.progress.xp > xp)
            .count() as u64)
    }
}
