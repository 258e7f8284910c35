//! Player storage
//!
//! [`UserStore`] is the seam between the player service and persistence.
//! MongoDB backs production; the in-memory store backs dev mode and tests.
//!
//! Progress writes are conditional on the revision the caller read, so two
//! concurrent updates for the same player cannot silently overwrite each
//! other: the loser gets [`QuizError::WriteConflict`](crate::types::QuizError::WriteConflict) and retries.

pub mod memory;
pub mod mongo;

pub use memory::MemoryUserStore;
pub use mongo::MongoUserStore;

use crate::progress::UserProgress;
use crate::types::Result;

/// Avatar given to new players
pub const DEFAULT_AVATAR: &str = "Superhero";

/// Country given to new players
pub const DEFAULT_COUNTRY: &str = "PH";

/// A stored player
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub avatar: String,
    pub country: String,
    pub current_rank: String,
    pub progress: UserProgress,
    pub revision: i64,
    pub token_version: u32,
    /// Inactive players cannot log in, use tokens or appear on the leaderboard
    pub active: bool,
}

/// Fields needed to create a player
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Already normalized
    pub username: String,
    pub password_hash: String,
    pub current_rank: String,
}

/// A progress write produced by one evaluation
#[derive(Debug, Clone)]
pub struct ProgressWrite {
    pub progress: UserProgress,
    pub current_rank: String,
    /// Replace the avatar when set
    pub avatar: Option<String>,
}

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Short backend name for logs and `/health`
    fn backend(&self) -> &'static str;

    /// Create a player with zeroed progress.
    /// Fails with `Conflict` if the username is taken.
    async fn create_user(&self, user: NewUser) -> Result<UserRecord>;

    /// Active players only
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>>;

    /// Load by id, active or not. Fails with `NotFound`.
    async fn load(&self, user_id: &str) -> Result<UserRecord>;

    /// Store `write` if the player is still at `expected_revision`.
    ///
    /// Returns the new revision. Fails with `WriteConflict` if another write
    /// landed first, `NotFound` if the player does not exist or is inactive.
    async fn save_progress(
        &self,
        user_id: &str,
        expected_revision: i64,
        write: ProgressWrite,
    ) -> Result<i64>;

    /// Enable or disable a player. Disabling also bumps the token version,
    /// so tokens issued before the change stop working.
    async fn set_active(&self, user_id: &str, active: bool) -> Result<()>;

    /// Top `limit` active players by XP, ties by username
    async fn top_by_xp(&self, limit: usize) -> Result<Vec<UserRecord>>;

    /// Number of active players with strictly more XP than `xp`
    async fn count_ahead_of(&self, xp: u64) -> Result<u64>;
}
