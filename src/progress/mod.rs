//! Progress engine: XP, levels, ranks, streaks and achievements
//!
//! Everything here is synchronous and free of I/O apart from reading the
//! optional catalog file at startup. Persistence lives in [`crate::store`].

pub mod catalog;
pub mod engine;
pub mod event;
pub mod level;
pub mod model;
pub mod rank;

pub use catalog::{AchievementDefinition, AchievementTable, Catalog, RankTier, UnlockRule};
pub use engine::{advance_streak, Evaluation, ProgressEvaluator, StreakChange, UnlockedAchievement};
pub use event::{PlayEvent, UpdateRequest, ValidatedUpdate, ValidationMode};
pub use level::{level_for_xp, XP_PER_LEVEL};
pub use model::UserProgress;
pub use rank::{Difficulty, RankDefinition, RankTable};
