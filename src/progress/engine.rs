//! Progress evaluator
//!
//! `(progress, event, today) -> (progress', unlocked)` as a pure function.
//! Steps run in a fixed order because every unlock adds XP that later steps
//! read:
//!
//! 1. base XP overwrite
//! 2. explicit achievement
//! 3. level milestones (ascending)
//! 4. rank tiers (Gold, Platinum, Diamond, Master, Legend)
//! 5. daily streak
//! 6. category play count
//! 7. speed and perfection
//!
//! No achievement is granted twice: every grant checks the achievement list.

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

use super::catalog::{AchievementDefinition, Catalog, UnlockRule};
use super::event::PlayEvent;
use super::level::level_for_xp;
use super::model::UserProgress;
use super::rank::RankDefinition;

/// An achievement unlocked by one evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedAchievement {
    pub id: String,
    pub xp_reward: u64,
}

/// Result of one evaluation
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub progress: UserProgress,
    /// Unlocks in the order they happened
    pub unlocked: Vec<UnlockedAchievement>,
    pub level: u64,
    pub rank: RankDefinition,
}

impl Evaluation {
    pub fn unlocked_ids(&self) -> impl Iterator<Item = &str> {
        self.unlocked.iter().map(|u| u.id.as_str())
    }
}

/// What happened to the streak on this call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// Already played today
    Unchanged,
    /// Played yesterday, streak grew by one
    Extended,
    /// First play ever, or a gap of more than one day
    Reset,
}

/// Next streak value given the previous play day and today.
pub fn advance_streak(
    streak: u32,
    last_played: Option<NaiveDate>,
    today: NaiveDate,
) -> (u32, StreakChange) {
    match last_played {
        Some(last) if last == today => (streak, StreakChange::Unchanged),
        Some(last) if (today - last).num_days() == 1 => {
            (streak.saturating_add(1), StreakChange::Extended)
        }
        _ => (1, StreakChange::Reset),
    }
}

/// Mutable state for one evaluation
struct Run {
    progress: UserProgress,
    unlocked: Vec<UnlockedAchievement>,
}

impl Run {
    /// Unlock `def` unless already held. Returns whether it was granted.
    fn grant(&mut self, def: &AchievementDefinition) -> bool {
        if self.progress.has_achievement(&def.id) {
            return false;
        }
        self.progress.achievements.push(def.id.clone());
        self.progress.xp = self.progress.xp.saturating_add(def.xp_reward);
        self.unlocked.push(UnlockedAchievement {
            id: def.id.clone(),
            xp_reward: def.xp_reward,
        });
        true
    }
}

/// Stateless evaluator over an immutable catalog
#[derive(Debug, Clone)]
pub struct ProgressEvaluator {
    catalog: Arc<Catalog>,
}

impl ProgressEvaluator {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn standard() -> Self {
        Self::new(Arc::new(Catalog::standard()))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn resolve_rank(&self, xp: u64) -> &RankDefinition {
        self.catalog.ranks.resolve(xp)
    }

    /// Apply `event` to `current` as of calendar day `today`.
    pub fn evaluate(&self, current: &UserProgress, event: &PlayEvent, today: NaiveDate) -> Evaluation {
        let achievements = &self.catalog.achievements;
        let mut run = Run {
            progress: current.clone(),
            unlocked: Vec::new(),
        };

        // 1. Legacy contract: the client sends an absolute total and it is trusted.
        if let Some(xp) = event.xp {
            run.progress.xp = xp;
        }

        // 2. Unknown ids are ignored
        if let Some(def) = event.achievement_id.as_deref().and_then(|id| achievements.get(id)) {
            run.grant(def);
        }

        // 3. Each milestone re-reads XP, so rewards can cascade into the next one
        for def in achievements.level_milestones() {
            if let UnlockRule::LevelMilestone { level } = def.rule {
                if level_for_xp(run.progress.xp) >= level {
                    run.grant(def);
                }
            }
        }

        // 4. Rank is resolved once, after all level rewards
        let rank = self.catalog.ranks.resolve(run.progress.xp).clone();
        for def in achievements.rank_tiers() {
            if let UnlockRule::RankTier { tier } = def.rule {
                if tier.matches(&rank) {
                    run.grant(def);
                }
            }
        }

        // 5. Streak
        let (streak, change) = advance_streak(run.progress.streak, run.progress.last_played_date, today);
        if change != StreakChange::Unchanged {
            run.progress.streak = streak;
            run.progress.last_played_date = Some(today);

            for def in achievements.with_rule(|rule| matches!(rule, UnlockRule::StreakReached { .. })) {
                if let UnlockRule::StreakReached { days } = def.rule {
                    if run.progress.streak == days {
                        run.grant(def);
                    }
                }
            }
        }

        // 6. Category plays
        if let Some(category) = event.category.as_deref() {
            let count = run
                .progress
                .category_progress
                .entry(category.to_string())
                .or_insert(0);
            *count = count.saturating_add(1);
            let count = *count;

            for def in achievements.with_rule(|rule| matches!(rule, UnlockRule::CategoryCount { .. })) {
                if let UnlockRule::CategoryCount { category: ref wanted, count: needed } = def.rule {
                    if wanted == category && count >= needed {
                        run.grant(def);
                    }
                }
            }
        }

        // 7. Speed, then perfection
        if let Some(seconds) = event.time_taken_seconds {
            for def in achievements.with_rule(|rule| matches!(rule, UnlockRule::FasterThan { .. })) {
                if let UnlockRule::FasterThan { seconds: limit } = def.rule {
                    if seconds < limit {
                        run.grant(def);
                    }
                }
            }
        }
        if event.is_perfect {
            for def in achievements.with_rule(|rule| matches!(rule, UnlockRule::Perfect)) {
                run.grant(def);
            }
        }

        let level = level_for_xp(run.progress.xp);
        let rank = self.catalog.ranks.resolve(run.progress.xp).clone();

        Evaluation {
            progress: run.progress,
            unlocked: run.unlocked,
            level,
            rank,
        }
    }
}

impl Default for ProgressEvaluator {
    fn default() -> Self {
        Self::standard()
    }
}
