//! Achievement and rank catalog
//!
//! The catalog is static configuration: built in, or read once at startup from
//! a JSON file given by `CATALOG_PATH`. It is never mutated afterwards.
//!
//! Each achievement carries an [`UnlockRule`]. The evaluator walks the rules
//! step by step in a fixed order, so adding an achievement with an existing
//! rule kind needs no code change.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::rank::{RankDefinition, RankTable};
use crate::types::QuizError;

/// Rank families that can carry an achievement, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankTier {
    Gold,
    Platinum,
    Diamond,
    Master,
    Legend,
}

impl RankTier {
    /// Whether `rank` belongs to this tier.
    ///
    /// Gold matches the three literal Gold names and Legend only the exact name;
    /// the others compare the name with its Roman-numeral suffix stripped.
    pub fn matches(&self, rank: &RankDefinition) -> bool {
        match self {
            RankTier::Gold => matches!(rank.name.as_str(), "Gold I" | "Gold II" | "Gold III"),
            RankTier::Platinum => rank.tier() == "Platinum",
            RankTier::Diamond => rank.tier() == "Diamond",
            RankTier::Master => rank.tier() == "Master",
            RankTier::Legend => rank.name == "Legend",
        }
    }
}

/// Condition under which an achievement unlocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnlockRule {
    /// Only via an explicit `achievementId` in the play event
    Explicit,
    /// Level reaches at least `level`
    LevelMilestone { level: u64 },
    /// Current rank belongs to `tier`
    RankTier { tier: RankTier },
    /// Streak becomes exactly `days`
    StreakReached { days: u32 },
    /// Plays of `category` reach at least `count`
    CategoryCount { category: String, count: u64 },
    /// Quiz answered in strictly less than `seconds`
    FasterThan { seconds: f64 },
    /// Quiz finished without mistakes
    Perfect,
}

/// A one-time unlockable achievement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDefinition {
    pub id: String,
    pub name: String,
    pub xp_reward: u64,
    pub rule: UnlockRule,
}

impl AchievementDefinition {
    pub fn new(id: &str, name: &str, xp_reward: u64, rule: UnlockRule) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            xp_reward,
            rule,
        }
    }
}

fn standard_achievements() -> Vec<AchievementDefinition> {
    let tier = |tier| UnlockRule::RankTier { tier };

    vec![
        AchievementDefinition::new("first_win", "First Win", 50, UnlockRule::Explicit),
        AchievementDefinition::new("level_50", "Level 50", 500, UnlockRule::LevelMilestone { level: 50 }),
        AchievementDefinition::new("level_100", "Level 100", 1000, UnlockRule::LevelMilestone { level: 100 }),
        AchievementDefinition::new("level_200", "Level 200", 2000, UnlockRule::LevelMilestone { level: 200 }),
        AchievementDefinition::new("rank_gold", "Gold League", 250, tier(RankTier::Gold)),
        AchievementDefinition::new("rank_platinum", "Platinum League", 500, tier(RankTier::Platinum)),
        AchievementDefinition::new("rank_diamond", "Diamond League", 750, tier(RankTier::Diamond)),
        AchievementDefinition::new("rank_master", "Master", 1000, tier(RankTier::Master)),
        AchievementDefinition::new("rank_legend", "Legend", 2000, tier(RankTier::Legend)),
        AchievementDefinition::new("streak_3", "On Fire", 100, UnlockRule::StreakReached { days: 3 }),
        AchievementDefinition::new(
            "math_master",
            "Math Master",
            200,
            UnlockRule::CategoryCount {
                category: "Math".to_string(),
                count: 5,
            },
        ),
        AchievementDefinition::new("speed_demon", "Speed Demon", 75, UnlockRule::FasterThan { seconds: 10.0 }),
        AchievementDefinition::new("perfect_score", "Perfect Score", 100, UnlockRule::Perfect),
    ]
}

/// Immutable achievement lookup with per-step evaluation order
#[derive(Debug, Clone)]
pub struct AchievementTable {
    definitions: Vec<AchievementDefinition>,
    by_id: HashMap<String, usize>,
    level_order: Vec<usize>,
    rank_order: Vec<usize>,
}

impl AchievementTable {
    /// Build a table; ids must be unique and non-empty.
    pub fn new(definitions: Vec<AchievementDefinition>) -> Result<Self, QuizError> {
        let mut by_id = HashMap::with_capacity(definitions.len());

        for (idx, def) in definitions.iter().enumerate() {
            if def.id.trim().is_empty() {
                return Err(QuizError::Config("Achievement id must not be empty".into()));
            }
            if by_id.insert(def.id.clone(), idx).is_some() {
                return Err(QuizError::Config(format!("Duplicate achievement id '{}'", def.id)));
            }
            if let UnlockRule::FasterThan { seconds } = def.rule {
                if !seconds.is_finite() || seconds <= 0.0 {
                    return Err(QuizError::Config(format!(
                        "Achievement '{}' needs a positive time limit",
                        def.id
                    )));
                }
            }
        }

        // Level milestones ascending, rank tiers Gold -> Legend; ties keep declaration order
        let mut level_order: Vec<(u64, usize)> = definitions
            .iter()
            .enumerate()
            .filter_map(|(idx, def)| match def.rule {
                UnlockRule::LevelMilestone { level } => Some((level, idx)),
                _ => None,
            })
            .collect();
        level_order.sort_by_key(|&(level, idx)| (level, idx));

        let mut rank_order: Vec<(RankTier, usize)> = definitions
            .iter()
            .enumerate()
            .filter_map(|(idx, def)| match def.rule {
                UnlockRule::RankTier { tier } => Some((tier, idx)),
                _ => None,
            })
            .collect();
        rank_order.sort_by_key(|&(tier, idx)| (tier, idx));

        Ok(Self {
            definitions,
            by_id,
            level_order: level_order.into_iter().map(|(_, idx)| idx).collect(),
            rank_order: rank_order.into_iter().map(|(_, idx)| idx).collect(),
        })
    }

    pub fn standard() -> Self {
        Self::new(standard_achievements()).expect("built-in achievement table is valid")
    }

    pub fn get(&self, id: &str) -> Option<&AchievementDefinition> {
        self.by_id.get(id).map(|&idx| &self.definitions[idx])
    }

    /// All definitions in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &AchievementDefinition> {
        self.definitions.iter()
    }

    /// Level milestone achievements, ascending by milestone
    pub fn level_milestones(&self) -> impl Iterator<Item = &AchievementDefinition> {
        self.level_order.iter().map(|&idx| &self.definitions[idx])
    }

    /// Rank tier achievements, Gold first and Legend last
    pub fn rank_tiers(&self) -> impl Iterator<Item = &AchievementDefinition> {
        self.rank_order.iter().map(|&idx| &self.definitions[idx])
    }

    /// Definitions whose rule satisfies `pred`, in declaration order
    pub fn with_rule<'a, F>(&'a self, pred: F) -> impl Iterator<Item = &'a AchievementDefinition>
    where
        F: Fn(&UnlockRule) -> bool + 'a,
    {
        self.definitions.iter().filter(move |def| pred(&def.rule))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for AchievementTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// On-disk catalog format; a missing section keeps the built-in table
#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    ranks: Option<Vec<RankDefinition>>,
    #[serde(default)]
    achievements: Option<Vec<AchievementDefinition>>,
}

/// Rank and achievement tables, loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub ranks: RankTable,
    pub achievements: AchievementTable,
}

impl Catalog {
    pub fn standard() -> Self {
        Self {
            ranks: RankTable::standard(),
            achievements: AchievementTable::standard(),
        }
    }

    /// Parse a catalog from JSON text
    pub fn from_json(json: &str) -> Result<Self, QuizError> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| QuizError::Config(format!("Invalid catalog JSON: {}", e)))?;

        let ranks = match file.ranks {
            Some(ranks) => RankTable::new(ranks)?,
            None => RankTable::standard(),
        };
        let achievements = match file.achievements {
            Some(defs) => AchievementTable::new(defs)?,
            None => AchievementTable::standard(),
        };

        Ok(Self { ranks, achievements })
    }

    /// Load the catalog file, or the built-in tables when no path is configured
    pub fn load(path: Option<&Path>) -> Result<Self, QuizError> {
        let Some(path) = path else {
            return Ok(Self::standard());
        };

        let json = std::fs::read_to_string(path).map_err(|e| {
            QuizError::Config(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_json(&json)?;

        info!(
            "Loaded catalog from {} ({} ranks, {} achievements)",
            path.display(),
            catalog.ranks.len(),
            catalog.achievements.len()
        );
        Ok(catalog)
    }
}
