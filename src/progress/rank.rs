//! Rank table
//!
//! Ranks are XP thresholds with a display name and a nominal difficulty tag.
//! The table is sorted by ascending threshold, so resolution is a binary search.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::types::QuizError;

/// Nominal question difficulty associated with a rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
    Master,
    Legend,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
            Difficulty::Expert => write!(f, "expert"),
            Difficulty::Master => write!(f, "master"),
            Difficulty::Legend => write!(f, "legend"),
        }
    }
}

/// A single rank: name, minimum XP, difficulty tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankDefinition {
    pub name: String,
    pub min: u64,
    pub difficulty: Difficulty,
}

impl RankDefinition {
    pub fn new(name: impl Into<String>, min: u64, difficulty: Difficulty) -> Self {
        Self {
            name: name.into(),
            min,
            difficulty,
        }
    }

    /// Rank family with any Roman-numeral suffix removed ("Gold II" -> "Gold")
    pub fn tier(&self) -> &str {
        strip_roman_suffix(&self.name)
    }
}

/// Strip a trailing " I", " II", " IV"... from a rank name.
pub fn strip_roman_suffix(name: &str) -> &str {
    match name.rsplit_once(' ') {
        Some((base, suffix))
            if !base.is_empty()
                && !suffix.is_empty()
                && suffix.chars().all(|c| matches!(c, 'I' | 'V' | 'X')) =>
        {
            base
        }
        _ => name,
    }
}

const STANDARD_RANKS: &[(&str, u64, Difficulty)] = &[
    ("Bronze I", 0, Difficulty::Easy),
    ("Bronze II", 100, Difficulty::Easy),
    ("Bronze III", 200, Difficulty::Easy),
    ("Silver I", 300, Difficulty::Medium),
    ("Silver II", 500, Difficulty::Medium),
    ("Silver III", 700, Difficulty::Medium),
    ("Gold I", 1000, Difficulty::Hard),
    ("Gold II", 1500, Difficulty::Hard),
    ("Gold III", 2000, Difficulty::Hard),
    ("Platinum I", 3000, Difficulty::Expert),
    ("Platinum II", 4000, Difficulty::Expert),
    ("Platinum III", 5000, Difficulty::Expert),
    ("Diamond I", 7000, Difficulty::Master),
    ("Diamond II", 9000, Difficulty::Master),
    ("Diamond III", 12000, Difficulty::Master),
    ("Master", 15000, Difficulty::Legend),
    ("Grandmaster", 20000, Difficulty::Legend),
    ("Legend", 30000, Difficulty::Legend),
];

/// Immutable rank table, ordered by ascending threshold
#[derive(Debug, Clone)]
pub struct RankTable {
    ranks: Vec<RankDefinition>,
}

impl RankTable {
    /// Build a table from definitions.
    ///
    /// The lowest threshold must be 0, thresholds must be strictly increasing
    /// and names must be unique.
    pub fn new(ranks: Vec<RankDefinition>) -> Result<Self, QuizError> {
        let first = ranks
            .first()
            .ok_or_else(|| QuizError::Config("Rank table is empty".into()))?;
        if first.min != 0 {
            return Err(QuizError::Config(format!(
                "Lowest rank '{}' must start at 0 XP, found {}",
                first.name, first.min
            )));
        }

        for pair in ranks.windows(2) {
            if pair[1].min <= pair[0].min {
                return Err(QuizError::Config(format!(
                    "Rank thresholds must be strictly increasing ('{}' at {} follows '{}' at {})",
                    pair[1].name, pair[1].min, pair[0].name, pair[0].min
                )));
            }
        }

        let mut seen = HashSet::new();
        for rank in &ranks {
            if rank.name.trim().is_empty() {
                return Err(QuizError::Config("Rank name must not be empty".into()));
            }
            if !seen.insert(rank.name.as_str()) {
                return Err(QuizError::Config(format!("Duplicate rank name '{}'", rank.name)));
            }
        }

        Ok(Self { ranks })
    }

    /// The built-in 18-rank ladder, Bronze I through Legend
    pub fn standard() -> Self {
        Self {
            ranks: STANDARD_RANKS
                .iter()
                .map(|&(name, min, difficulty)| RankDefinition::new(name, min, difficulty))
                .collect(),
        }
    }

    /// Rank with the greatest threshold not above `xp`
    pub fn resolve(&self, xp: u64) -> &RankDefinition {
        let idx = self.ranks.partition_point(|rank| rank.min <= xp);
        // idx == 0 only if the lowest threshold exceeds xp, which `new` rules out
        &self.ranks[idx.saturating_sub(1)]
    }

    pub fn lowest(&self) -> &RankDefinition {
        &self.ranks[0]
    }

    pub fn get(&self, name: &str) -> Option<&RankDefinition> {
        self.ranks.iter().find(|rank| rank.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RankDefinition> {
        self.ranks.iter()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

impl Default for RankTable {
    fn default() -> Self {
        Self::standard()
    }
}
