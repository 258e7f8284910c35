//! Per-user progress record

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::level::level_for_xp;

/// Progress snapshot stored with every user.
///
/// Created zero-valued at registration and only changed by
/// [`ProgressEvaluator::evaluate`](super::ProgressEvaluator::evaluate).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    #[serde(default)]
    pub xp: u64,

    /// Unlocked achievement ids in unlock order; append-only, no duplicates
    #[serde(default)]
    pub achievements: Vec<String>,

    /// Consecutive calendar days with at least one play
    #[serde(default)]
    pub streak: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_played_date: Option<NaiveDate>,

    /// Plays per category
    #[serde(default)]
    pub category_progress: BTreeMap<String, u64>,
}

impl UserProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|a| a == id)
    }

    pub fn level(&self) -> u64 {
        level_for_xp(self.xp)
    }

    /// Play count for a category, zero if never played
    pub fn category_count(&self, category: &str) -> u64 {
        self.category_progress.get(category).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_progress_is_zeroed() {
        let progress = UserProgress::new();
        assert_eq!(progress.xp, 0);
        assert_eq!(progress.streak, 0);
        assert_eq!(progress.level(), 1);
        assert!(progress.achievements.is_empty());
        assert!(progress.last_played_date.is_none());
        assert_eq!(progress.category_count("Math"), 0);
    }

    #[test]
    fn test_serialized_field_names() {
        let mut progress = UserProgress::new();
        progress.last_played_date = NaiveDate::from_ymd_opt(2025, 3, 9);
        progress.category_progress.insert("Math".into(), 2);

        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["lastPlayedDate"], "2025-03-09");
        assert_eq!(json["categoryProgress"]["Math"], 2);
    }

    #[test]
    fn test_missing_fields_default() {
        let progress: UserProgress = serde_json::from_str(r#"{"xp": 120}"#).unwrap();
        assert_eq!(progress.xp, 120);
        assert!(progress.achievements.is_empty());
        assert!(progress.category_progress.is_empty());
    }
}
