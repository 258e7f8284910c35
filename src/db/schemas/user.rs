//! Player document schema
//!
//! Credentials, profile fields and the embedded progress record.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::progress::UserProgress;

pub const USER_COLLECTION: &str = "users";

/// Player document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Lowercased, unique
    pub username: String,

    /// Argon2 PHC string
    pub password_hash: String,

    #[serde(default)]
    pub avatar: String,

    #[serde(default)]
    pub country: String,

    /// Rank name as of the last write
    #[serde(default)]
    pub current_rank: String,

    #[serde(default)]
    pub progress: UserProgress,

    /// Bumped on every progress write; guards against lost updates
    #[serde(default)]
    pub revision: i64,

    /// Increment to invalidate all issued tokens
    #[serde(default)]
    pub token_version: i32,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl UserDoc {
    pub fn new(
        username: String,
        password_hash: String,
        avatar: String,
        country: String,
        current_rank: String,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            username,
            password_hash,
            avatar,
            country,
            current_rank,
            progress: UserProgress::new(),
            revision: 0,
            token_version: 1,
            is_active: true,
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "username": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("username_unique".to_string())
                        .build(),
                ),
            ),
            // Leaderboard and position queries
            (
                doc! { "progress.xp": -1, "username": 1 },
                Some(
                    IndexOptions::builder()
                        .name("xp_desc_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_doc() {
        let doc = UserDoc::new(
            "ada".into(),
            "$argon2id$...".into(),
            "Superhero".into(),
            "PH".into(),
            "Bronze I".into(),
        );
        assert!(doc._id.is_none());
        assert_eq!(doc.revision, 0);
        assert_eq!(doc.token_version, 1);
        assert!(doc.is_active);
        assert_eq!(doc.progress, UserProgress::new());
    }

    #[test]
    fn test_progress_embeds_as_subdocument() {
        let mut doc = UserDoc::new(
            "ada".into(),
            "hash".into(),
            "Superhero".into(),
            "PH".into(),
            "Bronze I".into(),
        );
        doc.progress.xp = 150;
        doc.progress.category_progress.insert("Math".into(), 3);

        let bson_doc = bson::to_document(&doc).unwrap();
        let progress = bson_doc.get_document("progress").unwrap();
        assert_eq!(progress.get_i64("xp").unwrap(), 150);
        assert_eq!(
            progress
                .get_document("categoryProgress")
                .unwrap()
                .get_i64("Math")
                .unwrap(),
            3
        );

        let back: UserDoc = bson::from_document(bson_doc).unwrap();
        assert_eq!(back.progress, doc.progress);
    }

    #[test]
    fn test_indexes() {
        let indices = UserDoc::into_indices();
        assert_eq!(indices.len(), 2);
        assert_eq!(indices[0].0, doc! { "username": 1 });
    }
}
