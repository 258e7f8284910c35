//! MongoDB-backed player store

use bson::{doc, oid::ObjectId, DateTime};

use super::{NewUser, ProgressWrite, UserRecord, UserStore, DEFAULT_AVATAR, DEFAULT_COUNTRY};
use crate::db::{MongoClient, MongoCollection, UserDoc, USER_COLLECTION};
use crate::types::{QuizError, Result};

pub struct MongoUserStore {
    users: MongoCollection<UserDoc>,
}

impl MongoUserStore {
    /// Open the users collection, creating its indexes
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: mongo.collection::<UserDoc>(USER_COLLECTION).await?,
        })
    }
}

fn parse_id(user_id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(user_id).map_err(|_| QuizError::NotFound("User not found".into()))
}

fn into_record(doc: UserDoc) -> Result<UserRecord> {
    let id = doc
        ._id
        .ok_or_else(|| QuizError::Database("User document without _id".into()))?;

    Ok(UserRecord {
        id: id.to_hex(),
        username: doc.username,
        password_hash: doc.password_hash,
        avatar: doc.avatar,
        country: doc.country,
        current_rank: doc.current_rank,
        progress: doc.progress,
        revision: doc.revision,
        token_version: u32::try_from(doc.token_version).map_err(|_| {
            QuizError::Database(format!(
                "User {} has invalid token version {}",
                id, doc.token_version
            ))
        })?,
        active: doc.is_active,
    })
}

/// XP as stored; values beyond i64 never come from validated input
fn xp_bson(xp: u64) -> i64 {
    i64::try_from(xp).unwrap_or(i64::MAX)
}

#[async_trait::async_trait]
impl UserStore for MongoUserStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn create_user(&self, user: NewUser) -> Result<UserRecord> {
        let mut doc = UserDoc::new(
            user.username,
            user.password_hash,
            DEFAULT_AVATAR.to_string(),
            DEFAULT_COUNTRY.to_string(),
            user.current_rank,
        );

        let id = self.users.insert_one(doc.clone()).await.map_err(|e| match e {
            QuizError::Conflict(_) => QuizError::Conflict("Username already taken".into()),
            other => other,
        })?;
        doc._id = Some(id);

        into_record(doc)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        self.users
            .find_one(doc! { "username": username, "is_active": { "$ne": false } })
            .await?
            .map(into_record)
            .transpose()
    }

    async fn load(&self, user_id: &str) -> Result<UserRecord> {
        let id = parse_id(user_id)?;
        let doc = self
            .users
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| QuizError::NotFound("User not found".into()))?;
        into_record(doc)
    }

    async fn save_progress(
        &self,
        user_id: &str,
        expected_revision: i64,
        write: ProgressWrite,
    ) -> Result<i64> {
        let id = parse_id(user_id)?;

        let mut set = doc! {
            "progress": bson::to_bson(&write.progress)?,
            "current_rank": write.current_rank,
            "metadata.updated_at": DateTime::now(),
        };
        if let Some(avatar) = write.avatar {
            set.insert("avatar", avatar);
        }

        let result = self
            .users
            .update_one(
                doc! { "_id": id, "revision": expected_revision, "is_active": { "$ne": false } },
                doc! { "$set": set, "$inc": { "revision": 1_i64 } },
            )
            .await?;

        if result.matched_count == 1 {
            return Ok(expected_revision + 1);
        }

        // Nothing matched: the revision moved, or the player is gone or disabled
        match self.users.find_one(doc! { "_id": id }).await? {
            Some(current) if current.is_active => Err(QuizError::WriteConflict(format!(
                "expected revision {}, found {}",
                expected_revision, current.revision
            ))),
            _ => Err(QuizError::NotFound("User not found".into())),
        }
    }

    async fn set_active(&self, user_id: &str, active: bool) -> Result<()> {
        let id = parse_id(user_id)?;

        let mut update = doc! {
            "$set": { "is_active": active, "metadata.updated_at": DateTime::now() },
        };
        if !active {
            // Only an active -> inactive change revokes tokens
            update.insert("$inc", doc! { "token_version": 1_i32 });
        }
        let filter = if active {
            doc! { "_id": id }
        } else {
            doc! { "_id": id, "is_active": { "$ne": false } }
        };

        let result = self.users.update_one(filter, update).await?;
        if result.matched_count == 1 {
            return Ok(());
        }

        // Already inactive is fine; a missing player is not
        match self.users.find_one(doc! { "_id": id }).await? {
            Some(_) => Ok(()),
            None => Err(QuizError::NotFound("User not found".into())),
        }
    }

    async fn top_by_xp(&self, limit: usize) -> Result<Vec<UserRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.users
            .find_sorted(
                doc! { "is_active": { "$ne": false } },
                doc! { "progress.xp": -1, "username": 1 },
                limit,
            )
            .await?
            .into_iter()
            .map(into_record)
            .collect()
    }

    async fn count_ahead_of(&self, xp: u64) -> Result<u64> {
        self.users
            .count(doc! {
                "progress.xp": { "$gt": xp_bson(xp) },
                "is_active": { "$ne": false },
            })
            .await
    }
}
