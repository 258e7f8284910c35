//! Timestamps shared by every document

use bson::DateTime;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    /// Fresh metadata stamped with the current time
    pub fn new() -> Self {
        let now = DateTime::now();
        Self {
            updated_at: Some(now),
            created_at: Some(now),
        }
    }
}
