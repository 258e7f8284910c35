//! MongoDB storage
//!
//! Typed collections over schemas that carry their own index definitions.

pub mod mongo;
pub mod schemas;

pub use mongo::{is_duplicate_key, IntoIndexes, MongoClient, MongoCollection, MutMetadata};
pub use schemas::{Metadata, UserDoc, USER_COLLECTION};
