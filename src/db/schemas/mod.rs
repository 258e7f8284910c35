//! MongoDB document schemas

mod metadata;
mod user;

pub use metadata::Metadata;
pub use user::{UserDoc, USER_COLLECTION};
