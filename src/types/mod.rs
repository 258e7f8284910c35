//! Shared types

pub mod error;

pub use error::{QuizError, Result};
