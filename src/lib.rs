//! Super Quiz Hero backend
//!
//! Player accounts and game progress for the Super Quiz Hero client:
//! registration and login, XP, levels, ranks, daily streaks and
//! achievements, persisted in MongoDB.
//!
//! ## Modules
//!
//! - **progress**: Rank and achievement tables and the progress evaluator
//! - **store**: Player persistence (MongoDB or in-memory)
//! - **services**: Register, login, profile, leaderboard and update flows
//! - **routes** / **server**: JSON over HTTP

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod progress;
pub mod routes;
pub mod server;
pub mod services;
pub mod store;
pub mod types;

pub use config::Args;
pub use types::{QuizError, Result};
