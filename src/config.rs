//! Configuration for the Super Quiz Hero server
//!
//! Every option can be given as a flag or an environment variable;
//! `main` loads a `.env` file first.

use clap::{ArgAction, Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use uuid::Uuid;

use crate::auth::{JwtValidator, DEFAULT_TOKEN_EXPIRY_SECONDS};
use crate::progress::ValidationMode;
use crate::types::QuizError;

/// Upper bound for `LEADERBOARD_LIMIT`
pub const MAX_LEADERBOARD_LIMIT: usize = 100;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Super Quiz Hero API server
#[derive(Parser, Debug, Clone)]
#[command(name = "quizhero")]
#[command(about = "Accounts, XP, ranks, streaks and achievements for Super Quiz Hero")]
pub struct Args {
    /// Identifier for this server instance, recorded in the activity log
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// Development mode: fixed JWT secret, in-memory store if MongoDB is down
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    #[arg(long, env = "MONGODB_DB", default_value = "quizhero")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value_t = DEFAULT_TOKEN_EXPIRY_SECONDS)]
    pub jwt_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// JSON file replacing the built-in rank and/or achievement tables
    #[arg(long, env = "CATALOG_PATH")]
    pub catalog_path: Option<PathBuf>,

    /// Players returned by the leaderboard
    #[arg(long, env = "LEADERBOARD_LIMIT", default_value = "10")]
    pub leaderboard_limit: usize,

    /// Attempts per update when concurrent writes collide
    #[arg(long, env = "UPDATE_RETRIES", default_value = "3")]
    pub update_retries: u32,

    /// Reject updates with invalid fields instead of dropping the fields
    #[arg(long, env = "STRICT_EVENTS", default_value = "true", action = ArgAction::Set)]
    pub strict_events: bool,

    /// Warn when a client-submitted XP total moves by more than this
    #[arg(long, env = "XP_JUMP_WARN", default_value = "5000")]
    pub xp_jump_warn: u64,

    /// JSONL activity log path (disabled if unset)
    #[arg(long, env = "ACTIVITY_LOG")]
    pub activity_log: Option<PathBuf>,
}

impl Args {
    /// Token validator for the configured secret; dev mode falls back to a fixed one
    pub fn jwt_validator(&self) -> Result<JwtValidator, QuizError> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => JwtValidator::new(secret.clone(), self.jwt_expiry_seconds),
            (None, true) => Ok(JwtValidator::new_dev()),
            (None, false) => Err(QuizError::Config(
                "JWT_SECRET is required in production mode".into(),
            )),
        }
    }

    pub fn validation_mode(&self) -> ValidationMode {
        if self.strict_events {
            ValidationMode::Strict
        } else {
            ValidationMode::Lenient
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.leaderboard_limit == 0 || self.leaderboard_limit > MAX_LEADERBOARD_LIMIT {
            return Err(format!(
                "LEADERBOARD_LIMIT must be between 1 and {}",
                MAX_LEADERBOARD_LIMIT
            ));
        }

        if self.update_retries == 0 {
            return Err("UPDATE_RETRIES must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::parse_from(std::iter::once("quizhero").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--dev-mode"]);
        assert_eq!(args.listen.port(), 5000);
        assert_eq!(args.mongodb_db, "quizhero");
        assert_eq!(args.jwt_expiry_seconds, 7 * 24 * 60 * 60);
        assert_eq!(args.leaderboard_limit, 10);
        assert_eq!(args.update_retries, 3);
        assert_eq!(args.validation_mode(), ValidationMode::Strict);
        assert_eq!(args.log_format, LogFormat::Text);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_production_needs_secret() {
        let mut args = parse(&["--dev-mode"]);
        args.dev_mode = false;
        args.jwt_secret = None;
        assert!(args.validate().is_err());
        assert!(args.jwt_validator().is_err());

        args.jwt_secret = Some("a-production-secret-of-at-least-32-chars".into());
        assert!(args.validate().is_ok());
        assert!(args.jwt_validator().is_ok());
    }

    #[test]
    fn test_limits() {
        let mut args = parse(&["--dev-mode"]);
        args.leaderboard_limit = 0;
        assert!(args.validate().is_err());
        args.leaderboard_limit = 101;
        assert!(args.validate().is_err());
        args.leaderboard_limit = 100;
        args.update_retries = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_lenient_events() {
        let args = parse(&["--dev-mode", "--strict-events", "false", "--log-format", "json"]);
        assert_eq!(args.validation_mode(), ValidationMode::Lenient);
        assert_eq!(args.log_format, LogFormat::Json);
    }
}
