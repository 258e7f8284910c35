//! Player service
//!
//! Registration, login, token authentication and the fetch-evaluate-persist
//! cycle behind `/api/update`. Route handlers stay thin: they parse the
//! request, call in here and serialize the returned view.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::{
    extract_token_from_header, hash_password, verify_password, JwtValidator, TokenInput,
    MIN_PASSWORD_LEN,
};
use crate::config::Args;
use crate::logging::ActivityLogger;
use crate::progress::{
    Difficulty, PlayEvent, ProgressEvaluator, UnlockedAchievement, UpdateRequest, ValidationMode,
};
use crate::store::{NewUser, ProgressWrite, UserRecord, UserStore};
use crate::types::{QuizError, Result};

/// Shortest accepted username
pub const MIN_USERNAME_LEN: usize = 3;

/// Longest accepted username
pub const MAX_USERNAME_LEN: usize = 32;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Tunables taken from [`Args`]
#[derive(Debug, Clone)]
pub struct PlayerSettings {
    pub leaderboard_limit: usize,
    /// Total attempts per update, including the first
    pub update_retries: u32,
    pub validation_mode: ValidationMode,
    pub xp_jump_warn: u64,
}

impl PlayerSettings {
    pub fn from_args(args: &Args) -> Self {
        Self {
            leaderboard_limit: args.leaderboard_limit,
            update_retries: args.update_retries,
            validation_mode: args.validation_mode(),
            xp_jump_warn: args.xp_jump_warn,
        }
    }
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            leaderboard_limit: 10,
            update_retries: 3,
            validation_mode: ValidationMode::Strict,
            xp_jump_warn: 5000,
        }
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Player summary returned with a token
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub username: String,
    pub xp: u64,
    pub avatar: String,
    pub level: u64,
    pub rank: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: PlayerSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub username: String,
    pub xp: u64,
    pub avatar: String,
    pub country: String,
    pub level: u64,
    pub rank: String,
    pub difficulty: Difficulty,
    pub streak: u32,
    pub achievements: Vec<String>,
    pub category_progress: BTreeMap<String, u64>,
    /// 1 + players with strictly more XP
    pub leaderboard_position: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: String,
    pub username: String,
    pub xp: u64,
    pub avatar: String,
    pub level: u64,
    pub rank: String,
    pub position: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateView {
    pub xp: u64,
    pub avatar: String,
    pub level: u64,
    pub rank: String,
    pub difficulty: Difficulty,
    pub streak: u32,
    pub achievements: Vec<String>,
    pub unlocked_achievements: Vec<UnlockedAchievement>,
}

// =============================================================================
// Service
// =============================================================================

pub struct PlayerService {
    store: Arc<dyn UserStore>,
    evaluator: ProgressEvaluator,
    jwt: JwtValidator,
    activity: ActivityLogger,
    settings: PlayerSettings,
}

/// Trimmed and lowercased, so lookups are case-insensitive
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

impl PlayerService {
    pub fn new(
        store: Arc<dyn UserStore>,
        evaluator: ProgressEvaluator,
        jwt: JwtValidator,
        activity: ActivityLogger,
        settings: PlayerSettings,
    ) -> Self {
        Self {
            store,
            evaluator,
            jwt,
            activity,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    pub fn evaluator(&self) -> &ProgressEvaluator {
        &self.evaluator
    }

    fn summary(&self, user: &UserRecord) -> PlayerSummary {
        PlayerSummary {
            username: user.username.clone(),
            xp: user.progress.xp,
            avatar: user.avatar.clone(),
            level: user.progress.level(),
            rank: self.evaluator.resolve_rank(user.progress.xp).name.clone(),
        }
    }

    fn issue_token(&self, user: &UserRecord) -> Result<AuthResponse> {
        let token = self.jwt.generate_token(TokenInput {
            user_id: user.id.clone(),
            username: user.username.clone(),
            token_version: user.token_version,
        })?;

        Ok(AuthResponse {
            token,
            user: self.summary(user),
        })
    }

    /// POST /api/register
    pub async fn register(&self, credentials: Credentials) -> Result<AuthResponse> {
        if credentials.username.trim().is_empty() || credentials.password.is_empty() {
            return Err(QuizError::BadRequest(
                "Username and password are required".into(),
            ));
        }

        let username = normalize_username(&credentials.username);
        let len = username.chars().count();
        if len < MIN_USERNAME_LEN {
            return Err(QuizError::BadRequest(format!(
                "Username must be at least {} characters",
                MIN_USERNAME_LEN
            )));
        }
        if len > MAX_USERNAME_LEN {
            return Err(QuizError::BadRequest(format!(
                "Username must be at most {} characters",
                MAX_USERNAME_LEN
            )));
        }
        if credentials.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(QuizError::BadRequest(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let password_hash = hash_password(&credentials.password)?;
        let user = self
            .store
            .create_user(NewUser {
                username,
                password_hash,
                current_rank: self.evaluator.catalog().ranks.lowest().name.clone(),
            })
            .await
            .map_err(|e| match e {
                QuizError::Conflict(_) => QuizError::Conflict("Username taken".into()),
                other => other,
            })?;

        info!(username = %user.username, "Player registered");
        self.activity.log_registered(&user.id, &user.username).await;

        self.issue_token(&user)
    }

    /// POST /api/login
    pub async fn login(&self, credentials: Credentials) -> Result<AuthResponse> {
        if credentials.username.trim().is_empty() || credentials.password.is_empty() {
            return Err(QuizError::BadRequest(
                "Username and password are required".into(),
            ));
        }

        let username = normalize_username(&credentials.username);
        let Some(user) = self.store.find_by_username(&username).await? else {
            warn!(%username, "Login failed - unknown user");
            self.activity.log_auth_failure("unknown user").await;
            return Err(QuizError::Unauthorized(INVALID_CREDENTIALS.into()));
        };

        if !verify_password(&credentials.password, &user.password_hash)? {
            warn!(%username, "Login failed - invalid password");
            self.activity.log_auth_failure("invalid password").await;
            return Err(QuizError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        info!(%username, "Player logged in");
        self.activity.log_logged_in(&user.id, &user.username).await;

        self.issue_token(&user)
    }

    /// Resolve the player behind an `Authorization` header
    pub async fn authenticate(&self, auth_header: Option<&str>) -> Result<UserRecord> {
        let Some(token) = extract_token_from_header(auth_header) else {
            return Err(QuizError::Unauthorized("No token provided".into()));
        };

        let claims = match self.jwt.verify_token(token).into_claims() {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Token rejected: {}", e);
                self.activity.log_auth_failure("invalid token").await;
                return Err(e);
            }
        };

        let user = match self.store.load(&claims.sub).await {
            Ok(user) => user,
            Err(QuizError::NotFound(_)) => {
                self.activity.log_auth_failure("unknown user in token").await;
                return Err(QuizError::Unauthorized("Invalid token".into()));
            }
            Err(e) => return Err(e),
        };

        if !user.active {
            self.activity.log_auth_failure("inactive user").await;
            return Err(QuizError::Unauthorized("Account disabled".into()));
        }

        if user.token_version != claims.version {
            self.activity.log_auth_failure("revoked token").await;
            return Err(QuizError::Unauthorized("Token has been revoked".into()));
        }

        Ok(user)
    }

    /// GET /api/profile
    pub async fn profile(&self, user: &UserRecord) -> Result<ProfileView> {
        let rank = self.evaluator.resolve_rank(user.progress.xp);
        let ahead = self.store.count_ahead_of(user.progress.xp).await?;

        Ok(ProfileView {
            username: user.username.clone(),
            xp: user.progress.xp,
            avatar: user.avatar.clone(),
            country: user.country.clone(),
            level: user.progress.level(),
            rank: rank.name.clone(),
            difficulty: rank.difficulty,
            streak: user.progress.streak,
            achievements: user.progress.achievements.clone(),
            category_progress: user.progress.category_progress.clone(),
            leaderboard_position: ahead + 1,
        })
    }

    /// GET /api/leaderboard
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let top = self.store.top_by_xp(self.settings.leaderboard_limit).await?;

        Ok(top
            .into_iter()
            .zip(1u64..)
            .map(|(user, position)| LeaderboardEntry {
                rank: self.evaluator.resolve_rank(user.progress.xp).name.clone(),
                level: user.progress.level(),
                xp: user.progress.xp,
                id: user.id,
                username: user.username,
                avatar: user.avatar,
                position,
            })
            .collect())
    }

    /// POST /api/update, dated by the server's local calendar day
    pub async fn update(&self, user: UserRecord, request: &UpdateRequest) -> Result<UpdateView> {
        self.update_on(user, request, Local::now().date_naive()).await
    }

    /// Evaluate and persist one play event.
    ///
    /// The write is conditional on the revision that was evaluated. If another
    /// update for the same player lands first, the player is reloaded and the
    /// event evaluated again, up to `update_retries` attempts in total.
    pub async fn update_on(
        &self,
        mut user: UserRecord,
        request: &UpdateRequest,
        today: NaiveDate,
    ) -> Result<UpdateView> {
        let update = request.validate(self.settings.validation_mode)?;
        let mut attempt = 1;

        loop {
            self.check_xp_jump(&user, &update.event);
            let eval = self.evaluator.evaluate(&user.progress, &update.event, today);

            let write = ProgressWrite {
                progress: eval.progress.clone(),
                current_rank: eval.rank.name.clone(),
                avatar: update.avatar.clone(),
            };

            match self.store.save_progress(&user.id, user.revision, write).await {
                Ok(_) => {
                    for unlocked in &eval.unlocked {
                        info!(
                            username = %user.username,
                            achievement = %unlocked.id,
                            xp_reward = unlocked.xp_reward,
                            "Achievement unlocked"
                        );
                        self.activity
                            .log_unlock(&user.id, &user.username, &unlocked.id, unlocked.xp_reward)
                            .await;
                    }
                    self.activity
                        .log_progress(&user.id, &user.username, eval.progress.xp)
                        .await;

                    return Ok(UpdateView {
                        xp: eval.progress.xp,
                        avatar: update.avatar.unwrap_or(user.avatar),
                        level: eval.level,
                        rank: eval.rank.name,
                        difficulty: eval.rank.difficulty,
                        streak: eval.progress.streak,
                        achievements: eval.progress.achievements,
                        unlocked_achievements: eval.unlocked,
                    });
                }
                Err(QuizError::WriteConflict(reason)) if attempt < self.settings.update_retries => {
                    debug!(username = %user.username, attempt, %reason, "Progress write lost a race, retrying");
                    attempt += 1;
                    user = self.store.load(&user.id).await?;
                }
                Err(e) => {
                    if matches!(e, QuizError::WriteConflict(_)) {
                        warn!(username = %user.username, attempts = attempt, "Giving up on contended progress write");
                    }
                    return Err(e);
                }
            }
        }
    }

    /// The client sends an absolute XP total and it is stored as-is. Large
    /// moves in either direction are logged for review.
    fn check_xp_jump(&self, user: &UserRecord, event: &PlayEvent) {
        if let Some(xp) = event.xp {
            let delta = xp.abs_diff(user.progress.xp);
            if delta > self.settings.xp_jump_warn {
                warn!(
                    username = %user.username,
                    from = user.progress.xp,
                    to = xp,
                    "Client-submitted XP total moved by {}",
                    delta
                );
            }
        }
    }
}
