//! Application services

pub mod player;

pub use player::{
    normalize_username, AuthResponse, Credentials, LeaderboardEntry, PlayerService,
    PlayerSettings, PlayerSummary, ProfileView, UpdateView,
};
