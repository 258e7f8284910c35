//! Game API
//!
//! - POST /api/register    - Create an account, returns a token
//! - POST /api/login       - Exchange credentials for a token
//! - POST /api/update      - Record a play event (bearer)
//! - GET  /api/profile     - Player profile (bearer)
//! - GET  /api/leaderboard - Top players by XP (bearer)

use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::progress::UpdateRequest;
use crate::routes::response::{
    cors_preflight, error_response, get_auth_header, json_response, method_not_allowed,
    not_found_response, parse_json_body, BoxBody,
};
use crate::server::AppState;
use crate::services::Credentials;
use crate::types::Result;

type Incoming = hyper::body::Incoming;

/// Handle `/api/*`. Returns `None` for other paths.
pub async fn handle_api_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().to_string();
    if !path.starts_with("/api/") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let method = req.method().clone();
    let result = match (&method, path.as_str()) {
        (&Method::POST, "/api/register") => handle_register(req, &state).await,
        (&Method::POST, "/api/login") => handle_login(req, &state).await,
        (&Method::POST, "/api/update") => handle_update(req, &state).await,
        (&Method::GET, "/api/profile") => handle_profile(req, &state).await,
        (&Method::GET, "/api/leaderboard") => handle_leaderboard(req, &state).await,

        (_, "/api/register")
        | (_, "/api/login")
        | (_, "/api/update")
        | (_, "/api/profile")
        | (_, "/api/leaderboard") => return Some(method_not_allowed()),

        _ => return Some(not_found_response(&path)),
    };

    Some(result.unwrap_or_else(|e| error_response(&e)))
}

async fn handle_register(req: Request<Incoming>, state: &AppState) -> Result<Response<BoxBody>> {
    let credentials: Credentials = parse_json_body(req).await?;
    let auth = state.players.register(credentials).await?;
    Ok(json_response(StatusCode::OK, &auth))
}

async fn handle_login(req: Request<Incoming>, state: &AppState) -> Result<Response<BoxBody>> {
    let credentials: Credentials = parse_json_body(req).await?;
    let auth = state.players.login(credentials).await?;
    Ok(json_response(StatusCode::OK, &auth))
}

async fn handle_update(req: Request<Incoming>, state: &AppState) -> Result<Response<BoxBody>> {
    let user = state.players.authenticate(get_auth_header(&req)).await?;
    let request: UpdateRequest = parse_json_body(req).await?;
    let view = state.players.update(user, &request).await?;
    Ok(json_response(StatusCode::OK, &view))
}

async fn handle_profile(req: Request<Incoming>, state: &AppState) -> Result<Response<BoxBody>> {
    let user = state.players.authenticate(get_auth_header(&req)).await?;
    let profile = state.players.profile(&user).await?;
    Ok(json_response(StatusCode::OK, &profile))
}

async fn handle_leaderboard(req: Request<Incoming>, state: &AppState) -> Result<Response<BoxBody>> {
    state.players.authenticate(get_auth_header(&req)).await?;
    let board = state.players.leaderboard().await?;
    Ok(json_response(StatusCode::OK, &board))
}
