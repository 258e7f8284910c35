//! HTTP server
//!
//! hyper http1 with TokioIo, one task per connection.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::Args;
use crate::routes::{self, BoxBody};
use crate::services::PlayerService;
use crate::types::QuizError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub players: Arc<PlayerService>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, players: Arc<PlayerService>) -> Self {
        Self {
            args,
            players,
            started_at: Instant::now(),
        }
    }
}

/// Accept connections until the process is stopped
pub async fn run(state: Arc<AppState>) -> Result<(), QuizError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Super Quiz Hero listening on {} as node {} ({} store)",
        state.args.listen,
        state.args.node_id,
        state.players.store().backend()
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - do not use in production");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        debug!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route one request
pub async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    if path.starts_with("/api/") {
        if let Some(response) = routes::handle_api_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(routes::not_found_response(&path));
    }

    let response = match (method, path.as_str()) {
        (Method::GET, "/") => routes::root_message(),
        (Method::GET, "/health") | (Method::GET, "/healthz") => routes::health_check(&state),
        (Method::GET, "/version") => routes::version_info(),

        (Method::OPTIONS, _) => routes::cors_preflight(),

        (_, "/") | (_, "/health") | (_, "/healthz") | (_, "/version") => {
            routes::method_not_allowed()
        }

        _ => routes::not_found_response(&path),
    };

    Ok(response)
}
