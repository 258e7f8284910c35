//! HTTP routes

pub mod api;
pub mod health;
pub mod response;

pub use api::handle_api_request;
pub use health::{health_check, root_message, version_info, LIVE_MESSAGE};
pub use response::{
    cors_preflight, error_response, json_response, method_not_allowed, not_found_response,
    BoxBody, MAX_BODY_BYTES,
};
