//! Protocol version check for mutating requests

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::GatewayError;
use crate::SharedState;

/// Reject non-GET/HEAD requests without a supported protocol version header
pub async fn require_version(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    if matches!(*request.method(), Method::GET | Method::HEAD) {
        return next.run(request).await;
    }

    let header = state.config.protocol_header.as_str();
    let Some(value) = request.headers().get(header) else {
        return GatewayError::MissingProtocolVersion(header.to_string()).into_response();
    };

    let version = value.to_str().unwrap_or_default().trim();
    if state
        .config
        .supported_versions
        .iter()
        .any(|supported| supported == version)
    {
        next.run(request).await
    } else {
        GatewayError::UnsupportedProtocolVersion(version.to_string()).into_response()
    }
}
