//! HTTP command handlers
//!
//! Each file handles one resource family; `router` wires them together.

pub mod clone;
pub mod commit;
pub mod file;
pub mod index;
pub mod links;
pub mod project;
pub mod protocol;
pub mod remote;
pub mod status;
pub mod task;

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use serde::de::DeserializeOwned;

use crate::error::{GatewayError, Result};
use crate::SharedState;

/// Build the gateway router
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/clone", post(clone::create_clone))
        .route("/clone/:name", get(clone::get_clone))
        .route(
            "/workspace/project",
            get(project::list_projects).post(project::link_project),
        )
        .route(
            "/workspace/project/:id",
            get(project::get_project).delete(project::unlink_project),
        )
        .route("/git/status/:project", get(status::get_status))
        .route("/git/index/:project", put(index::stage_all))
        .route("/git/commit/:project", post(commit::commit_or_merge))
        .route("/git/commit/:project/*rev", get(commit::get_log))
        .route("/git/remote/:project", get(remote::list_remotes))
        .route(
            "/git/remote/:project/:remote",
            get(remote::get_remote).post(remote::fetch_remote),
        )
        .route(
            "/git/remote/:project/:remote/*branch",
            get(remote::get_branch).post(remote::push_branch),
        )
        .route("/task/:id", get(task::get_task).delete(task::cancel_task))
        .route(
            "/file/:project/*path",
            get(file::read_file).put(file::write_file),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            protocol::require_version,
        ))
        .with_state(state)
}

/// Parse a JSON request body; an empty body reads as `{}`
pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body)
        .map_err(|e| GatewayError::Malformed(format!("Invalid request body: {}", e)))
}

/// Wildcard captures may carry a leading slash
pub(crate) fn trim_wildcard(value: String) -> String {
    match value.strip_prefix('/') {
        Some(stripped) => stripped.to_string(),
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommitRequest;

    #[test]
    fn test_empty_body_is_default() {
        let request: CommitRequest = parse_json(b"").unwrap();
        assert!(request.message.is_none());
        assert!(!request.amend);
    }

    #[test]
    fn test_invalid_body_is_malformed() {
        let result: Result<CommitRequest> = parse_json(b"{oops");
        assert!(matches!(result, Err(GatewayError::Malformed(_))));
    }

    #[test]
    fn test_trim_wildcard() {
        assert_eq!(trim_wildcard("/feature/x".to_string()), "feature/x");
        assert_eq!(trim_wildcard("main".to_string()), "main");
    }
}
