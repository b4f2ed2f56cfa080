//! Error types for Repogate

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Clone not found: {0}")]
    CloneNotFound(String),

    #[error("Remote not found: {0}")]
    RemoteNotFound(String),

    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    #[error("Commit not found: {0}")]
    CommitNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Missing protocol version header: {0}")]
    MissingProtocolVersion(String),

    #[error("Unsupported protocol version: {0}")]
    UnsupportedProtocolVersion(String),

    #[error("Target already exists: {0}")]
    AlreadyExists(String),

    #[error("Unresolved conflicts in index")]
    UnresolvedConflicts,

    #[error("Local changes would be overwritten: {0}")]
    DirtyWorktree(String),

    #[error("Push rejected for {reference}: remote has advanced")]
    NonFastForward { reference: String },

    #[error("Push rejected for {reference}: {reason}")]
    PushRejected { reference: String, reason: String },

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Broad failure category, used to pick the HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Malformed,
    Rejected,
    EngineFailure,
}

impl GatewayError {
    /// Classify a git2 error raised by a network-bound engine call.
    ///
    /// Plain `From<git2::Error>` keeps everything under `Git`; this is used
    /// where the reason matters to the client (clone, fetch, push).
    pub fn from_engine(err: git2::Error) -> Self {
        use git2::{ErrorClass, ErrorCode};

        match (err.code(), err.class()) {
            (ErrorCode::Auth, _) => GatewayError::Authentication(err.message().to_string()),
            (ErrorCode::NotFastForward, _) => GatewayError::NonFastForward {
                reference: String::new(),
            },
            (_, ErrorClass::Net | ErrorClass::Http | ErrorClass::Ssl | ErrorClass::Ssh) => {
                GatewayError::Network(err.message().to_string())
            }
            _ => GatewayError::Git(err),
        }
    }

    /// Stable machine-readable reason code
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Git(_) => "GIT_ERROR",
            GatewayError::Io(_) => "IO_ERROR",
            GatewayError::Serialization(_) => "SERIALIZATION_ERROR",
            GatewayError::RepositoryNotFound(_) => "REPO_NOT_FOUND",
            GatewayError::ProjectNotFound(_) => "PROJECT_NOT_FOUND",
            GatewayError::CloneNotFound(_) => "CLONE_NOT_FOUND",
            GatewayError::RemoteNotFound(_) => "REMOTE_NOT_FOUND",
            GatewayError::BranchNotFound(_) => "BRANCH_NOT_FOUND",
            GatewayError::CommitNotFound(_) => "COMMIT_NOT_FOUND",
            GatewayError::TaskNotFound(_) => "TASK_NOT_FOUND",
            GatewayError::FileNotFound(_) => "FILE_NOT_FOUND",
            GatewayError::Malformed(_) => "MALFORMED_REQUEST",
            GatewayError::MissingProtocolVersion(_) => "MISSING_PROTOCOL_VERSION",
            GatewayError::UnsupportedProtocolVersion(_) => "UNSUPPORTED_PROTOCOL_VERSION",
            GatewayError::AlreadyExists(_) => "ALREADY_EXISTS",
            GatewayError::UnresolvedConflicts => "UNRESOLVED_CONFLICTS",
            GatewayError::DirtyWorktree(_) => "DIRTY_WORKTREE",
            GatewayError::NonFastForward { .. } => "NON_FAST_FORWARD",
            GatewayError::PushRejected { .. } => "PUSH_REJECTED",
            GatewayError::Network(_) => "NETWORK_ERROR",
            GatewayError::Authentication(_) => "AUTH_FAILED",
            GatewayError::Cancelled => "CANCELLED",
            GatewayError::OperationFailed(_) => "OPERATION_FAILED",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::RepositoryNotFound(_)
            | GatewayError::ProjectNotFound(_)
            | GatewayError::CloneNotFound(_)
            | GatewayError::RemoteNotFound(_)
            | GatewayError::BranchNotFound(_)
            | GatewayError::CommitNotFound(_)
            | GatewayError::TaskNotFound(_)
            | GatewayError::FileNotFound(_) => ErrorKind::NotFound,
            GatewayError::Malformed(_)
            | GatewayError::MissingProtocolVersion(_)
            | GatewayError::UnsupportedProtocolVersion(_)
            | GatewayError::Serialization(_) => ErrorKind::Malformed,
            GatewayError::AlreadyExists(_)
            | GatewayError::UnresolvedConflicts
            | GatewayError::DirtyWorktree(_)
            | GatewayError::NonFastForward { .. }
            | GatewayError::PushRejected { .. }
            | GatewayError::Cancelled => ErrorKind::Rejected,
            GatewayError::Git(_)
            | GatewayError::Io(_)
            | GatewayError::Network(_)
            | GatewayError::Authentication(_)
            | GatewayError::OperationFailed(_) => ErrorKind::EngineFailure,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Malformed => StatusCode::BAD_REQUEST,
            ErrorKind::Rejected => StatusCode::CONFLICT,
            ErrorKind::EngineFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Serializable error body, also stored in failed task records
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<&GatewayError> for ErrorResponse {
    fn from(error: &GatewayError) -> Self {
        let details = match error {
            GatewayError::Git(e) => Some(format!("{:?}/{:?}", e.class(), e.code())),
            _ => None,
        };

        ErrorResponse {
            code: error.code().to_string(),
            message: error.to_string(),
            details,
        }
    }
}

impl From<GatewayError> for ErrorResponse {
    fn from(error: GatewayError) -> Self {
        ErrorResponse::from(&error)
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", self.code(), self);
        }
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_variants_map_to_404() {
        let errors = [
            GatewayError::TaskNotFound("t".into()),
            GatewayError::RemoteNotFound("origin".into()),
            GatewayError::ProjectNotFound("p".into()),
        ];
        for error in errors {
            assert_eq!(error.status(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn test_protocol_errors_are_malformed() {
        let error = GatewayError::MissingProtocolVersion("Gateway-Version".into());
        assert_eq!(error.kind(), ErrorKind::Malformed);
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_engine_classification() {
        let err = git2::Error::new(git2::ErrorCode::Auth, git2::ErrorClass::Http, "denied");
        assert_eq!(GatewayError::from_engine(err).code(), "AUTH_FAILED");

        let err = git2::Error::new(git2::ErrorCode::GenericError, git2::ErrorClass::Net, "down");
        assert_eq!(GatewayError::from_engine(err).code(), "NETWORK_ERROR");
    }

    #[test]
    fn test_reason_code_does_not_carry_engine_text() {
        let err = git2::Error::new(
            git2::ErrorCode::GenericError,
            git2::ErrorClass::Odb,
            "object store exploded",
        );
        let response = ErrorResponse::from(GatewayError::from(err));
        assert_eq!(response.code, "GIT_ERROR");
        assert!(response.message.contains("object store exploded"));
    }
}
