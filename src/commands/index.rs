//! Index command handler

use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::error::Result;
use crate::services::engine;
use crate::SharedState;

/// Stage every working tree change, deletions included
pub async fn stage_all(
    State(state): State<SharedState>,
    Path(project): Path<String>,
) -> Result<StatusCode> {
    let handle = state.workspace.handle(&project)?;
    handle.write(engine::stage_all).await?;
    tracing::debug!("Staged all changes in project {}", project);
    Ok(StatusCode::OK)
}
