//! Task command handlers

use axum::extract::{Path, State};
use axum::Json;

use crate::error::Result;
use crate::models::{CancelResponse, Task};
use crate::SharedState;

pub async fn get_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Task>> {
    Ok(Json(state.tasks.poll(&id)?))
}

/// Best-effort cancellation; `cancelled` is false for finished tasks
pub async fn cancel_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<CancelResponse>> {
    let cancelled = state.tasks.cancel(&id)?;
    Ok(Json(CancelResponse { cancelled }))
}
