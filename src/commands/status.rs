//! Status command handler

use axum::extract::{Path, State};
use axum::Json;

use super::links;
use crate::error::Result;
use crate::models::StatusReport;
use crate::services::compute_status;
use crate::SharedState;

/// Working tree status of a project, recomputed on every call
pub async fn get_status(
    State(state): State<SharedState>,
    Path(project): Path<String>,
) -> Result<Json<StatusReport>> {
    let handle = state.workspace.handle(&project)?;
    let report = handle.read(compute_status).await?;
    Ok(Json(with_links(&project, report)))
}

/// Attach the project's status and file links to a report
pub(crate) fn with_links(project: &str, report: StatusReport) -> StatusReport {
    report.with_links(links::status(project), |path| links::file(project, path))
}
