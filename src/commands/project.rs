//! Project command handlers
//! Link repositories into the workspace so the git resources can address them

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use url::Url;

use super::{links, parse_json};
use crate::error::{GatewayError, Result};
use crate::models::{GitLinks, LinkRequest, Project, ProjectRecord};
use crate::SharedState;

/// Header carrying a suggested project name
const SLUG_HEADER: &str = "Slug";

fn project_view(record: &ProjectRecord) -> Project {
    let content_location = Url::from_directory_path(&record.path)
        .map(String::from)
        .unwrap_or_else(|_| record.path.clone());

    Project {
        id: record.id.clone(),
        name: record.name.clone(),
        location: links::project(&record.id),
        content_location,
        git: GitLinks {
            status_location: links::status(&record.id),
            index_location: links::index(&record.id),
            commit_location: links::commit(&record.id),
            remote_location: links::remotes(&record.id),
        },
    }
}

/// Link a repository as a new project
pub async fn link_project(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let request: LinkRequest = parse_json(&body)?;
    let content_location = request
        .content_location
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| GatewayError::Malformed("Missing contentLocation".to_string()))?;
    let name = request.name.or_else(|| {
        headers
            .get(SLUG_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    });

    let project = state.workspace.link(&content_location, name)?;
    let view = project_view(&project.record);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, view.location.clone())],
        Json(view),
    ))
}

pub async fn list_projects(State(state): State<SharedState>) -> Json<Vec<Project>> {
    Json(state.workspace.list().iter().map(project_view).collect())
}

pub async fn get_project(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Project>> {
    let project = state.workspace.get(&id)?;
    Ok(Json(project_view(&project.record)))
}

pub async fn unlink_project(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.workspace.unlink(&id)?;
    Ok(StatusCode::NO_CONTENT)
}
