//! Clone command handlers

use std::fs;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use url::Url;

use super::{links, parse_json};
use crate::error::{GatewayError, Result};
use crate::models::{CloneRequest, CloneResource, TaskKind};
use crate::services::engine;
use crate::SharedState;

/// Start cloning a repository into the workspace root
pub async fn create_clone(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let request: CloneRequest = parse_json(&body)?;
    let url = request
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| GatewayError::Malformed("Missing clone url".to_string()))?;
    let name = match request.name.filter(|n| !n.trim().is_empty()) {
        Some(name) => name,
        None => name_from_url(&url).ok_or_else(|| {
            GatewayError::Malformed(format!("Cannot derive a clone name from {}", url))
        })?,
    };

    let target = state.workspace.clone_path(&name)?;
    fs::create_dir_all(state.workspace.clone_root())?;
    // Fails if another clone already claimed the name
    fs::create_dir(&target).map_err(|e| match e.kind() {
        std::io::ErrorKind::AlreadyExists => {
            GatewayError::AlreadyExists(target.display().to_string())
        }
        _ => GatewayError::Io(e),
    })?;

    tracing::info!("Cloning {} into {}", url, target.display());
    let branch = request.branch;
    let claimed = target.clone();
    let task = state.tasks.submit_with_release(
        TaskKind::Clone,
        move |token| {
            engine::clone_repo(&url, &target, branch.as_deref(), token)?;
            Ok(links::clone(&name))
        },
        // Give the name back if the clone never starts
        move || {
            if let Err(e) = fs::remove_dir(&claimed) {
                tracing::warn!("Failed to release {}: {}", claimed.display(), e);
            }
        },
    );

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, task.location.clone())],
        Json(task),
    ))
}

/// Describe a finished clone
pub async fn get_clone(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<CloneResource>> {
    let path = state.workspace.clone_path(&name)?;
    let canonical = fs::canonicalize(&path).map_err(|_| GatewayError::CloneNotFound(name.clone()))?;
    engine::open(&canonical).map_err(|_| GatewayError::CloneNotFound(name.clone()))?;

    let content_location = Url::from_directory_path(&canonical)
        .map(String::from)
        .unwrap_or_else(|_| canonical.display().to_string());

    Ok(Json(CloneResource {
        location: links::clone(&name),
        name,
        content_location,
    }))
}

/// Last path segment of a clone url without `.git`
fn name_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':', '\\']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_from_url() {
        assert_eq!(
            name_from_url("https://github.com/org/project.git").as_deref(),
            Some("project")
        );
        assert_eq!(
            name_from_url("git@github.com:org/tool.git").as_deref(),
            Some("tool")
        );
        assert_eq!(name_from_url("file:///tmp/upstream/").as_deref(), Some("upstream"));
        assert_eq!(name_from_url("https://host/.git"), None);
    }
}
