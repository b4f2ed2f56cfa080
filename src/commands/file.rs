//! File content pass-through
//! Raw bytes in and out of a project's working tree

use std::fs;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;

use super::trim_wildcard;
use crate::error::{GatewayError, Result};
use crate::services::workspace::resolve_in_workdir;
use crate::SharedState;

fn workdir(repo: &git2::Repository) -> Result<std::path::PathBuf> {
    repo.workdir()
        .map(|p| p.to_path_buf())
        .ok_or_else(|| GatewayError::RepositoryNotFound(repo.path().display().to_string()))
}

pub async fn read_file(
    State(state): State<SharedState>,
    Path((project, path)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let path = trim_wildcard(path);
    let handle = state.workspace.handle(&project)?;

    let contents = handle
        .read(move |repo| {
            let full = resolve_in_workdir(&workdir(repo)?, &path)?;
            if !full.is_file() {
                return Err(GatewayError::FileNotFound(path));
            }
            Ok(fs::read(full)?)
        })
        .await?;

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        contents,
    ))
}

/// Replace a file's contents, creating parent directories as needed
pub async fn write_file(
    State(state): State<SharedState>,
    Path((project, path)): Path<(String, String)>,
    body: Bytes,
) -> Result<StatusCode> {
    let path = trim_wildcard(path);
    let handle = state.workspace.handle(&project)?;

    handle
        .write(move |repo| {
            let full = resolve_in_workdir(&workdir(repo)?, &path)?;
            if full.is_dir() {
                return Err(GatewayError::Malformed(format!("{} is a directory", path)));
            }
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&full, &body)?;
            tracing::debug!("Wrote {} bytes to {}", body.len(), full.display());
            Ok(())
        })
        .await?;

    Ok(StatusCode::OK)
}
