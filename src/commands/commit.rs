//! Commit command handlers

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use super::{links, parse_json, status, trim_wildcard};
use crate::error::{GatewayError, Result};
use crate::models::{Commit, CommitRequest};
use crate::services::{compute_status, engine};
use crate::SharedState;

/// Commit the index, or merge a ref when the body names one.
///
/// A clean merge answers 200 with an empty body; a conflicted merge answers
/// 200 with the post-merge status report.
pub async fn commit_or_merge(
    State(state): State<SharedState>,
    Path(project): Path<String>,
    body: Bytes,
) -> Result<Response> {
    let request: CommitRequest = parse_json(&body)?;
    let handle = state.workspace.handle(&project)?;

    if let Some(source) = request.merge.filter(|m| !m.trim().is_empty()) {
        let conflicted = handle
            .write(move |repo| {
                let outcome = engine::merge(repo, &source)?;
                if outcome.is_conflicted() {
                    compute_status(repo).map(Some)
                } else {
                    Ok(None)
                }
            })
            .await?;

        return Ok(match conflicted {
            Some(report) => Json(status::with_links(&project, report)).into_response(),
            None => StatusCode::OK.into_response(),
        });
    }

    let message = request
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| GatewayError::Malformed("Missing commit message".to_string()))?;
    let amend = request.amend;

    let mut commit = handle
        .write(move |repo| {
            let oid = engine::commit(repo, &message, amend)?;
            Ok(Commit::from_git2(&engine::find_commit(repo, oid)?))
        })
        .await?;

    let location = links::commit_rev(&project, &commit.oid);
    commit.location = Some(location.clone());
    tracing::info!("Committed {} in project {}", commit.short_id, project);

    Ok((StatusCode::OK, [(header::LOCATION, location)], Json(commit)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub limit: Option<usize>,
}

/// Commit log reachable from a revision
pub async fn get_log(
    State(state): State<SharedState>,
    Path((project, rev)): Path<(String, String)>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<Commit>>> {
    let rev = trim_wildcard(rev);
    let limit = query.limit.unwrap_or(engine::DEFAULT_LOG_LIMIT);
    let handle = state.workspace.handle(&project)?;

    let commits = handle
        .read(move |repo| engine::log(repo, &rev, limit))
        .await?
        .into_iter()
        .map(|mut commit| {
            commit.location = Some(links::commit_rev(&project, &commit.oid));
            commit
        })
        .collect();

    Ok(Json(commits))
}
