//! Remote command handlers
//!
//! Listings are computed from the current ref set on every call. Fetch and
//! push run as tasks.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use super::{links, parse_json, trim_wildcard};
use crate::error::{GatewayError, Result};
use crate::models::{PushRequest, RemoteBranch, RemoteDescriptor, RemoteList, Task, TaskKind};
use crate::services::engine::{self, RemoteInfo, TrackingRef};
use crate::SharedState;

fn describe(project: &str, info: RemoteInfo, refs: Vec<TrackingRef>) -> RemoteDescriptor {
    let branches = refs
        .iter()
        .map(|tracking| describe_branch(project, &info.name, tracking))
        .collect();

    RemoteDescriptor {
        location: links::remote(project, &info.name),
        name: info.name,
        url: info.url,
        push_url: info.push_url,
        branches,
    }
}

fn describe_branch(project: &str, remote: &str, tracking: &TrackingRef) -> RemoteBranch {
    let oid = tracking.oid.to_string();
    RemoteBranch {
        name: tracking.refname.clone(),
        location: links::remote_branch(project, remote, &tracking.branch),
        commit_location: links::commit_rev(project, &oid),
        object_id: oid,
    }
}

/// All remotes of a project; none configured is an empty list
pub async fn list_remotes(
    State(state): State<SharedState>,
    Path(project): Path<String>,
) -> Result<Json<RemoteList>> {
    let handle = state.workspace.handle(&project)?;
    let remotes = handle
        .read(|repo| {
            engine::list_remotes(repo)?
                .into_iter()
                .map(|info| {
                    let refs = engine::tracking_refs(repo, &info.name)?;
                    Ok((info, refs))
                })
                .collect::<Result<Vec<_>>>()
        })
        .await?;

    let children = remotes
        .into_iter()
        .map(|(info, refs)| describe(&project, info, refs))
        .collect();
    Ok(Json(RemoteList { children }))
}

pub async fn get_remote(
    State(state): State<SharedState>,
    Path((project, remote)): Path<(String, String)>,
) -> Result<Json<RemoteDescriptor>> {
    let handle = state.workspace.handle(&project)?;
    let (info, refs) = handle
        .read(move |repo| {
            let info = engine::find_remote(repo, &remote)?;
            let refs = engine::tracking_refs(repo, &info.name)?;
            Ok((info, refs))
        })
        .await?;

    Ok(Json(describe(&project, info, refs)))
}

/// One remote-tracking branch; unknown remotes and branches are NotFound
pub async fn get_branch(
    State(state): State<SharedState>,
    Path((project, remote, branch)): Path<(String, String, String)>,
) -> Result<Json<RemoteBranch>> {
    let branch = trim_wildcard(branch);
    let handle = state.workspace.handle(&project)?;

    let remote_name = remote.clone();
    let tracking = handle
        .read(move |repo| {
            engine::find_remote(repo, &remote_name)?;
            engine::tracking_refs(repo, &remote_name)?
                .into_iter()
                .find(|tracking| tracking.branch == branch)
                .ok_or_else(|| {
                    GatewayError::BranchNotFound(format!("{}/{}", remote_name, branch))
                })
        })
        .await?;

    Ok(Json(describe_branch(&project, &remote, &tracking)))
}

fn accepted(task: Task) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        [(header::LOCATION, task.location.clone())],
        Json(task),
    )
}

/// Start fetching a remote
pub async fn fetch_remote(
    State(state): State<SharedState>,
    Path((project, remote)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let handle = state.workspace.handle(&project)?;
    let remote_name = remote.clone();
    handle
        .read(move |repo| engine::find_remote(repo, &remote_name))
        .await?;

    tracing::info!("Fetching {} for project {}", remote, project);
    let task = state.tasks.submit(TaskKind::Fetch, move |token| {
        handle.blocking_write(|repo| engine::fetch(repo, &remote, token))?;
        Ok(links::remote(&project, &remote))
    });

    Ok(accepted(task))
}

/// Start pushing a local branch to a remote branch
pub async fn push_branch(
    State(state): State<SharedState>,
    Path((project, remote, branch)): Path<(String, String, String)>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let branch = trim_wildcard(branch);
    let request: PushRequest = parse_json(&body)?;
    let source = request
        .source
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| branch.clone());
    let force = request.force;

    let handle = state.workspace.handle(&project)?;
    let remote_name = remote.clone();
    handle
        .read(move |repo| engine::find_remote(repo, &remote_name))
        .await?;

    tracing::info!(
        "Pushing {} to {}/{} for project {}",
        source,
        remote,
        branch,
        project
    );
    let task = state.tasks.submit(TaskKind::Push, move |token| {
        handle.blocking_write(|repo| engine::push(repo, &remote, &source, &branch, force, token))?;
        Ok(links::remote_branch(&project, &remote, &branch))
    });

    Ok(accepted(task))
}
