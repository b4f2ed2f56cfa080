//! Repository engine adapter
//!
//! Thin layer over git2 performing the operations the gateway exposes and
//! translating their results into gateway types. Callers are responsible for
//! serializing mutations on a repository (see `services::workspace`).

use std::path::Path;
use std::sync::{Arc, Mutex};

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{BranchType, ErrorCode, ReferenceType, Repository};

use super::cancellation::CancellationToken;
use super::conflict;
use super::credentials::{callbacks_with_cancel, CredentialsHelper};
use crate::error::{GatewayError, Result};
use crate::models::{Commit, MergeOutcome};

pub const DEFAULT_LOG_LIMIT: usize = 100;

/// Open a non-bare repository
pub fn open(path: &Path) -> Result<Repository> {
    let repo = Repository::open(path)
        .map_err(|_| GatewayError::RepositoryNotFound(path.display().to_string()))?;
    if repo.is_bare() {
        return Err(GatewayError::RepositoryNotFound(path.display().to_string()));
    }
    Ok(repo)
}

/// Stage every change in the working tree, deletions included
pub fn stage_all(repo: &Repository) -> Result<()> {
    let mut index = repo.index()?;
    index.add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)?;
    index.update_all(["*"].iter(), None)?;
    index.write()?;
    Ok(())
}

/// Commit the index to HEAD.
///
/// If a merge is in progress its MERGE_HEAD becomes the second parent and the
/// merge state is cleared.
pub fn commit(repo: &Repository, message: &str, amend: bool) -> Result<git2::Oid> {
    let mut index = repo.index()?;
    if index.has_conflicts() {
        return Err(GatewayError::UnresolvedConflicts);
    }

    let tree_oid = index.write_tree()?;
    let tree = repo.find_tree(tree_oid)?;

    if amend {
        let head_commit = repo.head()?.peel_to_commit()?;
        let oid = head_commit.amend(Some("HEAD"), None, None, None, Some(message), Some(&tree))?;
        return Ok(oid);
    }

    let signature = repo.signature()?;
    let mut parents = Vec::new();
    if let Some(head) = repo.head().ok().and_then(|h| h.peel_to_commit().ok()) {
        parents.push(head);
    }

    let merging = repo.state() == git2::RepositoryState::Merge;
    if merging {
        for oid in merge_heads(repo)? {
            parents.push(repo.find_commit(oid)?);
        }
    }

    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
    let oid = repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        message,
        &tree,
        &parent_refs,
    )?;

    if merging {
        repo.cleanup_state()?;
    }

    Ok(oid)
}

/// Commits recorded in MERGE_HEAD, one per line
fn merge_heads(repo: &Repository) -> Result<Vec<git2::Oid>> {
    let contents = std::fs::read_to_string(repo.path().join("MERGE_HEAD"))?;
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| git2::Oid::from_str(line).map_err(GatewayError::from))
        .collect()
}

/// Resolve a merge source: local branch, remote-tracking branch, full ref, then any revision
fn resolve_annotated<'r>(repo: &'r Repository, source: &str) -> Result<git2::AnnotatedCommit<'r>> {
    let reference = repo
        .find_reference(&format!("refs/heads/{}", source))
        .or_else(|_| repo.find_reference(&format!("refs/remotes/{}", source)))
        .or_else(|_| repo.find_reference(source));

    if let Ok(reference) = reference {
        return Ok(repo.reference_to_annotated_commit(&reference)?);
    }

    let object = repo
        .revparse_single(source)
        .map_err(|_| GatewayError::BranchNotFound(source.to_string()))?;
    let commit = object
        .peel_to_commit()
        .map_err(|_| GatewayError::BranchNotFound(source.to_string()))?;
    Ok(repo.find_annotated_commit(commit.id())?)
}

/// Merge `source` into HEAD
pub fn merge(repo: &Repository, source: &str) -> Result<MergeOutcome> {
    let annotated = resolve_annotated(repo, source)?;
    let their_id = annotated.id();
    let (analysis, _preference) = repo.merge_analysis(&[&annotated])?;

    if analysis.is_up_to_date() {
        return Ok(MergeOutcome::AlreadyUpToDate);
    }

    if analysis.is_fast_forward() || analysis.is_unborn() {
        let target = repo.find_object(their_id, None)?;
        repo.checkout_tree(&target, Some(CheckoutBuilder::new().safe()))
            .map_err(dirty_worktree)?;

        match repo.head() {
            Ok(head) if head.is_branch() => {
                let refname = head
                    .name()
                    .ok_or_else(|| GatewayError::BranchNotFound("HEAD".to_string()))?;
                let log_message = format!("merge {}: Fast-forward", source);
                repo.reference(refname, their_id, true, &log_message)?;
            }
            Ok(_) => repo.set_head_detached(their_id)?,
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                let refname = repo
                    .find_reference("HEAD")?
                    .symbolic_target()
                    .map(str::to_string)
                    .ok_or_else(|| GatewayError::BranchNotFound("HEAD".to_string()))?;
                let log_message = format!("merge {}: Fast-forward", source);
                repo.reference(&refname, their_id, true, &log_message)?;
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!("Fast-forwarded to {} ({})", source, their_id);
        return Ok(MergeOutcome::FastForward {
            commit: their_id.to_string(),
        });
    }

    let head_commit = repo.head()?.peel_to_commit()?;
    repo.merge(&[&annotated], None, None).map_err(dirty_worktree)?;

    if repo.index()?.has_conflicts() {
        let paths = conflict::write_conflicts(repo, &their_id.to_string())?;
        tracing::info!("Merge of {} left {} conflicted path(s)", source, paths.len());
        return Ok(MergeOutcome::Conflicted { paths });
    }

    let signature = repo.signature()?;
    let tree_oid = repo.index()?.write_tree()?;
    let tree = repo.find_tree(tree_oid)?;
    let their_commit = repo.find_commit(their_id)?;
    let oid = repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        &format!("Merge '{}' into HEAD", source),
        &tree,
        &[&head_commit, &their_commit],
    )?;
    repo.cleanup_state()?;

    let diff = repo.diff_tree_to_tree(Some(&head_commit.tree()?), Some(&tree), None)?;
    let paths = diff
        .deltas()
        .filter_map(|d| d.new_file().path().map(|p| p.to_string_lossy().to_string()))
        .collect();

    tracing::info!("Merged {} into HEAD as {}", source, oid);
    Ok(MergeOutcome::Merged {
        commit: oid.to_string(),
        paths,
    })
}

fn dirty_worktree(err: git2::Error) -> GatewayError {
    if err.code() == ErrorCode::Conflict {
        GatewayError::DirtyWorktree(err.message().to_string())
    } else {
        err.into()
    }
}

/// Commit log reachable from `rev`
pub fn log(repo: &Repository, rev: &str, limit: usize) -> Result<Vec<Commit>> {
    let start = repo
        .revparse_single(rev)
        .and_then(|object| object.peel_to_commit())
        .map_err(|_| GatewayError::CommitNotFound(rev.to_string()))?;

    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(git2::Sort::TIME | git2::Sort::TOPOLOGICAL)?;
    revwalk.push(start.id())?;

    let mut commits = Vec::new();
    for oid in revwalk.take(limit) {
        let commit = repo.find_commit(oid?)?;
        commits.push(Commit::from_git2(&commit));
    }
    Ok(commits)
}

pub fn find_commit<'r>(repo: &'r Repository, oid: git2::Oid) -> Result<git2::Commit<'r>> {
    repo.find_commit(oid)
        .map_err(|_| GatewayError::CommitNotFound(oid.to_string()))
}

/// A configured remote
#[derive(Debug, Clone)]
pub struct RemoteInfo {
    pub name: String,
    pub url: String,
    pub push_url: Option<String>,
}

/// A remote-tracking ref under `refs/remotes/<remote>/`
#[derive(Debug, Clone)]
pub struct TrackingRef {
    pub refname: String,
    pub branch: String,
    pub oid: git2::Oid,
}

/// All configured remotes, sorted by name
pub fn list_remotes(repo: &Repository) -> Result<Vec<RemoteInfo>> {
    let names = repo.remotes()?;
    let mut remotes: Vec<RemoteInfo> = names
        .iter()
        .flatten()
        .filter_map(|name| find_remote(repo, name).ok())
        .collect();
    remotes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(remotes)
}

pub fn find_remote(repo: &Repository, name: &str) -> Result<RemoteInfo> {
    let remote = repo
        .find_remote(name)
        .map_err(|_| GatewayError::RemoteNotFound(name.to_string()))?;
    Ok(RemoteInfo {
        name: name.to_string(),
        url: remote.url().unwrap_or("").to_string(),
        push_url: remote.pushurl().map(|s| s.to_string()),
    })
}

/// Remote-tracking refs of one remote.
///
/// Symbolic refs (`<remote>/HEAD`) are skipped. The ref matching the checked
/// out local branch comes first, the rest follow by name.
pub fn tracking_refs(repo: &Repository, remote: &str) -> Result<Vec<TrackingRef>> {
    let prefix = format!("refs/remotes/{}/", remote);
    let mut refs = Vec::new();

    for reference in repo.references_glob(&format!("{}*", prefix))? {
        let reference = reference?;
        if reference.kind() != Some(ReferenceType::Direct) {
            continue;
        }
        let (Some(refname), Some(oid)) = (reference.name(), reference.target()) else {
            continue;
        };
        let Some(branch) = refname.strip_prefix(&prefix) else {
            continue;
        };
        if branch == "HEAD" {
            continue;
        }
        refs.push(TrackingRef {
            refname: refname.to_string(),
            branch: branch.to_string(),
            oid,
        });
    }

    let current = current_branch(repo);
    refs.sort_by(|a, b| {
        let a_current = Some(&a.branch) == current.as_ref();
        let b_current = Some(&b.branch) == current.as_ref();
        b_current.cmp(&a_current).then_with(|| a.refname.cmp(&b.refname))
    });

    Ok(refs)
}

/// Shorthand of the checked out local branch, if HEAD is on one
pub fn current_branch(repo: &Repository) -> Option<String> {
    let head = repo.head().ok()?;
    if !head.is_branch() {
        return None;
    }
    head.shorthand().map(str::to_string)
}

/// Clone `url` into `path`; a failed clone leaves nothing behind
pub fn clone_repo(
    url: &str,
    path: &Path,
    branch: Option<&str>,
    token: &CancellationToken,
) -> Result<()> {
    let mut fetch_opts = git2::FetchOptions::new();
    fetch_opts.remote_callbacks(callbacks_with_cancel(CredentialsHelper::new(), token));

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_opts);
    if let Some(branch) = branch {
        builder.branch(branch);
    }

    match builder.clone(url, path) {
        Ok(_) => Ok(()),
        Err(e) => {
            if path.exists() {
                if let Err(cleanup) = std::fs::remove_dir_all(path) {
                    tracing::warn!("Failed to clean up {}: {}", path.display(), cleanup);
                }
            }
            Err(transfer_error(e, token))
        }
    }
}

/// A transfer aborted from a progress callback surfaces as a generic
/// engine error; the token tells the two apart.
fn transfer_error(err: git2::Error, token: &CancellationToken) -> GatewayError {
    if token.is_cancelled() {
        tracing::debug!("Transfer aborted after cancellation: {}", err.message());
        return GatewayError::Cancelled;
    }
    GatewayError::from_engine(err)
}

/// Fetch a remote using its configured refspecs
pub fn fetch(repo: &Repository, remote_name: &str, token: &CancellationToken) -> Result<()> {
    let mut remote = repo
        .find_remote(remote_name)
        .map_err(|_| GatewayError::RemoteNotFound(remote_name.to_string()))?;

    let mut fetch_opts = git2::FetchOptions::new();
    fetch_opts.remote_callbacks(callbacks_with_cancel(CredentialsHelper::for_repo(repo), token));

    remote
        .fetch(&[] as &[&str], Some(&mut fetch_opts), None)
        .map_err(|e| transfer_error(e, token))
}

/// Push local branch `source` to `refs/heads/<target>` on a remote
pub fn push(
    repo: &Repository,
    remote_name: &str,
    source: &str,
    target: &str,
    force: bool,
    token: &CancellationToken,
) -> Result<()> {
    repo.find_branch(source, BranchType::Local)
        .map_err(|_| GatewayError::BranchNotFound(source.to_string()))?;

    let mut remote = repo
        .find_remote(remote_name)
        .map_err(|_| GatewayError::RemoteNotFound(remote_name.to_string()))?;

    let target_ref = format!("refs/heads/{}", target);
    let refspec = format!(
        "{}refs/heads/{}:{}",
        if force { "+" } else { "" },
        source,
        target_ref
    );

    let rejection: Arc<Mutex<Option<(String, String)>>> = Arc::new(Mutex::new(None));
    let mut callbacks = callbacks_with_cancel(CredentialsHelper::for_repo(repo), token);
    let slot = Arc::clone(&rejection);
    callbacks.push_update_reference(move |refname, status| {
        if let Some(reason) = status {
            if let Ok(mut slot) = slot.lock() {
                *slot = Some((refname.to_string(), reason.to_string()));
            }
        }
        Ok(())
    });
    callbacks.push_transfer_progress(|current, total, bytes| {
        if total > 0 {
            tracing::debug!("Push progress: {}/{} objects, {} bytes", current, total, bytes);
        }
    });

    let mut push_opts = git2::PushOptions::new();
    push_opts.remote_callbacks(callbacks);

    if token.is_cancelled() {
        return Err(GatewayError::Cancelled);
    }

    remote
        .push(&[&refspec], Some(&mut push_opts))
        .map_err(|e| match transfer_error(e, token) {
            GatewayError::NonFastForward { .. } => GatewayError::NonFastForward {
                reference: target_ref.clone(),
            },
            other => other,
        })?;

    let rejected = rejection.lock().ok().and_then(|mut slot| slot.take());
    if let Some((reference, reason)) = rejected {
        return Err(classify_rejection(reference, reason));
    }

    Ok(())
}

/// Split remote-advanced rejections from the rest
fn classify_rejection(reference: String, reason: String) -> GatewayError {
    let lowered = reason.to_lowercase();
    if lowered.contains("fast-forward") || lowered.contains("fetch first") {
        GatewayError::NonFastForward { reference }
    } else {
        GatewayError::PushRejected { reference, reason }
    }
}
