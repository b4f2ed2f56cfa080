//! Workspace: linked projects and their repository handles
//!
//! Each repository (keyed by canonical path) gets exactly one
//! `RepositoryHandle`, shared by every project linked to it. The handle's
//! read/write lock serializes mutations and keeps reads off a repository
//! while a mutation rewrites its index.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use git2::Repository;
use tokio::sync::RwLock;
use url::Url;
use uuid::Uuid;

use super::engine;
use crate::error::{GatewayError, Result};
use crate::models::{ProjectRecord, ProjectsConfig};

/// Shared handle to one repository working tree
#[derive(Clone, Debug)]
pub struct RepositoryHandle {
    path: PathBuf,
    lock: Arc<RwLock<()>>,
}

impl RepositoryHandle {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Arc::new(RwLock::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a read-only engine call once no mutation holds the handle
    pub async fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Repository) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let guard = Arc::clone(&self.lock).read_owned().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let repo = engine::open(&path)?;
            f(&repo)
        })
        .await
        .map_err(|e| GatewayError::OperationFailed(format!("Worker panicked: {}", e)))?
    }

    /// Run a mutating engine call with exclusive access to the handle
    pub async fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Repository) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let guard = Arc::clone(&self.lock).write_owned().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let repo = engine::open(&path)?;
            f(&repo)
        })
        .await
        .map_err(|e| GatewayError::OperationFailed(format!("Worker panicked: {}", e)))?
    }

    /// Exclusive access from a task worker thread. Must not be called from async code.
    pub fn blocking_write<T>(&self, f: impl FnOnce(&Repository) -> Result<T>) -> Result<T> {
        let _guard = self.lock.blocking_write();
        let repo = engine::open(&self.path)?;
        f(&repo)
    }

    #[cfg(test)]
    fn shares_lock_with(&self, other: &RepositoryHandle) -> bool {
        Arc::ptr_eq(&self.lock, &other.lock)
    }
}

/// A project linked into the workspace
#[derive(Clone, Debug)]
pub struct LinkedProject {
    pub record: ProjectRecord,
    pub handle: RepositoryHandle,
}

#[derive(Default)]
struct Registry {
    projects: HashMap<String, LinkedProject>,
    handles: HashMap<PathBuf, RepositoryHandle>,
}

impl Registry {
    fn handle_for(&mut self, path: &Path) -> RepositoryHandle {
        self.handles
            .entry(path.to_path_buf())
            .or_insert_with(|| RepositoryHandle::new(path.to_path_buf()))
            .clone()
    }

    fn snapshot(&self) -> ProjectsConfig {
        let mut projects: Vec<ProjectRecord> =
            self.projects.values().map(|p| p.record.clone()).collect();
        projects.sort_by(|a, b| a.linked_at.cmp(&b.linked_at).then_with(|| a.id.cmp(&b.id)));
        ProjectsConfig { projects }
    }
}

/// Project registry plus the clone target root
#[derive(Clone)]
pub struct Workspace {
    registry: Arc<Mutex<Registry>>,
    clone_root: PathBuf,
    projects_file: Option<PathBuf>,
}

impl Workspace {
    pub fn new(clone_root: PathBuf, projects_file: Option<PathBuf>) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            clone_root,
            projects_file,
        }
    }

    /// Create the workspace and restore persisted projects.
    ///
    /// Projects whose repositories no longer open are dropped with a warning.
    pub fn load(clone_root: PathBuf, projects_file: Option<PathBuf>) -> Result<Self> {
        let workspace = Self::new(clone_root, projects_file);
        let Some(path) = workspace.projects_file.as_ref() else {
            return Ok(workspace);
        };
        if !path.exists() {
            return Ok(workspace);
        }

        let content = fs::read_to_string(path).map_err(|e| {
            GatewayError::OperationFailed(format!("Failed to read projects: {}", e))
        })?;
        let config: ProjectsConfig = serde_json::from_str(&content).map_err(|e| {
            GatewayError::OperationFailed(format!("Failed to parse projects: {}", e))
        })?;

        {
            let mut registry = workspace.lock();
            for record in config.projects {
                let repo_path = PathBuf::from(&record.path);
                if let Err(e) = engine::open(&repo_path) {
                    tracing::warn!("Skipping project {} ({}): {}", record.id, record.path, e);
                    continue;
                }
                let handle = registry.handle_for(&repo_path);
                registry
                    .projects
                    .insert(record.id.clone(), LinkedProject { record, handle });
            }
            tracing::info!("Restored {} linked project(s)", registry.projects.len());
        }

        Ok(workspace)
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn save(&self, config: &ProjectsConfig) -> Result<()> {
        let Some(path) = self.projects_file.as_ref() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    GatewayError::OperationFailed(format!(
                        "Failed to create projects directory: {}",
                        e
                    ))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(config).map_err(|e| {
            GatewayError::OperationFailed(format!("Failed to serialize projects: {}", e))
        })?;
        fs::write(path, content).map_err(|e| {
            GatewayError::OperationFailed(format!("Failed to write projects: {}", e))
        })?;
        Ok(())
    }

    pub fn clone_root(&self) -> &Path {
        &self.clone_root
    }

    /// Directory a named clone lives in
    pub fn clone_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.clone_root.join(name))
    }

    /// Turn a content location into a repository path.
    ///
    /// Accepts `file://` URLs, clone resource locations (`/clone/<name>`)
    /// and plain filesystem paths.
    pub fn resolve_location(&self, location: &str) -> Result<PathBuf> {
        if location.starts_with("file:") {
            let url = Url::parse(location)
                .map_err(|e| GatewayError::Malformed(format!("Invalid content location: {}", e)))?;
            return url.to_file_path().map_err(|_| {
                GatewayError::Malformed(format!("Not a local file URL: {}", location))
            });
        }
        if let Some(name) = location.strip_prefix("/clone/") {
            return self.clone_path(name.trim_end_matches('/'));
        }
        if location.is_empty() {
            return Err(GatewayError::Malformed("Empty content location".to_string()));
        }
        Ok(PathBuf::from(location))
    }

    /// Link a repository into the workspace as a new project
    pub fn link(&self, content_location: &str, name: Option<String>) -> Result<LinkedProject> {
        let path = self.resolve_location(content_location)?;
        let canonical = fs::canonicalize(&path)
            .map_err(|_| GatewayError::RepositoryNotFound(path.display().to_string()))?;
        engine::open(&canonical)?;

        let name = name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| {
                canonical
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
            })
            .unwrap_or_else(|| "project".to_string());

        let record = ProjectRecord {
            id: Uuid::new_v4().to_string(),
            name,
            path: canonical.to_string_lossy().to_string(),
            linked_at: Utc::now(),
        };

        let (project, snapshot) = {
            let mut registry = self.lock();
            let handle = registry.handle_for(&canonical);
            let project = LinkedProject {
                record: record.clone(),
                handle,
            };
            registry.projects.insert(record.id.clone(), project.clone());
            (project, registry.snapshot())
        };
        self.save(&snapshot)?;

        tracing::info!(
            "Linked project {} ({}) at {}",
            record.id,
            record.name,
            record.path
        );
        Ok(project)
    }

    pub fn get(&self, id: &str) -> Result<LinkedProject> {
        self.lock()
            .projects
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::ProjectNotFound(id.to_string()))
    }

    pub fn handle(&self, id: &str) -> Result<RepositoryHandle> {
        self.get(id).map(|project| project.handle)
    }

    pub fn list(&self) -> Vec<ProjectRecord> {
        self.lock().snapshot().projects
    }

    /// Remove a project.
    ///
    /// The repository's handle stays registered so a task still holding it
    /// keeps serializing against projects linked to the same path later.
    pub fn unlink(&self, id: &str) -> Result<()> {
        let snapshot = {
            let mut registry = self.lock();
            registry
                .projects
                .remove(id)
                .ok_or_else(|| GatewayError::ProjectNotFound(id.to_string()))?;
            registry.snapshot()
        };
        self.save(&snapshot)?;

        tracing::info!("Unlinked project {}", id);
        Ok(())
    }
}

/// Resolve a client-supplied path inside a working tree, refusing escapes.
///
/// Symbolic links are refused at every level below `workdir`, since a link
/// committed to the repository may point anywhere on the host.
pub fn resolve_in_workdir(workdir: &Path, relative: &str) -> Result<PathBuf> {
    let relative = relative.trim_start_matches('/');
    if relative.is_empty() {
        return Err(GatewayError::Malformed("Empty file path".to_string()));
    }

    let mut resolved = workdir.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => {
                if part == ".git" {
                    return Err(GatewayError::Malformed(format!(
                        "Path touches repository metadata: {}",
                        relative
                    )));
                }
                resolved.push(part);
                let is_link = fs::symlink_metadata(&resolved)
                    .map(|meta| meta.file_type().is_symlink())
                    .unwrap_or(false);
                if is_link {
                    return Err(GatewayError::Malformed(format!(
                        "Path passes through a symbolic link: {}",
                        relative
                    )));
                }
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(GatewayError::Malformed(format!(
                    "Path escapes the working tree: {}",
                    relative
                )));
            }
        }
    }
    Ok(resolved)
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if invalid {
        return Err(GatewayError::Malformed(format!("Invalid name: {:?}", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::engine;
    use crate::test_utils::TestRepo;
    use tempfile::TempDir;

    fn workspace() -> (TempDir, Workspace) {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(dir.path().join("repos"), Some(dir.path().join("projects.json")));
        (dir, ws)
    }

    #[tokio::test]
    async fn test_link_and_get_project() {
        let (_dir, ws) = workspace();
        let repo = TestRepo::with_initial_commit();

        let project = ws.link(&repo.path_str(), Some("demo".to_string())).unwrap();
        assert_eq!(project.record.name, "demo");
        assert_eq!(ws.get(&project.record.id).unwrap().record.path, project.record.path);
    }

    #[tokio::test]
    async fn test_link_accepts_file_url() {
        let (_dir, ws) = workspace();
        let repo = TestRepo::with_initial_commit();
        let project = ws.link(&repo.file_url(), None).unwrap();
        assert!(ws.get(&project.record.id).is_ok());
    }

    #[tokio::test]
    async fn test_link_rejects_non_repository() {
        let (dir, ws) = workspace();
        let plain = dir.path().join("plain");
        fs::create_dir_all(&plain).unwrap();

        assert!(matches!(
            ws.link(&plain.to_string_lossy(), None),
            Err(GatewayError::RepositoryNotFound(_))
        ));
        assert!(matches!(
            ws.link(&dir.path().join("missing").to_string_lossy(), None),
            Err(GatewayError::RepositoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_same_repository_shares_one_handle() {
        let (_dir, ws) = workspace();
        let repo = TestRepo::with_initial_commit();

        let first = ws.link(&repo.path_str(), None).unwrap();
        let second = ws.link(&repo.path_str(), None).unwrap();
        assert_ne!(first.record.id, second.record.id);
        assert!(first.handle.shares_lock_with(&second.handle));
    }

    #[tokio::test]
    async fn test_unlink_and_unknown_project() {
        let (_dir, ws) = workspace();
        let repo = TestRepo::with_initial_commit();
        let project = ws.link(&repo.path_str(), None).unwrap();

        ws.unlink(&project.record.id).unwrap();
        assert!(matches!(
            ws.get(&project.record.id),
            Err(GatewayError::ProjectNotFound(_))
        ));
        assert!(matches!(
            ws.unlink(&project.record.id),
            Err(GatewayError::ProjectNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_relink_after_unlink_reuses_handle() {
        let (_dir, ws) = workspace();
        let repo = TestRepo::with_initial_commit();
        let first = ws.link(&repo.path_str(), None).unwrap();
        let in_flight = first.handle.clone();

        ws.unlink(&first.record.id).unwrap();
        let second = ws.link(&repo.path_str(), None).unwrap();
        assert!(second.handle.shares_lock_with(&in_flight));

        // A worker still holding the old handle blocks the new project's writes
        let guard = Arc::clone(&in_flight.lock).write_owned().await;
        let pending = tokio::spawn({
            let handle = second.handle.clone();
            async move { handle.write(|_| Ok(())).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        assert!(!pending.is_finished());
        drop(guard);
        pending.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_projects_are_persisted() {
        let (dir, ws) = workspace();
        let repo = TestRepo::with_initial_commit();
        let project = ws.link(&repo.path_str(), Some("kept".to_string())).unwrap();

        let restored =
            Workspace::load(dir.path().join("repos"), Some(dir.path().join("projects.json")))
                .unwrap();
        let found = restored.get(&project.record.id).unwrap();
        assert_eq!(found.record.name, "kept");
        assert_eq!(restored.list().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_mutations_are_serialized() {
        let (_dir, ws) = workspace();
        let repo = TestRepo::with_initial_commit();
        let base = repo.head_oid();
        let handle = ws.link(&repo.path_str(), None).unwrap().handle;

        let mut jobs = Vec::new();
        for name in ["one.txt", "two.txt"] {
            let handle = handle.clone();
            jobs.push(tokio::spawn(async move {
                handle
                    .write(move |repo| {
                        let workdir = repo.workdir().unwrap().to_path_buf();
                        fs::write(workdir.join(name), name).unwrap();
                        std::thread::sleep(std::time::Duration::from_millis(20));
                        engine::stage_all(repo)?;
                        engine::commit(repo, &format!("add {}", name), false)
                    })
                    .await
            }));
        }
        for job in jobs {
            job.await.unwrap().unwrap();
        }

        let git_repo = repo.repo();
        let head = git_repo.head().unwrap().peel_to_commit().unwrap();
        let first = head.parent(0).unwrap();
        assert_eq!(first.parent_id(0).unwrap(), base);

        // The first commit holds exactly one of the two files
        let first_tree = first.tree().unwrap();
        let in_first = ["one.txt", "two.txt"]
            .iter()
            .filter(|n| first_tree.get_name(n).is_some())
            .count();
        assert_eq!(in_first, 1);
        assert_eq!(head.tree().unwrap().len(), 3);
    }

    #[test]
    fn test_resolve_in_workdir_refuses_escapes() {
        let root = Path::new("/work/tree");
        assert_eq!(
            resolve_in_workdir(root, "src/main.rs").unwrap(),
            root.join("src/main.rs")
        );
        assert!(matches!(
            resolve_in_workdir(root, "../secret"),
            Err(GatewayError::Malformed(_))
        ));
        assert!(matches!(
            resolve_in_workdir(root, ".git/config"),
            Err(GatewayError::Malformed(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_in_workdir_refuses_symlinks() {
        let dir = TempDir::new().unwrap();
        let workdir = dir.path().join("tree");
        fs::create_dir_all(workdir.join("src")).unwrap();
        fs::write(dir.path().join("secret.txt"), "secret").unwrap();
        std::os::unix::fs::symlink("../secret.txt", workdir.join("leak")).unwrap();
        std::os::unix::fs::symlink("..", workdir.join("up")).unwrap();

        assert!(matches!(
            resolve_in_workdir(&workdir, "leak"),
            Err(GatewayError::Malformed(_))
        ));
        assert!(matches!(
            resolve_in_workdir(&workdir, "up/secret.txt"),
            Err(GatewayError::Malformed(_))
        ));
        assert_eq!(
            resolve_in_workdir(&workdir, "src/new.rs").unwrap(),
            workdir.join("src/new.rs")
        );
    }

    #[test]
    fn test_clone_names_are_validated() {
        let ws = Workspace::new(PathBuf::from("/repos"), None);
        assert_eq!(ws.clone_path("demo").unwrap(), PathBuf::from("/repos/demo"));
        assert!(ws.clone_path("..").is_err());
        assert!(ws.clone_path("a/b").is_err());
        assert_eq!(
            ws.resolve_location("/clone/demo").unwrap(),
            PathBuf::from("/repos/demo")
        );
    }
}
