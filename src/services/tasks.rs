//! Task registry for long-running repository operations
//!
//! `submit` records a Waiting task and hands the work to a blocking worker;
//! the worker flips the task to Running right before it calls the engine and
//! stores the terminal record when the engine returns. Terminal records never
//! change again and are evicted once the retention window has passed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::Utc;
use uuid::Uuid;

use super::cancellation::CancellationToken;
use crate::error::{ErrorResponse, GatewayError, Result};
use crate::models::{Task, TaskKind, TaskState};

/// Work executed by a task worker; returns the location of the resulting resource
pub type TaskWork = Box<dyn FnOnce(&CancellationToken) -> Result<String> + Send + 'static>;

/// Cleanup for resources claimed at submission, run when a Waiting task is cancelled
pub type TaskRelease = Box<dyn FnOnce() + Send + 'static>;

struct TaskEntry {
    task: Task,
    token: CancellationToken,
    release: Option<TaskRelease>,
    finished_at: Option<Instant>,
}

#[derive(Clone)]
pub struct TaskRegistry {
    tasks: Arc<Mutex<HashMap<String, TaskEntry>>>,
    retention: Duration,
}

impl TaskRegistry {
    pub fn new(retention: Duration) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            retention,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TaskEntry>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a task and schedule its work without waiting for it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit<F>(&self, kind: TaskKind, work: F) -> Task
    where
        F: FnOnce(&CancellationToken) -> Result<String> + Send + 'static,
    {
        self.schedule(kind, Box::new(work), None)
    }

    /// Like `submit`, with `release` run if the task is cancelled before it starts
    pub fn submit_with_release<F, R>(&self, kind: TaskKind, work: F, release: R) -> Task
    where
        F: FnOnce(&CancellationToken) -> Result<String> + Send + 'static,
        R: FnOnce() + Send + 'static,
    {
        self.schedule(kind, Box::new(work), Some(Box::new(release)))
    }

    fn schedule(&self, kind: TaskKind, work: TaskWork, release: Option<TaskRelease>) -> Task {
        self.sweep();

        let id = Uuid::new_v4().to_string();
        let task = Task {
            location: format!("/task/{}", id),
            id: id.clone(),
            kind,
            created_at: Utc::now(),
            state: TaskState::Waiting,
        };
        let token = CancellationToken::new();

        self.lock().insert(
            id.clone(),
            TaskEntry {
                task: task.clone(),
                token: token.clone(),
                release,
                finished_at: None,
            },
        );
        tracing::info!("Task {} ({:?}) submitted", id, kind);

        let registry = self.clone();
        tokio::task::spawn_blocking(move || registry.run(&id, &token, work));

        task
    }

    fn run(&self, id: &str, token: &CancellationToken, work: TaskWork) {
        if !self.begin(id) {
            tracing::debug!("Task {} was cancelled before it started", id);
            return;
        }

        let outcome = work(token);
        self.finish(id, outcome);
    }

    /// Waiting -> Running; false if the task is gone
    fn begin(&self, id: &str) -> bool {
        let mut tasks = self.lock();
        match tasks.get_mut(id) {
            Some(entry) if entry.task.state == TaskState::Waiting => {
                entry.task.state = TaskState::Running;
                entry.release = None;
                true
            }
            _ => false,
        }
    }

    fn finish(&self, id: &str, outcome: Result<String>) {
        let state = match outcome {
            Ok(result_location) => {
                tracing::info!("Task {} succeeded: {}", id, result_location);
                TaskState::Succeeded { result_location }
            }
            Err(error) => {
                tracing::warn!("Task {} failed: {}", id, error);
                TaskState::Failed {
                    error: ErrorResponse::from(&error),
                }
            }
        };

        let mut tasks = self.lock();
        if let Some(entry) = tasks.get_mut(id) {
            if !entry.task.state.is_terminal() {
                entry.task.state = state;
                entry.finished_at = Some(Instant::now());
            }
        }
    }

    /// Current record of a task; terminal records are returned unchanged on every call
    pub fn poll(&self, id: &str) -> Result<Task> {
        self.sweep();
        self.lock()
            .get(id)
            .map(|entry| entry.task.clone())
            .ok_or_else(|| GatewayError::TaskNotFound(id.to_string()))
    }

    /// Best-effort cancellation.
    ///
    /// A Waiting task is removed before it runs, a Running task is asked to
    /// stop, a terminal task is left alone and `false` is returned.
    pub fn cancel(&self, id: &str) -> Result<bool> {
        let mut tasks = self.lock();
        let entry = tasks
            .get(id)
            .ok_or_else(|| GatewayError::TaskNotFound(id.to_string()))?;

        match entry.task.state {
            TaskState::Waiting => {
                let release = tasks.remove(id).and_then(|entry| entry.release);
                drop(tasks);
                if let Some(release) = release {
                    release();
                }
                tracing::info!("Task {} cancelled while waiting", id);
                Ok(true)
            }
            TaskState::Running => {
                entry.token.cancel();
                tracing::info!("Task {} cancellation requested", id);
                Ok(true)
            }
            TaskState::Succeeded { .. } | TaskState::Failed { .. } => Ok(false),
        }
    }

    /// Evict terminal tasks older than the retention window
    pub fn sweep(&self) -> usize {
        let retention = self.retention;
        let mut tasks = self.lock();
        let before = tasks.len();
        tasks.retain(|_, entry| match entry.finished_at {
            Some(finished) => finished.elapsed() < retention,
            None => true,
        });
        let evicted = before - tasks.len();
        if evicted > 0 {
            tracing::debug!("Evicted {} expired task(s)", evicted);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
