//! Service layer for Repogate
//!
//! This module contains services that provide higher-level abstractions
//! over the raw git operations.

pub mod cancellation;
pub mod conflict;
pub mod credentials;
pub mod engine;
pub mod status;
pub mod tasks;
pub mod workspace;

pub use cancellation::CancellationToken;
pub use credentials::CredentialsHelper;
pub use status::compute_status;
pub use tasks::TaskRegistry;
pub use workspace::{LinkedProject, RepositoryHandle, Workspace};
