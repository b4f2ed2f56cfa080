//! Project models: a repository linked into the workspace

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted link between a project id and a repository working tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    pub path: String,
    pub linked_at: DateTime<Utc>,
}

/// Top-level projects file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProjectsConfig {
    #[serde(default)]
    pub projects: Vec<ProjectRecord>,
}

/// Project resource as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub location: String,
    pub content_location: String,
    pub git: GitLinks,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitLinks {
    pub status_location: String,
    pub index_location: String,
    pub commit_location: String,
    pub remote_location: String,
}

/// Body of a link request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    pub content_location: Option<String>,
    pub name: Option<String>,
}
