//! Commit models

use serde::{Deserialize, Serialize};

/// Commit information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub oid: String,
    pub short_id: String,
    pub message: String,
    pub summary: String,
    pub author: Signature,
    pub committer: Signature,
    pub parent_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Git signature (author/committer)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub timestamp: i64,
}

impl From<git2::Signature<'_>> for Signature {
    fn from(sig: git2::Signature) -> Self {
        Signature {
            name: sig.name().unwrap_or("Unknown").to_string(),
            email: sig.email().unwrap_or("").to_string(),
            timestamp: sig.when().seconds(),
        }
    }
}

impl Commit {
    pub fn from_git2(commit: &git2::Commit) -> Self {
        let oid = commit.id().to_string();
        Commit {
            short_id: oid[..7].to_string(),
            oid,
            message: commit.message().unwrap_or("").to_string(),
            summary: commit.summary().unwrap_or("").to_string(),
            author: Signature::from(commit.author()),
            committer: Signature::from(commit.committer()),
            parent_ids: commit.parent_ids().map(|id| id.to_string()).collect(),
            location: None,
        }
    }
}

/// Body of `POST .../commit`: either a commit or a merge
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub message: Option<String>,
    #[serde(default)]
    pub amend: bool,
    pub merge: Option<String>,
}
