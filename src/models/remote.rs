//! Remote models

use serde::{Deserialize, Serialize};

/// A configured remote and its remote-tracking branches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDescriptor {
    pub name: String,
    pub location: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_url: Option<String>,
    #[serde(rename = "children")]
    pub branches: Vec<RemoteBranch>,
}

/// A remote-tracking branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBranch {
    /// Full refname, e.g. `refs/remotes/origin/master`
    pub name: String,
    #[serde(rename = "id")]
    pub object_id: String,
    pub location: String,
    #[serde(rename = "commit")]
    pub commit_location: String,
}

/// Listing wrapper: `{ "children": [...] }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteList {
    pub children: Vec<RemoteDescriptor>,
}

/// Body of a push request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    /// Local branch to push; defaults to the target branch name
    pub source: Option<String>,
    #[serde(default)]
    pub force: bool,
}
