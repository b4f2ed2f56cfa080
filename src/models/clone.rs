//! Clone models

use serde::{Deserialize, Serialize};

/// Body of a clone request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneRequest {
    pub url: Option<String>,
    pub name: Option<String>,
    pub branch: Option<String>,
}

/// A finished clone inside the workspace root
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneResource {
    pub name: String,
    pub location: String,
    pub content_location: String,
}
