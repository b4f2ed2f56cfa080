//! Status report models

use serde::{Deserialize, Serialize};

/// One path within a status category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathEntry {
    pub path: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl PathEntry {
    pub fn new(path: &str, object_id: Option<git2::Oid>) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        Self {
            path: path.to_string(),
            name,
            object_id: object_id.filter(|id| !id.is_zero()).map(|id| id.to_string()),
            location: None,
        }
    }
}

/// Working tree and index state, split into six disjoint-per-category lists.
///
/// All six keys are always serialized, empty or not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub added: Vec<PathEntry>,
    pub changed: Vec<PathEntry>,
    pub missing: Vec<PathEntry>,
    pub modified: Vec<PathEntry>,
    pub removed: Vec<PathEntry>,
    pub untracked: Vec<PathEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl StatusReport {
    pub fn is_clean(&self) -> bool {
        self.categories().iter().all(|c| c.is_empty())
    }

    pub fn categories(&self) -> [&Vec<PathEntry>; 6] {
        [
            &self.added,
            &self.changed,
            &self.missing,
            &self.modified,
            &self.removed,
            &self.untracked,
        ]
    }

    fn categories_mut(&mut self) -> [&mut Vec<PathEntry>; 6] {
        [
            &mut self.added,
            &mut self.changed,
            &mut self.missing,
            &mut self.modified,
            &mut self.removed,
            &mut self.untracked,
        ]
    }

    /// Sort every category by path
    pub fn sort(&mut self) {
        for category in self.categories_mut() {
            category.sort_by(|a, b| a.path.cmp(&b.path));
        }
    }

    /// Attach the report location and a file link per entry
    pub fn with_links(mut self, location: String, file_location: impl Fn(&str) -> String) -> Self {
        for category in self.categories_mut() {
            for entry in category.iter_mut() {
                entry.location = Some(file_location(&entry.path));
            }
        }
        self.location = Some(location);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_serializes_all_categories() {
        let json = serde_json::to_value(StatusReport::default()).unwrap();
        for key in ["added", "changed", "missing", "modified", "removed", "untracked"] {
            assert_eq!(json[key], serde_json::json!([]), "missing key {}", key);
        }
    }

    #[test]
    fn test_path_entry_name_is_last_segment() {
        let entry = PathEntry::new("dir/sub/file.txt", None);
        assert_eq!(entry.name, "file.txt");
        assert!(entry.object_id.is_none());
    }

    #[test]
    fn test_zero_oid_is_absent() {
        let entry = PathEntry::new("a.txt", Some(git2::Oid::zero()));
        assert!(entry.object_id.is_none());
    }
}
