//! Merge outcome model

/// Result of merging a ref into HEAD.
///
/// A conflict is a valid repository state, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    AlreadyUpToDate,
    FastForward { commit: String },
    Merged { commit: String, paths: Vec<String> },
    Conflicted { paths: Vec<String> },
}

impl MergeOutcome {
    pub fn is_conflicted(&self) -> bool {
        matches!(self, MergeOutcome::Conflicted { .. })
    }
}
