//! Data models for Repogate

pub mod clone;
pub mod commit;
pub mod merge;
pub mod project;
pub mod remote;
pub mod status;
pub mod task;

pub use clone::*;
pub use commit::*;
pub use merge::*;
pub use project::*;
pub use remote::*;
pub use status::*;
pub use task::*;
