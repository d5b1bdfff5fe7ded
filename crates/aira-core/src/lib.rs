pub mod commit_types;
pub mod error;
pub mod gitflow;

pub use commit_types::{CommitType, CommitTypeInfo, Language, COMMIT_TYPES};
pub use error::{Error, ErrorKind, Result};
pub use gitflow::{validate_branch_name, BranchKind, BranchPolicy, GitflowConfig, WorkBranches};
