//! Gitflow operations over a single repository.
//!
//! Each manager holds a [`GitExecutor`](aira_git::GitExecutor) bound to the
//! repository root and the process-wide [`GitflowConfig`](aira_core::GitflowConfig).

pub mod branch;
pub mod init;
pub mod merge;

pub use branch::{categorize, parse_branch_list, BranchCategorization, BranchManager};
pub use init::{GitflowInitializer, InitReport};
pub use merge::{MergeManager, MergeOutcome};

use std::path::Path;

use aira_core::{Error, GitflowConfig, Result};
use aira_git::GitExecutor;

/// The long-lived main/develop branches are never created, merged or deleted
/// as work branches.
pub(crate) fn ensure_work_branch(config: &GitflowConfig, full: &str) -> Result<()> {
    if full == config.main || full == config.develop {
        return Err(Error::invalid_params(format!(
            "'{full}' is a long-lived gitflow branch, not a work branch"
        )));
    }
    Ok(())
}

/// Reject the operation when the working tree has pending changes.
pub(crate) async fn ensure_clean(git: &GitExecutor, dir: &Path) -> Result<()> {
    if git.is_clean(dir).await? {
        Ok(())
    } else {
        Err(Error::precondition(
            "Working directory has unstaged changes. Please commit or stash your changes.",
        ))
    }
}
