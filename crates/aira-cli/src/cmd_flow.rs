use std::path::Path;
use std::sync::Arc;

use aira_core::{BranchKind, GitflowConfig};
use aira_flow::{BranchManager, GitflowInitializer, MergeManager};
use aira_git::GitExecutor;

pub async fn init(repo_root: &Path, config: Arc<GitflowConfig>) -> anyhow::Result<String> {
    let report = GitflowInitializer::new(GitExecutor::new(repo_root), config)
        .initialize()
        .await?;
    tracing::debug!(?report, "gitflow initialized");
    Ok("Successfully initialized gitflow".to_string())
}

pub async fn create(
    repo_root: &Path,
    config: Arc<GitflowConfig>,
    kind: BranchKind,
    name: &str,
) -> anyhow::Result<String> {
    let full = BranchManager::new(GitExecutor::new(repo_root), config)
        .create_work_branch(kind, name)
        .await?;
    Ok(format!("Successfully created branch: {full}"))
}

/// On conflict the partial result lines go to stderr before the error.
pub async fn merge(
    repo_root: &Path,
    config: Arc<GitflowConfig>,
    kind: BranchKind,
    name: &str,
) -> anyhow::Result<String> {
    match MergeManager::new(GitExecutor::new(repo_root), config)
        .merge_work_branch(kind, name)
        .await
    {
        Ok(outcome) => Ok(outcome.text()),
        Err(e) => {
            if let aira_core::Error::Conflict { results, .. } = &e {
                for line in results {
                    eprintln!("{line}");
                }
            }
            Err(e.into())
        }
    }
}

pub async fn list(repo_root: &Path, config: Arc<GitflowConfig>) -> anyhow::Result<String> {
    let branches = BranchManager::new(GitExecutor::new(repo_root), config)
        .list_branches()
        .await?;
    Ok(serde_json::to_string_pretty(&branches)?)
}

/// Effective branch policy in the format of `.aira/gitflow.yaml`.
pub fn policy(config: &GitflowConfig) -> anyhow::Result<String> {
    Ok(serde_yaml::to_string(config)?)
}
