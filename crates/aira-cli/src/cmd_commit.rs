use std::path::Path;
use std::sync::Arc;

use aira_core::{CommitType, GitflowConfig, Language};
use aira_git::{CommitManager, CommitRequest, GitExecutor};

pub struct CommitCliParams<'a> {
    pub repo_root: &'a Path,
    pub file: &'a str,
    pub path: Option<&'a Path>,
    pub commit_type: CommitType,
    pub emoji: &'a str,
    pub title: &'a str,
    pub body: Option<String>,
    pub footer: Option<String>,
    pub language: Option<Language>,
    pub branch: Option<String>,
    pub issue: Option<u64>,
}

pub async fn execute(p: CommitCliParams<'_>, config: Arc<GitflowConfig>) -> anyhow::Result<String> {
    let mut req = CommitRequest::new(p.file, p.commit_type, p.emoji, p.title);
    req.body = p.body;
    req.footer = p.footer;
    req.language = p.language.unwrap_or_default();
    req.target_branch = p.branch;
    req.issue_number = p.issue;
    req.path = p.path.map(Path::to_path_buf);

    let summary = CommitManager::new(GitExecutor::new(p.repo_root), config)
        .create_commit(&req)
        .await?;
    Ok(format!(
        "Successfully committed {} with message:\n{summary}",
        p.file
    ))
}
