//! Single-file commits onto a Gitflow target branch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aira_core::{validate_branch_name, CommitType, Error, GitflowConfig, Language, Result};

use crate::exec::GitExecutor;
use crate::status::StatusManager;

/// A request to commit exactly one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    pub file: String,
    pub commit_type: CommitType,
    pub emoji: String,
    pub title: String,
    pub body: Option<String>,
    pub footer: Option<String>,
    pub language: Language,
    /// Branch to commit on (default: the develop branch).
    pub target_branch: Option<String>,
    pub issue_number: Option<u64>,
    /// Repository directory (default: the executor's base directory).
    pub path: Option<PathBuf>,
}

impl CommitRequest {
    pub fn new(
        file: impl Into<String>,
        commit_type: CommitType,
        emoji: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            commit_type,
            emoji: emoji.into(),
            title: title.into(),
            body: None,
            footer: None,
            language: Language::default(),
            target_branch: None,
            issue_number: None,
            path: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("file", &self.file),
            ("emoji", &self.emoji),
            ("title", &self.title),
        ] {
            if value.trim().is_empty() {
                return Err(Error::invalid_params(format!("{field} must not be empty")));
            }
        }
        if self.file.contains('\n') {
            return Err(Error::invalid_params("exactly one file can be committed"));
        }
        if let Some(branch) = &self.target_branch {
            validate_branch_name(branch)?;
        }
        Ok(())
    }
}

/// `<emoji> [<type>][ #<issue>]: <title>`, then body and footer as paragraphs.
pub fn format_commit_message(req: &CommitRequest) -> String {
    let issue = req
        .issue_number
        .map(|n| format!(" #{n}"))
        .unwrap_or_default();
    let mut parts = vec![format!(
        "{} [{}]{issue}: {}",
        req.emoji, req.commit_type, req.title
    )];
    parts.extend(
        [&req.body, &req.footer]
            .into_iter()
            .flatten()
            .filter(|p| !p.trim().is_empty())
            .cloned(),
    );
    parts.join("\n\n")
}

#[derive(Debug, Clone)]
pub struct CommitManager {
    git: GitExecutor,
    status: StatusManager,
    config: Arc<GitflowConfig>,
}

impl CommitManager {
    pub fn new(git: GitExecutor, config: Arc<GitflowConfig>) -> Self {
        Self {
            status: StatusManager::new(git.clone()),
            git,
            config,
        }
    }

    /// Commit `req.file` on the target branch and return `"[<branch>] <message>"`.
    ///
    /// Pulling before and pushing after the commit are best-effort.
    pub async fn create_commit(&self, req: &CommitRequest) -> Result<String> {
        req.validate()?;
        if !req.commit_type.allows_emoji(&req.emoji) {
            tracing::warn!(
                commit_type = %req.commit_type,
                emoji = %req.emoji,
                "emoji is not in the commit type's emoji set"
            );
        }

        let branch = req
            .target_branch
            .as_deref()
            .unwrap_or(self.config.develop.as_str());
        let dir = self.git.resolve_dir(req.path.as_deref());
        let remote = self.config.remote.as_str();

        self.ensure_branch_exists(branch, dir).await?;

        self.git
            .execute_or_fail(
                &["checkout", branch],
                dir,
                Some(&format!("failed to check out {branch}")),
            )
            .await?;
        self.git
            .attempt(
                &["pull", remote, branch],
                dir,
                &format!("pull from {remote}/{branch}"),
            )
            .await?;

        if !self.status.is_file_staged(&req.file, dir).await? {
            self.status.stage_file(&req.file, Some(dir)).await?;
            tracing::info!(file = %req.file, "automatically staged file");
        }

        let message = format_commit_message(req);
        self.git
            .execute_or_fail(
                &["commit", "-m", &message, "--", &req.file],
                dir,
                Some(&format!("failed to commit {}", req.file)),
            )
            .await?;

        self.git
            .attempt(
                &["push", remote, branch],
                dir,
                &format!("push to {remote}/{branch}"),
            )
            .await?;

        Ok(format!("[{branch}] {message}"))
    }

    /// Make sure `branch` exists locally, tracking the remote when possible.
    async fn ensure_branch_exists(&self, branch: &str, dir: &Path) -> Result<()> {
        let remote = self.config.remote.as_str();
        let local = self.git.local_branch_exists(branch, dir).await?;
        let on_remote = self.git.remote_branch_exists(remote, branch, dir).await?;

        match (local, on_remote) {
            (false, true) => {
                let upstream = format!("{remote}/{branch}");
                self.git
                    .execute_or_fail(
                        &["fetch", remote, branch],
                        dir,
                        Some(&format!("failed to fetch {upstream}")),
                    )
                    .await?;
                self.git
                    .execute_or_fail(
                        &["checkout", "-b", branch, "--track", &upstream],
                        dir,
                        Some(&format!("failed to check out {upstream}")),
                    )
                    .await?;
                tracing::info!(branch, "checked out existing remote branch");
            }
            (false, false) => {
                let main = self.config.main.as_str();
                self.git
                    .execute_or_fail(
                        &["checkout", main],
                        dir,
                        Some(&format!("failed to check out {main}")),
                    )
                    .await?;
                self.git
                    .execute_or_fail(
                        &["checkout", "-b", branch],
                        dir,
                        Some(&format!("failed to create branch {branch}")),
                    )
                    .await?;
                let pushed = self
                    .git
                    .attempt(&["push", "-u", remote, branch], dir, "push of new branch")
                    .await?;
                tracing::info!(branch, pushed, "created branch from {main}");
            }
            (true, false) => {
                self.git
                    .attempt(
                        &["push", "-u", remote, branch],
                        dir,
                        "push of existing local branch",
                    )
                    .await?;
            }
            (true, true) => {}
        }
        Ok(())
    }
}
