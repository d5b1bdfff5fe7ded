use std::sync::Arc;

use aira_core::{GitflowConfig, Result};
use aira_git::GitExecutor;

pub const INITIAL_COMMIT_MESSAGE: &str = "🎉 Initial commit";

/// Which long-lived branches an initialization run had to create.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitReport {
    pub created_main: bool,
    pub created_develop: bool,
}

/// Bootstraps the main/develop pair. Re-running on an initialized repository
/// only switches to develop.
#[derive(Debug, Clone)]
pub struct GitflowInitializer {
    git: GitExecutor,
    config: Arc<GitflowConfig>,
}

impl GitflowInitializer {
    pub fn new(git: GitExecutor, config: Arc<GitflowConfig>) -> Self {
        Self { git, config }
    }

    pub async fn initialize(&self) -> Result<InitReport> {
        self.run()
            .await
            .map_err(|e| e.context("failed to initialize gitflow"))
    }

    async fn run(&self) -> Result<InitReport> {
        let dir = self.git.base_dir();
        let main = self.config.main.as_str();
        let develop = self.config.develop.as_str();
        let remote = self.config.remote.as_str();
        let mut report = InitReport::default();

        if !self.git.local_branch_exists(main, dir).await? {
            if self.git.is_clean(dir).await? {
                self.git
                    .execute_or_fail(
                        &["commit", "--allow-empty", "-m", INITIAL_COMMIT_MESSAGE],
                        dir,
                        Some("failed to create initial commit"),
                    )
                    .await?;
            }
            // On an unborn main HEAD the initial commit already created the branch.
            if !self.git.local_branch_exists(main, dir).await? {
                self.git.execute_or_fail(&["checkout", "-b", main], dir, None).await?;
            }
            self.git
                .execute_or_fail(&["push", "-u", remote, main], dir, None)
                .await?;
            tracing::info!(branch = main, "created and pushed main branch");
            report.created_main = true;
        }

        if !self.git.local_branch_exists(develop, dir).await? {
            self.git
                .execute_or_fail(&["checkout", "-b", develop, main], dir, None)
                .await?;
            self.git
                .execute_or_fail(&["push", "-u", remote, develop], dir, None)
                .await?;
            tracing::info!(branch = develop, "created and pushed develop branch");
            report.created_develop = true;
        }

        self.git.execute_or_fail(&["checkout", develop], dir, None).await?;
        tracing::debug!(branch = develop, "switched to develop");
        Ok(report)
    }
}
