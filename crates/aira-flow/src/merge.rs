use std::sync::Arc;

use aira_core::{validate_branch_name, BranchKind, Error, GitflowConfig, Result};
use aira_git::GitExecutor;

use crate::{ensure_clean, ensure_work_branch};

/// Result lines of a completed merge, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub branch: String,
    pub results: Vec<String>,
    pub deleted: bool,
}

impl MergeOutcome {
    pub fn text(&self) -> String {
        self.results.join("\n")
    }
}

/// Merges finished work branches into their policy targets.
#[derive(Debug, Clone)]
pub struct MergeManager {
    git: GitExecutor,
    config: Arc<GitflowConfig>,
}

impl MergeManager {
    pub fn new(git: GitExecutor, config: Arc<GitflowConfig>) -> Self {
        Self { git, config }
    }

    /// Merge the work branch into every target of its kind, in policy order.
    ///
    /// The first conflicting merge is aborted and returned as [`Error::Conflict`];
    /// later targets are left untouched. A merge git refuses without starting
    /// is an operation failure.
    pub async fn merge_work_branch(&self, kind: BranchKind, name: &str) -> Result<MergeOutcome> {
        validate_branch_name(name)?;
        ensure_work_branch(&self.config, &self.config.full_branch_name(kind, name))?;
        self.merge(kind, name)
            .await
            .map_err(|e| e.context(format!("failed to merge {kind} branch")))
    }

    async fn merge(&self, kind: BranchKind, name: &str) -> Result<MergeOutcome> {
        let dir = self.git.base_dir();
        ensure_clean(&self.git, dir).await?;

        let policy = self.config.policy(kind);
        let full = self.config.full_branch_name(kind, name);
        let remote = self.config.remote.as_str();

        if !self.git.local_branch_exists(&full, dir).await? {
            return Err(Error::precondition(format!("Branch {full} does not exist.")));
        }

        self.git.execute_or_fail(&["checkout", &full], dir, None).await?;
        self.git
            .execute_or_fail(&["pull", remote, &full], dir, None)
            .await?;

        let mut results = Vec::with_capacity(policy.merge_to.len() + 1);
        for target in &policy.merge_to {
            self.git.execute_or_fail(&["checkout", target], dir, None).await?;
            self.git
                .execute_or_fail(&["pull", remote, target], dir, None)
                .await?;

            let merged = self.git.execute(&["merge", "--no-edit", &full], dir).await?;
            if !merged.success {
                let detail = merged.error.unwrap_or_default();
                // Without MERGE_HEAD git refused the merge outright; nothing to abort.
                let in_progress = self
                    .git
                    .execute(&["rev-parse", "-q", "--verify", "MERGE_HEAD"], dir)
                    .await?
                    .success;
                if !in_progress {
                    return Err(Error::CommandFailed {
                        context: format!("`git merge --no-edit {full}` into {target} failed"),
                        detail,
                    });
                }
                self.git
                    .attempt(&["merge", "--abort"], dir, "merge abort")
                    .await?;
                results.push(format!("Failed to merge {full} into {target}: {detail}"));
                tracing::warn!(branch = %full, %target, "merge conflict; aborted");
                return Err(Error::Conflict {
                    branch: full,
                    target: target.clone(),
                    results,
                });
            }

            self.git
                .execute_or_fail(&["push", remote, target], dir, None)
                .await?;
            tracing::info!(branch = %full, %target, "merged and pushed");
            results.push(format!("Successfully merged {full} into {target}"));
        }

        self.git
            .execute_or_fail(&["checkout", &self.config.develop], dir, None)
            .await?;

        let deleted = policy.delete_after_merge;
        if deleted {
            self.git.execute_or_fail(&["branch", "-D", &full], dir, None).await?;
            self.git
                .execute_or_fail(&["push", remote, "--delete", &full], dir, None)
                .await?;
            tracing::info!(branch = %full, "deleted merged branch");
            results.push(format!("Deleted branch {full}"));
        }

        Ok(MergeOutcome {
            branch: full,
            results,
            deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aira_core::ErrorKind;
    use aira_git::testutil::{commit_and_push, git, init_repo_with_origin};
    use aira_git::{RawOutput, ScriptedGit};

    fn three_target_config() -> Arc<GitflowConfig> {
        let mut cfg = GitflowConfig::default();
        cfg.work_branches.custom.merge_to =
            vec!["main".into(), "develop".into(), "staging".into()];
        Arc::new(cfg)
    }

    #[tokio::test]
    async fn first_conflict_stops_remaining_targets() {
        let runner = Arc::new(ScriptedGit::new());
        runner.on_sequence(
            "merge --no-edit",
            vec![
                RawOutput::ok("Fast-forward"),
                RawOutput::err("CONFLICT (content): Merge conflict in README"),
            ],
        );
        let manager = MergeManager::new(
            GitExecutor::with_runner("/repo", runner.clone()),
            three_target_config(),
        );

        let err = manager
            .merge_work_branch(BranchKind::Custom, "spike")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConflictDetected);
        let Error::Conflict { target, results, .. } = err else {
            panic!("expected conflict");
        };
        assert_eq!(target, "develop");
        assert_eq!(
            results,
            vec![
                "Successfully merged spike into main".to_string(),
                "Failed to merge spike into develop: CONFLICT (content): Merge conflict in README"
                    .to_string(),
            ]
        );
        assert!(runner.called("merge --abort"));
        assert!(runner.called("push origin main"));
        assert!(!runner.called("push origin develop"));
        assert!(!runner.called("checkout staging"));
        assert!(!runner.called("branch -D spike"));
    }

    #[tokio::test]
    async fn full_sequence_ends_on_develop_and_deletes() {
        let runner = Arc::new(ScriptedGit::new());
        let manager = MergeManager::new(
            GitExecutor::with_runner("/repo", runner.clone()),
            Arc::new(GitflowConfig::default()),
        );
        let outcome = manager
            .merge_work_branch(BranchKind::Release, "1.0")
            .await
            .unwrap();
        assert!(outcome.deleted);
        assert_eq!(
            outcome.text(),
            "Successfully merged release/1.0 into main\n\
             Successfully merged release/1.0 into develop\n\
             Deleted branch release/1.0"
        );
        assert_eq!(
            runner.calls(),
            vec![
                "status --porcelain",
                "rev-parse --verify --quiet refs/heads/release/1.0",
                "checkout release/1.0",
                "pull origin release/1.0",
                "checkout main",
                "pull origin main",
                "merge --no-edit release/1.0",
                "push origin main",
                "checkout develop",
                "pull origin develop",
                "merge --no-edit release/1.0",
                "push origin develop",
                "checkout develop",
                "branch -D release/1.0",
                "push origin --delete release/1.0",
            ]
        );
    }

    #[tokio::test]
    async fn keeps_branch_when_policy_says_so() {
        let mut cfg = GitflowConfig::default();
        cfg.work_branches.feature.delete_after_merge = false;
        let runner = Arc::new(ScriptedGit::new());
        let manager = MergeManager::new(
            GitExecutor::with_runner("/repo", runner.clone()),
            Arc::new(cfg),
        );
        let outcome = manager
            .merge_work_branch(BranchKind::Feature, "login")
            .await
            .unwrap();
        assert!(!outcome.deleted);
        assert_eq!(outcome.results, vec!["Successfully merged feature/login into develop"]);
        assert!(!runner.calls().iter().any(|c| c.starts_with("branch -D")));
    }

    #[tokio::test]
    async fn refused_merge_is_not_a_conflict() {
        let runner = Arc::new(ScriptedGit::new());
        runner.on(
            "merge --no-edit",
            RawOutput::err("fatal: refusing to merge unrelated histories"),
        );
        runner.on("rev-parse -q --verify MERGE_HEAD", RawOutput::err(""));
        let manager = MergeManager::new(
            GitExecutor::with_runner("/repo", runner.clone()),
            Arc::new(GitflowConfig::default()),
        );
        let err = manager
            .merge_work_branch(BranchKind::Feature, "login")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OperationFailed);
        assert!(err.to_string().contains("refusing to merge unrelated histories"));
        assert!(!runner.called("merge --abort"));
        assert!(!runner.called("push origin develop"));
    }

    #[tokio::test]
    async fn long_lived_branches_are_never_merged() {
        let runner = Arc::new(ScriptedGit::new());
        let manager = MergeManager::new(
            GitExecutor::with_runner("/repo", runner.clone()),
            Arc::new(GitflowConfig::default()),
        );
        for name in ["main", "develop"] {
            let err = manager
                .merge_work_branch(BranchKind::Custom, name)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParams);
        }
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn merging_main_as_custom_leaves_it_intact() {
        let (_tmp, repo) = init_repo_with_origin();
        git(&repo, &["checkout", "-q", "develop"]);
        let manager = MergeManager::new(
            GitExecutor::new(&repo),
            Arc::new(GitflowConfig::default()),
        );
        let err = manager
            .merge_work_branch(BranchKind::Custom, "main")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParams);
        assert!(!git(&repo, &["branch", "--list", "main"]).trim().is_empty());
        let remote = git(&repo, &["ls-remote", "--heads", "origin", "refs/heads/main"]);
        assert!(!remote.trim().is_empty());
    }

    #[tokio::test]
    async fn missing_branch_is_a_precondition() {
        let runner = Arc::new(ScriptedGit::new());
        runner.on("rev-parse --verify", RawOutput::err(""));
        let manager = MergeManager::new(
            GitExecutor::with_runner("/repo", runner.clone()),
            Arc::new(GitflowConfig::default()),
        );
        let err = manager
            .merge_work_branch(BranchKind::Feature, "ghost")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
        assert_eq!(err.to_string(), "Branch feature/ghost does not exist.");
        assert!(!runner.calls().iter().any(|c| c.starts_with("checkout")));
    }

    #[tokio::test]
    async fn failed_push_after_merge_is_an_operation_failure() {
        let runner = Arc::new(ScriptedGit::new());
        runner.on("push origin develop", RawOutput::err("rejected"));
        let manager = MergeManager::new(
            GitExecutor::with_runner("/repo", runner.clone()),
            Arc::new(GitflowConfig::default()),
        );
        let err = manager
            .merge_work_branch(BranchKind::Feature, "login")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OperationFailed);
        assert!(err.to_string().starts_with("failed to merge feature branch: "));
        assert!(!runner.called("merge --abort"));
    }

    #[tokio::test]
    async fn merges_feature_into_develop_and_deletes_it() {
        let (_tmp, repo) = init_repo_with_origin();
        git(&repo, &["checkout", "-q", "-b", "feature/login", "develop"]);
        commit_and_push(&repo, "login.rs", "fn login() {}", "add login");
        git(&repo, &["checkout", "-q", "develop"]);

        let manager = MergeManager::new(
            GitExecutor::new(&repo),
            Arc::new(GitflowConfig::default()),
        );
        let outcome = manager
            .merge_work_branch(BranchKind::Feature, "login")
            .await
            .unwrap();
        assert_eq!(
            outcome.results,
            vec![
                "Successfully merged feature/login into develop",
                "Deleted branch feature/login",
            ]
        );
        assert_eq!(
            git(&repo, &["rev-parse", "--abbrev-ref", "HEAD"]).trim(),
            "develop"
        );
        assert!(repo.join("login.rs").exists());
        assert!(git(&repo, &["branch", "--list", "feature/login"]).trim().is_empty());
        let remote = git(&repo, &["ls-remote", "--heads", "origin", "refs/heads/feature/login"]);
        assert!(remote.trim().is_empty());
        let remote_develop = git(&repo, &["ls-remote", "--heads", "origin", "refs/heads/develop"]);
        let local_develop = git(&repo, &["rev-parse", "develop"]);
        assert!(remote_develop.starts_with(local_develop.trim()));
    }

    #[tokio::test]
    async fn conflict_on_second_target_is_aborted_cleanly() {
        let (_tmp, repo) = init_repo_with_origin();
        git(&repo, &["checkout", "-q", "develop"]);
        commit_and_push(&repo, "README", "develop edit", "develop readme");
        git(&repo, &["checkout", "-q", "-b", "hotfix/urgent", "main"]);
        commit_and_push(&repo, "README", "hotfix edit", "hotfix readme");
        git(&repo, &["checkout", "-q", "main"]);

        let manager = MergeManager::new(
            GitExecutor::new(&repo),
            Arc::new(GitflowConfig::default()),
        );
        let err = manager
            .merge_work_branch(BranchKind::Hotfix, "urgent")
            .await
            .unwrap_err();
        let Error::Conflict { target, results, .. } = err else {
            panic!("expected conflict");
        };
        assert_eq!(target, "develop");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], "Successfully merged hotfix/urgent into main");
        assert!(results[1].starts_with("Failed to merge hotfix/urgent into develop: "));

        assert!(git(&repo, &["status", "--porcelain"]).trim().is_empty());
        assert!(!repo.join(".git/MERGE_HEAD").exists());
        assert!(!git(&repo, &["branch", "--list", "hotfix/urgent"]).trim().is_empty());
    }
}
