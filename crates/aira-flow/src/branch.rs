use std::sync::Arc;

use serde::Serialize;

use aira_core::{validate_branch_name, BranchKind, Error, GitflowConfig, Result};
use aira_git::GitExecutor;

use crate::{ensure_clean, ensure_work_branch};

/// Local branches grouped by Gitflow role. Rebuilt on every listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BranchCategorization {
    pub main: String,
    pub develop: String,
    pub feature: Vec<String>,
    pub release: Vec<String>,
    pub hotfix: Vec<String>,
    pub custom: Vec<String>,
}

/// Branch names from `git branch` output, without the `*`/`+` markers.
/// Detached-HEAD pseudo entries are dropped.
pub fn parse_branch_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix("* ")
                .or_else(|| line.strip_prefix("+ "))
                .unwrap_or(line)
                .trim()
        })
        .filter(|name| !name.is_empty() && !name.starts_with('('))
        .map(str::to_string)
        .collect()
}

pub fn categorize<'a>(
    config: &GitflowConfig,
    branches: impl IntoIterator<Item = &'a str>,
) -> BranchCategorization {
    let mut out = BranchCategorization {
        main: config.main.clone(),
        develop: config.develop.clone(),
        ..Default::default()
    };
    for branch in branches {
        let bucket = match config.classify(branch) {
            Some(BranchKind::Feature) => &mut out.feature,
            Some(BranchKind::Release) => &mut out.release,
            Some(BranchKind::Hotfix) => &mut out.hotfix,
            Some(BranchKind::Custom) => &mut out.custom,
            None => continue,
        };
        bucket.push(branch.to_string());
    }
    out
}

/// Creates and lists work branches according to the branch policy.
#[derive(Debug, Clone)]
pub struct BranchManager {
    git: GitExecutor,
    config: Arc<GitflowConfig>,
}

impl BranchManager {
    pub fn new(git: GitExecutor, config: Arc<GitflowConfig>) -> Self {
        Self { git, config }
    }

    /// Branch `name` off the kind's base branch and publish it.
    /// Returns the full branch name (prefix applied unless `kind` is custom).
    pub async fn create_work_branch(&self, kind: BranchKind, name: &str) -> Result<String> {
        validate_branch_name(name)?;
        ensure_work_branch(&self.config, &self.config.full_branch_name(kind, name))?;
        self.create(kind, name)
            .await
            .map_err(|e| e.context(format!("failed to create {kind} branch")))
    }

    async fn create(&self, kind: BranchKind, name: &str) -> Result<String> {
        let dir = self.git.base_dir();
        ensure_clean(&self.git, dir).await?;

        let policy = self.config.policy(kind);
        let full = self.config.full_branch_name(kind, name);
        let remote = self.config.remote.as_str();
        let base = policy.base.as_str();

        if self.git.local_branch_exists(&full, dir).await? {
            return Err(Error::precondition(format!("Branch {full} already exists.")));
        }

        self.git.execute_or_fail(&["checkout", base], dir, None).await?;
        self.git
            .execute_or_fail(&["pull", remote, base], dir, None)
            .await?;

        self.git
            .execute_or_fail(&["checkout", "-b", &full, base], dir, None)
            .await?;
        self.git
            .execute_or_fail(&["push", "-u", remote, &full], dir, None)
            .await?;

        tracing::info!(branch = %full, %base, "created work branch");
        Ok(full)
    }

    pub async fn list_branches(&self) -> Result<BranchCategorization> {
        let raw = self
            .git
            .execute_or_fail(
                &["branch"],
                self.git.base_dir(),
                Some("failed to list branches"),
            )
            .await?;
        let names = parse_branch_list(&raw);
        Ok(categorize(
            &self.config,
            names.iter().map(String::as_str),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aira_core::ErrorKind;
    use aira_git::testutil::{git, init_repo_with_origin};
    use aira_git::{RawOutput, ScriptedGit};

    #[test]
    fn parse_strips_markers() {
        let raw = "  develop\n* feature/login\n+ hotfix/urgent\n  main\n* (HEAD detached at 1a2b3c)\n\n";
        assert_eq!(
            parse_branch_list(raw),
            vec!["develop", "feature/login", "hotfix/urgent", "main"]
        );
    }

    #[test]
    fn categorize_by_policy_prefix() {
        let cfg = GitflowConfig::default();
        let out = categorize(
            &cfg,
            [
                "main",
                "develop",
                "feature/login",
                "feature/signup",
                "release/1.0",
                "hotfix/urgent",
                "experiment",
            ],
        );
        assert_eq!(out.main, "main");
        assert_eq!(out.develop, "develop");
        assert_eq!(out.feature, vec!["feature/login", "feature/signup"]);
        assert_eq!(out.release, vec!["release/1.0"]);
        assert_eq!(out.hotfix, vec!["hotfix/urgent"]);
        assert_eq!(out.custom, vec!["experiment"]);
    }

    #[test]
    fn categorization_serializes_as_object() {
        let out = categorize(&GitflowConfig::default(), ["main", "x"]);
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["main"], "main");
        assert_eq!(json["custom"][0], "x");
        assert!(json["feature"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_runs_base_then_branch_sequence() {
        let runner = Arc::new(ScriptedGit::new());
        runner.on("rev-parse --verify", RawOutput::err(""));
        let manager = BranchManager::new(
            GitExecutor::with_runner("/repo", runner.clone()),
            Arc::new(GitflowConfig::default()),
        );
        let full = manager
            .create_work_branch(BranchKind::Hotfix, "urgent")
            .await
            .unwrap();
        assert_eq!(full, "hotfix/urgent");
        assert_eq!(
            runner.calls(),
            vec![
                "status --porcelain",
                "rev-parse --verify --quiet refs/heads/hotfix/urgent",
                "checkout main",
                "pull origin main",
                "checkout -b hotfix/urgent main",
                "push -u origin hotfix/urgent",
            ]
        );
    }

    #[tokio::test]
    async fn create_rejects_dirty_tree() {
        let runner = Arc::new(ScriptedGit::new());
        runner.on("status --porcelain", RawOutput::ok(" M src/lib.rs"));
        let manager = BranchManager::new(
            GitExecutor::with_runner("/repo", runner.clone()),
            Arc::new(GitflowConfig::default()),
        );
        let err = manager
            .create_work_branch(BranchKind::Feature, "x")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
        assert!(err.to_string().contains("unstaged changes"));
        assert_eq!(runner.calls(), vec!["status --porcelain"]);
    }

    #[tokio::test]
    async fn create_failure_names_branch_kind() {
        let runner = Arc::new(ScriptedGit::new());
        runner.on("rev-parse --verify", RawOutput::err(""));
        runner.on("pull", RawOutput::err("fatal: 'origin' does not appear to be a git repository"));
        let manager = BranchManager::new(
            GitExecutor::with_runner("/repo", runner.clone()),
            Arc::new(GitflowConfig::default()),
        );
        let err = manager
            .create_work_branch(BranchKind::Release, "1.0")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OperationFailed);
        assert!(err.to_string().starts_with("failed to create release branch: "));
        assert!(!runner.calls().iter().any(|c| c.starts_with("checkout -b")));
    }

    #[tokio::test]
    async fn create_rejects_bad_names_before_git() {
        let runner = Arc::new(ScriptedGit::new());
        let manager = BranchManager::new(
            GitExecutor::with_runner("/repo", runner.clone()),
            Arc::new(GitflowConfig::default()),
        );
        let err = manager
            .create_work_branch(BranchKind::Custom, "--delete")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParams);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_long_lived_names() {
        let runner = Arc::new(ScriptedGit::new());
        let manager = BranchManager::new(
            GitExecutor::with_runner("/repo", runner.clone()),
            Arc::new(GitflowConfig::default()),
        );
        for name in ["main", "develop"] {
            let err = manager
                .create_work_branch(BranchKind::Custom, name)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParams);
            assert!(err.to_string().contains("not a work branch"));
        }
        assert!(runner.calls().is_empty());

        // A prefixed name can never collide.
        runner.on("rev-parse --verify", RawOutput::err(""));
        manager
            .create_work_branch(BranchKind::Feature, "main")
            .await
            .unwrap();
        assert!(runner.called("checkout -b feature/main develop"));
    }

    #[tokio::test]
    async fn creates_and_lists_real_branches() {
        let (_tmp, repo) = init_repo_with_origin();
        let manager = BranchManager::new(
            GitExecutor::new(&repo),
            Arc::new(GitflowConfig::default()),
        );

        let full = manager
            .create_work_branch(BranchKind::Feature, "login")
            .await
            .unwrap();
        assert_eq!(full, "feature/login");
        assert_eq!(
            git(&repo, &["rev-parse", "--abbrev-ref", "HEAD"]).trim(),
            "feature/login"
        );
        let remote = git(&repo, &["ls-remote", "--heads", "origin", "refs/heads/feature/login"]);
        assert!(!remote.trim().is_empty());

        manager
            .create_work_branch(BranchKind::Custom, "spike")
            .await
            .unwrap();

        let err = manager
            .create_work_branch(BranchKind::Feature, "login")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));

        let listing = manager.list_branches().await.unwrap();
        assert_eq!(listing.feature, vec!["feature/login"]);
        assert_eq!(listing.custom, vec!["spike"]);
        assert!(listing.release.is_empty());
        assert!(listing.hotfix.is_empty());
    }
}
