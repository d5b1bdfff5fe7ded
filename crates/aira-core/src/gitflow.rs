use std::fmt;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Optional per-repository policy override, relative to the repository root.
pub const CONFIG_FILE: &str = ".aira/gitflow.yaml";

/// Kinds of short-lived work branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BranchKind {
    Feature,
    Release,
    Hotfix,
    Custom,
}

impl BranchKind {
    pub const ALL: [BranchKind; 4] = [
        BranchKind::Feature,
        BranchKind::Release,
        BranchKind::Hotfix,
        BranchKind::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BranchKind::Feature => "feature",
            BranchKind::Release => "release",
            BranchKind::Hotfix => "hotfix",
            BranchKind::Custom => "custom",
        }
    }
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BranchKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        BranchKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                Error::invalid_params(format!(
                    "unknown branch type '{s}' (expected feature, release, hotfix or custom)"
                ))
            })
    }
}

/// Naming, base and merge policy for one work-branch kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchPolicy {
    pub prefix: String,
    pub base: String,
    /// Merge targets, merged in this order.
    pub merge_to: Vec<String>,
    pub delete_after_merge: bool,
    #[serde(default)]
    pub description: String,
}

impl BranchPolicy {
    fn new(prefix: &str, base: &str, merge_to: &[&str], description: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            base: base.to_string(),
            merge_to: merge_to.iter().map(|s| s.to_string()).collect(),
            delete_after_merge: true,
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkBranches {
    pub feature: BranchPolicy,
    pub release: BranchPolicy,
    pub hotfix: BranchPolicy,
    pub custom: BranchPolicy,
}

impl Default for WorkBranches {
    fn default() -> Self {
        Self {
            feature: BranchPolicy::new(
                "feature/",
                "develop",
                &["develop"],
                "New feature work. Branches from develop, merges back into develop.",
            ),
            release: BranchPolicy::new(
                "release/",
                "develop",
                &["main", "develop"],
                "Release preparation. Branches from develop, merges into main and develop.",
            ),
            hotfix: BranchPolicy::new(
                "hotfix/",
                "main",
                &["main", "develop"],
                "Urgent production fix. Branches from main, merges into main and develop.",
            ),
            custom: BranchPolicy::new(
                "",
                "develop",
                &["develop"],
                "Arbitrary branch name. Branches from develop, merges into develop.",
            ),
        }
    }
}

/// Gitflow policy: long-lived branch names, remote, and work-branch table.
///
/// Loaded once at start-up and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitflowConfig {
    pub remote: String,
    pub main: String,
    pub develop: String,
    pub work_branches: WorkBranches,
}

impl Default for GitflowConfig {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            main: "main".to_string(),
            develop: "develop".to_string(),
            work_branches: WorkBranches::default(),
        }
    }
}

impl GitflowConfig {
    /// Load `<repo_root>/.aira/gitflow.yaml` if present, else the built-in policy.
    pub fn load(repo_root: &Path) -> anyhow::Result<Self> {
        let path = Self::config_path(repo_root);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_yaml(&content)
            .map_err(|e| anyhow::anyhow!("invalid gitflow config {}: {e}", path.display()))?;
        tracing::info!(path = %path.display(), "loaded gitflow policy override");
        Ok(config)
    }

    pub fn config_path(repo_root: &Path) -> PathBuf {
        repo_root.join(CONFIG_FILE)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (label, name) in [
            ("remote", &self.remote),
            ("main", &self.main),
            ("develop", &self.develop),
        ] {
            if name.trim().is_empty() {
                anyhow::bail!("{label} must not be empty");
            }
        }
        let mut prefixes: Vec<&str> = Vec::new();
        for kind in BranchKind::ALL {
            let policy = self.policy(kind);
            if policy.base.trim().is_empty() {
                anyhow::bail!("{kind}: base branch must not be empty");
            }
            if policy.merge_to.is_empty() {
                anyhow::bail!("{kind}: at least one merge target is required");
            }
            if kind == BranchKind::Custom {
                continue;
            }
            if policy.prefix.is_empty() {
                anyhow::bail!("{kind}: prefix must not be empty");
            }
            if prefixes.contains(&policy.prefix.as_str()) {
                anyhow::bail!("{kind}: prefix '{}' is used twice", policy.prefix);
            }
            prefixes.push(&policy.prefix);
        }
        Ok(())
    }

    pub fn policy(&self, kind: BranchKind) -> &BranchPolicy {
        match kind {
            BranchKind::Feature => &self.work_branches.feature,
            BranchKind::Release => &self.work_branches.release,
            BranchKind::Hotfix => &self.work_branches.hotfix,
            BranchKind::Custom => &self.work_branches.custom,
        }
    }

    /// Custom branches keep their name; other kinds get the policy prefix.
    pub fn full_branch_name(&self, kind: BranchKind, name: &str) -> String {
        match kind {
            BranchKind::Custom => name.to_string(),
            _ => format!("{}{}", self.policy(kind).prefix, name),
        }
    }

    /// Classify a local branch name. `None` for the main/develop branches.
    pub fn classify(&self, branch: &str) -> Option<BranchKind> {
        if branch == self.main || branch == self.develop {
            return None;
        }
        [BranchKind::Feature, BranchKind::Release, BranchKind::Hotfix]
            .into_iter()
            .find(|kind| {
                let prefix = &self.policy(*kind).prefix;
                !prefix.is_empty() && branch.starts_with(prefix.as_str())
            })
            .or(Some(BranchKind::Custom))
    }
}

/// Reject names git would misparse or refuse before any command runs.
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::invalid_params("branch name must not be empty"));
    }
    if name.starts_with('-') {
        return Err(Error::invalid_params(format!(
            "branch name '{name}' must not start with '-'"
        )));
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::invalid_params(format!(
            "branch name '{name}' must not contain whitespace"
        )));
    }
    if name.contains("..") || name.ends_with('/') || name.ends_with(".lock") {
        return Err(Error::invalid_params(format!(
            "'{name}' is not a valid branch name"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_kind_parses_lowercase_names() {
        for kind in BranchKind::ALL {
            assert_eq!(kind.as_str().parse::<BranchKind>().unwrap(), kind);
        }
        let err = "bugfix".parse::<BranchKind>().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidParams);
    }

    #[test]
    fn default_policy_matches_gitflow() {
        let cfg = GitflowConfig::default();
        assert_eq!(cfg.remote, "origin");
        assert_eq!(cfg.policy(BranchKind::Feature).base, "develop");
        assert_eq!(cfg.policy(BranchKind::Feature).merge_to, vec!["develop"]);
        assert_eq!(cfg.policy(BranchKind::Hotfix).base, "main");
        assert_eq!(
            cfg.policy(BranchKind::Release).merge_to,
            vec!["main", "develop"]
        );
        assert!(BranchKind::ALL
            .iter()
            .all(|k| cfg.policy(*k).delete_after_merge));
        cfg.validate().unwrap();
    }

    #[test]
    fn full_branch_name_applies_prefix() {
        let cfg = GitflowConfig::default();
        assert_eq!(
            cfg.full_branch_name(BranchKind::Feature, "login"),
            "feature/login"
        );
        assert_eq!(cfg.full_branch_name(BranchKind::Hotfix, "1.0.1"), "hotfix/1.0.1");
        assert_eq!(cfg.full_branch_name(BranchKind::Custom, "spike"), "spike");
    }

    #[test]
    fn classify_by_prefix() {
        let cfg = GitflowConfig::default();
        assert_eq!(cfg.classify("feature/login"), Some(BranchKind::Feature));
        assert_eq!(cfg.classify("release/1.2"), Some(BranchKind::Release));
        assert_eq!(cfg.classify("hotfix/urgent"), Some(BranchKind::Hotfix));
        assert_eq!(cfg.classify("main"), None);
        assert_eq!(cfg.classify("develop"), None);
        assert_eq!(cfg.classify("experiment"), Some(BranchKind::Custom));
        assert_eq!(cfg.classify("features-x"), Some(BranchKind::Custom));
    }

    #[test]
    fn yaml_override_is_partial() {
        let cfg = GitflowConfig::from_yaml("remote: upstream\ndevelop: dev\n").unwrap();
        assert_eq!(cfg.remote, "upstream");
        assert_eq!(cfg.develop, "dev");
        assert_eq!(cfg.main, "main");
        assert_eq!(cfg.policy(BranchKind::Feature).prefix, "feature/");
    }

    #[test]
    fn yaml_rejects_empty_merge_targets() {
        let yaml = "work_branches:\n  feature:\n    prefix: feat/\n    base: develop\n    merge_to: []\n    delete_after_merge: false\n";
        assert!(GitflowConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn yaml_rejects_duplicate_prefixes() {
        let yaml = "work_branches:\n  release:\n    prefix: feature/\n    base: develop\n    merge_to: [main]\n    delete_after_merge: true\n";
        let err = GitflowConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("used twice"));
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = GitflowConfig::load(tmp.path()).unwrap();
        assert_eq!(cfg, GitflowConfig::default());
    }

    #[test]
    fn load_reads_override_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join(".aira")).unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE),
            "main: trunk\n",
        )
        .unwrap();
        let cfg = GitflowConfig::load(tmp.path()).unwrap();
        assert_eq!(cfg.main, "trunk");
    }

    #[test]
    fn branch_name_validation() {
        assert!(validate_branch_name("login").is_ok());
        assert!(validate_branch_name("feature/login").is_ok());
        assert!(validate_branch_name("").is_err());
        assert!(validate_branch_name("  ").is_err());
        assert!(validate_branch_name("-f").is_err());
        assert!(validate_branch_name("a b").is_err());
        assert!(validate_branch_name("a..b").is_err());
        assert!(validate_branch_name("x.lock").is_err());
        let err = validate_branch_name("--force").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidParams);
    }
}
