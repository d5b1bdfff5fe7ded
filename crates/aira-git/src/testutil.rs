//! Throwaway repositories for tests.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Run git synchronously, panicking on failure. Returns stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).into_owned()
}

/// Repository on `main` with one commit containing `README`.
pub fn init_repo() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("work");
    std::fs::create_dir_all(&repo).unwrap();
    git(&repo, &["init", "-q"]);
    git(&repo, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(&repo, &["config", "user.email", "test@test.com"]);
    git(&repo, &["config", "user.name", "Test"]);
    git(&repo, &["config", "pull.rebase", "false"]);
    std::fs::write(repo.join("README"), "hi").unwrap();
    git(&repo, &["add", "."]);
    git(&repo, &["commit", "-q", "-m", "init"]);
    (tmp, repo)
}

/// Like [`init_repo`], plus a bare `origin` holding `main` and `develop`.
pub fn init_repo_with_origin() -> (TempDir, PathBuf) {
    let (tmp, repo) = init_repo();
    let origin = tmp.path().join("origin.git");
    git(tmp.path(), &["init", "-q", "--bare", "origin.git"]);
    git(&repo, &["remote", "add", "origin", origin.to_str().unwrap()]);
    git(&repo, &["push", "-q", "-u", "origin", "main"]);
    git(&repo, &["branch", "develop"]);
    git(&repo, &["push", "-q", "-u", "origin", "develop"]);
    (tmp, repo)
}

/// Repository with no commits and unborn `main`, plus an empty bare `origin`.
pub fn init_empty_repo_with_origin() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("work");
    std::fs::create_dir_all(&repo).unwrap();
    git(&repo, &["init", "-q"]);
    git(&repo, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(&repo, &["config", "user.email", "test@test.com"]);
    git(&repo, &["config", "user.name", "Test"]);
    git(tmp.path(), &["init", "-q", "--bare", "origin.git"]);
    let origin = tmp.path().join("origin.git");
    git(&repo, &["remote", "add", "origin", origin.to_str().unwrap()]);
    (tmp, repo)
}

/// Commit `content` to `file` on the current branch and push it.
pub fn commit_and_push(repo: &Path, file: &str, content: &str, message: &str) {
    std::fs::write(repo.join(file), content).unwrap();
    git(repo, &["add", file]);
    git(repo, &["commit", "-q", "-m", message]);
    git(repo, &["push", "-q", "origin", "HEAD"]);
}
