use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};

use aira_core::{Error, Result};

/// Cheap probe run before every command to verify the directory is a repository.
const PROBE: [&str; 2] = ["rev-parse", "--git-dir"];

/// What a single git process produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

impl RawOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
            code: Some(0),
        }
    }

    pub fn err(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
            code: Some(1),
        }
    }

    fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.code {
            Some(code) => format!("exit {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs one git invocation. Implemented by [`SystemGit`] and by [`ScriptedGit`] (tests).
#[async_trait::async_trait]
pub trait GitRunner: Send + Sync {
    async fn run(&self, args: &[&str], cwd: &Path) -> std::io::Result<RawOutput>;
}

/// Spawns the `git` binary found on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

#[async_trait::async_trait]
impl GitRunner for SystemGit {
    async fn run(&self, args: &[&str], cwd: &Path) -> std::io::Result<RawOutput> {
        let output = tokio::process::Command::new("git")
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Never block on a credential prompt.
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await?;

        Ok(RawOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        })
    }
}

/// Result of [`GitExecutor::execute`]. A failed command is data, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

/// Runs git commands against a repository directory.
///
/// Every call first probes that the directory is inside a repository; a failed
/// probe is returned as [`Error::NotARepository`], distinct from command failures.
#[derive(Clone)]
pub struct GitExecutor {
    base_dir: PathBuf,
    runner: Arc<dyn GitRunner>,
}

impl std::fmt::Debug for GitExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitExecutor")
            .field("base_dir", &self.base_dir)
            .finish_non_exhaustive()
    }
}

impl GitExecutor {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self::with_runner(base_dir, Arc::new(SystemGit))
    }

    pub fn with_runner(base_dir: impl Into<PathBuf>, runner: Arc<dyn GitRunner>) -> Self {
        Self {
            base_dir: base_dir.into(),
            runner,
        }
    }

    /// Default repository directory used when a request names none.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn resolve_dir<'a>(&'a self, dir: Option<&'a Path>) -> &'a Path {
        dir.unwrap_or(&self.base_dir)
    }

    pub async fn execute(&self, args: &[&str], dir: &Path) -> Result<GitOutput> {
        self.ensure_repository(dir).await?;

        let command = render(args);
        tracing::debug!(dir = %dir.display(), %command, "running git");

        match self.runner.run(args, dir).await {
            Ok(out) if out.success => {
                let stderr = out.stderr.trim();
                Ok(GitOutput {
                    success: true,
                    // Leading whitespace is significant in porcelain output.
                    output: out.stdout.trim_end().to_string(),
                    error: (!stderr.is_empty()).then(|| stderr.to_string()),
                })
            }
            Ok(out) => Ok(GitOutput {
                success: false,
                output: String::new(),
                error: Some(out.diagnostic()),
            }),
            Err(e) => Ok(GitOutput {
                success: false,
                output: String::new(),
                error: Some(format!("failed to spawn git: {e}")),
            }),
        }
    }

    /// Like [`execute`](Self::execute) but turns a failed command into an error.
    /// `message` replaces the generic "`git <args>` failed" context.
    pub async fn execute_or_fail(
        &self,
        args: &[&str],
        dir: &Path,
        message: Option<&str>,
    ) -> Result<String> {
        let out = self.execute(args, dir).await?;
        if out.success {
            return Ok(out.output);
        }
        Err(Error::CommandFailed {
            context: message
                .map(str::to_string)
                .unwrap_or_else(|| format!("`{}` failed", render(args))),
            detail: out.error.unwrap_or_default(),
        })
    }

    /// Best-effort step: run the command, log a warning on failure and carry on.
    /// Returns whether the command succeeded. A missing repository is still fatal.
    pub async fn attempt(&self, args: &[&str], dir: &Path, what: &str) -> Result<bool> {
        let out = self.execute(args, dir).await?;
        if !out.success {
            tracing::warn!(
                command = %render(args),
                error = out.error.as_deref().unwrap_or(""),
                "{what} failed; continuing"
            );
        }
        Ok(out.success)
    }

    pub async fn local_branch_exists(&self, branch: &str, dir: &Path) -> Result<bool> {
        let reference = format!("refs/heads/{branch}");
        let out = self
            .execute(&["rev-parse", "--verify", "--quiet", &reference], dir)
            .await?;
        Ok(out.success)
    }

    /// True only when the remote answers and actually lists the branch.
    pub async fn remote_branch_exists(&self, remote: &str, branch: &str, dir: &Path) -> Result<bool> {
        let reference = format!("refs/heads/{branch}");
        let out = self
            .execute(&["ls-remote", "--heads", remote, &reference], dir)
            .await?;
        Ok(out.success && !out.output.trim().is_empty())
    }

    pub async fn is_clean(&self, dir: &Path) -> Result<bool> {
        let status = self
            .execute_or_fail(
                &["status", "--porcelain"],
                dir,
                Some("failed to read working tree status"),
            )
            .await?;
        Ok(status.trim().is_empty())
    }

    pub async fn current_branch(&self, dir: &Path) -> Result<String> {
        self.execute_or_fail(
            &["rev-parse", "--abbrev-ref", "HEAD"],
            dir,
            Some("failed to resolve current branch"),
        )
        .await
    }

    async fn ensure_repository(&self, dir: &Path) -> Result<()> {
        match self.runner.run(&PROBE, dir).await {
            Ok(out) if out.success => Ok(()),
            _ => Err(Error::NotARepository(dir.to_path_buf())),
        }
    }
}

fn render(args: &[&str]) -> String {
    format!("git {}", args.join(" "))
}

/// In-memory runner for exercising command sequences without a repository.
///
/// Responses are chosen by the longest registered prefix of the space-joined
/// arguments; unmatched commands succeed with empty output. Every call except
/// the repository probe is recorded.
#[derive(Debug, Default)]
pub struct ScriptedGit {
    rules: Mutex<Vec<(String, VecDeque<RawOutput>)>>,
    calls: Mutex<Vec<String>>,
    not_a_repo: bool,
}

impl ScriptedGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner whose repository probe always fails.
    pub fn outside_repository() -> Self {
        Self {
            not_a_repo: true,
            ..Self::default()
        }
    }

    /// Always answer commands starting with `prefix` with `output`.
    pub fn on(&self, prefix: &str, output: RawOutput) {
        self.on_sequence(prefix, vec![output]);
    }

    /// Answer successive matching calls in order; the last answer repeats.
    pub fn on_sequence(&self, prefix: &str, outputs: Vec<RawOutput>) {
        let mut rules = self.rules.lock().unwrap_or_else(PoisonError::into_inner);
        rules.retain(|(p, _)| p != prefix);
        rules.push((prefix.to_string(), outputs.into()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn called(&self, command: &str) -> bool {
        self.calls().iter().any(|c| c == command)
    }

    fn answer(&self, command: &str) -> RawOutput {
        let mut rules = self.rules.lock().unwrap_or_else(PoisonError::into_inner);
        let best = rules
            .iter_mut()
            .filter(|(prefix, _)| command.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len());
        match best {
            Some((_, queue)) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some((_, queue)) => queue.front().cloned().unwrap_or_default(),
            None => RawOutput::ok(""),
        }
    }
}

#[async_trait::async_trait]
impl GitRunner for ScriptedGit {
    async fn run(&self, args: &[&str], _cwd: &Path) -> std::io::Result<RawOutput> {
        if args == PROBE {
            return Ok(if self.not_a_repo {
                RawOutput::err("fatal: not a git repository")
            } else {
                RawOutput::ok(".git")
            });
        }
        let command = args.join(" ");
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.clone());
        Ok(self.answer(&command))
    }
}
