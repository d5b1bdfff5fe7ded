//! Porcelain status parsing and staging.

use std::path::Path;

use serde::Serialize;

use aira_core::{Error, Result};

use crate::exec::GitExecutor;

const STATUS_ARGS: [&str; 4] = ["-c", "core.quotePath=false", "status", "--porcelain"];

/// One path from `git status --porcelain`, recomputed on every query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub path: String,
    /// Index (staged) column.
    pub index: char,
    /// Working-tree (unstaged) column.
    pub working: char,
    /// `working` when the index column is blank, else `index`.
    pub status: char,
    pub is_staged: bool,
    pub is_deleted: bool,
    /// Source path of a rename or copy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orig_path: Option<String>,
}

/// Projection of a staged [`StatusEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedFile {
    pub path: String,
    #[serde(rename = "type")]
    pub change: char,
    pub is_deleted: bool,
}

impl From<StatusEntry> for StagedFile {
    fn from(e: StatusEntry) -> Self {
        Self {
            path: e.path,
            change: e.status,
            is_deleted: e.is_deleted,
        }
    }
}

/// Parse porcelain v1 output. Blank and truncated lines are skipped; order is kept.
pub fn parse_status(raw: &str) -> Vec<StatusEntry> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<StatusEntry> {
    let mut codes = line.chars();
    let index = codes.next()?;
    let working = codes.next()?;
    let raw_path = line.get(3..).filter(|p| !p.is_empty())?;

    let (path, orig_path) = match raw_path.split_once(" -> ") {
        Some((from, to)) if matches!(index, 'R' | 'C') || matches!(working, 'R' | 'C') => {
            (unquote(to), Some(unquote(from)))
        }
        _ => (unquote(raw_path), None),
    };

    let status = if index == ' ' { working } else { index };
    Some(StatusEntry {
        path,
        index,
        working,
        status,
        is_staged: index != ' ' && index != '?',
        is_deleted: status == 'D',
        orig_path,
    })
}

/// Strip git's C-style quoting. An unbalanced trailing `"` or `\"` left over
/// by some producers is dropped as well.
fn unquote(raw: &str) -> String {
    match raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) if !inner.is_empty() => c_unescape(inner),
        _ => raw
            .strip_suffix("\\\"")
            .or_else(|| raw.strip_suffix('"'))
            .unwrap_or(raw)
            .to_string(),
    }
}

fn c_unescape(s: &str) -> String {
    let mut bytes = Vec::with_capacity(s.len());
    let mut it = s.bytes().peekable();
    while let Some(b) = it.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        match it.next() {
            Some(b'n') => bytes.push(b'\n'),
            Some(b't') => bytes.push(b'\t'),
            Some(d @ b'0'..=b'7') => {
                let mut value = u32::from(d - b'0');
                for _ in 0..2 {
                    match it.peek() {
                        Some(&n @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(n - b'0');
                            it.next();
                        }
                        _ => break,
                    }
                }
                bytes.push((value & 0xff) as u8);
            }
            Some(other) => bytes.push(other),
            None => bytes.push(b'\\'),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Status queries and staging over a [`GitExecutor`].
#[derive(Debug, Clone)]
pub struct StatusManager {
    git: GitExecutor,
}

impl StatusManager {
    pub fn new(git: GitExecutor) -> Self {
        Self { git }
    }

    pub async fn get_status(&self, dir: Option<&Path>) -> Result<Vec<StatusEntry>> {
        let dir = self.git.resolve_dir(dir);
        let raw = self
            .git
            .execute_or_fail(&STATUS_ARGS, dir, Some("failed to read git status"))
            .await?;
        Ok(parse_status(&raw))
    }

    pub async fn get_staged_files(&self, dir: Option<&Path>) -> Result<Vec<StagedFile>> {
        Ok(self
            .get_status(dir)
            .await?
            .into_iter()
            .filter(|e| e.is_staged)
            .map(StagedFile::from)
            .collect())
    }

    pub async fn is_file_staged(&self, file: &str, dir: &Path) -> Result<bool> {
        let wanted = file.trim_start_matches("./");
        Ok(self
            .get_status(Some(dir))
            .await?
            .iter()
            .any(|e| e.is_staged && e.path == wanted))
    }

    pub async fn stage_file(&self, file: &str, dir: Option<&Path>) -> Result<()> {
        if file.trim().is_empty() {
            return Err(Error::invalid_params("file must not be empty"));
        }
        let dir = self.git.resolve_dir(dir);
        self.git
            .execute_or_fail(
                &["add", "--", file],
                dir,
                Some(&format!("Failed to stage file: {file}")),
            )
            .await?;
        tracing::debug!(file, "staged");
        Ok(())
    }
}
