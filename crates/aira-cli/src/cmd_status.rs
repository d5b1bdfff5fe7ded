use std::path::Path;

use aira_git::{GitExecutor, StatusManager};

/// Status (or only the staged files) as pretty JSON.
pub async fn status(repo_root: &Path, path: Option<&Path>, staged: bool) -> anyhow::Result<String> {
    let manager = StatusManager::new(GitExecutor::new(repo_root));
    let text = if staged {
        serde_json::to_string_pretty(&manager.get_staged_files(path).await?)?
    } else {
        serde_json::to_string_pretty(&manager.get_status(path).await?)?
    };
    Ok(text)
}

pub async fn stage(repo_root: &Path, file: &str, path: Option<&Path>) -> anyhow::Result<String> {
    StatusManager::new(GitExecutor::new(repo_root))
        .stage_file(file, path)
        .await?;
    Ok(format!("Successfully staged file: {file}"))
}
