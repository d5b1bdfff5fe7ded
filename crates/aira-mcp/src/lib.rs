use std::path::{Path, PathBuf};
use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::service::RequestContext;
use rmcp::{
    tool, tool_handler, tool_router, ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use aira_core::{BranchKind, CommitType, ErrorKind, GitflowConfig, Language, COMMIT_TYPES};
use aira_flow::{BranchManager, GitflowInitializer, MergeManager};
use aira_git::{CommitManager, CommitRequest, GitExecutor, StatusManager};

const COMMIT_TYPES_URI: &str = "aira://commit-types";
const GITFLOW_URI: &str = "aira://gitflow";

// --- Tool parameter structs ---

#[derive(Debug, Deserialize, JsonSchema)]
struct PathParams {
    /// Repository directory (default: the server's repository root)
    path: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct StageParams {
    /// File to stage, relative to the repository directory
    file: String,
    /// Repository directory (default: the server's repository root)
    path: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct CommitParams {
    /// The single file to commit
    file: String,
    /// Repository directory (default: the server's repository root)
    path: Option<String>,
    /// Commit type: feat, fix, docs, style, refactor, perf, test or chore
    #[serde(rename = "type")]
    commit_type: CommitType,
    /// Emoji placed before the type (see the aira://commit-types resource)
    emoji: String,
    /// Commit title
    title: String,
    /// Commit body, added as its own paragraph
    body: Option<String>,
    /// Commit footer, added as its own paragraph
    footer: Option<String>,
    /// Message language: ja or en (default: ja)
    language: Option<Language>,
    /// Target branch (default: develop)
    branch: Option<String>,
    /// Issue number rendered as " #<n>" after the type
    issue_number: Option<u64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct BranchParams {
    /// Branch type: feature, release, hotfix or custom
    #[serde(rename = "type")]
    kind: BranchKind,
    /// Branch name without prefix (custom branches use the name as is)
    name: String,
}

// --- MCP Server ---

/// MCP server for single-file commits and Gitflow branch management.
#[derive(Clone)]
pub struct AiraServer {
    git: GitExecutor,
    config: Arc<GitflowConfig>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl AiraServer {
    pub fn new(repo_root: PathBuf, config: Arc<GitflowConfig>) -> Self {
        Self::with_git(GitExecutor::new(repo_root), config)
    }

    pub fn with_git(git: GitExecutor, config: Arc<GitflowConfig>) -> Self {
        Self {
            git,
            config,
            tool_router: Self::tool_router(),
        }
    }

    pub fn repo_root(&self) -> &Path {
        self.git.base_dir()
    }

    /// Relative paths are taken from the repository root; blank means none.
    fn resolve_path(&self, path: Option<String>) -> Option<PathBuf> {
        let path = path.filter(|p| !p.trim().is_empty())?;
        let path = PathBuf::from(path);
        Some(if path.is_absolute() {
            path
        } else {
            self.repo_root().join(path)
        })
    }

    fn status_manager(&self) -> StatusManager {
        StatusManager::new(self.git.clone())
    }

    /// Porcelain status of every changed path
    #[tool(description = "Get the git status of the repository as a list of changed files")]
    async fn get_status(
        &self,
        Parameters(params): Parameters<PathParams>,
    ) -> Result<CallToolResult, McpError> {
        let dir = self.resolve_path(params.path);
        let entries = self
            .status_manager()
            .get_status(dir.as_deref())
            .await
            .map_err(|e| to_mcp_err("get status", e))?;
        json_result(&entries)
    }

    #[tool(description = "List files currently staged for commit")]
    async fn get_staged_files(
        &self,
        Parameters(params): Parameters<PathParams>,
    ) -> Result<CallToolResult, McpError> {
        let dir = self.resolve_path(params.path);
        let staged = self
            .status_manager()
            .get_staged_files(dir.as_deref())
            .await
            .map_err(|e| to_mcp_err("get staged files", e))?;
        json_result(&staged)
    }

    #[tool(description = "Stage a single file")]
    async fn stage_file(
        &self,
        Parameters(params): Parameters<StageParams>,
    ) -> Result<CallToolResult, McpError> {
        require("file", &params.file)?;
        let dir = self.resolve_path(params.path);
        self.status_manager()
            .stage_file(&params.file, dir.as_deref())
            .await
            .map_err(|e| to_mcp_err("stage file", e))?;

        Ok(CallToolResult::success(vec![Content::text(format!(
            "Successfully staged file: {}",
            params.file
        ))]))
    }

    /// Commit exactly one file onto a Gitflow branch
    #[tool(
        description = "Commit a single file with an emoji-prefixed conventional message on the target branch (default develop), creating and pushing the branch if needed"
    )]
    async fn create_commit(
        &self,
        Parameters(params): Parameters<CommitParams>,
    ) -> Result<CallToolResult, McpError> {
        require("file", &params.file)?;
        require("emoji", &params.emoji)?;
        require("title", &params.title)?;

        let mut req = CommitRequest::new(
            params.file.clone(),
            params.commit_type,
            params.emoji,
            params.title,
        );
        req.body = params.body;
        req.footer = params.footer;
        req.language = params.language.unwrap_or_default();
        req.target_branch = params.branch.filter(|b| !b.trim().is_empty());
        req.issue_number = params.issue_number;
        req.path = self.resolve_path(params.path);

        let summary = CommitManager::new(self.git.clone(), self.config.clone())
            .create_commit(&req)
            .await
            .map_err(|e| to_mcp_err("create commit", e))?;

        Ok(CallToolResult::success(vec![Content::text(format!(
            "Successfully committed {} with message:\n{summary}",
            params.file
        ))]))
    }

    #[tool(description = "Initialize gitflow: create main and develop if missing and switch to develop")]
    async fn init_gitflow(&self) -> Result<CallToolResult, McpError> {
        GitflowInitializer::new(self.git.clone(), self.config.clone())
            .initialize()
            .await
            .map_err(|e| to_mcp_err("initialize gitflow", e))?;

        Ok(CallToolResult::success(vec![Content::text(
            "Successfully initialized gitflow",
        )]))
    }

    #[tool(description = "Create a feature, release, hotfix or custom branch from its base branch and push it")]
    async fn create_branch(
        &self,
        Parameters(params): Parameters<BranchParams>,
    ) -> Result<CallToolResult, McpError> {
        require("name", &params.name)?;
        let full = BranchManager::new(self.git.clone(), self.config.clone())
            .create_work_branch(params.kind, &params.name)
            .await
            .map_err(|e| to_mcp_err("create branch", e))?;

        Ok(CallToolResult::success(vec![Content::text(format!(
            "Successfully created branch: {full}"
        ))]))
    }

    /// Merge a work branch into its targets, stopping at the first conflict
    #[tool(
        description = "Merge a work branch into its configured targets, push them, and delete the branch if the policy says so"
    )]
    async fn merge_branch(
        &self,
        Parameters(params): Parameters<BranchParams>,
    ) -> Result<CallToolResult, McpError> {
        require("name", &params.name)?;
        let outcome = MergeManager::new(self.git.clone(), self.config.clone())
            .merge_work_branch(params.kind, &params.name)
            .await
            .map_err(|e| to_mcp_err("merge branch", e))?;

        Ok(CallToolResult::success(vec![Content::text(outcome.text())]))
    }

    #[tool(description = "List local branches grouped by gitflow role")]
    async fn list_branches(&self) -> Result<CallToolResult, McpError> {
        let branches = BranchManager::new(self.git.clone(), self.config.clone())
            .list_branches()
            .await
            .map_err(|e| to_mcp_err("list branches", e))?;
        json_result(&branches)
    }

    fn resource_text(&self, uri: &str) -> Result<String, McpError> {
        let text = match uri {
            COMMIT_TYPES_URI => serde_json::to_string_pretty(COMMIT_TYPES),
            GITFLOW_URI => serde_json::to_string_pretty(self.config.as_ref()),
            _ => {
                return Err(McpError::resource_not_found(
                    format!("Unknown resource: {uri}"),
                    None,
                ))
            }
        };
        text.map_err(|e| McpError::internal_error(e.to_string(), None))
    }
}

#[tool_handler]
impl ServerHandler for AiraServer {
    fn get_info(&self) -> ServerInfo {
        let mut server_info = Implementation::from_build_env();
        server_info.name = "aira".into();
        server_info.version = env!("CARGO_PKG_VERSION").into();
        ServerInfo {
            instructions: Some(
                "aira git server: inspect status, stage and commit single files, and drive the gitflow branch lifecycle"
                    .into(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info,
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _req: Option<PaginatedRequestParams>,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let mut types = RawResource::new(COMMIT_TYPES_URI, "Commit Types");
        types.description = Some("Commit types with their allowed emojis".into());
        types.mime_type = Some("application/json".into());

        let mut policy = RawResource::new(GITFLOW_URI, "Gitflow Policy");
        policy.description =
            Some("Main/develop names, remote and work-branch policy in effect".into());
        policy.mime_type = Some("application/json".into());

        Ok(ListResourcesResult {
            resources: vec![types.no_annotation(), policy.no_annotation()],
            ..Default::default()
        })
    }

    async fn read_resource(
        &self,
        req: ReadResourceRequestParams,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let text = self.resource_text(&req.uri)?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, &req.uri)],
        })
    }
}

fn require(field: &str, value: &str) -> Result<(), McpError> {
    if value.trim().is_empty() {
        return Err(McpError::invalid_params(
            format!("{field} must not be empty"),
            None,
        ));
    }
    Ok(())
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// Map a core failure to the protocol error for the tool that ran `op`.
fn to_mcp_err(op: &str, e: aira_core::Error) -> McpError {
    let mut message = format!("Failed to {op}: {e}");
    if let aira_core::Error::Conflict { results, .. } = &e {
        for line in results {
            message.push('\n');
            message.push_str(line);
        }
    }
    match e.kind() {
        ErrorKind::InvalidParams => McpError::invalid_params(message, None),
        ErrorKind::PreconditionFailed | ErrorKind::ConflictDetected => {
            McpError::invalid_request(message, None)
        }
        ErrorKind::OperationFailed => McpError::internal_error(message, None),
    }
}

/// Start the MCP server on stdio transport.
pub async fn serve(repo_root: &Path, config: Arc<GitflowConfig>) -> anyhow::Result<()> {
    if !repo_root.is_dir() {
        anyhow::bail!("repository directory {} does not exist", repo_root.display());
    }

    tracing::info!(repo = %repo_root.display(), "starting aira MCP server on stdio");
    let server = AiraServer::new(repo_root.to_path_buf(), config);
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;
    Ok(())
}
