mod cmd_commit;
mod cmd_flow;
mod cmd_status;
mod log;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use aira_core::{BranchKind, CommitType, GitflowConfig, Language};

#[derive(Parser)]
#[command(
    name = "aira",
    version,
    about = "Single-file commits and Gitflow branch management for coding agents"
)]
struct Cli {
    /// Repository directory (default: current directory)
    #[arg(long, global = true, env = "AIRA_REPO")]
    repo: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show changed files as JSON
    Status {
        /// Only files staged for commit
        #[arg(long)]
        staged: bool,
        /// Repository directory for this query
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Stage a single file
    Stage {
        file: String,
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Commit exactly one file onto a gitflow branch and push it
    Commit {
        /// File to commit
        file: String,
        /// Commit type: feat, fix, docs, style, refactor, perf, test, chore
        #[arg(long = "type")]
        commit_type: CommitType,
        #[arg(long)]
        emoji: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        footer: Option<String>,
        /// Target branch (default: develop)
        #[arg(long)]
        branch: Option<String>,
        /// Issue number shown after the type
        #[arg(long)]
        issue: Option<u64>,
        /// ja or en
        #[arg(long)]
        language: Option<Language>,
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Gitflow branch lifecycle
    Flow {
        #[command(subcommand)]
        cmd: FlowCmd,
    },
    /// MCP server operations
    Mcp {
        #[command(subcommand)]
        cmd: McpCommand,
    },
}

#[derive(Subcommand)]
enum FlowCmd {
    /// Create main and develop if missing, then switch to develop
    Init,
    /// Create a work branch from its base and push it
    Create {
        /// feature, release, hotfix or custom
        kind: BranchKind,
        name: String,
    },
    /// Merge a work branch into its targets
    Merge {
        /// feature, release, hotfix or custom
        kind: BranchKind,
        name: String,
    },
    /// List local branches by role as JSON
    List,
    /// Print the effective branch policy
    Policy,
}

#[derive(Subcommand)]
enum McpCommand {
    /// Start MCP server (stdio transport, JSON-RPC 2.0)
    Serve,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    log::init_logging();

    let repo_root = match cli.repo {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let config = Arc::new(GitflowConfig::load(&repo_root)?);

    let rt = tokio::runtime::Runtime::new()?;
    match cli.cmd {
        Command::Mcp { cmd } => match cmd {
            McpCommand::Serve => rt.block_on(aira_mcp::serve(&repo_root, config)),
        },
        cmd => {
            let text = rt.block_on(run(cmd, &repo_root, config))?;
            println!("{text}");
            Ok(())
        }
    }
}

async fn run(cmd: Command, repo_root: &Path, config: Arc<GitflowConfig>) -> anyhow::Result<String> {
    match cmd {
        Command::Status { staged, path } => {
            cmd_status::status(repo_root, path.as_deref(), staged).await
        }
        Command::Stage { file, path } => cmd_status::stage(repo_root, &file, path.as_deref()).await,
        Command::Commit {
            file,
            commit_type,
            emoji,
            title,
            body,
            footer,
            branch,
            issue,
            language,
            path,
        } => {
            cmd_commit::execute(
                cmd_commit::CommitCliParams {
                    repo_root,
                    file: &file,
                    path: path.as_deref(),
                    commit_type,
                    emoji: &emoji,
                    title: &title,
                    body,
                    footer,
                    language,
                    branch,
                    issue,
                },
                config,
            )
            .await
        }
        Command::Flow { cmd } => match cmd {
            FlowCmd::Init => cmd_flow::init(repo_root, config).await,
            FlowCmd::Create { kind, name } => cmd_flow::create(repo_root, config, kind, &name).await,
            FlowCmd::Merge { kind, name } => cmd_flow::merge(repo_root, config, kind, &name).await,
            FlowCmd::List => cmd_flow::list(repo_root, config).await,
            FlowCmd::Policy => cmd_flow::policy(&config),
        },
        Command::Mcp { .. } => anyhow::bail!("`mcp serve` runs outside the command dispatcher"),
    }
}
