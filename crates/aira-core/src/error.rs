use std::path::PathBuf;

/// Failure classes surfaced to callers of the git and gitflow operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed tool arguments. Never reaches a git command.
    InvalidParams,
    /// Not a repository, dirty working tree, missing branch or file.
    PreconditionFailed,
    /// A git command failed during normal execution.
    OperationFailed,
    /// A merge produced conflicts and was aborted.
    ConflictDetected,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid arguments: {0}")]
    InvalidParams(String),

    #[error("'{}' is not a git repository", .0.display())]
    NotARepository(PathBuf),

    #[error("{0}")]
    Precondition(String),

    #[error("{context}: {detail}")]
    CommandFailed { context: String, detail: String },

    #[error(
        "merge conflict while merging {branch} into {target}; resolve conflicts manually"
    )]
    Conflict {
        branch: String,
        target: String,
        /// Result lines accumulated up to and including the failed target.
        results: Vec<String>,
    },

    #[error("failed to run git: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidParams(_) => ErrorKind::InvalidParams,
            Error::NotARepository(_) | Error::Precondition(_) => ErrorKind::PreconditionFailed,
            Error::CommandFailed { .. } | Error::Io(_) => ErrorKind::OperationFailed,
            Error::Conflict { .. } => ErrorKind::ConflictDetected,
        }
    }

    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Error::InvalidParams(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Error::Precondition(msg.into())
    }

    /// Prefix an operation failure with the high-level step that failed.
    /// Precondition, parameter and conflict errors already say what went wrong
    /// and are returned unchanged.
    pub fn context(self, op: impl Into<String>) -> Self {
        let op = op.into();
        match self {
            Error::CommandFailed { context, detail } => Error::CommandFailed {
                context: format!("{op}: {context}"),
                detail,
            },
            Error::Io(e) => Error::CommandFailed {
                context: op,
                detail: e.to_string(),
            },
            other => other,
        }
    }
}
