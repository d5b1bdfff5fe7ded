pub mod commit;
pub mod exec;
pub mod status;

pub use commit::{format_commit_message, CommitManager, CommitRequest};
pub use exec::{GitExecutor, GitOutput, GitRunner, RawOutput, ScriptedGit, SystemGit};
pub use status::{parse_status, StagedFile, StatusEntry, StatusManager};

#[cfg(any(test, feature = "test-util"))]
pub mod testutil;
