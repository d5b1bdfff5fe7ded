use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Conventional commit categories accepted by `create_commit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    Feat,
    Fix,
    Docs,
    Style,
    Refactor,
    Perf,
    Test,
    Chore,
}

/// Static description of a commit type and the emojis that go with it.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CommitTypeInfo {
    #[serde(rename = "type")]
    pub commit_type: CommitType,
    pub emojis: &'static [&'static str],
    pub description: &'static str,
}

pub const COMMIT_TYPES: &[CommitTypeInfo] = &[
    CommitTypeInfo {
        commit_type: CommitType::Feat,
        emojis: &["✨", "🎉", "🚀", "⭐", "🌟", "🆕", "🔥"],
        description: "New feature",
    },
    CommitTypeInfo {
        commit_type: CommitType::Fix,
        emojis: &["🐛", "🔧", "🚑", "🩹", "🛠️", "💉", "🔨"],
        description: "Bug fix",
    },
    CommitTypeInfo {
        commit_type: CommitType::Docs,
        emojis: &["📚", "📝", "📖", "📄", "📑", "✏️", "📔"],
        description: "Documentation change",
    },
    CommitTypeInfo {
        commit_type: CommitType::Style,
        emojis: &["💄", "🎨", "✨", "👗", "💅", "🖌️", "🎭"],
        description: "Code style change",
    },
    CommitTypeInfo {
        commit_type: CommitType::Refactor,
        emojis: &["♻️", "🔄", "📦", "🔀", "🔁", "🔃", "🔮"],
        description: "Refactoring",
    },
    CommitTypeInfo {
        commit_type: CommitType::Perf,
        emojis: &["⚡", "🚀", "💨", "🔥", "⚡️", "🎯", "💪"],
        description: "Performance improvement",
    },
    CommitTypeInfo {
        commit_type: CommitType::Test,
        emojis: &["✅", "🧪", "🔍", "🧬", "🔎", "📊", "🧮"],
        description: "Adding or fixing tests",
    },
    CommitTypeInfo {
        commit_type: CommitType::Chore,
        emojis: &["🔧", "🛠️", "⚙️", "🔩", "🔨", "⛏️", "🔪"],
        description: "Build process or tooling change",
    },
];

impl CommitType {
    pub const ALL: [CommitType; 8] = [
        CommitType::Feat,
        CommitType::Fix,
        CommitType::Docs,
        CommitType::Style,
        CommitType::Refactor,
        CommitType::Perf,
        CommitType::Test,
        CommitType::Chore,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommitType::Feat => "feat",
            CommitType::Fix => "fix",
            CommitType::Docs => "docs",
            CommitType::Style => "style",
            CommitType::Refactor => "refactor",
            CommitType::Perf => "perf",
            CommitType::Test => "test",
            CommitType::Chore => "chore",
        }
    }

    pub fn info(self) -> &'static CommitTypeInfo {
        COMMIT_TYPES
            .iter()
            .find(|i| i.commit_type == self)
            .unwrap_or(&COMMIT_TYPES[0])
    }

    pub fn allows_emoji(self, emoji: &str) -> bool {
        self.info().emojis.contains(&emoji)
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CommitType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CommitType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::invalid_params(format!("unknown commit type '{s}'")))
    }
}

/// Language hint attached to a commit request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ja,
    En,
}

impl std::str::FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ja" => Ok(Language::Ja),
            "en" => Ok(Language::En),
            other => Err(Error::invalid_params(format!(
                "unknown language '{other}' (expected ja or en)"
            ))),
        }
    }
}
