//! トリガーイベント
//!
//! push / pull_request イベントからブランチとリポジトリ識別子を取り出す。
//! CI（GitHub Actions）の環境変数から組み立てることもできる。

use crate::error::ConfigurationError;
use crate::model::RepositoryIdentity;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const REF_PREFIX: &str = "refs/heads/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Push,
    PullRequest,
}

impl FromStr for EventType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "push" => Ok(EventType::Push),
            "pull_request" | "pull_request_target" => Ok(EventType::PullRequest),
            other => Err(ConfigurationError::UnsupportedEvent(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub event_type: EventType,
    pub branch_ref: String,
    pub repository_owner: String,
    pub repository_name: String,
}

impl TriggerEvent {
    /// ブランチ名（`refs/heads/` を除いたもの）
    pub fn branch(&self) -> Result<&str, ConfigurationError> {
        let branch = self.branch_ref.trim();
        let branch = branch.strip_prefix(REF_PREFIX).unwrap_or(branch);
        if branch.is_empty() {
            return Err(ConfigurationError::EmptyBranch);
        }
        Ok(branch)
    }

    pub fn identity(&self) -> Result<RepositoryIdentity, ConfigurationError> {
        RepositoryIdentity::new(&self.repository_owner, &self.repository_name)
    }

    /// 環境変数からイベントを組み立てる
    pub fn from_env(overrides: &EventOverrides) -> Result<Self, ConfigurationError> {
        Self::from_lookup(overrides, |key| std::env::var(key).ok())
    }

    /// 任意の変数ソースからイベントを組み立てる
    ///
    /// 優先順位: 明示指定 > GitHub Actions の環境変数
    pub fn from_lookup<F>(overrides: &EventOverrides, lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let event_name = overrides
            .event
            .clone()
            .or_else(|| non_empty("GITHUB_EVENT_NAME"))
            .ok_or(ConfigurationError::MissingField("event type"))?;
        let event_type: EventType = event_name.parse()?;

        // PRはマージ先ブランチを対象にする
        let env_branch = match event_type {
            EventType::PullRequest => non_empty("GITHUB_BASE_REF"),
            EventType::Push => non_empty("GITHUB_REF_NAME").or_else(|| non_empty("GITHUB_REF")),
        };
        let branch_ref = overrides
            .branch
            .clone()
            .or(env_branch)
            .ok_or(ConfigurationError::MissingField("branch"))?;

        let full_repository = non_empty("GITHUB_REPOSITORY");
        let (repo_owner, repo_name) = match full_repository.as_deref().and_then(|r| r.split_once('/')) {
            Some((owner, name)) => (Some(owner.to_string()), Some(name.to_string())),
            None => (None, None),
        };

        let repository_owner = overrides
            .owner
            .clone()
            .or_else(|| non_empty("GITHUB_REPOSITORY_OWNER"))
            .or(repo_owner)
            .ok_or(ConfigurationError::MissingField("repository owner"))?;
        let repository_name = overrides
            .repository
            .clone()
            .or(repo_name)
            .ok_or(ConfigurationError::MissingField("repository name"))?;

        Ok(Self {
            event_type,
            branch_ref,
            repository_owner,
            repository_name,
        })
    }
}

/// CLIから明示指定された値
#[derive(Debug, Clone, Default)]
pub struct EventOverrides {
    pub event: Option<String>,
    pub branch: Option<String>,
    pub owner: Option<String>,
    pub repository: Option<String>,
}
