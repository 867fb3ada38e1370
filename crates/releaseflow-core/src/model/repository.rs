use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// イベントから取り出したリポジトリ識別子
///
/// レジストリのパスは小文字のみ許可されるため、生成時に小文字化する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryIdentity {
    owner: String,
    name: String,
}

impl RepositoryIdentity {
    pub fn new(owner: &str, name: &str) -> Result<Self, ConfigurationError> {
        let owner = owner.trim();
        let name = name.trim();

        if owner.is_empty() {
            return Err(ConfigurationError::MissingField("repository owner"));
        }
        if name.is_empty() {
            return Err(ConfigurationError::MissingField("repository name"));
        }

        Ok(Self {
            owner: owner.to_ascii_lowercase(),
            name: name.to_ascii_lowercase(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// レジストリ上のイメージリポジトリ（タグなし）
///
/// # Examples
/// - `ghcr.io/myorg/shiptracker`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRepository {
    pub registry: String,
    pub owner: String,
    pub name: String,
}

impl ImageRepository {
    pub fn new(registry: &str, identity: &RepositoryIdentity) -> Self {
        Self {
            registry: registry.trim_end_matches('/').to_ascii_lowercase(),
            owner: identity.owner().to_string(),
            name: identity.name().to_string(),
        }
    }

    /// `registry/owner/name:tag` 形式の参照
    pub fn reference(&self, tag: &str) -> String {
        format!("{}:{}", self, tag)
    }
}

impl fmt::Display for ImageRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.registry, self.owner, self.name)
    }
}
