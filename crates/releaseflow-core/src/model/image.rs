use super::{ImageRepository, TagSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// ビルド済みイメージへの参照
///
/// 作成した実行だけが所有し、実行の終了時に破棄される。
/// `Clone` は実装しない。
#[derive(Debug, PartialEq, Eq)]
pub struct ImageHandle {
    /// エンジン上のイメージID（例: `sha256:...`）
    pub id: String,
    pub repository: ImageRepository,
    /// このイメージに付与済みの全参照
    pub references: Vec<String>,
}

impl ImageHandle {
    pub fn new(id: impl Into<String>, repository: ImageRepository, tags: &TagSet) -> Self {
        let references = tags.iter().map(|t| repository.reference(t)).collect();
        Self {
            id: id.into(),
            repository,
            references,
        }
    }

    pub fn reference(&self, tag: &str) -> String {
        self.repository.reference(tag)
    }
}

/// 1回のビルド呼び出しに渡す入力
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub context_dir: PathBuf,
    pub dockerfile: PathBuf,
    pub repository: ImageRepository,
    pub tags: TagSet,
    pub build_args: HashMap<String, String>,
    pub target: Option<String>,
    pub no_cache: bool,
    pub pull: bool,
}

impl BuildRequest {
    /// 付与する全参照（`registry/owner/name:tag`）
    pub fn references(&self) -> Vec<String> {
        self.tags
            .iter()
            .map(|t| self.repository.reference(t))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Success,
    Failed,
}

/// タグ1つ分のプッシュ結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub tag: String,
    pub status: PublishStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl PublishResult {
    pub fn success(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            status: PublishStatus::Success,
            error_detail: None,
        }
    }

    pub fn failed(tag: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            status: PublishStatus::Failed,
            error_detail: Some(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PublishStatus::Success
    }
}
