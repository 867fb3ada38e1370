use super::{ImageRepository, PublishResult, RunTimestamp, TagSet};
use crate::error::BuildFailure;
use serde::{Deserialize, Serialize};

/// 実行全体の最終状態
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failure { failed_tags: Vec<String> },
}

/// 1回の実行結果（CI向けにJSON出力できる）
///
/// ビルド失敗時も同じ形で出力する（`image_id` なし、`results` は空）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub timestamp: RunTimestamp,
    pub repository: ImageRepository,
    pub tags: TagSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    pub results: Vec<PublishResult>,
    /// ビルドエンジンの失敗（メッセージと診断出力）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_failure: Option<BuildFailure>,
    #[serde(flatten)]
    pub status: RunStatus,
}

impl RunReport {
    /// プッシュ結果を集約してレポートを作る
    ///
    /// 全タグ成功の場合のみ `Success`。
    pub fn aggregate(
        timestamp: RunTimestamp,
        repository: ImageRepository,
        tags: TagSet,
        image_id: String,
        results: Vec<PublishResult>,
    ) -> Self {
        let failed_tags: Vec<String> = results
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| r.tag.clone())
            .collect();

        let status = if failed_tags.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::Failure { failed_tags }
        };

        Self {
            timestamp,
            repository,
            tags,
            image_id: Some(image_id),
            results,
            build_failure: None,
            status,
        }
    }

    /// ビルド失敗時のレポート
    ///
    /// プッシュは行われないため、全タグが未公開として `failed_tags` に入る。
    pub fn build_failed(
        timestamp: RunTimestamp,
        repository: ImageRepository,
        tags: TagSet,
        failure: BuildFailure,
    ) -> Self {
        let failed_tags = tags.as_slice().to_vec();
        Self {
            timestamp,
            repository,
            tags,
            image_id: None,
            results: Vec::new(),
            build_failure: Some(failure),
            status: RunStatus::Failure { failed_tags },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn failed_tags(&self) -> &[String] {
        match &self.status {
            RunStatus::Success => &[],
            RunStatus::Failure { failed_tags } => failed_tags,
        }
    }
}
