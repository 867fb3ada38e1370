use serde::{Deserialize, Serialize};
use thiserror::Error;

/// パイプライン開始前に検出される設定エラー
///
/// Tagging に入る前に発生し、ビルドには到達しない。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("必須項目が指定されていません: {0}")]
    MissingField(&'static str),

    #[error("ブランチ名が空です")]
    EmptyBranch,

    #[error("未対応のイベント種別です: {0}")]
    UnsupportedEvent(String),

    #[error(
        "ブランチ名 '{0}' にパス区切り文字が含まれています\n\nヒント:\n  • branch_tags を replace に設定すると '/' を '-' に置換します"
    )]
    SeparatorInBranch(String),

    #[error("無効な設定: {0}")]
    Invalid(String),
}

/// ビルドエンジンの失敗
///
/// エンジンの診断出力をそのまま保持する。
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct BuildFailure {
    pub message: String,
    pub diagnostic: String,
}

impl BuildFailure {
    pub fn new(message: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            diagnostic: diagnostic.into(),
        }
    }
}

/// 1タグ分のプッシュ失敗
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{tag}: {message}")]
pub struct PushFailure {
    pub tag: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("設定エラー: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("ブランチ '{branch}' は追跡対象ではありません")]
    UntrackedBranch { branch: String },

    #[error("ビルドに失敗しました: {0}")]
    Build(#[from] BuildFailure),
}

impl PipelineError {
    /// 実行をスキップしただけで失敗ではないケース
    pub fn is_skip(&self) -> bool {
        matches!(self, PipelineError::UntrackedBranch { .. })
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
