use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub const DEFAULT_REGISTRY: &str = "ghcr.io";
pub const DEFAULT_TRACKED_BRANCH: &str = "master";

/// パイプライン設定（releaseflow.yml）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// レジストリホスト（例: ghcr.io）
    pub registry: String,
    /// 実行対象ブランチの許可リスト
    pub tracked_branches: Vec<String>,
    pub branch_tags: BranchTagPolicy,
    pub build: BuildSettings,
    pub publish: PublishSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            registry: DEFAULT_REGISTRY.to_string(),
            tracked_branches: vec![DEFAULT_TRACKED_BRANCH.to_string()],
            branch_tags: BranchTagPolicy::default(),
            build: BuildSettings::default(),
            publish: PublishSettings::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.registry.trim().is_empty() {
            return Err(ConfigurationError::Invalid(
                "registry が空です".to_string(),
            ));
        }

        if self.tracked_branches.is_empty() {
            return Err(ConfigurationError::Invalid(
                "tracked_branches に少なくとも1つのブランチを指定してください".to_string(),
            ));
        }

        if self.tracked_branches.iter().any(|b| b.trim().is_empty()) {
            return Err(ConfigurationError::Invalid(
                "tracked_branches に空のブランチ名が含まれています".to_string(),
            ));
        }

        Ok(())
    }

    pub fn is_tracked(&self, branch: &str) -> bool {
        self.tracked_branches.iter().any(|b| b == branch)
    }
}

/// パス区切り文字を含むブランチ名の扱い
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BranchTagPolicy {
    /// そのまま使う
    #[default]
    PassThrough,
    /// `/` を `-` に置換
    Replace,
    /// 設定エラーとして拒否
    Reject,
}

impl BranchTagPolicy {
    /// ブランチ名をタグ用に変換
    pub fn apply(&self, branch: &str) -> Result<String, ConfigurationError> {
        match self {
            BranchTagPolicy::PassThrough => Ok(branch.to_string()),
            BranchTagPolicy::Replace => Ok(branch.replace('/', "-")),
            BranchTagPolicy::Reject if branch.contains('/') => {
                Err(ConfigurationError::SeparatorInBranch(branch.to_string()))
            }
            BranchTagPolicy::Reject => Ok(branch.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// ビルドコンテキスト（設定ファイルのディレクトリからの相対パス）
    pub context: PathBuf,
    /// Dockerfile（コンテキストからの相対パス）
    pub dockerfile: PathBuf,
    pub target: Option<String>,
    pub no_cache: bool,
    /// ベースイメージを常にpull
    pub pull: bool,
    /// ビルド引数。値の `{VAR}` は環境変数で展開される
    pub args: HashMap<String, String>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            context: PathBuf::from("."),
            dockerfile: PathBuf::from("Dockerfile"),
            target: None,
            no_cache: false,
            pull: true,
            args: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishSettings {
    /// タグごとのプッシュを並行実行する
    pub concurrent: bool,
    /// 実行終了後にローカルのイメージを削除する
    pub remove_local: bool,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            concurrent: true,
            remove_local: false,
        }
    }
}
