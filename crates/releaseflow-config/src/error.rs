use releaseflow_core::ConfigurationError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "設定ファイルが見つかりません: {0}\n\nヒント:\n  • --config または RELEASEFLOW_CONFIG のパスを確認してください"
    )]
    FileNotFound(PathBuf),

    #[error("YAMLパースエラー: {path}\n理由: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ConfigurationError),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
