use releaseflow_core::{BuildFailure, PushFailure};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Dockerfile not found: {0}")]
    DockerfileNotFound(PathBuf),

    #[error("Build context directory not found: {0}")]
    ContextNotFound(PathBuf),

    #[error("Docker connection error: {0}")]
    DockerConnection(#[from] bollard::errors::Error),

    #[error("Build failed: {message}")]
    BuildFailed { message: String, output: String },

    #[error("Invalid build configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid tag: {tag}")]
    InvalidTag { tag: String },

    #[error("Push failed: {message}")]
    PushFailed { message: String },

    #[error("Registry auth failed for {registry}: {message}")]
    AuthFailed { registry: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            BuildError::DockerfileNotFound(path) => {
                format!(
                    "Dockerfileが見つかりません: {}\n\
                     \n\
                     解決方法:\n\
                     1. Dockerfileのパスを確認してください\n\
                     2. releaseflow.yml の build.dockerfile で明示的に指定してください",
                    path.display()
                )
            }
            BuildError::BuildFailed { message, .. } => {
                format!(
                    "ビルドに失敗しました: {}\n\
                     \n\
                     Dockerfileの内容を確認してください。",
                    message
                )
            }
            BuildError::ContextNotFound(path) => {
                format!(
                    "ビルドコンテキストが見つかりません: {}\n\
                     \n\
                     releaseflow.yml の build.context を確認してください。",
                    path.display()
                )
            }
            _ => format!("{}", self),
        }
    }
}

impl From<BuildError> for BuildFailure {
    fn from(err: BuildError) -> Self {
        let message = err.user_message();
        match err {
            // エンジンの出力はそのまま渡す
            BuildError::BuildFailed { output, .. } => BuildFailure::new(message, output),
            other => BuildFailure::new(message, other.to_string()),
        }
    }
}

impl BuildError {
    /// タグ1つ分のプッシュ失敗に変換
    pub fn into_push_failure(self, tag: &str) -> PushFailure {
        let message = match self {
            BuildError::PushFailed { message } => message,
            other => other.to_string(),
        };
        PushFailure {
            tag: tag.to_string(),
            message,
        }
    }
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
