//! イメージプッシュ処理
//!
//! ビルドしたイメージをタグごとにコンテナレジストリへプッシュします。

use crate::auth::{RegistrySession, registry_of};
use crate::error::{BuildError, BuildResult};
use bollard::Docker;
use bollard::models::PushImageInfo;
use futures_util::StreamExt;
use releaseflow_core::{ImageHandle, ImagePublish, PushFailure};

/// イメージプッシュを実行するハンドラ
pub struct ImagePusher {
    docker: Docker,
    session: RegistrySession,
}

impl ImagePusher {
    /// 確立済みの認証セッションを使って作成
    pub fn new(docker: Docker, session: RegistrySession) -> Self {
        Self { docker, session }
    }

    /// イメージをレジストリにプッシュ
    ///
    /// # Arguments
    /// * `image` - イメージ名（レジストリ込み、タグなし）
    /// * `tag` - イメージタグ
    ///
    /// # Returns
    /// プッシュ成功時は完全なイメージ名を返す
    pub async fn push(&self, image: &str, tag: &str) -> BuildResult<String> {
        let full_image = format!("{}:{}", image, tag);

        validate_tag(tag)?;

        let credentials = self.session.credentials_for(&registry_of(image))?;

        #[allow(deprecated)]
        let options = bollard::image::PushImageOptions::<String> {
            tag: tag.to_string(),
        };

        tracing::info!("Pushing {}", full_image);

        #[allow(deprecated)]
        let mut stream = self.docker.push_image(image, Some(options), credentials);

        let mut last_status = String::new();
        let mut error_message: Option<String> = None;

        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(err) = info.error {
                        error_message = Some(err);
                    } else {
                        log_progress(&full_image, &info, &mut last_status);
                    }
                }
                Err(e) => {
                    return Err(BuildError::PushFailed {
                        message: e.to_string(),
                    });
                }
            }
        }

        if let Some(err) = error_message {
            return Err(BuildError::PushFailed { message: err });
        }

        Ok(full_image)
    }
}

impl ImagePublish for ImagePusher {
    async fn publish(&self, handle: &ImageHandle, tag: &str) -> Result<String, PushFailure> {
        self.push(&handle.repository.to_string(), tag)
            .await
            .map_err(|e| e.into_push_failure(tag))
    }
}

/// タグのバリデーション
///
/// Docker タグの制約:
/// - 128文字以下
/// - 英数字、ピリオド、ハイフン、アンダースコアのみ
/// - 先頭はピリオドまたはハイフンではない
pub fn validate_tag(tag: &str) -> BuildResult<()> {
    if tag.is_empty() {
        return Err(BuildError::InvalidTag {
            tag: "(empty)".to_string(),
        });
    }

    if tag.len() > 128 {
        return Err(BuildError::InvalidTag {
            tag: format!("Tag too long ({} characters, max 128)", tag.len()),
        });
    }

    if tag.starts_with('.') || tag.starts_with('-') {
        return Err(BuildError::InvalidTag {
            tag: tag.to_string(),
        });
    }

    if let Some(c) = tag
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '.' && *c != '-' && *c != '_')
    {
        return Err(BuildError::InvalidTag {
            tag: format!("Invalid character '{}' in tag: {}", c, tag),
        });
    }

    Ok(())
}

/// プッシュ進捗をログに出す
///
/// 複数タグを並行プッシュするため、端末への上書き表示はしない。
fn log_progress(image: &str, info: &PushImageInfo, last_status: &mut String) {
    let Some(status) = &info.status else {
        return;
    };

    match status.as_str() {
        // ノイズ軽減
        "Preparing" | "Waiting" | "Pushing" => {}
        _ => {
            if status != last_status {
                tracing::debug!("{}: {}", image, status);
                *last_status = status.clone();
            }
        }
    }
}
