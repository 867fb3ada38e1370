// Bollard 0.19 の非推奨APIを一時的に使用
#![allow(deprecated)]

use crate::context::{ContextBuilder, DOCKERFILE_ENTRY};
use crate::error::{BuildError, BuildResult};
use crate::progress::BuildProgress;
use crate::pusher::validate_tag;
use crate::resolver::BuildResolver;
use bollard::Docker;
use bollard::image::{BuildImageOptions, RemoveImageOptions, TagImageOptions};
use futures_util::stream::StreamExt;
use releaseflow_core::{BuildFailure, BuildRequest, ImageBuild, ImageHandle};
use std::collections::HashMap;

/// Docker Engine を使ったイメージビルダー
///
/// 1回のビルドで全タグを同じイメージに付与する（タグごとに再ビルドしない）。
pub struct ImageBuilder {
    docker: Docker,
    remove_local: bool,
}

impl ImageBuilder {
    pub fn new(docker: Docker) -> Self {
        Self {
            docker,
            remove_local: false,
        }
    }

    /// 実行終了時にローカルのイメージを削除する
    pub fn with_remove_local(mut self, remove_local: bool) -> Self {
        self.remove_local = remove_local;
        self
    }

    /// リリース用イメージをビルドし、全タグを付与
    pub async fn build_release(&self, request: &BuildRequest) -> BuildResult<ImageHandle> {
        let context_dir = BuildResolver::resolve_context(&request.context_dir)?;
        let dockerfile = BuildResolver::resolve_dockerfile(&request.dockerfile)?;

        let references = request.references();
        let primary = references
            .first()
            .ok_or_else(|| BuildError::InvalidConfig("No tags to build".to_string()))?;

        // エンジンに触れる前に全タグを検証（途中までタグ付けされたイメージを残さない）
        for tag in &request.tags {
            validate_tag(tag)?;
        }

        let variables: HashMap<String, String> = std::env::vars().collect();
        let build_args = BuildResolver::resolve_build_args(&request.build_args, &variables);

        let context_data = ContextBuilder::create_context(&context_dir, &dockerfile)?;

        self.build_image(
            context_data,
            primary,
            &build_args,
            request.target.as_deref(),
            request.no_cache,
            request.pull,
        )
        .await?;

        let id = match self.image_id(primary).await {
            Ok(id) => id,
            Err(e) => {
                self.remove_references(std::slice::from_ref(primary)).await;
                return Err(e);
            }
        };

        self.apply_aliases(&id, request).await?;

        tracing::info!("Built {} as {}", id, references.join(", "));
        Ok(ImageHandle::new(id, request.repository.clone(), &request.tags))
    }

    /// イメージをビルド
    async fn build_image(
        &self,
        context_data: Vec<u8>,
        tag: &str,
        build_args: &HashMap<String, String>,
        target: Option<&str>,
        no_cache: bool,
        pull: bool,
    ) -> BuildResult<()> {
        tracing::info!("Building image: {}", tag);

        let build_args_refs: HashMap<&str, &str> = build_args
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let options = BuildImageOptions {
            dockerfile: DOCKERFILE_ENTRY,
            t: tag,
            buildargs: build_args_refs,
            target: target.unwrap_or(""),
            nocache: no_cache,
            rm: true,      // 中間コンテナを削除
            forcerm: true, // ビルド失敗時も中間コンテナを削除
            pull,
            ..Default::default()
        };

        tracing::debug!("Build options: {:?}", options);

        use bytes::Bytes;
        use http_body_util::{Either, Full};
        let body = Full::new(Bytes::from(context_data));
        let mut stream = self
            .docker
            .build_image(options, None, Some(Either::Left(body)));

        let progress = BuildProgress::new(tag);
        // エンジンの出力（失敗時にそのまま返す）
        let mut output = String::new();

        while let Some(msg) = stream.next().await {
            let result = match msg {
                Ok(info) => Self::handle_build_output(info, &progress, &mut output),
                Err(bollard::errors::Error::DockerStreamError { error }) => {
                    Err(BuildError::BuildFailed {
                        message: error,
                        output: output.clone(),
                    })
                }
                Err(e) => Err(BuildError::DockerConnection(e)),
            };

            if let Err(e) = result {
                progress.finish_error(&e.to_string());
                return Err(e);
            }
        }

        progress.finish_success();
        tracing::info!("Successfully built: {}", tag);
        Ok(())
    }

    /// ビルド出力の処理
    fn handle_build_output(
        output: bollard::models::BuildInfo,
        progress: &BuildProgress,
        log: &mut String,
    ) -> BuildResult<()> {
        if let Some(stream) = output.stream {
            progress.step(&stream);
            log.push_str(&stream);
        }

        if let Some(error_detail) = output.error_detail {
            let message = error_detail
                .message
                .or(output.error)
                .unwrap_or_else(|| "Unknown build error".to_string());
            return Err(BuildError::BuildFailed {
                message,
                output: log.clone(),
            });
        }

        if let Some(error) = output.error {
            return Err(BuildError::BuildFailed {
                message: error,
                output: log.clone(),
            });
        }

        if let Some(status) = output.status {
            // ステータスメッセージ（pull等）
            progress.step(&status);
            log.push_str(&status);
            log.push('\n');
        }

        Ok(())
    }

    async fn image_id(&self, reference: &str) -> BuildResult<String> {
        let inspect = self.docker.inspect_image(reference).await?;
        inspect.id.ok_or_else(|| BuildError::BuildFailed {
            message: format!("Built image has no id: {}", reference),
            output: String::new(),
        })
    }

    /// 残りのタグを同じイメージへの別名として付与
    ///
    /// 途中で失敗した場合は、付与済みの参照（先頭タグを含む）を削除してから返す。
    async fn apply_aliases(&self, image_id: &str, request: &BuildRequest) -> BuildResult<()> {
        let repository = request.repository.to_string();
        let mut applied: Vec<String> = request.references().into_iter().take(1).collect();

        for tag in request.tags.iter().skip(1) {
            if let Err(e) = self.tag_image(image_id, &repository, tag).await {
                tracing::warn!("Tagging failed, removing applied references: {}", e);
                self.remove_references(&applied).await;
                return Err(e);
            }
            applied.push(request.repository.reference(tag));
        }

        Ok(())
    }

    async fn tag_image(&self, image_id: &str, repository: &str, tag: &str) -> BuildResult<()> {
        tracing::debug!("Tagging {} as {}:{}", image_id, repository, tag);
        let options = TagImageOptions {
            repo: repository,
            tag,
        };
        self.docker.tag_image(image_id, Some(options)).await?;
        Ok(())
    }

    /// ローカルのイメージ参照を削除（失敗は警告のみ）
    async fn remove_references(&self, references: &[String]) {
        for reference in references {
            match self
                .docker
                .remove_image(reference, None::<RemoveImageOptions>, None)
                .await
            {
                Ok(_) => tracing::debug!("Removed local image {}", reference),
                Err(e) => tracing::warn!("Failed to remove local image {}: {}", reference, e),
            }
        }
    }
}

impl ImageBuild for ImageBuilder {
    async fn build(&self, request: &BuildRequest) -> Result<ImageHandle, BuildFailure> {
        self.build_release(request).await.map_err(BuildFailure::from)
    }

    async fn discard(&self, handle: ImageHandle) {
        if !self.remove_local {
            return;
        }

        self.remove_references(&handle.references).await;
    }
}
