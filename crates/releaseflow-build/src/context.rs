use crate::error::{BuildError, BuildResult};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tar::Builder;

/// アーカイブ内でのDockerfileのエントリ名
///
/// コンテキスト内の既存の `Dockerfile` と衝突しない名前にする。
pub const DOCKERFILE_ENTRY: &str = "Dockerfile.releaseflow";

pub struct ContextBuilder;

impl ContextBuilder {
    /// ビルドコンテキストをtar.gzアーカイブとして作成
    ///
    /// Dockerfile は [`DOCKERFILE_ENTRY`] として追加される。
    pub fn create_context(context_path: &Path, dockerfile_path: &Path) -> BuildResult<Vec<u8>> {
        tracing::debug!("Creating build context from: {}", context_path.display());

        let mut archive_data = Vec::new();
        {
            let encoder = GzEncoder::new(&mut archive_data, Compression::default());
            let mut tar = Builder::new(encoder);

            tar.append_dir_all(".", context_path)?;

            let mut dockerfile_content = Vec::new();
            File::open(dockerfile_path)?.read_to_end(&mut dockerfile_content)?;

            let mut header = tar::Header::new_gnu();
            header.set_path(DOCKERFILE_ENTRY).map_err(|e| {
                BuildError::InvalidConfig(format!("Failed to set Dockerfile path: {}", e))
            })?;
            header.set_size(dockerfile_content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();

            tar.append(&header, &dockerfile_content[..])?;

            tar.into_inner()?.finish()?;
        }

        tracing::debug!("Build context created: {} bytes", archive_data.len());

        Self::check_context_size(archive_data.len());

        Ok(archive_data)
    }

    /// コンテキストサイズのチェックと警告
    fn check_context_size(size: usize) {
        const MAX_CONTEXT_SIZE: usize = 500 * 1024 * 1024; // 500MB

        if size > MAX_CONTEXT_SIZE {
            tracing::warn!(
                "警告: ビルドコンテキストが大きすぎます（{}MB）\n\
                 .dockerignoreファイルで不要なファイルを除外することを推奨します。",
                size / 1024 / 1024
            );
        }
    }
}
