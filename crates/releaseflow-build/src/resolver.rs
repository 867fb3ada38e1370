use crate::error::{BuildError, BuildResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// ビルド入力の検証と解決
pub struct BuildResolver;

impl BuildResolver {
    /// ビルドコンテキストの存在確認
    pub fn resolve_context(context: &Path) -> BuildResult<PathBuf> {
        if !context.exists() {
            return Err(BuildError::ContextNotFound(context.to_path_buf()));
        }

        if !context.is_dir() {
            return Err(BuildError::InvalidConfig(format!(
                "Build context is not a directory: {}",
                context.display()
            )));
        }

        Ok(context.to_path_buf())
    }

    /// Dockerfileの存在確認
    pub fn resolve_dockerfile(dockerfile: &Path) -> BuildResult<PathBuf> {
        if dockerfile.is_file() {
            Ok(dockerfile.to_path_buf())
        } else {
            Err(BuildError::DockerfileNotFound(dockerfile.to_path_buf()))
        }
    }

    /// ビルド引数の変数展開
    pub fn resolve_build_args(
        args: &HashMap<String, String>,
        variables: &HashMap<String, String>,
    ) -> HashMap<String, String> {
        args.iter()
            .map(|(key, value)| (key.clone(), Self::expand_variables(value, variables)))
            .collect()
    }

    /// 変数展開処理
    ///
    /// テンプレート文字列内の {VAR_NAME} を実際の値に置換
    fn expand_variables(template: &str, variables: &HashMap<String, String>) -> String {
        let mut result = template.to_string();

        for (key, value) in variables {
            let placeholder = format!("{{{}}}", key);
            result = result.replace(&placeholder, value);
        }

        result
    }
}
