pub mod error;

pub use error::*;

use releaseflow_core::PipelineConfig;
use std::path::{Path, PathBuf};

/// 設定ファイルパスを直接指定する環境変数
pub const CONFIG_ENV: &str = "RELEASEFLOW_CONFIG";

const CANDIDATES: [&str; 3] = ["releaseflow.local.yml", "releaseflow.yml", ".releaseflow.yml"];

/// 読み込んだ設定とその出どころ
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: PipelineConfig,
    /// 設定ファイル（見つからずデフォルトを使った場合は None）
    pub source: Option<PathBuf>,
    /// ビルドコンテキストの基準ディレクトリ
    pub project_root: PathBuf,
}

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 明示指定（--config）または環境変数 RELEASEFLOW_CONFIG
/// 2. 起点ディレクトリ: releaseflow.local.yml, releaseflow.yml, .releaseflow.yml
/// 3. 起点ディレクトリの .github/ 内: 同様の順序
/// 4. ~/.config/releaseflow/releaseflow.yml (グローバル設定)
///
/// どれも見つからなければ `Ok(None)`（デフォルト設定で動く）。
pub fn find_config_file(start: &Path, explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    let global_dir = dirs::config_dir().map(|d| d.join("releaseflow"));
    find_config_file_in(start, explicit, global_dir.as_deref())
}

fn find_config_file_in(
    start: &Path,
    explicit: Option<&Path>,
    global_dir: Option<&Path>,
) -> Result<Option<PathBuf>> {
    // 1. 明示指定
    // 空文字列は未指定として扱う
    let explicit = explicit
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .or_else(|| {
            std::env::var(CONFIG_ENV)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        });
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(Some(path));
        }
        return Err(ConfigError::FileNotFound(path));
    }

    // 2. 起点ディレクトリ
    for filename in &CANDIDATES {
        let path = start.join(filename);
        if path.is_file() {
            return Ok(Some(path));
        }
    }

    // 3. .github/
    let github_dir = start.join(".github");
    if github_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = github_dir.join(filename);
            if path.is_file() {
                return Ok(Some(path));
            }
        }
    }

    // 4. グローバル設定
    if let Some(dir) = global_dir {
        let path = dir.join("releaseflow.yml");
        if path.is_file() {
            return Ok(Some(path));
        }
    }

    Ok(None)
}

/// YAML文字列をパースして検証
pub fn parse_config(content: &str, path: &Path) -> Result<PipelineConfig> {
    if content.trim().is_empty() {
        return Ok(PipelineConfig::default());
    }

    let config: PipelineConfig =
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    config.validate()?;

    for key in config.build.args.keys() {
        warn_if_sensitive(key);
    }

    Ok(config)
}

/// 設定ファイルを読み込む
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content, path)
}

/// 設定を探して読み込む
///
/// `.github/` 配下の設定ファイルはリポジトリルートを基準にする。
pub fn load(start: &Path, explicit: Option<&Path>) -> Result<LoadedConfig> {
    match find_config_file(start, explicit)? {
        Some(path) => {
            tracing::debug!("Loading config from {}", path.display());
            let config = load_config(&path)?;
            let project_root = project_root_for(&path, start);
            Ok(LoadedConfig {
                config,
                source: Some(path),
                project_root,
            })
        }
        None => {
            tracing::debug!("No config file found, using defaults");
            Ok(LoadedConfig {
                config: PipelineConfig::default(),
                source: None,
                project_root: start.to_path_buf(),
            })
        }
    }
}

fn project_root_for(config_path: &Path, start: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if parent.file_name().is_some_and(|n| n == ".github") => parent
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| start.to_path_buf()),
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => start.to_path_buf(),
    }
}

/// ビルド引数の検証（機密情報の警告）
fn warn_if_sensitive(key: &str) {
    let sensitive_patterns = ["password", "token", "secret", "api_key", "private_key"];

    let key_lower = key.to_lowercase();
    if sensitive_patterns.iter().any(|p| key_lower.contains(p)) {
        tracing::warn!(
            "警告: ビルド引数 '{}' は機密情報を含む可能性があります。\n\
             ビルド引数はイメージ履歴に記録されます。",
            key
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use releaseflow_core::BranchTagPolicy;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
registry: registry.example.com
tracked_branches: [main, develop]
branch_tags: replace
build:
  context: app
  dockerfile: docker/Dockerfile
  target: runtime
  no_cache: true
  args:
    PYTHON_VERSION: "3.12"
publish:
  concurrent: false
  remove_local: true
"#;
        let config = parse_config(yaml, Path::new("releaseflow.yml")).unwrap();

        assert_eq!(config.registry, "registry.example.com");
        assert_eq!(config.tracked_branches, vec!["main", "develop"]);
        assert_eq!(config.branch_tags, BranchTagPolicy::Replace);
        assert_eq!(config.build.context, PathBuf::from("app"));
        assert_eq!(config.build.target.as_deref(), Some("runtime"));
        assert!(config.build.no_cache);
        assert!(config.build.pull);
        assert_eq!(config.build.args["PYTHON_VERSION"], "3.12");
        assert!(!config.publish.concurrent);
        assert!(config.publish.remove_local);
    }

    #[test]
    fn test_parse_partial_config_uses_defaults() {
        let config = parse_config("registry: quay.io\n", Path::new("x.yml")).unwrap();
        assert_eq!(config.registry, "quay.io");
        assert_eq!(config.tracked_branches, vec!["master"]);
        assert_eq!(config.build.dockerfile, PathBuf::from("Dockerfile"));
        assert!(config.publish.concurrent);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("  \n", Path::new("x.yml")).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_parse_invalid_policy() {
        let result = parse_config("branch_tags: squash\n", Path::new("x.yml"));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_parse_rejects_empty_tracked_branches() {
        let result = parse_config("tracked_branches: []\n", Path::new("x.yml"));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    #[serial]
    fn test_find_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("releaseflow.yml"), "").unwrap();
        fs::write(temp_dir.path().join("releaseflow.local.yml"), "").unwrap();

        temp_env::with_var_unset(CONFIG_ENV, || {
            let found = find_config_file_in(temp_dir.path(), None, None).unwrap();
            assert!(found.unwrap().ends_with("releaseflow.local.yml"));
        });
    }

    #[test]
    #[serial]
    fn test_find_in_github_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let github = temp_dir.path().join(".github");
        fs::create_dir(&github).unwrap();
        fs::write(github.join("releaseflow.yml"), "").unwrap();

        temp_env::with_var_unset(CONFIG_ENV, || {
            let found = find_config_file_in(temp_dir.path(), None, None)
                .unwrap()
                .unwrap();
            assert!(found.ends_with(".github/releaseflow.yml"));
            assert_eq!(project_root_for(&found, temp_dir.path()), temp_dir.path());
        });
    }

    #[test]
    #[serial]
    fn test_find_global_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let global = tempfile::tempdir().unwrap();
        fs::write(global.path().join("releaseflow.yml"), "").unwrap();

        temp_env::with_var_unset(CONFIG_ENV, || {
            let found = find_config_file_in(temp_dir.path(), None, Some(global.path())).unwrap();
            assert_eq!(found, Some(global.path().join("releaseflow.yml")));
        });
    }

    #[test]
    #[serial]
    fn test_find_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        temp_env::with_var_unset(CONFIG_ENV, || {
            let found = find_config_file_in(temp_dir.path(), None, None).unwrap();
            assert!(found.is_none());
        });
    }

    #[test]
    #[serial]
    fn test_env_var_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let custom = temp_dir.path().join("custom.yml");
        fs::write(&custom, "registry: quay.io\n").unwrap();

        temp_env::with_var(CONFIG_ENV, Some(custom.as_os_str()), || {
            let loaded = load(Path::new("/nonexistent"), None).unwrap();
            assert_eq!(loaded.source, Some(custom.clone()));
            assert_eq!(loaded.config.registry, "quay.io");
            assert_eq!(loaded.project_root, temp_dir.path());
        });
    }

    #[test]
    #[serial]
    fn test_blank_env_var_is_ignored() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("releaseflow.yml"), "registry: quay.io\n").unwrap();

        for blank in ["", "  "] {
            temp_env::with_var(CONFIG_ENV, Some(blank), || {
                let found = find_config_file_in(temp_dir.path(), None, None).unwrap();
                assert_eq!(found, Some(temp_dir.path().join("releaseflow.yml")));
            });
        }

        temp_env::with_var(CONFIG_ENV, Some(""), || {
            let empty = tempfile::tempdir().unwrap();
            let found = find_config_file_in(empty.path(), None, None).unwrap();
            assert!(found.is_none());
        });
    }

    #[test]
    #[serial]
    fn test_explicit_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing.yml");

        let result = find_config_file_in(temp_dir.path(), Some(&missing), None);
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
