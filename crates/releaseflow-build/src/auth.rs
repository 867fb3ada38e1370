//! レジストリ認証セッション
//!
//! `docker login` 等で事前に確立された認証情報（Docker config.json）を読み取り、
//! Bollard の DockerCredentials に変換します。認証情報の保存や更新は行いません。

use crate::error::{BuildError, BuildResult};
use base64::Engine;
use bollard::auth::DockerCredentials;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Docker config.json の構造
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DockerConfig {
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,
    /// 全レジストリ共通の credential helper（例: "osxkeychain", "desktop"）
    #[serde(default)]
    creds_store: Option<String>,
    /// レジストリ別の credential helper
    #[serde(default)]
    cred_helpers: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct AuthEntry {
    /// Base64エンコードされた "username:password"
    auth: Option<String>,
    #[serde(rename = "identitytoken")]
    identity_token: Option<String>,
}

/// credential helper からのレスポンス
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CredentialResponse {
    username: String,
    secret: String,
}

/// 確立済みのレジストリ認証セッション
#[derive(Debug, Default)]
pub struct RegistrySession {
    config: DockerConfig,
    source: Option<PathBuf>,
}

impl RegistrySession {
    /// 既定の場所から config.json を読み込む
    ///
    /// `DOCKER_CONFIG` が設定されていればそのディレクトリ、なければ `~/.docker` を使う。
    /// ファイルがなければ認証なしのセッションになる。
    pub fn discover() -> BuildResult<Self> {
        let config_path = std::env::var("DOCKER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|h| h.join(".docker"))
                    .unwrap_or_else(|| PathBuf::from(".docker"))
            })
            .join("config.json");

        Self::from_path(&config_path)
    }

    pub fn from_path(config_path: &Path) -> BuildResult<Self> {
        if !config_path.exists() {
            tracing::debug!("Docker config.json not found at {:?}", config_path);
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(config_path).map_err(|e| BuildError::AuthFailed {
                registry: config_path.display().to_string(),
                message: format!("Failed to read config.json: {}", e),
            })?;

        let config: DockerConfig =
            serde_json::from_str(&content).map_err(|e| BuildError::AuthFailed {
                registry: config_path.display().to_string(),
                message: format!("Failed to parse config.json: {}", e),
            })?;

        Ok(Self {
            config,
            source: Some(config_path.to_path_buf()),
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// レジストリの認証情報を取得
    ///
    /// 検索順序:
    /// 1. credHelpers のレジストリ別 helper
    /// 2. auths セクション
    /// 3. credsStore の共通 helper
    ///
    /// 見つからなければ `Ok(None)`（匿名でプッシュを試みる）。
    pub fn credentials_for(&self, registry: &str) -> BuildResult<Option<DockerCredentials>> {
        if let Some(helper) = self.config.cred_helpers.get(registry) {
            tracing::debug!("Trying credential helper for {}: {}", registry, helper);
            match get_from_helper(helper, registry) {
                Ok(Some(creds)) => return Ok(Some(creds)),
                Ok(None) => {}
                Err(e) => tracing::warn!("{}", e),
            }
        }

        let entry = self
            .config
            .auths
            .get(registry)
            .or_else(|| self.config.auths.get(&format!("https://{}", registry)));
        if let Some(entry) = entry {
            if let Some(auth_b64) = &entry.auth
                && let Some(creds) = decode_auth(auth_b64, registry)?
            {
                tracing::debug!("Found credentials in auths for {}", registry);
                return Ok(Some(creds));
            }
            if let Some(token) = &entry.identity_token {
                return Ok(Some(DockerCredentials {
                    identitytoken: Some(token.clone()),
                    serveraddress: Some(registry.to_string()),
                    ..Default::default()
                }));
            }
        }

        if let Some(helper) = &self.config.creds_store {
            tracing::debug!("Trying credential helper: {}", helper);
            if let Ok(Some(creds)) = get_from_helper(helper, registry) {
                return Ok(Some(creds));
            }
        }

        tracing::debug!("No credentials found for {}", registry);
        Ok(None)
    }
}

/// イメージ名からレジストリを抽出
///
/// # Examples
/// - `ghcr.io/org/app:tag` -> `ghcr.io`
/// - `myuser/app:tag` -> `docker.io`
/// - `localhost:5000/app` -> `localhost:5000`
pub fn registry_of(image: &str) -> String {
    if let Some((first, _)) = image.split_once('/') {
        // `.` か `:` を含む先頭要素はレジストリ（ghcr.io, localhost:5000）
        if first.contains('.') || first.contains(':') || first == "localhost" {
            return first.to_string();
        }
    }

    "docker.io".to_string()
}

/// Base64エンコードされた認証情報をデコード
fn decode_auth(auth_b64: &str, registry: &str) -> BuildResult<Option<DockerCredentials>> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(auth_b64)
        .map_err(|e| BuildError::AuthFailed {
            registry: registry.to_string(),
            message: format!("Failed to decode auth: {}", e),
        })?;

    let auth_str = String::from_utf8(decoded).map_err(|e| BuildError::AuthFailed {
        registry: registry.to_string(),
        message: format!("Invalid UTF-8 in auth: {}", e),
    })?;

    Ok(auth_str
        .split_once(':')
        .map(|(username, password)| DockerCredentials {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            serveraddress: Some(registry.to_string()),
            ..Default::default()
        }))
}

/// credential helper から認証情報を取得
fn get_from_helper(helper: &str, registry: &str) -> BuildResult<Option<DockerCredentials>> {
    let helper_cmd = format!("docker-credential-{}", helper);

    let mut child = Command::new(&helper_cmd)
        .arg("get")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| BuildError::AuthFailed {
            registry: registry.to_string(),
            message: format!("Failed to run {}: {}", helper_cmd, e),
        })?;

    // レジストリ名を stdin に渡す
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(registry.as_bytes()).ok();
    }

    let output = child
        .wait_with_output()
        .map_err(|e| BuildError::AuthFailed {
            registry: registry.to_string(),
            message: format!("Credential helper failed: {}", e),
        })?;

    if !output.status.success() {
        tracing::debug!(
            "Credential helper returned error for {}: {}",
            registry,
            String::from_utf8_lossy(&output.stderr)
        );
        return Ok(None);
    }

    let response: CredentialResponse =
        serde_json::from_slice(&output.stdout).map_err(|e| BuildError::AuthFailed {
            registry: registry.to_string(),
            message: format!("Failed to parse credential helper response: {}", e),
        })?;

    Ok(Some(DockerCredentials {
        username: Some(response.username),
        password: Some(response.secret),
        serveraddress: Some(registry.to_string()),
        ..Default::default()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_registry_of() {
        assert_eq!(registry_of("ghcr.io/org/app:v1.0"), "ghcr.io");
        assert_eq!(registry_of("localhost:5000/myapp"), "localhost:5000");
        assert_eq!(registry_of("myuser/app"), "docker.io");
        assert_eq!(registry_of("nginx:alpine"), "docker.io");
        assert_eq!(
            registry_of("123456789.dkr.ecr.ap-northeast-1.amazonaws.com/app"),
            "123456789.dkr.ecr.ap-northeast-1.amazonaws.com"
        );
    }

    #[test]
    fn test_credentials_from_auths() {
        // "octocat:ghp_token"
        let (_dir, path) =
            write_config(r#"{"auths":{"ghcr.io":{"auth":"b2N0b2NhdDpnaHBfdG9rZW4="}}}"#);

        let session = RegistrySession::from_path(&path).unwrap();
        let creds = session.credentials_for("ghcr.io").unwrap().unwrap();
        assert_eq!(creds.username.as_deref(), Some("octocat"));
        assert_eq!(creds.password.as_deref(), Some("ghp_token"));
        assert_eq!(creds.serveraddress.as_deref(), Some("ghcr.io"));
    }

    #[test]
    fn test_credentials_with_https_key() {
        let (_dir, path) = write_config(
            r#"{"auths":{"https://registry.example.com":{"auth":"b2N0b2NhdDpnaHBfdG9rZW4="}}}"#,
        );

        let session = RegistrySession::from_path(&path).unwrap();
        assert!(
            session
                .credentials_for("registry.example.com")
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_identity_token() {
        let (_dir, path) = write_config(r#"{"auths":{"ghcr.io":{"identitytoken":"tok"}}}"#);

        let session = RegistrySession::from_path(&path).unwrap();
        let creds = session.credentials_for("ghcr.io").unwrap().unwrap();
        assert_eq!(creds.identitytoken.as_deref(), Some("tok"));
        assert!(creds.username.is_none());
    }

    #[test]
    fn test_unknown_registry_is_anonymous() {
        let (_dir, path) = write_config(r#"{"auths":{}}"#);
        let session = RegistrySession::from_path(&path).unwrap();
        assert!(session.credentials_for("ghcr.io").unwrap().is_none());
    }

    #[test]
    fn test_missing_config_is_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let session = RegistrySession::from_path(&dir.path().join("config.json")).unwrap();
        assert!(session.source().is_none());
        assert!(session.credentials_for("ghcr.io").unwrap().is_none());
    }

    #[test]
    fn test_invalid_config_json() {
        let (_dir, path) = write_config("{not json");
        assert!(matches!(
            RegistrySession::from_path(&path),
            Err(BuildError::AuthFailed { .. })
        ));
    }

    #[test]
    fn test_discover_uses_docker_config_env() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"auths":{"ghcr.io":{"auth":"b2N0b2NhdDpnaHBfdG9rZW4="}}}"#,
        )
        .unwrap();

        temp_env::with_var("DOCKER_CONFIG", Some(dir.path().as_os_str()), || {
            let session = RegistrySession::discover().unwrap();
            assert_eq!(session.source(), Some(dir.path().join("config.json").as_path()));
        });
    }
}
