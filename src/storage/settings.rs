// 存储配置解析
//
// 配置文件是一个 JSON 对象，键名沿用大写风格：
// HOSTNAME | HOSTNAMES, USERNAME, BASEPATH, PASSWORD, RSA_KEY, PORT, PROTOCOL,
// STATIC_PROXY_PROTOCOL, STATIC_PROXY_HOSTNAME, STATIC_PROXY_PORT,
// STATICFILES_LOCATION, MEDIAFILES_LOCATION, CONNECT_TIMEOUT, OPERATION_TIMEOUT,
// HOST_KEY_FINGERPRINTS

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::error::{StorageError, StorageResult};
use super::manager::ConnectionConfig;
use super::path::join_path;
use crate::ssh::HostKeyPolicy;

const DEFAULT_PROTOCOL: &str = "http://";
const DEFAULT_PROXY_PORT: &str = "80";

/// 数字或字符串形式的配置值（PORT 两种写法都接受）
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SettingValue {
    Number(i64),
    Text(String),
}

impl SettingValue {
    fn as_text(&self) -> String {
        match self {
            SettingValue::Number(n) => n.to_string(),
            SettingValue::Text(s) => s.trim().to_string(),
        }
    }
}

/// 原始配置（持久化用）
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct StorageSettings {
    pub hostname: Option<String>,
    pub hostnames: Option<Vec<String>>,
    pub username: Option<String>,
    pub basepath: Option<String>,
    pub password: Option<String>,
    pub rsa_key: Option<String>,
    pub port: Option<SettingValue>,
    pub protocol: Option<String>,
    pub static_proxy_protocol: Option<String>,
    pub static_proxy_hostname: Option<String>,
    pub static_proxy_port: Option<SettingValue>,
    pub staticfiles_location: Option<String>,
    pub mediafiles_location: Option<String>,
    pub connect_timeout: Option<u64>,
    pub operation_timeout: Option<u64>,
    pub host_key_fingerprints: Option<Vec<String>>,
}

/// 解析后的存储配置
#[derive(Clone, Debug, PartialEq)]
pub struct StorageConfig {
    /// 所有目标主机（单主机存储只有一个）
    pub hostnames: Vec<String>,
    pub username: String,
    pub basepath: String,
    pub password: Option<String>,
    pub rsa_key: Option<PathBuf>,
    pub port: u16,
    pub protocol: String,
    pub static_proxy_protocol: String,
    pub static_proxy_hostname: String,
    pub static_proxy_port: String,
    /// 静态/媒体文件前缀，同时参与 URL 构建
    pub location: String,
    pub connect_timeout: u64,
    pub operation_timeout: u64,
    pub host_key_policy: HostKeyPolicy,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn fatal(message: &str) -> StorageError {
    error!("[Settings] {}", message);
    StorageError::Configuration(message.to_string())
}

/// 只接受 http:// 或 https://（不区分大小写）
fn normalize_protocol(value: Option<&str>) -> Option<String> {
    let protocol = value?.to_lowercase();
    (protocol == "http://" || protocol == "https://").then_some(protocol)
}

impl StorageSettings {
    /// 校验并解析配置
    pub fn decode(&self) -> StorageResult<StorageConfig> {
        let hostnames: Vec<String> = match &self.hostnames {
            Some(list) => list
                .iter()
                .map(|h| h.trim())
                .filter(|h| !h.is_empty())
                .map(str::to_string)
                .collect(),
            None => non_empty(&self.hostname).into_iter().map(str::to_string).collect(),
        };
        if hostnames.is_empty() {
            return Err(fatal("A hostname must be provided."));
        }

        let username = non_empty(&self.username)
            .ok_or_else(|| fatal("A username must be provided."))?
            .to_string();
        let basepath = non_empty(&self.basepath)
            .ok_or_else(|| fatal("A basepath must be provided."))?
            .to_string();

        let password = non_empty(&self.password).map(str::to_string);
        let rsa_key = non_empty(&self.rsa_key).map(PathBuf::from);
        match (&password, &rsa_key) {
            (None, None) => return Err(fatal("A password or rsa_key must be provided.")),
            // 密码优先；只有私钥真正用于认证时才要求文件存在
            (None, Some(key)) if !key.exists() => {
                return Err(fatal(&format!(
                    "The file '{}' has not been found.",
                    key.display()
                )));
            }
            _ => {}
        }

        let protocol = normalize_protocol(non_empty(&self.protocol))
            .unwrap_or_else(|| DEFAULT_PROTOCOL.to_string());
        let static_proxy_protocol = normalize_protocol(non_empty(&self.static_proxy_protocol))
            .unwrap_or_else(|| protocol.clone());
        let static_proxy_hostname = non_empty(&self.static_proxy_hostname)
            .map(str::to_string)
            .unwrap_or_else(|| hostnames[0].clone());

        let port = self
            .port
            .as_ref()
            .and_then(|p| p.as_text().parse::<u16>().ok())
            .unwrap_or(22);
        let static_proxy_port = self
            .static_proxy_port
            .as_ref()
            .map(SettingValue::as_text)
            .filter(|p| p.parse::<u16>().is_ok())
            .unwrap_or_else(|| DEFAULT_PROXY_PORT.to_string());

        let defaults = ConnectionConfig::default();
        let host_key_policy = match &self.host_key_fingerprints {
            Some(fingerprints) if !fingerprints.is_empty() => {
                HostKeyPolicy::Pinned(fingerprints.clone())
            }
            _ => HostKeyPolicy::AcceptNew,
        };

        Ok(StorageConfig {
            hostnames,
            username,
            basepath,
            password,
            rsa_key,
            port,
            protocol,
            static_proxy_protocol,
            static_proxy_hostname,
            static_proxy_port,
            location: String::new(),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            operation_timeout: self.operation_timeout.unwrap_or(defaults.operation_timeout),
            host_key_policy,
        })
    }
}

impl StorageConfig {
    /// 加上静态/媒体文件前缀：记录 location 并拼接到 basepath
    pub fn with_location(mut self, location: &str) -> Self {
        let location = location.trim_matches('/');
        self.basepath = join_path(&self.basepath, location);
        self.location = location.to_string();
        self
    }

    /// 是否为多主机存储
    pub fn is_multi_host(&self) -> bool {
        self.hostnames.len() > 1
    }

    /// 所有主机共用的连接配置（不含主机名）
    pub fn connection_template(&self) -> ConnectionConfig {
        ConnectionConfig {
            hostname: None,
            username: Some(self.username.clone()),
            password: self.password.clone(),
            key_file: self.rsa_key.clone(),
            port: self.port,
            base_path: Some(self.basepath.clone()),
            current_path: Some(self.basepath.clone()),
            connect_timeout: self.connect_timeout,
            operation_timeout: self.operation_timeout,
            host_key_policy: self.host_key_policy.clone(),
            ..ConnectionConfig::default()
        }
    }
}

/// 默认配置文件路径
/// macOS: ~/Library/Application Support/sftp-storage/storage.json
/// Linux: ~/.config/sftp-storage/storage.json
/// 可通过 SFTP_STORAGE_CONFIG 环境变量覆盖
pub fn default_settings_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("SFTP_STORAGE_CONFIG") {
        return Ok(PathBuf::from(path));
    }
    Ok(dirs::config_dir()
        .context("Cannot locate the system config directory")?
        .join("sftp-storage")
        .join("storage.json"))
}

/// 加载配置文件
pub fn load_settings(path: &Path) -> Result<StorageSettings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Cannot read settings file {}", path.display()))?;
    let settings: StorageSettings = serde_json::from_str(&content)
        .with_context(|| format!("Cannot parse settings file {}", path.display()))?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(json: &str) -> StorageSettings {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_decode_defaults() {
        let config = settings(
            r#"{"HOSTNAME": "h1", "USERNAME": "u", "PASSWORD": "p", "BASEPATH": "/data"}"#,
        )
        .decode()
        .unwrap();

        assert_eq!(config.hostnames, vec!["h1"]);
        assert_eq!(config.port, 22);
        assert_eq!(config.protocol, "http://");
        assert_eq!(config.static_proxy_protocol, "http://");
        assert_eq!(config.static_proxy_hostname, "h1");
        assert_eq!(config.static_proxy_port, "80");
        assert_eq!(config.location, "");
        assert!(!config.is_multi_host());
    }

    #[test]
    fn test_decode_missing_fields() {
        let cases = [
            (r#"{"USERNAME": "u", "PASSWORD": "p", "BASEPATH": "/d"}"#, "hostname"),
            (r#"{"HOSTNAME": "h", "PASSWORD": "p", "BASEPATH": "/d"}"#, "username"),
            (r#"{"HOSTNAME": "h", "USERNAME": "u", "PASSWORD": "p"}"#, "basepath"),
            (r#"{"HOSTNAME": "h", "USERNAME": "u", "BASEPATH": "/d"}"#, "password or rsa_key"),
            (r#"{"HOSTNAME": "", "USERNAME": "u", "PASSWORD": "p", "BASEPATH": "/d"}"#, "hostname"),
        ];
        for (json, field) in cases {
            match settings(json).decode() {
                Err(StorageError::Configuration(msg)) => assert!(msg.contains(field), "{}", msg),
                other => panic!("expected configuration error for {}, got {:?}", json, other),
            }
        }
    }

    #[test]
    fn test_decode_missing_key_file() {
        let result = settings(
            r#"{"HOSTNAME": "h", "USERNAME": "u", "BASEPATH": "/d", "RSA_KEY": "/no/such/key"}"#,
        )
        .decode();
        assert!(matches!(result, Err(StorageError::Configuration(msg)) if msg.contains("/no/such/key")));
    }

    #[test]
    fn test_decode_key_file() {
        let key = tempfile::NamedTempFile::new().unwrap();
        let mut raw = settings(r#"{"HOSTNAME": "h", "USERNAME": "u", "BASEPATH": "/d"}"#);
        raw.rsa_key = Some(key.path().to_string_lossy().to_string());

        let config = raw.decode().unwrap();
        assert_eq!(config.password, None);
        assert_eq!(config.rsa_key.as_deref(), Some(key.path()));
    }

    #[test]
    fn test_password_wins_over_key_file() {
        let config = settings(
            r#"{"HOSTNAME": "h", "USERNAME": "u", "BASEPATH": "/d",
                "PASSWORD": "p", "RSA_KEY": "/no/such/key"}"#,
        )
        .decode()
        .unwrap();

        assert_eq!(config.password.as_deref(), Some("p"));
        assert_eq!(
            config.connection_template().auth_method(),
            Some(crate::ssh::AuthMethod::Password("p".to_string()))
        );
    }

    #[test]
    fn test_decode_port_and_protocol_fallbacks() {
        let config = settings(
            r#"{"HOSTNAME": "h", "USERNAME": "u", "PASSWORD": "p", "BASEPATH": "/d",
                "PORT": "abc", "PROTOCOL": "ftp://", "STATIC_PROXY_PORT": "x"}"#,
        )
        .decode()
        .unwrap();
        assert_eq!(config.port, 22);
        assert_eq!(config.protocol, "http://");
        assert_eq!(config.static_proxy_port, "80");

        let config = settings(
            r#"{"HOSTNAME": "h", "USERNAME": "u", "PASSWORD": "p", "BASEPATH": "/d",
                "PORT": 2222, "PROTOCOL": "HTTPS://", "STATIC_PROXY_PORT": 8080,
                "STATIC_PROXY_HOSTNAME": "cdn.example.com"}"#,
        )
        .decode()
        .unwrap();
        assert_eq!(config.port, 2222);
        assert_eq!(config.protocol, "https://");
        assert_eq!(config.static_proxy_protocol, "https://");
        assert_eq!(config.static_proxy_port, "8080");
        assert_eq!(config.static_proxy_hostname, "cdn.example.com");
    }

    #[test]
    fn test_decode_multiple_hosts() {
        let config = settings(
            r#"{"HOSTNAMES": ["h1", " ", "h2"], "USERNAME": "u", "PASSWORD": "p", "BASEPATH": "/d"}"#,
        )
        .decode()
        .unwrap();
        assert_eq!(config.hostnames, vec!["h1", "h2"]);
        assert_eq!(config.static_proxy_hostname, "h1");
        assert!(config.is_multi_host());
    }

    #[test]
    fn test_with_location() {
        let config = settings(
            r#"{"HOSTNAME": "h", "USERNAME": "u", "PASSWORD": "p", "BASEPATH": "/data"}"#,
        )
        .decode()
        .unwrap()
        .with_location("static");

        assert_eq!(config.basepath, "/data/static");
        assert_eq!(config.location, "static");
        assert_eq!(
            config.connection_template().current_path.as_deref(),
            Some("/data/static")
        );
    }
}
