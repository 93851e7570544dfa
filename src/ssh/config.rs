// SSH 连接参数

use std::path::PathBuf;
use std::time::Duration;

/// SSH 连接参数（由 ConnectionManager::setup 根据存储配置构建）
#[derive(Clone, Debug)]
pub struct SshConfig {
    /// 目标主机
    pub host: String,
    /// 端口
    pub port: u16,
    /// 用户名
    pub username: String,
    /// 认证方式
    pub auth: AuthMethod,
    /// 连接超时（秒）
    pub connect_timeout: u64,
    /// 心跳配置
    pub keepalive: KeepaliveConfig,
    /// 主机密钥策略
    pub host_key_policy: HostKeyPolicy,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 22,
            username: String::new(),
            auth: AuthMethod::Password(String::new()),
            connect_timeout: 30,
            keepalive: KeepaliveConfig::default(),
            host_key_policy: HostKeyPolicy::default(),
        }
    }
}

/// 认证方式
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthMethod {
    /// 密码认证
    Password(String),
    /// 公钥认证
    PublicKey {
        /// 私钥文件路径
        key_path: PathBuf,
        /// 私钥密码（如果有）
        passphrase: Option<String>,
    },
}

/// 主机密钥策略
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// 自动信任未知主机（记录指纹）
    #[default]
    AcceptNew,
    /// 只接受列出的 SHA256 指纹（格式同 `ssh-keygen -l`，如 `SHA256:...`）
    Pinned(Vec<String>),
}

impl HostKeyPolicy {
    /// 判断指纹是否被接受
    pub fn accepts(&self, fingerprint: &str) -> bool {
        match self {
            HostKeyPolicy::AcceptNew => true,
            HostKeyPolicy::Pinned(allowed) => allowed.iter().any(|f| f == fingerprint),
        }
    }
}

/// 心跳配置
#[derive(Clone, Debug)]
pub struct KeepaliveConfig {
    /// 是否启用心跳
    pub enabled: bool,
    /// 心跳间隔（秒）
    pub interval: u64,
    /// 最大重试次数
    pub max_retries: u32,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: 60,
            max_retries: 3,
        }
    }
}

/// russh 客户端配置构建
impl SshConfig {
    /// 构建 russh 配置
    pub fn to_russh_config(&self) -> russh::client::Config {
        let mut config = russh::client::Config::default();
        // 开启心跳时由 keepalive 检测死连接，否则退回不活动超时
        if self.keepalive.enabled {
            config.keepalive_interval = Some(Duration::from_secs(self.keepalive.interval));
            config.keepalive_max = self.keepalive.max_retries as usize;
        } else {
            config.inactivity_timeout = Some(Duration::from_secs(self.connect_timeout));
        }
        config
    }

    /// 连接超时
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}
