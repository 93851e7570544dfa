// SSH 客户端核心实现

use std::net::ToSocketAddrs;
use std::path::Path;
use std::sync::Arc;

use russh::client::Handle;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use super::config::{AuthMethod, SshConfig};
use super::error::SshError;
use super::handler::SshClientHandler;
use super::session::SshSession;

/// SSH 客户端
/// 负责建立 SSH 连接并返回 SshSession
pub struct SshClient {
    /// 连接配置
    config: SshConfig,
}

impl SshClient {
    /// 创建新的 SSH 客户端
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    /// 执行连接（异步）
    /// 返回 SshSession 用于后续操作
    pub async fn connect(&self) -> Result<SshSession, SshError> {
        let host = self.config.host.as_str();
        debug!(
            "[SSH] Target: {}@{}:{}",
            self.config.username, host, self.config.port
        );

        // 解析地址
        let addr = format!("{}:{}", host, self.config.port);
        let socket_addr = addr
            .to_socket_addrs()
            .map_err(|e| SshError::Config(format!("Failed to resolve address {}: {}", addr, e)))?
            .next()
            .ok_or_else(|| SshError::Config(format!("No valid address found for {}", addr)))?;

        // TCP 连接
        let connect_timeout = self.config.connect_timeout();
        let tcp_stream = timeout(connect_timeout, TcpStream::connect(socket_addr))
            .await
            .map_err(|_| SshError::Timeout(self.config.connect_timeout))?
            .map_err(SshError::Io)?;

        debug!("[SSH] [{}] TCP connection established", host);

        // SSH 握手
        let russh_config = Arc::new(self.config.to_russh_config());
        let handler =
            SshClientHandler::new(host.to_string(), self.config.host_key_policy.clone());

        let mut handle = timeout(
            connect_timeout,
            russh::client::connect_stream(russh_config, tcp_stream, handler),
        )
        .await
        .map_err(|_| SshError::Timeout(self.config.connect_timeout))?
        .map_err(|e| match e {
            russh::Error::UnknownKey => SshError::HostKey(host.to_string()),
            other => SshError::from(other),
        })?;

        debug!("[SSH] [{}] SSH handshake completed", host);

        // 认证
        timeout(connect_timeout, self.authenticate(&mut handle))
            .await
            .map_err(|_| SshError::Timeout(self.config.connect_timeout))??;

        info!(
            "[SSH] [{}] Authenticated as '{}'",
            host, self.config.username
        );

        Ok(SshSession::new(
            handle,
            host.to_string(),
            self.config.username.clone(),
        ))
    }

    /// 执行认证
    async fn authenticate(&self, handle: &mut Handle<SshClientHandler>) -> Result<(), SshError> {
        use russh::client::AuthResult;

        let auth_result = match &self.config.auth {
            AuthMethod::Password(password) => {
                debug!("[SSH] Using password authentication");

                handle
                    .authenticate_password(&self.config.username, password)
                    .await
                    .map_err(SshError::from)?
            }
            AuthMethod::PublicKey {
                key_path,
                passphrase,
            } => {
                debug!("[SSH] Using public key authentication: {:?}", key_path);

                let key = load_private_key(key_path, passphrase.as_deref()).await?;
                let hash_alg = handle
                    .best_supported_rsa_hash()
                    .await
                    .map_err(SshError::from)?
                    .flatten();
                let key_with_alg = russh::keys::PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg);

                handle
                    .authenticate_publickey(&self.config.username, key_with_alg)
                    .await
                    .map_err(SshError::from)?
            }
        };

        match auth_result {
            AuthResult::Success => Ok(()),
            AuthResult::Failure {
                partial_success: true,
                ..
            } => Err(SshError::Auth(
                "Partial authentication - additional auth required".to_string(),
            )),
            AuthResult::Failure {
                remaining_methods, ..
            } => Err(SshError::Auth(format!(
                "Authentication for '{}' rejected. Server suggests: {:?}",
                self.config.username, remaining_methods
            ))),
        }
    }
}

/// 加载私钥文件
async fn load_private_key(
    key_path: &Path,
    passphrase: Option<&str>,
) -> Result<russh::keys::PrivateKey, SshError> {
    let key_data = tokio::fs::read(key_path)
        .await
        .map_err(|e| SshError::Key(format!("Failed to read key file {:?}: {}", key_path, e)))?;

    russh::keys::decode_secret_key(&String::from_utf8_lossy(&key_data), passphrase)
        .map_err(|e| SshError::Key(format!("Failed to decode key {:?}: {}", key_path, e)))
}
