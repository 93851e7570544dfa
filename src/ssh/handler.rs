// SSH 客户端 Handler 实现
// 实现 russh::client::Handler trait

use russh::keys::PublicKey;
use std::future::Future;
use tracing::{debug, info, warn};

use super::config::HostKeyPolicy;

/// SSH 客户端 Handler
/// 处理 SSH 连接过程中的回调（主机密钥校验）
pub struct SshClientHandler {
    /// 服务器主机名（用于日志）
    host: String,
    /// 主机密钥策略
    policy: HostKeyPolicy,
}

impl SshClientHandler {
    /// 创建新的 Handler
    pub fn new(host: String, policy: HostKeyPolicy) -> Self {
        Self { host, policy }
    }
}

impl russh::client::Handler for SshClientHandler {
    type Error = russh::Error;

    /// 检查服务器公钥
    fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        let fingerprint = server_public_key
            .fingerprint(russh::keys::ssh_key::HashAlg::Sha256)
            .to_string();

        debug!(
            "[SSH] [{}] Server key type: {}",
            self.host,
            server_public_key.algorithm()
        );

        let accepted = self.policy.accepts(&fingerprint);
        match self.policy {
            HostKeyPolicy::AcceptNew => {
                info!(
                    "[SSH] [{}] Trusting server key {}",
                    self.host, fingerprint
                );
            }
            HostKeyPolicy::Pinned(_) if !accepted => {
                warn!(
                    "[SSH] [{}] Server key {} is not pinned, rejecting",
                    self.host, fingerprint
                );
            }
            HostKeyPolicy::Pinned(_) => {
                debug!("[SSH] [{}] Pinned server key matched", self.host);
            }
        }

        async move { Ok(accepted) }
    }
}
