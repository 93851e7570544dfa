// SSH / SFTP 传输层错误类型定义

use russh_sftp::protocol::StatusCode;
use thiserror::Error;

/// SSH 错误类型
#[derive(Debug, Error)]
pub enum SshError {
    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO 错误（网络连接、本地文件等）
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 认证失败
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// SSH 协议错误
    #[error("SSH protocol error: {0}")]
    Protocol(String),

    /// 密钥错误
    #[error("Key error: {0}")]
    Key(String),

    /// 主机密钥校验失败
    #[error("Host key rejected for {0}")]
    HostKey(String),

    /// 操作超时
    #[error("Operation timeout after {0}s")]
    Timeout(u64),

    /// 通道错误
    #[error("Channel error: {0}")]
    Channel(String),

    /// 会话已断开
    #[error("Session disconnected: {0}")]
    Disconnected(String),

    /// SFTP 子系统返回的错误
    #[error("SFTP error: {0}")]
    Sftp(String),

    /// 远程路径不存在
    #[error("No such file: {0}")]
    NotFound(String),
}

impl SshError {
    /// 是否为“路径不存在”
    pub fn is_not_found(&self) -> bool {
        matches!(self, SshError::NotFound(_))
    }
}

impl From<russh::Error> for SshError {
    fn from(e: russh::Error) -> Self {
        SshError::Protocol(e.to_string())
    }
}

impl From<russh::keys::Error> for SshError {
    fn from(e: russh::keys::Error) -> Self {
        SshError::Key(e.to_string())
    }
}

impl From<russh_sftp::client::error::Error> for SshError {
    fn from(e: russh_sftp::client::error::Error) -> Self {
        use russh_sftp::client::error::Error as SftpError;

        match e {
            SftpError::Status(status) if status.status_code == StatusCode::NoSuchFile => {
                SshError::NotFound(status.error_message)
            }
            SftpError::Timeout => SshError::Sftp("request timed out".to_string()),
            other => SshError::Sftp(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(SshError::NotFound("/data/a.txt".to_string()).is_not_found());
        assert!(!SshError::Sftp("permission denied".to_string()).is_not_found());
        assert!(!SshError::Timeout(30).is_not_found());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            SshError::Timeout(5).to_string(),
            "Operation timeout after 5s"
        );
        assert_eq!(
            SshError::HostKey("h1".to_string()).to_string(),
            "Host key rejected for h1"
        );
    }
}
