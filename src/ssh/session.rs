// SSH 会话管理
// 连接成功后的会话对象，负责打开 SFTP 子系统

use std::sync::atomic::{AtomicBool, Ordering};

use russh::client::Handle;
use russh::Disconnect;
use russh_sftp::client::SftpSession;
use tracing::{debug, info};

use super::error::SshError;
use super::handler::SshClientHandler;

/// SSH 会话（连接成功后）
pub struct SshSession {
    /// russh Handle
    handle: Handle<SshClientHandler>,
    /// 服务器主机名
    host: String,
    /// 用户名
    username: String,
    /// 连接状态
    is_connected: AtomicBool,
}

impl SshSession {
    /// 创建新的会话
    pub fn new(handle: Handle<SshClientHandler>, host: String, username: String) -> Self {
        Self {
            handle,
            host,
            username,
            is_connected: AtomicBool::new(true),
        }
    }

    /// 获取主机名
    pub fn host(&self) -> &str {
        &self.host
    }

    /// 获取用户名
    pub fn username(&self) -> &str {
        &self.username
    }

    /// 检查会话是否活跃
    /// russh 在底层连接断开（含心跳超时）后会把 Handle 标记为关闭
    pub fn is_alive(&self) -> bool {
        self.is_connected.load(Ordering::Relaxed) && !self.handle.is_closed()
    }

    /// 标记会话断开
    pub fn mark_disconnected(&self) {
        self.is_connected.store(false, Ordering::Relaxed);
    }

    /// 打开 SFTP 通道并包装为 russh-sftp 会话
    pub async fn open_sftp(&self) -> Result<SftpSession, SshError> {
        if !self.is_alive() {
            return Err(SshError::Disconnected(format!(
                "Session to {} is disconnected",
                self.host
            )));
        }

        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| SshError::Channel(format!("Failed to open channel: {}", e)))?;

        // 请求 SFTP 子系统
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| SshError::Channel(format!("Failed to request sftp subsystem: {}", e)))?;

        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| SshError::Sftp(format!("Failed to create SFTP session: {}", e)))?;

        debug!("[SFTP] [{}] SFTP subsystem ready", self.host);
        Ok(sftp)
    }

    /// 关闭会话
    pub async fn close(&self) -> Result<(), SshError> {
        if !self.is_alive() {
            self.mark_disconnected();
            return Err(SshError::Disconnected(format!(
                "Session to {} already closed",
                self.host
            )));
        }
        self.mark_disconnected();
        self.handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
            .map_err(SshError::from)?;
        info!(
            "[SSH] [{}] Session for '{}' closed",
            self.host,
            self.username()
        );
        Ok(())
    }
}
