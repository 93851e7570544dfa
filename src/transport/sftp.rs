// 基于 russh + russh-sftp 的传输实现

use async_trait::async_trait;
use russh_sftp::client::fs::Metadata;
use russh_sftp::client::SftpSession;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use super::types::{FileEntry, FileType};
use super::{RemoteSession, SftpHandle, Transport};
use crate::ssh::{SshClient, SshConfig, SshError, SshSession};

/// russh 传输
#[derive(Clone, Copy, Debug, Default)]
pub struct RusshTransport;

#[async_trait]
impl Transport for RusshTransport {
    async fn connect(&self, config: &SshConfig) -> Result<Box<dyn RemoteSession>, SshError> {
        let session = SshClient::new(config.clone()).connect().await?;
        Ok(Box::new(session))
    }
}

#[async_trait]
impl RemoteSession for SshSession {
    fn host(&self) -> &str {
        SshSession::host(self)
    }

    fn is_closed(&self) -> bool {
        !self.is_alive()
    }

    async fn open_sftp(&self) -> Result<Box<dyn SftpHandle>, SshError> {
        let sftp = SshSession::open_sftp(self).await?;
        Ok(Box::new(RusshSftp {
            host: self.host().to_string(),
            sftp,
        }))
    }

    async fn close(&self) -> Result<(), SshError> {
        SshSession::close(self).await
    }
}

/// russh-sftp 客户端会话
pub struct RusshSftp {
    /// 服务器主机名（用于日志）
    host: String,
    sftp: SftpSession,
}

/// 根据属性构建文件条目
fn to_entry(name: String, path: String, attrs: &Metadata) -> FileEntry {
    let file_type = if attrs.is_dir() {
        FileType::Directory
    } else if attrs.is_symlink() {
        FileType::Symlink
    } else {
        // russh-sftp 没有 is_file()，默认为普通文件
        FileType::File
    };

    let mut entry = FileEntry::new(name, path, file_type);
    entry.size = attrs.size.unwrap_or(0);
    entry.permissions = attrs.permissions;
    entry.mtime = attrs.mtime.map(u64::from);
    entry.atime = attrs.atime.map(u64::from);
    entry
}

/// 路径最后一段
fn base_name(path: &str) -> String {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .to_string()
}

#[async_trait]
impl SftpHandle for RusshSftp {
    async fn stat(&self, path: &str) -> Result<FileEntry, SshError> {
        debug!("[SFTP] [{}] stat {}", self.host, path);
        let attrs = self.sftp.metadata(path).await.map_err(SshError::from)?;
        Ok(to_entry(base_name(path), path.to_string(), &attrs))
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<FileEntry>, SshError> {
        debug!("[SFTP] [{}] Reading directory: {}", self.host, path);
        let dir = self.sftp.read_dir(path).await.map_err(SshError::from)?;

        let mut entries = Vec::new();
        for entry in dir {
            let name = entry.file_name();
            if name == "." || name == ".." {
                continue;
            }
            let full_path = if path == "/" {
                format!("/{}", name)
            } else {
                format!("{}/{}", path.trim_end_matches('/'), name)
            };
            entries.push(to_entry(name, full_path, &entry.metadata()));
        }
        Ok(entries)
    }

    async fn mkdir(&self, path: &str) -> Result<(), SshError> {
        debug!("[SFTP] [{}] Creating directory: {}", self.host, path);
        self.sftp.create_dir(path).await.map_err(SshError::from)
    }

    async fn put(&self, path: &str, data: &[u8]) -> Result<(), SshError> {
        debug!(
            "[SFTP] [{}] Writing {} bytes to {}",
            self.host,
            data.len(),
            path
        );
        let mut file = self.sftp.create(path).await.map_err(SshError::from)?;
        file.write_all(data).await?;
        file.shutdown().await?;
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, SshError> {
        debug!("[SFTP] [{}] Reading file: {}", self.host, path);
        let mut file = self.sftp.open(path).await.map_err(SshError::from)?;
        let mut content = Vec::new();
        file.read_to_end(&mut content).await?;
        Ok(content)
    }

    async fn remove(&self, path: &str) -> Result<(), SshError> {
        debug!("[SFTP] [{}] Removing file: {}", self.host, path);
        self.sftp.remove_file(path).await.map_err(SshError::from)
    }

    async fn close(&self) -> Result<(), SshError> {
        self.sftp.close().await.map_err(SshError::from)
    }
}
