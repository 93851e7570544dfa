// 传输层能力边界
//
// 模块结构:
// - types: 远程文件条目 (FileEntry, FileType)
// - sftp: 基于 russh + russh-sftp 的实现
// - memory: 进程内实现（测试与本地开发）

pub mod memory;
pub mod sftp;
pub mod types;

use async_trait::async_trait;

use crate::ssh::{SshConfig, SshError};

pub use self::memory::MemoryTransport;
pub use self::sftp::RusshTransport;
pub use types::{FileEntry, FileType};

/// SSH 传输：建立并认证会话
#[async_trait]
pub trait Transport: Send + Sync {
    /// 连接并认证，失败时返回错误（不保留任何半连接状态）
    async fn connect(&self, config: &SshConfig) -> Result<Box<dyn RemoteSession>, SshError>;
}

/// 已认证的 SSH 会话
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// 服务器主机名
    fn host(&self) -> &str;

    /// 会话是否已在本地被判定为关闭（不产生网络往返）
    fn is_closed(&self) -> bool;

    /// 打开 SFTP 子系统
    async fn open_sftp(&self) -> Result<Box<dyn SftpHandle>, SshError>;

    /// 关闭会话
    async fn close(&self) -> Result<(), SshError>;
}

/// SFTP 子会话
///
/// 路径一律为 POSIX 风格的远程绝对路径。
#[async_trait]
pub trait SftpHandle: Send + Sync {
    /// 获取文件/目录属性，路径不存在时返回 `SshError::NotFound`
    async fn stat(&self, path: &str) -> Result<FileEntry, SshError>;

    /// 读取目录内容（不含 `.` 和 `..`）
    async fn list_dir(&self, path: &str) -> Result<Vec<FileEntry>, SshError>;

    /// 创建单级目录
    async fn mkdir(&self, path: &str) -> Result<(), SshError>;

    /// 写入文件（存在则覆盖）
    async fn put(&self, path: &str, data: &[u8]) -> Result<(), SshError>;

    /// 读取整个文件
    async fn read(&self, path: &str) -> Result<Vec<u8>, SshError>;

    /// 删除文件
    async fn remove(&self, path: &str) -> Result<(), SshError>;

    /// 关闭 SFTP 子会话
    async fn close(&self) -> Result<(), SshError>;
}
