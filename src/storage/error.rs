// 存储层错误类型定义

use thiserror::Error;

use crate::ssh::SshError;

/// 存储错误类型
#[derive(Debug, Error)]
pub enum StorageError {
    /// 配置缺失或无效（启动时致命，不重试）
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 连接或登录失败
    #[error("Connection error: {0}")]
    Connection(String),

    /// 上传、删除、读取失败
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// 远程路径不存在
    #[error("Not found: {0}")]
    NotFound(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

impl From<SshError> for StorageError {
    fn from(e: SshError) -> Self {
        match e {
            SshError::NotFound(path) => StorageError::NotFound(path),
            SshError::Config(msg) => StorageError::Configuration(msg),
            other => StorageError::Transfer(other.to_string()),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
