// sftp-storage
//
// 基于 SFTP 的远程文件存储：单主机或多主机复制，连接按需建立、失效后自动重建。

pub mod ssh;
pub mod storage;
pub mod transport;

pub use storage::{SshStorage, StorageError, StorageResult};
