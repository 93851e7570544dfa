// 远程文件存储
//
// 模块结构:
// - error: 存储层错误 (StorageError)
// - path: POSIX 远程路径工具
// - manager: 单主机连接管理 (ConnectionManager)
// - coordinator: 多主机复制 (MultiHostCoordinator)
// - settings: 配置解析 (StorageSettings, StorageConfig)
// - adapter: 对外存储接口 (SshStorage)
// - file: 缓冲文件句柄 (StorageFile)

pub mod adapter;
pub mod coordinator;
pub mod error;
pub mod file;
pub mod manager;
pub mod path;
pub mod settings;

// 公开导出
pub use adapter::SshStorage;
pub use coordinator::{FanOutReport, MultiHostCoordinator};
pub use error::{StorageError, StorageResult};
pub use file::StorageFile;
pub use manager::{ConnectionConfig, ConnectionManager, UploadOptions, UploadSource};
pub use settings::{default_settings_path, load_settings, StorageConfig, StorageSettings};
