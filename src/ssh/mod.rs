// SSH 连接模块
//
// 模块结构:
// - config: 连接参数 (SshConfig, AuthMethod, HostKeyPolicy)
// - error: 错误类型 (SshError)
// - handler: russh Handler 实现
// - client: SSH 客户端核心
// - session: SSH 会话 (SshSession)

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod session;

// 公开导出
pub use client::SshClient;
pub use config::{AuthMethod, HostKeyPolicy, KeepaliveConfig, SshConfig};
pub use error::SshError;
pub use session::SshSession;
