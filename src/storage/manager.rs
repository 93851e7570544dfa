// 单主机连接管理
//
// ConnectionManager 独占一个 SSH 会话及其 SFTP 子会话：
// 断开状态构造 → setup() 成功后进入已连接 → close_connection() 释放句柄并清空配置。
// check() 失败的实例必须丢弃，不能复用。

use std::borrow::Cow;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::error::{StorageError, StorageResult};
use super::path::{ancestors, file_name, join_path, local_file_name, with_suffix};
use crate::ssh::{AuthMethod, HostKeyPolicy, KeepaliveConfig, SshConfig, SshError};
use crate::transport::{FileEntry, RemoteSession, SftpHandle, Transport};

/// 单个连接的配置
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// 目标主机
    pub hostname: Option<String>,
    /// 用户名
    pub username: Option<String>,
    /// 密码（与私钥同时存在时优先使用密码）
    pub password: Option<String>,
    /// 私钥文件路径
    pub key_file: Option<PathBuf>,
    /// 端口
    pub port: u16,
    /// 远程根目录
    pub base_path: Option<String>,
    /// 未指定目录时的上传目录，默认等于 base_path
    pub current_path: Option<String>,
    /// 连接超时（秒）
    pub connect_timeout: u64,
    /// 单次 SFTP 操作超时（秒）
    pub operation_timeout: u64,
    /// 心跳配置
    pub keepalive: KeepaliveConfig,
    /// 主机密钥策略
    pub host_key_policy: HostKeyPolicy,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            hostname: None,
            username: None,
            password: None,
            key_file: None,
            port: 22,
            base_path: None,
            current_path: None,
            connect_timeout: 30,
            operation_timeout: 60,
            keepalive: KeepaliveConfig::default(),
            host_key_policy: HostKeyPolicy::default(),
        }
    }
}

impl ConnectionConfig {
    /// 创建配置，current_path 默认为 base_path
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        base_path: impl Into<String>,
    ) -> Self {
        let base_path = base_path.into();
        Self {
            hostname: Some(hostname.into()),
            username: Some(username.into()),
            current_path: Some(base_path.clone()),
            base_path: Some(base_path),
            ..Self::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_key_file(mut self, key_file: impl Into<PathBuf>) -> Self {
        self.key_file = Some(key_file.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// 复制一份配置，只替换主机名
    pub fn for_host(&self, hostname: &str) -> Self {
        Self {
            hostname: Some(hostname.to_string()),
            ..self.clone()
        }
    }

    /// 选择认证方式：密码优先，其次私钥
    pub fn auth_method(&self) -> Option<AuthMethod> {
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            return Some(AuthMethod::Password(password.to_string()));
        }
        self.key_file
            .as_ref()
            .filter(|k| !k.as_os_str().is_empty())
            .map(|key_path| AuthMethod::PublicKey {
                key_path: key_path.clone(),
                passphrase: None,
            })
    }
}

/// 上传来源
#[derive(Clone, Copy, Debug)]
pub enum UploadSource<'a> {
    /// 本地文件路径
    Path(&'a Path),
    /// 已在内存中的内容，`name` 用于推断目标文件名
    Bytes { name: &'a str, data: &'a [u8] },
}

impl<'a> UploadSource<'a> {
    /// 来源文件名（不含目录）
    pub fn name(&self) -> String {
        match self {
            UploadSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| local_file_name(&path.to_string_lossy()).to_string()),
            UploadSource::Bytes { name, .. } => local_file_name(name).to_string(),
        }
    }

    pub(crate) async fn load(&self) -> std::io::Result<Cow<'a, [u8]>> {
        match self {
            UploadSource::Path(path) => tokio::fs::read(path).await.map(Cow::Owned),
            UploadSource::Bytes { data, .. } => Ok(Cow::Borrowed(*data)),
        }
    }
}

/// 上传选项
#[derive(Clone, Debug)]
pub struct UploadOptions {
    /// 相对 base_path 的目录，None 表示 current_path
    pub path: Option<String>,
    /// 目标文件名，None 表示沿用来源文件名
    pub dest_name: Option<String>,
    /// 为 false 时遇到同名文件改存 `name_N.ext`
    pub overwrite: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            path: None,
            dest_name: None,
            overwrite: true,
        }
    }
}

/// 写入超时按这个最低速率（字节/秒）随文件大小延长
const MIN_TRANSFER_RATE: u64 = 64 * 1024;

/// 写入 `len` 字节的超时（秒）：操作超时加上按最低速率估算的传输时间
fn transfer_timeout(op_timeout: u64, len: usize) -> u64 {
    op_timeout.saturating_add(len as u64 / MIN_TRANSFER_RATE)
}

/// 为一次 SFTP 调用加上超时
async fn timed<T, F>(secs: u64, fut: F) -> Result<T, SshError>
where
    F: Future<Output = Result<T, SshError>>,
{
    timeout(Duration::from_secs(secs), fut)
        .await
        .map_err(|_| SshError::Timeout(secs))?
}

/// 单主机连接管理器
pub struct ConnectionManager {
    config: ConnectionConfig,
    transport: Arc<dyn Transport>,
    session: Option<Box<dyn RemoteSession>>,
    sftp: Option<Box<dyn SftpHandle>>,
}

impl ConnectionManager {
    /// 创建管理器（断开状态，不做任何 I/O）
    pub fn new(config: ConnectionConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            session: None,
            sftp: None,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn host(&self) -> &str {
        self.config.hostname.as_deref().unwrap_or("<unset>")
    }

    /// SFTP 句柄是否存在且会话未关闭
    pub fn is_connected(&self) -> bool {
        self.sftp.is_some() && self.session.as_ref().is_some_and(|s| !s.is_closed())
    }

    /// 校验配置：必须有用户名，且有密码或私钥
    pub fn check(&self) -> StorageResult<()> {
        if self.config.username.as_deref().map_or(true, str::is_empty) {
            return Err(StorageError::Configuration(
                "A username must be provided.".to_string(),
            ));
        }
        if self.config.auth_method().is_none() {
            return Err(StorageError::Configuration(
                "A password or rsa_key must be provided.".to_string(),
            ));
        }
        Ok(())
    }

    /// 配置有效且连接仍然存活（只看本地状态）
    pub fn is_healthy(&self) -> bool {
        self.check().is_ok() && self.is_connected()
    }

    fn connect_params(&self) -> StorageResult<SshConfig> {
        self.check()?;
        let host = self
            .config
            .hostname
            .clone()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| StorageError::Configuration("A hostname must be provided.".to_string()))?;
        let auth = self.config.auth_method().ok_or_else(|| {
            StorageError::Configuration("A password or rsa_key must be provided.".to_string())
        })?;

        Ok(SshConfig {
            host,
            port: self.config.port,
            username: self.config.username.clone().unwrap_or_default(),
            auth,
            connect_timeout: self.config.connect_timeout,
            keepalive: self.config.keepalive.clone(),
            host_key_policy: self.config.host_key_policy.clone(),
        })
    }

    /// 根据配置建立连接
    ///
    /// 返回是否成功；认证和网络失败只记录日志，由调用方决定是否重试。
    pub async fn setup(&mut self) -> bool {
        let params = match self.connect_params() {
            Ok(params) => params,
            Err(e) => {
                warn!("[Storage] [{}] Cannot connect: {}", self.host(), e);
                return false;
            }
        };
        if self.session.is_some() || self.sftp.is_some() {
            self.release_handles().await;
        }
        self.connect(params).await
    }

    /// 认证并打开 SFTP 子会话
    ///
    /// 任一步失败都不保留半连接状态：SFTP 打不开时已认证的会话也会被关闭。
    pub async fn connect(&mut self, params: SshConfig) -> bool {
        let session = match self.transport.connect(&params).await {
            Ok(session) => session,
            Err(e) => {
                warn!(
                    "[Storage] [{}] Connection failed for {}@{}:{}: {}",
                    params.host, params.username, params.host, params.port, e
                );
                return false;
            }
        };

        match timed(self.config.operation_timeout, session.open_sftp()).await {
            Ok(sftp) => {
                self.session = Some(session);
                self.sftp = Some(sftp);
                debug!("[Storage] [{}] OK. Connection established!", params.host);
                true
            }
            Err(e) => {
                warn!("[Storage] [{}] Failed to open SFTP: {}", params.host, e);
                if let Err(close_err) = session.close().await {
                    debug!(
                        "[Storage] [{}] Closing half-open session: {}",
                        params.host, close_err
                    );
                }
                false
            }
        }
    }

    /// 确保连接可用，必要时执行 setup()
    pub async fn ensure_connected(&mut self) -> StorageResult<&dyn SftpHandle> {
        self.check()?;
        if !self.is_connected() && !self.setup().await {
            return Err(StorageError::Connection(format!(
                "Connection or login error for {}",
                self.host()
            )));
        }
        self.handle()
    }

    fn handle(&self) -> StorageResult<&dyn SftpHandle> {
        self.sftp
            .as_deref()
            .ok_or_else(|| StorageError::Connection(format!("{} is not connected", self.host())))
    }

    /// 解析目标目录：指定目录拼接到 base_path 下，否则使用 current_path
    fn resolve_dir(&self, path: Option<&str>) -> StorageResult<String> {
        let missing = || StorageError::Configuration("A basepath must be provided.".to_string());
        match path.filter(|p| !p.is_empty()) {
            Some(path) => {
                let base = self.config.base_path.as_deref().ok_or_else(missing)?;
                Ok(join_path(base, path))
            }
            None => self.config.current_path.clone().ok_or_else(missing),
        }
    }

    /// 创建目录
    ///
    /// 直接创建失败且 `recursive` 为 true 时，从根开始逐级创建缺失的目录；
    /// 每级创建前先 stat 探测，已存在视为成功，因此重复调用不会出错。
    pub async fn mkdir(&mut self, path: &str, recursive: bool) -> StorageResult<String> {
        self.ensure_connected().await?;
        let op_timeout = self.config.operation_timeout;
        let sftp = self.handle()?;

        match timed(op_timeout, sftp.mkdir(path)).await {
            Ok(()) => {
                debug!("[Storage] Created directory {}", path);
                return Ok(path.to_string());
            }
            Err(e) if !recursive => return Err(e.into()),
            Err(e) => debug!("[Storage] mkdir {} failed ({}), walking ancestors", path, e),
        }

        for dir in ancestors(path) {
            match timed(op_timeout, sftp.stat(&dir)).await {
                Ok(_) => continue,
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
            if let Err(e) = timed(op_timeout, sftp.mkdir(&dir)).await {
                // 并发创建同一目录：再探测一次
                if timed(op_timeout, sftp.stat(&dir)).await.is_err() {
                    return Err(e.into());
                }
            }
        }
        Ok(path.to_string())
    }

    /// 上传文件，返回是否成功
    ///
    /// 传输失败记录日志并返回 `Ok(false)`，只有连接级错误才返回 `Err`。
    pub async fn upload(
        &mut self,
        source: &UploadSource<'_>,
        options: &UploadOptions,
    ) -> StorageResult<bool> {
        Ok(self.upload_as(source, options).await?.is_some())
    }

    /// 上传文件，返回最终写入的远程路径
    pub async fn upload_as(
        &mut self,
        source: &UploadSource<'_>,
        options: &UploadOptions,
    ) -> StorageResult<Option<String>> {
        self.ensure_connected().await?;
        let source_name = source.name();

        let data = match source.load().await {
            Ok(data) => data,
            Err(e) => {
                error!("[Storage] Cannot read upload source {}: {}", source_name, e);
                return Ok(None);
            }
        };

        let dir = self.resolve_dir(options.path.as_deref())?;
        if let Err(e) = self.mkdir(&dir, true).await {
            error!("[Storage] [{}] Cannot create {}: {}", self.host(), dir, e);
            return Ok(None);
        }

        let dest_name = options
            .dest_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or(source_name.clone());
        let requested = join_path(&dir, &dest_name);
        let mut dest = requested.clone();

        let op_timeout = self.config.operation_timeout;
        let sftp = self.handle()?;

        if !options.overwrite {
            let mut counter = 0;
            loop {
                match timed(op_timeout, sftp.stat(&dest)).await {
                    Ok(_) => {
                        counter += 1;
                        dest = with_suffix(&requested, counter);
                        debug!("[Storage] Filename found. Will try {}", dest);
                    }
                    Err(e) if e.is_not_found() => break,
                    Err(e) => {
                        // 无法确认目标不存在，不能写入
                        error!(
                            "[Storage] [{}] Probing {} failed, upload aborted: {}",
                            self.host(),
                            dest,
                            e
                        );
                        return Ok(None);
                    }
                }
            }
        }

        debug!("[Storage] Uploading {} to {}", source_name, dest);
        let put_timeout = transfer_timeout(op_timeout, data.len());
        match timed(put_timeout, sftp.put(&dest, &data)).await {
            Ok(()) => {
                info!(
                    "[Storage] [{}] Uploaded {} bytes to {}",
                    self.host(),
                    data.len(),
                    dest
                );
                Ok(Some(dest))
            }
            Err(e) => {
                error!(
                    "[Storage] [{}] There were problems uploading {} to {}: {}",
                    self.host(),
                    source_name,
                    dest,
                    e
                );
                Ok(None)
            }
        }
    }

    /// 删除文件，`filename` 中的目录部分会被去掉
    pub async fn remove(&mut self, filename: &str, path: Option<&str>) -> StorageResult<bool> {
        self.ensure_connected().await?;
        let dir = self.resolve_dir(path)?;
        let dest = join_path(&dir, file_name(filename));
        let op_timeout = self.config.operation_timeout;
        let sftp = self.handle()?;

        debug!("[Storage] Removing file: {}", dest);
        match timed(op_timeout, sftp.remove(&dest)).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => {
                error!("[Storage] The path '{}' doesn't exist.", dest);
                Ok(false)
            }
            Err(e) => {
                error!("[Storage] [{}] Cannot remove {}: {}", self.host(), dest, e);
                Ok(false)
            }
        }
    }

    /// 获取远程路径属性
    pub async fn stat(&mut self, path: &str) -> StorageResult<FileEntry> {
        let op_timeout = self.config.operation_timeout;
        let sftp = self.ensure_connected().await?;
        Ok(timed(op_timeout, sftp.stat(path)).await?)
    }

    /// 读取远程目录
    pub async fn list_dir(&mut self, path: &str) -> StorageResult<Vec<FileEntry>> {
        let op_timeout = self.config.operation_timeout;
        let sftp = self.ensure_connected().await?;
        Ok(timed(op_timeout, sftp.list_dir(path)).await?)
    }

    /// 读取远程文件
    pub async fn read(&mut self, path: &str) -> StorageResult<Vec<u8>> {
        let op_timeout = self.config.operation_timeout;
        let sftp = self.ensure_connected().await?;
        Ok(timed(op_timeout, sftp.read(path)).await?)
    }

    /// 关闭连接并清空配置
    ///
    /// 尽力而为：任一句柄已失效或关闭出错时返回 false，从不返回错误。
    pub async fn close_connection(&mut self) -> bool {
        let closed = self.release_handles().await;
        self.config = ConnectionConfig::default();
        closed
    }

    async fn release_handles(&mut self) -> bool {
        let op_timeout = self.config.operation_timeout;
        let host = self.host().to_string();
        let mut clean = true;

        match self.sftp.take() {
            Some(sftp) => {
                if let Err(e) = timed(op_timeout, sftp.close()).await {
                    warn!("[Storage] [{}] Closing SFTP failed: {}", host, e);
                    clean = false;
                }
            }
            None => clean = false,
        }

        match self.session.take() {
            Some(session) => {
                if let Err(e) = timed(op_timeout, session.close()).await {
                    warn!("[Storage] [{}] Closing session failed: {}", host, e);
                    clean = false;
                }
            }
            None => clean = false,
        }

        clean
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if self.session.is_some() {
            debug!(
                "[Storage] [{}] Dropping live connection without close_connection()",
                self.host()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    fn manager(transport: &MemoryTransport) -> ConnectionManager {
        let config = ConnectionConfig::new("h1", "u", "/data").with_password("p");
        ConnectionManager::new(config, Arc::new(transport.clone()))
    }

    #[test]
    fn test_check_requires_username_and_credential() {
        let transport = Arc::new(MemoryTransport::new());

        let mut config = ConnectionConfig::new("h1", "", "/data").with_password("p");
        assert!(matches!(
            ConnectionManager::new(config.clone(), transport.clone()).check(),
            Err(StorageError::Configuration(_))
        ));

        config.username = Some("u".to_string());
        config.password = None;
        assert!(ConnectionManager::new(config.clone(), transport.clone())
            .check()
            .is_err());

        let config = config.with_key_file("/keys/id_rsa");
        assert!(ConnectionManager::new(config, transport).check().is_ok());
    }

    #[test]
    fn test_password_takes_precedence_over_key_file() {
        let config = ConnectionConfig::new("h1", "u", "/data")
            .with_password("p")
            .with_key_file("/keys/id_rsa");
        assert_eq!(
            config.auth_method(),
            Some(AuthMethod::Password("p".to_string()))
        );
    }

    #[tokio::test]
    async fn test_setup_and_close_lifecycle() {
        let transport = MemoryTransport::new();
        let mut manager = manager(&transport);
        assert!(!manager.is_connected());

        assert!(manager.setup().await);
        assert!(manager.is_healthy());

        assert!(manager.close_connection().await);
        assert!(!manager.is_connected());
        assert!(manager.config().hostname.is_none());
        assert!(manager.check().is_err());

        // 第二次关闭：句柄已不存在
        assert!(!manager.close_connection().await);
    }

    #[tokio::test]
    async fn test_setup_failure_keeps_manager_disconnected() {
        let transport = MemoryTransport::new();
        transport.set_reject_auth("h1", true);
        let mut manager = manager(&transport);

        assert!(!manager.setup().await);
        assert!(!manager.is_connected());
        assert!(matches!(
            manager.ensure_connected().await,
            Err(StorageError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_sftp_open_failure_leaves_no_partial_state() {
        let transport = MemoryTransport::new();
        transport.set_fail_sftp("h1", true);
        let mut manager = manager(&transport);

        assert!(!manager.setup().await);
        assert!(manager.session.is_none());
        assert!(manager.sftp.is_none());
    }

    #[tokio::test]
    async fn test_mkdir_recursive_is_idempotent() {
        let transport = MemoryTransport::new();
        let mut manager = manager(&transport);

        manager.mkdir("/data/a/b/c", true).await.unwrap();
        manager.mkdir("/data/a/b/c", true).await.unwrap();
        assert!(transport.has_dir("h1", "/data/a/b/c"));
    }

    #[tokio::test]
    async fn test_mkdir_non_recursive_propagates_error() {
        let transport = MemoryTransport::new();
        let mut manager = manager(&transport);

        let err = manager.mkdir("/data/x/y", false).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!transport.has_dir("h1", "/data/x/y"));
    }

    #[tokio::test]
    async fn test_upload_without_overwrite_adds_suffix() {
        let transport = MemoryTransport::new();
        let mut manager = manager(&transport);
        let source = UploadSource::Bytes {
            name: "pic.jpg",
            data: b"jpeg",
        };
        let options = UploadOptions {
            overwrite: false,
            ..UploadOptions::default()
        };

        let first = manager.upload_as(&source, &options).await.unwrap();
        let second = manager.upload_as(&source, &options).await.unwrap();
        let third = manager.upload_as(&source, &options).await.unwrap();

        assert_eq!(first.as_deref(), Some("/data/pic.jpg"));
        assert_eq!(second.as_deref(), Some("/data/pic_1.jpg"));
        assert_eq!(third.as_deref(), Some("/data/pic_2.jpg"));
    }

    #[tokio::test]
    async fn test_upload_without_overwrite_aborts_when_probe_fails() {
        let transport = MemoryTransport::new();
        transport.seed_file("h1", "/data/pic.jpg", b"ORIGINAL");
        transport.fail_next_stat("h1", "/data/pic.jpg");
        let mut manager = manager(&transport);
        let source = UploadSource::Bytes {
            name: "pic.jpg",
            data: b"NEW",
        };
        let options = UploadOptions {
            overwrite: false,
            ..UploadOptions::default()
        };

        assert_eq!(manager.upload_as(&source, &options).await.unwrap(), None);
        assert_eq!(
            transport.file("h1", "/data/pic.jpg"),
            Some(b"ORIGINAL".to_vec())
        );
        assert_eq!(transport.files("h1"), vec!["/data/pic.jpg"]);
    }

    #[tokio::test]
    async fn test_mkdir_tolerates_concurrent_creation() {
        let transport = MemoryTransport::new();
        transport.set_mkdir_races("h1", true);
        let mut manager = manager(&transport);

        manager.mkdir("/data/a/b", true).await.unwrap();
        assert!(transport.has_dir("h1", "/data/a/b"));

        let source = UploadSource::Bytes {
            name: "c.txt",
            data: b"c",
        };
        let options = UploadOptions {
            path: Some("x/y".to_string()),
            ..UploadOptions::default()
        };
        assert!(manager.upload(&source, &options).await.unwrap());
        assert_eq!(transport.file("h1", "/data/x/y/c.txt"), Some(b"c".to_vec()));
    }

    #[test]
    fn test_transfer_timeout_scales_with_size() {
        assert_eq!(transfer_timeout(60, 0), 60);
        assert_eq!(transfer_timeout(60, 1024), 60);
        assert_eq!(transfer_timeout(60, 64 * 1024 * 100), 160);
        assert_eq!(transfer_timeout(u64::MAX, usize::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_upload_with_overwrite_replaces_content() {
        let transport = MemoryTransport::new();
        let mut manager = manager(&transport);
        let options = UploadOptions {
            path: Some("img".to_string()),
            dest_name: Some("logo.png".to_string()),
            overwrite: true,
        };

        for data in [&b"old"[..], &b"new"[..]] {
            let source = UploadSource::Bytes {
                name: "upload.bin",
                data,
            };
            assert!(manager.upload(&source, &options).await.unwrap());
        }

        assert_eq!(
            transport.file("h1", "/data/img/logo.png"),
            Some(b"new".to_vec())
        );
        assert_eq!(transport.files("h1"), vec!["/data/img/logo.png"]);
    }

    #[tokio::test]
    async fn test_upload_failure_returns_false() {
        let transport = MemoryTransport::new();
        transport.set_fail_writes("h1", true);
        let mut manager = manager(&transport);
        let source = UploadSource::Bytes {
            name: "a.txt",
            data: b"a",
        };

        assert!(!manager
            .upload(&source, &UploadOptions::default())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_upload_missing_local_file_returns_false() {
        let transport = MemoryTransport::new();
        let mut manager = manager(&transport);
        let source = UploadSource::Path(Path::new("/definitely/not/here.txt"));

        assert!(!manager
            .upload(&source, &UploadOptions::default())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_remove_strips_directory_from_filename() {
        let transport = MemoryTransport::new();
        transport.seed_file("h1", "/data/docs/a.txt", b"a");
        let mut manager = manager(&transport);

        assert!(manager
            .remove("elsewhere/a.txt", Some("docs"))
            .await
            .unwrap());
        assert!(transport.file("h1", "/data/docs/a.txt").is_none());
        assert!(!manager.remove("a.txt", Some("docs")).await.unwrap());
    }
}
