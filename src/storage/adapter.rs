// 存储适配器
//
// SshStorage 是对外的存储接口：名字一律相对于 basepath，写操作经协调器复制到所有主机，
// 读操作走第一个主机。单主机存储就是只有一个主机的协调器。

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Local};
use futures::future::BoxFuture;
use tracing::{debug, error, warn};

use super::coordinator::MultiHostCoordinator;
use super::error::{StorageError, StorageResult};
use super::file::StorageFile;
use super::manager::UploadSource;
use super::settings::{StorageConfig, StorageSettings};
use crate::transport::{FileEntry, RusshTransport, Transport};

/// SFTP 存储
pub struct SshStorage {
    config: StorageConfig,
    coordinator: MultiHostCoordinator,
}

fn to_local_time(secs: Option<u64>) -> Option<DateTime<Local>> {
    let secs = i64::try_from(secs?).ok()?;
    DateTime::from_timestamp(secs, 0).map(|t| t.with_timezone(&Local))
}

impl SshStorage {
    /// 使用 russh 传输创建存储（不建立连接）
    pub fn new(config: StorageConfig) -> Self {
        Self::with_transport(config, Arc::new(RusshTransport))
    }

    /// 使用指定传输创建存储
    pub fn with_transport(config: StorageConfig, transport: Arc<dyn Transport>) -> Self {
        let coordinator = MultiHostCoordinator::new(
            config.hostnames.clone(),
            config.connection_template(),
            transport,
        );
        Self {
            config,
            coordinator,
        }
    }

    /// 从原始配置创建
    pub fn from_settings(
        settings: &StorageSettings,
        transport: Arc<dyn Transport>,
    ) -> StorageResult<Self> {
        Ok(Self::with_transport(settings.decode()?, transport))
    }

    /// 静态文件存储，前缀取 STATICFILES_LOCATION
    pub fn static_files(
        settings: &StorageSettings,
        transport: Arc<dyn Transport>,
    ) -> StorageResult<Self> {
        let location = settings.staticfiles_location.as_deref().unwrap_or("static");
        let config = settings.decode()?.with_location(location);
        Ok(Self::with_transport(config, transport))
    }

    /// 媒体文件存储，前缀取 MEDIAFILES_LOCATION
    pub fn media_files(
        settings: &StorageSettings,
        transport: Arc<dyn Transport>,
    ) -> StorageResult<Self> {
        let location = settings.mediafiles_location.as_deref().unwrap_or("media");
        let config = settings.decode()?.with_location(location);
        Ok(Self::with_transport(config, transport))
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &MultiHostCoordinator {
        &self.coordinator
    }

    /// 远程绝对路径
    pub fn remote_path(&self, name: &str) -> String {
        self.coordinator.remote_path(name)
    }

    /// 巡检所有主机的连接，失效的重新建立
    pub async fn ensure_connected(&mut self) -> StorageResult<()> {
        self.coordinator.start_connection().await
    }

    /// 在第一个主机上获取属性
    async fn stat(&mut self, name: &str) -> StorageResult<FileEntry> {
        self.ensure_connected().await?;
        let remote_path = self.remote_path(name);
        self.coordinator.primary()?.stat(&remote_path).await
    }

    /// 路径是否存在（多主机时要求所有主机都存在）
    ///
    /// 连接失败也返回 false。
    pub async fn exists(&mut self, name: &str) -> bool {
        if let Err(e) = self.ensure_connected().await {
            warn!("[Storage] exists({}): {}", name, e);
            return false;
        }
        self.coordinator.exists(name).await
    }

    /// 列出目录，返回 (子目录, 文件)；目录不存在时两者都为空
    pub async fn listdir(&mut self, path: &str) -> StorageResult<(Vec<String>, Vec<String>)> {
        self.ensure_connected().await?;
        let remote_path = self.remote_path(path);
        debug!("[Storage] REMOTE PATH: {}", remote_path);

        let entries = match self.coordinator.primary()?.list_dir(&remote_path).await {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => return Ok((Vec::new(), Vec::new())),
            Err(e) => return Err(e),
        };

        let (dirs, files): (Vec<_>, Vec<_>) = entries.into_iter().partition(FileEntry::is_dir);
        Ok((
            dirs.into_iter().map(|e| e.name).collect(),
            files.into_iter().map(|e| e.name).collect(),
        ))
    }

    /// 保存内容到 `name`（总是覆盖），返回保存的名字
    ///
    /// 所有主机都失败时返回 `TransferError`。
    pub async fn save(&mut self, name: &str, content: &[u8]) -> StorageResult<String> {
        self.save_source(
            name,
            &UploadSource::Bytes {
                name,
                data: content,
            },
        )
        .await
    }

    /// 把本地文件保存到 `name`
    pub async fn save_from(&mut self, name: &str, local: &Path) -> StorageResult<String> {
        self.save_source(name, &UploadSource::Path(local)).await
    }

    async fn save_source(&mut self, name: &str, source: &UploadSource<'_>) -> StorageResult<String> {
        self.ensure_connected().await?;
        let report = self.coordinator.upload(name, source).await;
        if !report.any_succeeded() {
            error!("[Storage] Error writing file {}", name);
            return Err(StorageError::Transfer(format!("Error writing file {}", name)));
        }
        if !report.is_complete() {
            warn!(
                "[Storage] {} written to {} of {} hosts",
                name,
                report.succeeded.len(),
                self.coordinator.hosts().len()
            );
        }
        Ok(name.to_string())
    }

    /// 读取整个文件
    pub async fn read(&mut self, name: &str) -> StorageResult<Vec<u8>> {
        self.ensure_connected().await?;
        let remote_path = self.remote_path(name);
        self.coordinator.primary()?.read(&remote_path).await
    }

    /// 打开文件句柄（内容在第一次读取时才获取）
    pub fn open(&mut self, name: &str, mode: &str) -> StorageFile<'_> {
        StorageFile::new(self, name, mode)
    }

    /// 从所有主机删除，至少一个主机删除成功时返回 true
    pub async fn delete(&mut self, name: &str) -> StorageResult<bool> {
        self.ensure_connected().await?;
        let report = self.coordinator.remove(name).await;
        Ok(report.any_succeeded())
    }

    /// 文件大小，不存在时为 None
    pub async fn size(&mut self, name: &str) -> StorageResult<Option<u64>> {
        match self.stat(name).await {
            Ok(entry) => Ok(Some(entry.size)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 修改时间（本地时区），不存在时为 None
    pub async fn get_modified_time(&mut self, name: &str) -> StorageResult<Option<DateTime<Local>>> {
        match self.stat(name).await {
            Ok(entry) => Ok(to_local_time(entry.mtime)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 访问时间（本地时区），不存在时为 None
    pub async fn get_accessed_time(&mut self, name: &str) -> StorageResult<Option<DateTime<Local>>> {
        match self.stat(name).await {
            Ok(entry) => Ok(to_local_time(entry.atime)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 远程文件系统不提供创建时间
    pub fn get_created_time(&self, _name: &str) -> Option<DateTime<Local>> {
        None
    }

    /// 远程文件没有本地路径
    pub fn path(&self, _name: &str) -> Option<std::path::PathBuf> {
        None
    }

    /// 公开访问地址
    pub fn url(&self, name: &str) -> String {
        let config = &self.config;
        let mut url = config.static_proxy_protocol.clone();
        url.push_str(&config.static_proxy_hostname);
        if config.static_proxy_port != "80" {
            url.push(':');
            url.push_str(&config.static_proxy_port);
        }
        for segment in [config.location.as_str(), name] {
            let segment = segment.replace('\\', "/");
            let segment = segment.trim_start_matches('/');
            if segment.is_empty() {
                continue;
            }
            url.push('/');
            url.push_str(segment);
        }
        debug!("[Storage] URL: {}", url);
        url
    }

    /// 关闭所有连接，下次操作时重新建立
    pub async fn disconnect(&mut self) -> bool {
        self.coordinator.close_all().await
    }

    /// 建立连接、执行 `f`，无论成功与否都断开连接
    pub async fn with_connection<T, F>(&mut self, f: F) -> StorageResult<T>
    where
        F: for<'a> FnOnce(&'a mut SshStorage) -> BoxFuture<'a, StorageResult<T>>,
    {
        self.ensure_connected().await?;
        let result = f(&mut *self).await;
        self.disconnect().await;
        result
    }
}
