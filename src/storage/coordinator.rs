// 多主机协调器
//
// 每个主机一个独立的 ConnectionManager。写操作复制到所有主机（单个主机失败只记录，
// 不中断其余主机，也不回滚），exists 要求所有主机都存在该路径。

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, warn};

use super::error::{StorageError, StorageResult};
use super::manager::{ConnectionConfig, ConnectionManager, UploadOptions, UploadSource};
use super::path::{join_path, split_path};
use crate::transport::Transport;

/// 扇出操作的结果
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// 成功的主机（按配置顺序）
    pub succeeded: Vec<String>,
    /// 失败的主机（按配置顺序）
    pub failed: Vec<String>,
}

impl FanOutReport {
    /// 所有主机都成功
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// 至少一个主机成功
    pub fn any_succeeded(&self) -> bool {
        !self.succeeded.is_empty()
    }
}

/// 多主机协调器
pub struct MultiHostCoordinator {
    /// 配置顺序
    hosts: Vec<String>,
    /// 所有主机共用的连接配置（主机名在创建管理器时替换）
    template: ConnectionConfig,
    managers: HashMap<String, ConnectionManager>,
    transport: Arc<dyn Transport>,
}

impl MultiHostCoordinator {
    pub fn new(hosts: Vec<String>, template: ConnectionConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            hosts,
            template,
            managers: HashMap::new(),
            transport,
        }
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// 指定主机的管理器（未连接时为 None）
    pub fn manager(&self, host: &str) -> Option<&ConnectionManager> {
        self.managers.get(host)
    }

    pub fn manager_mut(&mut self, host: &str) -> Option<&mut ConnectionManager> {
        self.managers.get_mut(host)
    }

    /// 远程根目录下的路径
    pub fn remote_path(&self, name: &str) -> String {
        join_path(self.template.base_path.as_deref().unwrap_or("/"), name)
    }

    /// 连接巡检
    ///
    /// 失效的管理器被关闭并丢弃，缺失的主机重新建立连接；任一主机建立失败则整体失败。
    /// 已经健康的连接不做网络层面的复查。
    pub async fn start_connection(&mut self) -> StorageResult<()> {
        for host in self.hosts.clone() {
            if let Some(manager) = self.managers.get_mut(&host) {
                if !manager.is_healthy() {
                    warn!("[MultiHost] [{}] Connection is no longer valid, dropping it", host);
                    manager.close_connection().await;
                    self.managers.remove(&host);
                }
            }

            if self.managers.contains_key(&host) {
                continue;
            }

            debug!("[MultiHost] [{}] Connecting", host);
            let mut manager =
                ConnectionManager::new(self.template.for_host(&host), self.transport.clone());
            if !manager.setup().await {
                let message = format!(
                    "Connection or login error for {}@{}:{}",
                    self.template.username.as_deref().unwrap_or_default(),
                    host,
                    self.template.port
                );
                error!("[MultiHost] {}", message);
                return Err(StorageError::Connection(message));
            }
            self.managers.insert(host, manager);
        }
        Ok(())
    }

    /// 第一个配置主机的管理器，读操作都走这里
    pub fn primary(&mut self) -> StorageResult<&mut ConnectionManager> {
        let host = self
            .hosts
            .first()
            .ok_or_else(|| StorageError::Configuration("A hostname must be provided.".to_string()))?;
        self.managers
            .get_mut(host)
            .ok_or_else(|| StorageError::Connection(format!("{} is not connected", host)))
    }

    /// 把 `name`（可带相对目录）上传到所有主机
    ///
    /// 本地文件只读取一次，所有主机共用同一份内容。
    pub async fn upload(&mut self, name: &str, source: &UploadSource<'_>) -> FanOutReport {
        let source_name = source.name();
        let data = match source.load().await {
            Ok(data) => data,
            Err(e) => {
                error!("[MultiHost] Cannot read upload source {}: {}", source_name, e);
                return FanOutReport {
                    succeeded: Vec::new(),
                    failed: self.hosts.clone(),
                };
            }
        };
        let shared = UploadSource::Bytes {
            name: source_name.as_str(),
            data: &data[..],
        };
        let source = &shared;

        let (dir, dest_name) = split_path(name);
        let options = UploadOptions {
            path: Some(dir.to_string()).filter(|d| !d.is_empty()),
            dest_name: Some(dest_name.to_string()),
            overwrite: true,
        };
        debug!("[MultiHost] PATH: {:?}, DESTNAME: {}", options.path, dest_name);

        let options = &options;
        let uploads = self.managers.iter_mut().map(|(host, manager)| async move {
            let ok = match manager.upload(source, options).await {
                Ok(ok) => ok,
                Err(e) => {
                    error!("[MultiHost] [{}] Upload failed: {}", host, e);
                    false
                }
            };
            (host.clone(), ok)
        });
        let results: HashMap<String, bool> = join_all(uploads).await.into_iter().collect();

        let report = self.report(&results);
        for host in &report.failed {
            error!("[MultiHost] [{}] Error writing file {}", host, name);
        }
        report
    }

    /// 从所有主机删除 `name`
    pub async fn remove(&mut self, name: &str) -> FanOutReport {
        let (dir, file) = split_path(name);
        let dir = Some(dir).filter(|d| !d.is_empty());

        let removals = self.managers.iter_mut().map(|(host, manager)| async move {
            let ok = match manager.remove(file, dir).await {
                Ok(ok) => ok,
                Err(e) => {
                    error!("[MultiHost] [{}] Remove failed: {}", host, e);
                    false
                }
            };
            (host.clone(), ok)
        });
        let results: HashMap<String, bool> = join_all(removals).await.into_iter().collect();
        self.report(&results)
    }

    /// 所有主机上都存在时返回 true；任一主机缺失、未连接或出错都返回 false
    pub async fn exists(&mut self, name: &str) -> bool {
        if self.hosts.iter().any(|h| !self.managers.contains_key(h)) {
            debug!("[MultiHost] Not every host is connected");
            return false;
        }

        let remote_path = self.remote_path(name);
        let remote_path = remote_path.as_str();
        let stats = self.managers.iter_mut().map(|(host, manager)| async move {
            match manager.stat(remote_path).await {
                Ok(_) => true,
                Err(e) => {
                    debug!("[MultiHost] [{}] stat {}: {}", host, remote_path, e);
                    false
                }
            }
        });
        join_all(stats).await.into_iter().all(|present| present)
    }

    /// 关闭所有连接
    pub async fn close_all(&mut self) -> bool {
        let mut clean = true;
        for (host, mut manager) in self.managers.drain() {
            if !manager.close_connection().await {
                debug!("[MultiHost] [{}] Connection was already closed", host);
                clean = false;
            }
        }
        clean
    }

    /// 按配置顺序汇总结果，未连接的主机算作失败
    fn report(&self, results: &HashMap<String, bool>) -> FanOutReport {
        let mut report = FanOutReport::default();
        for host in &self.hosts {
            match results.get(host) {
                Some(true) => report.succeeded.push(host.clone()),
                Some(false) => report.failed.push(host.clone()),
                None => {
                    error!("[MultiHost] [{}] Not connected, skipped", host);
                    report.failed.push(host.clone());
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    fn coordinator(transport: &MemoryTransport) -> MultiHostCoordinator {
        let template = ConnectionConfig::new("", "u", "/data").with_password("p");
        MultiHostCoordinator::new(
            vec!["h1".to_string(), "h2".to_string()],
            template,
            Arc::new(transport.clone()),
        )
    }

    #[tokio::test]
    async fn test_start_connection_connects_every_host() {
        let transport = MemoryTransport::new();
        let mut coordinator = coordinator(&transport);

        coordinator.start_connection().await.unwrap();
        assert!(coordinator.manager("h1").is_some_and(|m| m.is_healthy()));
        assert!(coordinator.manager("h2").is_some_and(|m| m.is_healthy()));

        // 健康的连接不重复建立
        coordinator.start_connection().await.unwrap();
        assert_eq!(transport.connect_count("h1"), 1);
        assert_eq!(transport.connect_count("h2"), 1);
    }

    #[tokio::test]
    async fn test_start_connection_fails_when_any_host_fails() {
        let transport = MemoryTransport::new();
        transport.set_offline("h2", true);
        let mut coordinator = coordinator(&transport);

        let result = coordinator.start_connection().await;
        assert!(matches!(result, Err(StorageError::Connection(msg)) if msg.contains("h2")));
        assert!(coordinator.manager("h1").is_some());
        assert!(coordinator.manager("h2").is_none());
    }

    #[tokio::test]
    async fn test_sweep_replaces_closed_manager() {
        let transport = MemoryTransport::new();
        let mut coordinator = coordinator(&transport);
        coordinator.start_connection().await.unwrap();

        let manager = coordinator.manager_mut("h1").unwrap();
        assert!(manager.close_connection().await);

        coordinator.start_connection().await.unwrap();
        assert!(coordinator.manager("h1").is_some_and(|m| m.is_healthy()));
        assert_eq!(transport.connect_count("h1"), 2);
        assert_eq!(transport.connect_count("h2"), 1);
    }

    #[tokio::test]
    async fn test_upload_reports_per_host_outcome() {
        let transport = MemoryTransport::new();
        transport.set_fail_writes("h1", true);
        let mut coordinator = coordinator(&transport);
        coordinator.start_connection().await.unwrap();

        let source = UploadSource::Bytes {
            name: "a.txt",
            data: b"a",
        };
        let report = coordinator.upload("docs/a.txt", &source).await;

        assert_eq!(report.failed, vec!["h1"]);
        assert_eq!(report.succeeded, vec!["h2"]);
        assert_eq!(transport.file("h2", "/data/docs/a.txt"), Some(b"a".to_vec()));
        assert!(!coordinator.exists("docs/a.txt").await);
    }

    #[tokio::test]
    async fn test_upload_counts_unconnected_host_as_failed() {
        let transport = MemoryTransport::new();
        let mut coordinator = coordinator(&transport);

        let source = UploadSource::Bytes {
            name: "a.txt",
            data: b"a",
        };
        let report = coordinator.upload("a.txt", &source).await;
        assert!(!report.any_succeeded());
        assert_eq!(report.failed, vec!["h1", "h2"]);
    }

    #[tokio::test]
    async fn test_upload_local_file_to_every_host() {
        let transport = MemoryTransport::new();
        let mut coordinator = coordinator(&transport);
        coordinator.start_connection().await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("video.mp4");
        std::fs::write(&local, b"frames").unwrap();

        let report = coordinator
            .upload("media/clip.mp4", &UploadSource::Path(&local))
            .await;
        assert!(report.is_complete());
        for host in ["h1", "h2"] {
            assert_eq!(
                transport.file(host, "/data/media/clip.mp4"),
                Some(b"frames".to_vec())
            );
        }
    }

    #[tokio::test]
    async fn test_upload_unreadable_local_file_fails_every_host() {
        let transport = MemoryTransport::new();
        let mut coordinator = coordinator(&transport);
        coordinator.start_connection().await.unwrap();

        let missing = std::path::Path::new("/definitely/not/here.bin");
        let report = coordinator.upload("a.bin", &UploadSource::Path(missing)).await;
        assert_eq!(report.failed, vec!["h1", "h2"]);
        assert!(transport.files("h1").is_empty());
        assert!(transport.files("h2").is_empty());
    }

    #[tokio::test]
    async fn test_exists_false_when_host_goes_offline() {
        let transport = MemoryTransport::new();
        transport.seed_file("h1", "/data/a.txt", b"a");
        transport.seed_file("h2", "/data/a.txt", b"a");
        let mut coordinator = coordinator(&transport);
        coordinator.start_connection().await.unwrap();

        assert!(coordinator.exists("a.txt").await);
        transport.set_offline("h2", true);
        assert!(!coordinator.exists("a.txt").await);
    }

    #[tokio::test]
    async fn test_remove_fans_out() {
        let transport = MemoryTransport::new();
        transport.seed_file("h1", "/data/img/a.png", b"a");
        transport.seed_file("h2", "/data/img/a.png", b"a");
        let mut coordinator = coordinator(&transport);
        coordinator.start_connection().await.unwrap();

        let report = coordinator.remove("img/a.png").await;
        assert!(report.is_complete());
        assert!(transport.files("h1").is_empty());
        assert!(transport.files("h2").is_empty());
    }

    #[tokio::test]
    async fn test_close_all() {
        let transport = MemoryTransport::new();
        let mut coordinator = coordinator(&transport);
        coordinator.start_connection().await.unwrap();

        assert!(coordinator.close_all().await);
        assert!(coordinator.manager("h1").is_none());
        assert!(coordinator.primary().is_err());
    }
}
