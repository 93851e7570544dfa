// 进程内传输实现
//
// 每个主机一棵独立的 POSIX 文件树，支持故障注入：离线主机、拒绝登录、写入失败、
// SFTP 子系统打开失败、单次 stat 失败和并发创建目录。用于测试和本地开发。

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::debug;

use super::types::{FileEntry, FileType};
use super::{RemoteSession, SftpHandle, Transport};
use crate::ssh::{AuthMethod, SshConfig, SshError};

/// 单个主机的内存状态
#[derive(Debug, Default)]
struct HostState {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, StoredFile>,
    offline: bool,
    reject_auth: bool,
    fail_writes: bool,
    fail_sftp: bool,
    /// 下一次 stat 失败的路径（各失败一次）
    fail_stat_once: BTreeSet<String>,
    /// mkdir 建好目录后仍然报错，模拟另一个客户端抢先创建
    mkdir_races: bool,
    connects: usize,
}

#[derive(Debug, Clone)]
struct StoredFile {
    data: Vec<u8>,
    mtime: u64,
}

impl HostState {
    fn dir_exists(&self, path: &str) -> bool {
        path == "/" || self.dirs.contains(path)
    }
}

#[derive(Debug, Default)]
struct Shared {
    hosts: HashMap<String, HostState>,
}

/// 进程内传输
///
/// 克隆后的实例共享同一份状态，测试可以一边把它交给存储，一边检查远程文件。
#[derive(Clone, Debug, Default)]
pub struct MemoryTransport {
    shared: Arc<Mutex<Shared>>,
}

fn parent_of(path: &str) -> &str {
    match path.trim_end_matches('/').rfind('/') {
        Some(0) | None => "/",
        Some(pos) => &path[..pos],
    }
}

fn name_of(path: &str) -> String {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .to_string()
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl MemoryTransport {
    /// 创建空的传输
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_host<T>(&self, host: &str, f: impl FnOnce(&mut HostState) -> T) -> T {
        let mut shared = self.lock();
        f(shared.hosts.entry(host.to_string()).or_default())
    }

    /// 设置主机是否离线（离线时连接和所有 SFTP 操作都失败）
    pub fn set_offline(&self, host: &str, offline: bool) {
        self.with_host(host, |h| h.offline = offline);
    }

    /// 设置主机是否拒绝登录
    pub fn set_reject_auth(&self, host: &str, reject: bool) {
        self.with_host(host, |h| h.reject_auth = reject);
    }

    /// 设置主机写入是否失败
    pub fn set_fail_writes(&self, host: &str, fail: bool) {
        self.with_host(host, |h| h.fail_writes = fail);
    }

    /// 设置认证成功后打开 SFTP 子系统是否失败
    pub fn set_fail_sftp(&self, host: &str, fail: bool) {
        self.with_host(host, |h| h.fail_sftp = fail);
    }

    /// 让 `path` 的下一次 stat 返回非 NotFound 错误
    pub fn fail_next_stat(&self, host: &str, path: &str) {
        self.with_host(host, |h| {
            h.fail_stat_once.insert(path.to_string());
        });
    }

    /// 设置 mkdir 是否在创建目录后返回错误
    pub fn set_mkdir_races(&self, host: &str, races: bool) {
        self.with_host(host, |h| h.mkdir_races = races);
    }

    /// 预先创建目录（含所有父目录）
    pub fn seed_dir(&self, host: &str, path: &str) {
        self.with_host(host, |h| {
            let mut current = String::new();
            for part in path.split('/').filter(|p| !p.is_empty()) {
                current.push('/');
                current.push_str(part);
                h.dirs.insert(current.clone());
            }
        });
    }

    /// 预先写入文件（自动创建父目录）
    pub fn seed_file(&self, host: &str, path: &str, data: &[u8]) {
        self.seed_dir(host, parent_of(path));
        self.with_host(host, |h| {
            h.files.insert(
                path.to_string(),
                StoredFile {
                    data: data.to_vec(),
                    mtime: now_secs(),
                },
            );
        });
    }

    /// 读取主机上的文件内容
    pub fn file(&self, host: &str, path: &str) -> Option<Vec<u8>> {
        self.with_host(host, |h| h.files.get(path).map(|f| f.data.clone()))
    }

    /// 主机上的全部文件路径
    pub fn files(&self, host: &str) -> Vec<String> {
        self.with_host(host, |h| h.files.keys().cloned().collect())
    }

    /// 目录是否存在
    pub fn has_dir(&self, host: &str, path: &str) -> bool {
        self.with_host(host, |h| h.dir_exists(path))
    }

    /// 主机累计成功建立的会话数
    pub fn connect_count(&self, host: &str) -> usize {
        self.with_host(host, |h| h.connects)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self, config: &SshConfig) -> Result<Box<dyn RemoteSession>, SshError> {
        let host = config.host.clone();
        self.with_host(&host, |h| {
            if h.offline {
                return Err(SshError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    format!("{} is unreachable", host),
                )));
            }
            let empty_credential = match &config.auth {
                AuthMethod::Password(password) => password.is_empty(),
                AuthMethod::PublicKey { key_path, .. } => key_path.as_os_str().is_empty(),
            };
            if h.reject_auth || config.username.is_empty() || empty_credential {
                return Err(SshError::Auth(format!(
                    "Authentication for '{}' rejected",
                    config.username
                )));
            }
            h.connects += 1;
            Ok(())
        })?;

        debug!("[Memory] [{}] Session opened", host);
        Ok(Box::new(MemorySession {
            transport: self.clone(),
            host,
            closed: Arc::new(AtomicBool::new(false)),
        }))
    }
}

struct MemorySession {
    transport: MemoryTransport,
    host: String,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl RemoteSession for MemorySession {
    fn host(&self) -> &str {
        &self.host
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
            || self.transport.with_host(&self.host, |h| h.offline)
    }

    async fn open_sftp(&self) -> Result<Box<dyn SftpHandle>, SshError> {
        if self.is_closed() {
            return Err(SshError::Disconnected(self.host.clone()));
        }
        if self.transport.with_host(&self.host, |h| h.fail_sftp) {
            return Err(SshError::Channel(
                "Failed to request sftp subsystem".to_string(),
            ));
        }
        Ok(Box::new(MemorySftp {
            transport: self.transport.clone(),
            host: self.host.clone(),
            session_closed: self.closed.clone(),
            closed: AtomicBool::new(false),
        }))
    }

    async fn close(&self) -> Result<(), SshError> {
        if self.closed.swap(true, Ordering::Relaxed) {
            return Err(SshError::Disconnected(format!(
                "Session to {} already closed",
                self.host
            )));
        }
        Ok(())
    }
}

struct MemorySftp {
    transport: MemoryTransport,
    host: String,
    session_closed: Arc<AtomicBool>,
    closed: AtomicBool,
}

impl MemorySftp {
    /// 在主机状态上执行一次 SFTP 操作
    fn op<T>(&self, f: impl FnOnce(&mut HostState) -> Result<T, SshError>) -> Result<T, SshError> {
        if self.closed.load(Ordering::Relaxed) || self.session_closed.load(Ordering::Relaxed) {
            return Err(SshError::Disconnected(self.host.clone()));
        }
        self.transport.with_host(&self.host, |h| {
            if h.offline {
                return Err(SshError::Disconnected(format!("{} went offline", self.host)));
            }
            f(h)
        })
    }
}

#[async_trait]
impl SftpHandle for MemorySftp {
    async fn stat(&self, path: &str) -> Result<FileEntry, SshError> {
        self.op(|h| {
            if h.fail_stat_once.remove(path) {
                return Err(SshError::Sftp(format!("stat {}: transient failure", path)));
            }
            if let Some(file) = h.files.get(path) {
                let mut entry = FileEntry::new(name_of(path), path.to_string(), FileType::File);
                entry.size = file.data.len() as u64;
                entry.mtime = Some(file.mtime);
                entry.atime = Some(file.mtime);
                entry.permissions = Some(0o100644);
                Ok(entry)
            } else if h.dir_exists(path) {
                let mut entry =
                    FileEntry::new(name_of(path), path.to_string(), FileType::Directory);
                entry.permissions = Some(0o040755);
                Ok(entry)
            } else {
                Err(SshError::NotFound(path.to_string()))
            }
        })
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<FileEntry>, SshError> {
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        let children = self.op(|h| {
            if !h.dir_exists(path) {
                return Err(SshError::NotFound(path.to_string()));
            }
            let dirs = h
                .dirs
                .iter()
                .filter(|d| parent_of(d) == path && d.as_str() != path)
                .map(|d| (d.clone(), FileType::Directory, 0u64));
            let files = h
                .files
                .iter()
                .filter(|(f, _)| parent_of(f) == path)
                .map(|(f, file)| (f.clone(), FileType::File, file.data.len() as u64));
            Ok(dirs.chain(files).collect::<Vec<_>>())
        })?;

        Ok(children
            .into_iter()
            .map(|(full, file_type, size)| {
                let mut entry = FileEntry::new(name_of(&full), full, file_type);
                entry.size = size;
                entry
            })
            .collect())
    }

    async fn mkdir(&self, path: &str) -> Result<(), SshError> {
        let path = path.trim_end_matches('/');
        self.op(|h| {
            if h.dir_exists(path) || h.files.contains_key(path) {
                return Err(SshError::Sftp(format!("{} already exists", path)));
            }
            if !h.dir_exists(parent_of(path)) {
                return Err(SshError::NotFound(parent_of(path).to_string()));
            }
            h.dirs.insert(path.to_string());
            if h.mkdir_races {
                return Err(SshError::Sftp(format!("mkdir {}: Failure", path)));
            }
            Ok(())
        })
    }

    async fn put(&self, path: &str, data: &[u8]) -> Result<(), SshError> {
        self.op(|h| {
            if h.fail_writes {
                return Err(SshError::Io(std::io::Error::other("simulated write failure")));
            }
            if !h.dir_exists(parent_of(path)) {
                return Err(SshError::NotFound(parent_of(path).to_string()));
            }
            h.files.insert(
                path.to_string(),
                StoredFile {
                    data: data.to_vec(),
                    mtime: now_secs(),
                },
            );
            Ok(())
        })
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, SshError> {
        self.op(|h| {
            h.files
                .get(path)
                .map(|f| f.data.clone())
                .ok_or_else(|| SshError::NotFound(path.to_string()))
        })
    }

    async fn remove(&self, path: &str) -> Result<(), SshError> {
        self.op(|h| {
            h.files
                .remove(path)
                .map(|_| ())
                .ok_or_else(|| SshError::NotFound(path.to_string()))
        })
    }

    async fn close(&self) -> Result<(), SshError> {
        if self.closed.swap(true, Ordering::Relaxed) {
            return Err(SshError::Disconnected(format!(
                "SFTP channel to {} already closed",
                self.host
            )));
        }
        Ok(())
    }
}
