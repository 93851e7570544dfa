// 远程文件句柄
//
// 内容整体缓存在内存中：第一次读取时才下载，写入只修改缓存，close() 时一次性保存。

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use tracing::debug;

use super::adapter::SshStorage;
use super::error::{StorageError, StorageResult};

/// 绑定到存储的文件句柄
pub struct StorageFile<'a> {
    storage: &'a mut SshStorage,
    name: String,
    mode: String,
    buffer: Cursor<Vec<u8>>,
    loaded: bool,
    dirty: bool,
    size: Option<u64>,
}

impl<'a> StorageFile<'a> {
    pub(crate) fn new(storage: &'a mut SshStorage, name: &str, mode: &str) -> Self {
        Self {
            storage,
            name: name.to_string(),
            mode: mode.to_string(),
            buffer: Cursor::new(Vec::new()),
            loaded: false,
            dirty: false,
            size: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    fn is_writable(&self) -> bool {
        self.mode.contains(['w', 'a', '+'])
    }

    /// 首次访问时填充缓存；`w` 模式截断，不下载
    async fn load(&mut self) -> StorageResult<()> {
        if self.loaded {
            return Ok(());
        }
        let content = if self.mode.contains('w') {
            Vec::new()
        } else {
            match self.storage.read(&self.name).await {
                Ok(content) => content,
                // 追加/读写模式下允许文件尚不存在
                Err(e) if e.is_not_found() && self.is_writable() => Vec::new(),
                Err(e) => return Err(e),
            }
        };
        debug!("[Storage] Loaded {} ({} bytes)", self.name, content.len());
        self.size = Some(content.len() as u64);
        self.buffer = Cursor::new(content);
        self.loaded = true;
        Ok(())
    }

    /// 读取至多 `size` 字节，None 表示读到末尾
    pub async fn read(&mut self, size: Option<usize>) -> StorageResult<Vec<u8>> {
        self.load().await?;
        let mut out = Vec::new();
        let result = match size {
            Some(n) => (&mut self.buffer).take(n as u64).read_to_end(&mut out),
            None => self.buffer.read_to_end(&mut out),
        };
        result.map_err(|e| StorageError::Transfer(e.to_string()))?;
        Ok(out)
    }

    /// 写入缓存，返回写入的字节数
    pub async fn write(&mut self, data: &[u8]) -> StorageResult<usize> {
        if !self.is_writable() {
            return Err(StorageError::Transfer(
                "File was opened for read-only access.".to_string(),
            ));
        }
        self.load().await?;
        if self.mode.contains('a') {
            self.buffer
                .seek(SeekFrom::End(0))
                .map_err(|e| StorageError::Transfer(e.to_string()))?;
        }
        self.buffer
            .write_all(data)
            .map_err(|e| StorageError::Transfer(e.to_string()))?;
        self.size = Some(self.buffer.get_ref().len() as u64);
        self.dirty = true;
        Ok(data.len())
    }

    /// 文件大小，缓存未加载时查询远程（结果会缓存）
    pub async fn size(&mut self) -> StorageResult<Option<u64>> {
        if self.size.is_none() {
            self.size = self.storage.size(&self.name).await?;
        }
        Ok(self.size)
    }

    /// 关闭句柄，有修改时保存
    pub async fn close(mut self) -> StorageResult<()> {
        if self.dirty {
            let content = std::mem::take(self.buffer.get_mut());
            self.storage.save(&self.name, &content).await?;
        }
        Ok(())
    }
}
