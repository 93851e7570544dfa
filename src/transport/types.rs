// 远程文件基础数据类型

/// 文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    /// 普通文件
    #[default]
    File,
    /// 目录
    Directory,
    /// 符号链接
    Symlink,
}

/// 文件条目（stat / listdir 的结果）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// 文件名
    pub name: String,
    /// 完整路径
    pub path: String,
    /// 文件类型
    pub file_type: FileType,
    /// 文件大小（字节）
    pub size: u64,
    /// 修改时间（Unix 秒）
    pub mtime: Option<u64>,
    /// 访问时间（Unix 秒）
    pub atime: Option<u64>,
    /// Unix 权限（如 0o755）
    pub permissions: Option<u32>,
}

impl FileEntry {
    /// 创建新的文件条目
    pub fn new(name: String, path: String, file_type: FileType) -> Self {
        Self {
            name,
            path,
            file_type,
            size: 0,
            mtime: None,
            atime: None,
            permissions: None,
        }
    }

    /// 是否是目录
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    /// 是否是文件
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }
}
