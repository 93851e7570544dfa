// 远程路径工具
// 远程端始终是 POSIX，所有拼接只用 '/'，与本地平台分隔符无关

/// 连接路径
///
/// 与 POSIX `join` 一致：后一段为绝对路径时丢弃前面的部分，空段被忽略。
pub fn join_path(base: &str, name: &str) -> String {
    if name.is_empty() {
        return base.to_string();
    }
    if name.starts_with('/') || base.is_empty() {
        return name.to_string();
    }
    if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}

/// 拆分为 (目录, 文件名)，目录不含末尾的 '/'
pub fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(0) => ("/", &path[1..]),
        Some(pos) => (&path[..pos], &path[pos + 1..]),
        None => ("", path),
    }
}

/// 文件名（最后一段）
pub fn file_name(path: &str) -> &str {
    split_path(path).1
}

/// 拆分扩展名，扩展名包含 '.'
///
/// 只看最后一段；以 '.' 开头的隐藏文件不算扩展名。
pub fn split_ext(path: &str) -> (&str, &str) {
    let name_start = path.rfind('/').map(|p| p + 1).unwrap_or(0);
    let name = &path[name_start..];
    match name.rfind('.') {
        Some(dot) if name[..dot].chars().any(|c| c != '.') => {
            let split = name_start + dot;
            (&path[..split], &path[split..])
        }
        _ => (path, ""),
    }
}

/// 在扩展名前插入序号：`/d/pic.jpg` + 2 → `/d/pic_2.jpg`
pub fn with_suffix(path: &str, counter: u32) -> String {
    let (prefix, ext) = split_ext(path);
    format!("{}_{}{}", prefix, counter, ext)
}

/// 本地文件名，同时接受 '/' 和 '\\' 分隔
pub fn local_file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// 从根开始的各级祖先目录（含自身）：`/a/b` → [`/a`, `/a/b`]
pub fn ancestors(path: &str) -> Vec<String> {
    let absolute = path.starts_with('/');
    let mut current = String::new();
    let mut result = Vec::new();
    for part in path.split('/').filter(|p| !p.is_empty()) {
        if absolute || !current.is_empty() {
            current.push('/');
        }
        current.push_str(part);
        result.push(current.clone());
    }
    result
}
