// sftp-storage 命令行入口
//
// 用法: sftp-storage [--static | --media] <command> [args...]
// 配置文件默认位于 <config_dir>/sftp-storage/storage.json，可用 SFTP_STORAGE_CONFIG 覆盖

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, info};

use sftp_storage::storage::{default_settings_path, load_settings};
use sftp_storage::transport::RusshTransport;
use sftp_storage::SshStorage;

const USAGE: &str = "\
Usage: sftp-storage [--static | --media] <command> [args...]

Commands:
  exists <name>           Check whether <name> exists on every host
  ls [path]               List directories and files under [path]
  put <local> [name]      Upload a local file (name defaults to the file name)
  get <name> [local]      Download <name> to [local] or stdout
  rm <name>               Delete <name> from every host
  size <name>             Print the size in bytes
  mtime <name>            Print the modification time
  url <name>              Print the public URL";

/// 存储种类
#[derive(Clone, Copy, Debug, PartialEq)]
enum Flavor {
    Plain,
    Static,
    Media,
}

fn parse_args(args: &[String]) -> (Flavor, &[String]) {
    match args.first().map(String::as_str) {
        Some("--static") => (Flavor::Static, &args[1..]),
        Some("--media") => (Flavor::Media, &args[1..]),
        _ => (Flavor::Plain, args),
    }
}

fn arg<'a>(args: &'a [String], index: usize, what: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Missing argument <{}>\n\n{}", what, USAGE))
}

async fn run(flavor: Flavor, args: &[String]) -> Result<()> {
    let command = arg(args, 0, "command")?;

    let settings_path = default_settings_path()?;
    debug!("[CLI] Loading settings from {}", settings_path.display());
    let settings = load_settings(&settings_path)?;

    let transport = Arc::new(RusshTransport);
    let mut storage = match flavor {
        Flavor::Plain => SshStorage::from_settings(&settings, transport)?,
        Flavor::Static => SshStorage::static_files(&settings, transport)?,
        Flavor::Media => SshStorage::media_files(&settings, transport)?,
    };

    let result = execute(&mut storage, command, args).await;
    storage.disconnect().await;
    result
}

async fn execute(storage: &mut SshStorage, command: &str, args: &[String]) -> Result<()> {
    match command {
        "exists" => {
            let name = arg(args, 1, "name")?;
            println!("{}", storage.exists(name).await);
        }
        "ls" => {
            let path = args.get(1).map(String::as_str).unwrap_or("");
            let (dirs, files) = storage.listdir(path).await?;
            for dir in dirs {
                println!("{}/", dir);
            }
            for file in files {
                println!("{}", file);
            }
        }
        "put" => {
            let local = Path::new(arg(args, 1, "local")?);
            let default_name = local
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .context("Local path has no file name")?;
            let name = args.get(2).cloned().unwrap_or(default_name);
            let saved = storage.save_from(&name, local).await?;
            info!("[CLI] Saved {}", saved);
            println!("{}", storage.url(&saved));
        }
        "get" => {
            let name = arg(args, 1, "name")?;
            let content = storage.read(name).await?;
            match args.get(2) {
                Some(local) => tokio::fs::write(local, &content)
                    .await
                    .with_context(|| format!("Cannot write {}", local))?,
                None => std::io::stdout()
                    .write_all(&content)
                    .context("Cannot write to stdout")?,
            }
        }
        "rm" => {
            let name = arg(args, 1, "name")?;
            if !storage.delete(name).await? {
                bail!("{} could not be deleted", name);
            }
        }
        "size" => {
            let name = arg(args, 1, "name")?;
            let size = storage
                .size(name)
                .await?
                .with_context(|| format!("{} not found", name))?;
            println!("{}", size);
        }
        "mtime" => {
            let name = arg(args, 1, "name")?;
            let modified = storage
                .get_modified_time(name)
                .await?
                .with_context(|| format!("{} not found", name))?;
            println!("{}", modified.to_rfc3339());
        }
        "url" => {
            let name = arg(args, 1, "name")?;
            println!("{}", storage.url(name));
        }
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }
    Ok(())
}

fn main() -> Result<()> {
    // 初始化日志系统
    // 可以通过 RUST_LOG 环境变量控制日志级别，例如：RUST_LOG=debug sftp-storage ls
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args[0] == "-h" || args[0] == "--help" {
        println!("{}", USAGE);
        return Ok(());
    }
    let (flavor, rest) = parse_args(&args);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("sftp-worker")
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(run(flavor, rest))
}
