//! 多主机复制集成测试（内存传输）

use std::sync::Arc;

use sftp_storage::storage::StorageSettings;
use sftp_storage::transport::MemoryTransport;
use sftp_storage::{SshStorage, StorageError};

const HOSTS: &str = r#"{"HOSTNAMES": ["h1", "h2"], "USERNAME": "u", "PASSWORD": "p", "BASEPATH": "/data"}"#;

fn storage(transport: &MemoryTransport) -> SshStorage {
    let raw: StorageSettings = serde_json::from_str(HOSTS).unwrap();
    SshStorage::from_settings(&raw, Arc::new(transport.clone())).unwrap()
}

#[tokio::test]
async fn test_save_replicates_to_every_host() {
    let transport = MemoryTransport::new();
    let mut storage = storage(&transport);

    storage.save("img/logo.png", b"png").await.unwrap();
    for host in ["h1", "h2"] {
        assert_eq!(
            transport.file(host, "/data/img/logo.png"),
            Some(b"png".to_vec()),
            "{}",
            host
        );
    }
    assert!(storage.exists("img/logo.png").await);
}

#[tokio::test]
async fn test_partial_failure_is_tolerated_but_not_reported_as_present() {
    let transport = MemoryTransport::new();
    transport.set_fail_writes("h2", true);
    let mut storage = storage(&transport);

    assert_eq!(storage.save("a.txt", b"a").await.unwrap(), "a.txt");
    assert_eq!(transport.file("h1", "/data/a.txt"), Some(b"a".to_vec()));
    assert!(transport.file("h2", "/data/a.txt").is_none());

    assert!(!storage.exists("a.txt").await);
    assert_eq!(storage.read("a.txt").await.unwrap(), b"a");
}

#[tokio::test]
async fn test_failure_on_first_host_does_not_stop_the_rest() {
    let transport = MemoryTransport::new();
    transport.set_fail_writes("h1", true);
    let mut storage = storage(&transport);

    storage.save("a.txt", b"a").await.unwrap();
    assert_eq!(transport.file("h2", "/data/a.txt"), Some(b"a".to_vec()));
}

#[tokio::test]
async fn test_every_host_failing_is_an_error() {
    let transport = MemoryTransport::new();
    transport.set_fail_writes("h1", true);
    transport.set_fail_writes("h2", true);
    let mut storage = storage(&transport);

    let err = storage.save("a.txt", b"a").await.unwrap_err();
    assert!(matches!(err, StorageError::Transfer(_)));
}

#[tokio::test]
async fn test_unreachable_host_fails_the_sweep() {
    let transport = MemoryTransport::new();
    transport.set_offline("h2", true);
    let mut storage = storage(&transport);

    assert!(matches!(
        storage.save("a.txt", b"a").await,
        Err(StorageError::Connection(_))
    ));
    assert!(!storage.exists("a.txt").await);
}

#[tokio::test]
async fn test_exists_requires_every_host() {
    let transport = MemoryTransport::new();
    transport.seed_file("h1", "/data/only-h1.txt", b"x");
    transport.seed_file("h1", "/data/both.txt", b"x");
    transport.seed_file("h2", "/data/both.txt", b"x");
    let mut storage = storage(&transport);

    assert!(storage.exists("both.txt").await);
    assert!(!storage.exists("only-h1.txt").await);

    transport.set_offline("h2", true);
    assert!(!storage.exists("both.txt").await);
}

#[tokio::test]
async fn test_delete_removes_from_every_host() {
    let transport = MemoryTransport::new();
    let mut storage = storage(&transport);
    storage.save("docs/a.txt", b"a").await.unwrap();

    assert!(storage.delete("docs/a.txt").await.unwrap());
    assert!(transport.files("h1").is_empty());
    assert!(transport.files("h2").is_empty());
    assert!(!storage.delete("docs/a.txt").await.unwrap());
}

#[tokio::test]
async fn test_reads_use_first_host() {
    let transport = MemoryTransport::new();
    transport.seed_file("h1", "/data/a.txt", b"from h1");
    transport.seed_file("h2", "/data/a.txt", b"from h2!");
    transport.seed_file("h2", "/data/extra.txt", b"x");
    let mut storage = storage(&transport);

    assert_eq!(storage.read("a.txt").await.unwrap(), b"from h1");
    assert_eq!(storage.size("a.txt").await.unwrap(), Some(7));
    let (_, files) = storage.listdir("").await.unwrap();
    assert_eq!(files, vec!["a.txt"]);
}

#[tokio::test]
async fn test_disconnect_reconnects_every_host_on_next_use() {
    let transport = MemoryTransport::new();
    let mut storage = storage(&transport);
    storage.save("a.txt", b"a").await.unwrap();

    assert!(storage.disconnect().await);
    storage.save("b.txt", b"b").await.unwrap();

    assert_eq!(transport.connect_count("h1"), 2);
    assert_eq!(transport.connect_count("h2"), 2);
}
