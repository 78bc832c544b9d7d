//! End-to-end download scenarios against a local single-shot HTTP server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use uuid::Uuid;

use screentalk_core::assets::{
    AssetDescriptor, AssetKind, AssetStore, DownloadError, DownloadManager, DownloadState,
};

fn scratch_root() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("screentalk-dl-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Serve one request with the given body, split into two halves with a pause
/// in between so progress is observable mid-transfer.
async fn serve_once(body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        // Drain the request head.
        let mut buf = vec![0u8; 4096];
        loop {
            let read = socket.read(&mut buf).await.unwrap();
            if read == 0 || buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();

        let half = body.len() / 2;
        socket.write_all(&body[..half]).await.unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        socket.write_all(&body[half..]).await.unwrap();
        socket.flush().await.unwrap();
    });

    format!("http://{addr}/models/default.gguf")
}

fn descriptor(url: String, sha256: String, size: u64) -> AssetDescriptor {
    AssetDescriptor {
        id: "default".into(),
        display_name: "Default model".into(),
        source_url: url,
        sha256,
        size_bytes: size,
        kind: AssetKind::LlmModel,
    }
}

#[tokio::test]
async fn download_reports_progress_and_installs_on_checksum_match() {
    let body = vec![0xABu8; 1000];
    let digest = format!("{:x}", Sha256::digest(&body));
    let url = serve_once(body).await;

    let root = scratch_root();
    let store = Arc::new(AssetStore::new(&root));
    let manager = DownloadManager::new(Arc::clone(&store));

    let handle = manager.enqueue(descriptor(url, digest, 1000));
    let mut progress_rx = handle.subscribe();
    let progress_watcher = tokio::spawn(async move {
        let mut seen = Vec::new();
        loop {
            let status = progress_rx.borrow_and_update().clone();
            if let Some(percent) = status.progress_percent {
                seen.push(percent);
            }
            if status.state.is_terminal() {
                return seen;
            }
            if progress_rx.changed().await.is_err() {
                return seen;
            }
        }
    });

    let final_status = handle.wait().await;
    assert_eq!(final_status.state, DownloadState::Installed);
    assert_eq!(final_status.progress_percent, Some(100));
    assert_eq!(final_status.total_bytes, Some(1000));

    // The server pauses after 500 of 1000 bytes, so 50% must be observed.
    let seen = progress_watcher.await.unwrap();
    assert!(seen.contains(&50), "expected 50% in progress stream: {seen:?}");

    let dest = root.join("models").join("default").join("default.gguf");
    assert_eq!(std::fs::metadata(&dest).unwrap().len(), 1000);
    assert!(!dest.with_extension("part").exists());
}

#[tokio::test]
async fn checksum_mismatch_fails_and_installs_nothing() {
    let body = vec![0xCDu8; 600];
    let url = serve_once(body).await;

    let root = scratch_root();
    let store = Arc::new(AssetStore::new(&root));
    let manager = DownloadManager::new(store);

    let handle = manager.enqueue(descriptor(url, "0".repeat(64), 600));
    let final_status = handle.wait().await;

    match final_status.state {
        DownloadState::Failed(DownloadError::ChecksumMismatch { .. }) => {}
        other => panic!("expected checksum mismatch, got {other:?}"),
    }

    let dest = root.join("models").join("default").join("default.gguf");
    assert!(!dest.exists(), "corrupt payload must never be installed");
    assert!(!dest.with_extension("part").exists(), "partial file must be deleted");
}

#[tokio::test]
async fn unreachable_server_fails_the_task() {
    // Bind then drop so the port is very likely closed.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let root = scratch_root();
    let manager = DownloadManager::new(Arc::new(AssetStore::new(&root)));
    let handle = manager.enqueue(descriptor(
        format!("http://{addr}/gone.gguf"),
        "0".repeat(64),
        10,
    ));
    let final_status = handle.wait().await;
    assert!(matches!(
        final_status.state,
        DownloadState::Failed(DownloadError::Transfer(_))
    ));
}

#[tokio::test]
async fn enqueue_is_idempotent_while_in_flight_and_replaces_after_failure() {
    let root = scratch_root();
    let manager = DownloadManager::new(Arc::new(AssetStore::new(&root)));

    // Point at a never-accepting listener so the task stays Pending/InProgress
    // long enough to observe idempotency.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let first = manager.enqueue(descriptor(
        format!("http://{addr}/slow.gguf"),
        "0".repeat(64),
        10,
    ));
    let second = manager.enqueue(descriptor(
        format!("http://{addr}/slow.gguf"),
        "0".repeat(64),
        10,
    ));
    assert_eq!(first.task_id, second.task_id, "in-flight enqueue must join");

    drop(listener);
    let failed = first.wait().await;
    assert!(matches!(failed.state, DownloadState::Failed(_)));

    let retry = manager.enqueue(descriptor(
        format!("http://{addr}/slow.gguf"),
        "0".repeat(64),
        10,
    ));
    assert_ne!(first.task_id, retry.task_id, "retry must be a fresh task");
}
