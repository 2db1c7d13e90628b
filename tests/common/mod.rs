//! Shared test infrastructure for integration tests.
//!
//! Spawns the real gateway binary against a temporary backing-store root
//! and exposes a thin HTTP client helper for exercising it with `reqwest`.

#![allow(dead_code)]

use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

static PORT_COUNTER: AtomicU16 = AtomicU16::new(19100);

/// Test server wrapper that spawns a real `manta_s3_gateway` process.
pub struct TestServer {
    process: Child,
    port: u16,
    data_dir: TempDir,
}

impl TestServer {
    /// Start a gateway against a fresh temporary directory.
    pub async fn start() -> Self {
        let port = PORT_COUNTER.fetch_add(1, Ordering::SeqCst);
        let data_dir = TempDir::new().expect("failed to create temp dir");

        let process = Command::new(env!("CARGO_BIN_EXE_manta_s3_gateway"))
            .env("GATEWAY_BUCKET_PATH", data_dir.path())
            .env("GATEWAY_SERVER_PORT", port.to_string())
            .env("RUST_LOG", "manta_s3_gateway=warn")
            .spawn()
            .expect("failed to start gateway");

        let mut server = Self {
            process,
            port,
            data_dir,
        };
        server.wait_ready().await;
        server
    }

    /// Start a gateway with a configured default durability level, to
    /// exercise the storage-class/durability mapping.
    pub async fn start_with_durability(default_durability: i64) -> Self {
        let port = PORT_COUNTER.fetch_add(1, Ordering::SeqCst);
        let data_dir = TempDir::new().expect("failed to create temp dir");

        let process = Command::new(env!("CARGO_BIN_EXE_manta_s3_gateway"))
            .env("GATEWAY_BUCKET_PATH", data_dir.path())
            .env("GATEWAY_SERVER_PORT", port.to_string())
            .env("GATEWAY_DEFAULT_DURABILITY", default_durability.to_string())
            .env("RUST_LOG", "manta_s3_gateway=warn")
            .spawn()
            .expect("failed to start gateway");

        let mut server = Self {
            process,
            port,
            data_dir,
        };
        server.wait_ready().await;
        server
    }

    async fn wait_ready(&mut self) {
        let addr = format!("127.0.0.1:{}", self.port);
        for _ in 0..150 {
            if std::net::TcpStream::connect(&addr).is_ok() {
                sleep(Duration::from_millis(50)).await;
                return;
            }

            if let Ok(Some(status)) = self.process.try_wait() {
                panic!("gateway exited before becoming ready: {}", status);
            }

            sleep(Duration::from_millis(100)).await;
        }

        let _ = self.process.kill();
        panic!("timed out waiting for gateway on {}", addr);
    }

    /// Base HTTP endpoint for this gateway instance.
    pub fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn pid(&self) -> u32 {
        self.process.id()
    }

    /// The backing-store root this instance was started against, for tests
    /// that assert on the on-disk directory shape directly.
    pub fn data_dir(&self) -> &std::path::Path {
        self.data_dir.path()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.process.kill();
    }
}

/// Generate deterministic binary data for upload/download round-trip tests.
pub fn generate_binary(size: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_add(0x9e3779b97f4a7c15);
    let mut data = vec![0u8; size];
    for byte in data.iter_mut() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        *byte = (state & 0xff) as u8;
    }
    data
}

/// Create a bucket via PUT and return its URL prefix (`{endpoint}/{bucket}`).
pub async fn create_bucket(client: &reqwest::Client, endpoint: &str, bucket: &str) -> String {
    let url = format!("{}/{}", endpoint, bucket);
    let resp = client.put(&url).send().await.expect("put bucket");
    assert!(
        resp.status().is_success(),
        "failed to create bucket {}: {}",
        bucket,
        resp.status()
    );
    url
}

/// PUT an object and return the response (caller inspects status/ETag).
pub async fn put_object(
    client: &reqwest::Client,
    endpoint: &str,
    bucket: &str,
    key: &str,
    body: Vec<u8>,
) -> reqwest::Response {
    let url = format!("{}/{}/{}", endpoint, bucket, key);
    client.put(&url).body(body).send().await.expect("put object")
}

/// GET an object's body bytes, panicking on a non-2xx status.
pub async fn get_bytes(client: &reqwest::Client, endpoint: &str, bucket: &str, key: &str) -> Vec<u8> {
    let url = format!("{}/{}/{}", endpoint, bucket, key);
    let resp = client.get(&url).send().await.expect("get object");
    assert!(resp.status().is_success(), "get {key} failed: {}", resp.status());
    resp.bytes().await.expect("read body").to_vec()
}
