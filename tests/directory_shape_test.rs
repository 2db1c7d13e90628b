//! Asserts the on-disk directory shape a PUT to a nested key is supposed to
//! produce: parent directories are created implicitly, the object lands as
//! a plain file, and no sidecar metadata file appears next to it.

mod common;

use common::TestServer;
use walkdir::WalkDir;

#[tokio::test]
async fn put_to_a_nested_key_creates_implicit_parent_directories() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();
    common::create_bucket(&client, &server.endpoint(), "b1").await;

    let url = format!("{}/b1/a/b/c", server.endpoint());
    client.put(&url).body("hello").send().await.unwrap();

    let root = server.data_dir();
    assert!(root.join("b1").is_dir(), "bucket directory must exist");
    assert!(root.join("b1/a").is_dir(), "implicit parent 'a' must exist");
    assert!(root.join("b1/a/b").is_dir(), "implicit parent 'a/b' must exist");
    assert!(root.join("b1/a/b/c").is_file(), "object must land as a plain file");

    let contents = std::fs::read_to_string(root.join("b1/a/b/c")).unwrap();
    assert_eq!(contents, "hello");

    // No separate metadata sidecar file anywhere under the bucket: custom
    // metadata and durability level live in an xattr on the object file.
    let entries: Vec<_> = WalkDir::new(root.join("b1"))
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(entries, vec!["c".to_string()], "only the object file itself, no sidecars");
}

#[tokio::test]
async fn create_bucket_creates_a_top_level_directory() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();
    common::create_bucket(&client, &server.endpoint(), "mybucket").await;

    let root = server.data_dir();
    assert!(root.join("mybucket").is_dir());
}
