//! Bucket lifecycle tests: list, create, head, delete.

mod common;

use common::TestServer;

#[tokio::test]
async fn empty_store_lists_no_buckets() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let resp = client.get(server.endpoint()).send().await.unwrap();
    assert!(resp.status().is_success());
    let body = resp.text().await.unwrap();
    assert!(body.contains("<ListAllMyBucketsResult"));
    assert!(!body.contains("<Bucket>"));
}

#[tokio::test]
async fn create_then_list_shows_the_bucket() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    common::create_bucket(&client, &server.endpoint(), "b1").await;

    let resp = client.get(server.endpoint()).send().await.unwrap();
    let body = resp.text().await.unwrap();
    assert!(body.contains("<Name>b1</Name>"), "got: {}", body);
}

#[tokio::test]
async fn head_bucket_reports_existence() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();
    common::create_bucket(&client, &server.endpoint(), "b1").await;

    let resp = client
        .head(format!("{}/b1", server.endpoint()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = client
        .head(format!("{}/nope", server.endpoint()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn delete_empty_bucket_succeeds() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();
    common::create_bucket(&client, &server.endpoint(), "b1").await;

    let resp = client
        .delete(format!("{}/b1", server.endpoint()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    let resp = client
        .head(format!("{}/b1", server.endpoint()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn invalid_bucket_name_is_rejected() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    // Too short (below the 3-char minimum).
    let resp = client
        .put(format!("{}/ab", server.endpoint()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body = resp.text().await.unwrap();
    assert!(body.contains("<Code>InvalidBucketName</Code>"), "got: {}", body);
}
