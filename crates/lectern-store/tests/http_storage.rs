//! Upload contract of `HttpObjectStorage` against a mock bucket.

use lectern_core::{AudioStoragePort, StorageError};
use lectern_store::{HttpObjectStorage, HttpStorageConfig};
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_put_with_bearer_and_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/bucket/block-1/0.mp3"))
        .and(header("authorization", "Bearer secret"))
        .and(header("content-type", "audio/mpeg"))
        .and(body_bytes(b"ID3audio".to_vec()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = HttpStorageConfig::new(format!("{}/bucket", server.uri()))
        .with_public_base("https://cdn.example.org/audio")
        .with_token("secret");
    let storage = HttpObjectStorage::new(config).unwrap();

    let url = storage
        .upload("block-1/0.mp3", b"ID3audio", "audio/mpeg")
        .await
        .unwrap();
    assert_eq!(url, "https://cdn.example.org/audio/block-1/0.mp3");
}

#[tokio::test]
async fn test_non_success_status_is_upload_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403).set_body_string("access denied"))
        .mount(&server)
        .await;

    let storage = HttpObjectStorage::new(HttpStorageConfig::new(server.uri())).unwrap();
    let err = storage
        .upload("block-1/0.mp3", b"x", "audio/mpeg")
        .await
        .unwrap_err();

    let StorageError::Upload(message) = err else {
        panic!("expected an upload error, got {err:?}");
    };
    assert!(message.contains("403"));
    assert!(message.contains("access denied"));
}

#[tokio::test]
async fn test_no_authorization_header_without_token() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(header("authorization", "Bearer anything"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let storage = HttpObjectStorage::new(HttpStorageConfig::new(server.uri())).unwrap();
    let url = storage.upload("k.wav", b"x", "audio/wav").await.unwrap();
    assert_eq!(url, format!("{}/k.wav", server.uri()));
}
