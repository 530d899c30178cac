//! Integration tests for range streaming.
//!
//! Each test writes a file under the harness library root, catalogs it, and
//! requests it over HTTP.

mod common;

use common::TestHarness;
use reqwest::header::{ACCEPT_RANGES, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE};

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_stream_range_returns_partial_content() {
    let (h, addr) = TestHarness::with_server().await;
    let data = payload(1000);
    let video = h.add_video("clip.mp4", &data, 10.0);

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("http://{addr}/api/videos/{}/stream", video.id))
        .header(RANGE, "bytes=0-99")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 206);
    assert_eq!(resp.headers()[CONTENT_RANGE], "bytes 0-99/1000");
    assert_eq!(resp.headers()[CONTENT_LENGTH], "100");
    assert_eq!(resp.headers()[ACCEPT_RANGES], "bytes");
    assert_eq!(resp.headers()[CONTENT_TYPE], "video/mp4");
    assert!(resp.headers()[CACHE_CONTROL]
        .to_str()
        .unwrap()
        .starts_with("public, max-age="));

    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], &data[..100]);
}

#[tokio::test]
async fn test_stream_open_ended_and_suffix_ranges() {
    let (h, addr) = TestHarness::with_server().await;
    let data = payload(1000);
    let video = h.add_video("clip.webm", &data, 10.0);
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/videos/{}/stream", video.id);

    let resp = client.get(&url).header(RANGE, "bytes=900-").send().await.unwrap();
    assert_eq!(resp.status(), 206);
    assert_eq!(resp.headers()[CONTENT_RANGE], "bytes 900-999/1000");
    assert_eq!(resp.headers()[CONTENT_TYPE], "video/webm");
    assert_eq!(&resp.bytes().await.unwrap()[..], &data[900..]);

    let resp = client.get(&url).header(RANGE, "bytes=-10").send().await.unwrap();
    assert_eq!(resp.status(), 206);
    assert_eq!(resp.headers()[CONTENT_RANGE], "bytes 990-999/1000");
    assert_eq!(&resp.bytes().await.unwrap()[..], &data[990..]);
}

#[tokio::test]
async fn test_stream_without_range_returns_whole_file() {
    let (h, addr) = TestHarness::with_server().await;
    // Larger than one chunk so the body spans several reads.
    let data = payload(3 * 1024 * 1024 + 17);
    let video = h.add_video("movies/big.mkv", &data, 60.0);

    let resp = reqwest::get(format!("http://{addr}/api/videos/{}/stream", video.id))
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()[CONTENT_LENGTH], data.len().to_string());
    assert_eq!(resp.headers()[CONTENT_TYPE], "video/x-matroska");
    let body = resp.bytes().await.unwrap();
    assert_eq!(body.len(), data.len());
    assert!(body[..] == data[..]);
}

#[tokio::test]
async fn test_stream_unsatisfiable_range() {
    let (h, addr) = TestHarness::with_server().await;
    let video = h.add_video("clip.mp4", &payload(1000), 10.0);

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("http://{addr}/api/videos/{}/stream", video.id))
        .header(RANGE, "bytes=2000-")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 416);
    assert_eq!(resp.headers()[CONTENT_RANGE], "bytes */1000");
}

#[tokio::test]
async fn test_stream_malformed_range_is_rejected() {
    let (h, addr) = TestHarness::with_server().await;
    let video = h.add_video("clip.mp4", &payload(1000), 10.0);

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("http://{addr}/api/videos/{}/stream", video.id))
        .header(RANGE, "bytes=50-10")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 416);
}

#[tokio::test]
async fn test_stream_unknown_video() {
    let (_h, addr) = TestHarness::with_server().await;

    let resp = reqwest::get(format!("http://{addr}/api/videos/999/stream"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_stream_missing_file() {
    let (h, addr) = TestHarness::with_server().await;
    let video = h.add_video("gone.mp4", &payload(10), 1.0);
    std::fs::remove_file(h.root.join("gone.mp4")).unwrap();

    let resp = reqwest::get(format!("http://{addr}/api/videos/{}/stream", video.id))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_stream_empty_file() {
    let (h, addr) = TestHarness::with_server().await;
    let video = h.add_video("empty.mp4", b"", 0.0);

    let resp = reqwest::get(format!("http://{addr}/api/videos/{}/stream", video.id))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()[CONTENT_LENGTH], "0");
    assert!(resp.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_stream_via_router_oneshot() {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    let h = TestHarness::new();
    let data = payload(500);
    let video = h.add_video("one.mov", &data, 5.0);
    let app = vidshelf::server::create_router(h.ctx.clone(), None);

    let resp = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/videos/{}/stream", video.id))
                .header("range", "bytes=100-199")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], &data[100..200]);
}
