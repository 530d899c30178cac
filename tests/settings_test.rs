//! Integration tests for the settings routes.

mod common;

use common::TestHarness;
use serde_json::{json, Value};

#[tokio::test]
async fn test_settings_are_seeded_from_config() {
    let (h, addr) = TestHarness::with_server().await;

    let body: Value = reqwest::get(format!("http://{addr}/api/settings/root_directory"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["root_directory"], h.root.to_string_lossy().as_ref());

    let body: Value = reqwest::get(format!("http://{addr}/api/settings/short_video_duration"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["minutes"], 5.0);

    let all: Value = reqwest::get(format!("http://{addr}/api/settings"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_set_root_directory() {
    let (h, addr) = TestHarness::with_server().await;
    let other = h.root.join("elsewhere");
    std::fs::create_dir_all(&other).unwrap();
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/settings/root_directory");

    let resp = client
        .post(&url)
        .json(&json!({ "directory_path": other.to_string_lossy() }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        h.ctx.library_settings().unwrap().root_directory,
        Some(other.clone())
    );

    let resp = client
        .post(&url)
        .json(&json!({ "directory_path": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(&url)
        .json(&json!({ "directory_path": h.root.join("missing").to_string_lossy() }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(h.ctx.library_settings().unwrap().root_directory, Some(other));
}

#[tokio::test]
async fn test_short_video_duration_changes_filter() {
    let (h, addr) = TestHarness::with_server().await;
    h.add_video("ten_minutes.mp4", b"x", 600.0);
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/settings/short_video_duration");

    let short: Value = reqwest::get(format!("http://{addr}/api/videos/list?duration=short"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(short["total"], 0);

    let resp = client
        .post(&url)
        .json(&json!({ "minutes": 15.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let short: Value = reqwest::get(format!("http://{addr}/api/videos/list?duration=short"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(short["total"], 1);

    for bad in [json!({ "minutes": 0.0 }), json!({ "minutes": -3.0 })] {
        let resp = client.post(&url).json(&bad).send().await.unwrap();
        assert_eq!(resp.status(), 400);
    }
}

#[tokio::test]
async fn test_health() {
    let (_h, addr) = TestHarness::with_server().await;
    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
}
