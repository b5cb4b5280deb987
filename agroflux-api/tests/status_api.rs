#[macro_use]
extern crate time_test;

use rocket::http::Status;
use rocket::local::asynchronous::Client;
use rocket::tokio;
use serde_json::Value;

use agroflux_api::orm::testing::{test_rocket, test_rocket_with};

#[tokio::test]
async fn test_status() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_status");

    let response = client.get("/api/1/status").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["status"], "running");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["built"].is_string());
    assert_eq!(body["model_configured"], false);
    assert_eq!(body["ingest_enabled"], true);
}

#[tokio::test]
async fn test_status_reflects_configuration() {
    let rocket = test_rocket_with(|figment| {
        figment
            .merge(("ingest_api_key", ""))
            .merge(("model.program", "/opt/agroflux/model"))
    });
    let client = Client::tracked(rocket).await.unwrap();
    time_test!("test_status_reflects_configuration");

    let body: Value = client
        .get("/api/1/status")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(body["model_configured"], true);
    assert_eq!(body["ingest_enabled"], false);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_unknown_route_is_json_404");

    let response = client.get("/api/1/nothing-here").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error"], "Not Found");
    assert_eq!(body["path"], "/api/1/nothing-here");
    assert_eq!(body["status"], 404);
}
