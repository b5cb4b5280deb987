#[macro_use]
extern crate time_test;

use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use rocket::tokio;
use serde_json::{Value, json};

use agroflux_api::orm::testing::{TEST_INGEST_KEY, test_rocket, test_rocket_with};

async fn ingest(client: &Client, reading: Value) {
    let response = client
        .post("/api/1/readings")
        .header(Header::new("Authorization", format!("Bearer {}", TEST_INGEST_KEY)))
        .json(&reading)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
}

async fn dashboard(client: &Client, uri: &str) -> Value {
    let response = client.get(uri.to_string()).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    response.into_json().await.unwrap()
}

#[tokio::test]
async fn test_dashboard_without_data() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_dashboard_without_data");

    let body = dashboard(&client, "/api/1/dashboard").await;
    assert!(body["crop"].is_null());
    assert!(body["latest"]["temperature"].is_null());
    assert_eq!(body["evaluation"]["overall"], "no_data");
    assert_eq!(body["status_label"], "No data");
    assert_eq!(body["status_summary"], "Waiting for data");
    assert!(body["last_update"].is_null());

    let sensors = body["evaluation"]["sensors"].as_array().unwrap();
    assert_eq!(sensors.len(), 3);
    assert!(sensors.iter().all(|s| s["status"].is_null()));
}

#[tokio::test]
async fn test_dashboard_uses_crop_bands() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_dashboard_uses_crop_bands");

    ingest(&client, json!({ "temperature": 25.0, "humidity": 65.0, "light": 800.0 })).await;

    let body = dashboard(&client, "/api/1/dashboard?crop=tomato").await;
    assert_eq!(body["crop"], "tomato");
    assert_eq!(body["ranges"]["temperature"]["min"], 20.0);
    assert_eq!(body["ranges"]["light"]["max"], 1000.0);
    assert_eq!(body["evaluation"]["overall"], "optimal");
    assert_eq!(body["status_label"], "Optimal");
    assert!(body["evaluation"]["issues"].as_array().unwrap().is_empty());
    assert!(body["last_update"].is_string());

    // lettuce wants less light: 800 is beyond 600 + 10% of its band
    let body = dashboard(&client, "/api/1/dashboard?crop=lettuce").await;
    assert_eq!(body["evaluation"]["overall"], "critical");
    assert_eq!(body["status_summary"], "Check sensors");
    assert_eq!(body["evaluation"]["issues"].as_array().unwrap().len(), 1);

    // no bands of its own: the configured defaults apply
    let body = dashboard(&client, "/api/1/dashboard?crop=strawberry").await;
    assert!(body["crop"].is_null());
    assert_eq!(body["ranges"]["temperature"]["min"], 18.0);
}

#[tokio::test]
async fn test_dashboard_warns_within_margin() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_dashboard_warns_within_margin");

    ingest(&client, json!({ "temperature": 31.0, "humidity": 65.0, "light": 800.0 })).await;

    let body = dashboard(&client, "/api/1/dashboard").await;
    assert_eq!(body["evaluation"]["overall"], "warning");
    assert_eq!(body["status_label"], "Warning");
    assert_eq!(body["evaluation"]["sensors"][0]["kind"], "temperature");
    assert_eq!(body["evaluation"]["sensors"][0]["status"], "warn");
}

#[tokio::test]
async fn test_configured_default_thresholds() {
    let rocket = test_rocket_with(|figment| {
        figment
            .merge(("thresholds.temperature.min", 10.0))
            .merge(("thresholds.temperature.max", 40.0))
    });
    let client = Client::tracked(rocket).await.unwrap();
    time_test!("test_configured_default_thresholds");

    ingest(&client, json!({ "temperature": 35.0 })).await;

    let body = dashboard(&client, "/api/1/dashboard").await;
    assert_eq!(body["ranges"]["temperature"]["max"], 40.0);
    assert_eq!(body["evaluation"]["sensors"][0]["status"], "ok");
}

#[tokio::test]
async fn test_dashboard_export() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_dashboard_export");

    ingest(&client, json!({ "temperature": 24.5, "humidity": 65.0 })).await;

    let response = client.get("/api/1/dashboard/export").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::CSV));

    let csv = response.into_string().await.unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Sensor,Value,Unit,Status,Optimal Range");
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[1], "Temperature,24.5,°C,ok,18-30");
    assert_eq!(lines[3], "Light,,μmol/m²/s,no data,400-1200");
}
