//! Yield predictions with the heuristic and with a scripted external model.

#[macro_use]
extern crate time_test;

use rocket::http::{ContentType, Cookie, Header, Status};
use rocket::local::asynchronous::Client;
use rocket::tokio;
use serde_json::{Value, json};

use agroflux_api::orm::testing::{TEST_INGEST_KEY, TEST_USER, test_rocket, test_rocket_with};

/// A model that answers every action.
const WORKING_MODEL: &str = r#"
case "$1" in
  predict) echo '{"predicted_yield": 51000, "confidence": 91, "model_version": "rf-2"}' ;;
  health) echo '{"status": "ready", "message": "model loaded"}' ;;
  train) echo '{"trained": true, "samples": 120}' ;;
esac
"#;

/// A model that only understands its own payload keys, `days_planting` and
/// `location`.
const STRICT_MODEL: &str = r#"
case "$2" in
  *'"days_planting":90,"location":"lot-c"'*) echo '{"predicted_yield": 48000, "confidence": 88, "model_version": "rf-3"}' ;;
  *) echo '{"error": "missing days_planting or location"}' ;;
esac
"#;

/// A model that always crashes.
const BROKEN_MODEL: &str = "echo boom >&2; exit 3";

fn with_model(script: &'static str) -> rocket::Rocket<rocket::Build> {
    test_rocket_with(move |figment| {
        figment
            .merge(("model.program", "sh"))
            .merge(("model.args", vec!["-c", script, "model"]))
            .merge(("model.timeout_secs", 10))
    })
}

async fn login(client: &Client) -> Cookie<'static> {
    let response = client
        .post("/api/1/login")
        .json(&json!({ "userId": TEST_USER.0, "password": TEST_USER.1 }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    response
        .cookies()
        .get("session")
        .expect("Session cookie should be set")
        .clone()
        .into_owned()
}

async fn predict(client: &Client, request: Value) -> Value {
    let response = client.post("/api/1/predictions").json(&request).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    response.into_json().await.unwrap()
}

#[tokio::test]
async fn test_heuristic_prediction_with_defaults() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_heuristic_prediction_with_defaults");

    // no readings: 24.5 °C, 65 %, 750 µmol; tomato, vegetative
    let body = predict(&client, json!({})).await;
    assert_eq!(body["source"], "heuristic");
    assert_eq!(body["model_version"], "heuristic-v1.0");
    assert_eq!(body["predicted_yield"], 44629.0);
    assert_eq!(body["confidence"], 85.0);
    assert_eq!(body["feature_importance"]["temperature"], 25.0);

    let history: Value = client
        .get("/api/1/predictions")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    let rows = history["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["crop_type"], "tomato");
    assert_eq!(rows[0]["growth_stage"], "vegetative");
    assert_eq!(rows[0]["days_planting"], 45);
    assert_eq!(rows[0]["location"], "lot-a");
    assert!(rows[0]["reading_id"].is_null());
    assert!(rows[0]["accuracy"].is_null());
}

#[tokio::test]
async fn test_prediction_uses_latest_reading() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_prediction_uses_latest_reading");

    let response = client
        .post("/api/1/readings")
        .header(Header::new("Authorization", format!("Bearer {}", TEST_INGEST_KEY)))
        .json(&json!({ "temperature": 35.0, "humidity": 30.0, "light": 200.0 }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let reading: Value = response.into_json().await.unwrap();

    let body = predict(
        &client,
        json!({ "crop_type": "tomato", "growth_stage": "fruiting", "days_since_planting": 80 }),
    )
    .await;
    // 45000 * 0.8 * 0.9 * 0.85
    assert_eq!(body["predicted_yield"], 27540.0);
    assert_eq!(body["confidence"], 62.0);

    let history: Value = client
        .get("/api/1/predictions?limit=1")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(history["rows"][0]["reading_id"], reading["id"]);
    assert_eq!(history["rows"][0]["temperature"], 35.0);
}

#[tokio::test]
async fn test_prediction_from_mixed_readings_has_no_reading_id() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_prediction_from_mixed_readings_has_no_reading_id");

    for reading in [
        json!({ "temperature": 24.0, "humidity": 60.0, "light": 700.0 }),
        json!({ "humidity": 66.0 }),
    ] {
        let response = client
            .post("/api/1/readings")
            .header(Header::new("Authorization", format!("Bearer {}", TEST_INGEST_KEY)))
            .json(&reading)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
    }

    predict(&client, json!({ "crop_type": "tomato" })).await;

    let history: Value = client
        .get("/api/1/predictions?limit=1")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    let row = &history["rows"][0];
    assert!(row["reading_id"].is_null());
    assert_eq!(row["temperature"], 24.0);
    assert_eq!(row["humidity"], 66.0);
    assert_eq!(row["light"], 700.0);
}

#[tokio::test]
async fn test_record_actual_yield() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_record_actual_yield");

    let created = predict(&client, json!({ "crop_type": "pepper" })).await;
    let id = created["id"].as_i64().unwrap();
    let uri = format!("/api/1/predictions/{}/actual", id);

    let response = client
        .put(uri.clone())
        .json(&json!({ "actual_yield": 30000.0 }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    let cookie = login(&client).await;
    let response = client
        .put(uri.clone())
        .cookie(cookie.clone())
        .json(&json!({ "actual_yield": 0.0 }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    let predicted = created["predicted_yield"].as_f64().unwrap();
    let response = client
        .put(uri)
        .cookie(cookie.clone())
        .json(&json!({ "actual_yield": predicted }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["accuracy"], 100.0);

    let response = client
        .put("/api/1/predictions/999/actual")
        .cookie(cookie)
        .json(&json!({ "actual_yield": 1000.0 }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    let response = client.get("/api/1/predictions/export").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::CSV));
    let csv = response.into_string().await.unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "Date,Crop,Predicted Yield (kg/ha),Actual Yield (kg/ha),Accuracy,Confidence,Status"
    );
    assert_eq!(lines.len(), 2);
    assert!(lines[1].ends_with(",100%,85%,Recorded"));
}

#[tokio::test]
async fn test_model_unavailable() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_model_unavailable");

    let body: Value = client
        .get("/api/1/model/health")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(body["status"], "unavailable");

    let response = client.post("/api/1/model/train").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);

    let cookie = login(&client).await;
    let response = client.post("/api/1/model/train").cookie(cookie).dispatch().await;
    assert_eq!(response.status(), Status::ServiceUnavailable);
}

#[tokio::test]
async fn test_external_model_answers() {
    let client = Client::tracked(with_model(WORKING_MODEL)).await.unwrap();
    time_test!("test_external_model_answers");

    let body = predict(&client, json!({ "crop_type": "lettuce" })).await;
    assert_eq!(body["source"], "model");
    assert_eq!(body["predicted_yield"], 51000.0);
    assert_eq!(body["confidence"], 91.0);
    assert_eq!(body["model_version"], "rf-2");

    let body: Value = client
        .get("/api/1/model/health")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["message"], "model loaded");

    let cookie = login(&client).await;
    let response = client.post("/api/1/model/train").cookie(cookie).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["result"]["samples"], 120);
}

#[tokio::test]
async fn test_broken_model_falls_back() {
    let client = Client::tracked(with_model(BROKEN_MODEL)).await.unwrap();
    time_test!("test_broken_model_falls_back");

    let body = predict(&client, json!({})).await;
    assert_eq!(body["source"], "heuristic");
    assert_eq!(body["predicted_yield"], 44629.0);

    let cookie = login(&client).await;
    let response = client.post("/api/1/model/train").cookie(cookie).dispatch().await;
    assert_eq!(response.status(), Status::BadGateway);
}

#[tokio::test]
async fn test_prediction_field_names() {
    let client = Client::tracked(with_model(STRICT_MODEL)).await.unwrap();
    time_test!("test_prediction_field_names");

    let body = predict(
        &client,
        json!({ "crop_type": "tomato", "days_since_planting": 90, "location_zone": "lot-c" }),
    )
    .await;
    assert_eq!(body["source"], "model");
    assert_eq!(body["model_version"], "rf-3");

    let history: Value = client
        .get("/api/1/predictions?limit=1")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(history["rows"][0]["days_planting"], 90);
    assert_eq!(history["rows"][0]["location"], "lot-c");

    // older clients send the stored names
    let body = predict(&client, json!({ "days_planting": 90, "location": "lot-c" })).await;
    assert_eq!(body["source"], "model");
}
