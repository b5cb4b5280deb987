#[macro_use]
extern crate time_test;

use rocket::http::{ContentType, Cookie, Status};
use rocket::local::asynchronous::Client;
use rocket::tokio;
use serde_json::{Value, json};

use agroflux_api::orm::testing::{TEST_USER, test_rocket};

async fn login_user(client: &Client, login_id: &str, password: &str) -> Result<Cookie<'static>, Status> {
    let response = client
        .post("/api/1/login")
        .json(&json!({ "userId": login_id, "password": password }))
        .dispatch()
        .await;
    if response.status() == Status::Ok {
        Ok(response
            .cookies()
            .get("session")
            .expect("Session cookie should be set")
            .clone()
            .into_owned())
    } else {
        Err(response.status())
    }
}

#[tokio::test]
async fn test_profile_requires_session() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_profile_requires_session");

    for uri in ["/api/1/profile", "/api/1/profile/export"] {
        let response = client.get(uri).dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized, "GET {}", uri);
    }
}

#[tokio::test]
async fn test_view_and_edit_profile() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_view_and_edit_profile");
    let cookie = login_user(&client, TEST_USER.0, TEST_USER.1).await.unwrap();

    let response = client.get("/api/1/profile").cookie(cookie.clone()).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["full_name"], "Lucia Garcia");
    assert_eq!(body["phone"], "+34 600 111 222");

    let response = client
        .put("/api/1/profile")
        .cookie(cookie.clone())
        .json(&json!({
            "full_name": "  Lucia Garcia Ruiz ",
            "email": "lucia.ruiz@example.com",
            "phone": "   "
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["full_name"], "Lucia Garcia Ruiz");
    assert_eq!(body["email"], "lucia.ruiz@example.com");
    assert!(body["phone"].is_null());

    let body: Value = client
        .get("/api/1/profile")
        .cookie(cookie)
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(body["full_name"], "Lucia Garcia Ruiz");
}

#[tokio::test]
async fn test_profile_validation() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_profile_validation");
    let cookie = login_user(&client, TEST_USER.0, TEST_USER.1).await.unwrap();

    let cases = [
        (json!({ "full_name": "Lucia", "email": "not-an-email" }), "Invalid email address"),
        (json!({ "full_name": " ", "email": "lucia@example.com" }), "Name is required"),
    ];
    for (request, message) in cases {
        let response = client
            .put("/api/1/profile")
            .cookie(cookie.clone())
            .json(&request)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["error"], message);
    }
}

#[tokio::test]
async fn test_change_password() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_change_password");
    let cookie = login_user(&client, TEST_USER.0, TEST_USER.1).await.unwrap();

    let rejected = [
        (json!({ "current": "", "new": "abcdef", "confirm": "abcdef" }), "Please enter your current password"),
        (json!({ "current": TEST_USER.1, "new": "abc", "confirm": "abc" }), "Password must be at least 6 characters"),
        (json!({ "current": TEST_USER.1, "new": "abcdef", "confirm": "abcdeg" }), "Passwords do not match"),
        (json!({ "current": "wrong", "new": "abcdef", "confirm": "abcdef" }), "Current password is incorrect"),
    ];
    for (request, message) in rejected {
        let response = client
            .post("/api/1/profile/password")
            .cookie(cookie.clone())
            .json(&request)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["error"], message);
    }

    let response = client
        .post("/api/1/profile/password")
        .cookie(cookie)
        .json(&json!({
            "current": TEST_USER.1,
            "new": "Invernadero2025",
            "confirm": "Invernadero2025"
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["strength"]["label"], "strong");

    assert_eq!(
        login_user(&client, TEST_USER.0, TEST_USER.1).await.unwrap_err(),
        Status::Unauthorized
    );
    assert!(login_user(&client, TEST_USER.0, "Invernadero2025").await.is_ok());
}

#[tokio::test]
async fn test_export_profile() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_export_profile");
    let cookie = login_user(&client, TEST_USER.0, TEST_USER.1).await.unwrap();

    let response = client.get("/api/1/profile/export").cookie(cookie).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::JSON));
    let disposition = response
        .headers()
        .get_one("Content-Disposition")
        .unwrap()
        .to_string();
    assert!(disposition.contains("profile_"));
    assert!(disposition.ends_with(".json\""));

    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["profile"]["user_id"], "lgarcia");
    assert_eq!(body["system"], "AgroFlux");
    assert!(body["timestamp"].is_i64());
    assert!(body["export_date"].is_string());
}
