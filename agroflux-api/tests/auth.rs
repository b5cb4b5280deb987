//! Login, logout and session checks.

#[macro_use]
extern crate time_test;

use rocket::http::Status;
use rocket::local::asynchronous::Client;
use rocket::tokio;
use serde_json::json;

use agroflux_api::orm::testing::{TEST_USER, test_rocket};

/// Logs in and returns the session cookie, or the failure status.
async fn login_user(
    client: &Client,
    login_id: &str,
    password: &str,
) -> Result<rocket::http::Cookie<'static>, Status> {
    let response = client
        .post("/api/1/login")
        .json(&json!({ "userId": login_id, "password": password }))
        .dispatch()
        .await;

    if response.status() == Status::Ok {
        let session_cookie = response
            .cookies()
            .get("session")
            .expect("Session cookie should be set")
            .clone()
            .into_owned();
        Ok(session_cookie)
    } else {
        Err(response.status())
    }
}

#[tokio::test]
async fn test_login_success() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_login_success");

    let response = client
        .post("/api/1/login")
        .json(&json!({ "userId": TEST_USER.0, "password": TEST_USER.1 }))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    assert!(response.cookies().get("session").is_some());

    let body: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["user_id"], "lgarcia");
    assert_eq!(body["user"]["full_name"], "Lucia Garcia");
    assert_eq!(body["user"]["email"], "lucia@example.com");
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_login_failures() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_login_failures");

    let cases = [
        (json!({ "userId": "lgarcia", "password": "wrong" }), Status::Unauthorized, "Incorrect password"),
        (json!({ "userId": "nobody", "password": "x" }), Status::Unauthorized, "User not found"),
        (json!({ "userId": "  ", "password": "x" }), Status::BadRequest, "Missing credentials"),
        (json!({}), Status::BadRequest, "Missing credentials"),
    ];
    for (request, status, message) in cases {
        let response = client.post("/api/1/login").json(&request).dispatch().await;
        assert_eq!(response.status(), status, "request {}", request);
        assert!(response.cookies().get("session").is_none());

        let body: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], message);
    }
}

#[tokio::test]
async fn test_default_admin_exists() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_default_admin_exists");

    assert!(login_user(&client, "admin", "admin").await.is_ok());
}

#[tokio::test]
async fn test_hello_requires_session() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_hello_requires_session");

    let response = client.get("/api/1/hello").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
    let body: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_complete_auth_flow() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_complete_auth_flow");

    let cookie = login_user(&client, TEST_USER.0, TEST_USER.1).await.unwrap();

    let response = client.get("/api/1/hello").cookie(cookie.clone()).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(body["user_id"], "lgarcia");

    let response = client.post("/api/1/logout").cookie(cookie.clone()).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(body["success"], true);

    // the revoked session no longer works, even if the client keeps the cookie
    let response = client.get("/api/1/hello").cookie(cookie).dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
}

#[tokio::test]
async fn test_logout_without_session_succeeds() {
    let client = Client::tracked(test_rocket()).await.unwrap();
    time_test!("test_logout_without_session_succeeds");

    let response = client.post("/api/1/logout").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
}
