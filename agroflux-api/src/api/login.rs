//! Login, logout and session check endpoints.

use rocket::http::{Cookie, CookieJar};
use rocket::response::status;
use rocket::serde::json::{Json, Value, json};
use rocket::Route;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::DbConn;
use crate::logged_json::LoggedJson;
use crate::models::UserProfile;
use crate::orm::login::{SESSION_COOKIE, process_login};
use crate::orm::logout::revoke_session;
use crate::session_guards::AuthenticatedUser;

/// Missing fields read as empty strings so they are reported as missing
/// credentials rather than as an unparsable body.
#[derive(Deserialize, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, TS)]
#[ts(export)]
pub struct LoginSuccessResponse {
    pub success: bool,
    pub user: UserProfile,
}

#[derive(Serialize, Deserialize, Debug, TS)]
#[ts(export)]
pub struct LoginFailureResponse {
    pub success: bool,
    pub message: String,
}

/// - **URL:** `/api/1/login`
/// - **Method:** `POST`
/// - **Authentication:** None required
///
/// Request: `{"userId": "lgarcia", "password": "..."}`
///
/// On success returns `{"success": true, "user": {...}}` and sets the
/// HTTP-only `session` cookie. Failures return `{"success": false,
/// "message": ...}` with 400 (missing credentials) or 401 (unknown user,
/// wrong password).
#[post("/1/login", data = "<login>")]
pub async fn login(
    db: DbConn,
    cookies: &CookieJar<'_>,
    login: LoggedJson<LoginRequest>,
) -> Result<Json<LoginSuccessResponse>, status::Custom<Json<LoginFailureResponse>>> {
    match process_login(&db, cookies, &login.user_id, &login.password).await {
        Ok(user) => {
            info!("[auth] '{}' logged in", user.login_id);
            Ok(Json(LoginSuccessResponse {
                success: true,
                user: UserProfile::from(&user),
            }))
        }
        Err(e) => {
            warn!("[auth] Login refused for '{}': {}", login.user_id.trim(), e.message());
            Err(status::Custom(
                e.status(),
                Json(LoginFailureResponse {
                    success: false,
                    message: e.message().to_string(),
                }),
            ))
        }
    }
}

/// - **URL:** `/api/1/logout`
/// - **Method:** `POST`
///
/// Revokes the current session, if any, and removes the cookie. Always
/// succeeds.
#[post("/1/logout")]
pub async fn logout(db: DbConn, cookies: &CookieJar<'_>) -> Json<Value> {
    let session_id = cookies.get(SESSION_COOKIE).map(|c| c.value().to_string());

    if let Some(session_id) = session_id {
        if let Err(e) = revoke_session(&db, &session_id).await {
            error!("[auth] Failed to revoke session: {:?}", e);
        }
        cookies.remove(Cookie::from(SESSION_COOKIE));
    }

    Json(json!({
        "success": true,
        "message": "Logout successful"
    }))
}

/// Returns the logged-in user, or 401. Lets the frontend check its session.
#[get("/1/hello")]
pub fn hello(auth_user: AuthenticatedUser) -> Json<UserProfile> {
    Json(UserProfile::from(&auth_user.user))
}

pub fn routes() -> Vec<Route> {
    routes![login, logout, hello]
}
