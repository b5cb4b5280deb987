//! The logged-in user's own profile: view, edit, password change and export.

use agronomy::account::{PasswordStrength, password_strength, validate_password_change, validate_profile};
use chrono::Utc;
use rocket::Route;
use rocket::http::Status;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::DbConn;
use crate::api::{ApiError, api_error, db_error, validation_error};
use crate::download::{Download, dated_filename};
use crate::logged_json::LoggedJson;
use crate::models::{ProfileUpdate, UserProfile};
use crate::orm::login::{hash_password, verify_password};
use crate::orm::user::{update_password_hash, update_profile};
use crate::session_guards::AuthenticatedUser;

#[derive(Deserialize, Serialize, Debug, TS)]
#[ts(export)]
pub struct PasswordChangeRequest {
    #[serde(default)]
    pub current: String,
    #[serde(default)]
    pub new: String,
    #[serde(default)]
    pub confirm: String,
}

#[derive(Serialize, Debug)]
pub struct PasswordChangeResponse {
    pub success: bool,
    pub message: String,
    pub strength: PasswordStrength,
}

#[derive(Serialize, Debug)]
struct ProfileExport {
    profile: UserProfile,
    export_date: String,
    system: &'static str,
    timestamp: i64,
}

/// - **URL:** `/api/1/profile`
/// - **Method:** `GET`
/// - **Authentication:** Session required
#[get("/1/profile")]
pub fn get_profile(auth_user: AuthenticatedUser) -> Json<UserProfile> {
    Json(UserProfile::from(&auth_user.user))
}

/// - **URL:** `/api/1/profile`
/// - **Method:** `PUT`
/// - **Authentication:** Session required
///
/// Request: `{"full_name": "...", "email": "...", "phone": "..."}`. A blank
/// phone clears it.
#[put("/1/profile", data = "<request>")]
pub async fn put_profile(
    db: DbConn,
    auth_user: AuthenticatedUser,
    request: LoggedJson<ProfileUpdate>,
) -> Result<Json<UserProfile>, ApiError> {
    let request = request.into_inner();
    validate_profile(&request.full_name, &request.email).map_err(validation_error)?;

    let changes = ProfileUpdate {
        full_name: request.full_name.trim().to_string(),
        email: request.email.trim().to_string(),
        phone: request
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
    };
    let user_id = auth_user.user.id;
    let updated = db
        .run(move |conn| update_profile(conn, user_id, &changes))
        .await
        .map_err(|e| db_error("Updating profile", e))?;
    info!("[profile] '{}' updated their profile", updated.login_id);
    Ok(Json(UserProfile::from(&updated)))
}

/// - **URL:** `/api/1/profile/password`
/// - **Method:** `POST`
/// - **Authentication:** Session required
///
/// Request: `{"current": "...", "new": "...", "confirm": "..."}`. Problems
/// are reported one at a time, in form order, with 400.
#[post("/1/profile/password", data = "<request>")]
pub async fn change_password(
    db: DbConn,
    auth_user: AuthenticatedUser,
    request: LoggedJson<PasswordChangeRequest>,
) -> Result<Json<PasswordChangeResponse>, ApiError> {
    validate_password_change(&request.current, &request.new, &request.confirm)
        .map_err(validation_error)?;
    if !verify_password(&request.current, &auth_user.user.password_hash) {
        return Err(api_error(Status::BadRequest, "Current password is incorrect"));
    }

    let new_hash = hash_password(&request.new).map_err(|e| {
        error!("[profile] Password hashing failed: {}", e);
        api_error(Status::InternalServerError, "Could not update password")
    })?;
    let user_id = auth_user.user.id;
    db.run(move |conn| update_password_hash(conn, user_id, &new_hash))
        .await
        .map_err(|e| db_error("Updating password", e))?;

    info!("[profile] '{}' changed their password", auth_user.user.login_id);
    Ok(Json(PasswordChangeResponse {
        success: true,
        message: "Password updated".to_string(),
        strength: password_strength(&request.new),
    }))
}

/// - **URL:** `/api/1/profile/export`
/// - **Method:** `GET`
/// - **Authentication:** Session required
///
/// Downloads `profile_<date>.json` with `{profile, export_date, system,
/// timestamp}`.
#[get("/1/profile/export")]
pub fn export_profile(auth_user: AuthenticatedUser) -> Result<Download, ApiError> {
    let now = Utc::now();
    let export = ProfileExport {
        profile: UserProfile::from(&auth_user.user),
        export_date: now.to_rfc3339(),
        system: "AgroFlux",
        timestamp: now.timestamp_millis(),
    };
    Download::json(dated_filename("profile", now.date_naive(), "json"), &export).map_err(|e| {
        error!("[profile] Export serialization failed: {}", e);
        api_error(Status::InternalServerError, "Could not export profile")
    })
}

pub fn routes() -> Vec<Route> {
    routes![get_profile, put_profile, change_password, export_profile]
}
