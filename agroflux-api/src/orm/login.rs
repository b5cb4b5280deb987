//! Database operations for user authentication and session management.
//!
//! This module provides database layer functions for user login, session creation,
//! password verification, and session storage. It abstracts database operations
//! to support both production and testing environments.

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use diesel::prelude::*;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use uuid::Uuid;

use crate::DbConn;
use crate::models::{NewSession, User};
use crate::orm::testing::FakeDbConn;
use crate::schema::{sessions, users};

pub const SESSION_COOKIE: &str = "session";

/// Trait for abstracting database operations to support both production and testing.
///
/// This trait allows the same functions to work with both `DbConn` (production)
/// and `FakeDbConn` (testing) by providing a unified interface for database operations.
pub trait DbRunner {
    fn run<F, R>(&self, f: F) -> impl std::future::Future<Output = R>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static;
}

impl DbRunner for DbConn {
    fn run<F, R>(&self, f: F) -> impl std::future::Future<Output = R>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static,
    {
        DbConn::run(self, f)
    }
}

impl<'a> DbRunner for FakeDbConn<'a> {
    fn run<F, R>(&self, f: F) -> impl std::future::Future<Output = R>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static,
    {
        FakeDbConn::run(self, f)
    }
}

/// Why a login attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginError {
    MissingCredentials,
    UnknownUser,
    WrongPassword,
    Database,
}

impl LoginError {
    pub fn status(&self) -> Status {
        match self {
            LoginError::MissingCredentials => Status::BadRequest,
            LoginError::UnknownUser | LoginError::WrongPassword => Status::Unauthorized,
            LoginError::Database => Status::InternalServerError,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            LoginError::MissingCredentials => "Missing credentials",
            LoginError::UnknownUser => "User not found",
            LoginError::WrongPassword => "Incorrect password",
            LoginError::Database => "Database error",
        }
    }
}

fn generate_session_token() -> String {
    Uuid::new_v4().to_string()
}

/// Finds a user by their login id.
pub async fn find_user_by_login<D: DbRunner>(
    db: &D,
    login_id: &str,
) -> Result<Option<User>, Status> {
    let login_id = login_id.trim().to_owned();
    db.run(move |conn| {
        users::table
            .filter(users::login_id.eq(login_id))
            .select(User::as_select())
            .first::<User>(conn)
            .optional()
    })
    .await
    .map_err(|e| {
        error!("Database error finding user: {:?}", e);
        Status::InternalServerError
    })
}

/// Verifies a password against a stored Argon2 PHC string. A malformed
/// stored hash never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(stored_hash) else {
        warn!("Stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Creates a new session row and returns its token.
pub async fn create_and_store_session<D: DbRunner>(db: &D, user_id: i32) -> Result<String, Status> {
    let session_token = generate_session_token();
    let now = Utc::now().naive_utc();

    let new_session = NewSession {
        id: session_token.clone(),
        user_id,
        created_at: now,
        expires_at: None,
        revoked: false,
    };

    db.run(move |conn| {
        diesel::insert_into(sessions::table)
            .values(&new_session)
            .execute(conn)
    })
    .await
    .map_err(|_| Status::InternalServerError)?;

    Ok(session_token)
}

/// Sets the HTTP-only session cookie. The `secure` flag is off in unit tests
/// only, so the local test client can send it back.
fn set_session_cookie(cookies: &CookieJar<'_>, session_token: &str) {
    let secure_flag = !cfg!(test);
    let cookie = Cookie::build((SESSION_COOKIE, session_token.to_string()))
        .http_only(true)
        .secure(secure_flag)
        .same_site(SameSite::Lax)
        .path("/")
        .build();
    cookies.add(cookie);
}

/// Runs the whole login: input check, user lookup, password check, session
/// creation and cookie.
pub async fn process_login<D: DbRunner>(
    db: &D,
    cookies: &CookieJar<'_>,
    login_id: &str,
    password: &str,
) -> Result<User, LoginError> {
    if login_id.trim().is_empty() || password.is_empty() {
        return Err(LoginError::MissingCredentials);
    }

    let user = match find_user_by_login(db, login_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(LoginError::UnknownUser),
        Err(_) => return Err(LoginError::Database),
    };

    if !verify_password(password, &user.password_hash) {
        return Err(LoginError::WrongPassword);
    }

    let session_token = create_and_store_session(db, user.id)
        .await
        .map_err(|_| LoginError::Database)?;
    set_session_cookie(cookies, &session_token);

    Ok(user)
}

/// Hashes a password using Argon2 with a random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}
