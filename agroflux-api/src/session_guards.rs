//! Session-based authentication guard for Rocket routes.
//!
//! ```rust,ignore
//! #[get("/1/profile")]
//! fn profile(user: AuthenticatedUser) -> String {
//!     format!("Hello, {}", user.user.full_name)
//! }
//! ```

use chrono::Utc;
use diesel::prelude::*;
use rocket::http::Status;
use rocket::request::{self, FromRequest, Outcome, Request};

use crate::DbConn;
use crate::models::{Session, User};
use crate::orm::login::SESSION_COOKIE;
use crate::schema::{sessions, users};

/// A request guard for routes that require a logged-in user.
///
/// The guard reads the `session` cookie, looks up a session that is neither
/// revoked nor expired and loads its user.
///
/// - `Outcome::Error(Status::Unauthorized)` if there is no valid session
/// - `Outcome::Error(Status::InternalServerError)` if the pool is unavailable
#[derive(Debug)]
pub struct AuthenticatedUser {
    pub user: User,
    /// Token of the session that authenticated this request.
    pub session_id: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = match request.guard::<DbConn>().await {
            Outcome::Success(db) => db,
            _ => return Outcome::Error((Status::InternalServerError, ())),
        };

        let session_id = match request.cookies().get(SESSION_COOKIE) {
            Some(cookie) => cookie.value().to_string(),
            None => return Outcome::Error((Status::Unauthorized, ())),
        };

        let lookup = session_id.clone();
        let found = db
            .run(move |conn| {
                let session = sessions::table
                    .filter(sessions::id.eq(&lookup))
                    .filter(sessions::revoked.eq(false))
                    .filter(
                        sessions::expires_at
                            .is_null()
                            .or(sessions::expires_at.gt(Utc::now().naive_utc())),
                    )
                    .first::<Session>(conn)
                    .optional()?;
                match session {
                    Some(s) => users::table
                        .filter(users::id.eq(s.user_id))
                        .select(User::as_select())
                        .first::<User>(conn)
                        .optional(),
                    None => Ok(None),
                }
            })
            .await;

        match found {
            Ok(Some(user)) => Outcome::Success(AuthenticatedUser { user, session_id }),
            Ok(None) => Outcome::Error((Status::Unauthorized, ())),
            Err(e) => {
                error!("Database error resolving session: {:?}", e);
                Outcome::Error((Status::Unauthorized, ()))
            }
        }
    }
}
