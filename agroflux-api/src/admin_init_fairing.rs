use diesel::prelude::*;
use dotenvy::dotenv;
use rocket::fairing::AdHoc;

use crate::models::NewUser;
use crate::orm::DbConn;
use crate::orm::login::hash_password;
use crate::orm::user::{count_users, insert_user};

/// Creates the first account when the user table is empty.
///
/// Login id and password come from `AGROFLUX_DEFAULT_LOGIN` and
/// `AGROFLUX_DEFAULT_PASSWORD` (both default to `admin`).
pub fn admin_init_fairing() -> AdHoc {
    AdHoc::try_on_ignite("Default User Initialization", |rocket| async {
        dotenv().ok();

        let Some(conn) = DbConn::get_one(&rocket).await else {
            error!("[admin-init] ERROR: Could not get DB connection.");
            return Err(rocket);
        };

        let login = default_login();
        let password = default_password();
        match conn.run(move |c| create_default_user_if_needed(c, &login, &password)).await {
            Ok(()) => Ok(rocket),
            Err(e) => {
                error!("[admin-init] FATAL: Default user creation failed: {}", e);
                Err(rocket)
            }
        }
    })
}

fn default_login() -> String {
    std::env::var("AGROFLUX_DEFAULT_LOGIN").unwrap_or_else(|_| "admin".to_string())
}

fn default_password() -> String {
    std::env::var("AGROFLUX_DEFAULT_PASSWORD").unwrap_or_else(|_| "admin".to_string())
}

fn create_default_user_if_needed(
    c: &mut SqliteConnection,
    login: &str,
    password: &str,
) -> Result<(), String> {
    let existing = count_users(c).map_err(|e| e.to_string())?;
    if existing > 0 {
        info!("[admin-init] {} user(s) present, skipping default user", existing);
        return Ok(());
    }

    let password_hash = hash_password(password).map_err(|e| e.to_string())?;
    let user = NewUser {
        login_id: login.to_string(),
        full_name: "Administrator".to_string(),
        email: format!("{}@agroflux.local", login),
        phone: None,
        password_hash,
    };
    insert_user(c, user).map_err(|e| e.to_string())?;
    info!("[admin-init] Created default user: '{}'", login);
    Ok(())
}
