use chrono::NaiveDateTime;
use diesel::{AsChangeset, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::users;

/// A row of the users table. Deliberately not `Serialize`: responses go
/// through [`UserProfile`], which has no password hash.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub login_id: String, // Will be unique
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Deserialize, Debug, Clone)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub login_id: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
}

/// Profile fields a user may edit about themselves.
#[derive(AsChangeset, Deserialize, Serialize, Debug, Clone, TS)]
#[diesel(table_name = users, treat_none_as_null = true)]
#[ts(export)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[ts(export)]
pub struct UserProfile {
    pub id: i32,
    pub user_id: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id,
            user_id: user.login_id.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
        }
    }
}
