use diesel::prelude::*;

use crate::models::{NewUser, ProfileUpdate, User};
use crate::orm::db::last_insert_rowid;

/// Inserts a new user and returns the stored row.
pub fn insert_user(
    conn: &mut SqliteConnection,
    new_user: NewUser,
) -> Result<User, diesel::result::Error> {
    use crate::schema::users::dsl::*;

    diesel::insert_into(users).values(&new_user).execute(conn)?;
    let last_id = last_insert_rowid(conn)?;

    users
        .filter(id.eq(last_id))
        .select(User::as_select())
        .first(conn)
}

/// Returns all users in ascending order by id.
pub fn list_all_users(conn: &mut SqliteConnection) -> Result<Vec<User>, diesel::result::Error> {
    use crate::schema::users::dsl::*;
    users.order(id.asc()).select(User::as_select()).load(conn)
}

pub fn count_users(conn: &mut SqliteConnection) -> Result<i64, diesel::result::Error> {
    use crate::schema::users::dsl::*;
    users.count().get_result(conn)
}

/// Gets a single user by ID.
pub fn get_user(
    conn: &mut SqliteConnection,
    user_id: i32,
) -> Result<Option<User>, diesel::result::Error> {
    use crate::schema::users::dsl::*;
    users
        .filter(id.eq(user_id))
        .select(User::as_select())
        .first(conn)
        .optional()
}

/// Gets a single user by login id (exact match).
pub fn get_user_by_login(
    conn: &mut SqliteConnection,
    user_login: &str,
) -> Result<Option<User>, diesel::result::Error> {
    use crate::schema::users::dsl::*;
    users
        .filter(login_id.eq(user_login))
        .select(User::as_select())
        .first(conn)
        .optional()
}

/// Replaces the editable profile fields of a user.
pub fn update_profile(
    conn: &mut SqliteConnection,
    user_id: i32,
    profile: &ProfileUpdate,
) -> Result<User, diesel::result::Error> {
    use crate::schema::users::dsl::*;

    diesel::update(users.filter(id.eq(user_id)))
        .set(profile)
        .execute(conn)?;
    users
        .filter(id.eq(user_id))
        .select(User::as_select())
        .first(conn)
}

/// Updates individual fields; `None` leaves a field untouched.
pub fn update_user(
    conn: &mut SqliteConnection,
    user_id: i32,
    new_full_name: Option<String>,
    new_email: Option<String>,
    new_phone: Option<String>,
) -> Result<User, diesel::result::Error> {
    use crate::schema::users::dsl::*;

    if let Some(name_val) = new_full_name {
        diesel::update(users.filter(id.eq(user_id)))
            .set(full_name.eq(name_val))
            .execute(conn)?;
    }

    if let Some(email_val) = new_email {
        diesel::update(users.filter(id.eq(user_id)))
            .set(email.eq(email_val))
            .execute(conn)?;
    }

    if let Some(phone_val) = new_phone {
        diesel::update(users.filter(id.eq(user_id)))
            .set(phone.eq(Some(phone_val)))
            .execute(conn)?;
    }

    users
        .filter(id.eq(user_id))
        .select(User::as_select())
        .first(conn)
}

pub fn update_password_hash(
    conn: &mut SqliteConnection,
    user_id: i32,
    new_hash: &str,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::users::dsl::*;
    diesel::update(users.filter(id.eq(user_id)))
        .set(password_hash.eq(new_hash))
        .execute(conn)
}

/// Deletes a user by ID. Sessions go with it through the cascade.
pub fn delete_user(conn: &mut SqliteConnection, user_id: i32) -> Result<usize, diesel::result::Error> {
    use crate::schema::users::dsl::*;
    diesel::delete(users.filter(id.eq(user_id))).execute(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::testing::setup_test_db;

    fn sample(login: &str) -> NewUser {
        NewUser {
            login_id: login.to_string(),
            full_name: "Sample Grower".to_string(),
            email: format!("{}@example.com", login),
            phone: Some("555-0101".to_string()),
            password_hash: "hash".to_string(),
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut conn = setup_test_db();
        let created = insert_user(&mut conn, sample("ana")).unwrap();
        assert_eq!(created.login_id, "ana");
        assert_eq!(get_user(&mut conn, created.id).unwrap().unwrap().id, created.id);
        assert!(get_user_by_login(&mut conn, "ana").unwrap().is_some());
        assert!(get_user_by_login(&mut conn, "ANA ").unwrap().is_none());
        assert_eq!(count_users(&mut conn).unwrap(), 1);
    }

    #[test]
    fn test_login_id_is_unique() {
        let mut conn = setup_test_db();
        insert_user(&mut conn, sample("ana")).unwrap();
        assert!(insert_user(&mut conn, sample("ana")).is_err());
    }

    #[test]
    fn test_update_profile_can_clear_phone() {
        let mut conn = setup_test_db();
        let created = insert_user(&mut conn, sample("ana")).unwrap();
        let updated = update_profile(
            &mut conn,
            created.id,
            &ProfileUpdate {
                full_name: "Ana Ruiz".to_string(),
                email: "ana.ruiz@example.com".to_string(),
                phone: None,
            },
        )
        .unwrap();
        assert_eq!(updated.full_name, "Ana Ruiz");
        assert!(updated.phone.is_none());
        assert_eq!(updated.password_hash, "hash");
    }

    #[test]
    fn test_update_user_partial_and_delete() {
        let mut conn = setup_test_db();
        let created = insert_user(&mut conn, sample("ana")).unwrap();
        let updated = update_user(&mut conn, created.id, None, Some("new@example.com".into()), None).unwrap();
        assert_eq!(updated.full_name, "Sample Grower");
        assert_eq!(updated.email, "new@example.com");
        assert_eq!(update_password_hash(&mut conn, created.id, "other").unwrap(), 1);
        assert_eq!(delete_user(&mut conn, created.id).unwrap(), 1);
        assert!(get_user(&mut conn, created.id).unwrap().is_none());
    }
}
