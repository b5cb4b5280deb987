//! Database operations for user logout and session revocation.

use diesel::prelude::*;

use crate::orm::login::DbRunner;
use crate::schema::sessions::dsl::*;

/// Marks a session as revoked. The row is kept so the session history stays
/// intact. Returns the number of rows touched, zero for an unknown token.
pub async fn revoke_session<D: DbRunner>(
    db: &D,
    session_id: &str,
) -> Result<usize, diesel::result::Error> {
    let session_id = session_id.to_string();
    db.run(move |conn| {
        diesel::update(sessions.filter(id.eq(&session_id)))
            .set(revoked.eq(true))
            .execute(conn)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, Session};
    use crate::orm::login::create_and_store_session;
    use crate::orm::testing::{setup_test_db, setup_test_dbconn};
    use crate::orm::user::insert_user;

    #[tokio::test]
    async fn test_revoke_session() {
        let mut conn = setup_test_db();
        let user = insert_user(
            &mut conn,
            NewUser {
                login_id: "revoker".to_string(),
                full_name: "Revoker".to_string(),
                email: "r@example.com".to_string(),
                phone: None,
                password_hash: "x".to_string(),
            },
        )
        .unwrap();
        let db = setup_test_dbconn(&mut conn);

        let token = create_and_store_session(&db, user.id).await.unwrap();
        assert_eq!(revoke_session(&db, &token).await.unwrap(), 1);
        assert_eq!(revoke_session(&db, "no-such-token").await.unwrap(), 0);

        let stored = db
            .run(move |c| sessions.filter(id.eq(&token)).first::<Session>(c))
            .await
            .unwrap();
        assert!(stored.revoked);
    }
}
