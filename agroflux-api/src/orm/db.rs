use diesel::QueryableByName;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use rocket::fairing::AdHoc;
use rocket_sync_db_pools::{database, diesel};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[database("sqlite_db")]
pub struct DbConn(diesel::SqliteConnection);

#[derive(QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = BigInt)]
    last_insert_rowid: i64,
}

/// Returns the rowid of the most recent successful insert on `conn`.
pub(crate) fn last_insert_rowid(conn: &mut SqliteConnection) -> QueryResult<i32> {
    let row = diesel::sql_query("SELECT last_insert_rowid() as last_insert_rowid")
        .get_result::<LastInsertRowId>(conn)?;
    Ok(row.last_insert_rowid as i32)
}

/// Enables foreign key support for SQLite connections.
///
/// Foreign keys are disabled by default in SQLite for backwards
/// compatibility, so every pooled connection needs this once.
pub fn set_foreign_keys(conn: &mut diesel::SqliteConnection) -> QueryResult<()> {
    conn.batch_execute("PRAGMA foreign_keys = ON")
}

/// Creates a Rocket fairing that enables foreign key support for SQLite
/// connections.
pub fn set_foreign_keys_fairing() -> AdHoc {
    AdHoc::try_on_ignite("Set Foreign Keys", |rocket| async {
        let Some(conn) = DbConn::get_one(&rocket).await else {
            error!("[db] Could not get a connection to enable foreign keys");
            return Err(rocket);
        };
        match conn.run(set_foreign_keys).await {
            Ok(()) => Ok(rocket),
            Err(e) => {
                error!("[db] Failed to enable foreign keys: {:?}", e);
                Err(rocket)
            }
        }
    })
}

/// Runs all pending database migrations on the provided connection.
pub fn run_pending_migrations(
    conn: &mut diesel::SqliteConnection,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    for version in applied {
        info!("[db] Applied migration {}", version);
    }
    Ok(())
}

/// Creates a Rocket fairing that runs database migrations on ignition.
pub fn run_migrations_fairing() -> AdHoc {
    AdHoc::try_on_ignite("Diesel Migrations", |rocket| async {
        let Some(conn) = DbConn::get_one(&rocket).await else {
            error!("[db] Could not get a connection for migrations");
            return Err(rocket);
        };
        let result = conn
            .run(|c| run_pending_migrations(c).map_err(|e| e.to_string()))
            .await;
        match result {
            Ok(()) => Ok(rocket),
            Err(e) => {
                error!("[db] Migrations failed: {}", e);
                Err(rocket)
            }
        }
    })
}
