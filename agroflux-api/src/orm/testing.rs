//! Test support: throwaway databases, a Rocket instance with seeded data and
//! an async wrapper around a plain connection.

use std::cell::RefCell;

use chrono::NaiveDate;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use rocket::figment::{
    Figment,
    util::map,
    value::{Map, Value},
};
use rocket::{Build, Rocket, fairing::AdHoc};
use uuid::Uuid;

use agronomy::sensor::NewSensorSpec;

use super::db::{DbConn, run_pending_migrations, set_foreign_keys};
use crate::admin_init_fairing::admin_init_fairing;
use crate::config::AppConfig;
use crate::models::{NewAlert, NewUser};
use crate::orm::alert::insert_alert;
use crate::orm::login::hash_password;
use crate::orm::sensor::{insert_sensor, record_sensor_value};
use crate::orm::user::insert_user;

/// Ingest key configured on every test instance.
pub const TEST_INGEST_KEY: &str = "test-key";

/// Seeded accounts as `(login, password)`.
pub const TEST_USER: (&str, &str) = ("lgarcia", "cosecha2025");
pub const TEST_OPERATOR: (&str, &str) = ("operator", "operator1");

/// Makes SQLite faster and less durable. Test databases only.
///
/// These are per-connection settings. Changing the journal mode would need
/// an exclusive lock that other pooled connections may already hold.
fn set_sqlite_test_pragmas(conn: &mut SqliteConnection) -> QueryResult<()> {
    conn.batch_execute(
        r#"
        PRAGMA busy_timeout = 5000;
        PRAGMA synchronous = OFF;
        "#,
    )
}

/// Pragmas only speed tests up, so a failure is logged and ignition goes on.
fn set_sqlite_test_pragmas_fairing() -> AdHoc {
    AdHoc::on_ignite("Set SQLite Test Pragmas", |rocket| async {
        let Some(conn) = DbConn::get_one(&rocket).await else {
            warn!("[test-data-init] Could not get a connection for pragmas");
            return rocket;
        };
        if let Err(e) = conn.run(set_sqlite_test_pragmas).await {
            warn!("[test-data-init] Failed to set pragmas: {:?}", e);
        }
        rocket
    })
}

fn test_data_init_fairing() -> AdHoc {
    AdHoc::try_on_ignite("Test Data Initialization", |rocket| async {
        let Some(conn) = DbConn::get_one(&rocket).await else {
            error!("[test-data-init] Could not get a connection for test data");
            return Err(rocket);
        };
        match conn.run(create_test_data).await {
            Ok(()) => {
                info!("[test-data-init] Test data initialization completed");
                Ok(rocket)
            }
            Err(e) => {
                error!("[test-data-init] ERROR: Failed to create test data: {:?}", e);
                Err(rocket)
            }
        }
    })
}

fn test_user(login: &str, name: &str, email: &str, phone: Option<&str>, password: &str) -> NewUser {
    NewUser {
        login_id: login.to_string(),
        full_name: name.to_string(),
        email: email.to_string(),
        phone: phone.map(str::to_string),
        password_hash: hash_password(password).unwrap_or_default(),
    }
}

/// The data every API test can rely on:
///
/// - users `lgarcia` and `operator` (plus the default `admin`)
/// - four sensors: TEMP-001 and TEMP-002 online, HUM-001 warning, LIGHT-001
///   offline
/// - five alerts raised 2025-06-01 to 2025-06-05: two high, two medium, one
///   low; three open, one silenced, one resolved
/// - no readings
pub fn create_test_data(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    insert_user(
        conn,
        test_user(TEST_USER.0, "Lucia Garcia", "lucia@example.com", Some("+34 600 111 222"), TEST_USER.1),
    )?;
    insert_user(
        conn,
        test_user(TEST_OPERATOR.0, "Olivia Operator", "olivia@example.com", None, TEST_OPERATOR.1),
    )?;

    let day = |d: u32, h: u32, m: u32| {
        NaiveDate::from_ymd_opt(2025, 6, d)
            .and_then(|date| date.and_hms_opt(h, m, 0))
            .unwrap_or_default()
    };

    let sensors = [
        ("TEMP-001", "Greenhouse temperature", "temperature", "greenhouse", Some((24.5, 87))),
        ("HUM-001", "Lot A humidity", "humidity", "lot-a", Some((92.0, 54))),
        ("LIGHT-001", "Lot B light", "light", "lot-b", None),
        ("TEMP-002", "Lot C temperature", "temperature", "lot-c", Some((22.0, 15))),
    ];
    for (sensor_id, name, kind, zone, reported) in sensors {
        let spec = NewSensorSpec::parse(sensor_id, name, kind, zone)
            .map_err(|e| diesel::result::Error::QueryBuilderError(e.to_string().into()))?;
        insert_sensor(conn, &spec)?;
        if let Some((value, battery)) = reported {
            record_sensor_value(conn, sensor_id, value, Some(battery), day(5, 12, 0))?;
        }
    }

    let alerts = [
        (day(1, 8, 0), "temperature", "lot-a", "high", "Temperature above 32°C in greenhouse", "TEMP-001", Some(33.1), "open"),
        (day(2, 9, 30), "humidity", "lot-b", "medium", "Humidity below 40%", "HUM-001", Some(35.0), "open"),
        (day(3, 14, 0), "light", "lot-c", "low", "Low light in lot C", "LIGHT-001", Some(310.0), "resolved"),
        (day(4, 7, 15), "sensor", "greenhouse", "medium", "Sensor battery below 20%", "TEMP-002", None, "silenced"),
        (day(5, 18, 45), "temperature", "lot-a", "high", "Temperature critical in lot A", "TEMP-002", Some(35.2), "open"),
    ];
    for (raised_at, alert_type, zone, severity, message, sensor_id, value, status) in alerts {
        insert_alert(
            conn,
            NewAlert {
                raised_at,
                alert_type: alert_type.to_string(),
                zone: zone.to_string(),
                severity: severity.to_string(),
                message: message.to_string(),
                sensor_id: sensor_id.to_string(),
                value,
                status: status.to_string(),
            },
        )?;
    }
    Ok(())
}

/// A Rocket instance backed by a fresh SQLite file, with migrations run, the
/// standard test data seeded and every route mounted.
pub fn test_rocket() -> Rocket<Build> {
    test_rocket_with(|figment| figment)
}

/// Like [`test_rocket`], with extra configuration merged into the figment.
pub fn test_rocket_with(configure: impl FnOnce(Figment) -> Figment) -> Rocket<Build> {
    let db_path = std::env::temp_dir().join(format!("agroflux_test_{}.db", Uuid::new_v4()));

    let db_config: Map<_, Value> = map! {
        "url" => db_path.to_string_lossy().to_string().into(),
        "pool_size" => 5.into(),
        "timeout" => 5.into(),
    };

    let figment = rocket::Config::figment()
        .merge(("databases", map!["sqlite_db" => db_config]))
        .merge(("ingest_api_key", TEST_INGEST_KEY))
        .merge(("prediction_jitter", false));
    let figment = configure(figment);

    let rocket = rocket::custom(figment)
        .attach(DbConn::fairing())
        .attach(AdHoc::config::<AppConfig>())
        .attach(super::db::set_foreign_keys_fairing())
        .attach(set_sqlite_test_pragmas_fairing())
        .attach(super::db::run_migrations_fairing())
        .attach(admin_init_fairing())
        .attach(test_data_init_fairing());

    crate::mount_api_routes(crate::register_catchers(rocket))
}

/// A synchronous in-memory database with foreign keys on and migrations run.
/// Every call returns an independent database.
pub fn setup_test_db() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:")
        .expect("Failed to create in-memory SQLite database");
    set_foreign_keys(&mut conn).expect("Failed to enable foreign keys");
    run_pending_migrations(&mut conn).expect("Failed to run migrations");
    conn
}

/// Async-style wrapper around a plain connection, so code written against
/// `DbConn::run` can be tested on a [`setup_test_db`] connection.
pub struct FakeDbConn<'a>(RefCell<&'a mut diesel::SqliteConnection>);

impl<'a> FakeDbConn<'a> {
    /// Runs `f` on the wrapped connection. Calls must not overlap.
    pub async fn run<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut conn = self.0.borrow_mut();
        f(&mut **conn)
    }
}

pub fn setup_test_dbconn<'a>(conn: &'a mut diesel::SqliteConnection) -> FakeDbConn<'a> {
    FakeDbConn(RefCell::new(conn))
}
