// agroflux-api/tests/schema.rs
//
// Constraints and relationships enforced by the database itself. Application
// logic is tested elsewhere.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error};
use diesel::sql_query;

use agroflux_api::models::*;
use agroflux_api::orm::testing::setup_test_db;
use agroflux_api::schema::*;

fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 10)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn new_user(login: &str) -> NewUser {
    NewUser {
        login_id: login.to_string(),
        full_name: "Test User".to_string(),
        email: format!("{}@example.com", login),
        phone: None,
        password_hash: "not-a-real-hash".to_string(),
    }
}

/// The database refused the row (CHECK or FOREIGN KEY constraint).
fn is_rejected(result: Result<usize, Error>) -> bool {
    matches!(result, Err(Error::DatabaseError(_, _)))
}

#[test]
fn test_login_id_is_unique() {
    let mut conn = setup_test_db();
    diesel::insert_into(users::table)
        .values(&new_user("jdoe"))
        .execute(&mut conn)
        .unwrap();

    let result = diesel::insert_into(users::table)
        .values(&new_user("jdoe"))
        .execute(&mut conn);
    assert!(matches!(
        result,
        Err(Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
    ));
}

#[test]
fn test_sessions_cascade_with_user() {
    let mut conn = setup_test_db();
    diesel::insert_into(users::table)
        .values(&new_user("jdoe"))
        .execute(&mut conn)
        .unwrap();
    let user_id: i32 = users::table.select(users::id).first(&mut conn).unwrap();

    sql_query(format!(
        "INSERT INTO sessions (id, user_id, created_at, revoked) VALUES ('s1', {}, '2025-06-10 12:00:00', 0)",
        user_id
    ))
    .execute(&mut conn)
    .unwrap();

    diesel::delete(users::table.filter(users::id.eq(user_id)))
        .execute(&mut conn)
        .unwrap();
    let left: i64 = sessions::table.count().get_result(&mut conn).unwrap();
    assert_eq!(left, 0);
}

#[test]
fn test_sensor_band_must_be_ordered() {
    let mut conn = setup_test_db();
    let result = sql_query(
        "INSERT INTO sensors (id, name, sensor_type, zone, unit, range_min, range_max) \
         VALUES ('T-1', 'x', 'temperature', 'lot-a', '°C', 30, 18)",
    )
    .execute(&mut conn);
    assert!(is_rejected(result));
}

#[test]
fn test_sensor_type_and_status_vocabulary() {
    let mut conn = setup_test_db();
    let result = sql_query(
        "INSERT INTO sensors (id, name, sensor_type, zone, unit, range_min, range_max) \
         VALUES ('C-1', 'x', 'co2', 'lot-a', 'ppm', 0, 1)",
    )
    .execute(&mut conn);
    assert!(is_rejected(result));

    let result = sql_query(
        "INSERT INTO sensors (id, name, sensor_type, zone, unit, status, range_min, range_max) \
         VALUES ('T-1', 'x', 'temperature', 'lot-a', '°C', 'asleep', 18, 30)",
    )
    .execute(&mut conn);
    assert!(is_rejected(result));
}

#[test]
fn test_alert_vocabulary() {
    let mut conn = setup_test_db();
    let alert = |severity: &str, status: &str| NewAlert {
        raised_at: noon(),
        alert_type: "humidity".to_string(),
        zone: "lot-a".to_string(),
        severity: severity.to_string(),
        message: "Humidity high".to_string(),
        sensor_id: "HUM-001".to_string(),
        value: Some(91.0),
        status: status.to_string(),
    };

    assert!(diesel::insert_into(alerts::table)
        .values(&alert("high", "open"))
        .execute(&mut conn)
        .is_ok());
    assert!(is_rejected(
        diesel::insert_into(alerts::table)
            .values(&alert("urgent", "open"))
            .execute(&mut conn)
    ));
    assert!(is_rejected(
        diesel::insert_into(alerts::table)
            .values(&alert("high", "closed"))
            .execute(&mut conn)
    ));
}

#[test]
fn test_prediction_reading_reference() {
    let mut conn = setup_test_db();
    let prediction = |reading_id: Option<i32>, source: &str| NewPrediction {
        crop_type: "tomato".to_string(),
        growth_stage: "flowering".to_string(),
        days_planting: 60,
        location: "lot-a".to_string(),
        temperature: 24.0,
        humidity: 65.0,
        light: 750.0,
        reading_id,
        predicted_yield: 52000.0,
        confidence: 85.0,
        model_version: "heuristic-v1.0".to_string(),
        source: source.to_string(),
        created_at: noon(),
    };

    assert!(diesel::insert_into(predictions::table)
        .values(&prediction(None, "heuristic"))
        .execute(&mut conn)
        .is_ok());

    let result = diesel::insert_into(predictions::table)
        .values(&prediction(Some(4242), "heuristic"))
        .execute(&mut conn);
    assert!(is_rejected(result));

    assert!(is_rejected(
        diesel::insert_into(predictions::table)
            .values(&prediction(None, "oracle"))
            .execute(&mut conn)
    ));
}
