use diesel::prelude::*;

use crate::models::{NewPrediction, Prediction};
use crate::orm::db::last_insert_rowid;

pub fn insert_prediction(
    conn: &mut SqliteConnection,
    record: NewPrediction,
) -> Result<Prediction, diesel::result::Error> {
    use crate::schema::predictions::dsl::*;

    diesel::insert_into(predictions).values(&record).execute(conn)?;
    let last_id = last_insert_rowid(conn)?;
    predictions
        .filter(id.eq(last_id))
        .select(Prediction::as_select())
        .first(conn)
}

pub fn get_prediction(
    conn: &mut SqliteConnection,
    prediction_id: i32,
) -> Result<Option<Prediction>, diesel::result::Error> {
    use crate::schema::predictions::dsl::*;
    predictions
        .filter(id.eq(prediction_id))
        .select(Prediction::as_select())
        .first(conn)
        .optional()
}

/// Prediction history, newest first.
pub fn list_predictions(
    conn: &mut SqliteConnection,
    limit: i64,
) -> Result<Vec<Prediction>, diesel::result::Error> {
    use crate::schema::predictions::dsl::*;
    predictions
        .order((created_at.desc(), id.desc()))
        .limit(limit)
        .select(Prediction::as_select())
        .load(conn)
}

/// Records the observed yield for a prediction. Returns `None` if the
/// prediction does not exist.
pub fn set_actual_yield(
    conn: &mut SqliteConnection,
    prediction_id: i32,
    observed: f64,
) -> Result<Option<Prediction>, diesel::result::Error> {
    use crate::schema::predictions::dsl::*;

    let touched = diesel::update(predictions.filter(id.eq(prediction_id)))
        .set(actual_yield.eq(Some(observed)))
        .execute(conn)?;
    if touched == 0 {
        return Ok(None);
    }
    get_prediction(conn, prediction_id)
}
