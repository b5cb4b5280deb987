//! JSON request guard that logs the parsed body.
//!
//! `LoggedJson<T>` is a drop-in replacement for `Json<T>`. Secret fields
//! (`password`, `current`, `new`, `confirm`) are masked before logging.

use rocket::serde::json::Json;
use rocket::{
    Data, Request,
    data::{self, FromData},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MASKED_FIELDS: [&str; 4] = ["password", "current", "new", "confirm"];

pub struct LoggedJson<T>(pub T);

impl<T> LoggedJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for LoggedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn mask_secrets(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if MASKED_FIELDS.contains(&key.as_str()) {
                    *field = Value::String("***".to_string());
                } else {
                    mask_secrets(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask_secrets),
        _ => {}
    }
}

#[rocket::async_trait]
impl<'r, T: Deserialize<'r> + Serialize> FromData<'r> for LoggedJson<T> {
    type Error = rocket::serde::json::Error<'r>;

    async fn from_data(req: &'r Request<'_>, data: Data<'r>) -> data::Outcome<'r, Self> {
        match Json::<T>::from_data(req, data).await {
            data::Outcome::Success(json_data) => {
                match serde_json::to_value(&json_data.0) {
                    Ok(mut body) => {
                        mask_secrets(&mut body);
                        info!(
                            "API Request Body: {} {} | Data: {}",
                            req.method().as_str(),
                            req.uri().path(),
                            body
                        );
                    }
                    Err(_) => info!(
                        "API Request Body: {} {} | Data: <failed to serialize>",
                        req.method().as_str(),
                        req.uri().path()
                    ),
                }
                data::Outcome::Success(LoggedJson(json_data.into_inner()))
            }
            data::Outcome::Error(e) => data::Outcome::Error(e),
            data::Outcome::Forward(f) => data::Outcome::Forward(f),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for LoggedJson<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
