//! Request guard for device-facing write endpoints.
//!
//! A device proves itself with the configured ingest key, sent either as
//! `Authorization: Bearer <key>`, as a bare `Authorization: <key>` header or
//! as a `?key=<key>` query parameter.

use rocket::State;
use rocket::http::Status;
use rocket::request::{self, FromRequest, Outcome, Request};

use crate::config::AppConfig;

/// Present on a request that carried the valid ingest key.
#[derive(Debug)]
pub struct IngestKey;

fn presented_key<'r>(request: &'r Request<'_>) -> Option<&'r str> {
    if let Some(header) = request.headers().get_one("Authorization") {
        let header = header.trim();
        let key = header.strip_prefix("Bearer ").unwrap_or(header).trim();
        if !key.is_empty() {
            return Some(key);
        }
    }
    request
        .query_value::<&str>("key")
        .and_then(Result::ok)
        .filter(|k| !k.is_empty())
}

/// Compares without stopping at the first differing byte.
fn keys_match(expected: &str, given: &str) -> bool {
    let (a, b) = (expected.as_bytes(), given.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for IngestKey {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let config = match request.guard::<&State<AppConfig>>().await {
            Outcome::Success(config) => config,
            _ => return Outcome::Error((Status::InternalServerError, ())),
        };
        let Some(expected) = config.ingest_api_key.as_deref().filter(|k| !k.is_empty()) else {
            warn!("[ingest] Rejected {}: no ingest key is configured", request.uri().path());
            return Outcome::Error((Status::Unauthorized, ()));
        };
        match presented_key(request) {
            Some(given) if keys_match(expected, given) => Outcome::Success(IngestKey),
            _ => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}
