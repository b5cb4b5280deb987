#[macro_use]
extern crate rocket;

use rocket::fairing::AdHoc;
use rocket::figment::value::Map;
use rocket::figment::{Figment, providers::{Env, Format, Toml}};
use rocket::fs::{FileServer, Options};
use rocket::request::Request;
use rocket::serde::json::{Json, Value, json};
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, Cors, CorsOptions};

pub mod admin_init_fairing;
pub mod api;
pub mod config;
pub mod download;
pub mod ingest_guard;
pub mod logged_json;
pub mod model_runner;
pub mod models;
pub mod orm;
pub use orm::DbConn;
pub mod schema;
pub mod session_guards;

#[cfg(test)]
pub mod generate_types;

use config::AppConfig;

#[catch(401)]
fn unauthorized(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Unauthorized",
        "path": req.uri().path().to_string(),
        "status": 401
    }))
}

#[catch(403)]
fn forbidden(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Forbidden",
        "path": req.uri().path().to_string(),
        "status": 403
    }))
}

#[catch(404)]
fn not_found(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Not Found",
        "path": req.uri().path().to_string(),
        "status": 404
    }))
}

#[catch(422)]
fn unprocessable_entity(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Unprocessable Entity",
        "path": req.uri().path().to_string(),
        "status": 422
    }))
}

#[catch(500)]
fn internal_server_error(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Internal Server Error",
        "path": req.uri().path().to_string(),
        "status": 500
    }))
}

#[catch(default)]
fn default_catcher(status: rocket::http::Status, req: &Request) -> Json<Value> {
    Json(json!({
        "error": status.reason().unwrap_or("Unknown Error"),
        "path": req.uri().path().to_string(),
        "status": status.code
    }))
}

pub fn register_catchers(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.register(
        "/",
        catchers![
            unauthorized,
            forbidden,
            not_found,
            unprocessable_entity,
            internal_server_error,
            default_catcher
        ],
    )
}

pub fn mount_api_routes(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.mount("/api", api::routes())
}

/// Builds the CORS fairing for the dashboard. An empty origin list allows
/// any origin.
fn cors(origins: &[String]) -> Result<Cors, rocket_cors::Error> {
    let allowed_origins = if origins.is_empty() {
        AllowedOrigins::all()
    } else {
        AllowedOrigins::some_exact(origins)
    };
    CorsOptions {
        allowed_origins,
        allow_credentials: true,
        ..Default::default()
    }
    .to_cors()
}

fn log_rocket_info(rocket: &Rocket<Build>, config: &AppConfig) {
    let figment = rocket.figment();

    if let Ok(address) = figment.extract_inner::<String>("address") {
        info!("Rocket is running at: {}", address);
    }

    if let Ok(port) = figment.extract_inner::<u16>("port") {
        info!("Rocket is listening on port: {}", port);
    }

    match figment.extract_inner::<Map<String, Value>>("databases.sqlite_db") {
        Ok(db_config) => {
            if let Some(Value::String(url)) = db_config.get("url") {
                info!("Database URL: {}", url);
            } else {
                warn!("Database URL not found in configuration");
            }
        }
        Err(e) => {
            warn!("Failed to extract database configuration: {}", e);
        }
    }

    match config.model.program.as_deref() {
        Some(program) => info!("Yield model: {} {}", program, config.model.args.join(" ")),
        None => info!("Yield model: none configured, predictions use the heuristic"),
    }
    if config.ingest_api_key.is_none() {
        warn!("No ingest API key configured; device ingest is disabled");
    }
}

/// The production server. Tests build theirs with
/// `orm::testing::test_rocket`, which uses a throwaway database.
///
/// Configuration layers, later wins: `Rocket.toml`, `ROCKET_*`,
/// `AGROFLUX_*` (nested keys split on `__`), then `DATABASE_URL`.
pub fn rocket() -> Rocket<Build> {
    let mut figment = Figment::from(rocket::Config::default())
        .merge(Toml::file("Rocket.toml").nested())
        .merge(Env::prefixed("ROCKET_").global())
        .merge(Env::prefixed("AGROFLUX_").split("__").global());
    if let Ok(database_url) = std::env::var("DATABASE_URL") {
        figment = figment.merge(("databases.sqlite_db.url", database_url));
    }

    let app_config: AppConfig = figment.extract().unwrap_or_else(|e| {
        warn!("Invalid application settings, using defaults: {}", e);
        AppConfig::default()
    });

    let mut rocket = rocket::custom(figment)
        .attach(DbConn::fairing())
        .attach(AdHoc::config::<AppConfig>())
        .attach(orm::set_foreign_keys_fairing())
        .attach(orm::run_migrations_fairing())
        .attach(admin_init_fairing::admin_init_fairing());

    match cors(&app_config.cors_origins) {
        Ok(fairing) => rocket = rocket.attach(fairing),
        Err(e) => error!("CORS disabled, invalid configuration: {}", e),
    }

    log_rocket_info(&rocket, &app_config);

    let static_dir = app_config.static_dir.clone();
    mount_api_routes(register_catchers(rocket)).mount(
        "/",
        FileServer::new(static_dir, Options::Index | Options::Missing).rank(10),
    )
}
