// agroflux-api/src/main.rs

use clap::Parser;
use rocket::error;
use rocket::info;
use std::env;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Parser)]
#[command(name = "agroflux-api")]
#[command(about = "AgroFlux API server for greenhouse monitoring")]
#[command(version)]
struct Cli {
    /// Show extended version information
    #[arg(long, action = clap::ArgAction::SetTrue)]
    version_info: bool,
}

#[rocket::main]
async fn main() {
    let cli = Cli::parse();

    if cli.version_info {
        println!("agroflux-api {}", built_info::PKG_VERSION);
        println!("Built: {}", built_info::BUILT_TIME_UTC);
        if let Some(commit) = built_info::GIT_COMMIT_HASH {
            println!("Git commit: {}", commit);
        }
        return;
    }

    dotenvy::dotenv().ok();

    if env::var("DATABASE_URL").is_err() {
        error!("DATABASE_URL must be set (e.g. DATABASE_URL=agroflux.db)");
        std::process::exit(1);
    }

    match env::current_dir() {
        Ok(path) => info!("Current directory: {}", path.display()),
        Err(e) => error!("Error getting current directory: {}", e),
    };

    info!("AgroFlux API v{} starting", built_info::PKG_VERSION);
    info!("Built: {}", built_info::BUILT_TIME_UTC);
    if let Some(commit) = built_info::GIT_COMMIT_HASH {
        info!("Git commit: {}", commit);
    }

    if let Err(e) = agroflux_api::rocket().launch().await {
        error!("Rocket server failed to launch: {}", e);
        std::process::exit(1);
    }
}
