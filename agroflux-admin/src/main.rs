// agroflux-admin/src/main.rs

mod admin_cli;

use admin_cli::alert_commands::{AlertAction, handle_alert_command_with_conn};
use admin_cli::sensor_commands::{SensorAction, handle_sensor_command_with_conn};
use admin_cli::user_commands::{UserAction, handle_user_command_with_conn};
use admin_cli::utils::establish_connection;
use clap::{Parser, Subcommand};

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Parser)]
#[command(name = "agroflux-admin")]
#[command(about = "Administration tool for an AgroFlux database")]
#[command(version)]
struct Cli {
    /// Show extended version information
    #[arg(long, action = clap::ArgAction::SetTrue)]
    version_info: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Manage user accounts")]
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    #[command(about = "Manage the sensor registry")]
    Sensor {
        #[command(subcommand)]
        action: SensorAction,
    },
    #[command(about = "Review and triage alerts")]
    Alert {
        #[command(subcommand)]
        action: AlertAction,
    },
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = establish_connection()?;
    match command {
        Commands::User { action } => handle_user_command_with_conn(&mut conn, action),
        Commands::Sensor { action } => handle_sensor_command_with_conn(&mut conn, action),
        Commands::Alert { action } => handle_alert_command_with_conn(&mut conn, action),
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.version_info {
        println!("agroflux-admin {}", built_info::PKG_VERSION);
        println!("Built: {}", built_info::BUILT_TIME_UTC);
        if let Some(commit) = built_info::GIT_COMMIT_HASH {
            println!("Git commit: {}", commit);
        }
        return;
    }

    let Some(command) = cli.command else {
        eprintln!("No command given. Run with --help to see the available commands.");
        std::process::exit(2);
    };

    if let Err(e) = run(command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
