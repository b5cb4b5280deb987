use agroflux_api::orm::alert::{list_alerts, set_status_bulk};
use agronomy::alerts::{AlertFilter, AlertStatus, kpis};
use clap::Subcommand;
use diesel::sqlite::SqliteConnection;

#[derive(Subcommand)]
pub enum AlertAction {
    #[command(about = "List alerts, newest first")]
    Ls {
        #[arg(short, long, help = "Text to look for in message, sensor and zone")]
        query: Option<String>,
        #[arg(long, help = "open, silenced or resolved")]
        status: Option<String>,
        #[arg(long, help = "high, medium or low")]
        severity: Option<String>,
        #[arg(short = 't', long = "type", help = "temperature, humidity, light or sensor")]
        alert_type: Option<String>,
        #[arg(short, long, help = "Zone")]
        zone: Option<String>,
    },
    #[command(about = "Mark alerts as resolved")]
    Resolve {
        #[arg(required = true, help = "Alert IDs")]
        ids: Vec<i32>,
    },
    #[command(about = "Silence alerts")]
    Silence {
        #[arg(required = true, help = "Alert IDs")]
        ids: Vec<i32>,
    },
    #[command(about = "Reopen alerts")]
    Reopen {
        #[arg(required = true, help = "Alert IDs")]
        ids: Vec<i32>,
    },
}

pub fn handle_alert_command_with_conn(
    conn: &mut SqliteConnection,
    action: AlertAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AlertAction::Ls { query, status, severity, alert_type, zone } => {
            let filter = AlertFilter {
                q: query,
                alert_type,
                severity,
                status,
                zone,
                ..Default::default()
            };
            list_alerts_impl(conn, &filter)?;
        }
        AlertAction::Resolve { ids } => {
            set_status_impl(conn, &ids, AlertStatus::Resolved)?;
        }
        AlertAction::Silence { ids } => {
            set_status_impl(conn, &ids, AlertStatus::Silenced)?;
        }
        AlertAction::Reopen { ids } => {
            set_status_impl(conn, &ids, AlertStatus::Open)?;
        }
    }
    Ok(())
}

pub fn list_alerts_impl(
    conn: &mut SqliteConnection,
    filter: &AlertFilter,
) -> Result<(), Box<dyn std::error::Error>> {
    let alerts: Vec<_> = list_alerts(conn)?
        .into_iter()
        .filter(|a| filter.matches(a))
        .collect();

    if alerts.is_empty() {
        println!("No alerts found.");
        return Ok(());
    }

    let summary = kpis(&alerts);
    println!(
        "{} alert(s): {} high, {} medium, {} low, {} open",
        alerts.len(),
        summary.high,
        summary.medium,
        summary.low,
        summary.open
    );
    for a in alerts {
        println!(
            "  #{} {} [{}/{}] {} {}: {} ({})",
            a.id,
            a.raised_at.format("%Y-%m-%d %H:%M"),
            a.alert_type,
            a.severity,
            a.zone,
            a.sensor_id,
            a.message,
            a.status
        );
    }
    Ok(())
}

/// Returns how many of `ids` exist. Unknown ids are reported, not fatal.
pub fn set_status_impl(
    conn: &mut SqliteConnection,
    ids: &[i32],
    status: AlertStatus,
) -> Result<usize, Box<dyn std::error::Error>> {
    let updated = set_status_bulk(conn, ids, status)?;
    println!("Marked {} alert(s) as {}.", updated, status);
    if updated < ids.len() {
        println!("{} id(s) did not match any alert.", ids.len() - updated);
    }
    Ok(updated)
}
