use agroflux_api::orm::sensor::{
    delete_sensor, get_sensor, insert_sensor, list_sensors, update_sensor_config,
};
use agronomy::sensor::{NewSensorSpec, validate_config, zone_label};
use clap::Subcommand;
use diesel::sqlite::SqliteConnection;

use super::utils::{Matcher, confirm};

#[derive(Subcommand)]
pub enum SensorAction {
    #[command(about = "Register a sensor with the default band for its type")]
    Add {
        #[arg(short, long, help = "Sensor ID, e.g. TEMP-003")]
        id: String,
        #[arg(short, long, help = "Display name")]
        name: String,
        #[arg(short = 't', long = "type", help = "temperature, humidity or light")]
        sensor_type: String,
        #[arg(short, long, default_value = "lot-a", help = "Zone (lot-a, lot-b, lot-c, greenhouse)")]
        zone: String,
    },
    #[command(about = "List sensors, optionally filtered by search term")]
    Ls {
        #[arg(help = "Search term matched against id, name and zone (regex by default, use -F for fixed string)")]
        search_term: Option<String>,
        #[arg(short = 'F', long = "fixed-string", help = "Treat search term as fixed string instead of regex")]
        fixed_string: bool,
    },
    #[command(about = "Change a sensor's name, zone or acceptable band")]
    SetRange {
        #[arg(help = "Sensor ID")]
        id: String,
        #[arg(long, help = "New display name")]
        name: Option<String>,
        #[arg(long, help = "New zone")]
        zone: Option<String>,
        #[arg(long, help = "Lower bound of the band")]
        min: Option<f64>,
        #[arg(long, help = "Upper bound of the band")]
        max: Option<f64>,
    },
    #[command(about = "Remove a sensor")]
    Rm {
        #[arg(help = "Sensor ID")]
        id: String,
        #[arg(short = 'y', long = "yes", help = "Skip confirmation prompt")]
        yes: bool,
    },
}

pub fn handle_sensor_command_with_conn(
    conn: &mut SqliteConnection,
    action: SensorAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SensorAction::Add { id, name, sensor_type, zone } => {
            add_sensor_impl(conn, &id, &name, &sensor_type, &zone)?;
        }
        SensorAction::Ls { search_term, fixed_string } => {
            list_sensors_impl(conn, search_term, fixed_string)?;
        }
        SensorAction::SetRange { id, name, zone, min, max } => {
            configure_sensor_impl(conn, &id, name, zone, min, max)?;
        }
        SensorAction::Rm { id, yes } => {
            remove_sensor_impl(conn, &id, yes)?;
        }
    }
    Ok(())
}

pub fn add_sensor_impl(
    conn: &mut SqliteConnection,
    id: &str,
    name: &str,
    sensor_type: &str,
    zone: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let spec = NewSensorSpec::parse(id, name, sensor_type, zone)?;
    if get_sensor(conn, &spec.id)?.is_some() {
        return Err(format!("Sensor '{}' already exists", spec.id).into());
    }

    let sensor = insert_sensor(conn, &spec)?;
    println!("Sensor registered successfully!");
    println!("ID: {}", sensor.id);
    println!("Type: {} ({})", sensor.sensor_type, sensor.unit);
    println!("Zone: {}", zone_label(&sensor.zone));
    println!("Band: {}", sensor.band());
    Ok(())
}

pub fn list_sensors_impl(
    conn: &mut SqliteConnection,
    search_term: Option<String>,
    fixed_string: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let sensors = list_sensors(conn)?;
    let sensors = match search_term {
        Some(term) => {
            let matcher = Matcher::new(&term, fixed_string)?;
            sensors
                .into_iter()
                .filter(|s| matcher.matches(&[&s.id, &s.name, &s.zone]))
                .collect::<Vec<_>>()
        }
        None => sensors,
    };

    if sensors.is_empty() {
        println!("No sensors found.");
        return Ok(());
    }

    println!("Sensors:");
    for s in sensors {
        let last = s
            .last_reading
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "  {} [{}] {}, {}: {} {} ({}), battery {}%, band {}, last reading {}",
            s.id,
            s.sensor_type,
            s.name,
            zone_label(&s.zone),
            s.current_value,
            s.unit,
            s.status,
            s.battery,
            s.band(),
            last
        );
    }
    Ok(())
}

/// Unspecified fields keep their stored values.
pub fn configure_sensor_impl(
    conn: &mut SqliteConnection,
    id: &str,
    name: Option<String>,
    zone: Option<String>,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let sensor = get_sensor(conn, id)?.ok_or_else(|| format!("Sensor '{}' not found", id))?;

    if name.is_none() && zone.is_none() && min.is_none() && max.is_none() {
        println!("No fields specified for update. Use --name, --zone, --min, or --max.");
        return Ok(());
    }

    let band = sensor.band();
    let name = name.unwrap_or_else(|| sensor.name.clone());
    let range = validate_config(&name, min.unwrap_or(band.min()), max.unwrap_or(band.max()))?;
    let zone = zone.map(|z| z.trim().to_string()).filter(|z| !z.is_empty());

    let updated = update_sensor_config(conn, id, &name, zone.as_deref(), range)?
        .ok_or_else(|| format!("Sensor '{}' not found", id))?;
    println!("Sensor updated successfully!");
    println!("ID: {}", updated.id);
    println!("Name: {}", updated.name);
    println!("Zone: {}", zone_label(&updated.zone));
    println!("Band: {}", updated.band());
    Ok(())
}

pub fn remove_sensor_impl(
    conn: &mut SqliteConnection,
    id: &str,
    yes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let sensor = get_sensor(conn, id)?.ok_or_else(|| format!("Sensor '{}' not found", id))?;

    if !yes && !confirm(&format!("Remove sensor {} ({})?", sensor.id, sensor.name))? {
        println!("Operation cancelled.");
        return Ok(());
    }

    delete_sensor(conn, &sensor.id)?;
    println!("Deleted sensor: {}", sensor.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agroflux_api::orm::testing::setup_test_db;

    #[test]
    fn test_add_sensor() {
        let mut conn = setup_test_db();
        handle_sensor_command_with_conn(
            &mut conn,
            SensorAction::Add {
                id: "HUM-002".to_string(),
                name: "South humidity".to_string(),
                sensor_type: "humidity".to_string(),
                zone: "lot-b".to_string(),
            },
        )
        .unwrap();

        let sensor = get_sensor(&mut conn, "HUM-002").unwrap().unwrap();
        assert_eq!(sensor.status, "offline");
        assert_eq!(sensor.zone, "lot-b");
        assert_eq!(sensor.unit, "%");

        assert!(add_sensor_impl(&mut conn, "HUM-002", "Again", "humidity", "lot-b").is_err());
        assert!(add_sensor_impl(&mut conn, "CO2-001", "CO2", "co2", "lot-b").is_err());
        assert!(add_sensor_impl(&mut conn, "", "Nameless", "light", "lot-b").is_err());
    }

    #[test]
    fn test_configure_sensor() {
        let mut conn = setup_test_db();
        add_sensor_impl(&mut conn, "TEMP-003", "North temperature", "temperature", "").unwrap();

        configure_sensor_impl(&mut conn, "TEMP-003", None, None, Some(16.0), None).unwrap();
        let sensor = get_sensor(&mut conn, "TEMP-003").unwrap().unwrap();
        assert_eq!(sensor.name, "North temperature");
        assert_eq!(sensor.zone, "lot-a");
        assert_eq!(sensor.range_min, 16.0);
        assert_eq!(sensor.range_max, 30.0);

        configure_sensor_impl(
            &mut conn,
            "TEMP-003",
            Some("Nursery air".to_string()),
            Some("greenhouse".to_string()),
            None,
            None,
        )
        .unwrap();
        let sensor = get_sensor(&mut conn, "TEMP-003").unwrap().unwrap();
        assert_eq!(sensor.name, "Nursery air");
        assert_eq!(sensor.zone, "greenhouse");

        // band would collapse
        assert!(configure_sensor_impl(&mut conn, "TEMP-003", None, None, Some(30.0), None).is_err());
        assert!(configure_sensor_impl(&mut conn, "TEMP-404", None, None, Some(1.0), None).is_err());
    }

    #[test]
    fn test_list_and_remove_sensor() {
        let mut conn = setup_test_db();
        add_sensor_impl(&mut conn, "LIGHT-002", "Roof light", "light", "greenhouse").unwrap();

        list_sensors_impl(&mut conn, Some("LIGHT".to_string()), true).unwrap();
        list_sensors_impl(&mut conn, None, false).unwrap();

        remove_sensor_impl(&mut conn, "LIGHT-002", true).unwrap();
        assert!(get_sensor(&mut conn, "LIGHT-002").unwrap().is_none());
        assert!(remove_sensor_impl(&mut conn, "LIGHT-002", true).is_err());
    }
}
