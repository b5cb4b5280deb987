//! TypeScript type generation module.
//!
//! Exports the TypeScript definitions of every API type annotated with
//! `#[ts(export)]`, for the dashboard front end. Runs as a test.

#[cfg(test)]
mod tests {
    use std::{env, path::Path};

    use ts_rs::TS;

    #[test]
    fn generate_typescript_types() {
        // Output directory, in order of preference:
        // 1. AGROFLUX_TS_OUTPUT_DIR
        // 2. ../../dashboard/src/types/generated (if the dashboard is checked out)
        // 3. ../ts-bindings
        let output_dir_str = if let Ok(env_dir) = env::var("AGROFLUX_TS_OUTPUT_DIR") {
            println!("Using TypeScript output directory from AGROFLUX_TS_OUTPUT_DIR: {}", env_dir);
            env_dir
        } else {
            let dashboard_dir = "../../dashboard/src/types/generated";
            let fallback_dir = "../ts-bindings";

            if Path::new(dashboard_dir).parent().unwrap_or(Path::new("")).exists() {
                println!("Using dashboard directory: {}", dashboard_dir);
                dashboard_dir.to_string()
            } else {
                println!("Using fallback directory: {}", fallback_dir);
                fallback_dir.to_string()
            }
        };

        let output_dir = Path::new(&output_dir_str);
        if !output_dir.exists() {
            std::fs::create_dir_all(output_dir).expect("Failed to create output directory");
        }

        // Stale .ts files from renamed or removed types go first
        for entry in std::fs::read_dir(output_dir).expect("Failed to read output directory") {
            let path = entry.expect("Failed to read directory entry").path();
            if path.extension().and_then(|s| s.to_str()) == Some("ts") {
                std::fs::remove_file(&path).unwrap_or_else(|e| panic!("Failed to remove {:?}: {}", path, e));
            }
        }

        unsafe {
            env::set_var("TS_RS_EXPORT_DIR", output_dir);
        }

        use crate::{
            api::{
                ErrorResponse,
                alert::{BulkStatusRequest, BulkStatusResponse, RaiseAlertRequest},
                login::{LoginFailureResponse, LoginRequest, LoginSuccessResponse},
                prediction::{ActualYieldRequest, PredictionRequest, PredictionResponse},
                profile::PasswordChangeRequest,
                reading::{IngestResponse, ReadingsResponse},
                sensor::{CreateSensorRequest, SensorConfigRequest, SensorReport},
                status::ServiceStatus,
            },
            model_runner::{HealthState, ModelHealth},
            models::*,
            orm::reading::LatestValues,
        };

        // Stored records
        Alert::export().expect("Failed to export Alert type");
        Prediction::export().expect("Failed to export Prediction type");
        Reading::export().expect("Failed to export Reading type");
        ReadingInput::export().expect("Failed to export ReadingInput type");
        Sensor::export().expect("Failed to export Sensor type");
        UserProfile::export().expect("Failed to export UserProfile type");
        ProfileUpdate::export().expect("Failed to export ProfileUpdate type");
        LatestValues::export().expect("Failed to export LatestValues type");

        ErrorResponse::export().expect("Failed to export ErrorResponse type");
        ServiceStatus::export().expect("Failed to export ServiceStatus type");

        LoginRequest::export().expect("Failed to export LoginRequest type");
        LoginSuccessResponse::export().expect("Failed to export LoginSuccessResponse type");
        LoginFailureResponse::export().expect("Failed to export LoginFailureResponse type");
        PasswordChangeRequest::export().expect("Failed to export PasswordChangeRequest type");

        IngestResponse::export().expect("Failed to export IngestResponse type");
        ReadingsResponse::export().expect("Failed to export ReadingsResponse type");

        CreateSensorRequest::export().expect("Failed to export CreateSensorRequest type");
        SensorConfigRequest::export().expect("Failed to export SensorConfigRequest type");
        SensorReport::export().expect("Failed to export SensorReport type");

        RaiseAlertRequest::export().expect("Failed to export RaiseAlertRequest type");
        BulkStatusRequest::export().expect("Failed to export BulkStatusRequest type");
        BulkStatusResponse::export().expect("Failed to export BulkStatusResponse type");

        PredictionRequest::export().expect("Failed to export PredictionRequest type");
        PredictionResponse::export().expect("Failed to export PredictionResponse type");
        ActualYieldRequest::export().expect("Failed to export ActualYieldRequest type");
        HealthState::export().expect("Failed to export HealthState type");
        ModelHealth::export().expect("Failed to export ModelHealth type");

        println!("TypeScript types generated successfully in {:?}", output_dir);
    }
}
