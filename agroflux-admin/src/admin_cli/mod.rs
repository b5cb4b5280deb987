pub mod alert_commands;
pub mod sensor_commands;
pub mod user_commands;
pub mod utils;
