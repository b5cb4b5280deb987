pub mod alert;
mod db;
pub mod login;
pub mod logout;
pub mod prediction;
pub mod reading;
pub mod sensor;
pub mod testing;
pub mod user;

pub use db::*;
