//! Greenhouse domain rules for AgroFlux.
//!
//! Everything in this crate is pure: threshold classification, the yield
//! heuristic, alert and sensor listing, CSV export and account validation.
//! The HTTP server and the admin CLI both build on it.

pub mod account;
pub mod alerts;
pub mod error;
pub mod export;
pub mod listing;
pub mod sensor;
pub mod threshold;
pub mod yield_model;

pub use error::AgronomyError;
pub use threshold::{Range, RangeSet, SensorKind, Status, classify};
pub use yield_model::{Crop, GrowthStage, Jitter, YieldEstimate, YieldInputs};
