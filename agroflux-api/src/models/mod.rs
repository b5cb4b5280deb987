pub mod alert;
pub mod prediction;
pub mod reading;
pub mod sensor;
pub mod session;
pub mod user;

// Re-export models for easier access
pub use alert::*;
pub use prediction::*;
pub use reading::*;
pub use sensor::*;
pub use session::*;
pub use user::*;
