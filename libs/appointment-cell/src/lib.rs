pub mod handlers;
pub mod models;
pub mod references;
pub mod router;
pub mod services;
pub mod state;
pub mod store;

pub use models::*;
pub use references::AppointmentReferenceCheck;
pub use services::*;
pub use state::AppointmentCellState;
pub use store::{appointment_store_from_config, AppointmentStore};
