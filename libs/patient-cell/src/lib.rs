pub mod handlers;
pub mod models;
pub mod references;
pub mod router;
pub mod services;
pub mod state;
pub mod store;

pub use models::*;
pub use references::{NoPatientAppointments, PatientReferences};
pub use services::PatientService;
pub use state::PatientCellState;
pub use store::{patient_store_from_config, PatientStore};
