pub mod handlers;
pub mod models;
pub mod references;
pub mod router;
pub mod services;
pub mod state;
pub mod store;

pub use models::*;
pub use references::{AppointmentReferences, NoAppointments};
pub use services::*;
pub use state::DoctorCellState;
pub use store::DoctorStores;
