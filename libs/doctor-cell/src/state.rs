use std::sync::Arc;

use shared_config::AppConfig;

use crate::references::AppointmentReferences;
use crate::store::DoctorStores;

/// Router state for the doctor and specialty endpoints.
pub struct DoctorCellState {
    pub config: Arc<AppConfig>,
    pub stores: DoctorStores,
    pub appointments: Arc<dyn AppointmentReferences>,
}

impl DoctorCellState {
    pub fn new(
        config: Arc<AppConfig>,
        stores: DoctorStores,
        appointments: Arc<dyn AppointmentReferences>,
    ) -> Self {
        Self {
            config,
            stores,
            appointments,
        }
    }
}
