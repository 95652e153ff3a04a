use std::sync::Arc;

use shared_config::AppConfig;

use crate::references::PatientReferences;
use crate::store::PatientStore;

pub struct PatientCellState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn PatientStore>,
    pub appointments: Arc<dyn PatientReferences>,
}

impl PatientCellState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn PatientStore>,
        appointments: Arc<dyn PatientReferences>,
    ) -> Self {
        Self {
            config,
            store,
            appointments,
        }
    }
}
