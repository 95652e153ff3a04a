use std::sync::Arc;

use doctor_cell::DoctorCellState;
use notification_cell::Notifier;
use patient_cell::PatientCellState;
use shared_config::AppConfig;

use crate::services::clock::{Clock, SystemClock};
use crate::services::locks::SlotLockRegistry;
use crate::services::report::ReportRegistry;
use crate::store::AppointmentStore;

/// Everything the booking, cancellation and listing endpoints share.
pub struct AppointmentCellState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn AppointmentStore>,
    pub doctors: Arc<DoctorCellState>,
    pub patients: Arc<PatientCellState>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub locks: Arc<SlotLockRegistry>,
    pub reports: Arc<ReportRegistry>,
}

impl AppointmentCellState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn AppointmentStore>,
        doctors: Arc<DoctorCellState>,
        patients: Arc<PatientCellState>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            store,
            doctors,
            patients,
            notifier,
            clock: Arc::new(SystemClock),
            locks: Arc::new(SlotLockRegistry::default()),
            reports: Arc::new(ReportRegistry::default()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
