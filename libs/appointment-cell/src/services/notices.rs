//! Patient-facing notification texts and recipient selection.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::warn;

use doctor_cell::Doctor;
use notification_cell::{NotificationChannel, Notifier};
use patient_cell::Patient;
use shared_models::time::to_wire;

use crate::models::Appointment;

pub struct Notice {
    pub subject: String,
    pub body: String,
}

pub fn booking_confirmed(appointment: &Appointment, doctor: &Doctor, patient: &Patient) -> Notice {
    Notice {
        subject: "Appointment confirmed".to_string(),
        body: format!(
            "Dear {}, your appointment with Dr. {} on {} is confirmed. Reference: {}.",
            patient.full_name(),
            doctor.full_name(),
            to_wire(&appointment.start_time),
            appointment.id
        ),
    }
}

pub fn booking_cancelled(appointment: &Appointment, patient: &Patient) -> Notice {
    Notice {
        subject: "Appointment cancelled".to_string(),
        body: format!(
            "Dear {}, your appointment on {} has been cancelled. Reference: {}.",
            patient.full_name(),
            to_wire(&appointment.start_time),
            appointment.id
        ),
    }
}

/// Delivers `notice` on a background task. The caller's response never waits
/// on the notifier.
pub fn dispatch(notifier: Arc<dyn Notifier>, patient: Patient, notice: Notice) -> JoinHandle<()> {
    tokio::spawn(async move { deliver(notifier.as_ref(), &patient, notice).await })
}

/// Sends `notice` to the patient over the configured channel. Failures are
/// logged and dropped: a notification never undoes a committed change.
async fn deliver(notifier: &dyn Notifier, patient: &Patient, notice: Notice) {
    let recipient = match notifier.channel() {
        NotificationChannel::Email => Some(patient.email.as_str()),
        NotificationChannel::Sms => patient.phone.as_deref(),
    };

    let Some(recipient) = recipient else {
        warn!("Patient {} has no address for {:?} notifications", patient.id, notifier.channel());
        return;
    };

    if let Err(e) = notifier.notify(recipient, &notice.subject, &notice.body).await {
        warn!("Failed to notify patient {}: {}", patient.id, e);
    }
}
