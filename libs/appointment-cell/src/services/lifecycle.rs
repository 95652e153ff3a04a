use tracing::warn;

use crate::models::{AppointmentError, AppointmentStatus};

/// Allowed moves. `Cancelled` and `Completed` are terminal.
pub fn can_transition(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    matches!(
        (from, to),
        (AppointmentStatus::Confirmed, AppointmentStatus::Cancelled)
            | (AppointmentStatus::Confirmed, AppointmentStatus::Completed)
    )
}

pub fn ensure_transition(from: AppointmentStatus, to: AppointmentStatus) -> Result<(), AppointmentError> {
    if can_transition(from, to) {
        return Ok(());
    }

    warn!("Invalid status transition attempted: {} -> {}", from, to);
    match from {
        AppointmentStatus::Cancelled => Err(AppointmentError::AlreadyCancelled),
        AppointmentStatus::Completed => Err(AppointmentError::AlreadyCompleted),
        AppointmentStatus::Confirmed => Err(AppointmentError::InvalidTransition { from, to }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use AppointmentStatus::*;

    #[test]
    fn only_confirmed_appointments_move() {
        assert!(can_transition(Confirmed, Cancelled));
        assert!(can_transition(Confirmed, Completed));

        for from in [Cancelled, Completed] {
            for to in [Confirmed, Cancelled, Completed] {
                assert!(!can_transition(from, to), "{from} -> {to}");
            }
        }
        assert!(!can_transition(Confirmed, Confirmed));
    }

    #[test]
    fn terminal_states_name_themselves() {
        assert_matches!(ensure_transition(Cancelled, Cancelled), Err(AppointmentError::AlreadyCancelled));
        assert_matches!(ensure_transition(Completed, Cancelled), Err(AppointmentError::AlreadyCompleted));
        assert_matches!(
            ensure_transition(Confirmed, Confirmed),
            Err(AppointmentError::InvalidTransition { .. })
        );
    }
}
