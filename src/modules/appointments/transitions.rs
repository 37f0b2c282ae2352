//! Appointment status transitions.

use chrono::{DateTime, Utc};

use abroadly_models::appointments::AppointmentStatus;

/// Who is acting on an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// The student who booked it
    Student,
    /// The consultant it is booked with
    Consultant,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The move itself is never valid from this status
    Invalid(String),
    /// Valid move, wrong actor
    Forbidden(String),
}

fn staff(actor: Actor) -> bool {
    matches!(actor, Actor::Consultant | Actor::Admin)
}

/// Validates `from -> to` for `actor`. Completing or marking a no-show is
/// only possible once the appointment has started.
pub fn check_transition(
    from: AppointmentStatus,
    to: AppointmentStatus,
    actor: Actor,
    starts_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), TransitionError> {
    use AppointmentStatus::*;

    match (from, to) {
        (Pending, Confirmed) => {
            if staff(actor) {
                Ok(())
            } else {
                Err(TransitionError::Forbidden(
                    "Only the consultant can confirm an appointment".into(),
                ))
            }
        }
        (Pending | Confirmed, Cancelled) => Ok(()),
        (Confirmed, Completed | NoShow) => {
            if !staff(actor) {
                Err(TransitionError::Forbidden(
                    "Only the consultant can close an appointment".into(),
                ))
            } else if now < starts_at {
                Err(TransitionError::Invalid(
                    "Appointment has not started yet".into(),
                ))
            } else {
                Ok(())
            }
        }
        _ => Err(TransitionError::Invalid(format!(
            "Cannot change appointment status from {} to {}",
            from.as_str(),
            to.as_str()
        ))),
    }
}
