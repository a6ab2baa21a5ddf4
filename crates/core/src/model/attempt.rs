use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::ExamId;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PhaseError {
    #[error("cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: AttemptPhase, to: AttemptPhase },
}

/// Where the learner is in the exam flow.
///
/// Moves only forward: `Instructions -> Active -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttemptPhase {
    #[default]
    Instructions,
    Active,
    Completed,
}

impl AttemptPhase {
    /// Validate and apply a transition.
    ///
    /// `Active -> Active` is allowed (answer changes keep the phase).
    ///
    /// # Errors
    ///
    /// Returns `PhaseError::InvalidTransition` for backward or skipping moves.
    pub fn advance(&mut self, to: AttemptPhase) -> Result<(), PhaseError> {
        let allowed = matches!(
            (*self, to),
            (AttemptPhase::Instructions, AttemptPhase::Active)
                | (AttemptPhase::Active, AttemptPhase::Active | AttemptPhase::Completed)
        );
        if !allowed {
            return Err(PhaseError::InvalidTransition { from: *self, to });
        }
        *self = to;
        Ok(())
    }

    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, AttemptPhase::Active)
    }
}

/// One sitting of one exam, as acknowledged by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    exam_id: ExamId,
    remaining_secs: u32,
    started_at: DateTime<Utc>,
}

impl Attempt {
    /// `remaining_secs` is the backend's figure at the time of the call.
    #[must_use]
    pub fn new(exam_id: ExamId, remaining_secs: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            exam_id,
            remaining_secs,
            started_at,
        }
    }

    /// Clamp a wire value (possibly fractional or negative) to whole seconds.
    #[must_use]
    pub fn clamp_remaining(raw: f64) -> u32 {
        if !raw.is_finite() || raw <= 0.0 {
            return 0;
        }
        let floored = raw.floor();
        if floored >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            // In range and non-negative after the checks above.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let secs = floored as u32;
            secs
        }
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.exam_id
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_moves_forward_only() {
        let mut phase = AttemptPhase::default();
        phase.advance(AttemptPhase::Active).unwrap();
        phase.advance(AttemptPhase::Active).unwrap();
        phase.advance(AttemptPhase::Completed).unwrap();
        assert!(phase.advance(AttemptPhase::Active).is_err());
        assert!(phase.advance(AttemptPhase::Instructions).is_err());
    }

    #[test]
    fn instructions_cannot_skip_to_completed() {
        let mut phase = AttemptPhase::Instructions;
        let err = phase.advance(AttemptPhase::Completed).unwrap_err();
        assert_eq!(
            err,
            PhaseError::InvalidTransition {
                from: AttemptPhase::Instructions,
                to: AttemptPhase::Completed,
            }
        );
        assert_eq!(phase, AttemptPhase::Instructions);
    }

    #[test]
    fn clamp_remaining_floors_and_clamps() {
        assert_eq!(Attempt::clamp_remaining(125.9), 125);
        assert_eq!(Attempt::clamp_remaining(-3.0), 0);
        assert_eq!(Attempt::clamp_remaining(f64::NAN), 0);
        assert_eq!(Attempt::clamp_remaining(1e12), u32::MAX);
    }
}
