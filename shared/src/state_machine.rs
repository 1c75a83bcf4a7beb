//! Channel Dispatch State Machine
//!
//! A leading-edge throttle with one trailing flush, modelled as two phases:
//!
//! ```text
//!   Idle --submit--> Pending   (send now, trailing flush scheduled)
//!   Pending --submit--> Pending   (coalesce into the current value)
//!   Pending --trailing flush--> Idle   (send if the value changed)
//! ```
//!
//! `release` may happen in either phase and never changes it. The machine
//! owns no timers; the caller schedules exactly one trailing flush whenever
//! `submit` reports a leading edge.

use crate::{Sample, SampleKind};
use thiserror::Error;

/// Phase of a channel's throttle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No trailing flush scheduled
    Idle,
    /// A trailing flush is scheduled and has not fired yet
    Pending,
}

/// How samples arriving inside a pending window are merged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoalescePolicy {
    /// Latest sample wins (joystick vectors)
    Overwrite,
    /// Damp towards the new sample: round((current + sample) / 2) (sliders)
    Average,
}

/// Result of feeding a sample to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Channel was idle: it is now pending and the caller must schedule a
    /// trailing flush. `send` is the value to emit immediately, if any.
    Leading { send: Option<Sample> },
    /// Sample merged into the pending window; nothing to send
    Coalesced,
}

/// Errors raised by the state machine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("Sample shape mismatch: channel expects {expected:?}, got {got:?}")]
    SampleKind { expected: SampleKind, got: SampleKind },

    #[error("Trailing flush fired while the channel was idle")]
    NotPending,
}

/// Per-channel throttle state
#[derive(Debug, Clone)]
pub struct DispatchState {
    phase: Phase,
    policy: CoalescePolicy,
    rest: Sample,
    current: Option<Sample>,
    last_sent: Option<Sample>,
}

impl DispatchState {
    /// Create an idle channel with the given merge policy and rest value
    pub fn new(policy: CoalescePolicy, rest: Sample) -> Self {
        Self {
            phase: Phase::Idle,
            policy,
            rest,
            current: None,
            last_sent: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        self.phase == Phase::Pending
    }

    /// Latest (possibly coalesced) value
    pub fn current(&self) -> Option<Sample> {
        self.current
    }

    /// Value most recently handed out for sending
    pub fn last_sent(&self) -> Option<Sample> {
        self.last_sent
    }

    /// Feed a new input sample
    pub fn submit(&mut self, sample: Sample) -> Result<SubmitOutcome, StateError> {
        self.check_kind(&sample)?;

        match self.phase {
            Phase::Idle => {
                self.current = Some(sample);
                self.phase = Phase::Pending;
                Ok(SubmitOutcome::Leading { send: self.flush() })
            }
            Phase::Pending => {
                let merged = match (self.policy, self.current) {
                    (CoalescePolicy::Average, Some(current)) => {
                        current.midpoint(&sample).unwrap_or(sample)
                    }
                    _ => sample,
                };
                self.current = Some(merged);
                Ok(SubmitOutcome::Coalesced)
            }
        }
    }

    /// Hand out the current value if it differs from the last one sent
    pub fn flush(&mut self) -> Option<Sample> {
        let current = self.current?;
        if self.last_sent == Some(current) {
            return None;
        }
        self.last_sent = Some(current);
        Some(current)
    }

    /// Snap to the rest value. Always returns it for sending, whatever the
    /// phase or the previous send.
    pub fn release(&mut self) -> Sample {
        self.current = Some(self.rest);
        self.last_sent = Some(self.rest);
        self.rest
    }

    /// The scheduled trailing flush fired: flush once and go idle
    pub fn complete_trailing(&mut self) -> Result<Option<Sample>, StateError> {
        if self.phase != Phase::Pending {
            return Err(StateError::NotPending);
        }
        self.phase = Phase::Idle;
        Ok(self.flush())
    }

    fn check_kind(&self, sample: &Sample) -> Result<(), StateError> {
        let expected = self.rest.kind();
        let got = sample.kind();
        if expected != got {
            return Err(StateError::SampleKind { expected, got });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn slider() -> DispatchState {
        DispatchState::new(CoalescePolicy::Average, Sample::scalar(0))
    }

    fn joystick() -> DispatchState {
        DispatchState::new(CoalescePolicy::Overwrite, Sample::vector(0.0, 0.0))
    }

    #[test]
    fn test_initial_state() {
        let state = slider();
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.current(), None);
        assert_eq!(state.last_sent(), None);
    }

    #[test]
    fn test_leading_edge_sends_immediately() {
        let mut state = slider();
        let outcome = state.submit(Sample::scalar(40)).unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Leading {
                send: Some(Sample::scalar(40))
            }
        );
        assert!(state.is_pending());
        assert_eq!(state.last_sent(), Some(Sample::scalar(40)));
    }

    #[test]
    fn test_scalar_samples_are_damped() {
        let mut state = slider();
        state.submit(Sample::scalar(5)).unwrap();
        let outcome = state.submit(Sample::scalar(95)).unwrap();
        assert_eq!(outcome, SubmitOutcome::Coalesced);
        assert_eq!(state.current(), Some(Sample::scalar(50)));
    }

    #[test]
    fn test_vector_samples_overwrite() {
        let mut state = joystick();
        state.submit(Sample::vector(0.0, 1.0)).unwrap();
        state.submit(Sample::vector(FRAC_PI_2, 1.0)).unwrap();
        assert_eq!(state.current(), Some(Sample::vector(FRAC_PI_2, 1.0)));
    }

    #[test]
    fn test_stays_pending_until_trailing_flush() {
        let mut state = slider();
        state.submit(Sample::scalar(10)).unwrap();
        for value in 11..40 {
            assert_eq!(
                state.submit(Sample::scalar(value)).unwrap(),
                SubmitOutcome::Coalesced
            );
            assert!(state.is_pending());
        }

        let sent = state.complete_trailing().unwrap();
        assert!(sent.is_some());
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn test_trailing_flush_skips_unchanged_value() {
        let mut state = slider();
        state.submit(Sample::scalar(10)).unwrap();
        assert_eq!(state.complete_trailing().unwrap(), None);
    }

    #[test]
    fn test_flush_is_idempotent() {
        let mut state = slider();
        state.submit(Sample::scalar(10)).unwrap();
        assert_eq!(state.flush(), None);
        assert_eq!(state.flush(), None);
    }

    #[test]
    fn test_leading_edge_with_same_value_sends_nothing() {
        let mut state = slider();
        state.submit(Sample::scalar(10)).unwrap();
        state.complete_trailing().unwrap();

        let outcome = state.submit(Sample::scalar(10)).unwrap();
        assert_eq!(outcome, SubmitOutcome::Leading { send: None });
        assert!(state.is_pending());
    }

    #[test]
    fn test_release_always_returns_rest() {
        let mut state = joystick();
        assert_eq!(state.release(), Sample::vector(0.0, 0.0));
        assert_eq!(state.release(), Sample::vector(0.0, 0.0));
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn test_release_while_pending_keeps_timer() {
        let mut state = joystick();
        state.submit(Sample::vector(1.0, 0.8)).unwrap();
        state.release();
        assert!(state.is_pending());

        // Rest value already sent, the trailing flush has nothing to do
        assert_eq!(state.complete_trailing().unwrap(), None);
    }

    #[test]
    fn test_trailing_flush_requires_pending() {
        let mut state = slider();
        assert_eq!(state.complete_trailing(), Err(StateError::NotPending));
    }

    #[test]
    fn test_rejects_wrong_sample_shape() {
        let mut state = slider();
        let result = state.submit(Sample::vector(0.0, 1.0));
        assert!(matches!(
            result,
            Err(StateError::SampleKind {
                expected: SampleKind::Scalar,
                got: SampleKind::Vector
            })
        ));
        assert_eq!(state.phase(), Phase::Idle);
    }
}
