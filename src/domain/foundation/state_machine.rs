//! State machine trait for lifecycle status enums.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors list their legal transitions and get a validated
/// `transition_to` and `is_terminal` for free.
///
/// ```ignore
/// let next = PaymentStatus::Pending.transition_to(PaymentStatus::Completed)?;
/// assert!(next.is_terminal());
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_transition(self, target))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Delivery {
        Queued,
        Sent,
        Dropped,
    }

    impl StateMachine for Delivery {
        fn can_transition_to(&self, target: &Self) -> bool {
            self.valid_transitions().contains(target)
        }

        fn valid_transitions(&self) -> Vec<Self> {
            match self {
                Delivery::Queued => vec![Delivery::Sent, Delivery::Dropped],
                Delivery::Sent | Delivery::Dropped => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_transition() {
        assert_eq!(Delivery::Queued.transition_to(Delivery::Sent), Ok(Delivery::Sent));
    }

    #[test]
    fn transition_to_reports_both_states_on_failure() {
        let err = Delivery::Sent.transition_to(Delivery::Queued).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidTransition {
                from: "Sent".to_string(),
                to: "Queued".to_string(),
            }
        );
    }

    #[test]
    fn is_terminal_follows_valid_transitions() {
        assert!(!Delivery::Queued.is_terminal());
        assert!(Delivery::Sent.is_terminal());
        assert!(Delivery::Dropped.is_terminal());
    }
}
