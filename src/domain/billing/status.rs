//! Subscription status state machine.
//!
//! Mirrors the lifecycle states reported by the payment processor. The
//! transition table decides which remote status changes are applied to a
//! local row; anything else is treated as an ordering artifact by callers.

use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a local subscription row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Created, first payment not yet confirmed.
    Incomplete,

    /// First payment never succeeded within the processor's window. Terminal.
    IncompleteExpired,

    Trialing,

    Active,

    /// Renewal payment failed; the processor is retrying.
    PastDue,

    /// Processor gave up retrying without canceling.
    Unpaid,

    /// Collection paused by the customer or merchant.
    Paused,

    /// Terminal. Rows are never deleted, only canceled.
    Canceled,
}

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 8] = [
        SubscriptionStatus::Incomplete,
        SubscriptionStatus::IncompleteExpired,
        SubscriptionStatus::Trialing,
        SubscriptionStatus::Active,
        SubscriptionStatus::PastDue,
        SubscriptionStatus::Unpaid,
        SubscriptionStatus::Paused,
        SubscriptionStatus::Canceled,
    ];

    /// Wire and storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid_format("status", format!("unknown subscription status '{}'", s))
            })
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From INCOMPLETE
            (Incomplete, Trialing)
                | (Incomplete, Active)
                | (Incomplete, IncompleteExpired)
                | (Incomplete, Canceled)
            // From TRIALING
                | (Trialing, Active)
                | (Trialing, Canceled)
            // From ACTIVE
                | (Active, PastDue)
                | (Active, Paused)
                | (Active, Canceled)
            // From PAST_DUE
                | (PastDue, Active)
                | (PastDue, Unpaid)
                | (PastDue, Canceled)
            // From UNPAID
                | (Unpaid, Active)
                | (Unpaid, Canceled)
            // From PAUSED
                | (Paused, Active)
                | (Paused, Canceled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Incomplete => vec![Trialing, Active, IncompleteExpired, Canceled],
            Trialing => vec![Active, Canceled],
            Active => vec![PastDue, Paused, Canceled],
            PastDue => vec![Active, Unpaid, Canceled],
            Unpaid => vec![Active, Canceled],
            Paused => vec![Active, Canceled],
            IncompleteExpired | Canceled => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn incomplete_can_activate_or_expire() {
        let status = SubscriptionStatus::Incomplete;
        assert_eq!(
            status.transition_to(SubscriptionStatus::Active),
            Ok(SubscriptionStatus::Active)
        );
        assert!(status.can_transition_to(&SubscriptionStatus::Trialing));
        assert!(status.can_transition_to(&SubscriptionStatus::IncompleteExpired));
    }

    #[test]
    fn active_and_past_due_flip_both_ways() {
        assert!(SubscriptionStatus::Active.can_transition_to(&SubscriptionStatus::PastDue));
        assert!(SubscriptionStatus::PastDue.can_transition_to(&SubscriptionStatus::Active));
    }

    #[test]
    fn pause_and_resume_only_from_active() {
        assert!(SubscriptionStatus::Active.can_transition_to(&SubscriptionStatus::Paused));
        assert!(SubscriptionStatus::Paused.can_transition_to(&SubscriptionStatus::Active));
        assert!(!SubscriptionStatus::Trialing.can_transition_to(&SubscriptionStatus::Paused));
        assert!(!SubscriptionStatus::PastDue.can_transition_to(&SubscriptionStatus::Paused));
    }

    #[test]
    fn every_non_terminal_state_can_cancel() {
        for status in SubscriptionStatus::ALL {
            if !status.is_terminal() {
                assert!(
                    status.can_transition_to(&SubscriptionStatus::Canceled),
                    "{status} should be cancelable"
                );
            }
        }
    }

    #[test]
    fn canceled_and_incomplete_expired_are_terminal() {
        assert!(SubscriptionStatus::Canceled.is_terminal());
        assert!(SubscriptionStatus::IncompleteExpired.is_terminal());
        assert!(SubscriptionStatus::Canceled
            .transition_to(SubscriptionStatus::Active)
            .is_err());
    }

    #[test]
    fn can_transition_to_is_consistent_with_valid_transitions() {
        for from in SubscriptionStatus::ALL {
            for to in SubscriptionStatus::ALL {
                assert_eq!(
                    from.can_transition_to(&to),
                    from.valid_transitions().contains(&to),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn parses_wire_names() {
        for status in SubscriptionStatus::ALL {
            assert_eq!(status.as_str().parse::<SubscriptionStatus>(), Ok(status));
        }
        assert!("cancelled".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&SubscriptionStatus::PastDue).unwrap();
        assert_eq!(json, "\"past_due\"");
    }

    fn any_status() -> impl Strategy<Value = SubscriptionStatus> {
        prop::sample::select(SubscriptionStatus::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn no_transition_sequence_leaves_canceled(targets in prop::collection::vec(any_status(), 0..32)) {
            let mut status = SubscriptionStatus::Canceled;
            for target in targets {
                if let Ok(next) = status.transition_to(target) {
                    status = next;
                }
            }
            prop_assert_eq!(status, SubscriptionStatus::Canceled);
        }
    }
}
