//! Emergency escalation state machine
//!
//! Entering a restricted zone starts a countdown. Reaching zero yields a
//! single [`Escalation`] and returns to idle; a dismissal cancels it.
//! Transitions are pure: the owner applies `step` and performs the
//! escalation side effect itself.

use serde::{Deserialize, Serialize};

/// Current escalation state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EscalationState {
    #[default]
    Idle,
    CountingDown { zone_name: String, remaining: u32 },
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationInput {
    /// A restricted zone was newly entered
    RestrictedEntered(String),
    /// One second elapsed
    Tick,
    /// The subject dismissed the alert
    Dismiss,
    /// Tracking stopped
    Reset,
}

/// The terminal "authorities contacted" action, produced exactly once per
/// expired countdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escalation {
    pub zone_name: String,
}

/// User-facing view of the escalation state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmergencyAlert {
    pub active: bool,
    pub zone_name: String,
    pub countdown_seconds: u32,
}

impl EscalationState {
    /// Apply one input, returning the next state and an escalation if the
    /// countdown expired on this step.
    ///
    /// A restricted entry while already counting down keeps the running
    /// countdown unchanged.
    pub fn step(self, input: EscalationInput, countdown_secs: u32) -> (Self, Option<Escalation>) {
        match (self, input) {
            (_, EscalationInput::Reset) => (EscalationState::Idle, None),

            (EscalationState::Idle, EscalationInput::RestrictedEntered(zone_name)) => {
                if countdown_secs == 0 {
                    return (EscalationState::Idle, Some(Escalation { zone_name }));
                }
                (
                    EscalationState::CountingDown {
                        zone_name,
                        remaining: countdown_secs,
                    },
                    None,
                )
            }

            (counting @ EscalationState::CountingDown { .. }, EscalationInput::RestrictedEntered(_)) => {
                (counting, None)
            }

            (EscalationState::CountingDown { zone_name, remaining }, EscalationInput::Tick) => {
                if remaining > 1 {
                    (
                        EscalationState::CountingDown {
                            zone_name,
                            remaining: remaining - 1,
                        },
                        None,
                    )
                } else {
                    (EscalationState::Idle, Some(Escalation { zone_name }))
                }
            }

            (EscalationState::CountingDown { .. }, EscalationInput::Dismiss) => {
                (EscalationState::Idle, None)
            }

            (EscalationState::Idle, EscalationInput::Tick | EscalationInput::Dismiss) => {
                (EscalationState::Idle, None)
            }
        }
    }

    pub fn is_counting_down(&self) -> bool {
        matches!(self, EscalationState::CountingDown { .. })
    }

    pub fn remaining(&self) -> Option<u32> {
        match self {
            EscalationState::CountingDown { remaining, .. } => Some(*remaining),
            EscalationState::Idle => None,
        }
    }

    pub fn alert(&self) -> EmergencyAlert {
        match self {
            EscalationState::Idle => EmergencyAlert::default(),
            EscalationState::CountingDown { zone_name, remaining } => EmergencyAlert {
                active: true,
                zone_name: zone_name.clone(),
                countdown_seconds: *remaining,
            },
        }
    }
}
