//! State machine for tracking one publish of a bot to a target

use serde::{Deserialize, Serialize};

use crate::models::publish::PublishStatusKind;

/// Publish state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishState {
    /// Nothing is being tracked
    Idle,

    /// Publish accepted, waiting for a terminal status (202)
    Pending,

    /// Terminal (200)
    Succeeded,

    /// Terminal (500)
    Failed,
}

impl PublishState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PublishState::Succeeded | PublishState::Failed)
    }
}

/// Publish event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishEvent {
    /// A new publish was started
    Publish,

    /// A status was read back from history
    Observed(PublishStatusKind),

    /// Stop tracking
    Reset,
}

/// What the poller has to do after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    Nothing,

    /// Check the status again after the poll interval
    Recheck,

    /// Emit the completion notification
    Notify(PublishStatusKind),
}

/// Publish FSM
#[derive(Debug, Clone)]
pub struct PublishFsm {
    state: PublishState,
}

impl PublishFsm {
    /// Create a new FSM in idle state
    pub fn new() -> Self {
        Self {
            state: PublishState::Idle,
        }
    }

    /// Get current state
    pub fn state(&self) -> PublishState {
        self.state
    }

    /// Process an event and transition state.
    ///
    /// Terminal states ignore observations until the next `Publish`, which
    /// is what keeps completion notifications to one per publish.
    pub fn process(&mut self, event: PublishEvent) -> PollAction {
        let (new_state, action) = match (self.state, event) {
            (_, PublishEvent::Publish) => (PublishState::Pending, PollAction::Nothing),
            (_, PublishEvent::Reset) => (PublishState::Idle, PollAction::Nothing),

            // From Idle: pick up a publish already in flight, leave finished ones alone
            (PublishState::Idle, PublishEvent::Observed(PublishStatusKind::Pending)) => {
                (PublishState::Pending, PollAction::Recheck)
            }
            (PublishState::Idle, PublishEvent::Observed(PublishStatusKind::Success)) => {
                (PublishState::Succeeded, PollAction::Nothing)
            }
            (PublishState::Idle, PublishEvent::Observed(PublishStatusKind::Failure)) => {
                (PublishState::Failed, PollAction::Nothing)
            }

            // From Pending
            (PublishState::Pending, PublishEvent::Observed(PublishStatusKind::Pending)) => {
                (PublishState::Pending, PollAction::Recheck)
            }
            (PublishState::Pending, PublishEvent::Observed(PublishStatusKind::Success)) => (
                PublishState::Succeeded,
                PollAction::Notify(PublishStatusKind::Success),
            ),
            (PublishState::Pending, PublishEvent::Observed(PublishStatusKind::Failure)) => (
                PublishState::Failed,
                PollAction::Notify(PublishStatusKind::Failure),
            ),

            (state @ (PublishState::Succeeded | PublishState::Failed), PublishEvent::Observed(_)) => {
                (state, PollAction::Nothing)
            }
        };

        self.state = new_state;
        action
    }
}

impl Default for PublishFsm {
    fn default() -> Self {
        Self::new()
    }
}
