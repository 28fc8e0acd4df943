//! Per-utterance turn state machine.
//!
//! Every utterance the pipeline handles moves through:
//! - Received -> Classified (command classifier ran)
//! - Classified -> FastPath (command or file search, no chat call)
//! - Classified -> ContextBuilding (conversational, context fusion runs)
//! - ContextBuilding -> Dispatched (chat call in flight)
//! - FastPath -> Completed, Dispatched -> Completed
//! - ContextBuilding -> Failed, Dispatched -> Failed

use std::fmt;

use tracing::debug;
use uuid::Uuid;

use crate::error::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnState {
    Received,
    Classified,
    FastPath,
    ContextBuilding,
    Dispatched,
    Completed,
    Failed,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnState::Received => "Received",
            TurnState::Classified => "Classified",
            TurnState::FastPath => "FastPath",
            TurnState::ContextBuilding => "ContextBuilding",
            TurnState::Dispatched => "Dispatched",
            TurnState::Completed => "Completed",
            TurnState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

impl TurnState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &TurnState) -> bool {
        matches!(
            (self, target),
            (TurnState::Received, TurnState::Classified)
                | (TurnState::Classified, TurnState::FastPath)
                | (TurnState::Classified, TurnState::ContextBuilding)
                | (TurnState::ContextBuilding, TurnState::Dispatched)
                | (TurnState::FastPath, TurnState::Completed)
                | (TurnState::Dispatched, TurnState::Completed)
                // Failure transitions
                | (TurnState::ContextBuilding, TurnState::Failed)
                | (TurnState::Dispatched, TurnState::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::Completed | TurnState::Failed)
    }
}

/// Tracks one turn through [`TurnState`].
///
/// Owned by the pipeline task, so no locking.
#[derive(Debug, Clone)]
pub struct Turn {
    id: Uuid,
    state: TurnState,
}

impl Default for Turn {
    fn default() -> Self {
        Self::new()
    }
}

impl Turn {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: TurnState::Received,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn advance(&mut self, target: TurnState) -> Result<(), ChatError> {
        if !self.state.can_transition_to(&target) {
            return Err(ChatError::InvalidTransition {
                from: self.state,
                to: target,
            });
        }
        debug!(turn_id = %self.id, "Turn state: {} -> {}", self.state, target);
        self.state = target;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
