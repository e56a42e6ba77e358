// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-turn state machine.

use recall_core::RecallError;
use serde::Serialize;
use tracing::debug;

/// Where a turn is in its lifecycle.
///
/// The happy path is linear. Any non-terminal state may jump to
/// [`TurnState::FallbackResponse`]. Both `Persisted` and `FallbackResponse`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TurnState {
    Received,
    SessionResolved,
    ContextBuilt,
    CompletionRequested,
    ResponseReceived,
    Persisted,
    FallbackResponse,
}

impl TurnState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TurnState::Persisted | TurnState::FallbackResponse)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: TurnState) -> bool {
        use TurnState::*;
        if self.is_terminal() {
            return false;
        }
        if next == FallbackResponse {
            return true;
        }
        matches!(
            (self, next),
            (Received, SessionResolved)
                | (SessionResolved, ContextBuilt)
                | (ContextBuilt, CompletionRequested)
                | (CompletionRequested, ResponseReceived)
                | (ResponseReceived, Persisted)
        )
    }
}

/// Tracks one turn's state and rejects illegal transitions.
#[derive(Debug)]
pub struct TurnMachine {
    user_id: String,
    state: TurnState,
}

impl TurnMachine {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            state: TurnState::Received,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn advance(&mut self, next: TurnState) -> Result<(), RecallError> {
        if !self.state.can_transition_to(next) {
            return Err(RecallError::Internal(format!(
                "illegal turn transition {} -> {next}",
                self.state
            )));
        }
        debug!(user_id = %self.user_id, from = %self.state, to = %next, "turn state");
        self.state = next;
        Ok(())
    }

    /// Moves to `FallbackResponse` unless already terminal.
    pub fn fall_back(&mut self) {
        if !self.state.is_terminal() {
            debug!(user_id = %self.user_id, from = %self.state, "turn falling back");
            self.state = TurnState::FallbackResponse;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TurnState::*;

    #[test]
    fn happy_path_is_accepted() {
        let mut machine = TurnMachine::new("u1");
        for next in [
            SessionResolved,
            ContextBuilt,
            CompletionRequested,
            ResponseReceived,
            Persisted,
        ] {
            machine.advance(next).unwrap();
        }
        assert_eq!(machine.state(), Persisted);
    }

    #[test]
    fn skipping_a_state_is_rejected() {
        let mut machine = TurnMachine::new("u1");
        let err = machine.advance(ContextBuilt).unwrap_err();
        assert!(err.to_string().contains("received -> context_built"), "got: {err}");
        assert_eq!(machine.state(), Received);
    }

    #[test]
    fn any_open_state_can_fall_back() {
        for from in [
            Received,
            SessionResolved,
            ContextBuilt,
            CompletionRequested,
            ResponseReceived,
        ] {
            assert!(from.can_transition_to(FallbackResponse));
        }
    }

    #[test]
    fn terminal_states_are_final() {
        for terminal in [Persisted, FallbackResponse] {
            assert!(!terminal.can_transition_to(FallbackResponse));
            assert!(!terminal.can_transition_to(Received));
        }
        let mut machine = TurnMachine::new("u1");
        machine.fall_back();
        machine.fall_back();
        assert_eq!(machine.state(), FallbackResponse);
        assert!(machine.advance(Persisted).is_err());
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&CompletionRequested).unwrap(),
            "\"completion_requested\""
        );
        assert_eq!(FallbackResponse.to_string(), "fallback_response");
    }
}
