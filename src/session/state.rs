//! Session state machine.

/// Lifecycle state of a console session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Session exists but its process has not been spawned.
    #[default]
    Created,
    /// The console process is running and bound to its output.
    Running,
    /// The process exited or was stopped.
    Terminated,
    /// Resources have been released; no further transitions possible.
    Disposed,
}

impl SessionState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Created -> Running
    /// - Running -> Terminated
    /// - any non-disposed state -> Disposed
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (*self, target),
            (Created, Running)
                | (Running, Terminated)
                | (Created, Disposed)
                | (Running, Disposed)
                | (Terminated, Disposed)
        )
    }

    /// Attempt to transition to a new state.
    ///
    /// Returns `Ok(())` if the transition is valid, or an error otherwise.
    pub fn transition_to(&mut self, target: SessionState) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::ConsoleError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Disposed)
    }

    /// Check if the session can accept input.
    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_lifecycle() {
        let mut state = SessionState::Created;
        assert!(state.transition_to(SessionState::Running).is_ok());
        assert!(state.transition_to(SessionState::Terminated).is_ok());
        assert!(state.transition_to(SessionState::Disposed).is_ok());
        assert_eq!(state, SessionState::Disposed);
    }

    #[test]
    fn test_dispose_from_any_live_state() {
        for from in [
            SessionState::Created,
            SessionState::Running,
            SessionState::Terminated,
        ] {
            assert!(from.can_transition_to(SessionState::Disposed));
        }
    }

    #[test]
    fn test_invalid_transitions() {
        let mut state = SessionState::Created;
        assert!(state.transition_to(SessionState::Terminated).is_err());
        assert_eq!(state, SessionState::Created);

        let mut state = SessionState::Terminated;
        assert!(state.transition_to(SessionState::Running).is_err());

        let mut state = SessionState::Disposed;
        assert!(state.transition_to(SessionState::Running).is_err());
        assert!(state.transition_to(SessionState::Disposed).is_err());
    }

    #[test]
    fn test_predicates() {
        assert!(SessionState::Disposed.is_terminal());
        assert!(!SessionState::Terminated.is_terminal());
        assert!(SessionState::Running.is_running());
        assert!(!SessionState::Created.is_running());
    }

    #[test]
    fn test_default() {
        assert_eq!(SessionState::default(), SessionState::Created);
    }
}
