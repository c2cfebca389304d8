//! Connection state machine
//!
//! A connection attempt always walks Disconnected -> Connecting -> Connected
//! -> Disconnected. A failed attempt may go straight from Connecting back to
//! Disconnected. Every other transition is rejected.

use serde::Serialize;
use thiserror::Error;

/// State of the live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    /// Status indicator text
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Rejected state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid connection transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: ConnectionState,
    pub to: ConnectionState,
}

/// Owns the current connection state and the attempt counter
#[derive(Debug, Clone)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
    attempts: u64,
}

impl ConnectionStateMachine {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Number of connection attempts started so far
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Disconnected -> Connecting
    pub fn begin_attempt(&mut self) -> Result<ConnectionState, TransitionError> {
        self.transition(ConnectionState::Connecting)?;
        self.attempts += 1;
        Ok(self.state)
    }

    /// Connecting -> Connected
    pub fn opened(&mut self) -> Result<ConnectionState, TransitionError> {
        self.transition(ConnectionState::Connected)
    }

    /// Connecting | Connected -> Disconnected
    pub fn closed(&mut self) -> Result<ConnectionState, TransitionError> {
        self.transition(ConnectionState::Disconnected)
    }

    fn transition(&mut self, to: ConnectionState) -> Result<ConnectionState, TransitionError> {
        use ConnectionState::*;

        let allowed = matches!(
            (self.state, to),
            (Disconnected, Connecting) | (Connecting, Connected) | (Connecting, Disconnected) | (Connected, Disconnected)
        );
        if !allowed {
            return Err(TransitionError { from: self.state, to });
        }

        tracing::debug!(from = %self.state, to = %to, "Connection state changed");
        self.state = to;
        Ok(to)
    }
}

impl Default for ConnectionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let mut sm = ConnectionStateMachine::new();
        assert_eq!(sm.state(), ConnectionState::Disconnected);

        for _ in 0..3 {
            sm.begin_attempt().unwrap();
            sm.opened().unwrap();
            assert!(sm.is_connected());
            sm.closed().unwrap();
        }
        assert_eq!(sm.attempts(), 3);
    }

    #[test]
    fn test_failed_attempt() {
        let mut sm = ConnectionStateMachine::new();
        sm.begin_attempt().unwrap();
        assert_eq!(sm.closed().unwrap(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_cannot_skip_connecting() {
        let mut sm = ConnectionStateMachine::new();
        let err = sm.opened().unwrap_err();
        assert_eq!(err.from, ConnectionState::Disconnected);
        assert_eq!(err.to, ConnectionState::Connected);
        assert_eq!(sm.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_no_double_connected() {
        let mut sm = ConnectionStateMachine::new();
        sm.begin_attempt().unwrap();
        sm.opened().unwrap();
        assert!(sm.opened().is_err());
        assert!(sm.begin_attempt().is_err());
    }

    #[test]
    fn test_no_double_disconnect() {
        let mut sm = ConnectionStateMachine::new();
        assert!(sm.closed().is_err());
    }

    #[test]
    fn test_error_display() {
        let err = TransitionError {
            from: ConnectionState::Disconnected,
            to: ConnectionState::Connected,
        };
        assert_eq!(
            err.to_string(),
            "Invalid connection transition: Disconnected -> Connected"
        );
    }
}
