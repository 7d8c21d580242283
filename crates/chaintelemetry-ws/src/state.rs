//! Connection lifecycle state machine.
//!
//! `ConnectionMachine` holds no sockets or timers; the connection task
//! reports what happened and acts on the returned [`CloseDecision`].
//!
//! ```text
//! Disconnected --connect--> Connecting --open--> Connected
//! Connecting --error--> Disconnected            (error goes to the caller)
//! Connected --lost--> Reconnecting(1) --fail--> Reconnecting(n+1) ... --> Disconnected
//! Reconnecting(n) --open--> Connected           (attempt counter reset)
//! any --disconnect--> Disconnected
//! ```

use std::fmt;
use std::time::Duration;

use crate::backoff::ReconnectPolicy;
use crate::config::ClientConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Waiting for, or dialing, reconnect attempt `attempt` (1-based).
    Reconnecting { attempt: u32 },
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
        }
    }
}

/// What to do after the connection closed or a reconnect attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// Wait `delay`, then try attempt `attempt`.
    Reconnect { attempt: u32, delay: Duration },
    /// The attempt budget is spent.
    GiveUp { attempts: u32 },
    /// Auto-reconnect is off.
    Stop,
}

#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    attempt: u32,
    auto_reconnect: bool,
    max_attempts: u32,
    policy: ReconnectPolicy,
}

impl ConnectionMachine {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempt: 0,
            auto_reconnect: config.auto_reconnect,
            max_attempts: config.max_reconnect_attempts,
            policy: ReconnectPolicy::new(config.backoff.clone()),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Consecutive failed reconnect attempts since the last open.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn begin_connect(&mut self) -> ConnectionState {
        self.attempt = 0;
        self.state = ConnectionState::Connecting;
        self.state
    }

    pub fn opened(&mut self) -> ConnectionState {
        self.attempt = 0;
        self.state = ConnectionState::Connected;
        self.state
    }

    /// The first connect of a `connect()` call failed. Never retried.
    pub fn initial_failed(&mut self) -> ConnectionState {
        self.disconnected()
    }

    /// An open connection closed or errored.
    pub fn connection_lost(&mut self) -> CloseDecision {
        if !self.auto_reconnect {
            self.disconnected();
            return CloseDecision::Stop;
        }
        self.next_attempt()
    }

    /// Reconnect attempt `self.attempts()` failed.
    pub fn reconnect_failed(&mut self) -> CloseDecision {
        self.next_attempt()
    }

    pub fn disconnected(&mut self) -> ConnectionState {
        self.attempt = 0;
        self.state = ConnectionState::Disconnected;
        self.state
    }

    fn next_attempt(&mut self) -> CloseDecision {
        if self.attempt >= self.max_attempts {
            let attempts = self.attempt;
            self.disconnected();
            return CloseDecision::GiveUp { attempts };
        }
        self.attempt += 1;
        self.state = ConnectionState::Reconnecting {
            attempt: self.attempt,
        };
        CloseDecision::Reconnect {
            attempt: self.attempt,
            delay: self.policy.delay_for_attempt(self.attempt),
        }
    }
}
