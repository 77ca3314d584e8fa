//! Status widget projection.
//!
//! The mapping from [`ConnectionState`] to what the host shows is fixed and
//! stateless; hosts apply a [`StatusView`] to whatever widgets they own.

use crate::ConnectionState;

/// Color class of the connection indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    /// Connected.
    Positive,
    /// Disconnected.
    Negative,
    /// Transport reported a fault.
    Warning,
    /// Connection attempt in progress.
    Pending,
}

impl Indicator {
    /// CSS-style color for hosts that paint the indicator directly.
    pub fn color(self) -> &'static str {
        match self {
            Self::Positive => "#4caf50",
            Self::Negative => "#f44336",
            Self::Warning => "#ff9800",
            Self::Pending => "#9e9e9e",
        }
    }
}

/// What the status widgets should display for a given state.
///
/// `None` for an affordance means "leave it as it is".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusView {
    pub indicator: Indicator,
    pub text: &'static str,
    pub connect_enabled: Option<bool>,
    pub disconnect_enabled: Option<bool>,
}

impl StatusView {
    pub fn for_state(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Open => Self {
                indicator: Indicator::Positive,
                text: "connected",
                connect_enabled: Some(false),
                disconnect_enabled: Some(true),
            },
            ConnectionState::Closed => Self {
                indicator: Indicator::Negative,
                text: "disconnected",
                connect_enabled: Some(true),
                disconnect_enabled: Some(false),
            },
            ConnectionState::Errored => Self {
                indicator: Indicator::Warning,
                text: "connection error",
                connect_enabled: None,
                disconnect_enabled: None,
            },
            ConnectionState::Idle => Self {
                indicator: Indicator::Pending,
                text: "connecting",
                connect_enabled: None,
                disconnect_enabled: None,
            },
        }
    }
}

impl From<ConnectionState> for StatusView {
    fn from(state: ConnectionState) -> Self {
        Self::for_state(state)
    }
}
