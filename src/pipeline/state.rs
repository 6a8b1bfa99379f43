//! Pacing loop state

use tokio::time::Instant;

/// Phase of the pacing loop.
///
/// `Idle` and `Capturing` alternate once per frame period. `Stopped` is
/// terminal and entered on cancellation or a fatal capture error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingPhase {
    /// Between iterations, waiting out the rest of the period
    Idle,

    /// Camera read, compose and publish in progress
    Capturing {
        /// When the current iteration began
        started_at: Instant,
    },

    /// Cameras and sink released, no further iterations
    Stopped,
}

impl PacingPhase {
    pub fn can_transition_to(&self, target: &PacingPhase) -> bool {
        use PacingPhase::*;

        match (self, target) {
            (Idle, Capturing { .. }) => true,
            (Capturing { .. }, Idle) => true,

            // cancellation or a fatal read
            (Idle, Stopped) => true,
            (Capturing { .. }, Stopped) => true,

            (Stopped, _) => false,
            _ => false,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PacingPhase::Idle => "Idle",
            PacingPhase::Capturing { .. } => "Capturing",
            PacingPhase::Stopped => "Stopped",
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, PacingPhase::Stopped)
    }

    /// Start of the in-flight iteration, if any.
    pub fn iteration_start(&self) -> Option<Instant> {
        match self {
            PacingPhase::Capturing { started_at } => Some(*started_at),
            _ => None,
        }
    }
}

impl std::fmt::Display for PacingPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}
