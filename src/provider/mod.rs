pub mod cache;
pub mod openf1;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use cache::{ScheduleCache, SessionCache, SessionKey};
pub use openf1::OpenF1Provider;

use crate::errors::DashboardError;
use crate::session::SessionData;

/// Earliest season the data provider carries full timing data for.
pub const MIN_SEASON: u16 = 2019;

/// The kind of session within one Grand Prix weekend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    Race,
    Qualifying,
    Sprint,
    Practice1,
    Practice2,
    Practice3,
}

impl SessionKind {
    pub const ALL: [SessionKind; 6] = [
        SessionKind::Race,
        SessionKind::Qualifying,
        SessionKind::Sprint,
        SessionKind::Practice1,
        SessionKind::Practice2,
        SessionKind::Practice3,
    ];

    /// Short code used in the UI and the config file.
    pub fn code(&self) -> &'static str {
        match self {
            SessionKind::Race => "R",
            SessionKind::Qualifying => "Q",
            SessionKind::Sprint => "S",
            SessionKind::Practice1 => "FP1",
            SessionKind::Practice2 => "FP2",
            SessionKind::Practice3 => "FP3",
        }
    }

    /// Session name as the external provider spells it.
    pub fn provider_name(&self) -> &'static str {
        match self {
            SessionKind::Race => "Race",
            SessionKind::Qualifying => "Qualifying",
            SessionKind::Sprint => "Sprint",
            SessionKind::Practice1 => "Practice 1",
            SessionKind::Practice2 => "Practice 2",
            SessionKind::Practice3 => "Practice 3",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().find(|k| k.code() == code).copied()
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.provider_name())
    }
}

/// A source of season schedules and session datasets. Implemented by the HTTP
/// provider; tests substitute an in-memory implementation.
pub trait SessionProvider: Send + Sync {
    /// Event names for one season, in calendar order.
    fn event_schedule(&self, year: u16) -> Result<Vec<String>, DashboardError>;

    /// The full dataset for one session: drivers, laps, and telemetry.
    fn load_session(
        &self,
        year: u16,
        event: &str,
        kind: SessionKind,
    ) -> Result<SessionData, DashboardError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_kind_codes_round_trip() {
        for kind in SessionKind::ALL {
            assert_eq!(SessionKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(SessionKind::from_code("FP4"), None);
    }

    #[test]
    fn test_session_kind_provider_names() {
        assert_eq!(SessionKind::Race.provider_name(), "Race");
        assert_eq!(SessionKind::Practice3.provider_name(), "Practice 3");
        assert_eq!(SessionKind::Sprint.to_string(), "Sprint");
    }
}
