//! Flight status codes and the policy that picks one for a request

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Flight status as understood by the app contract.
///
/// The numeric codes are wire values consumed by the contract and must not
/// change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Unknown,
    OnTime,
    LateAirline,
    LateWeather,
    LateTechnical,
    LateOther,
}

impl StatusCode {
    pub const ALL: [StatusCode; 6] = [
        StatusCode::Unknown,
        StatusCode::OnTime,
        StatusCode::LateAirline,
        StatusCode::LateWeather,
        StatusCode::LateTechnical,
        StatusCode::LateOther,
    ];

    pub const fn code(self) -> u8 {
        match self {
            StatusCode::Unknown => 0,
            StatusCode::OnTime => 10,
            StatusCode::LateAirline => 20,
            StatusCode::LateWeather => 30,
            StatusCode::LateTechnical => 40,
            StatusCode::LateOther => 50,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            StatusCode::Unknown => "STATUS_CODE_UNKNOWN",
            StatusCode::OnTime => "STATUS_CODE_ON_TIME",
            StatusCode::LateAirline => "STATUS_CODE_LATE_AIRLINE",
            StatusCode::LateWeather => "STATUS_CODE_LATE_WEATHER",
            StatusCode::LateTechnical => "STATUS_CODE_LATE_TECHNICAL",
            StatusCode::LateOther => "STATUS_CODE_LATE_OTHER",
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.code() == code)
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.label() == label)
    }

    /// Only a delay caused by the airline pays out to insurees.
    pub const fn credits_insurees(self) -> bool {
        matches!(self, StatusCode::LateAirline)
    }
}

/// How the responder decides which status to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    /// Past flights are reported as `LateAirline`, future ones as `OnTime`.
    #[default]
    Deterministic,
    /// Past flights get a uniformly random late code (20..=50).
    Random,
}

impl StatusPolicy {
    pub fn select(self, scheduled: u64, now: DateTime<Utc>) -> StatusCode {
        match self {
            StatusPolicy::Deterministic => select_status(scheduled, now),
            StatusPolicy::Random => {
                if is_past(scheduled, now) {
                    let late = &StatusCode::ALL[2..];
                    late[rand::thread_rng().gen_range(0..late.len())]
                } else {
                    StatusCode::OnTime
                }
            }
        }
    }
}

impl std::str::FromStr for StatusPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deterministic" => Ok(StatusPolicy::Deterministic),
            "random" => Ok(StatusPolicy::Random),
            other => Err(format!("unknown status policy: {other}")),
        }
    }
}

/// Status for a flight scheduled at `scheduled` (unix seconds) as seen at `now`.
pub fn select_status(scheduled: u64, now: DateTime<Utc>) -> StatusCode {
    if is_past(scheduled, now) {
        StatusCode::LateAirline
    } else {
        StatusCode::OnTime
    }
}

// Compared in milliseconds so a flight scheduled earlier within the current
// second already counts as departed.
fn is_past(scheduled: u64, now: DateTime<Utc>) -> bool {
    (scheduled as i128) * 1000 < now.timestamp_millis() as i128
}
