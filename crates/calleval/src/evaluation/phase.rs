use serde::{Deserialize, Serialize};

const OPENING_WINDOW_SECONDS: f64 = 30.0;
const CLOSING_WINDOW_SECONDS: f64 = 30.0;
const OPENING_FRACTION: f64 = 0.15;
const CLOSING_FRACTION: f64 = 0.85;

/// Coarse position of a segment within the call timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPhase {
    Opening,
    Middle,
    Closing,
}

impl CallPhase {
    pub const fn ordered() -> [Self; 3] {
        [Self::Opening, Self::Middle, Self::Closing]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Opening => "Opening Spiel",
            Self::Middle => "Middle/Climax",
            Self::Closing => "Closing/Wrap-up",
        }
    }
}

/// Phase applicability tag as written in the metric catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseTag {
    All,
    Opening,
    Middle,
    Closing,
}

impl PhaseTag {
    pub const fn ordered() -> [Self; 4] {
        [Self::All, Self::Opening, Self::Middle, Self::Closing]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All Phases",
            Self::Opening => CallPhase::Opening.label(),
            Self::Middle => CallPhase::Middle.label(),
            Self::Closing => CallPhase::Closing.label(),
        }
    }

    pub fn covers(self, phase: CallPhase) -> bool {
        match self {
            Self::All => true,
            Self::Opening => phase == CallPhase::Opening,
            Self::Middle => phase == CallPhase::Middle,
            Self::Closing => phase == CallPhase::Closing,
        }
    }
}

impl From<CallPhase> for PhaseTag {
    fn from(value: CallPhase) -> Self {
        match value {
            CallPhase::Opening => Self::Opening,
            CallPhase::Middle => Self::Middle,
            CallPhase::Closing => Self::Closing,
        }
    }
}

/// Places a segment start time in the call timeline.
///
/// The opening window is the first 30 seconds or 15% of the call, whichever is shorter; the
/// closing window is the last 30 seconds or 15%, whichever is shorter. Opening is checked first,
/// so tiny or zero durations resolve deterministically instead of erroring.
pub fn classify(start_seconds: f64, total_duration_seconds: f64) -> CallPhase {
    let opening_threshold = OPENING_WINDOW_SECONDS.min(total_duration_seconds * OPENING_FRACTION);
    let closing_threshold = (total_duration_seconds - CLOSING_WINDOW_SECONDS)
        .max(total_duration_seconds * CLOSING_FRACTION);

    if start_seconds <= opening_threshold {
        CallPhase::Opening
    } else if start_seconds >= closing_threshold {
        CallPhase::Closing
    } else {
        CallPhase::Middle
    }
}
