//! Mail summary state machine.

use crate::mail::MailRecord;

/// The screen the summary workflow is on.
///
/// Progresses SignedOut → Fetching → Summarizing → Finished, with Error
/// reachable from each working step and both endings leading back to
/// SignedOut.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Screen {
    #[default]
    SignedOut,
    Fetching,
    Summarizing {
        records: Vec<MailRecord>,
        partial: Option<String>,
    },
    Finished {
        records: Vec<MailRecord>,
        summary: String,
    },
    Error {
        message: String,
    },
}

impl Screen {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &Screen) -> bool {
        use Screen::*;
        matches!(
            (self, target),
            (SignedOut, Fetching)
                | (SignedOut, Error { .. })
                | (Fetching, Summarizing { .. })
                | (Fetching, Error { .. })
                | (Summarizing { .. }, Summarizing { .. })
                | (Summarizing { .. }, Finished { .. })
                | (Summarizing { .. }, Error { .. })
                | (Finished { .. }, SignedOut)
                | (Error { .. }, SignedOut)
        )
    }

    /// Finished and Error end a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Error { .. })
    }

    /// A fetch or summary is in flight.
    pub fn is_working(&self) -> bool {
        matches!(self, Self::Fetching | Self::Summarizing { .. })
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SignedOut => "signed_out",
            Self::Fetching => "fetching",
            Self::Summarizing { .. } => "summarizing",
            Self::Finished { .. } => "finished",
            Self::Error { .. } => "error",
        };
        write!(f, "{s}")
    }
}

/// Immutable snapshot of the summary workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryState {
    pub screen: Screen,
    /// Identity of the current run; bumped each time fetching starts.
    pub run: u64,
    /// A sign-in request is outstanding.
    pub signing_in: bool,
}
