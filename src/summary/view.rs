//! Presentation-ready projection of the summary state.

use crate::summary::state::{Screen, SummaryState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryView {
    /// Offer sign-in. `pending` while the request is out.
    SignIn { pending: bool },
    Working { label: String },
    /// Summary text with one "sender: subject" line per source message.
    Summary {
        text: String,
        sources: Vec<String>,
        streaming: bool,
    },
    Failure { message: String },
}

impl From<&SummaryState> for SummaryView {
    fn from(state: &SummaryState) -> Self {
        match &state.screen {
            Screen::SignedOut => Self::SignIn {
                pending: state.signing_in,
            },
            Screen::Fetching => Self::Working {
                label: "Fetching mail…".to_string(),
            },
            Screen::Summarizing {
                partial: None,
                records,
            } => Self::Working {
                label: format!("Summarizing {} messages…", records.len()),
            },
            Screen::Summarizing {
                partial: Some(text),
                records,
            } => Self::Summary {
                text: text.clone(),
                sources: records
                    .iter()
                    .map(|r| format!("{}: {}", r.sender, r.subject))
                    .collect(),
                streaming: true,
            },
            Screen::Finished { records, summary } => Self::Summary {
                text: summary.clone(),
                sources: records
                    .iter()
                    .map(|r| format!("{}: {}", r.sender, r.subject))
                    .collect(),
                streaming: false,
            },
            Screen::Error { message } => Self::Failure {
                message: message.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::MailRecord;

    fn state(screen: Screen) -> SummaryState {
        SummaryState {
            screen,
            run: 1,
            signing_in: false,
        }
    }

    fn records() -> Vec<MailRecord> {
        vec![MailRecord {
            id: "1".into(),
            subject: "Lunch".into(),
            sender: "bob@example.com".into(),
            snippet: "Noon?".into(),
        }]
    }

    #[test]
    fn each_screen_maps_to_one_view() {
        assert_eq!(
            SummaryView::from(&SummaryState::default()),
            SummaryView::SignIn { pending: false }
        );
        assert_eq!(
            SummaryView::from(&state(Screen::Fetching)),
            SummaryView::Working {
                label: "Fetching mail…".into()
            }
        );
        assert_eq!(
            SummaryView::from(&state(Screen::Summarizing {
                records: records(),
                partial: None
            })),
            SummaryView::Working {
                label: "Summarizing 1 messages…".into()
            }
        );
        assert_eq!(
            SummaryView::from(&state(Screen::Error {
                message: "offline".into()
            })),
            SummaryView::Failure {
                message: "offline".into()
            }
        );
    }

    #[test]
    fn partial_and_final_summaries_share_a_view() {
        let partial = SummaryView::from(&state(Screen::Summarizing {
            records: records(),
            partial: Some("You have".into()),
        }));
        assert_eq!(
            partial,
            SummaryView::Summary {
                text: "You have".into(),
                sources: vec!["bob@example.com: Lunch".into()],
                streaming: true
            }
        );

        let done = SummaryView::from(&state(Screen::Finished {
            records: records(),
            summary: "You have lunch.".into(),
        }));
        assert!(matches!(done, SummaryView::Summary { streaming: false, .. }));
    }
}
