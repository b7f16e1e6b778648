//! Summary reducer: drives sign-in, fetch and summary through [`Screen`].

use tracing::{debug, warn};

use crate::llm::StreamUpdate;
use crate::mail::MailRecord;
use crate::store::{Feedback, Reducer};
use crate::summary::state::{Screen, SummaryState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryAction {
    /// App came to the foreground; fetch right away if a credential exists.
    Resumed { has_credential: bool },
    SignInTapped,
    RetryTapped,
    SignOutTapped,
    SignInCompleted(Result<(), String>),
    Fetched {
        run: u64,
        result: Result<Vec<MailRecord>, String>,
    },
    Summary { run: u64, update: StreamUpdate },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryEffect {
    SignIn,
    FetchMail { run: u64 },
    Summarize { run: u64, records: Vec<MailRecord> },
    Feedback(Feedback),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SummaryReducer;

impl Reducer for SummaryReducer {
    type State = SummaryState;
    type Action = SummaryAction;
    type Effect = SummaryEffect;

    fn reduce(
        &self,
        state: &SummaryState,
        action: SummaryAction,
    ) -> (SummaryState, Vec<SummaryEffect>) {
        match action {
            SummaryAction::Resumed { has_credential } => {
                if has_credential && state.screen == Screen::SignedOut && !state.signing_in {
                    start_fetch(state)
                } else {
                    unchanged(state)
                }
            }
            SummaryAction::SignInTapped => {
                if state.screen != Screen::SignedOut || state.signing_in {
                    return rejected(state);
                }
                let next = SummaryState {
                    signing_in: true,
                    ..state.clone()
                };
                (
                    next,
                    vec![
                        SummaryEffect::SignIn,
                        SummaryEffect::Feedback(Feedback::Sent),
                    ],
                )
            }
            SummaryAction::SignInCompleted(result) => {
                if !state.signing_in {
                    debug!("Ignoring sign-in result nobody asked for");
                    return unchanged(state);
                }
                let cleared = SummaryState {
                    signing_in: false,
                    ..state.clone()
                };
                match result {
                    Ok(()) => start_fetch(&cleared),
                    Err(message) => fail(&cleared, message),
                }
            }
            SummaryAction::RetryTapped => match state.screen {
                Screen::Error { .. } => sign_out(state),
                _ => rejected(state),
            },
            SummaryAction::SignOutTapped => {
                if state.screen.is_terminal() {
                    sign_out(state)
                } else {
                    rejected(state)
                }
            }
            SummaryAction::Fetched { run, result } => {
                if run != state.run || state.screen != Screen::Fetching {
                    debug!(run, current = state.run, "Ignoring stale fetch result");
                    return unchanged(state);
                }
                match result {
                    Ok(records) => {
                        let screen = Screen::Summarizing {
                            records: records.clone(),
                            partial: None,
                        };
                        match transition(state, screen) {
                            Some(next) => (next, vec![SummaryEffect::Summarize { run, records }]),
                            None => unchanged(state),
                        }
                    }
                    Err(message) => fail(state, message),
                }
            }
            SummaryAction::Summary { run, update } => {
                let Screen::Summarizing { records, .. } = &state.screen else {
                    debug!(run, screen = %state.screen, "Ignoring summary outside summarizing");
                    return unchanged(state);
                };
                if run != state.run {
                    debug!(run, current = state.run, "Ignoring stale summary update");
                    return unchanged(state);
                }
                match update {
                    StreamUpdate::Partial(text) => {
                        let screen = Screen::Summarizing {
                            records: records.clone(),
                            partial: Some(text),
                        };
                        goto(state, screen, vec![])
                    }
                    StreamUpdate::Final(summary) => {
                        let screen = Screen::Finished {
                            records: records.clone(),
                            summary,
                        };
                        goto(
                            state,
                            screen,
                            vec![SummaryEffect::Feedback(Feedback::Success)],
                        )
                    }
                    StreamUpdate::Failed(message) => fail(state, message),
                }
            }
        }
    }
}

/// Apply a validated screen change, or `None` if it is illegal.
fn transition(state: &SummaryState, screen: Screen) -> Option<SummaryState> {
    if !state.screen.can_transition_to(&screen) {
        warn!(from = %state.screen, to = %screen, "Illegal summary transition ignored");
        return None;
    }
    Some(SummaryState {
        screen,
        ..state.clone()
    })
}

fn goto(
    state: &SummaryState,
    screen: Screen,
    effects: Vec<SummaryEffect>,
) -> (SummaryState, Vec<SummaryEffect>) {
    match transition(state, screen) {
        Some(next) => (next, effects),
        None => unchanged(state),
    }
}

fn start_fetch(state: &SummaryState) -> (SummaryState, Vec<SummaryEffect>) {
    match transition(state, Screen::Fetching) {
        Some(mut next) => {
            next.run = state.run + 1;
            let run = next.run;
            (next, vec![SummaryEffect::FetchMail { run }])
        }
        None => unchanged(state),
    }
}

fn fail(state: &SummaryState, message: String) -> (SummaryState, Vec<SummaryEffect>) {
    goto(
        state,
        Screen::Error { message },
        vec![SummaryEffect::Feedback(Feedback::Failure)],
    )
}

fn sign_out(state: &SummaryState) -> (SummaryState, Vec<SummaryEffect>) {
    goto(state, Screen::SignedOut, vec![])
}

fn unchanged(state: &SummaryState) -> (SummaryState, Vec<SummaryEffect>) {
    (state.clone(), vec![])
}

fn rejected(state: &SummaryState) -> (SummaryState, Vec<SummaryEffect>) {
    (state.clone(), vec![SummaryEffect::Feedback(Feedback::Rejected)])
}
