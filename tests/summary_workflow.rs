//! End-to-end tests for the mail summary store with stub collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use secrecy::SecretString;
use tokio::sync::watch;
use tokio::time::timeout;

use pocket_assist::error::{LlmError, MailError};
use pocket_assist::llm::{LanguageModel, TextStream};
use pocket_assist::mail::model::{Header, MessageMetadata, MessagePage, MessagePayload, MessageRef};
use pocket_assist::mail::{MailClient, MailTransport, RetryPolicy, StaticToken, TokenProvider};
use pocket_assist::store::{Store, StoreHandle};
use pocket_assist::summary::effects::NO_MESSAGES;
use pocket_assist::summary::{
    Screen, SummaryAction, SummaryEffects, SummaryReducer, SummaryState, SummaryView,
};

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Single-page mailbox; optionally fails listing or throttles once.
struct StubMailbox {
    ids: Vec<&'static str>,
    list_failure: Option<u16>,
    throttle_once: AtomicUsize,
}

impl StubMailbox {
    fn with(ids: Vec<&'static str>) -> Self {
        Self {
            ids,
            list_failure: None,
            throttle_once: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MailTransport for StubMailbox {
    async fn list_page(
        &self,
        _query: &str,
        page_size: u32,
        _page_token: Option<&str>,
    ) -> Result<MessagePage, MailError> {
        if let Some(status) = self.list_failure {
            return Err(MailError::Http {
                status,
                message: "Backend Error".to_string(),
            });
        }
        if self.throttle_once.swap(0, Ordering::SeqCst) > 0 {
            return Err(MailError::RateLimited { status: 429 });
        }
        Ok(MessagePage {
            messages: self
                .ids
                .iter()
                .take(page_size as usize)
                .map(|id| MessageRef {
                    id: id.to_string(),
                    thread_id: None,
                })
                .collect(),
            next_page_token: None,
        })
    }

    async fn get_message(&self, id: &str) -> Result<MessageMetadata, MailError> {
        Ok(MessageMetadata {
            id: id.to_string(),
            snippet: Some(format!("snippet {id}")),
            payload: Some(MessagePayload {
                headers: vec![
                    Header {
                        name: "Subject".to_string(),
                        value: format!("Subject {id}"),
                    },
                    Header {
                        name: "From".to_string(),
                        value: "boss@example.com".to_string(),
                    },
                ],
            }),
        })
    }
}

/// Streams a fixed summary and counts prompts.
#[derive(Default)]
struct StubSummarizer {
    calls: AtomicUsize,
    fail: bool,
}

impl LanguageModel for StubSummarizer {
    fn model_name(&self) -> &str {
        "stub"
    }

    fn stream(&self, prompt: &str) -> TextStream {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let count = prompt.matches("Subject ").count();
        let items: Vec<Result<String, LlmError>> = if self.fail {
            vec![
                Ok("You have".to_string()),
                Err(LlmError::RequestFailed {
                    provider: "stub".to_string(),
                    reason: "connection reset".to_string(),
                }),
            ]
        } else {
            vec![
                Ok("You have".to_string()),
                Ok(format!("You have {count} emails.")),
            ]
        };
        Box::pin(stream::iter(items))
    }
}

struct Harness {
    store: StoreHandle<SummaryReducer>,
    llm: Arc<StubSummarizer>,
}

fn harness(auth: Arc<dyn TokenProvider>, mailbox: StubMailbox, llm: StubSummarizer) -> Harness {
    let client = MailClient::new(
        Arc::new(mailbox),
        RetryPolicy::new(3, Duration::from_millis(1)),
    );
    let llm = Arc::new(llm);
    let store = Store::spawn(
        SummaryReducer,
        SummaryState::default(),
        SummaryEffects::new(
            auth,
            Arc::new(client),
            Arc::clone(&llm) as Arc<dyn LanguageModel>,
            "in:inbox",
            10,
        ),
    );
    Harness { store, llm }
}

fn signed_in() -> Arc<dyn TokenProvider> {
    Arc::new(StaticToken::new(SecretString::from("token")))
}

/// Wait until the screen satisfies `done`, returning that snapshot.
async fn settle(
    rx: &mut watch::Receiver<Arc<SummaryState>>,
    done: impl FnMut(&Arc<SummaryState>) -> bool,
) -> Arc<SummaryState> {
    timeout(TEST_TIMEOUT, rx.wait_for(done))
        .await
        .expect("workflow did not settle")
        .expect("store stopped")
        .clone()
}

fn terminal(state: &Arc<SummaryState>) -> bool {
    state.screen.is_terminal()
}

#[tokio::test]
async fn sign_in_fetch_and_summarize() {
    let h = harness(
        signed_in(),
        StubMailbox::with(vec!["a", "b", "c"]),
        StubSummarizer::default(),
    );
    let mut rx = h.store.subscribe();

    h.store.send(SummaryAction::SignInTapped);
    let state = settle(&mut rx, terminal).await;

    match &state.screen {
        Screen::Finished { records, summary } => {
            assert_eq!(summary, "You have 3 emails.");
            let subjects: Vec<_> = records.iter().map(|r| r.subject.as_str()).collect();
            assert_eq!(subjects, vec!["Subject a", "Subject b", "Subject c"]);
        }
        other => panic!("expected finished, got {other:?}"),
    }
    assert_eq!(state.run, 1);
    assert_eq!(h.llm.calls.load(Ordering::SeqCst), 1);

    match SummaryView::from(&*state) {
        SummaryView::Summary {
            sources, streaming, ..
        } => {
            assert_eq!(sources[0], "boss@example.com: Subject a");
            assert!(!streaming);
        }
        other => panic!("expected summary view, got {other:?}"),
    }
}

#[tokio::test]
async fn resume_with_credential_skips_sign_in() {
    let h = harness(
        signed_in(),
        StubMailbox::with(vec!["a"]),
        StubSummarizer::default(),
    );
    let mut rx = h.store.subscribe();

    h.store.send(SummaryAction::Resumed {
        has_credential: true,
    });
    let state = settle(&mut rx, terminal).await;
    assert!(matches!(state.screen, Screen::Finished { .. }));
}

#[tokio::test]
async fn signed_out_credential_fails_sign_in() {
    let h = harness(
        Arc::new(StaticToken::signed_out()),
        StubMailbox::with(vec!["a"]),
        StubSummarizer::default(),
    );
    let mut rx = h.store.subscribe();

    h.store.send(SummaryAction::SignInTapped);
    let state = settle(&mut rx, terminal).await;
    match &state.screen {
        Screen::Error { message } => assert!(message.contains("Not signed in")),
        other => panic!("expected error, got {other:?}"),
    }
    assert_eq!(state.run, 0);

    h.store.send(SummaryAction::RetryTapped);
    let state = settle(&mut rx, |s| s.screen == Screen::SignedOut).await;
    assert!(!state.signing_in);
}

#[tokio::test]
async fn fetch_failure_never_summarizes() {
    let mailbox = StubMailbox {
        list_failure: Some(500),
        ..StubMailbox::with(vec!["a"])
    };
    let h = harness(signed_in(), mailbox, StubSummarizer::default());
    let mut rx = h.store.subscribe();

    h.store.send(SummaryAction::SignInTapped);
    let state = settle(&mut rx, terminal).await;
    match &state.screen {
        Screen::Error { message } => assert!(message.contains("Backend Error")),
        other => panic!("expected error, got {other:?}"),
    }
    assert_eq!(h.llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn throttled_listing_is_absorbed() {
    let mailbox = StubMailbox::with(vec!["a", "b"]);
    mailbox.throttle_once.store(1, Ordering::SeqCst);
    let h = harness(signed_in(), mailbox, StubSummarizer::default());
    let mut rx = h.store.subscribe();

    h.store.send(SummaryAction::SignInTapped);
    let state = settle(&mut rx, terminal).await;
    assert!(matches!(
        &state.screen,
        Screen::Finished { summary, .. } if summary == "You have 2 emails."
    ));
}

#[tokio::test]
async fn empty_inbox_finishes_without_the_model() {
    let h = harness(
        signed_in(),
        StubMailbox::with(vec![]),
        StubSummarizer::default(),
    );
    let mut rx = h.store.subscribe();

    h.store.send(SummaryAction::SignInTapped);
    let state = settle(&mut rx, terminal).await;
    match &state.screen {
        Screen::Finished { records, summary } => {
            assert!(records.is_empty());
            assert_eq!(summary, NO_MESSAGES);
        }
        other => panic!("expected finished, got {other:?}"),
    }
    assert_eq!(h.llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn summary_failure_is_error_and_sign_out_recovers() {
    let h = harness(
        signed_in(),
        StubMailbox::with(vec!["a"]),
        StubSummarizer {
            fail: true,
            ..Default::default()
        },
    );
    let mut rx = h.store.subscribe();

    h.store.send(SummaryAction::SignInTapped);
    let state = settle(&mut rx, terminal).await;
    match &state.screen {
        Screen::Error { message } => assert!(message.contains("connection reset")),
        other => panic!("expected error, got {other:?}"),
    }

    h.store.send(SummaryAction::SignOutTapped);
    settle(&mut rx, |s| s.screen == Screen::SignedOut).await;

    // A second run gets a fresh identity.
    h.store.send(SummaryAction::SignInTapped);
    let state = settle(&mut rx, |s| s.run == 2 && s.screen.is_terminal()).await;
    assert!(matches!(state.screen, Screen::Error { .. }));
}
