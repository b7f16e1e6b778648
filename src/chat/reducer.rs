//! Chat reducer: folds user input and streamed replies into the transcript.

use tracing::{debug, warn};

use crate::chat::model::{AssistantStatus, ChatEntry, ChatState};
use crate::llm::StreamUpdate;
use crate::store::{Feedback, Reducer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    /// The input field changed.
    InputChanged(String),
    /// Send explicit text.
    SendMessage(String),
    /// Send the current draft.
    SendDraft,
    /// Drop the transcript.
    ClearConversation,
    /// Streamed reply step for assistant entry `id`.
    Response { id: u64, update: StreamUpdate },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEffect {
    /// Start generating the reply for assistant entry `id`.
    StartResponse { id: u64, prompt: String },
    Feedback(Feedback),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ChatReducer;

impl Reducer for ChatReducer {
    type State = ChatState;
    type Action = ChatAction;
    type Effect = ChatEffect;

    fn reduce(&self, state: &ChatState, action: ChatAction) -> (ChatState, Vec<ChatEffect>) {
        match action {
            ChatAction::InputChanged(text) => {
                let mut next = state.clone();
                next.draft = text;
                (next, vec![])
            }
            ChatAction::SendMessage(text) => send(state, text),
            ChatAction::SendDraft => send(state, state.draft.clone()),
            ChatAction::ClearConversation => {
                if state.is_busy() {
                    return (state.clone(), vec![ChatEffect::Feedback(Feedback::Rejected)]);
                }
                let next = ChatState {
                    entries: Vec::new(),
                    draft: state.draft.clone(),
                    next_id: state.next_id,
                };
                (next, vec![])
            }
            ChatAction::Response { id, update } => apply_response(state, id, update),
        }
    }
}

fn send(state: &ChatState, text: String) -> (ChatState, Vec<ChatEffect>) {
    if !state.can_send(&text) {
        debug!(busy = state.is_busy(), "Send rejected");
        return (state.clone(), vec![ChatEffect::Feedback(Feedback::Rejected)]);
    }

    let text = text.trim().to_string();
    let prompt = build_prompt(&state.entries, &text);
    let user_id = state.next_id;
    let reply_id = user_id + 1;

    let mut next = state.clone();
    next.entries.push(ChatEntry::User { id: user_id, text });
    next.entries.push(ChatEntry::Assistant {
        id: reply_id,
        status: AssistantStatus::Loading,
    });
    next.next_id = reply_id + 1;
    next.draft.clear();

    (
        next,
        vec![
            ChatEffect::StartResponse {
                id: reply_id,
                prompt,
            },
            ChatEffect::Feedback(Feedback::Sent),
        ],
    )
}

fn apply_response(
    state: &ChatState,
    id: u64,
    update: StreamUpdate,
) -> (ChatState, Vec<ChatEffect>) {
    match state.assistant(id) {
        Some(status) if !status.is_terminal() => {}
        Some(_) => {
            debug!(id, "Ignoring update for finished reply");
            return (state.clone(), vec![]);
        }
        None => {
            warn!(id, "Ignoring update for unknown reply");
            return (state.clone(), vec![]);
        }
    }

    let mut effects = Vec::new();
    let mut next = state.clone();
    for entry in next.entries.iter_mut() {
        let ChatEntry::Assistant { id: eid, status } = entry else {
            continue;
        };
        if *eid != id {
            continue;
        }
        *status = match update {
            StreamUpdate::Partial(text) => AssistantStatus::Streaming(text),
            StreamUpdate::Final(text) => {
                effects.push(ChatEffect::Feedback(Feedback::Success));
                AssistantStatus::Finished(text)
            }
            StreamUpdate::Failed(message) => {
                effects.push(ChatEffect::Feedback(Feedback::Failure));
                AssistantStatus::Error {
                    partial: status.text().map(str::to_string),
                    message,
                }
            }
        };
        break;
    }
    (next, effects)
}

/// Transcript of completed turns followed by the new message. A user line
/// whose reply failed is dropped along with it.
fn build_prompt(entries: &[ChatEntry], text: &str) -> String {
    let mut prompt = String::new();
    for pair in entries.windows(2) {
        if let [
            ChatEntry::User { text: asked, .. },
            ChatEntry::Assistant {
                status: AssistantStatus::Finished(reply),
                ..
            },
        ] = pair
        {
            prompt.push_str("User: ");
            prompt.push_str(asked);
            prompt.push_str("\nAssistant: ");
            prompt.push_str(reply);
            prompt.push('\n');
        }
    }
    if prompt.is_empty() {
        return text.to_string();
    }
    prompt.push_str("User: ");
    prompt.push_str(text);
    prompt
}
