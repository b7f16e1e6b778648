//! Chat effect handler: runs replies against the language model.

use std::sync::Arc;

use tracing::info;

use crate::chat::reducer::{ChatAction, ChatEffect};
use crate::llm::{LanguageModel, republish};
use crate::store::{Dispatcher, EffectHandler};

pub struct ChatEffects {
    llm: Arc<dyn LanguageModel>,
}

impl ChatEffects {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }
}

impl EffectHandler<ChatAction, ChatEffect> for ChatEffects {
    fn handle(&self, effect: ChatEffect, dispatcher: &Dispatcher<ChatAction>) {
        match effect {
            ChatEffect::StartResponse { id, prompt } => {
                info!(id, model = self.llm.model_name(), "Starting chat response");
                let stream = self.llm.stream(&prompt);
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    republish(id, stream, |id, update| {
                        dispatcher.send(ChatAction::Response { id, update });
                    })
                    .await;
                });
            }
            ChatEffect::Feedback(feedback) => feedback.emit("chat"),
        }
    }
}
