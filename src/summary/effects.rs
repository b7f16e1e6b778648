//! Summary effect handler: sign-in, mail fetch and summary generation.

use std::sync::Arc;

use tracing::{info, warn};

use crate::llm::{LanguageModel, StreamUpdate, republish};
use crate::mail::{MailClient, MailRecord, TokenProvider};
use crate::store::{Dispatcher, EffectHandler};
use crate::summary::reducer::{SummaryAction, SummaryEffect};

/// Final text when the query matched nothing.
pub const NO_MESSAGES: &str = "No new messages to summarize.";

pub struct SummaryEffects {
    auth: Arc<dyn TokenProvider>,
    mail: Arc<MailClient>,
    llm: Arc<dyn LanguageModel>,
    query: String,
    limit: usize,
}

impl SummaryEffects {
    pub fn new(
        auth: Arc<dyn TokenProvider>,
        mail: Arc<MailClient>,
        llm: Arc<dyn LanguageModel>,
        query: impl Into<String>,
        limit: usize,
    ) -> Self {
        Self {
            auth,
            mail,
            llm,
            query: query.into(),
            limit,
        }
    }
}

impl EffectHandler<SummaryAction, SummaryEffect> for SummaryEffects {
    fn handle(&self, effect: SummaryEffect, dispatcher: &Dispatcher<SummaryAction>) {
        let dispatcher = dispatcher.clone();
        match effect {
            SummaryEffect::SignIn => {
                let auth = Arc::clone(&self.auth);
                tokio::spawn(async move {
                    let result = match auth.access_token().await {
                        Ok(_) => {
                            info!("Mail sign-in succeeded");
                            Ok(())
                        }
                        Err(e) => {
                            warn!(error = %e, "Mail sign-in failed");
                            Err(e.to_string())
                        }
                    };
                    dispatcher.send(SummaryAction::SignInCompleted(result));
                });
            }
            SummaryEffect::FetchMail { run } => {
                let mail = Arc::clone(&self.mail);
                let query = self.query.clone();
                let limit = self.limit;
                tokio::spawn(async move {
                    let result = mail.fetch_records(&query, limit).await.map_err(|e| {
                        warn!(run, error = %e, "Mail fetch failed");
                        e.to_string()
                    });
                    dispatcher.send(SummaryAction::Fetched { run, result });
                });
            }
            SummaryEffect::Summarize { run, records } => {
                if records.is_empty() {
                    dispatcher.send(SummaryAction::Summary {
                        run,
                        update: StreamUpdate::Final(NO_MESSAGES.to_string()),
                    });
                    return;
                }
                info!(run, count = records.len(), "Summarizing mail");
                let stream = self.llm.stream(&summary_prompt(&records));
                tokio::spawn(async move {
                    republish(run, stream, |run, update| {
                        if let StreamUpdate::Failed(message) = &update {
                            warn!(run, error = %message, "Mail summary failed");
                        }
                        dispatcher.send(SummaryAction::Summary { run, update });
                    })
                    .await;
                });
            }
            SummaryEffect::Feedback(feedback) => feedback.emit("summary"),
        }
    }
}

/// Instruction plus one block per message.
pub fn summary_prompt(records: &[MailRecord]) -> String {
    let mut prompt = String::from(
        "Summarize these emails in a few short bullet points. \
         Call out anything that needs a reply or has a deadline.\n",
    );
    for (i, record) in records.iter().enumerate() {
        prompt.push_str(&format!(
            "\n{}. From: {}\n   Subject: {}\n   {}\n",
            i + 1,
            record.sender,
            record.subject,
            record.snippet
        ));
    }
    prompt
}
