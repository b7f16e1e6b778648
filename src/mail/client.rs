//! Retrying, paginated mail client.

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};
use tracing::{debug, info};

use crate::error::MailError;
use crate::mail::gmail::{MAX_PAGE_SIZE, MailTransport};
use crate::mail::model::MailRecord;
use crate::mail::retry::RetryPolicy;

/// Default cap on concurrent message resolutions.
pub const DEFAULT_RESOLVE_CONCURRENCY: usize = 8;

/// Mail collaborator: lists ids page by page and resolves them into records.
pub struct MailClient {
    transport: Arc<dyn MailTransport>,
    retry: RetryPolicy,
    page_size: u32,
    concurrency: usize,
}

impl MailClient {
    pub fn new(transport: Arc<dyn MailTransport>, retry: RetryPolicy) -> Self {
        Self {
            transport,
            retry,
            page_size: MAX_PAGE_SIZE,
            concurrency: DEFAULT_RESOLVE_CONCURRENCY,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Collect up to `total_limit` ids matching `query`, in provider order.
    pub async fn list_all_ids(
        &self,
        query: &str,
        page_size: u32,
        total_limit: usize,
    ) -> Result<Vec<String>, MailError> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        while ids.len() < total_limit {
            let remaining = (total_limit - ids.len()).min(u32::MAX as usize) as u32;
            let size = page_size.min(remaining).clamp(1, MAX_PAGE_SIZE);
            let token = page_token.as_deref();
            let page = self
                .retry
                .run("list_messages", || self.transport.list_page(query, size, token))
                .await?;

            ids.extend(page.messages.into_iter().map(|m| m.id));
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        ids.truncate(total_limit);
        debug!(count = ids.len(), "Listed message ids");
        Ok(ids)
    }

    /// `list_all_ids` with the configured page size.
    pub async fn list_all_messages(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<String>, MailError> {
        self.list_all_ids(query, self.page_size, limit).await
    }

    /// Fetch one message's metadata as a record.
    pub async fn load_message(&self, id: &str) -> Result<MailRecord, MailError> {
        let meta = self
            .retry
            .run("get_message", || self.transport.get_message(id))
            .await?;
        Ok(MailRecord::from_metadata(&meta))
    }

    /// List and resolve messages. All-or-nothing: the first failed
    /// resolution fails the whole fetch. Records keep id order.
    pub async fn fetch_records(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MailRecord>, MailError> {
        let ids = self.list_all_messages(query, limit).await?;
        let records: Vec<MailRecord> = futures::stream::iter(ids)
            .map(|id| async move { self.load_message(&id).await })
            .buffered(self.concurrency)
            .try_collect()
            .await?;
        info!(count = records.len(), query, "Fetched mail records");
        Ok(records)
    }
}
