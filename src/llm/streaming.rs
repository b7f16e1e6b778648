//! Streaming response consumer.
//!
//! Republishes each accumulated increment of a [`TextStream`] tagged with the
//! originating request's key, then a final or failure result.

use futures::StreamExt;
use tracing::warn;

use crate::llm::TextStream;

/// One republished step of a streaming response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdate {
    /// Full text so far.
    Partial(String),
    /// Stream ended normally with this text.
    Final(String),
    /// Stream failed; no further updates follow.
    Failed(String),
}

impl StreamUpdate {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Partial(_))
    }
}

/// Drive `stream` to completion, publishing every step for `key`.
///
/// Exactly one terminal update is published. An empty stream finishes with
/// an empty final text.
pub async fn republish<K, F>(key: K, mut stream: TextStream, mut publish: F)
where
    K: Clone,
    F: FnMut(K, StreamUpdate),
{
    let mut latest = String::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(text) => {
                latest = text;
                publish(key.clone(), StreamUpdate::Partial(latest.clone()));
            }
            Err(e) => {
                warn!(error = %e, "Response stream failed");
                publish(key, StreamUpdate::Failed(e.to_string()));
                return;
            }
        }
    }
    publish(key, StreamUpdate::Final(latest));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;

    fn stream_of(items: Vec<Result<&'static str, LlmError>>) -> TextStream {
        Box::pin(futures::stream::iter(
            items.into_iter().map(|r| r.map(str::to_string)),
        ))
    }

    async fn collect(stream: TextStream) -> Vec<(u64, StreamUpdate)> {
        let mut out = Vec::new();
        republish(7u64, stream, |k, u| out.push((k, u))).await;
        out
    }

    #[tokio::test]
    async fn republishes_partials_then_final() {
        let out = collect(stream_of(vec![Ok("Hel"), Ok("Hello"), Ok("Hello!")])).await;
        let updates: Vec<_> = out.iter().map(|(_, u)| u.clone()).collect();
        assert_eq!(
            updates,
            vec![
                StreamUpdate::Partial("Hel".into()),
                StreamUpdate::Partial("Hello".into()),
                StreamUpdate::Partial("Hello!".into()),
                StreamUpdate::Final("Hello!".into()),
            ]
        );
        assert!(out.iter().all(|(k, _)| *k == 7));
    }

    #[tokio::test]
    async fn failure_stops_republishing() {
        let out = collect(stream_of(vec![
            Ok("partial"),
            Err(LlmError::RequestFailed {
                provider: "stub".into(),
                reason: "connection reset".into(),
            }),
            Ok("never seen"),
        ]))
        .await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].1, StreamUpdate::Partial("partial".into()));
        match &out[1].1 {
            StreamUpdate::Failed(msg) => assert!(msg.contains("connection reset")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_stream_finishes_empty() {
        let out = collect(stream_of(vec![])).await;
        assert_eq!(out, vec![(7, StreamUpdate::Final(String::new()))]);
    }

    #[test]
    fn only_partials_are_non_terminal() {
        assert!(!StreamUpdate::Partial("x".into()).is_terminal());
        assert!(StreamUpdate::Final("x".into()).is_terminal());
        assert!(StreamUpdate::Failed("x".into()).is_terminal());
    }
}
