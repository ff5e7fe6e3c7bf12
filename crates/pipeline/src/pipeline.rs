use std::{sync::Arc, time::Duration};

use {
    quickreply_aggregate::{Aggregator, FlushSink},
    quickreply_common::{ChannelOutbound, InboundMessage},
    quickreply_dispatch::AnswerClient,
    quickreply_extract::{ContentExtractor, Extracted},
    tracing::{debug, info, warn},
};

use crate::gating;

/// Prompt substituted for message kinds we cannot extract.
const UNSUPPORTED_PROMPT: &str = "Olá, como posso ajudar?";

/// Policy knobs for one running pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Quiet period before a conversation's buffer is flushed.
    pub debounce_window: Duration,
    /// Skip dispatch entirely when the coalesced text is blank.
    pub suppress_empty_dispatch: bool,
    /// Conversations/senders allowed to interact; empty = everyone.
    pub allowlist: Vec<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            debounce_window: Duration::from_millis(5_000),
            suppress_empty_dispatch: true,
            allowlist: Vec::new(),
        }
    }
}

/// Wires extraction, aggregation, dispatch, and delivery together.
pub struct Pipeline {
    aggregator: Aggregator,
    extractor: ContentExtractor,
    allowlist: Vec<String>,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        extractor: ContentExtractor,
        dispatcher: Arc<AnswerClient>,
        outbound: Arc<dyn ChannelOutbound>,
        options: PipelineOptions,
    ) -> Self {
        let sink = Arc::new(DispatchSink {
            dispatcher,
            outbound,
            suppress_empty: options.suppress_empty_dispatch,
        });
        Self {
            aggregator: Aggregator::new(options.debounce_window, sink),
            extractor,
            allowlist: options.allowlist,
        }
    }

    /// Feed one inbound message through the pipeline.
    ///
    /// Returns false when the message was ignored (self-originated or not
    /// on the allowlist); true once the extracted text is buffered. The
    /// eventual dispatch and delivery happen when the conversation's
    /// debounce window expires.
    pub async fn handle_inbound(&self, msg: InboundMessage) -> bool {
        if msg.from_me {
            debug!(chat_jid = %msg.chat_jid, "ignoring own message");
            return false;
        }
        if !gating::is_allowed(&msg.chat_jid, &msg.sender_jid, &self.allowlist) {
            debug!(chat_jid = %msg.chat_jid, sender_jid = %msg.sender_jid, "sender not allowed");
            return false;
        }

        let text = match self.extractor.extract(&msg).await {
            Extracted::Text(text) => text,
            Extracted::Unsupported => {
                info!(chat_jid = %msg.chat_jid, kind = ?msg.kind, "unsupported message kind");
                UNSUPPORTED_PROMPT.to_string()
            },
        };

        let text = match msg.quoted.as_ref().and_then(|q| q.text.as_deref()) {
            Some(quoted) => compose_with_quoted(&text, quoted),
            None => text,
        };

        self.aggregator.on_fragment(&msg.chat_jid, text).await;
        true
    }
}

/// Append the quoted-message composite to the extracted text.
///
/// Pure text transform; the answer service sees both the current message
/// and what it was replying to.
fn compose_with_quoted(input: &str, quoted: &str) -> String {
    format!("{input} mensagem atual {input} \n mensagem recuperada: {quoted}")
        .trim()
        .to_string()
}

/// Flush target: one coalesced text in, one delivered reply out.
struct DispatchSink {
    dispatcher: Arc<AnswerClient>,
    outbound: Arc<dyn ChannelOutbound>,
    suppress_empty: bool,
}

#[async_trait::async_trait]
impl FlushSink for DispatchSink {
    async fn flush(&self, chat_jid: &str, text: String) {
        if self.suppress_empty && text.trim().is_empty() {
            debug!(chat_jid, "coalesced text is empty, dispatch suppressed");
            return;
        }

        let reply = self.dispatcher.dispatch(&text, chat_jid).await;
        info!(chat_jid, reply_len = reply.len(), "dispatch complete");

        // Delivery failures stay here: the buffer and timer are already
        // gone, and generation already succeeded or degraded.
        if let Err(error) = self.outbound.send_text(chat_jid, &reply).await {
            warn!(chat_jid, %error, "failed to send reply");
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use {
        quickreply_common::{MessageKind, QuotedMessage},
        quickreply_dispatch::{RetryPolicy, Sleeper, TokioSleeper},
        quickreply_extract::{CaptionClient, TranscriptionClient},
        serde_json::json,
    };

    use super::*;

    #[derive(Default)]
    struct RecordingOutbound {
        sent: StdMutex<Vec<(String, String)>>,
    }

    #[async_trait::async_trait]
    impl ChannelOutbound for RecordingOutbound {
        async fn send_text(&self, chat_jid: &str, text: &str) -> quickreply_common::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((chat_jid.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn extractor() -> ContentExtractor {
        ContentExtractor::new(
            TranscriptionClient::new("http://localhost:9", None, "whisper-1"),
            CaptionClient::new("http://localhost:9", None, "gpt-4o-mini", "p"),
            std::env::temp_dir(),
            "",
        )
    }

    fn dispatcher(endpoint: String) -> Arc<AnswerClient> {
        Arc::new(
            AnswerClient::new(
                endpoint,
                Duration::from_secs(5),
                RetryPolicy {
                    max_attempts: 1,
                    base_delay: Duration::ZERO,
                },
                Arc::new(TokioSleeper) as Arc<dyn Sleeper>,
            )
            .unwrap(),
        )
    }

    fn pipeline(
        endpoint: String,
        options: PipelineOptions,
    ) -> (Pipeline, Arc<RecordingOutbound>) {
        let outbound = Arc::new(RecordingOutbound::default());
        let pipeline = Pipeline::new(
            extractor(),
            dispatcher(endpoint),
            Arc::clone(&outbound) as Arc<dyn ChannelOutbound>,
            options,
        );
        (pipeline, outbound)
    }

    fn short_window() -> PipelineOptions {
        PipelineOptions {
            debounce_window: Duration::from_millis(200),
            ..PipelineOptions::default()
        }
    }

    fn text_message(chat_jid: &str, body: &str) -> InboundMessage {
        InboundMessage::text(chat_jid, body)
    }

    #[tokio::test]
    async fn burst_becomes_one_dispatch_and_one_send() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/answer")
            .match_body(mockito::Matcher::PartialJson(json!({
                "question": "F1 F2",
                "sessionId": "chat-a",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"text": "resposta [aqui](http://x)"}"#)
            .expect(1)
            .create_async()
            .await;

        let (pipeline, outbound) = pipeline(format!("{}/answer", server.url()), short_window());

        assert!(pipeline.handle_inbound(text_message("chat-a", "F1")).await);
        assert!(pipeline.handle_inbound(text_message("chat-a", "F2")).await);

        tokio::time::sleep(Duration::from_millis(800)).await;

        mock.assert_async().await;
        let sent = outbound.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], (
            "chat-a".to_string(),
            "resposta aqui: http://x".to_string(),
        ));
    }

    #[tokio::test]
    async fn own_messages_are_ignored() {
        let (pipeline, outbound) = pipeline("http://localhost:9/answer".into(), short_window());

        let mut msg = text_message("chat-a", "oi");
        msg.from_me = true;
        assert!(!pipeline.handle_inbound(msg).await);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(outbound.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn allowlist_blocks_unknown_senders() {
        let options = PipelineOptions {
            allowlist: vec!["5547*".into()],
            ..short_window()
        };
        let (pipeline, outbound) = pipeline("http://localhost:9/answer".into(), options);

        let mut msg = text_message("5511999@s.whatsapp.net", "oi");
        msg.sender_jid = "5511999@s.whatsapp.net".into();
        assert!(!pipeline.handle_inbound(msg).await);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(outbound.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsupported_kind_dispatches_the_greeting_prompt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/answer")
            .match_body(mockito::Matcher::PartialJson(json!({
                "question": UNSUPPORTED_PROMPT,
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"text": "oi!"}"#)
            .expect(1)
            .create_async()
            .await;

        let (pipeline, _outbound) = pipeline(format!("{}/answer", server.url()), short_window());

        let mut msg = text_message("chat-a", "");
        msg.kind = MessageKind::Unsupported;
        msg.body = None;
        assert!(pipeline.handle_inbound(msg).await);

        tokio::time::sleep(Duration::from_millis(800)).await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_coalesced_text_is_suppressed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/answer")
            .expect(0)
            .create_async()
            .await;

        let (pipeline, outbound) = pipeline(format!("{}/answer", server.url()), short_window());

        assert!(pipeline.handle_inbound(text_message("chat-a", "")).await);

        tokio::time::sleep(Duration::from_millis(600)).await;
        mock.assert_async().await;
        assert!(outbound.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn quoted_composite_carries_both_messages() {
        let composed = compose_with_quoted("e esse?", "tem em azul e branco");
        assert_eq!(
            composed,
            "e esse? mensagem atual e esse? \n mensagem recuperada: tem em azul e branco"
        );
    }

    #[tokio::test]
    async fn quoted_message_text_reaches_the_buffer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/answer")
            .match_body(mockito::Matcher::PartialJson(json!({
                "question": "e esse? mensagem atual e esse? \n mensagem recuperada: tem em azul",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"text": "sim"}"#)
            .expect(1)
            .create_async()
            .await;

        let (pipeline, _outbound) = pipeline(format!("{}/answer", server.url()), short_window());

        let mut msg = text_message("chat-a", "e esse?");
        msg.quoted = Some(QuotedMessage {
            participant: None,
            text: Some("tem em azul".into()),
        });
        assert!(pipeline.handle_inbound(msg).await);

        tokio::time::sleep(Duration::from_millis(800)).await;
        mock.assert_async().await;
    }
}
