use std::{collections::HashMap, sync::Arc, time::Duration};

use {
    tokio::{sync::Mutex, task::JoinHandle},
    tracing::debug,
};

/// Receives the coalesced text when a conversation's window expires.
#[async_trait::async_trait]
pub trait FlushSink: Send + Sync {
    async fn flush(&self, chat_jid: &str, text: String);
}

/// Buffers fragments per conversation and flushes after a quiet period.
///
/// Invariants:
/// - at most one live timer per conversation; a new fragment cancels and
///   reschedules it,
/// - a burst of N fragments (each arriving inside the window) produces
///   exactly one flush carrying all N in arrival order,
/// - buffer and timer entries are claimed atomically on flush, so a stale
///   timer can never flush a buffer a newer cycle owns.
pub struct Aggregator {
    inner: Arc<Mutex<State>>,
    sink: Arc<dyn FlushSink>,
    window: Duration,
}

#[derive(Default)]
struct State {
    buffers: HashMap<String, Vec<String>>,
    timers: HashMap<String, FlushTimer>,
    /// Monotonic counter identifying the timer that is allowed to flush.
    generation: u64,
}

/// A scheduled, cancellable flush.
struct FlushTimer {
    generation: u64,
    task: JoinHandle<()>,
}

impl FlushTimer {
    fn cancel(self) {
        self.task.abort();
    }
}

impl Aggregator {
    #[must_use]
    pub fn new(window: Duration, sink: Arc<dyn FlushSink>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(State::default())),
            sink,
            window,
        }
    }

    /// Append a fragment to the conversation's buffer and restart its
    /// debounce timer. Append + cancel + reschedule happens under one lock,
    /// so it is atomic relative to that conversation's flush.
    pub async fn on_fragment(&self, chat_jid: &str, text: String) {
        let mut state = self.inner.lock().await;

        state
            .buffers
            .entry(chat_jid.to_string())
            .or_default()
            .push(text);

        state.generation += 1;
        let generation = state.generation;

        if let Some(previous) = state.timers.remove(chat_jid) {
            previous.cancel();
        }
        let task = self.spawn_flush(chat_jid.to_string(), generation);
        state.timers.insert(chat_jid.to_string(), FlushTimer {
            generation,
            task,
        });

        debug!(
            chat_jid,
            buffered = state.buffers.get(chat_jid).map_or(0, Vec::len),
            "fragment buffered, window restarted"
        );
    }

    fn spawn_flush(&self, chat_jid: String, generation: u64) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let sink = Arc::clone(&self.sink);
        let window = self.window;

        tokio::spawn(async move {
            tokio::time::sleep(window).await;

            let text = {
                let mut state = inner.lock().await;
                // A newer fragment may have rescheduled between wake-up and
                // lock acquisition; only the current timer may claim the
                // buffer.
                match state.timers.get(&chat_jid) {
                    Some(timer) if timer.generation == generation => {},
                    _ => return,
                }
                state.timers.remove(&chat_jid);
                let fragments = state.buffers.remove(&chat_jid).unwrap_or_default();
                fragments.join(" ")
            };

            debug!(chat_jid, len = text.len(), "window expired, flushing");
            sink.flush(&chat_jid, text).await;
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::sync::Mutex as StdMutex};

    #[derive(Default)]
    struct RecordingSink {
        flushes: StdMutex<Vec<(String, String)>>,
    }

    #[async_trait::async_trait]
    impl FlushSink for RecordingSink {
        async fn flush(&self, chat_jid: &str, text: String) {
            self.flushes
                .lock()
                .unwrap()
                .push((chat_jid.to_string(), text));
        }
    }

    fn aggregator(window_ms: u64) -> (Aggregator, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let agg = Aggregator::new(
            Duration::from_millis(window_ms),
            Arc::clone(&sink) as Arc<dyn FlushSink>,
        );
        (agg, sink)
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn burst_coalesces_into_one_flush() {
        let (agg, sink) = aggregator(5_000);

        agg.on_fragment("chat-a", "F1".into()).await;
        advance(2_000).await;
        agg.on_fragment("chat-a", "F2".into()).await;
        advance(2_000).await;
        agg.on_fragment("chat-a", "F3".into()).await;

        // t=8900: the window from the last fragment (t=4000) has not
        // elapsed yet.
        advance(4_900).await;
        assert!(sink.flushes.lock().unwrap().is_empty());

        // t=9100: flushed once with everything in arrival order.
        advance(200).await;
        let flushes = sink.flushes.lock().unwrap();
        assert_eq!(flushes.len(), 1);
        assert_eq!(flushes[0], ("chat-a".to_string(), "F1 F2 F3".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn fragment_just_before_expiry_restarts_the_window() {
        let (agg, sink) = aggregator(5_000);

        agg.on_fragment("chat-a", "F1".into()).await;
        advance(4_999).await;
        agg.on_fragment("chat-a", "F2".into()).await;

        // The original t=5000 deadline must not fire.
        advance(51).await;
        assert!(sink.flushes.lock().unwrap().is_empty());

        advance(5_000).await;
        let flushes = sink.flushes.lock().unwrap();
        assert_eq!(flushes.len(), 1);
        assert_eq!(flushes[0].1, "F1 F2");
    }

    #[tokio::test(start_paused = true)]
    async fn conversations_never_merge() {
        let (agg, sink) = aggregator(5_000);

        agg.on_fragment("chat-a", "a1".into()).await;
        advance(1_000).await;
        agg.on_fragment("chat-b", "b1".into()).await;
        advance(1_000).await;
        agg.on_fragment("chat-a", "a2".into()).await;

        advance(10_000).await;
        let mut flushes = sink.flushes.lock().unwrap().clone();
        flushes.sort();
        assert_eq!(flushes, vec![
            ("chat-a".to_string(), "a1 a2".to_string()),
            ("chat-b".to_string(), "b1".to_string()),
        ]);
    }

    #[tokio::test(start_paused = true)]
    async fn fragment_after_flush_starts_a_fresh_cycle() {
        let (agg, sink) = aggregator(5_000);

        agg.on_fragment("chat-a", "first".into()).await;
        advance(5_100).await;
        agg.on_fragment("chat-a", "second".into()).await;
        advance(5_100).await;

        let flushes = sink.flushes.lock().unwrap();
        assert_eq!(flushes.len(), 2);
        assert_eq!(flushes[0].1, "first");
        assert_eq!(flushes[1].1, "second");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_fragments_are_still_buffered() {
        let (agg, sink) = aggregator(5_000);

        agg.on_fragment("chat-a", String::new()).await;
        advance(5_100).await;

        let flushes = sink.flushes.lock().unwrap();
        assert_eq!(flushes.len(), 1);
        assert_eq!(flushes[0].1, "");
    }
}
