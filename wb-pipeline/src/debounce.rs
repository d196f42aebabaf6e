use dashmap::DashMap;
use futures_util::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use wb_collab::ConversationKey;

/// Continuation invoked with the coalesced turn once the quiet period ends.
/// Batches are shared across timer tasks, so the continuation must be
/// `Send + Sync`.
pub type FlushFn = Box<dyn FnOnce(String) -> BoxFuture<'static, ()> + Send + Sync>;

struct PendingBatch {
    fragments: Vec<String>,
    on_flush: Option<FlushFn>,
    timer: Option<tokio::task::JoinHandle<()>>,
    /// Bumped on every enqueue; a timer wakeup only flushes if its
    /// generation is still current, so an abort that lands after the sleep
    /// completed cannot double-fire.
    generation: u64,
}

impl PendingBatch {
    fn new() -> Self {
        Self {
            fragments: Vec::new(),
            on_flush: None,
            timer: None,
            generation: 0,
        }
    }
}

/// Per-conversation message coalescing queue.
///
/// Pure debounce: every fragment arrival cancels the outstanding flush timer
/// for its key and re-arms it for the full gap, so a flush fires only after
/// `gap` of silence. Fragments are joined in arrival order with a single
/// space. Keys are fully independent. Nothing is persisted; a restart drops
/// unflushed batches. A burst that coalesces to only whitespace is dropped
/// without invoking the continuation: there is no turn to answer.
#[derive(Clone)]
pub struct DebounceQueue {
    inner: Arc<Inner>,
}

struct Inner {
    gap: Duration,
    batches: DashMap<ConversationKey, PendingBatch>,
}

impl DebounceQueue {
    pub fn new(gap: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                gap,
                batches: DashMap::new(),
            }),
        }
    }

    /// Append `fragment` for `key` and (re)arm the flush timer.
    ///
    /// The continuation supplied on the most recent call wins: when several
    /// enqueues land inside one quiet window, only the last `on_flush` is
    /// invoked, once, with all fragments.
    pub fn enqueue(&self, key: &ConversationKey, fragment: &str, on_flush: FlushFn) {
        let generation = {
            let mut batch = self
                .inner
                .batches
                .entry(key.clone())
                .or_insert_with(PendingBatch::new);
            if let Some(timer) = batch.timer.take() {
                timer.abort();
            }
            batch.fragments.push(fragment.to_string());
            batch.on_flush = Some(on_flush);
            batch.generation += 1;
            batch.generation
        };

        let inner = Arc::clone(&self.inner);
        let timer_key = key.clone();
        // Deadline is anchored at enqueue time, not at the timer task's
        // first poll.
        let deadline = tokio::time::Instant::now() + self.inner.gap;
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            inner.flush(&timer_key, generation).await;
        });

        if let Some(mut batch) = self.inner.batches.get_mut(key) {
            // A newer enqueue may have raced in while we spawned; it already
            // armed its own timer, so this one must not be registered.
            if batch.generation == generation {
                batch.timer = Some(timer);
            } else {
                timer.abort();
            }
        }
        tracing::debug!(key = %key, gap_ms = self.inner.gap.as_millis() as u64, "debounce timer armed");
    }

    /// Number of buffered fragments for `key` (0 after a flush).
    pub fn pending_fragments(&self, key: &ConversationKey) -> usize {
        self.inner
            .batches
            .get(key)
            .map(|batch| batch.fragments.len())
            .unwrap_or(0)
    }
}

impl Inner {
    async fn flush(&self, key: &ConversationKey, generation: u64) {
        let flushed = {
            let Some(mut batch) = self.batches.get_mut(key) else {
                return;
            };
            if batch.generation != generation {
                return;
            }
            let fragments = std::mem::take(&mut batch.fragments);
            let on_flush = batch.on_flush.take();
            batch.timer = None;
            on_flush.map(|cb| (cb, fragments.join(" ")))
        };

        let Some((on_flush, text)) = flushed else {
            return;
        };
        if text.trim().is_empty() {
            return;
        }
        tracing::info!(key = %key, turn_len = text.len(), "debounce flush");
        on_flush(text).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn() -> FlushFn) {
        let flushed: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = flushed.clone();
        let make = move || -> FlushFn {
            let sink = sink.clone();
            Box::new(move |text: String| {
                Box::pin(async move {
                    sink.lock().expect("lock flush sink").push(text);
                })
            })
        };
        (flushed, make)
    }

    #[tokio::test(start_paused = true)]
    async fn coalesces_burst_into_single_flush() {
        let queue = DebounceQueue::new(Duration::from_millis(300));
        let key = ConversationKey::new("user-a");
        let (flushed, make) = recorder();

        queue.enqueue(&key, "hola", make());
        tokio::time::advance(Duration::from_millis(100)).await;
        queue.enqueue(&key, "como estas", make());
        tokio::time::advance(Duration::from_millis(350)).await;
        tokio::task::yield_now().await;

        let flushed = flushed.lock().expect("lock flush sink");
        assert_eq!(flushed.as_slice(), ["hola como estas"]);
        drop(flushed);
        assert_eq!(queue.pending_fragments(&key), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_delays_flush_until_quiet() {
        let queue = DebounceQueue::new(Duration::from_millis(300));
        let key = ConversationKey::new("user-a");
        let (flushed, make) = recorder();

        queue.enqueue(&key, "uno", make());
        tokio::time::advance(Duration::from_millis(250)).await;
        queue.enqueue(&key, "dos", make());
        // 250ms past the first fragment but only 250ms past the second:
        // nothing may fire yet.
        tokio::time::advance(Duration::from_millis(250)).await;
        tokio::task::yield_now().await;
        assert!(flushed.lock().expect("lock flush sink").is_empty());

        tokio::time::advance(Duration::from_millis(100)).await;
        tokio::task::yield_now().await;
        assert_eq!(
            flushed.lock().expect("lock flush sink").as_slice(),
            ["uno dos"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn keys_flush_independently() {
        let queue = DebounceQueue::new(Duration::from_millis(200));
        let (flushed, make) = recorder();

        queue.enqueue(&ConversationKey::new("user-a"), "para a", make());
        queue.enqueue(&ConversationKey::new("user-b"), "para b", make());
        tokio::time::advance(Duration::from_millis(250)).await;
        tokio::task::yield_now().await;

        let mut flushed = flushed.lock().expect("lock flush sink").clone();
        flushed.sort();
        assert_eq!(flushed, ["para a", "para b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn last_callback_wins() {
        let queue = DebounceQueue::new(Duration::from_millis(200));
        let key = ConversationKey::new("user-a");
        let first_fired = Arc::new(Mutex::new(false));
        let second_fired = Arc::new(Mutex::new(Vec::new()));

        let first = first_fired.clone();
        queue.enqueue(
            &key,
            "uno",
            Box::new(move |_text| {
                Box::pin(async move {
                    *first.lock().expect("lock first") = true;
                })
            }),
        );
        let second = second_fired.clone();
        queue.enqueue(
            &key,
            "dos",
            Box::new(move |text| {
                Box::pin(async move {
                    second.lock().expect("lock second").push(text);
                })
            }),
        );

        tokio::time::advance(Duration::from_millis(250)).await;
        tokio::task::yield_now().await;

        assert!(!*first_fired.lock().expect("lock first"));
        assert_eq!(
            second_fired.lock().expect("lock second").as_slice(),
            ["uno dos"]
        );
    }

    #[test]
    fn queue_and_continuations_move_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DebounceQueue>();
        assert_send_sync::<FlushFn>();
    }

    #[tokio::test(start_paused = true)]
    async fn whitespace_only_turn_is_dropped() {
        let queue = DebounceQueue::new(Duration::from_millis(100));
        let key = ConversationKey::new("user-a");
        let (flushed, make) = recorder();

        queue.enqueue(&key, "   ", make());
        tokio::time::advance(Duration::from_millis(150)).await;
        tokio::task::yield_now().await;

        assert!(flushed.lock().expect("lock flush sink").is_empty());
        assert_eq!(queue.pending_fragments(&key), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn key_record_persists_after_flush() {
        let queue = DebounceQueue::new(Duration::from_millis(100));
        let key = ConversationKey::new("user-a");
        let (flushed, make) = recorder();

        queue.enqueue(&key, "primero", make());
        tokio::time::advance(Duration::from_millis(150)).await;
        tokio::task::yield_now().await;
        queue.enqueue(&key, "segundo", make());
        tokio::time::advance(Duration::from_millis(150)).await;
        tokio::task::yield_now().await;

        assert_eq!(
            flushed.lock().expect("lock flush sink").as_slice(),
            ["primero", "segundo"]
        );
    }
}
