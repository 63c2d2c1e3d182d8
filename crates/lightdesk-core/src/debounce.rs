// ── Debounce aggregator ──
//
// Folds a high-frequency stream of values into a buffer and hands the
// buffer to a flush callback at most once per window. The first value
// after an idle period flushes immediately; values that arrive while the
// window timer is running are coalesced and flushed on the next tick. An
// idle tick stops the timer.

use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

type AggregateFn<V, B> = Box<dyn Fn(V, &mut B) + Send + Sync>;
type FlushFn<B> = Box<dyn Fn(B) + Send + Sync>;
type InitialFn<B> = Box<dyn Fn() -> B + Send + Sync>;

/// Handle returned by [`aggregate_and_debounce`].
///
/// Dropping the last clone stops the window timer; values still buffered
/// at that point are discarded.
pub struct Debouncer<V, B> {
    inner: Arc<Inner<V, B>>,
}

struct Inner<V, B> {
    aggregate: AggregateFn<V, B>,
    on_flush: FlushFn<B>,
    make_initial: InitialFn<B>,
    wait: Duration,
    state: Mutex<State<B>>,
}

struct State<B> {
    buffer: B,
    dirty: bool,
    ticking: bool,
}

/// Build a debouncer.
///
/// `aggregate` folds each pushed value into the buffer, `on_flush`
/// receives the buffer, and `make_initial` produces the empty buffer that
/// replaces it after every flush. `wait` is the window length; a zero
/// window disables coalescing and every push flushes on its own.
///
/// [`Debouncer::push`] spawns the window timer, so it must be called from
/// within a Tokio runtime.
pub fn aggregate_and_debounce<V, B, A, F, I>(
    aggregate: A,
    on_flush: F,
    make_initial: I,
    wait: Duration,
) -> Debouncer<V, B>
where
    V: Send + 'static,
    B: Send + 'static,
    A: Fn(V, &mut B) + Send + Sync + 'static,
    F: Fn(B) + Send + Sync + 'static,
    I: Fn() -> B + Send + Sync + 'static,
{
    let buffer = make_initial();
    Debouncer {
        inner: Arc::new(Inner {
            aggregate: Box::new(aggregate),
            on_flush: Box::new(on_flush),
            make_initial: Box::new(make_initial),
            wait,
            state: Mutex::new(State {
                buffer,
                dirty: false,
                ticking: false,
            }),
        }),
    }
}

impl<V, B> Inner<V, B> {
    fn state(&self) -> MutexGuard<'_, State<B>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swap the buffer for a fresh one. Caller holds the lock.
    fn take(&self, state: &mut State<B>) -> B {
        state.dirty = false;
        mem::replace(&mut state.buffer, (self.make_initial)())
    }
}

impl<V, B> Debouncer<V, B>
where
    V: Send + 'static,
    B: Send + 'static,
{
    /// Fold `value` into the buffer.
    ///
    /// When no window is running this flushes right away, on the calling
    /// task, and starts a window. Otherwise the value waits for the next
    /// tick.
    pub fn push(&self, value: V) {
        let windowed = !self.inner.wait.is_zero();
        let immediate = {
            let mut state = self.inner.state();
            (self.inner.aggregate)(value, &mut state.buffer);
            state.dirty = true;
            if state.ticking {
                None
            } else {
                state.ticking = windowed;
                Some(self.inner.take(&mut state))
            }
        };

        if let Some(buffer) = immediate {
            (self.inner.on_flush)(buffer);
            if windowed {
                self.spawn_ticker();
            }
        }
    }

    /// `true` while a window timer is running.
    pub fn is_ticking(&self) -> bool {
        self.inner.state().ticking
    }

    pub fn wait(&self) -> Duration {
        self.inner.wait
    }

    fn spawn_ticker(&self) {
        let weak: Weak<Inner<V, B>> = Arc::downgrade(&self.inner);
        let wait = self.inner.wait;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + wait, wait);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    return;
                };

                let pending = {
                    let mut state = inner.state();
                    if state.dirty {
                        Some(inner.take(&mut state))
                    } else {
                        state.ticking = false;
                        None
                    }
                };

                match pending {
                    Some(buffer) => (inner.on_flush)(buffer),
                    None => return,
                }
            }
        });
    }
}

impl<V, B> Clone for Debouncer<V, B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, B> std::fmt::Debug for Debouncer<V, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("wait", &self.inner.wait)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::time::sleep;

    type Flushes = Arc<Mutex<Vec<BTreeMap<&'static str, u32>>>>;

    fn map_debouncer(wait_ms: u64) -> (Debouncer<(&'static str, u32), BTreeMap<&'static str, u32>>, Flushes) {
        let flushes: Flushes = Arc::default();
        let sink = Arc::clone(&flushes);
        let debouncer = aggregate_and_debounce(
            |(key, value), buffer: &mut BTreeMap<&'static str, u32>| {
                buffer.insert(key, value);
            },
            move |buffer| sink.lock().unwrap().push(buffer),
            BTreeMap::new,
            Duration::from_millis(wait_ms),
        );
        (debouncer, flushes)
    }

    #[tokio::test(start_paused = true)]
    async fn first_push_flushes_immediately() {
        let (debouncer, flushes) = map_debouncer(100);

        debouncer.push(("a", 1));

        assert_eq!(flushes.lock().unwrap().clone(), vec![BTreeMap::from([("a", 1)])]);
        assert!(debouncer.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn burst_within_window_flushes_once() {
        let (debouncer, flushes) = map_debouncer(100);
        debouncer.push(("prime", 0));

        sleep(Duration::from_millis(10)).await;
        debouncer.push(("a", 1));
        debouncer.push(("b", 2));
        debouncer.push(("a", 3));
        assert_eq!(flushes.lock().unwrap().len(), 1);

        sleep(Duration::from_millis(100)).await;

        let flushes = flushes.lock().unwrap().clone();
        assert_eq!(flushes.len(), 2);
        assert_eq!(flushes[1], BTreeMap::from([("a", 3), ("b", 2)]));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_tick_stops_timer() {
        let (debouncer, flushes) = map_debouncer(100);
        debouncer.push(("a", 1));

        sleep(Duration::from_millis(150)).await;
        assert!(!debouncer.is_ticking());
        assert_eq!(flushes.lock().unwrap().len(), 1);

        // Idle again: the next value goes straight through.
        debouncer.push(("b", 2));
        assert_eq!(flushes.lock().unwrap().len(), 2);
        assert_eq!(flushes.lock().unwrap()[1], BTreeMap::from([("b", 2)]));
    }

    #[tokio::test(start_paused = true)]
    async fn timer_keeps_running_while_values_arrive() {
        let (debouncer, flushes) = map_debouncer(100);
        debouncer.push(("a", 0));

        for i in 1..=5 {
            sleep(Duration::from_millis(60)).await;
            debouncer.push(("a", i));
        }
        sleep(Duration::from_millis(250)).await;

        let flushes = flushes.lock().unwrap().clone();
        // Immediate flush, then one per window that saw a value.
        assert_eq!(flushes.first(), Some(&BTreeMap::from([("a", 0)])));
        assert_eq!(flushes.last(), Some(&BTreeMap::from([("a", 5)])));
        assert!(flushes.len() <= 5, "too many flushes: {flushes:?}");
        assert!(!debouncer.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn buffer_resets_after_flush() {
        let (debouncer, flushes) = map_debouncer(50);
        debouncer.push(("a", 1));
        debouncer.push(("b", 2));
        sleep(Duration::from_millis(60)).await;
        debouncer.push(("c", 3));
        sleep(Duration::from_millis(60)).await;

        let flushes = flushes.lock().unwrap().clone();
        assert_eq!(
            flushes,
            vec![
                BTreeMap::from([("a", 1)]),
                BTreeMap::from([("b", 2)]),
                BTreeMap::from([("c", 3)]),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn flush_callback_may_push() {
        let flushes = Arc::new(Mutex::new(Vec::<u32>::new()));
        let slot: Arc<Mutex<Option<Debouncer<u32, u32>>>> = Arc::default();

        let sink = Arc::clone(&flushes);
        let feedback = Arc::clone(&slot);
        let debouncer = aggregate_and_debounce(
            |value, total: &mut u32| *total += value,
            move |total| {
                sink.lock().unwrap().push(total);
                if total == 1 {
                    if let Some(d) = feedback.lock().unwrap().as_ref() {
                        d.push(10);
                    }
                }
            },
            || 0,
            Duration::from_millis(100),
        );
        *slot.lock().unwrap() = Some(debouncer.clone());

        debouncer.push(1);
        sleep(Duration::from_millis(150)).await;

        assert_eq!(flushes.lock().unwrap().clone(), vec![1, 10]);
        slot.lock().unwrap().take();
    }

    #[tokio::test(start_paused = true)]
    async fn zero_window_flushes_every_push() {
        let flushes = Arc::new(Mutex::new(Vec::<u32>::new()));
        let sink = Arc::clone(&flushes);
        let debouncer = aggregate_and_debounce(
            |value, total: &mut u32| *total += value,
            move |total| sink.lock().unwrap().push(total),
            || 0,
            Duration::ZERO,
        );

        debouncer.push(1);
        assert!(!debouncer.is_ticking());
        sleep(Duration::from_millis(50)).await;
        debouncer.push(2);
        debouncer.push(3);
        sleep(Duration::from_secs(5)).await;

        assert_eq!(flushes.lock().unwrap().clone(), vec![1, 2, 3]);
        assert!(!debouncer.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_debouncer_discards_pending() {
        let (debouncer, flushes) = map_debouncer(100);
        debouncer.push(("a", 1));
        debouncer.push(("b", 2));
        drop(debouncer);

        sleep(Duration::from_millis(300)).await;
        assert_eq!(flushes.lock().unwrap().len(), 1);
    }
}
