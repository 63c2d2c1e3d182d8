// ── List-change notifiers ──
//
// Fixtures, scenes, cues, cue stacks, cue slots and FX presets live behind
// REST; the socket only announces that one of those lists changed. A
// notifier carries no cache: it tells subscribers to re-fetch, both on a
// matching announcement and on every (re)open, since announcements sent
// while disconnected are lost.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lightdesk_api::{Connection, ConnectionEvent, Subscribers, Subscription};

use crate::model::ChangeKind;

pub struct ChangeNotifier {
    kind: ChangeKind,
    subscribers: Subscribers<ChangeKind>,
    signals: Arc<AtomicU64>,
    _events: Subscription,
}

impl ChangeNotifier {
    pub fn new(connection: &Connection, kind: ChangeKind) -> Self {
        let subscribers = Subscribers::new();
        let signals = Arc::new(AtomicU64::new(0));

        let fan_out = subscribers.clone();
        let counter = Arc::clone(&signals);
        let events = connection.subscribe(move |event| {
            let fire = match event {
                ConnectionEvent::Open => true,
                ConnectionEvent::Message(message) => ChangeKind::of(message) == Some(kind),
                ConnectionEvent::Close(_) | ConnectionEvent::Error(_) => false,
            };
            if fire {
                counter.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(%kind, "change signalled");
                fan_out.emit(&kind);
            }
        });

        Self {
            kind,
            subscribers,
            signals,
            _events: events,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    /// How many times subscribers have been told to re-fetch.
    pub fn signal_count(&self) -> u64 {
        self.signals.load(Ordering::Relaxed)
    }

    /// Be told when the list should be re-fetched. Nothing is delivered
    /// on subscribe.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(ChangeKind) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(move |kind| callback(*kind))
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("kind", &self.kind)
            .field("signals", &self.signal_count())
            .finish_non_exhaustive()
    }
}
