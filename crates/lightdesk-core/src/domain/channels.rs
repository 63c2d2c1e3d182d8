// ── DMX channel levels ──
//
// Caches the last level the backend reported for every channel and fans
// level changes out to subscribers through a debouncer, so a fader sweep
// reaches consumers as a handful of batches rather than one callback per
// frame.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use lightdesk_api::{ClientMessage, Connection, SendOutcome, ServerMessage, Subscribers, Subscription};

use crate::debounce::{Debouncer, aggregate_and_debounce};
use crate::model::{ChannelKey, ChannelLevels};

/// Default window for coalescing channel pushes.
pub const DEFAULT_CHANNEL_DEBOUNCE: Duration = Duration::from_millis(100);

/// Live DMX channel levels.
pub struct ChannelsApi {
    shared: Arc<Shared>,
    _events: Subscription,
}

struct Shared {
    connection: Connection,
    levels: DashMap<ChannelKey, u8>,
    subscribers: Subscribers<ChannelLevels>,
    changes: Debouncer<ChannelLevels, ChannelLevels>,
}

impl ChannelsApi {
    pub fn new(connection: &Connection) -> Self {
        Self::with_debounce(connection, DEFAULT_CHANNEL_DEBOUNCE)
    }

    pub fn with_debounce(connection: &Connection, wait: Duration) -> Self {
        let subscribers = Subscribers::new();
        let fan_out = subscribers.clone();
        let changes = aggregate_and_debounce(
            |batch: ChannelLevels, pending: &mut ChannelLevels| pending.extend(batch),
            move |pending: ChannelLevels| fan_out.emit(&pending),
            ChannelLevels::new,
            wait,
        );

        let shared = Arc::new(Shared {
            connection: connection.clone(),
            levels: DashMap::new(),
            subscribers,
            changes,
        });

        let handler = Arc::clone(&shared);
        let events = super::attach(connection, ClientMessage::ChannelState, move |message| {
            if let ServerMessage::ChannelState { channels } = message {
                handler.apply(channels);
            }
        });

        Self {
            shared,
            _events: events,
        }
    }

    /// Last reported level of one channel.
    pub fn get(&self, universe: u16, id: u16) -> Option<u8> {
        self.shared
            .levels
            .get(&ChannelKey::new(universe, id))
            .map(|level| *level)
    }

    /// Snapshot of every known channel level.
    pub fn get_all(&self) -> ChannelLevels {
        self.shared.snapshot()
    }

    pub fn len(&self) -> usize {
        self.shared.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.levels.is_empty()
    }

    /// Receive batches of changed levels.
    ///
    /// `callback` is invoked once right away with the full current
    /// snapshot, then with each debounced batch of changes.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ChannelLevels) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let registered = Arc::clone(&callback);
        let subscription = self
            .shared
            .subscribers
            .subscribe(move |levels| registered(levels));
        callback(&self.shared.snapshot());
        subscription
    }

    /// Fade a channel to `level` over `fade`.
    ///
    /// The cache is not touched: the new level shows up once the backend
    /// pushes it back.
    pub fn update_channel(&self, universe: u16, id: u16, level: u8, fade: Duration) -> SendOutcome {
        let fade_time = u64::try_from(fade.as_millis()).unwrap_or(u64::MAX);
        let outcome = self.shared.connection.send(&ClientMessage::UpdateChannel {
            universe,
            id,
            level,
            fade_time,
        });
        tracing::trace!(universe, id, level, fade_time, ?outcome, "updateChannel");
        outcome
    }
}

impl Shared {
    fn snapshot(&self) -> ChannelLevels {
        self.levels
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }

    /// Merge a push into the cache and queue the entries that changed.
    fn apply(&self, channels: &[lightdesk_api::ChannelLevel]) {
        let mut changed = ChannelLevels::new();
        for channel in channels {
            let key = ChannelKey::new(channel.universe, channel.id);
            let previous = self.levels.insert(key, channel.current_level);
            if previous != Some(channel.current_level) {
                changed.insert(key, channel.current_level);
            }
        }
        if !changed.is_empty() {
            self.changes.push(changed);
        }
    }
}

impl std::fmt::Debug for ChannelsApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelsApi")
            .field("channels", &self.len())
            .field("debounce", &self.shared.changes.wait())
            .finish_non_exhaustive()
    }
}
