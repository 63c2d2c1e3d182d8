// ── Channel → fixture mapping ──
//
// Read-only view of which fixture each DMX channel drives. Every push
// carries the complete mapping, so the cache is rebuilt from scratch and
// swapped in whole; entries absent from the latest push are gone.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use lightdesk_api::{ClientMessage, Connection, ServerMessage, Subscribers, Subscription};

use crate::model::{ChannelMapping, FixtureChannel};

pub struct ChannelMappingApi {
    mapping: Arc<ArcSwap<ChannelMapping>>,
    subscribers: Subscribers<Arc<ChannelMapping>>,
    _events: Subscription,
}

impl ChannelMappingApi {
    pub fn new(connection: &Connection) -> Self {
        let mapping = Arc::new(ArcSwap::from_pointee(ChannelMapping::new()));
        let subscribers = Subscribers::new();

        let cache = Arc::clone(&mapping);
        let fan_out = subscribers.clone();
        let events = super::attach(connection, ClientMessage::ChannelMappingState, move |message| {
            let ServerMessage::ChannelMappingState { mappings } = message else {
                return;
            };
            let rebuilt: ChannelMapping = mappings
                .iter()
                .map(|(universe, channels)| {
                    let channels = channels
                        .iter()
                        .map(|(channel, entry)| (*channel, FixtureChannel::from(entry.clone())))
                        .collect();
                    (*universe, channels)
                })
                .collect();
            let rebuilt = Arc::new(rebuilt);
            cache.store(Arc::clone(&rebuilt));
            fan_out.emit(&rebuilt);
        });

        Self {
            mapping,
            subscribers,
            _events: events,
        }
    }

    /// The fixture channel at `universe`/`channel`, if mapped.
    pub fn get(&self, universe: u16, channel: u16) -> Option<FixtureChannel> {
        self.mapping
            .load()
            .get(&universe)
            .and_then(|channels| channels.get(&channel))
            .cloned()
    }

    /// All mapped channels of one universe.
    pub fn universe(&self, universe: u16) -> Option<BTreeMap<u16, FixtureChannel>> {
        self.mapping.load().get(&universe).cloned()
    }

    pub fn get_all(&self) -> Arc<ChannelMapping> {
        self.mapping.load_full()
    }

    /// Receive the full mapping now and after every push.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Arc<ChannelMapping>) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let registered = Arc::clone(&callback);
        let subscription = self.subscribers.subscribe(move |mapping| registered(mapping));
        callback(&self.mapping.load_full());
        subscription
    }
}

impl std::fmt::Debug for ChannelMappingApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelMappingApi")
            .field("universes", &self.mapping.load().len())
            .finish_non_exhaustive()
    }
}
