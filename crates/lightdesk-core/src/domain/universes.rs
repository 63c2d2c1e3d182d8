// ── DMX universes ──

use std::sync::Arc;

use lightdesk_api::{ClientMessage, Connection, ServerMessage, Subscribers, Subscription};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Universe numbers known to the backend, replaced wholesale on every push.
pub struct UniversesApi {
    universes: watch::Sender<Arc<Vec<u16>>>,
    subscribers: Subscribers<Arc<Vec<u16>>>,
    _events: Subscription,
}

impl UniversesApi {
    pub fn new(connection: &Connection) -> Self {
        let (universes, _) = watch::channel(Arc::new(Vec::new()));
        let subscribers = Subscribers::new();

        let cache = universes.clone();
        let fan_out = subscribers.clone();
        let events = super::attach(connection, ClientMessage::UniversesState, move |message| {
            if let ServerMessage::UniversesState { universes } = message {
                let next = Arc::new(universes.clone());
                cache.send_replace(Arc::clone(&next));
                fan_out.emit(&next);
            }
        });

        Self {
            universes,
            subscribers,
            _events: events,
        }
    }

    pub fn get_all(&self) -> Arc<Vec<u16>> {
        Arc::clone(&self.universes.borrow())
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[u16]) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let registered = Arc::clone(&callback);
        let subscription = self
            .subscribers
            .subscribe(move |universes: &Arc<Vec<u16>>| registered(universes));
        callback(&self.get_all());
        subscription
    }

    pub fn watch(&self) -> watch::Receiver<Arc<Vec<u16>>> {
        self.universes.subscribe()
    }

    pub fn stream(&self) -> WatchStream<Arc<Vec<u16>>> {
        WatchStream::new(self.universes.subscribe())
    }
}

impl std::fmt::Debug for UniversesApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniversesApi")
            .field("universes", &self.get_all())
            .finish_non_exhaustive()
    }
}
