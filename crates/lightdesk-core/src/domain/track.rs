// ── Now-playing track ──

use std::sync::Arc;

use lightdesk_api::{ClientMessage, Connection, ServerMessage, Subscribers, Subscription};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Track;

/// Now-playing details from the backend's beat/track source.
///
/// Besides callbacks, the current value is exposed as a `watch` channel
/// for async consumers.
pub struct TrackApi {
    track: watch::Sender<Track>,
    subscribers: Subscribers<Track>,
    _events: Subscription,
}

impl TrackApi {
    pub fn new(connection: &Connection) -> Self {
        let (track, _) = watch::channel(Track::default());
        let subscribers = Subscribers::new();

        let cache = track.clone();
        let fan_out = subscribers.clone();
        let events = super::attach(connection, ClientMessage::TrackDetails, move |message| {
            let ServerMessage::TrackDetails {
                is_playing,
                artist,
                name,
            } = message
            else {
                return;
            };
            let next = Track {
                is_playing: *is_playing,
                artist: artist.clone(),
                name: name.clone(),
            };
            cache.send_replace(next.clone());
            fan_out.emit(&next);
        });

        Self {
            track,
            subscribers,
            _events: events,
        }
    }

    pub fn get(&self) -> Track {
        self.track.borrow().clone()
    }

    /// Receive the current track now and after every push.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Track) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let registered = Arc::clone(&callback);
        let subscription = self.subscribers.subscribe(move |track| registered(track));
        callback(&self.get());
        subscription
    }

    pub fn watch(&self) -> watch::Receiver<Track> {
        self.track.subscribe()
    }

    /// Yields the current track, then every update.
    pub fn stream(&self) -> WatchStream<Track> {
        WatchStream::new(self.track.subscribe())
    }
}

impl std::fmt::Debug for TrackApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackApi")
            .field("track", &*self.track.borrow())
            .finish_non_exhaustive()
    }
}
