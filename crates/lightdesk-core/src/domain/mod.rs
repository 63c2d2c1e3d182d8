// ── Domain adapters ──
//
// One adapter per backend domain, each wrapping the shared `Connection`.
// Adapters never touch the socket: they subscribe to connection events,
// keep their own cache, and talk back only through `Connection::send`.
// An adapter's connection subscription lives exactly as long as the
// adapter does.

pub mod channel_mapping;
pub mod channels;
pub mod notifier;
pub mod track;
pub mod universes;

pub use channel_mapping::ChannelMappingApi;
pub use channels::ChannelsApi;
pub use notifier::ChangeNotifier;
pub use track::TrackApi;
pub use universes::UniversesApi;

use lightdesk_api::{
    ClientMessage, Connection, ConnectionEvent, ReadyState, ServerMessage, Subscription,
};

/// Ask the backend to resend a domain's full state.
fn request_resync(connection: &Connection, request: &ClientMessage) {
    let outcome = connection.send(request);
    tracing::debug!(kind = request.kind(), ?outcome, "resync requested");
}

/// Wire a cache-holding adapter to the connection.
///
/// `request` is sent on every open (and right away if the socket is
/// already open); every decoded message is handed to `on_message`, which
/// ignores other domains' traffic.
fn attach<F>(connection: &Connection, request: ClientMessage, on_message: F) -> Subscription
where
    F: Fn(&ServerMessage) + Send + Sync + 'static,
{
    let sender = connection.clone();
    let resync = request.clone();
    let subscription = connection.subscribe(move |event| match event {
        ConnectionEvent::Open => request_resync(&sender, &resync),
        ConnectionEvent::Message(message) => on_message(message),
        ConnectionEvent::Close(_) | ConnectionEvent::Error(_) => {}
    });

    if connection.ready_state() == ReadyState::Open {
        request_resync(connection, &request);
    }
    subscription
}
