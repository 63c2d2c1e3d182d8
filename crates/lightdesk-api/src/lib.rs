// lightdesk-api: WebSocket + REST client for a live DMX lighting backend

pub mod error;
pub mod protocol;
pub mod rest;
pub mod subscription;
pub mod testing;
pub mod transport;
pub mod websocket;

pub use error::Error;
pub use protocol::{ChannelLevel, ClientMessage, MappingEntry, ServerMessage};
pub use rest::{RestClient, Script};
pub use subscription::{Subscribers, Subscription};
pub use transport::{TlsMode, TransportConfig};
pub use websocket::{
    Backoff, CloseInfo, Connection, ConnectionConfig, ConnectionEvent, Connector, ReadyState,
    ReconnectConfig, SendOutcome, TungsteniteConnector,
};
