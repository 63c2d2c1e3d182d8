//! Real-time synchronisation layer for a live DMX lighting backend.
//!
//! Builds on the socket and REST plumbing in `lightdesk-api`:
//!
//! - **[`LightingDesk`]**: facade owning one [`Connection`] and every
//!   domain adapter attached to it, plus the REST client.
//!
//! - **Adapters** ([`domain`]): per-domain caches kept in sync with the
//!   backend's pushes: [`ChannelsApi`], [`ChannelMappingApi`],
//!   [`UniversesApi`], [`TrackApi`], and a [`ChangeNotifier`] for each
//!   REST-backed list (fixtures, scenes, cues, cue stacks, cue slots, FX
//!   presets). Each one re-requests its state whenever the socket opens.
//!
//! - **[`debounce`]**: generic aggregate-and-debounce helper used to
//!   coalesce channel level pushes.

pub mod config;
pub mod debounce;
pub mod desk;
pub mod domain;
pub mod error;
pub mod model;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::DeskConfig;
pub use debounce::{Debouncer, aggregate_and_debounce};
pub use desk::LightingDesk;
pub use domain::{ChangeNotifier, ChannelMappingApi, ChannelsApi, TrackApi, UniversesApi};
pub use error::CoreError;
pub use model::{ChangeKind, ChannelKey, ChannelLevels, ChannelMapping, FixtureChannel, Track};

pub use lightdesk_api::{
    Connection, ReadyState, ReconnectConfig, Script, SendOutcome, Subscription, TlsMode,
};
