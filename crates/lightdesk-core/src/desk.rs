// ── LightingDesk facade ──
//
// Owns one connection plus every domain adapter built on it, and the REST
// client used alongside. Adapters are attached before the connection is
// started so none of them misses the first open.

use std::time::Duration;

use lightdesk_api::{
    Connection, Connector, ReadyState, RestClient, Script, TungsteniteConnector,
};
use tokio::sync::watch;

use crate::config::DeskConfig;
use crate::domain::{
    ChangeNotifier, ChannelMappingApi, ChannelsApi, TrackApi, UniversesApi,
};
use crate::error::CoreError;
use crate::model::ChangeKind;

/// The full real-time view of one lighting backend.
pub struct LightingDesk {
    config: DeskConfig,
    connection: Connection,
    rest: RestClient,
    channels: ChannelsApi,
    channel_mapping: ChannelMappingApi,
    universes: UniversesApi,
    track: TrackApi,
    fixtures: ChangeNotifier,
    scenes: ChangeNotifier,
    cues: ChangeNotifier,
    cue_stacks: ChangeNotifier,
    cue_slots: ChangeNotifier,
    fx_presets: ChangeNotifier,
}

impl LightingDesk {
    /// Connect over TCP/TLS. Must be called within a Tokio runtime.
    pub fn connect(config: DeskConfig) -> Result<Self, CoreError> {
        Self::with_connector(config, TungsteniteConnector)
    }

    /// Connect through a caller-supplied [`Connector`].
    pub fn with_connector<C: Connector>(config: DeskConfig, connector: C) -> Result<Self, CoreError> {
        let connection = Connection::new(config.connection_config()?);
        let rest = RestClient::new(config.base_url.clone(), &config.transport_config())?;

        let desk = Self {
            channels: ChannelsApi::with_debounce(&connection, config.channel_debounce),
            channel_mapping: ChannelMappingApi::new(&connection),
            universes: UniversesApi::new(&connection),
            track: TrackApi::new(&connection),
            fixtures: ChangeNotifier::new(&connection, ChangeKind::Fixtures),
            scenes: ChangeNotifier::new(&connection, ChangeKind::Scenes),
            cues: ChangeNotifier::new(&connection, ChangeKind::Cues),
            cue_stacks: ChangeNotifier::new(&connection, ChangeKind::CueStacks),
            cue_slots: ChangeNotifier::new(&connection, ChangeKind::CueSlots),
            fx_presets: ChangeNotifier::new(&connection, ChangeKind::FxPresets),
            rest,
            connection,
            config,
        };

        tracing::info!(
            base_url = %desk.config.base_url,
            ws_url = %desk.connection.ws_url(),
            "starting lighting desk"
        );
        desk.connection.start(connector);
        Ok(desk)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn connection_state(&self) -> ReadyState {
        self.connection.ready_state()
    }

    pub fn state_changes(&self) -> watch::Receiver<ReadyState> {
        self.connection.state_changes()
    }

    pub fn channels(&self) -> &ChannelsApi {
        &self.channels
    }

    pub fn channel_mapping(&self) -> &ChannelMappingApi {
        &self.channel_mapping
    }

    pub fn universes(&self) -> &UniversesApi {
        &self.universes
    }

    pub fn track(&self) -> &TrackApi {
        &self.track
    }

    pub fn fixtures(&self) -> &ChangeNotifier {
        &self.fixtures
    }

    pub fn scenes(&self) -> &ChangeNotifier {
        &self.scenes
    }

    pub fn cues(&self) -> &ChangeNotifier {
        &self.cues
    }

    pub fn cue_stacks(&self) -> &ChangeNotifier {
        &self.cue_stacks
    }

    pub fn cue_slots(&self) -> &ChangeNotifier {
        &self.cue_slots
    }

    pub fn fx_presets(&self) -> &ChangeNotifier {
        &self.fx_presets
    }

    /// The notifier for one kind of list change.
    pub fn notifier(&self, kind: ChangeKind) -> &ChangeNotifier {
        match kind {
            ChangeKind::Fixtures => &self.fixtures,
            ChangeKind::Scenes => &self.scenes,
            ChangeKind::Cues => &self.cues,
            ChangeKind::CueStacks => &self.cue_stacks,
            ChangeKind::CueSlots => &self.cue_slots,
            ChangeKind::FxPresets => &self.fx_presets,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Resolve once the socket is open, or fail after `timeout`.
    pub async fn wait_until_open(&self, timeout: Duration) -> Result<(), CoreError> {
        let mut states = self.connection.state_changes();
        let opened = tokio::time::timeout(timeout, async {
            states
                .wait_for(|state| *state == ReadyState::Open)
                .await
                .map(|_| ())
        })
        .await;

        match opened {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(CoreError::Disconnected),
            Err(_) => Err(CoreError::Timeout {
                timeout_secs: timeout.as_secs(),
            }),
        }
    }

    /// Stop reconnecting and close the socket.
    pub async fn shutdown(&self) {
        tracing::debug!("shutting down lighting desk");
        self.connection.close().await;
    }

    // ── REST ─────────────────────────────────────────────────────────

    /// Stored scripts, fetched over REST.
    pub async fn list_scripts(&self) -> Result<Vec<Script>, CoreError> {
        Ok(self.rest.list_scripts().await?)
    }

    /// One-shot script fetch that never opens the socket.
    pub async fn fetch_scripts(config: &DeskConfig) -> Result<Vec<Script>, CoreError> {
        let rest = RestClient::new(config.base_url.clone(), &config.transport_config())?;
        Ok(rest.list_scripts().await?)
    }
}

impl std::fmt::Debug for LightingDesk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightingDesk")
            .field("base_url", &self.config.base_url.as_str())
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}
