// ── Domain model ──
//
// Canonical types held in the adapter caches. These are decoupled from
// the wire shapes in `lightdesk_api::protocol`; adapters convert on the
// way in.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use lightdesk_api::ServerMessage;
use lightdesk_api::protocol::MappingEntry;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ── Channels ────────────────────────────────────────────────────────

/// Address of one DMX channel.
///
/// Renders as `universe:id`, which is also its serialized form so that a
/// [`ChannelLevels`] map becomes a flat JSON object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelKey {
    pub universe: u16,
    pub id: u16,
}

impl ChannelKey {
    pub const fn new(universe: u16, id: u16) -> Self {
        Self { universe, id }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.universe, self.id)
    }
}

/// Error parsing a `universe:id` channel address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid channel address '{0}' (expected universe:id)")]
pub struct ParseChannelKeyError(String);

impl FromStr for ChannelKey {
    type Err = ParseChannelKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseChannelKeyError(s.to_owned());
        let (universe, id) = s.split_once(':').ok_or_else(err)?;
        Ok(Self {
            universe: universe.trim().parse().map_err(|_| err())?,
            id: id.trim().parse().map_err(|_| err())?,
        })
    }
}

impl Serialize for ChannelKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChannelKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Channel levels keyed by address, ordered by universe then channel.
pub type ChannelLevels = BTreeMap<ChannelKey, u8>;

// ── Channel mapping ─────────────────────────────────────────────────

/// What a DMX channel drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureChannel {
    pub fixture_key: String,
    pub fixture_name: String,
    pub description: String,
}

impl From<MappingEntry> for FixtureChannel {
    fn from(entry: MappingEntry) -> Self {
        Self {
            fixture_key: entry.fixture_key,
            fixture_name: entry.fixture_name,
            description: entry.description,
        }
    }
}

/// Universe → channel → fixture channel.
pub type ChannelMapping = BTreeMap<u16, BTreeMap<u16, FixtureChannel>>;

// ── Track ───────────────────────────────────────────────────────────

/// Now-playing details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub is_playing: bool,
    pub artist: String,
    pub name: String,
}

// ── Change notifications ────────────────────────────────────────────

/// Domains whose backend state is re-fetched on a change notification.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    strum::Display,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ChangeKind {
    Fixtures,
    Scenes,
    Cues,
    CueStacks,
    CueSlots,
    FxPresets,
}

impl ChangeKind {
    /// The change kind a message announces, if it is a change notification.
    pub fn of(message: &ServerMessage) -> Option<Self> {
        match message {
            ServerMessage::FixturesChanged => Some(Self::Fixtures),
            ServerMessage::ScenesChanged => Some(Self::Scenes),
            ServerMessage::CueListChanged => Some(Self::Cues),
            ServerMessage::CueStackListChanged => Some(Self::CueStacks),
            ServerMessage::CueSlotListChanged => Some(Self::CueSlots),
            ServerMessage::FxPresetListChanged => Some(Self::FxPresets),
            ServerMessage::ChannelState { .. }
            | ServerMessage::ChannelMappingState { .. }
            | ServerMessage::UniversesState { .. }
            | ServerMessage::TrackDetails { .. }
            | ServerMessage::Unknown => None,
        }
    }
}
