//! Wire protocol for the lighting WebSocket.
//!
//! Every frame in either direction is a JSON object with a string `type`
//! discriminator. Inbound frames are decoded exactly once, here, into
//! [`ServerMessage`]; adapters downstream match on the enum instead of
//! re-parsing raw text. Outbound commands are built as [`ClientMessage`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Inbound ──────────────────────────────────────────────────────────

/// A frame pushed by the lighting backend.
///
/// Unknown `type` values decode to [`ServerMessage::Unknown`]; the
/// socket is shared by many domains, so unrecognised traffic is normal.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, strum::IntoStaticStr)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ServerMessage {
    /// Current level of some (or all) DMX channels.
    ChannelState { channels: Vec<ChannelLevel> },

    /// Full channel → fixture mapping, keyed by universe then channel.
    ChannelMappingState {
        mappings: BTreeMap<u16, BTreeMap<u16, MappingEntry>>,
    },

    /// Universes known to the backend.
    UniversesState { universes: Vec<u16> },

    /// Now-playing information from the beat/track source.
    TrackDetails {
        is_playing: bool,
        #[serde(default)]
        artist: String,
        #[serde(default)]
        name: String,
    },

    // Change notifications: no payload, the consumer re-fetches over REST.
    FixturesChanged,
    ScenesChanged,
    CueListChanged,
    CueStackListChanged,
    CueSlotListChanged,
    FxPresetListChanged,

    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// The wire `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// One entry of a `channelState` push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelLevel {
    pub universe: u16,
    pub id: u16,
    pub current_level: u8,
}

/// What a single DMX channel drives, as reported by `channelMappingState`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    pub fixture_key: String,
    pub fixture_name: String,
    #[serde(default)]
    pub description: String,
}

/// Decode an inbound text frame.
///
/// Returns `None` for malformed JSON, schema mismatches and unknown
/// message types. None of these are errors on a shared socket.
pub fn decode(text: &str) -> Option<ServerMessage> {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(ServerMessage::Unknown) => {
            tracing::trace!("ignoring frame with unrecognised type");
            None
        }
        Ok(message) => Some(message),
        Err(e) => {
            tracing::trace!(error = %e, "ignoring undecodable frame");
            None
        }
    }
}

// ── Outbound ─────────────────────────────────────────────────────────

/// A command sent to the lighting backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, strum::IntoStaticStr)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ClientMessage {
    /// Keep-alive.
    Ping,

    /// Resync request: resend all channel levels.
    ChannelState,

    /// Resync request: resend the channel mapping.
    ChannelMappingState,

    /// Resync request: resend the universe list.
    UniversesState,

    /// Resync request: resend now-playing details.
    TrackDetails,

    /// Fade one channel to `level` over `fade_time` milliseconds.
    UpdateChannel {
        universe: u16,
        id: u16,
        level: u8,
        fade_time: u64,
    },
}

impl ClientMessage {
    /// The wire `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decodes_channel_state() {
        let raw = json!({
            "type": "channelState",
            "channels": [
                { "universe": 0, "id": 1, "currentLevel": 255 },
                { "universe": 1, "id": 12, "currentLevel": 0 }
            ]
        });

        let msg = decode(&raw.to_string()).unwrap();
        assert_eq!(
            msg,
            ServerMessage::ChannelState {
                channels: vec![
                    ChannelLevel { universe: 0, id: 1, current_level: 255 },
                    ChannelLevel { universe: 1, id: 12, current_level: 0 },
                ]
            }
        );
        assert_eq!(msg.kind(), "channelState");
    }

    #[test]
    fn decodes_mapping_with_string_keys() {
        let raw = json!({
            "type": "channelMappingState",
            "mappings": {
                "0": {
                    "1": { "fixtureKey": "par-1", "fixtureName": "Front Par", "description": "dimmer" },
                    "2": { "fixtureKey": "par-1", "fixtureName": "Front Par" }
                }
            }
        });

        let Some(ServerMessage::ChannelMappingState { mappings }) = decode(&raw.to_string()) else {
            panic!("expected channelMappingState");
        };
        let universe = &mappings[&0];
        assert_eq!(universe[&1].fixture_key, "par-1");
        assert_eq!(universe[&1].description, "dimmer");
        assert_eq!(universe[&2].description, "");
    }

    #[test]
    fn decodes_payloadless_notifications() {
        assert_eq!(
            decode(r#"{"type":"fixturesChanged"}"#),
            Some(ServerMessage::FixturesChanged)
        );
        assert_eq!(
            decode(r#"{"type":"fxPresetListChanged","extra":true}"#),
            Some(ServerMessage::FxPresetListChanged)
        );
    }

    #[test]
    fn decodes_track_details() {
        let raw = r#"{"type":"trackDetails","isPlaying":true,"artist":"Daft Punk","name":"Aerodynamic"}"#;
        assert_eq!(
            decode(raw),
            Some(ServerMessage::TrackDetails {
                is_playing: true,
                artist: "Daft Punk".into(),
                name: "Aerodynamic".into(),
            })
        );
    }

    #[test]
    fn ignores_unknown_types() {
        assert_eq!(decode(r#"{"type":"pong"}"#), None);
        assert_eq!(decode(r#"{"type":"beatSync","bpm":128}"#), None);
    }

    #[test]
    fn ignores_malformed_frames() {
        assert_eq!(decode("not json at all"), None);
        assert_eq!(decode(r#"{"channels":[]}"#), None);
        // Level out of DMX range fails the schema.
        assert_eq!(
            decode(r#"{"type":"channelState","channels":[{"universe":0,"id":1,"currentLevel":300}]}"#),
            None
        );
        assert_eq!(decode(r#"{"type":"universesState"}"#), None);
    }

    #[test]
    fn encodes_update_channel() {
        let cmd = ClientMessage::UpdateChannel {
            universe: 0,
            id: 1,
            level: 200,
            fade_time: 0,
        };
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({ "type": "updateChannel", "universe": 0, "id": 1, "level": 200, "fadeTime": 0 })
        );
        assert_eq!(cmd.kind(), "updateChannel");
    }

    #[test]
    fn encodes_resync_requests_as_bare_type() {
        assert_eq!(
            serde_json::to_string(&ClientMessage::ChannelState).unwrap(),
            r#"{"type":"channelState"}"#
        );
        assert_eq!(
            serde_json::to_string(&ClientMessage::Ping).unwrap(),
            r#"{"type":"ping"}"#
        );
        assert_eq!(
            serde_json::to_string(&ClientMessage::UniversesState).unwrap(),
            r#"{"type":"universesState"}"#
        );
    }
}
