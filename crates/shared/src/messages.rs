//! Outbound message types for Player-server communication
//!
//! Every action the Player pushes over the session connection is a JSON object
//! discriminated by its `action` field. The server answers with free-form JSON
//! that this crate does not model (see `frame`).
//!
//! ## Versioning Policy
//!
//! - New variants can be added at the end (forward compatible)
//! - Renaming variants or the `action` values is a breaking change

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// Teams
// =============================================================================

/// The two transit companies a player can join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    #[serde(rename = "IRT")]
    Irt,
    #[serde(rename = "BMT")]
    Bmt,
}

impl Team {
    /// Wire name of the team.
    pub fn as_str(self) -> &'static str {
        match self {
            Team::Irt => "IRT",
            Team::Bmt => "BMT",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Team> for String {
    fn from(team: Team) -> Self {
        team.as_str().to_string()
    }
}

/// Returned when parsing a team name that is neither `IRT` nor `BMT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTeam(pub String);

impl fmt::Display for UnknownTeam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown team '{}' (expected IRT or BMT)", self.0)
    }
}

impl std::error::Error for UnknownTeam {}

impl FromStr for Team {
    type Err = UnknownTeam;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IRT" => Ok(Team::Irt),
            "BMT" => Ok(Team::Bmt),
            _ => Err(UnknownTeam(s.to_string())),
        }
    }
}

// =============================================================================
// Client Messages (Player → server)
// =============================================================================

/// Messages from the Player to the game server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join one of the two teams
    Join { team: Team },
    /// Start the game once both teams are present
    Start,
    /// Bid on a biddable item (line, contract, ...)
    Bid { biddable: String, bid: u64 },
    /// Build a station on a line
    Build { line: String, id: String },
    /// Finish the current turn
    EndTurn,
    /// Heartbeat probe
    Ping,
    /// Sent right after a reconnect so the server can restore the team binding
    Reconnect {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        team: Option<String>,
    },
}

impl ClientMessage {
    /// Reconnect announcement, omitting empty team names.
    pub fn reconnect(team: Option<&str>) -> Self {
        ClientMessage::Reconnect {
            team: team.filter(|t| !t.is_empty()).map(str::to_string),
        }
    }
}

/// Empty object asking the server to push the current game state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRequest {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_actions_use_snake_case_discriminant() {
        let end_turn = serde_json::to_value(ClientMessage::EndTurn).unwrap();
        assert_eq!(end_turn, json!({ "action": "end_turn" }));

        let build = serde_json::to_value(ClientMessage::Build {
            line: "A".into(),
            id: "42nd-st".into(),
        })
        .unwrap();
        assert_eq!(build, json!({ "action": "build", "line": "A", "id": "42nd-st" }));
    }

    #[test]
    fn test_join_serializes_team_wire_name() {
        let join = serde_json::to_value(ClientMessage::Join { team: Team::Bmt }).unwrap();
        assert_eq!(join, json!({ "action": "join", "team": "BMT" }));
    }

    #[test]
    fn test_reconnect_omits_missing_or_empty_team() {
        assert_eq!(
            serde_json::to_string(&ClientMessage::reconnect(None)).unwrap(),
            r#"{"action":"reconnect"}"#
        );
        assert_eq!(
            serde_json::to_string(&ClientMessage::reconnect(Some(""))).unwrap(),
            r#"{"action":"reconnect"}"#
        );
        assert_eq!(
            serde_json::to_string(&ClientMessage::reconnect(Some("IRT"))).unwrap(),
            r#"{"action":"reconnect","team":"IRT"}"#
        );
    }

    #[test]
    fn test_state_request_is_empty_object() {
        assert_eq!(serde_json::to_string(&StateRequest {}).unwrap(), "{}");
    }

    #[test]
    fn test_team_parsing() {
        assert_eq!("irt".parse::<Team>(), Ok(Team::Irt));
        assert_eq!(" BMT ".parse::<Team>(), Ok(Team::Bmt));
        assert!("IND".parse::<Team>().is_err());
        assert_eq!(String::from(Team::Irt), "IRT");
    }
}
