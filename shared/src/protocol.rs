//! Wire protocol for the scene websocket.
//!
//! Frames are independent UTF-8 JSON objects. Inbound frames all share one
//! shape, an object with optional fields, of which the server acts on the
//! first present in priority order (`image`, `join`, `battle`, `attack`,
//! `clean`, `leave`, `vote`). Outbound frames are objects keyed by event;
//! every frame except `error` is broadcast to all live sessions, while
//! `error` only ever goes back to the sender.
//!
//! Key spellings on the wire are part of the contract (`voteEnabled`,
//! `fullPP`, `updateState`, `UNTIL_DEATH`, ...) and are pinned with serde
//! renames rather than trusted to a naming convention.

use serde::{Deserialize, Serialize};

/// Attack command payload: all tyrant ids plus the attack name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackCommand {
    pub user: String,
    pub target: String,
    pub attack: String,
}

/// One inbound client frame.
///
/// Unknown fields are tolerated and ignored. `user` rides along with `vote`
/// and `leave` to name the acting tyrant when the sender owns several.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enemy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack: Option<AttackCommand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leave: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// One entry of the upcoming-turn preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnEntry {
    pub id: String,
    pub asset: String,
    pub enemy: bool,
}

/// Per-attack PP readout inside a tyrant snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackStatus {
    pub name: String,
    #[serde(rename = "fullPP")]
    pub full_pp: i32,
    #[serde(rename = "currentPP")]
    pub current_pp: i32,
}

/// One participant's slice of the scene snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TyrantStatus {
    pub id: String,
    pub full_hp: i32,
    pub current_hp: i32,
    pub asset: String,
    pub enemy: bool,
    pub attacks: Vec<AttackStatus>,
}

/// The two admissible ballot choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteChoice {
    UntilDeath,
    ToParty,
}

impl VoteChoice {
    /// Parses a raw ballot string; anything outside the accepted set is None.
    pub fn parse(raw: &str) -> Option<VoteChoice> {
        match raw {
            "UNTIL_DEATH" => Some(VoteChoice::UntilDeath),
            "TO_PARTY" => Some(VoteChoice::ToParty),
            _ => None,
        }
    }
}

/// Running (or final) ballot counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    #[serde(rename = "UNTIL_DEATH")]
    pub until_death: u32,
    #[serde(rename = "TO_PARTY")]
    pub to_party: u32,
}

/// Terminal battle results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "WIN")]
    Win,
    #[serde(rename = "DEFEAT")]
    Defeat,
}

/// What an attack resolution reports: either a terminal verdict string or
/// the full tyrant snapshot when the battle continues.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BattleOutcome {
    Ended(Verdict),
    Update { tyrants: Vec<TyrantStatus> },
}

/// One outbound server frame.
///
/// Serialized untagged: each variant's field names are the wire keys, so a
/// variant *is* its JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerEvent {
    /// Scenic backdrop passthrough, broadcast verbatim.
    Image {
        image: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        fill: Option<bool>,
    },
    /// A tyrant was enrolled (or re-enrolled) into the scene.
    Joined {
        joined: String,
        enemy: bool,
        turns: Vec<TurnEntry>,
    },
    /// Running ballot counts while a vote is open.
    Voting { voting: VoteTally },
    /// Battle start snapshot; `voting` is present when a vote resolved it.
    BattleStarted {
        battle: String,
        turns: Vec<TurnEntry>,
        #[serde(skip_serializing_if = "Option::is_none")]
        voting: Option<VoteTally>,
        tyrants: Vec<TyrantStatus>,
    },
    /// Result of one attack: snapshot or terminal verdict, plus the queue.
    TurnResolved {
        #[serde(rename = "updateState")]
        update_state: BattleOutcome,
        turns: Vec<TurnEntry>,
    },
    /// The scene was reset.
    Cleaned { clean: bool, turns: Vec<TurnEntry> },
    /// An ally left the scene.
    Left { left: String, turns: Vec<TurnEntry> },
    /// Sender-only failure report; `expected` names the actor whose turn it
    /// actually is on turn violations.
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        expected: Option<String>,
    },
}

impl ServerEvent {
    /// Plain sender-only error frame.
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            error: message.into(),
            expected: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_frame_field_spellings() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"battle":"HERO","voteEnabled":true}"#).unwrap();
        assert_eq!(frame.battle.as_deref(), Some("HERO"));
        assert_eq!(frame.vote_enabled, Some(true));
    }

    #[test]
    fn test_client_frame_tolerates_unknown_fields() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"join":"HERO","enemy":true,"spectator":"yes"}"#).unwrap();
        assert_eq!(frame.join.as_deref(), Some("HERO"));
        assert_eq!(frame.enemy, Some(true));
    }

    #[test]
    fn test_client_frame_attack_payload() {
        let frame: ClientFrame = serde_json::from_str(
            r#"{"attack":{"user":"HERO","target":"OGRE","attack":"slash"}}"#,
        )
        .unwrap();
        let cmd = frame.attack.unwrap();
        assert_eq!(cmd.user, "HERO");
        assert_eq!(cmd.target, "OGRE");
        assert_eq!(cmd.attack, "slash");
    }

    #[test]
    fn test_vote_choice_parsing() {
        assert_eq!(VoteChoice::parse("UNTIL_DEATH"), Some(VoteChoice::UntilDeath));
        assert_eq!(VoteChoice::parse("TO_PARTY"), Some(VoteChoice::ToParty));
        assert_eq!(VoteChoice::parse("until_death"), None);
        assert_eq!(VoteChoice::parse(""), None);
    }

    #[test]
    fn test_vote_tally_wire_keys() {
        let tally = VoteTally {
            until_death: 2,
            to_party: 1,
        };
        assert_eq!(
            serde_json::to_value(tally).unwrap(),
            json!({"UNTIL_DEATH": 2, "TO_PARTY": 1})
        );
    }

    #[test]
    fn test_attack_status_wire_keys() {
        let status = AttackStatus {
            name: "slash".to_string(),
            full_pp: 2,
            current_pp: 1,
        };
        assert_eq!(
            serde_json::to_value(status).unwrap(),
            json!({"name": "slash", "fullPP": 2, "currentPP": 1})
        );
    }

    #[test]
    fn test_error_frame_omits_absent_expected() {
        let event = ServerEvent::error("not in battle");
        assert_eq!(
            serde_json::to_value(event).unwrap(),
            json!({"error": "not in battle"})
        );

        let event = ServerEvent::Error {
            error: "not your turn".to_string(),
            expected: Some("HERO".to_string()),
        };
        assert_eq!(
            serde_json::to_value(event).unwrap(),
            json!({"error": "not your turn", "expected": "HERO"})
        );
    }

    #[test]
    fn test_image_frame_omits_absent_fill() {
        let event = ServerEvent::Image {
            image: "cave".to_string(),
            fill: None,
        };
        assert_eq!(
            serde_json::to_value(event).unwrap(),
            json!({"image": "cave"})
        );
    }

    #[test]
    fn test_outcome_serializes_verdict_or_snapshot() {
        let win = BattleOutcome::Ended(Verdict::Win);
        assert_eq!(serde_json::to_value(win).unwrap(), json!("WIN"));

        let update = BattleOutcome::Update {
            tyrants: vec![TyrantStatus {
                id: "OGRE".to_string(),
                full_hp: 80,
                current_hp: 56,
                asset: "ogre.png".to_string(),
                enemy: true,
                attacks: vec![],
            }],
        };
        assert_eq!(
            serde_json::to_value(update).unwrap(),
            json!({"tyrants": [{
                "id": "OGRE",
                "fullHp": 80,
                "currentHp": 56,
                "asset": "ogre.png",
                "enemy": true,
                "attacks": []
            }]})
        );
    }

    #[test]
    fn test_update_state_wire_key() {
        let event = ServerEvent::TurnResolved {
            update_state: BattleOutcome::Ended(Verdict::Defeat),
            turns: vec![],
        };
        assert_eq!(
            serde_json::to_value(event).unwrap(),
            json!({"updateState": "DEFEAT", "turns": []})
        );
    }
}
