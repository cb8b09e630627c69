use serde_json::{json, Value};

use crate::broadcast::Notification;
use crate::types::{
    BattlegroundKind, MatchSnapshot, MatchSummary, Position, Team, WorldStateValue,
};

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    Hello {
        name: String,
        team: Option<Team>,
        reconnect_token: Option<String>,
    },
    Move {
        position: Position,
    },
    /// `flag` names the flag's team; `None` is the neutral flag.
    ClickFlag {
        flag: Option<Team>,
    },
    AreaTrigger {
        trigger: u32,
    },
    ReleaseSpirit,
    ReportKill {
        victim: String,
    },
    Logout,
    Ping {
        t: f64,
    },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "hello" => {
            let name = object.get("name")?.as_str()?.to_string();
            let team = match object.get("team") {
                None | Some(Value::Null) => None,
                Some(value) => Some(Team::parse(value.as_str()?)?),
            };
            let reconnect_token = match object.get("reconnectToken") {
                None => None,
                Some(value) => Some(value.as_str()?.to_string()),
            };
            Some(ParsedClientMessage::Hello {
                name,
                team,
                reconnect_token,
            })
        }
        "move" => {
            let x = finite(object.get("x"))?;
            let y = finite(object.get("y"))?;
            let z = finite(object.get("z"))?;
            Some(ParsedClientMessage::Move {
                position: Position::new(x, y, z),
            })
        }
        "click_flag" => {
            let flag = match object.get("flag") {
                None | Some(Value::Null) => None,
                Some(value) => match value.as_str()? {
                    "neutral" => None,
                    raw => Some(Team::parse(raw)?),
                },
            };
            Some(ParsedClientMessage::ClickFlag { flag })
        }
        "area_trigger" => {
            let trigger = u32::try_from(object.get("trigger")?.as_u64()?).ok()?;
            Some(ParsedClientMessage::AreaTrigger { trigger })
        }
        "release_spirit" => Some(ParsedClientMessage::ReleaseSpirit),
        "report_kill" => {
            let victim = object.get("victim")?.as_str()?.to_string();
            Some(ParsedClientMessage::ReportKill { victim })
        }
        "logout" => Some(ParsedClientMessage::Logout),
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}

/// Coordinates must be finite and fit an `f32`.
fn finite(value: Option<&Value>) -> Option<f32> {
    let number = value?.as_f64()?;
    if !number.is_finite() || number.abs() > f32::MAX as f64 {
        return None;
    }
    Some(number as f32)
}

pub fn welcome_message(
    participant_id: &str,
    reconnect_token: &str,
    team: Team,
    kind: BattlegroundKind,
    world_states: &[WorldStateValue],
) -> Value {
    json!({
        "type": "welcome",
        "participantId": participant_id,
        "reconnectToken": reconnect_token,
        "team": team,
        "battleground": kind,
        "worldStates": world_states,
    })
}

pub fn state_message(snapshot: &MatchSnapshot) -> Value {
    json!({
        "type": "state",
        "snapshot": snapshot,
    })
}

pub fn notification_message(notification: &Notification) -> Value {
    json!({
        "type": "notification",
        "audience": notification.audience,
        "event": notification.event,
    })
}

pub fn match_over_message(summary: &MatchSummary) -> Value {
    json!({
        "type": "match_over",
        "summary": summary,
    })
}

pub fn error_message(message: &str) -> Value {
    json!({
        "type": "error",
        "message": message,
    })
}

pub fn pong_message(t: f64) -> Value {
    json!({
        "type": "pong",
        "t": t,
    })
}
