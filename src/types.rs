use serde::{Deserialize, Serialize};

use crate::broadcast::Notification;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Alliance,
    Horde,
}

impl Team {
    pub const ALL: [Team; 2] = [Team::Alliance, Team::Horde];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "alliance" => Some(Self::Alliance),
            "horde" => Some(Self::Horde),
            _ => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::Alliance => Self::Horde,
            Self::Horde => Self::Alliance,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Alliance => 0,
            Self::Horde => 1,
        }
    }

    pub fn channel(self) -> ChatChannel {
        match self {
            Self::Alliance => ChatChannel::Alliance,
            Self::Horde => ChatChannel::Horde,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    NotStarted,
    Warmup,
    Running,
    Ending,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    Player,
    Bot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattlegroundKind {
    WarsongGulch,
    EyeOfTheStorm,
}

impl BattlegroundKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "warsong_gulch" | "ws" => Some(Self::WarsongGulch),
            "eye_of_the_storm" | "ey" => Some(Self::EyeOfTheStorm),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::WarsongGulch => "Warsong Gulch",
            Self::EyeOfTheStorm => "Eye of the Storm",
        }
    }

    /// Battleground type id as persisted with match statistics.
    pub fn type_id(self) -> u8 {
        match self {
            Self::WarsongGulch => 2,
            Self::EyeOfTheStorm => 7,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationType {
    #[default]
    NoBalance,
    Balanced,
    Even,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreType {
    KillingBlows,
    Deaths,
    HonorableKills,
    BonusHonor,
    DamageDone,
    HealingDone,
    FlagCaptures,
    FlagReturns,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatChannel {
    Neutral,
    Alliance,
    Horde,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagState {
    OnBase,
    WaitRespawn,
    OnPlayer,
    OnGround,
}

impl FlagState {
    /// Wire value used in flag world states.
    pub fn code(self) -> i32 {
        match self {
            Self::OnBase => 0,
            Self::WaitRespawn => 1,
            Self::OnPlayer => 2,
            Self::OnGround => 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointState {
    Uncontrolled,
    UnderControl,
}

#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        self.distance_sq(other).sqrt()
    }

    pub fn distance_sq(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    pub fn within(&self, other: &Position, radius: f32) -> bool {
        self.distance_sq(other) <= radius * radius
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct WorldStateValue {
    pub id: u32,
    pub value: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchEvent {
    StatusChanged {
        status: MatchStatus,
    },
    WorldState {
        id: u32,
        value: i32,
    },
    BroadcastText {
        #[serde(rename = "textId")]
        text_id: u32,
        channel: ChatChannel,
        source: Option<String>,
    },
    Sound {
        #[serde(rename = "soundId")]
        sound_id: u32,
    },
    PrematureWarningMinutes {
        minutes: u32,
    },
    PrematureWarningSeconds {
        seconds: u32,
    },
    ParticipantJoined {
        #[serde(rename = "participantId")]
        participant_id: String,
        team: Team,
    },
    ParticipantLeft {
        #[serde(rename = "participantId")]
        participant_id: String,
        team: Team,
    },
    HonorAwarded {
        #[serde(rename = "participantId")]
        participant_id: String,
        amount: u32,
    },
    ReputationAwarded {
        #[serde(rename = "participantId")]
        participant_id: String,
        #[serde(rename = "factionId")]
        faction_id: u32,
        amount: u32,
    },
    AuraApplied {
        #[serde(rename = "participantId")]
        participant_id: String,
        #[serde(rename = "spellId")]
        spell_id: u32,
    },
    AuraRemoved {
        #[serde(rename = "participantId")]
        participant_id: String,
        #[serde(rename = "spellId")]
        spell_id: u32,
    },
    SpiritHeal {
        #[serde(rename = "graveyardId")]
        graveyard_id: u32,
    },
    Resurrected {
        #[serde(rename = "participantId")]
        participant_id: String,
        position: Position,
    },
    MovementBlocked {
        #[serde(rename = "participantId")]
        participant_id: String,
    },
    MatchEnded {
        winner: Option<Team>,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TeamScores {
    pub alliance: u32,
    pub horde: u32,
}

impl TeamScores {
    pub fn get(&self, team: Team) -> u32 {
        match team {
            Team::Alliance => self.alliance,
            Team::Horde => self.horde,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TimelineEvent {
    #[serde(rename = "atMs")]
    pub at_ms: u64,
    pub label: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ParticipantView {
    pub id: String,
    pub name: String,
    pub team: Team,
    pub kind: ParticipantKind,
    pub online: bool,
    pub alive: bool,
    pub position: Position,
}

#[derive(Clone, Debug, Serialize)]
pub struct FlagView {
    /// Team the flag belongs to; `None` for a neutral flag.
    pub team: Option<Team>,
    pub state: FlagState,
    pub carrier: Option<String>,
    /// Where a dropped flag lies.
    #[serde(rename = "groundPosition", skip_serializing_if = "Option::is_none")]
    pub ground_position: Option<Position>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CapturePointView {
    pub name: String,
    pub owner: Option<Team>,
    pub state: PointState,
    pub bar: i32,
    #[serde(rename = "allianceNear")]
    pub alliance_near: u32,
    #[serde(rename = "hordeNear")]
    pub horde_near: u32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectiveView {
    CaptureTheFlag {
        flags: Vec<FlagView>,
        #[serde(rename = "minutesRemaining")]
        minutes_remaining: u32,
        #[serde(rename = "assaultStage")]
        assault_stage: u8,
    },
    TerritoryControl {
        flag: FlagView,
        points: Vec<CapturePointView>,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct MatchSnapshot {
    pub tick: u64,
    pub kind: BattlegroundKind,
    #[serde(rename = "instanceId")]
    pub instance_id: u32,
    pub status: MatchStatus,
    #[serde(rename = "startTimeMs")]
    pub start_time_ms: u64,
    pub winner: Option<Team>,
    #[serde(rename = "teamScores")]
    pub team_scores: TeamScores,
    pub participants: Vec<ParticipantView>,
    pub objective: ObjectiveView,
    pub notifications: Vec<Notification>,
    pub timeline: Vec<TimelineEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ScoreboardEntry {
    #[serde(rename = "participantId")]
    pub participant_id: String,
    pub name: String,
    pub team: Team,
    pub kind: ParticipantKind,
    #[serde(rename = "killingBlows")]
    pub killing_blows: u32,
    pub deaths: u32,
    #[serde(rename = "honorableKills")]
    pub honorable_kills: u32,
    #[serde(rename = "bonusHonor")]
    pub bonus_honor: u32,
    #[serde(rename = "damageDone")]
    pub damage_done: u32,
    #[serde(rename = "healingDone")]
    pub healing_done: u32,
    #[serde(rename = "flagCaptures")]
    pub flag_captures: u32,
    #[serde(rename = "flagReturns")]
    pub flag_returns: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct MatchSummary {
    pub kind: BattlegroundKind,
    #[serde(rename = "instanceId")]
    pub instance_id: u32,
    pub winner: Option<Team>,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    #[serde(rename = "teamScores")]
    pub team_scores: TeamScores,
    pub timeline: Vec<TimelineEvent>,
    pub scoreboard: Vec<ScoreboardEntry>,
}
