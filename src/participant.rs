use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::types::{ParticipantKind, ParticipantView, Position, Team};

/// What the match needs from anything standing on the battlefield.
///
/// Humans and bots both implement it, so the controller never branches on
/// who is behind a participant except where rules explicitly count humans.
pub trait Combatant: Debug + Send {
    fn kind(&self) -> ParticipantKind;
    fn position(&self) -> Position;
    fn set_position(&mut self, position: Position);
    fn is_alive(&self) -> bool;
    fn set_alive(&mut self, alive: bool);
    fn is_concealed(&self) -> bool;
    fn set_concealed(&mut self, concealed: bool);

    fn can_capture_point(&self) -> bool {
        self.is_alive() && !self.is_concealed()
    }

    fn steering(&mut self) -> Option<&mut BotSteering> {
        None
    }
}

#[derive(Clone, Debug)]
pub struct Avatar {
    position: Position,
    alive: bool,
    concealed: bool,
}

impl Avatar {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            alive: true,
            concealed: false,
        }
    }
}

impl Combatant for Avatar {
    fn kind(&self) -> ParticipantKind {
        ParticipantKind::Player
    }

    fn position(&self) -> Position {
        self.position
    }

    fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn set_alive(&mut self, alive: bool) {
        self.alive = alive;
    }

    fn is_concealed(&self) -> bool {
        self.concealed
    }

    fn set_concealed(&mut self, concealed: bool) {
        self.concealed = concealed;
    }
}

/// Steering state carried by bots between decisions.
#[derive(Clone, Debug, Default)]
pub struct BotSteering {
    pub target: Option<Position>,
    pub think_at_ms: u64,
    pub speed: f32,
}

#[derive(Clone, Debug)]
pub struct BotAvatar {
    avatar: Avatar,
    steering: BotSteering,
}

impl BotAvatar {
    pub const DEFAULT_SPEED: f32 = 7.0;

    pub fn new(position: Position) -> Self {
        Self {
            avatar: Avatar::new(position),
            steering: BotSteering {
                target: None,
                think_at_ms: 0,
                speed: Self::DEFAULT_SPEED,
            },
        }
    }
}

impl Combatant for BotAvatar {
    fn kind(&self) -> ParticipantKind {
        ParticipantKind::Bot
    }

    fn position(&self) -> Position {
        self.avatar.position
    }

    fn set_position(&mut self, position: Position) {
        self.avatar.position = position;
    }

    fn is_alive(&self) -> bool {
        self.avatar.alive
    }

    fn set_alive(&mut self, alive: bool) {
        self.avatar.alive = alive;
        if !alive {
            self.steering.target = None;
        }
    }

    fn is_concealed(&self) -> bool {
        self.avatar.concealed
    }

    fn set_concealed(&mut self, concealed: bool) {
        self.avatar.concealed = concealed;
    }

    fn steering(&mut self) -> Option<&mut BotSteering> {
        Some(&mut self.steering)
    }
}

#[derive(Clone, Debug)]
pub struct JoinRequest {
    pub id: String,
    pub name: String,
    pub team: Team,
    pub kind: ParticipantKind,
    pub random_winner: bool,
    pub position: Option<Position>,
}

impl JoinRequest {
    pub fn player(id: impl Into<String>, name: impl Into<String>, team: Team) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            team,
            kind: ParticipantKind::Player,
            random_winner: false,
            position: None,
        }
    }

    pub fn bot(id: impl Into<String>, name: impl Into<String>, team: Team) -> Self {
        Self {
            kind: ParticipantKind::Bot,
            ..Self::player(id, name, team)
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn random_winner(mut self, value: bool) -> Self {
        self.random_winner = value;
        self
    }
}

#[derive(Debug)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub team: Team,
    pub online: bool,
    /// Match-clock deadline for the offline grace period; 0 while online.
    pub offline_remove_at_ms: u64,
    pub random_winner: bool,
    pub reputation: BTreeMap<u32, u32>,
    avatar: Box<dyn Combatant>,
}

impl Participant {
    pub fn from_join(join: JoinRequest, spawn: Position) -> Self {
        let position = join.position.unwrap_or(spawn);
        let avatar: Box<dyn Combatant> = match join.kind {
            ParticipantKind::Player => Box::new(Avatar::new(position)),
            ParticipantKind::Bot => Box::new(BotAvatar::new(position)),
        };
        Self::with_avatar(join.id, join.name, join.team, join.random_winner, avatar)
    }

    pub fn with_avatar(
        id: String,
        name: String,
        team: Team,
        random_winner: bool,
        avatar: Box<dyn Combatant>,
    ) -> Self {
        Self {
            id,
            name,
            team,
            online: true,
            offline_remove_at_ms: 0,
            random_winner,
            reputation: BTreeMap::new(),
            avatar,
        }
    }

    pub fn kind(&self) -> ParticipantKind {
        self.avatar.kind()
    }

    pub fn is_bot(&self) -> bool {
        self.kind() == ParticipantKind::Bot
    }

    pub fn avatar(&self) -> &dyn Combatant {
        self.avatar.as_ref()
    }

    pub fn avatar_mut(&mut self) -> &mut dyn Combatant {
        self.avatar.as_mut()
    }

    pub fn position(&self) -> Position {
        self.avatar.position()
    }

    pub fn is_alive(&self) -> bool {
        self.avatar.is_alive()
    }

    pub fn add_reputation(&mut self, faction_id: u32, amount: u32) {
        *self.reputation.entry(faction_id).or_insert(0) += amount;
    }

    pub fn view(&self) -> ParticipantView {
        ParticipantView {
            id: self.id.clone(),
            name: self.name.clone(),
            team: self.team,
            kind: self.kind(),
            online: self.online,
            alive: self.is_alive(),
            position: self.position(),
        }
    }
}
