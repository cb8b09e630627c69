use crate::types::{ParticipantKind, ScoreType, ScoreboardEntry, Team};

/// Holiday doubles some rewards; picks the row of a rule set's honor table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HonorMode {
    Normal,
    Holiday,
}

impl HonorMode {
    pub fn from_holiday(holiday: bool) -> Self {
        if holiday {
            Self::Holiday
        } else {
            Self::Normal
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Normal => 0,
            Self::Holiday => 1,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParticipantScore {
    pub killing_blows: u32,
    pub deaths: u32,
    pub honorable_kills: u32,
    pub bonus_honor: u32,
    pub damage_done: u32,
    pub healing_done: u32,
    pub flag_captures: u32,
    pub flag_returns: u32,
}

impl ParticipantScore {
    pub fn update(&mut self, score_type: ScoreType, value: u32) {
        let column = match score_type {
            ScoreType::KillingBlows => &mut self.killing_blows,
            ScoreType::Deaths => &mut self.deaths,
            ScoreType::HonorableKills => &mut self.honorable_kills,
            ScoreType::BonusHonor => &mut self.bonus_honor,
            ScoreType::DamageDone => &mut self.damage_done,
            ScoreType::HealingDone => &mut self.healing_done,
            ScoreType::FlagCaptures => &mut self.flag_captures,
            ScoreType::FlagReturns => &mut self.flag_returns,
        };
        *column = column.saturating_add(value);
    }

    /// Objective columns in persisted order; unused slots stay zero.
    pub fn attrs(&self) -> [u32; 5] {
        [self.flag_captures, self.flag_returns, 0, 0, 0]
    }

    pub fn entry(&self, id: &str, name: &str, team: Team, kind: ParticipantKind) -> ScoreboardEntry {
        ScoreboardEntry {
            participant_id: id.to_string(),
            name: name.to_string(),
            team,
            kind,
            killing_blows: self.killing_blows,
            deaths: self.deaths,
            honorable_kills: self.honorable_kills,
            bonus_honor: self.bonus_honor,
            damage_done: self.damage_done,
            healing_done: self.healing_done,
            flag_captures: self.flag_captures,
            flag_returns: self.flag_returns,
        }
    }
}
