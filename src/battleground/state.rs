use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, info};

use super::rules::BattlegroundRules;
use super::BattlegroundOptions;
use crate::arena::ArenaLayout;
use crate::broadcast::Notifier;
use crate::constants::{
    bonus_honor_from_kills, sound_team_wins, text_team_wins, GROUP_REWARD_DISTANCE,
    TIME_TO_AUTOREMOVE_MS,
};
use crate::error::BattlegroundError;
use crate::participant::Participant;
use crate::score::{HonorMode, ParticipantScore};
use crate::stats_store::{MatchRecord, PlayerStatsRow, StoreRecord};
use crate::types::{
    BattlegroundKind, ChatChannel, MatchEvent, MatchStatus, ScoreType, Team, TeamScores,
    TimelineEvent,
};

/// Everything a match owns apart from its rule set. Rule sets receive it
/// mutably on every hook.
#[derive(Debug)]
pub struct MatchState {
    pub(super) kind: BattlegroundKind,
    pub(super) instance_id: u32,
    pub(super) options: BattlegroundOptions,
    pub(super) layout: ArenaLayout,
    pub(super) status: MatchStatus,
    /// Sum of every update's diff; drives the offline grace period.
    pub(super) clock_ms: u64,
    pub(super) start_time_ms: u64,
    pub(super) start_delay_ms: i64,
    pub(super) end_time_ms: i64,
    pub(super) events: u8,
    pub(super) winner: Option<Team>,
    pub(super) should_delete: bool,
    pub(super) in_free_slot_queue: bool,
    pub(super) team_scores: [u32; 2],
    pub(super) invited: [u32; 2],
    pub(super) team_counts: [u32; 2],
    pub(super) participants: BTreeMap<String, Participant>,
    pub(super) scores: BTreeMap<String, ParticipantScore>,
    pub(super) offline_queue: VecDeque<String>,
    pub(super) revive_queue: BTreeMap<u32, Vec<String>>,
    pub(super) resurrect_list: Vec<(String, u32)>,
    pub(super) last_resurrect_ms: u64,
    pub(super) premature_remaining_ms: Option<u64>,
    pub(super) notifier: Notifier,
    pub(super) records: Vec<StoreRecord>,
    pub(super) timeline: Vec<TimelineEvent>,
}

impl MatchState {
    pub(super) fn new(kind: BattlegroundKind, instance_id: u32, options: BattlegroundOptions) -> Self {
        Self {
            kind,
            instance_id,
            options,
            layout: ArenaLayout::for_kind(kind),
            status: MatchStatus::NotStarted,
            clock_ms: 0,
            start_time_ms: 0,
            start_delay_ms: 0,
            end_time_ms: 0,
            events: 0,
            winner: None,
            should_delete: false,
            in_free_slot_queue: false,
            team_scores: [0, 0],
            invited: [0, 0],
            team_counts: [0, 0],
            participants: BTreeMap::new(),
            scores: BTreeMap::new(),
            offline_queue: VecDeque::new(),
            revive_queue: BTreeMap::new(),
            resurrect_list: Vec::new(),
            last_resurrect_ms: 0,
            premature_remaining_ms: None,
            notifier: Notifier::default(),
            records: Vec::new(),
            timeline: Vec::new(),
        }
    }

    pub fn kind(&self) -> BattlegroundKind {
        self.kind
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == MatchStatus::Running
    }

    pub fn options(&self) -> &BattlegroundOptions {
        &self.options
    }

    pub fn layout(&self) -> &ArenaLayout {
        &self.layout
    }

    pub fn start_time_ms(&self) -> u64 {
        self.start_time_ms
    }

    pub fn team_score(&self, team: Team) -> u32 {
        self.team_scores[team.index()]
    }

    pub fn team_scores(&self) -> TeamScores {
        TeamScores {
            alliance: self.team_score(Team::Alliance),
            horde: self.team_score(Team::Horde),
        }
    }

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn team_of(&self, id: &str) -> Option<Team> {
        self.participants.get(id).map(|participant| participant.team)
    }

    pub fn score(&self, id: &str) -> Option<&ParticipantScore> {
        self.scores.get(id)
    }

    pub fn honor_mode(&self) -> HonorMode {
        HonorMode::from_holiday(self.options.holiday)
    }

    pub(super) fn set_status(&mut self, status: MatchStatus) {
        if self.status == status {
            return;
        }
        debug!(instance = self.instance_id, from = ?self.status, to = ?status, "status change");
        self.status = status;
        self.notifier.to_all(MatchEvent::StatusChanged { status });
    }

    pub(super) fn label(&mut self, label: impl Into<String>) {
        self.timeline.push(TimelineEvent {
            at_ms: self.start_time_ms,
            label: label.into(),
        });
    }

    pub(super) fn ids_of_team(&self, team: Team) -> Vec<String> {
        self.participants
            .values()
            .filter(|participant| participant.team == team)
            .map(|participant| participant.id.clone())
            .collect()
    }

    pub fn update_participant_score(&mut self, id: &str, score_type: ScoreType, value: u32) -> bool {
        let Some(score) = self.scores.get_mut(id) else {
            return false;
        };
        score.update(score_type, value);
        true
    }

    pub(super) fn bonus_honor(&self, kills: u32) -> u32 {
        bonus_honor_from_kills(self.options.max_level, kills)
    }

    /// Bonus honor to every online participant of `team`.
    pub(super) fn reward_honor_to_team(&mut self, honor: u32, team: Team) {
        for id in self.ids_of_team(team) {
            self.award_honor(&id, honor);
        }
    }

    fn award_honor(&mut self, id: &str, honor: u32) {
        let online = self.participants.get(id).is_some_and(|participant| participant.online);
        if !online || !self.update_participant_score(id, ScoreType::BonusHonor, honor) {
            return;
        }
        self.notifier.to_participant(
            id,
            MatchEvent::HonorAwarded {
                participant_id: id.to_string(),
                amount: honor,
            },
        );
    }

    /// Reputation goes to online humans only.
    pub(super) fn reward_reputation_to_team(&mut self, faction_id: u32, amount: u32, team: Team) {
        for participant in self.participants.values_mut() {
            if participant.team != team || !participant.online || participant.is_bot() {
                continue;
            }
            participant.add_reputation(faction_id, amount);
            self.notifier.to_participant(
                &participant.id,
                MatchEvent::ReputationAwarded {
                    participant_id: participant.id.clone(),
                    faction_id,
                    amount,
                },
            );
        }
    }

    pub(super) fn apply_aura(&mut self, id: &str, spell_id: u32) {
        self.notifier.to_all(MatchEvent::AuraApplied {
            participant_id: id.to_string(),
            spell_id,
        });
    }

    pub(super) fn remove_aura(&mut self, id: &str, spell_id: u32) {
        self.notifier.to_all(MatchEvent::AuraRemoved {
            participant_id: id.to_string(),
            spell_id,
        });
    }

    /// Brings a dead participant back where it stands.
    pub(super) fn revive(&mut self, id: &str) {
        let Some(participant) = self.participants.get_mut(id) else {
            return;
        };
        if participant.is_alive() {
            return;
        }
        participant.avatar_mut().set_alive(true);
        let position = participant.position();
        self.notifier.to_all(MatchEvent::Resurrected {
            participant_id: id.to_string(),
            position,
        });
    }

    pub(super) fn leave_revive_queue(&mut self, id: &str) {
        for queued in self.revive_queue.values_mut() {
            queued.retain(|queued_id| queued_id != id);
        }
        self.revive_queue.retain(|_, queued| !queued.is_empty());
    }

    /// Death and kill credit. Teammates of the killer close to the victim
    /// share the honorable kill.
    pub(super) fn credit_kill(&mut self, victim_id: &str, killer_id: Option<&str>) {
        self.update_participant_score(victim_id, ScoreType::Deaths, 1);
        let Some(killer_id) = killer_id.filter(|killer| *killer != victim_id) else {
            return;
        };
        let (Some(killer_team), Some(victim)) = (self.team_of(killer_id), self.participant(victim_id))
        else {
            return;
        };
        let victim_position = victim.position();
        self.update_participant_score(killer_id, ScoreType::HonorableKills, 1);
        self.update_participant_score(killer_id, ScoreType::KillingBlows, 1);

        let credited: Vec<String> = self
            .participants
            .values()
            .filter(|participant| {
                participant.id != killer_id
                    && participant.online
                    && participant.team == killer_team
                    && participant.position().within(&victim_position, GROUP_REWARD_DISTANCE)
            })
            .map(|participant| participant.id.clone())
            .collect();
        for id in credited {
            self.update_participant_score(&id, ScoreType::HonorableKills, 1);
        }
    }

    /// Winner when one side ran out of participants: the first team still at
    /// strength, Alliance checked first.
    pub(super) fn base_premature_winner(&self) -> Option<Team> {
        Team::ALL
            .into_iter()
            .find(|team| self.team_counts[team.index()] >= self.options.min_players_per_team)
    }

    /// Rule set rewards first, then the shared end-of-match handling.
    /// Runs at most once per match.
    pub(super) fn end_battleground(&mut self, winner: Option<Team>, rules: &mut dyn BattlegroundRules) {
        if self.status == MatchStatus::Ending {
            return;
        }
        rules.end_rewards(self, winner);
        self.finish(winner);
    }

    fn finish(&mut self, winner: Option<Team>) {
        self.in_free_slot_queue = false;
        if let Some(team) = winner {
            self.notifier
                .broadcast_text(text_team_wins(team), ChatChannel::Neutral, None);
            self.notifier.sound_to_all(sound_team_wins(team));
        }
        self.winner = winner;
        self.set_status(MatchStatus::Ending);
        self.end_time_ms = TIME_TO_AUTOREMOVE_MS;

        let bonus_applies = self.options.random || self.options.weekend;
        let mut rows = Vec::new();
        let ids: Vec<String> = self.participants.keys().cloned().collect();
        for id in ids {
            let Some(participant) = self.participants.get(&id) else {
                continue;
            };
            if !participant.online {
                continue;
            }
            let team = participant.team;
            self.revive(&id);

            if self.options.store_statistics {
                if let Some(row) = self.stats_row(&id, winner) {
                    rows.push(row);
                }
            }

            if bonus_applies {
                let random_winner = self
                    .participants
                    .get(&id)
                    .is_some_and(|participant| participant.random_winner);
                let kills = if Some(team) == winner {
                    if random_winner {
                        self.options.honor_kills_winner_last
                    } else {
                        self.options.honor_kills_winner_first
                    }
                } else if random_winner {
                    self.options.honor_kills_loser_last
                } else {
                    self.options.honor_kills_loser_first
                };
                let honor = self.bonus_honor(kills);
                self.award_honor(&id, honor);
                if Some(team) == winner {
                    if let Some(participant) = self.participants.get_mut(&id) {
                        participant.random_winner = true;
                    }
                }
            }

            self.notifier.to_participant(
                &id,
                MatchEvent::MovementBlocked {
                    participant_id: id.clone(),
                },
            );
        }

        if self.options.store_statistics {
            self.records.push(StoreRecord::Match(MatchRecord {
                winner,
                bracket_id: (self.options.min_level / 10) as u8,
                type_id: self.kind.type_id(),
                players: rows,
            }));
        }
        self.notifier.to_all(MatchEvent::MatchEnded { winner });
        let label = match winner {
            Some(team) => format!("{team:?} wins"),
            None => "match ended without a winner".to_string(),
        };
        self.label(label);
        info!(instance = self.instance_id, kind = ?self.kind, ?winner, "match ended");
    }

    fn stats_row(&self, id: &str, winner: Option<Team>) -> Option<PlayerStatsRow> {
        let participant = self.participants.get(id)?;
        if participant.is_bot() {
            return None;
        }
        let score = self.scores.get(id)?;
        Some(PlayerStatsRow {
            participant_id: participant.id.clone(),
            name: participant.name.clone(),
            winner: Some(participant.team) == winner,
            killing_blows: score.killing_blows,
            deaths: score.deaths,
            honorable_kills: score.honorable_kills,
            bonus_honor: score.bonus_honor,
            damage_done: score.damage_done,
            healing_done: score.healing_done,
            attrs: score.attrs(),
        })
    }

    /// Ends without a winner or rewards and starts the leave countdown at zero.
    pub(super) fn end_now(&mut self) {
        self.in_free_slot_queue = false;
        self.set_status(MatchStatus::Ending);
        self.end_time_ms = 0;
        self.label("match closed");
    }

    pub(super) fn remove_participant(
        &mut self,
        id: &str,
        rules: &mut dyn BattlegroundRules,
    ) -> Result<(), BattlegroundError> {
        let (team, online) = match self.participants.get(id) {
            Some(participant) => (participant.team, participant.online),
            None => return Err(BattlegroundError::UnknownParticipant(id.to_string())),
        };

        let count = &mut self.team_counts[team.index()];
        *count = count.saturating_sub(1);
        self.scores.remove(id);
        self.leave_revive_queue(id);
        self.resurrect_list.retain(|(queued, _)| queued != id);
        self.offline_queue.retain(|queued| queued != id);
        self.revive(id);

        rules.on_participant_removed(self, id, team, online);
        self.participants.remove(id);

        let invited = &mut self.invited[team.index()];
        *invited = invited.saturating_sub(1);
        if self.status < MatchStatus::Ending {
            self.in_free_slot_queue = true;
        }
        self.notifier.to_team(
            team,
            MatchEvent::ParticipantLeft {
                participant_id: id.to_string(),
                team,
            },
        );
        debug!(instance = self.instance_id, participant = id, ?team, "participant left");
        Ok(())
    }
}
