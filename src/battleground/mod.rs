mod capture_point;
mod eye;
mod flag;
mod lifecycle;
mod rules;
mod state;
mod warsong;

use tracing::{error, info};

use crate::arena::ArenaLayout;
use crate::broadcast::Notification;
use crate::constants::{
    DEFAULT_PREMATURE_FINISH_MS, HONOR_KILLS_LOSER_FIRST, HONOR_KILLS_LOSER_LAST,
    HONOR_KILLS_WINNER_FIRST, HONOR_KILLS_WINNER_LAST,
};
use crate::error::BattlegroundError;
use crate::participant::{BotSteering, JoinRequest, Participant};
use crate::score::ParticipantScore;
use crate::stats_store::StoreRecord;
use crate::types::{
    BattlegroundKind, InvitationType, MatchEvent, MatchSnapshot, MatchStatus, MatchSummary,
    ObjectiveView, Position, ScoreType, ScoreboardEntry, Team, WorldStateValue,
};

pub use capture_point::CapturePoint;
pub use eye::EyeOfTheStorm;
pub use flag::{Flag, FlagTimerExpired};
pub use rules::BattlegroundRules;
pub use state::MatchState;
pub use warsong::WarsongGulch;

#[derive(Clone, Debug)]
pub struct BattlegroundOptions {
    pub min_players_per_team: u32,
    pub max_players_per_team: u32,
    pub min_level: u32,
    pub max_level: u32,
    /// Zero disables the premature finish countdown.
    pub premature_finish_ms: u64,
    pub invitation_type: InvitationType,
    pub random: bool,
    /// Weekend bonus for this battleground kind.
    pub weekend: bool,
    pub holiday: bool,
    pub store_statistics: bool,
    pub track_deserters: bool,
    /// Keeps the premature countdown from ticking down.
    pub testing: bool,
    pub honor_kills_winner_first: u32,
    pub honor_kills_winner_last: u32,
    pub honor_kills_loser_first: u32,
    pub honor_kills_loser_last: u32,
}

impl Default for BattlegroundOptions {
    fn default() -> Self {
        Self {
            min_players_per_team: 5,
            max_players_per_team: 10,
            min_level: 10,
            max_level: 80,
            premature_finish_ms: DEFAULT_PREMATURE_FINISH_MS,
            invitation_type: InvitationType::NoBalance,
            random: false,
            weekend: false,
            holiday: false,
            store_statistics: true,
            track_deserters: true,
            testing: false,
            honor_kills_winner_first: HONOR_KILLS_WINNER_FIRST,
            honor_kills_winner_last: HONOR_KILLS_WINNER_LAST,
            honor_kills_loser_first: HONOR_KILLS_LOSER_FIRST,
            honor_kills_loser_last: HONOR_KILLS_LOSER_LAST,
        }
    }
}

pub fn rules_for(kind: BattlegroundKind) -> Box<dyn BattlegroundRules> {
    match kind {
        BattlegroundKind::WarsongGulch => Box::new(WarsongGulch::new()),
        BattlegroundKind::EyeOfTheStorm => Box::new(EyeOfTheStorm::new()),
    }
}

/// One battleground instance: shared lifecycle plus a rule set.
pub struct Battleground {
    state: MatchState,
    rules: Box<dyn BattlegroundRules>,
    tick_counter: u64,
}

impl Battleground {
    pub fn new(kind: BattlegroundKind, instance_id: u32, options: BattlegroundOptions) -> Self {
        let mut battleground = Self {
            state: MatchState::new(kind, instance_id, options),
            rules: rules_for(kind),
            tick_counter: 0,
        };
        battleground.rules.reset(&mut battleground.state);
        battleground
    }

    pub fn kind(&self) -> BattlegroundKind {
        self.state.kind
    }

    pub fn instance_id(&self) -> u32 {
        self.state.instance_id
    }

    pub fn status(&self) -> MatchStatus {
        self.state.status
    }

    pub fn winner(&self) -> Option<Team> {
        self.state.winner
    }

    pub fn should_delete(&self) -> bool {
        self.state.should_delete
    }

    pub fn in_free_slot_queue(&self) -> bool {
        self.state.in_free_slot_queue
    }

    pub fn team_score(&self, team: Team) -> u32 {
        self.state.team_score(team)
    }

    pub fn start_time_ms(&self) -> u64 {
        self.state.start_time_ms
    }

    pub fn end_time_ms(&self) -> i64 {
        self.state.end_time_ms
    }

    pub fn invited_count(&self, team: Team) -> u32 {
        self.state.invited[team.index()]
    }

    pub fn participant_count(&self, team: Team) -> u32 {
        self.state.team_counts[team.index()]
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn layout(&self) -> &ArenaLayout {
        &self.state.layout
    }

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.state.participants.get(id)
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.state.participants.values()
    }

    pub fn score(&self, id: &str) -> Option<&ParticipantScore> {
        self.state.scores.get(id)
    }

    pub fn objective(&self) -> ObjectiveView {
        self.rules.objective_view(&self.state)
    }

    /// Steering state of a bot; `None` for players and unknown ids.
    pub fn bot_steering(&mut self, id: &str) -> Option<&mut BotSteering> {
        self.state.participants.get_mut(id)?.avatar_mut().steering()
    }

    pub fn is_ended(&self) -> bool {
        self.state.status == MatchStatus::Ending
    }

    /// NotStarted to Warmup; the match enters the free-slot queue.
    pub fn start(&mut self) -> Result<(), BattlegroundError> {
        if self.state.status != MatchStatus::NotStarted {
            return Err(BattlegroundError::WrongStatus(self.state.status));
        }
        self.state.start_time_ms = 0;
        self.state.last_resurrect_ms = 0;
        self.state.in_free_slot_queue = true;
        self.state.set_status(MatchStatus::Warmup);
        self.state.label("warmup started");
        info!(instance = self.state.instance_id, kind = ?self.state.kind, "battleground started");
        Ok(())
    }

    pub fn reset(&mut self) {
        let state = &mut self.state;
        state.winner = None;
        state.set_status(MatchStatus::NotStarted);
        state.start_time_ms = 0;
        state.start_delay_ms = 0;
        state.end_time_ms = 0;
        state.last_resurrect_ms = 0;
        state.events = 0;
        state.premature_remaining_ms = None;
        state.should_delete = false;

        if state.invited.iter().any(|invited| *invited > 0) {
            error!(
                instance = state.instance_id,
                alliance = state.invited[Team::Alliance.index()],
                horde = state.invited[Team::Horde.index()],
                "reset with pending invitations"
            );
        }
        state.invited = [0, 0];
        state.team_counts = [0, 0];
        state.in_free_slot_queue = false;
        state.participants.clear();
        state.scores.clear();
        state.offline_queue.clear();
        state.revive_queue.clear();
        state.resurrect_list.clear();
        state.team_scores = [0, 0];
        state.timeline.clear();
        self.rules.reset(&mut self.state);
    }

    pub fn update(&mut self, diff_ms: u64) {
        self.tick_counter += 1;
        self.state.clock_ms += diff_ms;

        if self.state.participants.is_empty() {
            if self.state.invited == [0, 0] {
                self.state.should_delete = true;
            }
            return;
        }

        if self.state.status != MatchStatus::Ending
            && self.state.participants.values().all(Participant::is_bot)
        {
            self.state.end_now();
            return;
        }

        match self.state.status {
            MatchStatus::Warmup => self.process_join(diff_ms),
            MatchStatus::Running => {
                self.process_offline_queue();
                self.process_resurrect(diff_ms);
                let options = &self.state.options;
                let understaffed = Team::ALL.into_iter().any(|team| {
                    self.state.team_counts[team.index()] < options.min_players_per_team
                });
                if options.premature_finish_ms > 0 && understaffed {
                    self.process_progress(diff_ms);
                } else {
                    self.state.premature_remaining_ms = None;
                }
            }
            MatchStatus::Ending => self.process_leave(diff_ms),
            MatchStatus::NotStarted => {}
        }

        self.state.start_time_ms += diff_ms;
        self.rules.post_update(&mut self.state, diff_ms);
    }

    pub fn free_slots_for_team(&self, team: Team) -> u32 {
        let state = &self.state;
        let max = state.options.max_players_per_team;
        let this_invited = state.invited[team.index()];
        let other_invited = state.invited[team.other().index()];

        if state.status == MatchStatus::Warmup
            && state.options.invitation_type == InvitationType::NoBalance
        {
            return max.saturating_sub(this_invited);
        }
        if !matches!(state.status, MatchStatus::Warmup | MatchStatus::Running) {
            return 0;
        }

        let this_count = state.team_counts[team.index()];
        let other_count = state.team_counts[team.other().index()];
        let min = state.options.min_players_per_team;

        let diff = if other_invited == this_invited {
            1
        } else {
            other_invited.saturating_sub(this_invited)
        };
        let diff2 = max.saturating_sub(this_invited);
        let diff3 = if other_count == this_count {
            1
        } else if other_count > this_count {
            other_count - this_count
        } else if this_invited <= min {
            min - this_invited + 1
        } else {
            0
        };
        diff.min(diff2).min(diff3)
    }

    pub fn has_free_slots(&self) -> bool {
        (self.state.participants.len() as u32) < self.state.options.max_players_per_team * 2
    }

    /// Reserves a slot for an incoming participant of `team`.
    pub fn invite(&mut self, team: Team) -> Result<(), BattlegroundError> {
        if !matches!(self.state.status, MatchStatus::Warmup | MatchStatus::Running) {
            return Err(BattlegroundError::WrongStatus(self.state.status));
        }
        if self.free_slots_for_team(team) == 0 {
            return Err(BattlegroundError::MatchFull(team));
        }
        self.state.invited[team.index()] += 1;
        if !self.has_free_slots() {
            self.state.in_free_slot_queue = false;
        }
        Ok(())
    }

    /// Adds a participant, or brings a known one back online with its score.
    pub fn add_participant(&mut self, join: JoinRequest) -> Result<(), BattlegroundError> {
        if let Some(existing) = self.state.participants.get(&join.id) {
            if existing.team != join.team {
                return Err(BattlegroundError::AlreadyPresent(join.id));
            }
            return self.participant_logged_in(&join.id);
        }

        let id = join.id.clone();
        let team = join.team;
        let spawn = self.state.layout.start_position(team);
        let participant = Participant::from_join(join, spawn);
        self.state.participants.insert(id.clone(), participant);
        self.state.scores.entry(id.clone()).or_default();
        self.state.team_counts[team.index()] += 1;
        self.state.notifier.to_team(
            team,
            MatchEvent::ParticipantJoined {
                participant_id: id.clone(),
                team,
            },
        );
        self.rules.on_participant_added(&mut self.state, &id);
        self.block_if_ended(&id);
        Ok(())
    }

    pub fn remove_participant(&mut self, id: &str) -> Result<(), BattlegroundError> {
        self.state.remove_participant(id, self.rules.as_mut())
    }

    /// Starts the offline grace period. A running match drops whatever the
    /// participant carried right away.
    pub fn participant_logged_out(&mut self, id: &str) -> Result<(), BattlegroundError> {
        let deadline = self.state.clock_ms + crate::constants::MAX_OFFLINE_TIME_MS;
        let team = self.require(id)?.team;
        if !self.state.offline_queue.iter().any(|queued| queued == id) {
            self.state.offline_queue.push_back(id.to_string());
        }
        if self.state.status == MatchStatus::Running {
            self.rules
                .on_participant_removed(&mut self.state, id, team, true);
        }
        if let Some(participant) = self.state.participants.get_mut(id) {
            participant.online = false;
            participant.offline_remove_at_ms = deadline;
        }
        Ok(())
    }

    pub fn participant_logged_in(&mut self, id: &str) -> Result<(), BattlegroundError> {
        self.require(id)?;
        self.state.offline_queue.retain(|queued| queued != id);
        if let Some(participant) = self.state.participants.get_mut(id) {
            participant.online = true;
            participant.offline_remove_at_ms = 0;
        }
        if self.state.status == MatchStatus::Running {
            self.rules.on_participant_added(&mut self.state, id);
        }
        self.send_initial_world_states(id);
        self.block_if_ended(id);
        Ok(())
    }

    /// Repaints the objective board for a participant coming back online.
    fn send_initial_world_states(&mut self, id: &str) {
        for value in self.rules.initial_world_states(&self.state) {
            self.state
                .notifier
                .participant_world_state(id, value.id, value.value);
        }
    }

    fn block_if_ended(&mut self, id: &str) {
        if self.state.status != MatchStatus::Ending {
            return;
        }
        let winner = self.state.winner;
        self.state.notifier.to_participant(
            id,
            MatchEvent::MovementBlocked {
                participant_id: id.to_string(),
            },
        );
        self.state
            .notifier
            .to_participant(id, MatchEvent::MatchEnded { winner });
    }

    /// Marks the victim dead; credit and objective hooks only count while Running.
    pub fn handle_kill(&mut self, victim_id: &str, killer_id: Option<&str>) -> Result<(), BattlegroundError> {
        self.require(victim_id)?;
        if let Some(killer_id) = killer_id {
            self.require(killer_id)?;
        }
        if self.state.status == MatchStatus::Running {
            self.rules.handle_kill(&mut self.state, victim_id, killer_id);
        }
        if let Some(victim) = self.state.participants.get_mut(victim_id) {
            victim.avatar_mut().set_alive(false);
        }
        Ok(())
    }

    /// Queues a dead participant at its closest graveyard for the next wave.
    pub fn release_spirit(&mut self, id: &str) -> Result<Option<u32>, BattlegroundError> {
        if self.require(id)?.is_alive() {
            return Ok(None);
        }
        let Some(graveyard_id) = self.rules.closest_graveyard(&self.state, id) else {
            return Ok(None);
        };
        let graveyard_position = self
            .state
            .layout
            .graveyard(graveyard_id)
            .map(|graveyard| graveyard.position);
        self.state.leave_revive_queue(id);
        self.state
            .revive_queue
            .entry(graveyard_id)
            .or_default()
            .push(id.to_string());
        if let (Some(position), Some(participant)) =
            (graveyard_position, self.state.participants.get_mut(id))
        {
            participant.avatar_mut().set_position(position);
        }
        Ok(Some(graveyard_id))
    }

    pub fn move_participant(&mut self, id: &str, position: Position) -> Result<(), BattlegroundError> {
        self.require_mut(id)?.avatar_mut().set_position(position);
        Ok(())
    }

    pub fn set_concealed(&mut self, id: &str, concealed: bool) -> Result<(), BattlegroundError> {
        self.require_mut(id)?.avatar_mut().set_concealed(concealed);
        Ok(())
    }

    pub fn handle_area_trigger(&mut self, id: &str, trigger: u32) -> Result<(), BattlegroundError> {
        self.require(id)?;
        if self.state.layout.trigger(trigger).is_none() {
            return Err(BattlegroundError::UnknownTrigger(trigger));
        }
        self.rules.handle_area_trigger(&mut self.state, id, trigger)
    }

    pub fn click_flag(&mut self, id: &str, flag: Option<Team>) -> Result<(), BattlegroundError> {
        self.require(id)?;
        self.rules.click_flag(&mut self.state, id, flag);
        Ok(())
    }

    pub fn drop_flag(&mut self, id: &str) -> Result<(), BattlegroundError> {
        self.require(id)?;
        self.rules.drop_flag(&mut self.state, id);
        Ok(())
    }

    pub fn end_battleground(&mut self, winner: Option<Team>) {
        self.state.end_battleground(winner, self.rules.as_mut());
    }

    pub fn end_now(&mut self) {
        self.state.end_now();
    }

    pub fn update_participant_score(&mut self, id: &str, score_type: ScoreType, value: u32) -> bool {
        self.state.update_participant_score(id, score_type, value)
    }

    pub fn closest_graveyard(&self, id: &str) -> Option<u32> {
        self.rules.closest_graveyard(&self.state, id)
    }

    pub fn initial_world_states(&self) -> Vec<WorldStateValue> {
        self.rules.initial_world_states(&self.state)
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.state.notifier.drain()
    }

    pub fn take_records(&mut self) -> Vec<StoreRecord> {
        std::mem::take(&mut self.state.records)
    }

    pub fn snapshot(&mut self, include_notifications: bool) -> MatchSnapshot {
        let notifications = if include_notifications {
            self.state.notifier.drain()
        } else {
            Vec::new()
        };
        MatchSnapshot {
            tick: self.tick_counter,
            kind: self.state.kind,
            instance_id: self.state.instance_id,
            status: self.state.status,
            start_time_ms: self.state.start_time_ms,
            winner: self.state.winner,
            team_scores: self.state.team_scores(),
            participants: self
                .state
                .participants
                .values()
                .map(Participant::view)
                .collect(),
            objective: self.objective(),
            notifications,
            timeline: self.state.timeline.clone(),
        }
    }

    pub fn summary(&self) -> MatchSummary {
        let mut scoreboard: Vec<ScoreboardEntry> = self
            .state
            .participants
            .values()
            .filter_map(|participant| {
                self.state.scores.get(&participant.id).map(|score| {
                    score.entry(
                        &participant.id,
                        &participant.name,
                        participant.team,
                        participant.kind(),
                    )
                })
            })
            .collect();
        scoreboard.sort_by(|a, b| {
            b.honorable_kills
                .cmp(&a.honorable_kills)
                .then_with(|| b.killing_blows.cmp(&a.killing_blows))
                .then_with(|| a.name.cmp(&b.name))
        });
        MatchSummary {
            kind: self.state.kind,
            instance_id: self.state.instance_id,
            winner: self.state.winner,
            duration_ms: self.state.start_time_ms,
            team_scores: self.state.team_scores(),
            timeline: self.state.timeline.clone(),
            scoreboard,
        }
    }

    fn require(&self, id: &str) -> Result<&Participant, BattlegroundError> {
        self.state
            .participants
            .get(id)
            .ok_or_else(|| BattlegroundError::UnknownParticipant(id.to_string()))
    }

    fn require_mut(&mut self, id: &str) -> Result<&mut Participant, BattlegroundError> {
        self.state
            .participants
            .get_mut(id)
            .ok_or_else(|| BattlegroundError::UnknownParticipant(id.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::types::FlagState;

    /// Small matches without a premature finish, so single players can drive them.
    pub fn make_options() -> BattlegroundOptions {
        BattlegroundOptions {
            min_players_per_team: 1,
            premature_finish_ms: 0,
            ..BattlegroundOptions::default()
        }
    }

    pub fn make_battleground(
        kind: BattlegroundKind,
        options: BattlegroundOptions,
        joins: Vec<JoinRequest>,
    ) -> Battleground {
        let mut battleground = Battleground::new(kind, 1, options);
        battleground.start().expect("start battleground");
        for join in joins {
            battleground.add_participant(join).expect("add participant");
        }
        battleground
    }

    /// Walks the starting countdown until the gates open.
    pub fn run_to_battle(battleground: &mut Battleground) {
        for diff in [0, 120_000, 0, 0] {
            battleground.update(diff);
        }
        assert_eq!(battleground.status(), MatchStatus::Running);
    }

    pub fn make_running(kind: BattlegroundKind, joins: Vec<JoinRequest>) -> Battleground {
        let mut battleground = make_battleground(kind, make_options(), joins);
        run_to_battle(&mut battleground);
        battleground.drain_notifications();
        battleground
    }

    pub fn has_text(notifications: &[Notification], wanted: u32) -> bool {
        notifications.iter().any(|notification| {
            matches!(notification.event, MatchEvent::BroadcastText { text_id, .. } if text_id == wanted)
        })
    }

    /// Last value sent for world state `wanted`.
    pub fn world_state_value(notifications: &[Notification], wanted: u32) -> Option<i32> {
        notifications
            .iter()
            .rev()
            .find_map(|notification| match notification.event {
                MatchEvent::WorldState { id, value } if id == wanted => Some(value),
                _ => None,
            })
    }

    pub fn aura_applied(notifications: &[Notification], participant: &str, spell: u32) -> bool {
        notifications.iter().any(|notification| {
            matches!(
                &notification.event,
                MatchEvent::AuraApplied { participant_id, spell_id }
                    if participant_id == participant && *spell_id == spell
            )
        })
    }

    pub fn flag_states(battleground: &mut Battleground) -> Vec<FlagState> {
        match battleground.snapshot(false).objective {
            crate::types::ObjectiveView::CaptureTheFlag { flags, .. } => {
                flags.iter().map(|flag| flag.state).collect()
            }
            crate::types::ObjectiveView::TerritoryControl { flag, .. } => vec![flag.state],
        }
    }
}
