use tracing::{debug, warn};

use super::flag::{Flag, FlagTimerExpired};
use super::rules::{score_premature_winner, world_state, BattlegroundRules};
use super::state::MatchState;
use crate::constants::warsong::*;
use crate::constants::TEXT_START_TWO_MINUTES;
use crate::error::BattlegroundError;
use crate::types::{
    BattlegroundKind, ChatChannel, FlagState, ObjectiveView, ScoreType, Team, WorldStateValue,
};

const START_MESSAGES: [Option<u32>; 4] = [
    Some(TEXT_START_TWO_MINUTES),
    Some(TEXT_START_ONE_MINUTE),
    Some(TEXT_START_HALF_MINUTE),
    Some(TEXT_BATTLE_HAS_BEGUN),
];

/// Capture the flag: each team defends its own flag and scores by bringing
/// the enemy flag home while its own flag is on the stand.
#[derive(Debug)]
pub struct WarsongGulch {
    /// Indexed by the team owning the flag; the Alliance flag is carried by Horde.
    flags: [Flag; 2],
    both_flags_kept: bool,
    debuff_stage: u8,
    assault_timer_ms: u64,
    last_capture_team: Option<Team>,
    minutes_elapsed: u32,
    reputation_capture: u32,
    honor_win_kills: u32,
    honor_end_kills: u32,
}

impl Default for WarsongGulch {
    fn default() -> Self {
        Self::new()
    }
}

impl WarsongGulch {
    pub fn new() -> Self {
        Self {
            flags: [Flag::new(Some(Team::Alliance)), Flag::new(Some(Team::Horde))],
            both_flags_kept: false,
            debuff_stage: 0,
            assault_timer_ms: 0,
            last_capture_team: None,
            minutes_elapsed: 0,
            reputation_capture: REPUTATION_CAPTURE,
            honor_win_kills: HONOR_WIN_KILLS,
            honor_end_kills: HONOR_END_KILLS,
        }
    }

    pub fn flag(&self, owner: Team) -> &Flag {
        &self.flags[owner.index()]
    }

    fn flag_mut(&mut self, owner: Team) -> &mut Flag {
        &mut self.flags[owner.index()]
    }

    fn debuff_spell(&self) -> Option<u32> {
        match self.debuff_stage {
            1 => Some(SPELL_FOCUSED_ASSAULT),
            2 => Some(SPELL_BRUTAL_ASSAULT),
            _ => None,
        }
    }

    fn capture_flag(&mut self, state: &mut MatchState, id: &str) {
        if !state.is_running() {
            return;
        }
        let Some(team) = state.team_of(id) else {
            return;
        };
        let captured = team.other();
        if !self.flag(captured).is_carried_by(id) {
            return;
        }
        self.flag_mut(captured).capture(FLAG_RESPAWN_MS);
        state.remove_aura(id, flag_spell(captured));
        if let Some(spell) = self.debuff_spell() {
            state.remove_aura(id, spell);
        }

        if state.team_scores[team.index()] < MAX_TEAM_SCORE {
            state.team_scores[team.index()] += 1;
        }
        state.notifier.sound_to_all(match team {
            Team::Alliance => SOUND_FLAG_CAPTURED_ALLIANCE,
            Team::Horde => SOUND_FLAG_CAPTURED_HORDE,
        });
        state.reward_reputation_to_team(faction_of(team), self.reputation_capture, team);
        let honor = state.bonus_honor(2);
        state.reward_honor_to_team(honor, team);

        let source = state.participant(id).map(|participant| participant.name.clone());
        let text = match team {
            Team::Alliance => TEXT_CAPTURED_HORDE_FLAG,
            Team::Horde => TEXT_CAPTURED_ALLIANCE_FLAG,
        };
        state
            .notifier
            .broadcast_text(text, team.channel(), source.as_deref());
        state.notifier.world_state(flag_state_world_state(team), 1);
        state
            .notifier
            .world_state(captures_world_state(team), state.team_scores[team.index()] as i32);
        state.update_participant_score(id, ScoreType::FlagCaptures, 1);
        self.last_capture_team = Some(team);
        state.label(format!("{team:?} captured the flag"));
        debug!(participant = id, ?team, "flag captured");

        if state.team_score(team) >= MAX_TEAM_SCORE {
            state.notifier.world_state(WS_FLAG_UNK_ALLIANCE, 0);
            state.notifier.world_state(WS_FLAG_UNK_HORDE, 0);
            state.notifier.world_state(WS_FLAG_STATE_ALLIANCE, 1);
            state.notifier.world_state(WS_FLAG_STATE_HORDE, 1);
            state.notifier.world_state(WS_STATE_TIMER_ACTIVE, 0);
            let win_honor = HONOR_TABLE[state.honor_mode().index()][HONOR_REWARD_WIN];
            state.reward_honor_to_team(win_honor, team);
            state.end_battleground(Some(team), self);
        }
    }

    /// Captures with the carrier of `owner`'s flag if it already stands in
    /// its home capture zone.
    fn handle_flag_room_capture_point(&mut self, state: &mut MatchState, owner: Team) {
        let Some(carrier) = self.flag(owner).carrier().map(str::to_string) else {
            return;
        };
        let trigger_id = capture_trigger_for(owner.other());
        let in_zone = match (state.participant(&carrier), state.layout.trigger(trigger_id)) {
            (Some(participant), Some(trigger)) => {
                trigger.position.within(&participant.position(), trigger.radius)
            }
            _ => false,
        };
        if in_zone {
            self.capture_flag(state, &carrier);
        }
    }

    fn respawn_flag(&mut self, state: &mut MatchState, owner: Team, captured: bool) {
        self.flag_mut(owner).respawn();
        if captured {
            state
                .notifier
                .broadcast_text(TEXT_FLAGS_PLACED, ChatChannel::Neutral, None);
            state.notifier.sound_to_all(SOUND_FLAGS_RESPAWNED);
        }
        self.both_flags_kept = false;
    }

    fn respawn_flag_after_drop(&mut self, state: &mut MatchState, owner: Team) {
        if !state.is_running() {
            return;
        }
        self.respawn_flag(state, owner, false);
        state
            .notifier
            .broadcast_text(TEXT_FLAGS_PLACED, ChatChannel::Neutral, None);
        state.notifier.sound_to_all(SOUND_FLAGS_RESPAWNED);
        self.handle_flag_room_capture_point(state, owner.other());
    }

    fn pick_up(&mut self, state: &mut MatchState, id: &str, owner: Team, from_base: bool) {
        let picker = owner.other();
        if !self.flag_mut(owner).pick_up(id) {
            return;
        }
        let source = state.participant(id).map(|participant| participant.name.clone());
        let (text, sound) = match owner {
            Team::Alliance => (TEXT_ALLIANCE_FLAG_PICKED_UP, SOUND_ALLIANCE_FLAG_PICKED_UP),
            Team::Horde => (TEXT_HORDE_FLAG_PICKED_UP, SOUND_HORDE_FLAG_PICKED_UP),
        };
        state
            .notifier
            .broadcast_text(text, picker.channel(), source.as_deref());
        state.notifier.sound_to_all(sound);
        state
            .notifier
            .world_state(flag_state_world_state(picker), FlagState::OnPlayer.code());
        state.notifier.world_state(unknown_world_state(owner), 1);
        state.apply_aura(id, flag_spell(owner));
        if from_base && self.flag(picker).is_picked_up() {
            self.both_flags_kept = true;
        }
        if let Some(spell) = self.debuff_spell() {
            state.apply_aura(id, spell);
        }
    }

    fn return_flag(&mut self, state: &mut MatchState, id: &str, owner: Team) {
        if !self.flag_mut(owner).return_to_base() {
            return;
        }
        self.both_flags_kept = false;
        let source = state.participant(id).map(|participant| participant.name.clone());
        let text = match owner {
            Team::Alliance => TEXT_ALLIANCE_FLAG_RETURNED,
            Team::Horde => TEXT_HORDE_FLAG_RETURNED,
        };
        state
            .notifier
            .broadcast_text(text, owner.channel(), source.as_deref());
        state
            .notifier
            .world_state(flag_state_world_state(owner.other()), 1);
        state.notifier.sound_to_all(SOUND_FLAG_RETURNED);
        state.update_participant_score(id, ScoreType::FlagReturns, 1);
        self.handle_flag_room_capture_point(state, owner.other());
    }

    fn update_assault(&mut self, state: &mut MatchState, diff_ms: u64) {
        if self.both_flags_kept {
            self.assault_timer_ms += diff_ms;
            let carriers: Vec<String> = self
                .flags
                .iter()
                .filter_map(|flag| flag.carrier().map(str::to_string))
                .collect();
            if self.debuff_stage == 0 && self.assault_timer_ms >= FOCUSED_ASSAULT_MS {
                for carrier in &carriers {
                    state.apply_aura(carrier, SPELL_FOCUSED_ASSAULT);
                }
                self.debuff_stage = 1;
            } else if self.debuff_stage == 1 && self.assault_timer_ms >= BRUTAL_ASSAULT_MS {
                for carrier in &carriers {
                    state.remove_aura(carrier, SPELL_FOCUSED_ASSAULT);
                    state.apply_aura(carrier, SPELL_BRUTAL_ASSAULT);
                }
                self.debuff_stage = 2;
            }
        } else if self.flags.iter().all(|flag| {
            matches!(flag.state(), FlagState::OnBase | FlagState::WaitRespawn)
        }) {
            self.assault_timer_ms = 0;
            self.debuff_stage = 0;
        }
    }

    fn time_limit_winner(&self, state: &MatchState) -> Option<Team> {
        let alliance = state.team_score(Team::Alliance);
        let horde = state.team_score(Team::Horde);
        match (alliance, horde) {
            (0, 0) => None,
            (0, _) => Some(Team::Horde),
            (_, 0) => Some(Team::Alliance),
            _ if alliance == horde => self.last_capture_team,
            _ if horde > alliance => Some(Team::Horde),
            _ => Some(Team::Alliance),
        }
    }
}

impl BattlegroundRules for WarsongGulch {
    fn kind(&self) -> BattlegroundKind {
        BattlegroundKind::WarsongGulch
    }

    fn start_message_ids(&self) -> [Option<u32>; 4] {
        START_MESSAGES
    }

    fn reset(&mut self, state: &mut MatchState) {
        for flag in &mut self.flags {
            flag.respawn();
        }
        state.team_scores = [0, 0];
        if state.options.weekend {
            self.reputation_capture = REPUTATION_CAPTURE_WEEKEND;
            self.honor_win_kills = HONOR_WIN_KILLS_WEEKEND;
            self.honor_end_kills = HONOR_END_KILLS_WEEKEND;
        } else {
            self.reputation_capture = REPUTATION_CAPTURE;
            self.honor_win_kills = HONOR_WIN_KILLS;
            self.honor_end_kills = HONOR_END_KILLS;
        }
        self.minutes_elapsed = 0;
        self.last_capture_team = None;
        self.both_flags_kept = false;
        self.debuff_stage = 0;
        self.assault_timer_ms = 0;
    }

    fn close_doors(&mut self, state: &mut MatchState) {
        state.notifier.world_state(WS_STATE_TIMER_ACTIVE, 1);
        state
            .notifier
            .world_state(WS_STATE_TIMER, TIME_LIMIT_MINUTES as i32);
    }

    fn post_update(&mut self, state: &mut MatchState, diff_ms: u64) {
        if !state.is_running() {
            return;
        }
        if state.start_time_ms >= FORCED_END_MS {
            let winner = self.time_limit_winner(state);
            state.label("time limit reached");
            state.end_battleground(winner, self);
            return;
        }
        if state.start_time_ms > (self.minutes_elapsed as u64 + 3) * 60_000 {
            self.minutes_elapsed += 1;
            state.notifier.world_state(
                WS_STATE_TIMER,
                TIME_LIMIT_MINUTES.saturating_sub(self.minutes_elapsed) as i32,
            );
        }

        for owner in Team::ALL {
            match self.flag_mut(owner).tick(diff_ms) {
                Some(FlagTimerExpired::Respawn) => self.respawn_flag(state, owner, true),
                Some(FlagTimerExpired::DropExpired) => {
                    self.respawn_flag_after_drop(state, owner);
                    self.both_flags_kept = false;
                }
                None => {}
            }
        }
        if state.is_running() {
            self.update_assault(state, diff_ms);
        }
    }

    fn on_participant_removed(&mut self, state: &mut MatchState, id: &str, _team: Team, online: bool) {
        for owner in Team::ALL {
            if !self.flag(owner).is_carried_by(id) {
                continue;
            }
            if online {
                self.drop_flag(state, id);
            } else {
                warn!(participant = id, "removing offline participant who carries a flag");
                self.flag_mut(owner).respawn();
                self.both_flags_kept = false;
            }
        }
    }

    fn handle_kill(&mut self, state: &mut MatchState, victim_id: &str, killer_id: Option<&str>) {
        self.drop_flag(state, victim_id);
        state.credit_kill(victim_id, killer_id);
    }

    fn handle_area_trigger(
        &mut self,
        state: &mut MatchState,
        id: &str,
        trigger: u32,
    ) -> Result<(), BattlegroundError> {
        let captured = match trigger {
            TRIGGER_ALLIANCE_FLAG_ROOM => Team::Horde,
            TRIGGER_HORDE_FLAG_ROOM => Team::Alliance,
            other => return Err(BattlegroundError::UnknownTrigger(other)),
        };
        if !state.is_running() {
            return Ok(());
        }
        let home = captured.other();
        if self.flag(captured).state() != FlagState::OnBase
            && self.flag(home).state() == FlagState::OnBase
            && self.flag(captured).is_carried_by(id)
        {
            self.capture_flag(state, id);
        }
        Ok(())
    }

    fn click_flag(&mut self, state: &mut MatchState, id: &str, flag: Option<Team>) {
        if !state.is_running() {
            return;
        }
        let Some(owner) = flag else {
            return;
        };
        let Some(participant) = state.participant(id) else {
            return;
        };
        if !participant.is_alive() {
            return;
        }
        let team = participant.team;
        let position = participant.position();

        match self.flag(owner).state() {
            FlagState::OnBase if team != owner => {
                let at_stand = state
                    .layout
                    .flag_stand(Some(owner))
                    .is_some_and(|stand| stand.within(&position, FLAG_CLICK_RANGE));
                if at_stand {
                    self.pick_up(state, id, owner, true);
                }
            }
            FlagState::OnGround => {
                let in_reach = self
                    .flag(owner)
                    .ground_position()
                    .is_some_and(|ground| ground.within(&position, FLAG_CLICK_RANGE));
                if !in_reach {
                    return;
                }
                if team == owner {
                    self.return_flag(state, id, owner);
                } else {
                    self.pick_up(state, id, owner, false);
                }
            }
            _ => {}
        }
    }

    fn drop_flag(&mut self, state: &mut MatchState, id: &str) {
        let Some(participant) = state.participant(id) else {
            return;
        };
        let team = participant.team;
        let position = participant.position();
        let owner = team.other();
        if !self.flag(owner).is_carried_by(id) {
            return;
        }

        if !state.is_running() {
            self.flag_mut(owner).respawn();
            state.remove_aura(id, flag_spell(owner));
            return;
        }

        self.flag_mut(owner).drop_to_ground(FLAG_DROP_MS, position);
        state.remove_aura(id, flag_spell(owner));
        if let Some(spell) = self.debuff_spell() {
            state.remove_aura(id, spell);
        }
        state.notifier.world_state(flag_state_world_state(team), 1);
        let source = state.participant(id).map(|participant| participant.name.clone());
        let text = match owner {
            Team::Alliance => TEXT_ALLIANCE_FLAG_DROPPED,
            Team::Horde => TEXT_HORDE_FLAG_DROPPED,
        };
        state
            .notifier
            .broadcast_text(text, owner.channel(), source.as_deref());
        state.notifier.world_state(unknown_world_state(owner), -1);
    }

    fn end_rewards(&mut self, state: &mut MatchState, winner: Option<Team>) {
        if let Some(team) = winner {
            let honor = state.bonus_honor(self.honor_win_kills);
            state.reward_honor_to_team(honor, team);
        }
        let honor = state.bonus_honor(self.honor_end_kills);
        for team in Team::ALL {
            state.reward_honor_to_team(honor, team);
        }
    }

    fn premature_winner(&self, state: &MatchState) -> Option<Team> {
        score_premature_winner(state)
    }

    fn initial_world_states(&self, state: &MatchState) -> Vec<WorldStateValue> {
        let unknown = |owner: Team| match self.flag(owner).state() {
            FlagState::OnGround => -1,
            FlagState::OnPlayer => 1,
            _ => 0,
        };
        let carried = |owner: Team| if self.flag(owner).is_picked_up() { 2 } else { 1 };

        let mut states = vec![
            world_state(WS_FLAG_CAPTURES_ALLIANCE, state.team_score(Team::Alliance) as i32),
            world_state(WS_FLAG_CAPTURES_HORDE, state.team_score(Team::Horde) as i32),
            world_state(WS_FLAG_UNK_ALLIANCE, unknown(Team::Alliance)),
            world_state(WS_FLAG_UNK_HORDE, unknown(Team::Horde)),
            world_state(WS_FLAG_CAPTURES_MAX, MAX_TEAM_SCORE as i32),
        ];
        if state.is_running() {
            states.push(world_state(WS_STATE_TIMER_ACTIVE, 1));
            states.push(world_state(
                WS_STATE_TIMER,
                TIME_LIMIT_MINUTES.saturating_sub(self.minutes_elapsed) as i32,
            ));
        } else {
            states.push(world_state(WS_STATE_TIMER_ACTIVE, 0));
        }
        states.push(world_state(WS_FLAG_STATE_HORDE, carried(Team::Horde)));
        states.push(world_state(WS_FLAG_STATE_ALLIANCE, carried(Team::Alliance)));
        states
    }

    /// Main graveyards while the battle runs; the flag room before, so that
    /// nobody is released outside the closed gates.
    fn closest_graveyard(&self, state: &MatchState, id: &str) -> Option<u32> {
        let team = state.team_of(id)?;
        Some(match (team, state.is_running()) {
            (Team::Alliance, true) => GRAVEYARD_MAIN_ALLIANCE,
            (Team::Alliance, false) => GRAVEYARD_FLAGROOM_ALLIANCE,
            (Team::Horde, true) => GRAVEYARD_MAIN_HORDE,
            (Team::Horde, false) => GRAVEYARD_FLAGROOM_HORDE,
        })
    }

    fn objective_view(&self, _state: &MatchState) -> ObjectiveView {
        ObjectiveView::CaptureTheFlag {
            flags: self.flags.iter().map(Flag::view).collect(),
            minutes_remaining: TIME_LIMIT_MINUTES.saturating_sub(self.minutes_elapsed),
            assault_stage: self.debuff_stage,
        }
    }
}

/// Aura worn by whoever carries `owner`'s flag.
fn flag_spell(owner: Team) -> u32 {
    match owner {
        Team::Alliance => SPELL_SILVERWING_FLAG,
        Team::Horde => SPELL_WARSONG_FLAG,
    }
}

fn faction_of(team: Team) -> u32 {
    match team {
        Team::Alliance => FACTION_ALLIANCE,
        Team::Horde => FACTION_HORDE,
    }
}

fn flag_state_world_state(team: Team) -> u32 {
    match team {
        Team::Alliance => WS_FLAG_STATE_ALLIANCE,
        Team::Horde => WS_FLAG_STATE_HORDE,
    }
}

fn unknown_world_state(owner: Team) -> u32 {
    match owner {
        Team::Alliance => WS_FLAG_UNK_ALLIANCE,
        Team::Horde => WS_FLAG_UNK_HORDE,
    }
}

fn captures_world_state(team: Team) -> u32 {
    match team {
        Team::Alliance => WS_FLAG_CAPTURES_ALLIANCE,
        Team::Horde => WS_FLAG_CAPTURES_HORDE,
    }
}

/// Capture zone in `team`'s flag room.
fn capture_trigger_for(team: Team) -> u32 {
    match team {
        Team::Alliance => TRIGGER_ALLIANCE_FLAG_ROOM,
        Team::Horde => TRIGGER_HORDE_FLAG_ROOM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battleground::testing::{
        aura_applied, flag_states, has_text, make_battleground, make_options, make_running,
        world_state_value,
    };
    use crate::battleground::{Battleground, BattlegroundOptions};
    use crate::broadcast::{Audience, Notification};
    use crate::participant::JoinRequest;
    use crate::stats_store::StoreRecord;
    use crate::types::{MatchStatus, Position};

    fn make_warsong() -> Battleground {
        make_running(
            BattlegroundKind::WarsongGulch,
            vec![
                JoinRequest::player("a1", "Anduin", Team::Alliance),
                JoinRequest::player("a2", "Brann", Team::Alliance),
                JoinRequest::player("h1", "Garrosh", Team::Horde),
            ],
        )
    }

    fn stand(battleground: &Battleground, owner: Team) -> Position {
        battleground
            .layout()
            .flag_stand(Some(owner))
            .expect("flag stand")
    }

    fn take_horde_flag(battleground: &mut Battleground) {
        let horde_stand = stand(battleground, Team::Horde);
        battleground
            .move_participant("a1", horde_stand)
            .expect("move to horde stand");
        battleground
            .click_flag("a1", Some(Team::Horde))
            .expect("click horde flag");
    }

    fn capture_once(battleground: &mut Battleground) {
        take_horde_flag(battleground);
        let alliance_stand = stand(battleground, Team::Alliance);
        battleground
            .move_participant("a1", alliance_stand)
            .expect("move home");
        battleground
            .handle_area_trigger("a1", TRIGGER_ALLIANCE_FLAG_ROOM)
            .expect("capture trigger");
    }

    #[test]
    fn carrying_the_enemy_flag_home_scores() {
        let mut bg = make_warsong();
        take_horde_flag(&mut bg);
        let notifications = bg.drain_notifications();
        assert!(has_text(&notifications, TEXT_HORDE_FLAG_PICKED_UP));
        assert!(aura_applied(&notifications, "a1", SPELL_WARSONG_FLAG));
        assert_eq!(world_state_value(&notifications, WS_FLAG_STATE_ALLIANCE), Some(2));
        assert_eq!(flag_states(&mut bg)[1], FlagState::OnPlayer);

        let alliance_stand = stand(&bg, Team::Alliance);
        bg.move_participant("a1", alliance_stand).expect("move home");
        bg.handle_area_trigger("a1", TRIGGER_ALLIANCE_FLAG_ROOM)
            .expect("capture trigger");

        assert_eq!(bg.team_score(Team::Alliance), 1);
        let notifications = bg.drain_notifications();
        assert!(has_text(&notifications, TEXT_CAPTURED_HORDE_FLAG));
        assert_eq!(world_state_value(&notifications, WS_FLAG_CAPTURES_ALLIANCE), Some(1));
        assert_eq!(flag_states(&mut bg)[1], FlagState::WaitRespawn);
        let score = bg.score("a1").expect("a1 score");
        assert_eq!(score.flag_captures, 1);
        assert_eq!(score.bonus_honor, 62);
        let reputation = bg
            .participant("a2")
            .and_then(|participant| participant.reputation.get(&FACTION_ALLIANCE).copied());
        assert_eq!(reputation, Some(REPUTATION_CAPTURE));
    }

    #[test]
    fn trigger_without_the_flag_does_nothing() {
        let mut bg = make_warsong();
        bg.handle_area_trigger("a2", TRIGGER_ALLIANCE_FLAG_ROOM)
            .expect("trigger");
        assert_eq!(bg.team_score(Team::Alliance), 0);
        assert_eq!(
            bg.handle_area_trigger("a2", 9999),
            Err(BattlegroundError::UnknownTrigger(9999))
        );
    }

    #[test]
    fn captured_flags_respawn_after_the_wait() {
        let mut bg = make_warsong();
        capture_once(&mut bg);
        bg.drain_notifications();

        bg.update(FLAG_RESPAWN_MS as u64);
        assert_eq!(flag_states(&mut bg)[1], FlagState::WaitRespawn);
        bg.update(50);
        assert_eq!(flag_states(&mut bg)[1], FlagState::OnBase);
        let notifications = bg.drain_notifications();
        assert!(has_text(&notifications, TEXT_FLAGS_PLACED));
    }

    fn capture_to_victory(battleground: &mut Battleground) {
        for _ in 0..2 {
            capture_once(battleground);
            battleground.update(FLAG_RESPAWN_MS as u64);
            battleground.update(50);
        }
        capture_once(battleground);
    }

    #[test]
    fn third_capture_wins_and_records_the_match() {
        let mut bg = make_warsong();
        capture_to_victory(&mut bg);

        assert_eq!(bg.status(), MatchStatus::Ending);
        assert_eq!(bg.winner(), Some(Team::Alliance));
        assert_eq!(bg.team_score(Team::Alliance), MAX_TEAM_SCORE);
        // three captures, the raw win reward, one win kill and two end kills
        let honor = bg.score("a1").expect("a1 score").bonus_honor;
        assert_eq!(honor, 62 * 3 + HONOR_TABLE[0][HONOR_REWARD_WIN] + 31 + 62);

        let records = bg.take_records();
        assert_eq!(records.len(), 1);
        match &records[0] {
            StoreRecord::Match(record) => {
                assert_eq!(record.winner, Some(Team::Alliance));
                assert_eq!(record.players.len(), 3);
                assert_eq!(record.type_id, 2);
            }
            other => panic!("expected match record, got {other:?}"),
        }
    }

    #[test]
    fn dropped_flag_is_returned_by_its_owner() {
        let mut bg = make_warsong();
        take_horde_flag(&mut bg);
        bg.drop_flag("a1").expect("drop");
        assert_eq!(flag_states(&mut bg)[1], FlagState::OnGround);
        let notifications = bg.drain_notifications();
        assert!(has_text(&notifications, TEXT_HORDE_FLAG_DROPPED));
        assert_eq!(world_state_value(&notifications, WS_FLAG_UNK_HORDE), Some(-1));

        let horde_stand = stand(&bg, Team::Horde);
        bg.move_participant("h1", horde_stand).expect("move");
        bg.click_flag("h1", Some(Team::Horde)).expect("click");
        assert_eq!(flag_states(&mut bg)[1], FlagState::OnBase);
        assert_eq!(bg.score("h1").expect("h1 score").flag_returns, 1);
        assert!(has_text(&bg.drain_notifications(), TEXT_HORDE_FLAG_RETURNED));

        // a flag back on its stand cannot be returned twice
        bg.click_flag("h1", Some(Team::Horde)).expect("click again");
        assert_eq!(bg.score("h1").expect("h1 score").flag_returns, 1);
        assert!(!has_text(&bg.drain_notifications(), TEXT_HORDE_FLAG_RETURNED));
    }

    #[test]
    fn dropped_flag_can_be_picked_up_again_by_the_enemy() {
        let mut bg = make_warsong();
        take_horde_flag(&mut bg);
        bg.drop_flag("a1").expect("drop");
        bg.click_flag("a1", Some(Team::Horde)).expect("click");
        assert_eq!(flag_states(&mut bg)[1], FlagState::OnPlayer);
    }

    #[test]
    fn flag_out_of_reach_is_not_picked_up() {
        let mut bg = make_warsong();
        bg.click_flag("a1", Some(Team::Horde)).expect("click from spawn");
        assert_eq!(flag_states(&mut bg)[1], FlagState::OnBase);
    }

    #[test]
    fn ground_flag_returns_on_its_own() {
        let mut bg = make_warsong();
        take_horde_flag(&mut bg);
        bg.drop_flag("a1").expect("drop");
        bg.drain_notifications();

        bg.update(FLAG_DROP_MS as u64);
        assert_eq!(flag_states(&mut bg)[1], FlagState::OnGround);
        bg.update(1);
        assert_eq!(flag_states(&mut bg)[1], FlagState::OnBase);
        assert!(has_text(&bg.drain_notifications(), TEXT_FLAGS_PLACED));
    }

    #[test]
    fn killing_the_carrier_drops_the_flag() {
        let mut bg = make_warsong();
        take_horde_flag(&mut bg);
        bg.handle_kill("a1", Some("h1")).expect("kill");
        assert_eq!(flag_states(&mut bg)[1], FlagState::OnGround);
        assert_eq!(bg.score("h1").expect("h1 score").killing_blows, 1);
        assert_eq!(bg.score("a1").expect("a1 score").deaths, 1);
    }

    #[test]
    fn returning_own_flag_completes_a_waiting_capture() {
        let mut bg = make_warsong();
        take_horde_flag(&mut bg);
        let alliance_stand = stand(&bg, Team::Alliance);
        bg.move_participant("h1", alliance_stand).expect("move");
        bg.click_flag("h1", Some(Team::Alliance)).expect("take alliance flag");
        bg.drop_flag("h1").expect("drop alliance flag");

        bg.move_participant("a1", alliance_stand).expect("move home");
        bg.handle_area_trigger("a1", TRIGGER_ALLIANCE_FLAG_ROOM)
            .expect("trigger");
        assert_eq!(bg.team_score(Team::Alliance), 0);

        bg.move_participant("a2", alliance_stand).expect("move");
        bg.click_flag("a2", Some(Team::Alliance)).expect("return");
        assert_eq!(bg.team_score(Team::Alliance), 1);
        assert_eq!(bg.score("a2").expect("a2 score").flag_returns, 1);
    }

    #[test]
    fn holding_both_flags_stacks_assault_debuffs() {
        let mut bg = make_warsong();
        take_horde_flag(&mut bg);
        let alliance_stand = stand(&bg, Team::Alliance);
        bg.move_participant("h1", alliance_stand).expect("move");
        bg.click_flag("h1", Some(Team::Alliance)).expect("take alliance flag");
        bg.drain_notifications();

        bg.update(FOCUSED_ASSAULT_MS);
        let notifications = bg.drain_notifications();
        assert!(aura_applied(&notifications, "a1", SPELL_FOCUSED_ASSAULT));
        assert!(aura_applied(&notifications, "h1", SPELL_FOCUSED_ASSAULT));

        bg.update(BRUTAL_ASSAULT_MS - FOCUSED_ASSAULT_MS);
        let notifications = bg.drain_notifications();
        assert!(aura_applied(&notifications, "a1", SPELL_BRUTAL_ASSAULT));
        match bg.snapshot(false).objective {
            ObjectiveView::CaptureTheFlag { assault_stage, .. } => assert_eq!(assault_stage, 2),
            other => panic!("unexpected objective {other:?}"),
        }
    }

    #[test]
    fn time_limit_ends_a_scoreless_match_without_winner() {
        let mut bg = make_warsong();
        bg.update(FORCED_END_MS);
        assert_eq!(bg.status(), MatchStatus::Ending);
        assert_eq!(bg.winner(), None);
    }

    #[test]
    fn time_limit_favours_the_leading_team() {
        let mut bg = make_warsong();
        capture_once(&mut bg);
        bg.update(FORCED_END_MS);
        assert_eq!(bg.winner(), Some(Team::Alliance));
    }

    #[test]
    fn initial_world_states_follow_the_match_status() {
        let mut bg = make_battleground(
            BattlegroundKind::WarsongGulch,
            make_options(),
            vec![
                JoinRequest::player("a1", "Anduin", Team::Alliance),
                JoinRequest::player("h1", "Garrosh", Team::Horde),
            ],
        );
        let warmup = bg.initial_world_states();
        assert!(warmup.contains(&world_state(WS_STATE_TIMER_ACTIVE, 0)));
        assert!(warmup.contains(&world_state(WS_FLAG_CAPTURES_MAX, 3)));
        assert_eq!(bg.closest_graveyard("a1"), Some(GRAVEYARD_FLAGROOM_ALLIANCE));

        crate::battleground::testing::run_to_battle(&mut bg);
        let running = bg.initial_world_states();
        assert!(running.contains(&world_state(WS_STATE_TIMER_ACTIVE, 1)));
        assert!(running.contains(&world_state(WS_STATE_TIMER, 25)));
        assert!(running.contains(&world_state(WS_FLAG_STATE_ALLIANCE, 1)));
        assert_eq!(bg.closest_graveyard("h1"), Some(GRAVEYARD_MAIN_HORDE));
    }

    #[test]
    fn leaving_carrier_drops_the_flag() {
        let mut bg = make_warsong();
        take_horde_flag(&mut bg);
        bg.remove_participant("a1").expect("remove");
        assert_eq!(flag_states(&mut bg)[1], FlagState::OnGround);
    }

    #[test]
    fn weekend_raises_capture_reputation() {
        let options = BattlegroundOptions {
            weekend: true,
            ..make_options()
        };
        let mut bg = make_battleground(
            BattlegroundKind::WarsongGulch,
            options,
            vec![
                JoinRequest::player("a1", "Anduin", Team::Alliance),
                JoinRequest::player("h1", "Garrosh", Team::Horde),
            ],
        );
        crate::battleground::testing::run_to_battle(&mut bg);
        capture_once(&mut bg);
        let reputation = bg
            .participant("a1")
            .and_then(|participant| participant.reputation.get(&FACTION_ALLIANCE).copied());
        assert_eq!(reputation, Some(REPUTATION_CAPTURE_WEEKEND));
    }

    #[test]
    fn holiday_pays_the_larger_win_reward() {
        let options = BattlegroundOptions {
            holiday: true,
            ..make_options()
        };
        let mut bg = make_battleground(
            BattlegroundKind::WarsongGulch,
            options,
            vec![
                JoinRequest::player("a1", "Anduin", Team::Alliance),
                JoinRequest::player("h1", "Garrosh", Team::Horde),
            ],
        );
        crate::battleground::testing::run_to_battle(&mut bg);
        capture_to_victory(&mut bg);

        assert_eq!(bg.winner(), Some(Team::Alliance));
        assert_eq!(HONOR_TABLE[1][HONOR_REWARD_WIN], 60);
        let honor = bg.score("a1").expect("a1 score").bonus_honor;
        assert_eq!(honor, 62 * 3 + HONOR_TABLE[1][HONOR_REWARD_WIN] + 31 + 62);
        // the loser only sees the end kills
        assert_eq!(bg.score("h1").expect("h1 score").bonus_honor, 62);
    }

    #[test]
    fn returning_carrier_gets_the_board_again() {
        let mut bg = make_warsong();
        take_horde_flag(&mut bg);
        bg.participant_logged_out("a1").expect("logout");
        assert_eq!(flag_states(&mut bg)[1], FlagState::OnGround);
        bg.drain_notifications();

        bg.participant_logged_in("a1").expect("login");
        let own: Vec<Notification> = bg
            .drain_notifications()
            .into_iter()
            .filter(|notification| notification.audience == Audience::Participant("a1".to_string()))
            .collect();
        assert_eq!(world_state_value(&own, WS_FLAG_UNK_HORDE), Some(-1));
        assert_eq!(world_state_value(&own, WS_FLAG_CAPTURES_MAX), Some(MAX_TEAM_SCORE as i32));
        assert_eq!(world_state_value(&own, WS_STATE_TIMER_ACTIVE), Some(1));
        assert_eq!(world_state_value(&own, WS_FLAG_STATE_ALLIANCE), Some(1));
        assert!(bg.participant("a1").expect("a1").online);
    }
}
