use tracing::{debug, warn};

use super::capture_point::CapturePoint;
use super::flag::Flag;
use super::rules::{score_premature_winner, world_state, BattlegroundRules};
use super::state::MatchState;
use crate::constants::eye::*;
use crate::error::BattlegroundError;
use crate::types::{
    BattlegroundKind, ChatChannel, FlagState, ObjectiveView, PointState, Position, ScoreType,
    Team, WorldStateValue,
};

/// The Fel Reaver capture zone is hidden under a larger one, so carriers are
/// also checked against this spot on every status pass.
const FEL_REAVER_FLAG_SPOT: Position = Position::new(2044.0, 1729.729, 1190.03);
const FEL_REAVER_FLAG_SPOT_RADIUS: f32 = 3.0;

const WS_PROGRESS_BAR_SHOWN: i32 = 1;
const WS_PROGRESS_BAR_HIDDEN: i32 = 0;
/// Conflict markers and unknown states the client expects at zero.
const WS_UNUSED_ZEROED: [u32; 8] = [2742, 2741, 2740, 2739, 2738, 2737, 2736, 2735];
const WS_UNKNOWN_CONSTANTS: [(u32, i32); 2] = [(2565, 142), (3085, 379)];

/// Territory control: four capture points feed resources and a neutral
/// flag scores more the more points its carrier's team holds.
#[derive(Debug)]
pub struct EyeOfTheStorm {
    flag: Flag,
    points: Vec<CapturePoint>,
    /// Participants not standing on any point.
    away: Vec<String>,
    points_count: [u32; 2],
    honor_score_tics: [u32; 2],
    honor_tics: u32,
    point_timer_ms: i64,
    tower_timer_ms: i64,
}

impl Default for EyeOfTheStorm {
    fn default() -> Self {
        Self::new()
    }
}

impl EyeOfTheStorm {
    pub fn new() -> Self {
        Self {
            flag: Flag::new(None),
            points: Vec::new(),
            away: Vec::new(),
            points_count: [0, 0],
            honor_score_tics: [0, 0],
            honor_tics: HONOR_TICK_NORMAL,
            point_timer_ms: 0,
            tower_timer_ms: 0,
        }
    }

    pub fn flag(&self) -> &Flag {
        &self.flag
    }

    pub fn points(&self) -> &[CapturePoint] {
        &self.points
    }

    pub fn points_count(&self, team: Team) -> u32 {
        self.points_count[team.index()]
    }

    fn is_tracked(&self, id: &str) -> bool {
        self.away.iter().any(|away| away == id) || self.points.iter().any(|point| point.contains(id))
    }

    fn forget(&mut self, id: &str) {
        self.away.retain(|away| away != id);
        for point in &mut self.points {
            point.leave(id);
        }
    }

    fn add_points(&mut self, state: &mut MatchState, team: Team, points: u32) {
        let index = team.index();
        state.team_scores[index] += points;
        self.honor_score_tics[index] += points;
        if self.honor_score_tics[index] >= self.honor_tics {
            let honor = state.bonus_honor(1);
            state.reward_honor_to_team(honor, team);
            self.honor_score_tics[index] -= self.honor_tics;
        }
        self.update_team_score(state, team);
    }

    fn update_team_score(&mut self, state: &mut MatchState, team: Team) {
        let index = team.index();
        let reached = state.team_scores[index] >= MAX_TEAM_SCORE;
        if reached {
            state.team_scores[index] = MAX_TEAM_SCORE;
        }
        let ws = match team {
            Team::Alliance => WS_ALLIANCE_RESOURCES,
            Team::Horde => WS_HORDE_RESOURCES,
        };
        state.notifier.world_state(ws, state.team_scores[index] as i32);
        if reached {
            state.label(format!("{team:?} reached {MAX_TEAM_SCORE} resources"));
            state.end_battleground(Some(team), self);
        }
    }

    fn update_points_count(&self, state: &mut MatchState, team: Team) {
        let ws = match team {
            Team::Alliance => WS_ALLIANCE_BASE,
            Team::Horde => WS_HORDE_BASE,
        };
        state
            .notifier
            .world_state(ws, self.points_count[team.index()] as i32);
    }

    /// The neutral icon has to be cleared before the team icon is set, and
    /// the other way round when the point falls.
    fn update_points_icons(&self, state: &mut MatchState, team: Team, index: usize) {
        let info = &POINTS[index];
        let team_icon = match team {
            Team::Alliance => info.ws_alliance_control,
            Team::Horde => info.ws_horde_control,
        };
        if self.points[index].state == PointState::UnderControl {
            state.notifier.world_state(info.ws_uncontrol, 0);
            state.notifier.world_state(team_icon, 1);
        } else {
            state.notifier.world_state(team_icon, 0);
            state.notifier.world_state(info.ws_uncontrol, 1);
        }
    }

    fn check_someone_joined_point(&mut self, state: &mut MatchState) {
        for index in 0..self.points.len() {
            let center = self.points[index].center;
            let bar = self.points[index].bar;
            let mut j = 0;
            while j < self.away.len() {
                let joined = state.participant(&self.away[j]).is_some_and(|participant| {
                    participant.avatar().can_capture_point()
                        && participant.position().within(&center, POINT_RADIUS)
                });
                if !joined {
                    j += 1;
                    continue;
                }
                let id = self.away.remove(j);
                state.notifier.participant_world_state(
                    &id,
                    WS_PROGRESS_BAR_PERCENT_GREY,
                    PROGRESS_BAR_PERCENT_GREY,
                );
                state
                    .notifier
                    .participant_world_state(&id, WS_PROGRESS_BAR_STATUS, bar);
                state
                    .notifier
                    .participant_world_state(&id, WS_PROGRESS_BAR_SHOW, WS_PROGRESS_BAR_SHOWN);
                self.points[index].join(&id);
            }
        }
    }

    fn check_someone_left_point(&mut self, state: &mut MatchState) {
        for point in &mut self.points {
            let center = point.center;
            let left = point.recount(|id| {
                state
                    .participant(id)
                    .filter(|participant| {
                        participant.avatar().can_capture_point()
                            && participant.position().within(&center, POINT_RADIUS)
                    })
                    .map(|participant| participant.team)
            });
            for id in left {
                if state.participant(&id).is_some() {
                    state.notifier.participant_world_state(
                        &id,
                        WS_PROGRESS_BAR_SHOW,
                        WS_PROGRESS_BAR_HIDDEN,
                    );
                } else {
                    warn!(participant = %id, "unknown participant left a capture point");
                }
                self.away.push(id);
            }
        }
    }

    fn update_point_statuses(&mut self, state: &mut MatchState) {
        for index in 0..self.points.len() {
            if self.points[index].is_empty() {
                continue;
            }
            self.points[index].advance_bar();
            let new_owner = self.points[index].computed_owner();
            let bar = self.points[index].bar;
            let nearby = self.points[index].nearby().to_vec();

            for id in nearby {
                let Some(participant) = state.participant(&id) else {
                    continue;
                };
                let team = participant.team;
                let position = participant.position();
                state
                    .notifier
                    .participant_world_state(&id, WS_PROGRESS_BAR_STATUS, bar);

                if new_owner != self.points[index].owner {
                    if self.points[index].state == PointState::Uncontrolled && Some(team) == new_owner
                    {
                        self.team_captured_point(state, &id, index);
                    }
                    let point = &self.points[index];
                    if point.state == PointState::UnderControl && Some(team) != point.owner {
                        self.team_lost_point(state, &id, index);
                    }
                }

                if index == FEL_REAVER
                    && self.points[index].owner == Some(team)
                    && self.flag.is_carried_by(&id)
                    && position.within(&FEL_REAVER_FLAG_SPOT, FEL_REAVER_FLAG_SPOT_RADIUS)
                {
                    self.capture_flag(state, &id);
                }
            }
        }
    }

    fn team_captured_point(&mut self, state: &mut MatchState, id: &str, index: usize) {
        if !state.is_running() {
            return;
        }
        let Some(participant) = state.participant(id) else {
            return;
        };
        let team = participant.team;
        let source = participant.name.clone();

        self.points_count[team.index()] += 1;
        self.points[index].set_captured(team);
        let info = &POINTS[index];
        let text = match team {
            Team::Alliance => info.text_alliance_taken,
            Team::Horde => info.text_horde_taken,
        };
        state
            .notifier
            .broadcast_text(text, team.channel(), Some(&source));
        self.update_points_icons(state, team, index);
        self.update_points_count(state, team);
        state.label(format!("{team:?} took {}", info.name));
        debug!(point = info.name, ?team, "point captured");
    }

    fn team_lost_point(&mut self, state: &mut MatchState, id: &str, index: usize) {
        if !state.is_running() {
            return;
        }
        let Some(team) = self.points[index].set_lost() else {
            return;
        };
        let count = &mut self.points_count[team.index()];
        *count = count.saturating_sub(1);

        let info = &POINTS[index];
        let text = match team {
            Team::Alliance => info.text_alliance_lost,
            Team::Horde => info.text_horde_lost,
        };
        let source = state.participant(id).map(|participant| participant.name.clone());
        state
            .notifier
            .broadcast_text(text, team.channel(), source.as_deref());
        self.update_points_icons(state, team, index);
        self.update_points_count(state, team);
        self.relocate_dead(state, info.graveyard);
        state.label(format!("{team:?} lost {}", info.name));
        debug!(point = info.name, ?team, "point lost");
    }

    /// Spirits waiting at a lost point's graveyard move to their next closest one.
    fn relocate_dead(&self, state: &mut MatchState, graveyard_id: u32) {
        let Some(waiting) = state.revive_queue.remove(&graveyard_id) else {
            return;
        };
        for id in waiting {
            let Some(target) = self.closest_graveyard(state, &id) else {
                continue;
            };
            let position = state.layout.graveyard(target).map(|graveyard| graveyard.position);
            if let (Some(position), Some(participant)) = (position, state.participants.get_mut(&id)) {
                participant.avatar_mut().set_position(position);
            }
            state.revive_queue.entry(target).or_default().push(id);
        }
    }

    fn capture_flag(&mut self, state: &mut MatchState, id: &str) {
        if !state.is_running() || !self.flag.is_carried_by(id) {
            return;
        }
        let Some(participant) = state.participant(id) else {
            return;
        };
        let team = participant.team;
        let source = participant.name.clone();

        self.flag.capture(FLAG_RESPAWN_MS);
        state.remove_aura(id, SPELL_NETHERSTORM_FLAG);
        let (text, sound) = match team {
            Team::Alliance => (TEXT_ALLIANCE_CAPTURED_FLAG, SOUND_FLAG_CAPTURED_ALLIANCE),
            Team::Horde => (TEXT_HORDE_CAPTURED_FLAG, SOUND_FLAG_CAPTURED_HORDE),
        };
        state
            .notifier
            .broadcast_text(text, team.channel(), Some(&source));
        state.notifier.sound_to_all(sound);
        state.update_participant_score(id, ScoreType::FlagCaptures, 1);
        state.label(format!("{team:?} captured the flag"));

        let count = self.points_count[team.index()];
        if count > 0 {
            self.add_points(state, team, FLAG_POINTS[count as usize - 1]);
        }
    }

    fn respawn_flag(&mut self, state: &mut MatchState, announce: bool) {
        self.flag.respawn();
        if announce {
            state
                .notifier
                .broadcast_text(TEXT_FLAG_RESET, ChatChannel::Neutral, None);
            state.notifier.sound_to_all(SOUND_FLAG_RESET);
        }
        state.notifier.world_state(WS_NETHERSTORM_FLAG, 1);
    }

    fn flag_position(&self, state: &MatchState) -> Option<Position> {
        match self.flag.state() {
            FlagState::OnBase => state.layout.flag_stand(None),
            FlagState::OnGround => self.flag.ground_position(),
            FlagState::OnPlayer | FlagState::WaitRespawn => None,
        }
    }
}

impl BattlegroundRules for EyeOfTheStorm {
    fn kind(&self) -> BattlegroundKind {
        BattlegroundKind::EyeOfTheStorm
    }

    fn reset(&mut self, state: &mut MatchState) {
        state.team_scores = [0, 0];
        self.points_count = [0, 0];
        self.honor_score_tics = [0, 0];
        self.flag.respawn();
        self.point_timer_ms = 0;
        self.tower_timer_ms = 0;
        self.honor_tics = if state.options.weekend {
            HONOR_TICK_WEEKEND
        } else {
            HONOR_TICK_NORMAL
        };
        if self.points.len() == state.layout.point_centers.len() {
            for point in &mut self.points {
                point.reset();
            }
        } else {
            self.points = state
                .layout
                .point_centers
                .iter()
                .enumerate()
                .map(|(index, center)| CapturePoint::new(index, *center))
                .collect();
        }
        self.away.clear();
    }

    fn open_doors(&mut self, state: &mut MatchState) {
        state.notifier.world_state(WS_NETHERSTORM_FLAG, 1);
    }

    fn post_update(&mut self, state: &mut MatchState, diff_ms: u64) {
        if !state.is_running() {
            return;
        }
        let diff = diff_ms as i64;

        self.point_timer_ms -= diff;
        if self.point_timer_ms <= 0 {
            self.point_timer_ms = POINTS_TICK_MS;
            for team in Team::ALL {
                let count = self.points_count[team.index()];
                if count > 0 && state.is_running() {
                    self.add_points(state, team, TICK_POINTS[count as usize - 1]);
                }
            }
        }
        if !state.is_running() {
            return;
        }

        if self.flag.tick(diff_ms).is_some() {
            self.respawn_flag(state, true);
        }

        self.tower_timer_ms -= diff;
        if self.tower_timer_ms <= 0 {
            self.check_someone_joined_point(state);
            self.check_someone_left_point(state);
            self.update_point_statuses(state);
            self.tower_timer_ms = POINTS_TICK_MS;
        }
    }

    fn on_participant_added(&mut self, _state: &mut MatchState, id: &str) {
        if !self.is_tracked(id) {
            self.away.push(id.to_string());
        }
    }

    fn on_participant_removed(&mut self, state: &mut MatchState, id: &str, _team: Team, online: bool) {
        self.forget(id);
        if !self.flag.is_carried_by(id) {
            return;
        }
        if online {
            self.drop_flag(state, id);
        } else {
            warn!(participant = id, "removing offline participant who carries the flag");
            self.respawn_flag(state, true);
        }
    }

    fn handle_kill(&mut self, state: &mut MatchState, victim_id: &str, killer_id: Option<&str>) {
        state.credit_kill(victim_id, killer_id);
        self.drop_flag(state, victim_id);
    }

    fn handle_area_trigger(
        &mut self,
        state: &mut MatchState,
        id: &str,
        trigger: u32,
    ) -> Result<(), BattlegroundError> {
        let Some(index) = point_by_trigger(trigger) else {
            return Err(BattlegroundError::UnknownTrigger(trigger));
        };
        if !state.is_running() {
            return Ok(());
        }
        let Some(participant) = state.participant(id) else {
            return Ok(());
        };
        if !participant.is_alive() {
            return Ok(());
        }
        if self.points[index].is_controlled_by(participant.team) && self.flag.is_carried_by(id) {
            self.capture_flag(state, id);
        }
        Ok(())
    }

    fn click_flag(&mut self, state: &mut MatchState, id: &str, flag: Option<Team>) {
        if flag.is_some() || !state.is_running() || self.flag.is_picked_up() {
            return;
        }
        let Some(flag_position) = self.flag_position(state) else {
            return;
        };
        let Some(participant) = state.participant(id) else {
            return;
        };
        if !participant.is_alive() || !participant.position().within(&flag_position, FLAG_CLICK_RANGE) {
            return;
        }
        let team = participant.team;
        let source = participant.name.clone();
        let was_on_base = self.flag.state() == FlagState::OnBase;
        if !self.flag.pick_up(id) {
            return;
        }

        let (ws, sound) = match team {
            Team::Alliance => (WS_NETHERSTORM_FLAG_STATE_ALLIANCE, SOUND_FLAG_PICKED_UP_ALLIANCE),
            Team::Horde => (WS_NETHERSTORM_FLAG_STATE_HORDE, SOUND_FLAG_PICKED_UP_HORDE),
        };
        state.notifier.world_state(ws, FlagState::OnPlayer.code());
        state.notifier.sound_to_all(sound);
        if was_on_base {
            state.notifier.world_state(WS_NETHERSTORM_FLAG, 0);
        }
        state.apply_aura(id, SPELL_NETHERSTORM_FLAG);
        state
            .notifier
            .broadcast_text(TEXT_FLAG_TAKEN, team.channel(), Some(&source));
    }

    fn drop_flag(&mut self, state: &mut MatchState, id: &str) {
        if !self.flag.is_carried_by(id) {
            return;
        }
        let Some(participant) = state.participant(id) else {
            return;
        };
        let team = participant.team;
        let position = participant.position();

        if !state.is_running() {
            self.flag.respawn();
            state.remove_aura(id, SPELL_NETHERSTORM_FLAG);
            return;
        }

        self.flag.drop_to_ground(FLAG_RESPAWN_MS, position);
        state.remove_aura(id, SPELL_NETHERSTORM_FLAG);
        state.apply_aura(id, SPELL_PLAYER_DROPPED_FLAG);
        state
            .notifier
            .world_state(WS_NETHERSTORM_FLAG_STATE_HORDE, FlagState::WaitRespawn.code());
        state
            .notifier
            .world_state(WS_NETHERSTORM_FLAG_STATE_ALLIANCE, FlagState::WaitRespawn.code());
        state
            .notifier
            .broadcast_text(TEXT_FLAG_DROPPED, team.channel(), None);
    }

    fn end_rewards(&mut self, state: &mut MatchState, winner: Option<Team>) {
        let honor = state.bonus_honor(1);
        if let Some(team) = winner {
            state.reward_honor_to_team(honor, team);
        }
        for team in Team::ALL {
            state.reward_honor_to_team(honor, team);
        }
    }

    fn premature_winner(&self, state: &MatchState) -> Option<Team> {
        score_premature_winner(state)
    }

    fn initial_world_states(&self, state: &MatchState) -> Vec<WorldStateValue> {
        let mut states = vec![
            world_state(WS_HORDE_BASE, self.points_count(Team::Horde) as i32),
            world_state(WS_ALLIANCE_BASE, self.points_count(Team::Alliance) as i32),
        ];
        states.extend(WS_UNUSED_ZEROED.iter().map(|id| world_state(*id, 0)));

        for index in [DRAENEI_RUINS, MAGE_TOWER, FEL_REAVER, BLOOD_ELF] {
            let info = &POINTS[index];
            let point = self.points.get(index);
            let held_by = |team: Team| point.is_some_and(|point| point.is_controlled_by(team)) as i32;
            let uncontrolled =
                point.map_or(true, |point| point.state != PointState::UnderControl) as i32;
            states.push(world_state(info.ws_horde_control, held_by(Team::Horde)));
            states.push(world_state(info.ws_alliance_control, held_by(Team::Alliance)));
            states.push(world_state(info.ws_uncontrol, uncontrolled));
        }

        let flag_on_base = (self.flag.state() == FlagState::OnBase) as i32;
        states.push(world_state(WS_NETHERSTORM_FLAG, flag_on_base));
        states.push(world_state(WS_NETHERSTORM_FLAG_STATE_HORDE, 1));
        states.push(world_state(WS_NETHERSTORM_FLAG_STATE_ALLIANCE, 1));
        states.push(world_state(WS_HORDE_RESOURCES, state.team_score(Team::Horde) as i32));
        states.push(world_state(
            WS_ALLIANCE_RESOURCES,
            state.team_score(Team::Alliance) as i32,
        ));
        states.push(world_state(WS_UNKNOWN_CONSTANTS[0].0, WS_UNKNOWN_CONSTANTS[0].1));
        states.push(world_state(WS_PROGRESS_BAR_PERCENT_GREY, 0));
        states.push(world_state(WS_PROGRESS_BAR_STATUS, 0));
        states.push(world_state(WS_PROGRESS_BAR_SHOW, 0));
        states.push(world_state(WS_UNKNOWN_CONSTANTS[1].0, WS_UNKNOWN_CONSTANTS[1].1));
        states
    }

    /// Nearest of the team's main graveyard and those of the points it holds.
    fn closest_graveyard(&self, state: &MatchState, id: &str) -> Option<u32> {
        let participant = state.participant(id)?;
        let team = participant.team;
        let mut candidates = vec![match team {
            Team::Alliance => GRAVEYARD_MAIN_ALLIANCE,
            Team::Horde => GRAVEYARD_MAIN_HORDE,
        }];
        candidates.extend(
            self.points
                .iter()
                .filter(|point| point.is_controlled_by(team))
                .map(|point| POINTS[point.index].graveyard),
        );
        state
            .layout
            .nearest_graveyard(&participant.position(), &candidates)
    }

    fn objective_view(&self, _state: &MatchState) -> ObjectiveView {
        ObjectiveView::TerritoryControl {
            flag: self.flag.view(),
            points: self.points.iter().map(CapturePoint::view).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battleground::testing::{
        flag_states, has_text, make_battleground, make_options, make_running, run_to_battle,
        world_state_value,
    };
    use crate::battleground::{Battleground, BattlegroundOptions};
    use crate::participant::JoinRequest;
    use crate::types::{MatchEvent, MatchStatus};

    fn make_eye() -> Battleground {
        make_running(
            BattlegroundKind::EyeOfTheStorm,
            vec![
                JoinRequest::player("a1", "Anduin", Team::Alliance),
                JoinRequest::player("h1", "Garrosh", Team::Horde),
            ],
        )
    }

    fn point_views(bg: &mut Battleground) -> Vec<crate::types::CapturePointView> {
        match bg.snapshot(false).objective {
            ObjectiveView::TerritoryControl { points, .. } => points,
            other => panic!("unexpected objective {other:?}"),
        }
    }

    fn hold_point(bg: &mut Battleground, id: &str, index: usize, checks: usize) {
        let center = bg.layout().point_centers[index];
        bg.move_participant(id, center).expect("move to point");
        for _ in 0..checks {
            bg.update(POINTS_TICK_MS as u64);
        }
    }

    fn take_flag(bg: &mut Battleground, id: &str) {
        let stand = bg.layout().flag_stand(None).expect("flag stand");
        bg.move_participant(id, stand).expect("move to flag");
        bg.click_flag(id, None).expect("click flag");
    }

    fn fel_reaver_trigger(bg: &Battleground) -> Position {
        bg.layout()
            .trigger(TRIGGER_FEL_REAVER_POINT)
            .expect("fel reaver trigger")
            .position
    }

    #[test]
    fn standing_on_a_point_captures_it() {
        let mut bg = make_eye();
        hold_point(&mut bg, "a1", FEL_REAVER, 19);
        let points = point_views(&mut bg);
        assert_eq!(points[FEL_REAVER].bar, 69);
        assert_eq!(points[FEL_REAVER].owner, None);
        assert_eq!(points[FEL_REAVER].alliance_near, 1);

        bg.update(POINTS_TICK_MS as u64);
        let points = point_views(&mut bg);
        assert_eq!(points[FEL_REAVER].owner, Some(Team::Alliance));
        assert_eq!(points[FEL_REAVER].state, PointState::UnderControl);

        let notifications = bg.drain_notifications();
        assert!(has_text(&notifications, POINTS[FEL_REAVER].text_alliance_taken));
        assert_eq!(world_state_value(&notifications, WS_ALLIANCE_BASE), Some(1));
        assert_eq!(
            world_state_value(&notifications, WS_FEL_REAVER_ALLIANCE_CONTROL),
            Some(1)
        );
        assert_eq!(world_state_value(&notifications, WS_PROGRESS_BAR_SHOW), Some(1));
    }

    #[test]
    fn concealed_participants_do_not_capture() {
        let mut bg = make_eye();
        bg.set_concealed("a1", true).expect("conceal");
        hold_point(&mut bg, "a1", FEL_REAVER, 5);
        let points = point_views(&mut bg);
        assert_eq!(points[FEL_REAVER].bar, PROGRESS_BAR_START);
        assert_eq!(points[FEL_REAVER].alliance_near, 0);
    }

    #[test]
    fn held_points_generate_resources() {
        let mut bg = make_eye();
        hold_point(&mut bg, "a1", FEL_REAVER, 20);
        assert_eq!(bg.team_score(Team::Alliance), 0);
        bg.update(POINTS_TICK_MS as u64);
        assert_eq!(bg.team_score(Team::Alliance), TICK_POINTS[0]);
        assert_eq!(bg.team_score(Team::Horde), 0);
    }

    #[test]
    fn flag_scores_at_a_held_point() {
        let mut bg = make_eye();
        hold_point(&mut bg, "a1", FEL_REAVER, 20);
        take_flag(&mut bg, "a1");
        assert_eq!(flag_states(&mut bg), vec![FlagState::OnPlayer]);
        let notifications = bg.drain_notifications();
        assert!(has_text(&notifications, TEXT_FLAG_TAKEN));
        assert_eq!(world_state_value(&notifications, WS_NETHERSTORM_FLAG), Some(0));
        assert_eq!(
            world_state_value(&notifications, WS_NETHERSTORM_FLAG_STATE_ALLIANCE),
            Some(2)
        );

        let trigger = fel_reaver_trigger(&bg);
        bg.move_participant("a1", trigger).expect("move to trigger");
        bg.handle_area_trigger("a1", TRIGGER_FEL_REAVER_POINT)
            .expect("trigger");
        assert_eq!(bg.team_score(Team::Alliance), FLAG_POINTS[0]);
        assert_eq!(flag_states(&mut bg), vec![FlagState::WaitRespawn]);
        assert_eq!(bg.score("a1").expect("a1 score").flag_captures, 1);
        assert!(has_text(&bg.drain_notifications(), TEXT_ALLIANCE_CAPTURED_FLAG));
    }

    #[test]
    fn flag_does_not_score_at_an_unheld_point() {
        let mut bg = make_eye();
        take_flag(&mut bg, "a1");
        let trigger = fel_reaver_trigger(&bg);
        bg.move_participant("a1", trigger).expect("move to trigger");
        bg.handle_area_trigger("a1", TRIGGER_FEL_REAVER_POINT)
            .expect("trigger");
        assert_eq!(bg.team_score(Team::Alliance), 0);
        assert_eq!(flag_states(&mut bg), vec![FlagState::OnPlayer]);
    }

    #[test]
    fn carrier_on_the_fel_reaver_spot_scores_without_trigger() {
        let mut bg = make_eye();
        hold_point(&mut bg, "a1", FEL_REAVER, 20);
        take_flag(&mut bg, "a1");
        bg.move_participant("a1", FEL_REAVER_FLAG_SPOT).expect("move");
        bg.update(POINTS_TICK_MS as u64);
        assert_eq!(flag_states(&mut bg), vec![FlagState::WaitRespawn]);
        assert!(bg.team_score(Team::Alliance) >= FLAG_POINTS[0]);
    }

    #[test]
    fn dropped_flag_resets_after_the_timer() {
        let mut bg = make_eye();
        take_flag(&mut bg, "a1");
        bg.drop_flag("a1").expect("drop");
        assert_eq!(flag_states(&mut bg), vec![FlagState::OnGround]);
        let notifications = bg.drain_notifications();
        assert!(has_text(&notifications, TEXT_FLAG_DROPPED));
        assert_eq!(
            world_state_value(&notifications, WS_NETHERSTORM_FLAG_STATE_ALLIANCE),
            Some(1)
        );

        bg.update(FLAG_RESPAWN_MS as u64);
        assert_eq!(flag_states(&mut bg), vec![FlagState::OnGround]);
        bg.update(1);
        assert_eq!(flag_states(&mut bg), vec![FlagState::OnBase]);
        let notifications = bg.drain_notifications();
        assert!(has_text(&notifications, TEXT_FLAG_RESET));
        assert_eq!(world_state_value(&notifications, WS_NETHERSTORM_FLAG), Some(1));
    }

    #[test]
    fn dropped_flag_can_be_picked_up_from_the_ground() {
        let mut bg = make_eye();
        take_flag(&mut bg, "a1");
        bg.drop_flag("a1").expect("drop");
        let ground = bg.participant("a1").expect("a1").position();
        bg.move_participant("h1", ground).expect("move");
        bg.click_flag("h1", None).expect("click");
        assert_eq!(flag_states(&mut bg), vec![FlagState::OnPlayer]);
    }

    #[test]
    fn killing_the_carrier_drops_the_flag() {
        let mut bg = make_eye();
        take_flag(&mut bg, "a1");
        bg.handle_kill("a1", Some("h1")).expect("kill");
        assert_eq!(flag_states(&mut bg), vec![FlagState::OnGround]);
        assert_eq!(bg.score("h1").expect("h1 score").killing_blows, 1);
    }

    #[test]
    fn logging_out_with_the_flag_drops_it() {
        let mut bg = make_eye();
        take_flag(&mut bg, "a1");
        bg.participant_logged_out("a1").expect("logout");
        assert_eq!(flag_states(&mut bg), vec![FlagState::OnGround]);
    }

    #[test]
    fn contested_point_is_lost_and_spirits_move_on() {
        let mut bg = make_eye();
        hold_point(&mut bg, "a1", FEL_REAVER, 20);
        assert_eq!(bg.closest_graveyard("a1"), Some(GRAVEYARD_FEL_REAVER));

        bg.handle_kill("a1", Some("h1")).expect("kill");
        assert_eq!(
            bg.release_spirit("a1").expect("release"),
            Some(GRAVEYARD_FEL_REAVER)
        );
        bg.drain_notifications();

        let center = bg.layout().point_centers[FEL_REAVER];
        bg.move_participant("h1", center).expect("move");
        bg.update(POINTS_TICK_MS as u64);

        let points = point_views(&mut bg);
        assert_eq!(points[FEL_REAVER].owner, None);
        assert_eq!(points[FEL_REAVER].state, PointState::Uncontrolled);
        let notifications = bg.drain_notifications();
        assert!(has_text(&notifications, POINTS[FEL_REAVER].text_alliance_lost));
        assert_eq!(world_state_value(&notifications, WS_ALLIANCE_BASE), Some(0));
        assert_eq!(
            world_state_value(&notifications, WS_FEL_REAVER_UNCONTROL),
            Some(1)
        );

        let main = bg
            .layout()
            .graveyard(GRAVEYARD_MAIN_ALLIANCE)
            .expect("main graveyard")
            .position;
        assert_eq!(bg.participant("a1").expect("a1").position(), main);
    }

    #[test]
    fn reaching_max_resources_ends_the_match() {
        let mut bg = make_eye();
        hold_point(&mut bg, "a1", FEL_REAVER, 20);
        bg.state.team_scores[Team::Alliance.index()] = MAX_TEAM_SCORE - 1;
        bg.update(POINTS_TICK_MS as u64);
        assert_eq!(bg.status(), MatchStatus::Ending);
        assert_eq!(bg.winner(), Some(Team::Alliance));
        assert_eq!(bg.team_score(Team::Alliance), MAX_TEAM_SCORE);
        // one win kill plus one kill for the completed map
        assert_eq!(bg.score("a1").expect("a1 score").bonus_honor, 31 + 31);
    }

    #[test]
    fn initial_world_states_describe_the_board() {
        let bg = make_eye();
        let states = bg.initial_world_states();
        assert_eq!(states.len(), 32);
        assert!(states.contains(&world_state(WS_NETHERSTORM_FLAG, 1)));
        assert!(states.contains(&world_state(WS_FEL_REAVER_UNCONTROL, 1)));
        assert!(states.contains(&world_state(2565, 142)));
        assert_eq!(states[0], world_state(WS_HORDE_BASE, 0));
    }

    fn honor_awards(bg: &mut Battleground, id: &str) -> Vec<u32> {
        bg.drain_notifications()
            .into_iter()
            .filter_map(|notification| match notification.event {
                MatchEvent::HonorAwarded {
                    participant_id,
                    amount,
                } if participant_id == id => Some(amount),
                _ => None,
            })
            .collect()
    }

    /// Holds Fel Reaver with `a1` until the next tick would reach `threshold`,
    /// then checks that exactly that tick pays one kill worth of honor.
    fn assert_honor_every(mut bg: Battleground, threshold: u32) {
        hold_point(&mut bg, "a1", FEL_REAVER, 20);
        while bg.team_score(Team::Alliance) < threshold - TICK_POINTS[0] {
            bg.update(POINTS_TICK_MS as u64);
        }
        assert!(honor_awards(&mut bg, "a1").is_empty());

        bg.update(POINTS_TICK_MS as u64);
        assert_eq!(bg.team_score(Team::Alliance), threshold);
        assert_eq!(honor_awards(&mut bg, "a1"), vec![31]);
        assert_eq!(bg.score("a1").expect("a1 score").bonus_honor, 31);
        assert_eq!(bg.score("h1").expect("h1 score").bonus_honor, 0);

        bg.update(POINTS_TICK_MS as u64);
        assert!(honor_awards(&mut bg, "a1").is_empty());
    }

    #[test]
    fn resources_pay_honor_every_honor_tick() {
        assert_honor_every(make_eye(), HONOR_TICK_NORMAL);
    }

    #[test]
    fn weekend_pays_honor_sooner() {
        let options = BattlegroundOptions {
            weekend: true,
            ..make_options()
        };
        let mut bg = make_battleground(
            BattlegroundKind::EyeOfTheStorm,
            options,
            vec![
                JoinRequest::player("a1", "Anduin", Team::Alliance),
                JoinRequest::player("h1", "Garrosh", Team::Horde),
            ],
        );
        run_to_battle(&mut bg);
        bg.drain_notifications();
        assert_honor_every(bg, HONOR_TICK_WEEKEND);
    }

    /// Two per team with a minimum of two; `leavers` then leave the match.
    fn make_premature_eye(leavers: &[&str], scores: [u32; 2]) -> Battleground {
        let options = BattlegroundOptions {
            min_players_per_team: 2,
            premature_finish_ms: 10_000,
            ..make_options()
        };
        let mut bg = make_battleground(
            BattlegroundKind::EyeOfTheStorm,
            options,
            vec![
                JoinRequest::player("a1", "Anduin", Team::Alliance),
                JoinRequest::player("a2", "Brann", Team::Alliance),
                JoinRequest::player("h1", "Garrosh", Team::Horde),
                JoinRequest::player("h2", "Thrall", Team::Horde),
            ],
        );
        run_to_battle(&mut bg);
        for id in leavers {
            bg.remove_participant(id).expect("remove");
        }
        bg.state.team_scores = scores;
        bg.update(1);
        assert_eq!(bg.status(), MatchStatus::Running);
        bg.update(10_001);
        assert_eq!(bg.status(), MatchStatus::Ending);
        bg
    }

    #[test]
    fn premature_finish_goes_to_the_resource_leader() {
        // the understaffed side still wins on resources
        let bg = make_premature_eye(&["a2"], [300, 100]);
        assert_eq!(bg.winner(), Some(Team::Alliance));

        let bg = make_premature_eye(&["a2"], [100, 300]);
        assert_eq!(bg.winner(), Some(Team::Horde));
    }

    #[test]
    fn premature_finish_on_equal_resources_falls_back_to_staffing() {
        let bg = make_premature_eye(&["a2"], [200, 200]);
        assert_eq!(bg.winner(), Some(Team::Horde));

        let bg = make_premature_eye(&["a2", "h2"], [200, 200]);
        assert_eq!(bg.winner(), None);
    }

    #[test]
    fn reset_returns_points_to_neutral() {
        let mut bg = make_eye();
        hold_point(&mut bg, "a1", FEL_REAVER, 20);
        assert_eq!(point_views(&mut bg)[FEL_REAVER].owner, Some(Team::Alliance));

        bg.reset();
        let points = point_views(&mut bg);
        assert_eq!(points.len(), 4);
        for point in &points {
            assert_eq!(point.owner, None);
            assert_eq!(point.state, PointState::Uncontrolled);
            assert_eq!(point.bar, PROGRESS_BAR_START);
            assert_eq!(point.alliance_near, 0);
        }
        assert_eq!(bg.team_score(Team::Alliance), 0);
    }
}
