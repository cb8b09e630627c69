use std::fmt::Debug;

use super::state::MatchState;
use crate::constants::{
    TEXT_BATTLE_HAS_BEGUN, TEXT_START_HALF_MINUTE, TEXT_START_ONE_MINUTE, TEXT_START_TWO_MINUTES,
};
use crate::error::BattlegroundError;
use crate::types::{BattlegroundKind, ObjectiveView, Team, WorldStateValue};

pub const DEFAULT_START_MESSAGES: [Option<u32>; 4] = [
    Some(TEXT_START_TWO_MINUTES),
    Some(TEXT_START_ONE_MINUTE),
    Some(TEXT_START_HALF_MINUTE),
    Some(TEXT_BATTLE_HAS_BEGUN),
];

/// Objective logic plugged into the shared match controller.
///
/// Every hook receives the match state mutably. Hooks that end the match
/// call `MatchState::end_battleground` with themselves as the rule set, so
/// the end rewards run in the same call.
pub trait BattlegroundRules: Debug + Send {
    fn kind(&self) -> BattlegroundKind;

    /// Texts for the four starting events; `None` skips the announcement.
    fn start_message_ids(&self) -> [Option<u32>; 4] {
        DEFAULT_START_MESSAGES
    }

    /// Restores the objective to its initial state. Weekend and holiday
    /// reward variants are read from the match options.
    fn reset(&mut self, state: &mut MatchState);

    fn close_doors(&mut self, _state: &mut MatchState) {}

    fn open_doors(&mut self, _state: &mut MatchState) {}

    /// Runs at the end of every update; rule sets act only while Running.
    fn post_update(&mut self, state: &mut MatchState, diff_ms: u64);

    fn on_participant_added(&mut self, _state: &mut MatchState, _id: &str) {}

    /// Called while the participant is still in the roster. `online` is
    /// false when the removal comes from the offline grace queue.
    fn on_participant_removed(&mut self, _state: &mut MatchState, _id: &str, _team: Team, _online: bool) {}

    /// Only called while Running.
    fn handle_kill(&mut self, state: &mut MatchState, victim_id: &str, killer_id: Option<&str>) {
        state.credit_kill(victim_id, killer_id);
    }

    fn handle_area_trigger(
        &mut self,
        state: &mut MatchState,
        id: &str,
        trigger: u32,
    ) -> Result<(), BattlegroundError>;

    /// `flag` names the flag's owning team; `None` targets a neutral flag.
    fn click_flag(&mut self, state: &mut MatchState, id: &str, flag: Option<Team>);

    fn drop_flag(&mut self, state: &mut MatchState, id: &str);

    fn end_rewards(&mut self, _state: &mut MatchState, _winner: Option<Team>) {}

    fn premature_winner(&self, state: &MatchState) -> Option<Team> {
        state.base_premature_winner()
    }

    fn initial_world_states(&self, state: &MatchState) -> Vec<WorldStateValue>;

    fn closest_graveyard(&self, state: &MatchState, id: &str) -> Option<u32>;

    fn objective_view(&self, state: &MatchState) -> ObjectiveView;
}

/// Higher score wins; a tie falls back to the shared rule.
pub(super) fn score_premature_winner(state: &MatchState) -> Option<Team> {
    let alliance = state.team_score(Team::Alliance);
    let horde = state.team_score(Team::Horde);
    if alliance > horde {
        Some(Team::Alliance)
    } else if horde > alliance {
        Some(Team::Horde)
    } else {
        state.base_premature_winner()
    }
}

pub(super) fn world_state(id: u32, value: i32) -> WorldStateValue {
    WorldStateValue { id, value }
}
