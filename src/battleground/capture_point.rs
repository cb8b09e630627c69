use crate::constants::eye::{
    MAX_CAPTURERS, POINTS, PROGRESS_BAR_ALLIANCE_CONTROLLED, PROGRESS_BAR_HORDE_CONTROLLED,
    PROGRESS_BAR_START,
};
use crate::types::{CapturePointView, PointState, Position, Team};

const PROGRESS_BAR_MIN: i32 = 0;
const PROGRESS_BAR_MAX: i32 = 100;

#[derive(Clone, Debug)]
pub struct CapturePoint {
    pub index: usize,
    pub center: Position,
    pub owner: Option<Team>,
    pub state: PointState,
    pub bar: i32,
    nearby: Vec<String>,
    near_counts: [u32; 2],
}

impl CapturePoint {
    pub fn new(index: usize, center: Position) -> Self {
        Self {
            index,
            center,
            owner: None,
            state: PointState::Uncontrolled,
            bar: PROGRESS_BAR_START,
            nearby: Vec::new(),
            near_counts: [0, 0],
        }
    }

    pub fn join(&mut self, participant_id: &str) {
        if !self.contains(participant_id) {
            self.nearby.push(participant_id.to_string());
        }
    }

    pub fn leave(&mut self, participant_id: &str) -> bool {
        let before = self.nearby.len();
        self.nearby.retain(|id| id != participant_id);
        before != self.nearby.len()
    }

    pub fn contains(&self, participant_id: &str) -> bool {
        self.nearby.iter().any(|id| id == participant_id)
    }

    pub fn nearby(&self) -> &[String] {
        &self.nearby
    }

    pub fn is_empty(&self) -> bool {
        self.nearby.is_empty()
    }

    pub fn near_count(&self, team: Team) -> u32 {
        self.near_counts[team.index()]
    }

    /// Rebuilds per-team counts. `still_near` yields the team of each id that
    /// stays on the point; everyone else is removed and returned.
    pub fn recount<F>(&mut self, mut still_near: F) -> Vec<String>
    where
        F: FnMut(&str) -> Option<Team>,
    {
        self.near_counts = [0, 0];
        let mut left = Vec::new();
        let mut kept = Vec::with_capacity(self.nearby.len());
        for id in self.nearby.drain(..) {
            match still_near(&id) {
                Some(team) => {
                    self.near_counts[team.index()] += 1;
                    kept.push(id);
                }
                None => left.push(id),
            }
        }
        self.nearby = kept;
        left
    }

    /// Moves the bar toward the team with more capturers. The push is capped
    /// at the capturer limit for the Alliance side only.
    pub fn advance_bar(&mut self) {
        let diff = self.near_counts[Team::Alliance.index()] as i32
            - self.near_counts[Team::Horde.index()] as i32;
        self.bar += diff.min(MAX_CAPTURERS);
        self.bar = self.bar.clamp(PROGRESS_BAR_MIN, PROGRESS_BAR_MAX);
    }

    pub fn computed_owner(&self) -> Option<Team> {
        if self.bar <= PROGRESS_BAR_HORDE_CONTROLLED {
            Some(Team::Horde)
        } else if self.bar >= PROGRESS_BAR_ALLIANCE_CONTROLLED {
            Some(Team::Alliance)
        } else {
            None
        }
    }

    pub fn set_captured(&mut self, team: Team) {
        self.owner = Some(team);
        self.state = PointState::UnderControl;
    }

    /// Returns the team that held the point.
    pub fn set_lost(&mut self) -> Option<Team> {
        self.state = PointState::Uncontrolled;
        self.owner.take()
    }

    pub fn is_controlled_by(&self, team: Team) -> bool {
        self.owner == Some(team) && self.state == PointState::UnderControl
    }

    pub fn reset(&mut self) {
        self.owner = None;
        self.state = PointState::Uncontrolled;
        self.bar = PROGRESS_BAR_START;
        self.nearby.clear();
        self.near_counts = [0, 0];
    }

    pub fn view(&self) -> CapturePointView {
        CapturePointView {
            name: POINTS[self.index].name.to_string(),
            owner: self.owner,
            state: self.state,
            bar: self.bar,
            alliance_near: self.near_count(Team::Alliance),
            horde_near: self.near_count(Team::Horde),
        }
    }
}
