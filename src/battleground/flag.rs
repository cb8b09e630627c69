use crate::types::{FlagState, FlagView, Position, Team};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagTimerExpired {
    /// A captured flag finished its respawn wait.
    Respawn,
    /// A dropped flag lay on the ground for too long.
    DropExpired,
}

/// One capturable flag. `owner` is `None` for a neutral flag.
#[derive(Clone, Debug)]
pub struct Flag {
    owner: Option<Team>,
    state: FlagState,
    carrier: Option<String>,
    timer_ms: i64,
    ground_position: Option<Position>,
}

impl Flag {
    pub fn new(owner: Option<Team>) -> Self {
        Self {
            owner,
            state: FlagState::OnBase,
            carrier: None,
            timer_ms: 0,
            ground_position: None,
        }
    }

    pub fn state(&self) -> FlagState {
        self.state
    }

    pub fn carrier(&self) -> Option<&str> {
        self.carrier.as_deref()
    }

    pub fn is_picked_up(&self) -> bool {
        self.state == FlagState::OnPlayer
    }

    pub fn is_carried_by(&self, participant_id: &str) -> bool {
        self.carrier.as_deref() == Some(participant_id)
    }

    pub fn ground_position(&self) -> Option<Position> {
        self.ground_position
    }

    pub fn timer_ms(&self) -> i64 {
        self.timer_ms
    }

    /// Takes the flag from its stand or from the ground.
    pub fn pick_up(&mut self, carrier: &str) -> bool {
        if !matches!(self.state, FlagState::OnBase | FlagState::OnGround) {
            return false;
        }
        self.state = FlagState::OnPlayer;
        self.carrier = Some(carrier.to_string());
        self.timer_ms = 0;
        self.ground_position = None;
        true
    }

    /// Returns the former carrier.
    pub fn drop_to_ground(&mut self, drop_ms: i64, at: Position) -> Option<String> {
        if self.state != FlagState::OnPlayer {
            return None;
        }
        self.state = FlagState::OnGround;
        self.timer_ms = drop_ms;
        self.ground_position = Some(at);
        self.carrier.take()
    }

    /// Returns the capturer.
    pub fn capture(&mut self, respawn_ms: i64) -> Option<String> {
        if self.state != FlagState::OnPlayer {
            return None;
        }
        self.state = FlagState::WaitRespawn;
        self.timer_ms = respawn_ms;
        self.ground_position = None;
        self.carrier.take()
    }

    /// A dropped flag touched by its owners goes straight back to the stand.
    pub fn return_to_base(&mut self) -> bool {
        if self.state != FlagState::OnGround {
            return false;
        }
        self.respawn();
        true
    }

    /// Puts the flag back on its stand from any state.
    pub fn respawn(&mut self) -> Option<String> {
        self.state = FlagState::OnBase;
        self.timer_ms = 0;
        self.ground_position = None;
        self.carrier.take()
    }

    /// Counts down the respawn or drop timer. The timer fires once it goes
    /// below zero; the caller decides what the expiry means.
    pub fn tick(&mut self, diff_ms: u64) -> Option<FlagTimerExpired> {
        let expired = match self.state {
            FlagState::WaitRespawn => FlagTimerExpired::Respawn,
            FlagState::OnGround => FlagTimerExpired::DropExpired,
            FlagState::OnBase | FlagState::OnPlayer => return None,
        };
        self.timer_ms -= diff_ms as i64;
        if self.timer_ms < 0 {
            self.timer_ms = 0;
            return Some(expired);
        }
        None
    }

    pub fn view(&self) -> FlagView {
        FlagView {
            team: self.owner,
            state: self.state,
            carrier: self.carrier.clone(),
            ground_position: self.ground_position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_carried_flag() -> Flag {
        let mut flag = Flag::new(Some(Team::Horde));
        assert!(flag.pick_up("a1"));
        flag
    }

    #[test]
    fn carrier_exists_only_while_on_player() {
        let mut flag = make_carried_flag();
        assert!(flag.is_picked_up());
        assert!(flag.is_carried_by("a1"));

        let dropped_by = flag.drop_to_ground(10_000, Position::new(1.0, 1.0, 0.0));
        assert_eq!(dropped_by.as_deref(), Some("a1"));
        assert_eq!(flag.state(), FlagState::OnGround);
        assert_eq!(flag.carrier(), None);
        assert_eq!(flag.ground_position(), Some(Position::new(1.0, 1.0, 0.0)));

        assert!(flag.pick_up("a2"));
        assert_eq!(flag.carrier(), Some("a2"));
        assert_eq!(flag.ground_position(), None);
    }

    #[test]
    fn carried_flag_cannot_be_taken_again() {
        let mut flag = make_carried_flag();
        assert!(!flag.pick_up("h1"));
        assert_eq!(flag.carrier(), Some("a1"));
    }

    #[test]
    fn capture_arms_respawn_timer() {
        let mut flag = make_carried_flag();
        assert_eq!(flag.capture(23_000).as_deref(), Some("a1"));
        assert_eq!(flag.state(), FlagState::WaitRespawn);
        assert!(!flag.pick_up("a1"));

        assert_eq!(flag.tick(23_000), None);
        assert_eq!(flag.timer_ms(), 0);
        assert_eq!(flag.tick(1), Some(FlagTimerExpired::Respawn));
        // expiry leaves the state to the caller
        assert_eq!(flag.state(), FlagState::WaitRespawn);
        flag.respawn();
        assert_eq!(flag.state(), FlagState::OnBase);
    }

    #[test]
    fn drop_timer_expires_below_zero() {
        let mut flag = make_carried_flag();
        flag.drop_to_ground(100, Position::default());
        assert_eq!(flag.tick(50), None);
        assert_eq!(flag.tick(60), Some(FlagTimerExpired::DropExpired));
    }

    #[test]
    fn idle_flags_do_not_tick() {
        let mut flag = Flag::new(None);
        assert_eq!(flag.tick(1_000_000), None);
        flag.pick_up("x");
        assert_eq!(flag.tick(1_000_000), None);
    }

    #[test]
    fn only_ground_flags_can_be_returned() {
        let mut flag = make_carried_flag();
        assert!(!flag.return_to_base());
        flag.drop_to_ground(10_000, Position::default());
        assert!(flag.return_to_base());
        assert_eq!(flag.state(), FlagState::OnBase);
        assert_eq!(flag.timer_ms(), 0);
    }

    #[test]
    fn capture_and_drop_require_a_carrier() {
        let mut flag = Flag::new(Some(Team::Alliance));
        assert_eq!(flag.capture(1), None);
        assert_eq!(flag.drop_to_ground(1, Position::default()), None);
        assert_eq!(flag.state(), FlagState::OnBase);
    }
}
