use std::collections::HashSet;

use tracing::debug;

use crate::arena::ArenaLayout;
use crate::battleground::Battleground;
use crate::rng::Rng;
use crate::types::{FlagState, FlagView, MatchStatus, ObjectiveView, Position, Team};

const THINK_MIN_MS: i32 = 300;
const THINK_MAX_MS: i32 = 800;
/// Slightly inside the rule sets' click range so a clicking bot is never short.
const CLICK_REACH: f32 = 8.0;
const ARRIVE_DISTANCE: f32 = 0.5;
const TAKEDOWN_RANGE: f32 = 5.0;
const TAKEDOWN_CHANCE: f32 = 0.02;
const ESCORT_RADIUS: f32 = 20.0;
const POINT_SPREAD: f32 = 15.0;
const FLAG_RUNNER_CHANCE: f32 = 0.25;

/// Drives every bot of a match toward its objective. Decisions come from
/// the director's own `Rng`, so a seed replays the same match.
#[derive(Debug)]
pub struct BotDirector {
    rng: Rng,
    clock_ms: u64,
    released: HashSet<String>,
}

impl BotDirector {
    pub fn new(rng: Rng) -> Self {
        Self {
            rng,
            clock_ms: 0,
            released: HashSet::new(),
        }
    }

    pub fn update(&mut self, battleground: &mut Battleground, diff_ms: u64) {
        self.clock_ms += diff_ms;
        if battleground.status() != MatchStatus::Running {
            return;
        }
        let bots: Vec<String> = battleground
            .participants()
            .filter(|participant| participant.is_bot())
            .map(|participant| participant.id.clone())
            .collect();
        self.released.retain(|id| bots.contains(id));
        for id in bots {
            self.drive(battleground, &id, diff_ms);
        }
    }

    fn drive(&mut self, battleground: &mut Battleground, id: &str, diff_ms: u64) {
        let Some(bot) = battleground.participant(id) else {
            return;
        };
        let team = bot.team;
        let position = bot.position();

        if !bot.is_alive() {
            if self.released.insert(id.to_string()) {
                let graveyard = battleground.release_spirit(id).ok().flatten();
                debug!(bot = id, ?graveyard, "bot released spirit");
            }
            return;
        }
        self.released.remove(id);

        let think = battleground
            .bot_steering(id)
            .is_some_and(|steering| steering.think_at_ms <= self.clock_ms);
        if think {
            let target = self.plan(battleground, id, team);
            let think_at_ms = self.clock_ms + self.rng.int(THINK_MIN_MS, THINK_MAX_MS) as u64;
            if let Some(steering) = battleground.bot_steering(id) {
                steering.target = target;
                steering.think_at_ms = think_at_ms;
            }
        }

        let Some((target, speed)) = battleground
            .bot_steering(id)
            .and_then(|steering| steering.target.map(|target| (target, steering.speed)))
        else {
            return;
        };
        let next = step_toward(position, target, speed * diff_ms as f32 / 1000.0);
        if battleground.move_participant(id, next).is_err() {
            return;
        }
        self.act(battleground, id, team, next);
    }

    fn plan(&mut self, battleground: &Battleground, id: &str, team: Team) -> Option<Position> {
        let layout = battleground.layout();
        let carrier_position = |flag: &FlagView| {
            flag.carrier
                .as_deref()
                .and_then(|carrier| battleground.participant(carrier))
                .map(|carrier| carrier.position())
        };

        match battleground.objective() {
            ObjectiveView::CaptureTheFlag { flags, .. } => {
                let enemy = team.other();
                let theirs = flags.iter().find(|flag| flag.team == Some(enemy))?;
                let ours = flags.iter().find(|flag| flag.team == Some(team))?;
                let home = layout.flag_stand(Some(team))?;

                if theirs.carrier.as_deref() == Some(id) {
                    return Some(home);
                }
                match ours.state {
                    FlagState::OnGround => return ours.ground_position,
                    FlagState::OnPlayer => return carrier_position(ours),
                    FlagState::OnBase | FlagState::WaitRespawn => {}
                }
                match theirs.state {
                    FlagState::OnBase => layout.flag_stand(Some(enemy)),
                    FlagState::OnGround => theirs.ground_position,
                    FlagState::OnPlayer => carrier_position(theirs)
                        .map(|carrier| self.rng.scatter(carrier, ESCORT_RADIUS)),
                    FlagState::WaitRespawn => Some(self.rng.scatter(home, ESCORT_RADIUS)),
                }
            }
            ObjectiveView::TerritoryControl { flag, points } => {
                let centers = layout.point_centers.iter().zip(&points);
                if flag.carrier.as_deref() == Some(id) {
                    let owned: Vec<Position> = centers
                        .filter(|(_, point)| point.owner == Some(team))
                        .map(|(center, _)| *center)
                        .collect();
                    return nearest(&owned, &battleground.participant(id)?.position());
                }

                let open: Vec<Position> = centers
                    .filter(|(_, point)| point.owner != Some(team))
                    .map(|(center, _)| *center)
                    .collect();
                let position = battleground.participant(id)?.position();
                let wants_flag = open.is_empty() || self.rng.bool(FLAG_RUNNER_CHANCE);
                if !wants_flag {
                    let center = nearest(&open, &position)?;
                    return Some(self.rng.scatter(center, POINT_SPREAD));
                }
                match flag.state {
                    FlagState::OnBase => layout.flag_stand(None),
                    FlagState::OnGround => flag.ground_position,
                    FlagState::OnPlayer => carrier_position(&flag),
                    FlagState::WaitRespawn => nearest(&open, &position)
                        .or_else(|| Some(layout.start_position(team))),
                }
            }
        }
    }

    /// Interactions available where the bot now stands.
    fn act(&mut self, battleground: &mut Battleground, id: &str, team: Team, position: Position) {
        let flags = match battleground.objective() {
            ObjectiveView::CaptureTheFlag { flags, .. } => flags,
            ObjectiveView::TerritoryControl { flag, .. } => vec![flag],
        };

        if flags.iter().any(|flag| flag.carrier.as_deref() == Some(id)) {
            if let Some(trigger) = battleground.layout().trigger_at(&position) {
                let _ = battleground.handle_area_trigger(id, trigger);
            }
            return;
        }

        for flag in &flags {
            if let Some(carrier) = flag.carrier.as_deref() {
                let takedown = battleground.participant(carrier).is_some_and(|carrier| {
                    carrier.team != team && carrier.position().within(&position, TAKEDOWN_RANGE)
                });
                if takedown && self.rng.bool(TAKEDOWN_CHANCE) {
                    debug!(bot = id, carrier, "bot took down flag carrier");
                    let _ = battleground.handle_kill(carrier, Some(id));
                }
                continue;
            }
            let reachable = flag_location(battleground.layout(), flag)
                .is_some_and(|location| location.within(&position, CLICK_REACH));
            if reachable {
                let _ = battleground.click_flag(id, flag.team);
            }
        }
    }
}

/// Where an uncarried flag can be clicked.
fn flag_location(layout: &ArenaLayout, flag: &FlagView) -> Option<Position> {
    match flag.state {
        FlagState::OnBase => layout.flag_stand(flag.team),
        FlagState::OnGround => flag.ground_position,
        FlagState::OnPlayer | FlagState::WaitRespawn => None,
    }
}

fn nearest(candidates: &[Position], from: &Position) -> Option<Position> {
    candidates
        .iter()
        .min_by(|a, b| a.distance_sq(from).total_cmp(&b.distance_sq(from)))
        .copied()
}

fn step_toward(from: Position, to: Position, max_step: f32) -> Position {
    let distance = from.distance(&to);
    if distance <= max_step.max(ARRIVE_DISTANCE) {
        return to;
    }
    let t = max_step / distance;
    Position::new(
        from.x + (to.x - from.x) * t,
        from.y + (to.y - from.y) * t,
        from.z + (to.z - from.z) * t,
    )
}
