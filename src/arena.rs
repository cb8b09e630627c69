use crate::constants::{eye, warsong};
use crate::types::{BattlegroundKind, Position, Team};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Graveyard {
    pub id: u32,
    /// Fixed owner; `None` for graveyards that follow point ownership.
    pub team: Option<Team>,
    pub position: Position,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AreaTrigger {
    pub id: u32,
    pub position: Position,
    pub radius: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlagStand {
    /// Team owning the flag on this stand; `None` for the neutral flag.
    pub team: Option<Team>,
    pub position: Position,
}

#[derive(Clone, Debug)]
pub struct ArenaLayout {
    pub kind: BattlegroundKind,
    start_positions: [Position; 2],
    pub flag_stands: Vec<FlagStand>,
    pub triggers: Vec<AreaTrigger>,
    pub point_centers: Vec<Position>,
    pub graveyards: Vec<Graveyard>,
}

impl ArenaLayout {
    pub fn for_kind(kind: BattlegroundKind) -> Self {
        match kind {
            BattlegroundKind::WarsongGulch => warsong_layout(),
            BattlegroundKind::EyeOfTheStorm => eye_layout(),
        }
    }

    pub fn start_position(&self, team: Team) -> Position {
        self.start_positions[team.index()]
    }

    pub fn graveyard(&self, id: u32) -> Option<&Graveyard> {
        self.graveyards.iter().find(|graveyard| graveyard.id == id)
    }

    pub fn trigger(&self, id: u32) -> Option<&AreaTrigger> {
        self.triggers.iter().find(|trigger| trigger.id == id)
    }

    /// First trigger whose zone contains `position`.
    pub fn trigger_at(&self, position: &Position) -> Option<u32> {
        self.triggers
            .iter()
            .find(|trigger| trigger.position.within(position, trigger.radius))
            .map(|trigger| trigger.id)
    }

    pub fn flag_stand(&self, team: Option<Team>) -> Option<Position> {
        self.flag_stands
            .iter()
            .find(|stand| stand.team == team)
            .map(|stand| stand.position)
    }

    /// Nearest graveyard among `candidates` to `from`.
    pub fn nearest_graveyard(&self, from: &Position, candidates: &[u32]) -> Option<u32> {
        candidates
            .iter()
            .filter_map(|id| self.graveyard(*id))
            .min_by(|a, b| {
                a.position
                    .distance_sq(from)
                    .total_cmp(&b.position.distance_sq(from))
            })
            .map(|graveyard| graveyard.id)
    }
}

fn warsong_layout() -> ArenaLayout {
    let alliance_stand = Position::new(1540.423, 1481.325, 351.8284);
    let horde_stand = Position::new(916.0226, 1434.405, 345.413);
    ArenaLayout {
        kind: BattlegroundKind::WarsongGulch,
        start_positions: [
            Position::new(1523.81, 1481.76, 352.008),
            Position::new(933.331, 1433.72, 345.536),
        ],
        flag_stands: vec![
            FlagStand {
                team: Some(Team::Alliance),
                position: alliance_stand,
            },
            FlagStand {
                team: Some(Team::Horde),
                position: horde_stand,
            },
        ],
        triggers: vec![
            AreaTrigger {
                id: warsong::TRIGGER_ALLIANCE_FLAG_ROOM,
                position: alliance_stand,
                radius: warsong::CAPTURE_TRIGGER_RADIUS,
            },
            AreaTrigger {
                id: warsong::TRIGGER_HORDE_FLAG_ROOM,
                position: horde_stand,
                radius: warsong::CAPTURE_TRIGGER_RADIUS,
            },
        ],
        point_centers: Vec::new(),
        graveyards: vec![
            Graveyard {
                id: warsong::GRAVEYARD_FLAGROOM_ALLIANCE,
                team: Some(Team::Alliance),
                position: Position::new(1512.0, 1480.0, 352.0),
            },
            Graveyard {
                id: warsong::GRAVEYARD_FLAGROOM_HORDE,
                team: Some(Team::Horde),
                position: Position::new(930.0, 1431.0, 345.5),
            },
            Graveyard {
                id: warsong::GRAVEYARD_MAIN_ALLIANCE,
                team: Some(Team::Alliance),
                position: Position::new(1415.33, 1554.79, 343.156),
            },
            Graveyard {
                id: warsong::GRAVEYARD_MAIN_HORDE,
                team: Some(Team::Horde),
                position: Position::new(1029.14, 1387.49, 340.836),
            },
        ],
    }
}

fn eye_layout() -> ArenaLayout {
    let trigger_positions = [
        Position::new(2044.28, 1729.68, 1189.96),
        Position::new(2048.83, 1393.65, 1194.49),
        Position::new(2286.56, 1402.36, 1197.11),
        Position::new(2284.48, 1731.23, 1189.99),
    ];
    let triggers = eye::POINTS
        .iter()
        .zip(trigger_positions)
        .map(|(point, position)| AreaTrigger {
            id: point.trigger,
            position,
            radius: eye::CAPTURE_TRIGGER_RADIUS,
        })
        .collect();

    ArenaLayout {
        kind: BattlegroundKind::EyeOfTheStorm,
        start_positions: [
            Position::new(2498.0, 1596.0, 1244.0),
            Position::new(1807.0, 1539.0, 1267.6),
        ],
        flag_stands: vec![FlagStand {
            team: None,
            position: Position::new(2174.782, 1569.054, 1160.361),
        }],
        triggers,
        point_centers: vec![
            Position::new(2024.6, 1742.82, 1195.16),
            Position::new(2050.49, 1372.24, 1194.56),
            Position::new(2301.01, 1386.93, 1197.18),
            Position::new(2282.12, 1760.01, 1189.71),
        ],
        graveyards: vec![
            Graveyard {
                id: eye::GRAVEYARD_MAIN_ALLIANCE,
                team: Some(Team::Alliance),
                position: Position::new(2523.68, 1596.59, 1269.35),
            },
            Graveyard {
                id: eye::GRAVEYARD_MAIN_HORDE,
                team: Some(Team::Horde),
                position: Position::new(1807.74, 1539.42, 1267.63),
            },
            Graveyard {
                id: eye::GRAVEYARD_FEL_REAVER,
                team: None,
                position: Position::new(2013.06, 1677.24, 1182.13),
            },
            Graveyard {
                id: eye::GRAVEYARD_BLOOD_ELF,
                team: None,
                position: Position::new(2012.40, 1455.41, 1250.08),
            },
            Graveyard {
                id: eye::GRAVEYARD_DRAENEI_RUINS,
                team: None,
                position: Position::new(2351.79, 1455.40, 1250.08),
            },
            Graveyard {
                id: eye::GRAVEYARD_MAGE_TOWER,
                team: None,
                position: Position::new(2355.30, 1683.71, 1249.73),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warsong_triggers_sit_on_flag_stands() {
        let layout = ArenaLayout::for_kind(BattlegroundKind::WarsongGulch);
        let alliance_stand = layout.flag_stand(Some(Team::Alliance)).expect("alliance stand");
        assert_eq!(
            layout.trigger_at(&alliance_stand),
            Some(warsong::TRIGGER_ALLIANCE_FLAG_ROOM)
        );
        let far = Position::new(1200.0, 1450.0, 340.0);
        assert_eq!(layout.trigger_at(&far), None);
    }

    #[test]
    fn eye_has_one_neutral_flag_and_four_points() {
        let layout = ArenaLayout::for_kind(BattlegroundKind::EyeOfTheStorm);
        assert_eq!(layout.flag_stands.len(), 1);
        assert!(layout.flag_stand(None).is_some());
        assert_eq!(layout.point_centers.len(), eye::POINTS_MAX);
        assert_eq!(layout.triggers.len(), eye::POINTS_MAX);
        let mage_tower = layout
            .trigger(eye::TRIGGER_MAGE_TOWER_POINT)
            .expect("mage tower trigger");
        assert!(mage_tower.position.x > 2280.0);
    }

    #[test]
    fn nearest_graveyard_picks_closest_candidate() {
        let layout = ArenaLayout::for_kind(BattlegroundKind::EyeOfTheStorm);
        let near_fel_reaver = Position::new(2020.0, 1680.0, 1182.0);
        let id = layout.nearest_graveyard(
            &near_fel_reaver,
            &[eye::GRAVEYARD_MAIN_HORDE, eye::GRAVEYARD_FEL_REAVER],
        );
        assert_eq!(id, Some(eye::GRAVEYARD_FEL_REAVER));
        assert_eq!(layout.nearest_graveyard(&near_fel_reaver, &[]), None);
    }
}
