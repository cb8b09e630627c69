use crate::types::{BattlegroundKind, Position};

/// Small deterministic generator so that bot decisions replay identically for a seed.
#[derive(Clone, Debug)]
pub struct Rng {
    state: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn for_match(kind: BattlegroundKind, instance_id: u32, seed: u32) -> Self {
        let salt = (kind.type_id() as u32).wrapping_mul(0x9e37_79b9);
        Self::new(seed ^ salt ^ instance_id.rotate_left(16))
    }

    pub fn next_f32(&mut self) -> f32 {
        self.state = self.state.wrapping_add(0x6d2b_79f5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        let out = t ^ (t >> 14);
        (out as f64 / 4_294_967_296.0) as f32
    }

    /// Inclusive range.
    pub fn int(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = (max - min + 1) as f32;
        min + (self.next_f32() * span).floor() as i32
    }

    pub fn bool(&mut self, probability: f32) -> bool {
        self.next_f32() < probability
    }

    pub fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        (self.next_f32() * len as f32).floor().min((len - 1) as f32) as usize
    }

    /// Random point on the horizontal plane within `radius` of `center`.
    pub fn scatter(&mut self, center: Position, radius: f32) -> Position {
        let angle = self.next_f32() * std::f32::consts::TAU;
        let dist = self.next_f32() * radius;
        Position::new(
            center.x + angle.cos() * dist,
            center.y + angle.sin() * dist,
            center.z,
        )
    }
}
