//! Per-unit state and the local hazard-evasion search.

use crate::{in_blast_radius, in_bounds, Hazard, Position, MAX_SPEED};
use rand::seq::SliceRandom;
use rand::Rng;

/// The eight compass directions a unit may flee along.
pub const DIRECTIONS: [(i32, i32); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

/// What happened to a unit when a hazard landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fate {
    /// The unit was outside the blast radius.
    Unaffected,
    /// The unit moved to a safe cell.
    Evaded(Position),
    /// The unit could not escape (or was already gone).
    Eliminated,
}

/// One simulated entity, independent of the role its peer currently holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    id: u32,
    board_size: i32,
    position: Position,
    speed: i32,
    alive: bool,
}

impl Unit {
    /// Places a new unit uniformly on the board with a random speed in
    /// `[0, MAX_SPEED]`.
    pub fn spawn<R: Rng + ?Sized>(id: u32, board_size: i32, rng: &mut R) -> Self {
        let position = Position::new(rng.gen_range(0..board_size), rng.gen_range(0..board_size));
        let speed = rng.gen_range(0..=MAX_SPEED);
        Self::with_state(id, board_size, position, speed)
    }

    /// Builds a unit at a known position. Out-of-range values are clamped so
    /// the board invariant holds.
    pub fn with_state(id: u32, board_size: i32, position: Position, speed: i32) -> Self {
        let last = board_size - 1;
        Self {
            id,
            board_size,
            position: Position::new(position.x.clamp(0, last), position.y.clamp(0, last)),
            speed: speed.clamp(0, MAX_SPEED),
            alive: true,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Last position of the unit. Stale once the unit has been eliminated.
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn speed(&self) -> i32 {
        self.speed
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn in_danger(&self, hazard: &Hazard) -> bool {
        in_blast_radius(self.position, hazard.kind, hazard.center, self.board_size)
    }

    /// Reacts to `hazard`: stays put when out of range, otherwise tries the
    /// eight neighbouring destinations (at up to full speed) in a fresh
    /// random order and takes the first one outside the blast.
    pub fn take_shelter<R: Rng + ?Sized>(&mut self, hazard: &Hazard, rng: &mut R) -> Fate {
        if !self.alive {
            return Fate::Eliminated;
        }
        if !self.in_danger(hazard) {
            return Fate::Unaffected;
        }
        if self.speed == 0 {
            self.alive = false;
            return Fate::Eliminated;
        }

        let mut directions = DIRECTIONS;
        directions.shuffle(rng);

        for direction in directions {
            let Some(candidate) = self.destination(direction) else {
                continue;
            };
            if !in_blast_radius(candidate, hazard.kind, hazard.center, self.board_size) {
                self.position = candidate;
                self.alive = true;
                return Fate::Evaded(candidate);
            }
        }

        self.alive = false;
        Fate::Eliminated
    }

    /// Where a full-effort move along `direction` ends up, if anywhere.
    ///
    /// Axis-aligned moves clamp into the board. Diagonal moves must cover the
    /// same number of steps on both axes, so they shrink the step count
    /// instead of clamping and give up when not even one step fits.
    fn destination(&self, (dx, dy): (i32, i32)) -> Option<Position> {
        let last = self.board_size - 1;
        if dx == 0 || dy == 0 {
            let target = self.position.offset((dx, dy), self.speed);
            return Some(Position::new(target.x.clamp(0, last), target.y.clamp(0, last)));
        }

        (1..=self.speed)
            .rev()
            .map(|steps| self.position.offset((dx, dy), steps))
            .find(|target| in_bounds(*target, self.board_size))
    }
}
