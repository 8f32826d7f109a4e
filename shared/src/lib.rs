//! Types shared by every peer in the shelter simulation: the wire protocol,
//! board geometry and per-unit state with its evasion search.

use serde::{Deserialize, Serialize};

pub mod geometry;
pub mod unit;

pub use geometry::{in_blast_radius, in_bounds};
pub use unit::{Fate, Unit};

/// Highest speed a unit can be created with.
pub const MAX_SPEED: i32 = 4;
/// Smallest side length accepted for the board.
pub const MIN_BOARD_SIZE: i32 = 5;
/// Smallest simulation: the leader plus one member.
pub const MIN_UNITS: usize = 2;
/// Hazard kinds are drawn from `1..=MAX_HAZARD_KIND`.
pub const MAX_HAZARD_KIND: u8 = 4;
/// Id held by the process-designated initial leader.
pub const LEADER_ID: u32 = 0;

/// A cell on the square board.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Moves `steps` cells along the direction `(dx, dy)`.
    pub fn offset(self, (dx, dy): (i32, i32), steps: i32) -> Self {
        Self {
            x: self.x + dx * steps,
            y: self.y + dy * steps,
        }
    }

    /// Number of king moves between the two cells.
    pub fn chebyshev_distance(self, other: Position) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

/// An area-effect event announced by the leader once per round.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Hazard {
    pub kind: u8,
    pub center: Position,
}

impl Hazard {
    pub fn new(kind: u8, center: Position) -> Self {
        Self { kind, center }
    }

    pub fn covers(&self, point: Position, board_size: i32) -> bool {
        in_blast_radius(point, self.kind, self.center, board_size)
    }
}

/// The leader's view of one member that is still in play.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub id: u32,
    pub address: String,
    pub last_known_position: Option<Position>,
}

impl RosterEntry {
    pub fn new(id: u32, address: impl Into<String>) -> Self {
        Self {
            id,
            address: address.into(),
            last_known_position: None,
        }
    }
}

/// Everything a member needs to take over the round loop.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Promotion {
    pub board_size: i32,
    pub total_units: usize,
    pub round_cadence: u32,
    pub total_time: u32,
    pub elapsed_time: u32,
    pub victory_ratio: f64,
    pub roster: Vec<RosterEntry>,
}

/// Messages exchanged between the leader and its members.
///
/// Every call is a single request packet answered by a single reply packet.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    // Leader -> member
    Startup {
        id: u32,
        board_size: i32,
    },
    HazardNotify {
        hazard: Hazard,
        time_to_impact: u32,
    },
    StatusQuery,
    Promote(Promotion),
    Terminate,

    // Member -> leader
    Started {
        position: Position,
    },
    Status {
        id: u32,
        was_hit: bool,
        position: Position,
    },
    Ack,
    Rejected {
        reason: String,
    },
}

impl Packet {
    pub fn to_bytes(&self) -> bincode::Result<Vec<u8>> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> bincode::Result<Self> {
        bincode::deserialize(bytes)
    }

    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Packet::Startup { .. } => "Startup",
            Packet::HazardNotify { .. } => "HazardNotify",
            Packet::StatusQuery => "StatusQuery",
            Packet::Promote(_) => "Promote",
            Packet::Terminate => "Terminate",
            Packet::Started { .. } => "Started",
            Packet::Status { .. } => "Status",
            Packet::Ack => "Ack",
            Packet::Rejected { .. } => "Rejected",
        }
    }
}
