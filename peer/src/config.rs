//! Simulation parameters shared by whoever currently leads.

use crate::error::{Error, Result};
use shared::{Promotion, MIN_BOARD_SIZE, MIN_UNITS};
use std::time::Duration;

/// Parameters fixed for the lifetime of a simulation.
///
/// Times are counted in abstract units; each process decides locally how long
/// one unit lasts (see `--tick-ms`).
#[derive(Debug, Clone, PartialEq)]
pub struct GameSettings {
    /// Side length of the square board.
    pub board_size: i32,
    /// Units at the start of the simulation, leader included.
    pub total_units: usize,
    /// Time units between hazards.
    pub round_cadence: u32,
    /// Time units the simulation lasts.
    pub total_time: u32,
    /// Fraction of `total_units` that must survive for the game to count as won.
    pub victory_ratio: f64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            board_size: 10,
            total_units: 4,
            round_cadence: 1,
            total_time: 10,
            victory_ratio: 0.5,
        }
    }
}

impl GameSettings {
    /// Rebuilds the settings carried in a promotion snapshot.
    pub fn from_promotion(promotion: &Promotion) -> Self {
        Self {
            board_size: promotion.board_size,
            total_units: promotion.total_units,
            round_cadence: promotion.round_cadence,
            total_time: promotion.total_time,
            victory_ratio: promotion.victory_ratio,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.board_size < MIN_BOARD_SIZE {
            return Err(Error::InvalidConfiguration(format!(
                "board size must be at least {}, got {}",
                MIN_BOARD_SIZE, self.board_size
            )));
        }
        if self.total_units < MIN_UNITS {
            return Err(Error::InvalidConfiguration(format!(
                "number of units must be at least {}, got {}",
                MIN_UNITS, self.total_units
            )));
        }
        if self.round_cadence == 0 {
            return Err(Error::InvalidConfiguration(
                "round cadence must be positive".to_string(),
            ));
        }
        if self.round_cadence > self.total_time {
            return Err(Error::InvalidConfiguration(format!(
                "total time ({}) must not be shorter than the round cadence ({})",
                self.total_time, self.round_cadence
            )));
        }
        if !(0.0..=1.0).contains(&self.victory_ratio) {
            return Err(Error::InvalidConfiguration(format!(
                "victory ratio must lie in [0, 1], got {}",
                self.victory_ratio
            )));
        }
        Ok(())
    }

    /// Wall-clock wait between a hazard announcement and its impact when one
    /// time unit lasts `time_unit`.
    pub fn impact_wait(&self, time_unit: Duration) -> Result<Duration> {
        time_unit.checked_mul(self.round_cadence).ok_or_else(|| {
            Error::InvalidConfiguration(format!(
                "{} time units of {:?} overflow the impact wait",
                self.round_cadence, time_unit
            ))
        })
    }

    /// Survivors (leader included) needed at the end to declare victory.
    pub fn required_survivors(&self) -> usize {
        (self.victory_ratio * self.total_units as f64).ceil() as usize
    }
}
