//! Leader-side round loop
//!
//! The leader drives the simulation one round at a time, strictly in order:
//!
//! 1. Announce the board to every member (once, before the first round)
//! 2. Draw a hazard, shelter its own unit, notify every member
//! 3. Wait for the time to impact
//! 4. Poll every member for its status and update the roster
//! 5. Render the board and decide the round's outcome
//!
//! Every call is awaited before the next one is made and members are visited
//! in roster order. A member that cannot be reached is treated exactly like a
//! member that was hit: it is dropped and never called again.
//!
//! When the leader's own unit is eliminated and members remain, one of them is
//! picked at random and promoted with a snapshot of the roster. That is the end
//! of this leader's tenure; the successor resumes at the next round.

use crate::board::Renderer;
use crate::config::GameSettings;
use crate::error::{Error, Result};
use crate::roster::Roster;
use crate::transport::Transport;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::Rng;
use shared::{Fate, Hazard, Packet, Position, Promotion, RosterEntry, Unit, MAX_HAZARD_KIND};
use std::time::Duration;

/// How a leader's tenure ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The leader survived until the total time ran out.
    Finished { survivors: usize, victory: bool },
    /// The leader was eliminated and promoted `successor`.
    HandedOff { successor: u32 },
    /// The leader was eliminated with nobody left to take over.
    NoSurvivors,
}

/// Everything a leader carries from round to round.
#[derive(Debug)]
pub struct LeaderState {
    unit: Unit,
    roster: Roster,
    settings: GameSettings,
    elapsed_time: u32,
    announced: bool,
    rng: StdRng,
}

impl LeaderState {
    /// State for the process-designated initial leader. Members have not been
    /// announced yet.
    pub fn new(unit: Unit, roster: Vec<RosterEntry>, settings: GameSettings, rng: StdRng) -> Self {
        Self {
            unit,
            roster: Roster::new(roster),
            settings,
            elapsed_time: 0,
            announced: false,
            rng,
        }
    }

    /// State rebuilt by a promoted member from the snapshot it was sent.
    /// Any entry naming the member itself is discarded.
    pub fn from_promotion(unit: Unit, promotion: Promotion, rng: StdRng) -> Self {
        let settings = GameSettings::from_promotion(&promotion);
        let own_id = unit.id();
        let roster = promotion
            .roster
            .into_iter()
            .filter(|e| e.id != own_id)
            .collect();
        Self {
            unit,
            roster: Roster::new(roster),
            settings,
            elapsed_time: promotion.elapsed_time,
            announced: true,
            rng,
        }
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn elapsed_time(&self) -> u32 {
        self.elapsed_time
    }

    /// Draws a hazard: kind uniform over `1..=4`, centre uniform over the board.
    pub fn next_hazard(&mut self) -> Hazard {
        let size = self.settings.board_size;
        let kind = self.rng.gen_range(1..=MAX_HAZARD_KIND);
        let center = Position::new(self.rng.gen_range(0..size), self.rng.gen_range(0..size));
        Hazard::new(kind, center)
    }

    fn shelter(&mut self, hazard: &Hazard) -> Fate {
        self.unit.take_shelter(hazard, &mut self.rng)
    }

    /// Snapshot handed to `successor`, which is left out of its own roster.
    pub fn promotion_for(&self, successor: u32) -> Promotion {
        Promotion {
            board_size: self.settings.board_size,
            total_units: self.settings.total_units,
            round_cadence: self.settings.round_cadence,
            total_time: self.settings.total_time,
            elapsed_time: self.elapsed_time,
            victory_ratio: self.settings.victory_ratio,
            roster: self.roster.snapshot_excluding(successor),
        }
    }
}

/// Drives rounds for one leader tenure.
pub struct Orchestrator<T, R> {
    state: LeaderState,
    transport: T,
    renderer: R,
    time_unit: Duration,
}

impl<T: Transport, R: Renderer> Orchestrator<T, R> {
    /// `time_unit` is the wall-clock length of one simulated time unit.
    pub fn new(state: LeaderState, transport: T, renderer: R, time_unit: Duration) -> Self {
        Self {
            state,
            transport,
            renderer,
            time_unit,
        }
    }

    pub fn state(&self) -> &LeaderState {
        &self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Runs rounds until this tenure ends.
    pub async fn run(&mut self) -> Result<Outcome> {
        info!(
            "Unit {} leading: {} members, elapsed {}/{}",
            self.state.unit.id(),
            self.state.roster.len(),
            self.state.elapsed_time,
            self.state.settings.total_time
        );

        if !self.state.announced {
            self.announce().await;
        }

        // A successor can inherit a clock that has already run out.
        if self.state.elapsed_time >= self.state.settings.total_time {
            if let Some(outcome) = self.evaluate().await? {
                info!("Tenure of unit {} ended: {:?}", self.state.unit.id(), outcome);
                return Ok(outcome);
            }
        }

        loop {
            let hazard = self.state.next_hazard();
            if let Some(outcome) = self.play_round(hazard).await? {
                info!("Tenure of unit {} ended: {:?}", self.state.unit.id(), outcome);
                return Ok(outcome);
            }
        }
    }

    /// Tells every member the board size and its id, recording where each
    /// one placed itself. Only ever runs once per simulation.
    pub async fn announce(&mut self) {
        let board_size = self.state.settings.board_size;
        for (id, address) in self.state.roster.endpoints() {
            match self
                .transport
                .call(&address, Packet::Startup { id, board_size })
                .await
            {
                Ok(Packet::Started { position }) => {
                    debug!("Unit {} started at ({}, {})", id, position.x, position.y);
                    self.state.roster.update_position(id, position);
                }
                Ok(other) => {
                    warn!("Unit {} answered Startup with {}", id, other.name());
                    self.state.roster.remove(id);
                }
                Err(e) => {
                    warn!("Unit {} did not start: {}", id, e);
                    self.state.roster.remove(id);
                }
            }
        }
        self.state.announced = true;
    }

    /// Plays one round with the given hazard. Returns the outcome if this
    /// round ended the tenure.
    pub async fn play_round(&mut self, hazard: Hazard) -> Result<Option<Outcome>> {
        let cadence = self.state.settings.round_cadence;
        let impact_wait = self.state.settings.impact_wait(self.time_unit)?;
        debug!(
            "Hazard kind {} at ({}, {})",
            hazard.kind, hazard.center.x, hazard.center.y
        );

        match self.state.shelter(&hazard) {
            Fate::Evaded(to) => debug!("Leader moved to ({}, {})", to.x, to.y),
            Fate::Eliminated => info!("Leader {} was hit", self.state.unit.id()),
            Fate::Unaffected => {}
        }

        self.notify_hazard(hazard, cadence).await;
        tokio::time::sleep(impact_wait).await;
        self.collect_status().await;

        self.renderer.render(
            self.state.roster.entries(),
            &hazard,
            self.state.unit.position(),
        );

        self.state.elapsed_time = self.state.elapsed_time.saturating_add(cadence);
        self.evaluate().await
    }

    async fn notify_hazard(&mut self, hazard: Hazard, time_to_impact: u32) {
        for (id, address) in self.state.roster.endpoints() {
            let request = Packet::HazardNotify {
                hazard,
                time_to_impact,
            };
            match self.transport.call(&address, request).await {
                Ok(Packet::Ack) => {}
                Ok(other) => {
                    warn!("Unit {} answered HazardNotify with {}", id, other.name());
                    self.state.roster.remove(id);
                }
                Err(e) => {
                    warn!("Unit {} missed the hazard: {}", id, e);
                    self.state.roster.remove(id);
                }
            }
        }
    }

    async fn collect_status(&mut self) {
        for (id, address) in self.state.roster.endpoints() {
            match self.transport.call(&address, Packet::StatusQuery).await {
                Ok(Packet::Status {
                    was_hit: true, ..
                }) => {
                    info!("Unit {} was hit", id);
                    self.state.roster.remove(id);
                }
                Ok(Packet::Status { position, .. }) => {
                    self.state.roster.update_position(id, position);
                }
                Ok(other) => {
                    warn!("Unit {} answered StatusQuery with {}", id, other.name());
                    self.state.roster.remove(id);
                }
                Err(e) => {
                    warn!("Unit {} is gone: {}", id, e);
                    self.state.roster.remove(id);
                }
            }
        }
    }

    async fn evaluate(&mut self) -> Result<Option<Outcome>> {
        if !self.state.unit.is_alive() {
            if self.state.roster.is_empty() {
                info!("Leader eliminated with no members left");
                return Ok(Some(Outcome::NoSurvivors));
            }
            let successor = self.hand_off().await?;
            return Ok(Some(Outcome::HandedOff { successor }));
        }

        if self.state.elapsed_time >= self.state.settings.total_time {
            self.terminate_all().await;
            let survivors = self.state.roster.len() + 1;
            let victory = survivors >= self.state.settings.required_survivors();
            info!(
                "Game over: {} of {} units survived, {}",
                survivors,
                self.state.settings.total_units,
                if victory { "won" } else { "lost" }
            );
            return Ok(Some(Outcome::Finished { survivors, victory }));
        }

        Ok(None)
    }

    /// Promotes a random member. Fails with [`Error::UndefinedOutcome`] if the
    /// promotion does not go through; there is no second attempt.
    async fn hand_off(&mut self) -> Result<u32> {
        let successor = match self.state.roster.choose(&mut self.state.rng) {
            Some(entry) => entry.clone(),
            None => {
                return Err(Error::UndefinedOutcome {
                    successor: 0,
                    address: String::new(),
                    reason: "no member to promote".to_string(),
                })
            }
        };
        let promotion = self.state.promotion_for(successor.id);
        info!(
            "Handing leadership to unit {} at {} ({} members follow)",
            successor.id,
            successor.address,
            promotion.roster.len()
        );

        let reason = match self
            .transport
            .call(&successor.address, Packet::Promote(promotion))
            .await
        {
            Ok(Packet::Ack) => return Ok(successor.id),
            Ok(other) => format!("answered Promote with {}", other.name()),
            Err(e) => e.to_string(),
        };

        error!("Hand-off to unit {} failed: {}", successor.id, reason);
        Err(Error::UndefinedOutcome {
            successor: successor.id,
            address: successor.address,
            reason,
        })
    }

    async fn terminate_all(&mut self) {
        for (id, address) in self.state.roster.endpoints() {
            match self.transport.call(&address, Packet::Terminate).await {
                Ok(Packet::Ack) => debug!("Unit {} terminated", id),
                Ok(other) => warn!("Unit {} answered Terminate with {}", id, other.name()),
                Err(e) => warn!("Unit {} not told about game end: {}", id, e),
            }
        }
    }
}
