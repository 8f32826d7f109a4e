//! Member side of the protocol
//!
//! A member only ever reacts to calls from the current leader. Its lifecycle:
//!
//! ```text
//! Unborn --Startup--> Active --hazard it cannot escape--> Eliminated
//!                       |  \                                  |
//!                       |   `--Promote--> Promoted <--Promote-'
//!                       `--Terminate--> GameOver
//! ```
//!
//! Unit state lives behind a single async mutex, so concurrent inbound calls
//! never evade two hazards at once or promote twice.

use crate::orchestrator::LeaderState;
use crate::transport::Service;
use async_trait::async_trait;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Fate, Hazard, Packet, Promotion, Unit, MIN_BOARD_SIZE};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unborn,
    Active,
    Eliminated,
    Promoted,
    GameOver,
}

/// What the serving surface must do after answering a call.
#[derive(Debug)]
pub enum Transition {
    Stay,
    /// Stop accepting calls; this unit has nothing more to answer.
    Retire,
    /// Stop accepting calls and start leading with this state.
    Lead(Box<LeaderState>),
}

/// Everything a member knows about itself.
#[derive(Debug)]
pub struct MemberState {
    phase: Phase,
    unit: Option<Unit>,
    rng: StdRng,
}

impl MemberState {
    pub fn new(rng: StdRng) -> Self {
        Self {
            phase: Phase::Unborn,
            unit: None,
            rng,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn unit(&self) -> Option<&Unit> {
        self.unit.as_ref()
    }

    /// Answers one call from the leader.
    pub fn apply(&mut self, request: Packet) -> (Packet, Transition) {
        match request {
            Packet::Startup { id, board_size } => (self.start(id, board_size), Transition::Stay),
            Packet::HazardNotify {
                hazard,
                time_to_impact,
            } => (self.shelter(&hazard, time_to_impact), Transition::Stay),
            Packet::StatusQuery => self.status(),
            Packet::Promote(promotion) => self.promote(promotion),
            Packet::Terminate => self.terminate(),
            other => (
                Self::reject(format!("{} is not a call", other.name())),
                Transition::Stay,
            ),
        }
    }

    fn start(&mut self, id: u32, board_size: i32) -> Packet {
        if self.phase != Phase::Unborn {
            return Self::reject(format!("already started, phase {:?}", self.phase));
        }
        if board_size < MIN_BOARD_SIZE {
            return Self::reject(format!("board size {} too small", board_size));
        }

        let unit = Unit::spawn(id, board_size, &mut self.rng);
        let position = unit.position();
        info!(
            "Unit {} placed at ({}, {}) with speed {}",
            id,
            position.x,
            position.y,
            unit.speed()
        );
        self.unit = Some(unit);
        self.phase = Phase::Active;
        Packet::Started { position }
    }

    fn shelter(&mut self, hazard: &Hazard, time_to_impact: u32) -> Packet {
        match self.phase {
            Phase::Active => {}
            Phase::Eliminated => return Packet::Ack,
            phase => return Self::reject(format!("cannot take hazards in phase {:?}", phase)),
        }
        let Some(unit) = self.unit.as_mut() else {
            return Self::reject("no unit".to_string());
        };

        debug!(
            "Unit {}: hazard kind {} at ({}, {}) lands in {}",
            unit.id(),
            hazard.kind,
            hazard.center.x,
            hazard.center.y,
            time_to_impact
        );
        match unit.take_shelter(hazard, &mut self.rng) {
            Fate::Unaffected => {}
            Fate::Evaded(to) => debug!("Unit {} moved to ({}, {})", unit.id(), to.x, to.y),
            Fate::Eliminated => {
                info!("Unit {} could not escape", unit.id());
                self.phase = Phase::Eliminated;
            }
        }
        Packet::Ack
    }

    fn status(&mut self) -> (Packet, Transition) {
        let Some(unit) = self.unit.as_ref() else {
            return (Self::reject("not started".to_string()), Transition::Stay);
        };
        let reply = Packet::Status {
            id: unit.id(),
            was_hit: !unit.is_alive(),
            position: unit.position(),
        };

        match self.phase {
            Phase::Active => (reply, Transition::Stay),
            // The leader has now heard about the hit; nothing else is owed.
            Phase::Eliminated => (reply, Transition::Retire),
            phase => (
                Self::reject(format!("no status in phase {:?}", phase)),
                Transition::Stay,
            ),
        }
    }

    fn promote(&mut self, promotion: Promotion) -> (Packet, Transition) {
        if !matches!(self.phase, Phase::Active | Phase::Eliminated) {
            return (
                Self::reject(format!("cannot lead from phase {:?}", self.phase)),
                Transition::Stay,
            );
        }
        let Some(unit) = self.unit.take() else {
            return (Self::reject("not started".to_string()), Transition::Stay);
        };

        info!(
            "Unit {} promoted to leader at elapsed {}/{} with {} members",
            unit.id(),
            promotion.elapsed_time,
            promotion.total_time,
            promotion.roster.len()
        );
        let rng = StdRng::seed_from_u64(self.rng.gen());
        let leader = LeaderState::from_promotion(unit, promotion, rng);
        self.phase = Phase::Promoted;
        (Packet::Ack, Transition::Lead(Box::new(leader)))
    }

    fn terminate(&mut self) -> (Packet, Transition) {
        match self.phase {
            Phase::Unborn | Phase::Active | Phase::Eliminated => {
                info!("Game over received");
                self.phase = Phase::GameOver;
                (Packet::Ack, Transition::Retire)
            }
            Phase::GameOver => (Packet::Ack, Transition::Stay),
            Phase::Promoted => (
                Self::reject("already leading".to_string()),
                Transition::Stay,
            ),
        }
    }

    fn reject(reason: String) -> Packet {
        warn!("Rejecting call: {}", reason);
        Packet::Rejected { reason }
    }
}

/// RPC-facing wrapper around [`MemberState`].
pub struct MemberService {
    state: Mutex<MemberState>,
    shutdown: Arc<Notify>,
    promotions: mpsc::UnboundedSender<LeaderState>,
}

impl MemberService {
    /// Returns the service together with the receiver a promotion is
    /// delivered on. `shutdown` is notified once the member has nothing more
    /// to answer.
    pub fn new(
        state: MemberState,
        shutdown: Arc<Notify>,
    ) -> (Self, mpsc::UnboundedReceiver<LeaderState>) {
        let (promotions, receiver) = mpsc::unbounded_channel();
        let service = Self {
            state: Mutex::new(state),
            shutdown,
            promotions,
        };
        (service, receiver)
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase()
    }
}

#[async_trait]
impl Service for MemberService {
    async fn handle(&self, request: Packet) -> Packet {
        let mut state = self.state.lock().await;
        let (reply, transition) = state.apply(request);

        match transition {
            Transition::Stay => {}
            Transition::Retire => self.shutdown.notify_one(),
            Transition::Lead(leader) => {
                if self.promotions.send(*leader).is_err() {
                    warn!("Promotion accepted but nobody is waiting to lead");
                }
                self.shutdown.notify_one();
            }
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Position, RosterEntry};

    fn started(seed: u64) -> MemberState {
        let mut state = MemberState::new(StdRng::seed_from_u64(seed));
        let (reply, _) = state.apply(Packet::Startup {
            id: 2,
            board_size: 5,
        });
        assert!(matches!(reply, Packet::Started { .. }));
        state
    }

    fn promotion() -> Promotion {
        Promotion {
            board_size: 5,
            total_units: 4,
            round_cadence: 1,
            total_time: 10,
            elapsed_time: 4,
            victory_ratio: 0.5,
            roster: vec![
                RosterEntry::new(1, "a:1"),
                RosterEntry::new(2, "b:2"),
                RosterEntry::new(3, "c:3"),
            ],
        }
    }

    /// Hazard covering the whole 5x5 board, so nobody can escape.
    fn inescapable() -> Hazard {
        Hazard::new(4, Position::new(2, 2))
    }

    #[test]
    fn test_startup_places_unit_on_board() {
        let state = started(1);
        assert_eq!(state.phase(), Phase::Active);
        let unit = state.unit().unwrap();
        assert_eq!(unit.id(), 2);
        assert!(shared::in_bounds(unit.position(), 5));
    }

    #[test]
    fn test_second_startup_rejected() {
        let mut state = started(1);
        let (reply, _) = state.apply(Packet::Startup {
            id: 5,
            board_size: 5,
        });
        assert!(matches!(reply, Packet::Rejected { .. }));
        assert_eq!(state.unit().unwrap().id(), 2);
    }

    #[test]
    fn test_calls_before_startup_rejected() {
        let mut state = MemberState::new(StdRng::seed_from_u64(1));
        let (status, _) = state.apply(Packet::StatusQuery);
        assert!(matches!(status, Packet::Rejected { .. }));
        let (promote, transition) = state.apply(Packet::Promote(promotion()));
        assert!(matches!(promote, Packet::Rejected { .. }));
        assert!(matches!(transition, Transition::Stay));
    }

    #[test]
    fn test_status_reports_position() {
        let mut state = started(3);
        let position = state.unit().unwrap().position();
        let (reply, transition) = state.apply(Packet::StatusQuery);
        assert_eq!(
            reply,
            Packet::Status {
                id: 2,
                was_hit: false,
                position
            }
        );
        assert!(matches!(transition, Transition::Stay));
    }

    #[test]
    fn test_hit_reported_then_retires() {
        let mut state = started(4);
        let (ack, _) = state.apply(Packet::HazardNotify {
            hazard: inescapable(),
            time_to_impact: 1,
        });
        assert_eq!(ack, Packet::Ack);
        assert_eq!(state.phase(), Phase::Eliminated);

        let (reply, transition) = state.apply(Packet::StatusQuery);
        assert!(matches!(reply, Packet::Status { was_hit: true, .. }));
        assert!(matches!(transition, Transition::Retire));
    }

    #[test]
    fn test_promotion_builds_leader_without_own_entry() {
        let mut state = started(5);
        let (reply, transition) = state.apply(Packet::Promote(promotion()));
        assert_eq!(reply, Packet::Ack);
        assert_eq!(state.phase(), Phase::Promoted);
        assert!(state.unit().is_none());

        let leader = match transition {
            Transition::Lead(leader) => leader,
            other => panic!("expected promotion, got {:?}", other),
        };
        assert_eq!(leader.unit().id(), 2);
        assert_eq!(leader.roster().ids(), vec![1, 3]);
        assert_eq!(leader.elapsed_time(), 4);
        assert_eq!(leader.settings().total_time, 10);
    }

    #[test]
    fn test_promotion_only_once() {
        let mut state = started(6);
        let _ = state.apply(Packet::Promote(promotion()));
        let (reply, transition) = state.apply(Packet::Promote(promotion()));
        assert!(matches!(reply, Packet::Rejected { .. }));
        assert!(matches!(transition, Transition::Stay));
    }

    #[test]
    fn test_terminate_ends_game() {
        let mut state = started(7);
        let (reply, transition) = state.apply(Packet::Terminate);
        assert_eq!(reply, Packet::Ack);
        assert!(matches!(transition, Transition::Retire));
        assert_eq!(state.phase(), Phase::GameOver);

        let (hazard, _) = state.apply(Packet::HazardNotify {
            hazard: inescapable(),
            time_to_impact: 1,
        });
        assert!(matches!(hazard, Packet::Rejected { .. }));
    }

    #[test]
    fn test_reply_packets_are_not_calls() {
        let mut state = started(8);
        let (reply, _) = state.apply(Packet::Ack);
        assert!(matches!(reply, Packet::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_service_hands_over_leader_state() {
        let shutdown = Arc::new(Notify::new());
        let (service, mut promotions) =
            MemberService::new(started(9), Arc::clone(&shutdown));

        let reply = service.handle(Packet::Promote(promotion())).await;
        assert_eq!(reply, Packet::Ack);
        assert_eq!(service.phase().await, Phase::Promoted);

        let leader = promotions.try_recv().unwrap();
        assert!(!leader.roster().contains(2));
        // The shutdown permit is stored even though nobody was waiting yet.
        shutdown.notified().await;
    }
}
