//! One peer process: whatever role it holds, driven until the game is over
//! for this unit.

use crate::board::TextBoard;
use crate::error::Result;
use crate::member::{MemberService, MemberState, Phase};
use crate::orchestrator::{LeaderState, Orchestrator, Outcome};
use crate::transport::{PeerServer, Transport};
use log::info;
use rand::rngs::StdRng;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// The role a peer currently holds. A member becomes a leader at most once;
/// nothing ever turns a leader back into a member.
pub enum Role {
    Member(MemberNode),
    Leader(LeaderState),
}

/// How this peer's participation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome {
    /// Stopped serving as a member (eliminated or told the game is over).
    Member(Phase),
    /// Led the simulation (possibly after a promotion) until its tenure ended.
    Leader(Outcome),
}

/// Why a member stopped serving.
#[derive(Debug)]
pub enum Served {
    Promoted(LeaderState),
    Finished(Phase),
}

/// A member's serving surface, bound but not yet serving.
pub struct MemberNode {
    server: PeerServer,
    service: Arc<MemberService>,
    shutdown: Arc<Notify>,
    promotions: mpsc::UnboundedReceiver<LeaderState>,
}

impl MemberNode {
    pub async fn bind(addr: &str, rng: StdRng) -> Result<Self> {
        let server = PeerServer::bind(addr).await?;
        let shutdown = Arc::new(Notify::new());
        let (service, promotions) = MemberService::new(MemberState::new(rng), Arc::clone(&shutdown));
        Ok(Self {
            server,
            service: Arc::new(service),
            shutdown,
            promotions,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.server.local_addr()
    }

    /// Answers calls until the member has nothing left to answer. Returns the
    /// leader state if this member was promoted.
    pub async fn serve(mut self) -> Result<Served> {
        self.server
            .serve(Arc::clone(&self.service), Arc::clone(&self.shutdown))
            .await?;

        match self.promotions.try_recv() {
            Ok(leader) => Ok(Served::Promoted(leader)),
            Err(_) => Ok(Served::Finished(self.service.phase().await)),
        }
    }
}

/// Drives `role` to completion, taking over the round loop if promoted.
/// `time_unit` is how long one simulated time unit lasts on this peer.
pub async fn run<T: Transport>(role: Role, transport: T, time_unit: Duration) -> Result<NodeOutcome> {
    let mut role = role;
    loop {
        role = match role {
            Role::Member(node) => match node.serve().await? {
                Served::Promoted(leader) => Role::Leader(leader),
                Served::Finished(phase) => {
                    info!("Member finished in phase {:?}", phase);
                    return Ok(NodeOutcome::Member(phase));
                }
            },
            Role::Leader(state) => {
                let board = TextBoard::new(state.settings().board_size);
                let mut orchestrator = Orchestrator::new(state, transport, board, time_unit);
                let outcome = orchestrator.run().await?;
                return Ok(NodeOutcome::Leader(outcome));
            }
        };
    }
}
