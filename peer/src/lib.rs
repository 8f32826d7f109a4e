//! # Shelter Peer Library
//!
//! Everything one peer of the shelter simulation runs, whichever role it
//! currently holds. A handful of peers share an N×N board; each round the
//! leader drops a hazard somewhere on it, every unit tries to step out of the
//! blast, and the leader collects who is still standing.
//!
//! ## Roles
//!
//! ### Leader
//! Exactly one peer drives the rounds. It announces the board, draws a hazard,
//! shelters its own unit, notifies every member, waits for the impact, polls
//! every member for its status and prunes the roster. When the configured
//! total time has passed it tells the remaining members the game is over.
//!
//! ### Member
//! Every other peer only answers calls: startup, hazard notifications, status
//! queries, termination and, at most once, a promotion.
//!
//! ### Hand-off
//! If the leader's own unit is eliminated while members remain, a random
//! member is promoted with a snapshot of the roster and the clock. It stops
//! serving, rebuilds leader state from that snapshot and carries on from the
//! next round. A failed promotion is fatal: there is no second attempt.
//!
//! ## Module Organization
//!
//! - `address_book`: static member endpoints for the initial leader
//! - `board`: text rendering of the board once per round
//! - `config`: game settings and their validation
//! - `error`: the crate's error type
//! - `member`: member state machine and its RPC surface
//! - `node`: role switching and the per-process driver
//! - `orchestrator`: leader state and the round loop
//! - `roster`: the leader's shrinking list of members
//! - `transport`: framed request/response calls over TCP
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use peer::node::{self, MemberNode, Role};
//! use peer::transport::TcpTransport;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Wait for a leader to call, and lead if promoted along the way.
//!     let member = MemberNode::bind("127.0.0.1:7001", StdRng::from_entropy()).await?;
//!     let outcome = node::run(
//!         Role::Member(member),
//!         TcpTransport::new(),
//!         Duration::from_secs(1),
//!     )
//!     .await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod address_book;
pub mod board;
pub mod config;
pub mod error;
pub mod member;
pub mod node;
pub mod orchestrator;
pub mod roster;
pub mod transport;

pub use error::{Error, Result};
