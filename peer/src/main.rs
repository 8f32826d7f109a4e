use clap::Parser;
use log::{error, info};
use peer::address_book::AddressBook;
use peer::config::GameSettings;
use peer::node::{self, MemberNode, Role};
use peer::orchestrator::LeaderState;
use peer::transport::TcpTransport;
use peer::Error;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{Unit, LEADER_ID};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run as the initial leader
    #[arg(long)]
    leader: bool,

    /// Size of the board (NxN), leader only
    #[arg(short = 'N', long)]
    board_size: Option<i32>,

    /// Number of units including the leader, leader only
    #[arg(short = 'M', long)]
    units: Option<usize>,

    /// Time units between hazards, leader only
    #[arg(short = 't', long)]
    cadence: Option<u32>,

    /// Total game time in time units, leader only
    #[arg(short = 'T', long)]
    total_time: Option<u32>,

    /// Address to listen on, member only
    #[arg(long)]
    addr: Option<String>,

    /// Address book with one member host:port per line
    #[arg(long, default_value = "peers.txt")]
    peers: String,

    /// Length of one time unit in milliseconds
    #[arg(long, default_value = "1000")]
    tick_ms: u64,

    /// Fraction of the units that must survive to win
    #[arg(long, default_value = "0.5")]
    victory_ratio: f64,

    /// Seed for the random source (random if omitted)
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn settings(&self) -> Result<GameSettings, Error> {
        let missing = |flag: &str| Error::InvalidConfiguration(format!("{} is required for the leader", flag));
        let settings = GameSettings {
            board_size: self.board_size.ok_or_else(|| missing("-N"))?,
            total_units: self.units.ok_or_else(|| missing("-M"))?,
            round_cadence: self.cadence.ok_or_else(|| missing("-t"))?,
            total_time: self.total_time.ok_or_else(|| missing("-T"))?,
            victory_ratio: self.victory_ratio,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let mut rng = args.rng();
    let time_unit = Duration::from_millis(args.tick_ms);

    let role = if args.leader {
        let settings = args.settings()?;
        settings.impact_wait(time_unit)?;
        let roster = AddressBook::load(&args.peers)?.roster_for(settings.total_units)?;
        info!(
            "Leading {} members on a {}x{} board for {} time units",
            roster.len(),
            settings.board_size,
            settings.board_size,
            settings.total_time
        );
        let unit = Unit::spawn(LEADER_ID, settings.board_size, &mut rng);
        Role::Leader(LeaderState::new(unit, roster, settings, rng))
    } else {
        let addr = args
            .addr
            .as_deref()
            .ok_or_else(|| Error::InvalidConfiguration("--addr is required for members".to_string()))?;
        Role::Member(MemberNode::bind(addr, rng).await?)
    };

    match node::run(role, TcpTransport::new(), time_unit).await {
        Ok(outcome) => {
            info!("Done: {:?}", outcome);
            Ok(())
        }
        Err(e) => {
            error!("Simulation failed: {}", e);
            Err(e.into())
        }
    }
}
