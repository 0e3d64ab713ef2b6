//! Headless Runner
//!
//! Plays a run with a fixed choice policy and prints the run summary,
//! for balance passes and replay checks.

use std::path::PathBuf;

use clap::Parser;
use defense_entropy::core::config::EngineConfig;
use defense_entropy::core::error::Result;
use defense_entropy::engine::{Session, TurnEngine};
use defense_entropy::scenario::{load_catalog, ScenarioCatalog, SelectorKind};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

/// Headless Runner - play a run without a player
#[derive(Parser, Debug)]
#[command(name = "autoplay")]
#[command(about = "Play a run with a fixed policy and print the summary")]
struct Args {
    /// Maximum weeks to play
    #[arg(long, default_value_t = 52)]
    turns: u32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Choice policy: first, cycle or random
    #[arg(long, default_value = "first")]
    policy: String,

    /// Selection policy: threshold, deck or random
    #[arg(long, default_value = "threshold")]
    selector: String,

    /// Engine configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scenario catalog (TOML)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Print every week's log to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Debug, Clone, Copy)]
enum Policy {
    First,
    Cycle,
    Random,
}

impl Policy {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "first" => Some(Policy::First),
            "cycle" => Some(Policy::Cycle),
            "random" => Some(Policy::Random),
            _ => None,
        }
    }

    fn pick(self, week: u32, choices: usize, rng: &mut ChaCha8Rng) -> usize {
        match self {
            Policy::First => 0,
            Policy::Cycle => week as usize % choices,
            Policy::Random => rng.gen_range(0..choices),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("defense_entropy=warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let policy = Policy::parse(&args.policy).unwrap_or_else(|| {
        eprintln!("Unknown policy '{}', defaulting to first", args.policy);
        Policy::First
    });

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let seed = args.seed.unwrap_or(config.seed);
    config = config.with_seed(seed);

    let catalog = match &args.catalog {
        Some(path) => load_catalog(path)?,
        None => ScenarioCatalog::standard()?,
    };
    let selector = args.selector.parse::<SelectorKind>()?.build(&config);
    let engine = TurnEngine::with_selector(config, catalog, selector)?;

    // Policy draws are independent of scenario selection draws
    let mut policy_rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
    let mut session = Session::new(engine)?;

    for week in 0..args.turns {
        if session.is_terminal() {
            break;
        }
        let choices = session.scenario()?.choices.len();
        let index = policy.pick(week, choices, &mut policy_rng);
        let lines = session.choose(index)?;

        if args.verbose {
            for line in lines {
                eprintln!("  {}", line);
            }
        }
    }

    let summary = session.summary();
    match args.format.as_str() {
        "text" => {
            println!("{}", summary.summary());
            println!();
            println!("Policy: {:?}", policy);
            println!("Seed: {}", seed);
        }
        "json" => println!("{}", summary.to_json()?),
        other => {
            eprintln!("Unknown format '{}', defaulting to json", other);
            println!("{}", summary.to_json()?);
        }
    }

    Ok(())
}
