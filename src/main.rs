//! Defense Entropy - Interactive Entry Point
//!
//! Plays a run in the terminal: shows the current situation, reads a choice
//! number and prints the week's log.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use defense_entropy::core::config::EngineConfig;
use defense_entropy::core::error::Result;
use defense_entropy::engine::{Session, TurnEngine};
use defense_entropy::scenario::{load_catalog, ScenarioCatalog, SelectorKind};
use tracing_subscriber::EnvFilter;

/// Defense Entropy - hold the line for as many weeks as you can
#[derive(Parser, Debug)]
#[command(name = "defense-entropy")]
#[command(about = "Interactive turn-based attrition simulation")]
struct Args {
    /// Engine configuration (TOML); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scenario catalog (TOML); the built-in catalog is used when omitted
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Seed for scenario selection, overriding the config
    #[arg(long)]
    seed: Option<u64>,

    /// Selection policy: threshold, deck or random
    #[arg(long, default_value = "threshold")]
    selector: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("defense_entropy=info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let engine = build_engine(&args)?;
    tracing::info!(selector = engine.selector_name(), seed = engine.config().seed, "Defense Entropy starting");

    let mut session = Session::new(engine)?;

    println!("\n=== DEFENSE ENTROPY ===");
    println!("The situation is difficult, but under control.");
    println!();
    println!("Commands:");
    println!("  <number>        - Take that choice");
    println!("  status / s      - Show detailed status");
    println!("  log / l         - Show the journal");
    println!("  restart / r     - Start a new run");
    println!("  quit / q        - Exit");
    println!();

    loop {
        if session.is_terminal() {
            println!();
            println!("{}", session.summary().summary());
            println!();
            println!("Type `restart` to try again or `quit` to exit.");
        } else {
            display_scenario(&session)?;
        }

        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        match input {
            "quit" | "q" => break,
            "status" | "s" => {
                display_status(&session);
                continue;
            }
            "log" | "l" => {
                for entry in session.journal() {
                    for line in &entry.lines {
                        println!("  {}", line);
                    }
                }
                continue;
            }
            "restart" | "r" => {
                session.restart()?;
                println!("A new term begins. Try to hold the system together.");
                continue;
            }
            _ => {}
        }

        if session.is_terminal() {
            println!("The run has ended.");
            continue;
        }

        match input.parse::<usize>() {
            Ok(number) if number >= 1 => match session.choose(number - 1) {
                Ok(lines) => {
                    println!();
                    for line in lines {
                        println!("  {}", line);
                    }
                }
                Err(e) => println!("{}", e),
            },
            _ => println!("Unknown command. Enter a choice number, status, log, restart or quit."),
        }
    }

    let snapshot = session.snapshot();
    println!("\nFinal state: week {}, {:.0} km² held.", snapshot.turn, snapshot.territory);
    Ok(())
}

fn build_engine(args: &Args) -> Result<TurnEngine> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let catalog = match &args.catalog {
        Some(path) => load_catalog(path)?,
        None => ScenarioCatalog::standard()?,
    };

    let selector = args.selector.parse::<SelectorKind>()?.build(&config);
    TurnEngine::with_selector(config, catalog, selector)
}

/// Show the metrics bar and the current decision point
fn display_scenario(session: &Session) -> Result<()> {
    let state = session.snapshot();
    println!();
    println!(
        "--- Week {} | Territory {:.0} km² | Manpower {} | Brigades {} ---",
        state.turn, state.territory, state.manpower, state.units
    );
    println!(
        "  Morale {:.0}% | Support {:.0}% | Reputation {:.0}% | Budget {:.0}%",
        state.morale, state.support, state.reputation, state.budget
    );

    let scenario = session.scenario()?;
    println!();
    println!("{}", scenario.title);
    if !scenario.description.is_empty() {
        println!("{}", scenario.description);
    }
    for (i, choice) in scenario.choices.iter().enumerate() {
        println!("  {}. {}", i + 1, choice.label);
        if !choice.description.is_empty() {
            println!("     {}", choice.description);
        }
    }
    Ok(())
}

/// Show derived indicators and the reinforcement pipeline
fn display_status(session: &Session) {
    let state = session.state();
    println!();
    println!("=== Detailed Status (Week {}) ===", state.turn);
    println!("  Front length: {:.0} km", state.front_length);
    println!("  Command efficiency: {:.3}", state.efficiency);
    println!("  Relative density: {:.3}", state.density);
    println!(
        "  Reinforcements in the pipeline: {} batches, {} personnel",
        state.reinforcements.len(),
        state.reinforcements.pending_personnel()
    );
    for batch in state.reinforcements.batches() {
        println!("    {} mobilized, {} week(s) out", batch.mobilized_amount, batch.turns_remaining);
    }
    for modifier in state.modifiers.iter() {
        println!("  Active modifier: {:?} {:?} ({:?})", modifier.target, modifier.kind, modifier.expiry);
    }
    let stats = session.stats();
    println!(
        "  So far: {:.0} km² lost, {} deserted, {} leaked in the pipeline",
        stats.territory_lost, stats.deserters, stats.reinforcements_leaked
    );
    println!();
}
