//! A single playthrough
//!
//! `Session` owns the current state for callers that do not want to thread
//! it through themselves. Taking `&mut self` per turn means a second turn
//! cannot start while one is resolving.

use crate::core::error::Result;
use crate::engine::output::{JournalEntry, RunStats, RunSummary};
use crate::engine::state::{SimulationState, StateSnapshot};
use crate::engine::turn::{TurnEngine, TurnOutcome};
use crate::scenario::catalog::Scenario;

#[derive(Debug)]
pub struct Session {
    engine: TurnEngine,
    state: SimulationState,
    journal: Vec<JournalEntry>,
    stats: RunStats,
}

impl Session {
    pub fn new(engine: TurnEngine) -> Result<Self> {
        let state = engine.initialize()?;
        Ok(Self {
            engine,
            state,
            journal: Vec::new(),
            stats: RunStats::default(),
        })
    }

    pub fn engine(&self) -> &TurnEngine {
        &self.engine
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot()
    }

    pub fn scenario(&self) -> Result<&Scenario> {
        self.engine.scenario(&self.state)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Resolve the current scenario's choice at `index` and return the
    /// turn's log lines. On error the session is unchanged.
    pub fn choose(&mut self, index: usize) -> Result<&[String]> {
        let scenario = self.engine.scenario(&self.state)?;
        let TurnOutcome {
            state,
            log_entries,
            events,
        } = self.engine.apply_choice(&self.state, scenario, index)?;

        let entry = JournalEntry {
            turn: self.state.turn,
            scenario: scenario.id.clone(),
            choice: scenario.choices[index].label.clone(),
            lines: log_entries,
        };

        self.stats.record(&events);
        self.state = state;
        self.journal.push(entry);
        Ok(self.journal.last().map(|e| e.lines.as_slice()).unwrap_or_default())
    }

    /// Throw the run away and start again from the baseline
    pub fn restart(&mut self) -> Result<()> {
        let state = self.engine.initialize()?;
        tracing::info!(
            previous_turn = self.state.turn,
            previous_outcome = ?self.state.terminal_reason,
            "Session restarted"
        );
        self.state = state;
        self.journal.clear();
        self.stats = RunStats::default();
        Ok(())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            final_state: self.state.snapshot(),
            statistics: self.stats.clone(),
            journal: self.journal.clone(),
        }
    }
}
