//! Simulation state, terminal reasons and read-only snapshots

use std::fmt;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::EngineConfig;
use crate::core::types::{Metric, ScenarioId, Turn};
use crate::engine::formulas::BaseMetrics;
use crate::engine::modifiers::ModifierStack;
use crate::engine::reinforcement::ReinforcementQueue;

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    TerritorialCollapse,
    ManpowerCollapse,
    LegitimacyCollapse,
}

impl TerminalReason {
    /// Short machine-friendly name
    pub fn name(self) -> &'static str {
        match self {
            TerminalReason::TerritorialCollapse => "territorial_collapse",
            TerminalReason::ManpowerCollapse => "manpower_collapse",
            TerminalReason::LegitimacyCollapse => "legitimacy_collapse",
        }
    }
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TerminalReason::TerritorialCollapse => "The enemy has occupied all remaining territory.",
            TerminalReason::ManpowerCollapse => "The army has ceased to exist as an organized force.",
            TerminalReason::LegitimacyCollapse => "Political collapse and loss of legitimacy.",
        };
        f.write_str(text)
    }
}

/// Random source and draw history of the scenario selector.
///
/// Kept inside the state so that turns stay pure functions of their input:
/// replaying the same choices from the same state reproduces every draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorState {
    pub rng: ChaCha8Rng,
    /// Remaining cards of the current shuffled pass through the pool
    pub deck: Vec<ScenarioId>,
    /// Most recent pool draw, used to avoid repeats across reshuffles
    pub last_pool_pick: Option<ScenarioId>,
}

impl SelectorState {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            deck: Vec::new(),
            last_pool_pick: None,
        }
    }
}

/// Complete state of one run between turns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationState {
    /// Starts at 1 and increases by one per resolved turn
    pub turn: Turn,
    /// Controlled territory (km²); may be negative once collapse is detected
    pub territory: f64,
    pub front_length: f64,
    pub manpower: u64,
    pub units: u32,
    pub morale: f64,
    pub support: f64,
    pub reputation: f64,
    pub budget: f64,
    /// Derived: span-of-control efficiency with modifiers folded in
    pub efficiency: f64,
    /// Derived: relative density with modifiers folded in
    pub density: f64,
    pub reinforcements: ReinforcementQueue,
    pub modifiers: ModifierStack,
    /// Set exactly once, on the turn the run collapses
    pub terminal_reason: Option<TerminalReason>,
    /// Scenario currently on offer; `None` once terminal
    pub scenario: Option<ScenarioId>,
    pub selector: SelectorState,
}

impl SimulationState {
    /// Baseline state from the config, with no scenario selected yet
    pub fn baseline(config: &EngineConfig) -> Self {
        let initial = &config.initial;
        let base = BaseMetrics::compute(
            initial.units,
            initial.manpower,
            initial.front_length,
            &config.efficiency,
            &config.density,
        );

        Self {
            turn: 1,
            territory: initial.territory,
            front_length: initial.front_length,
            manpower: initial.manpower,
            units: initial.units,
            morale: initial.morale,
            support: initial.support,
            reputation: initial.reputation,
            budget: initial.budget,
            efficiency: base.efficiency,
            density: base.density,
            reinforcements: ReinforcementQueue::new(),
            modifiers: ModifierStack::new(),
            terminal_reason: None,
            scenario: None,
            selector: SelectorState::seeded(config.seed),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal_reason.is_some()
    }

    /// Current value of an authoritative metric
    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Territory => self.territory,
            Metric::FrontLength => self.front_length,
            Metric::Manpower => self.manpower as f64,
            Metric::Units => f64::from(self.units),
            Metric::Morale => self.morale,
            Metric::Support => self.support,
            Metric::Reputation => self.reputation,
            Metric::Budget => self.budget,
        }
    }

    /// Names of any floating-point fields that are not finite
    pub fn non_finite_fields(&self) -> Vec<&'static str> {
        let fields = [
            ("territory", self.territory),
            ("front_length", self.front_length),
            ("morale", self.morale),
            ("support", self.support),
            ("reputation", self.reputation),
            ("budget", self.budget),
            ("efficiency", self.efficiency),
            ("density", self.density),
        ];
        fields
            .iter()
            .filter(|(_, value)| !value.is_finite())
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            turn: self.turn,
            territory: self.territory,
            front_length: self.front_length,
            manpower: self.manpower,
            units: self.units,
            morale: self.morale,
            support: self.support,
            reputation: self.reputation,
            budget: self.budget,
            efficiency: self.efficiency,
            density: self.density,
            pending_batches: self.reinforcements.len(),
            pending_personnel: self.reinforcements.pending_personnel(),
            active_modifiers: self.modifiers.len(),
            terminal_reason: self.terminal_reason,
            scenario: self.scenario.clone(),
        }
    }
}

/// Read-only view handed to presentation code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub turn: Turn,
    pub territory: f64,
    pub front_length: f64,
    pub manpower: u64,
    pub units: u32,
    pub morale: f64,
    pub support: f64,
    pub reputation: f64,
    pub budget: f64,
    pub efficiency: f64,
    pub density: f64,
    pub pending_batches: usize,
    pub pending_personnel: u64,
    pub active_modifiers: usize,
    pub terminal_reason: Option<TerminalReason>,
    pub scenario: Option<ScenarioId>,
}

impl StateSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.terminal_reason.is_some()
    }
}
