//! Scenario selection strategies
//!
//! Selectors are stateless; their random source and deck live in the
//! simulation state's [`SelectorState`] so that selection replays exactly.

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::config::{EngineConfig, PoolStrategy};
use crate::core::error::{EngineError, Result};
use crate::core::types::{ScenarioId, Trigger};
use crate::engine::state::{SelectorState, SimulationState};
use crate::scenario::catalog::ScenarioCatalog;

/// Picks the next decision point
pub trait ScenarioSelector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Choose the scenario to offer for `state`.
    ///
    /// Must only draw randomness from `selection`.
    fn select(
        &self,
        state: &SimulationState,
        catalog: &ScenarioCatalog,
        selection: &mut SelectorState,
    ) -> Result<ScenarioId>;
}

fn candidates(catalog: &ScenarioCatalog, whole_catalog: bool) -> Vec<ScenarioId> {
    if whole_catalog {
        catalog.iter().map(|s| s.id.clone()).collect()
    } else {
        catalog.pool().into_iter().cloned().collect()
    }
}

/// Uniform draw with replacement
#[derive(Debug, Clone, Default)]
pub struct UniformSelector {
    whole_catalog: bool,
}

impl UniformSelector {
    /// Draw only from untriggered scenarios
    pub fn pool() -> Self {
        Self { whole_catalog: false }
    }

    /// Draw from every scenario, triggered or not
    pub fn whole_catalog() -> Self {
        Self { whole_catalog: true }
    }
}

impl ScenarioSelector for UniformSelector {
    fn name(&self) -> &'static str {
        "random"
    }

    fn select(
        &self,
        _state: &SimulationState,
        catalog: &ScenarioCatalog,
        selection: &mut SelectorState,
    ) -> Result<ScenarioId> {
        let ids = candidates(catalog, self.whole_catalog);
        let id = ids
            .choose(&mut selection.rng)
            .cloned()
            .ok_or_else(|| EngineError::config("scenario catalog is empty"))?;
        selection.last_pool_pick = Some(id.clone());
        Ok(id)
    }
}

/// Shuffled rotation through the candidates
///
/// Every candidate is drawn once per pass. A reshuffle never puts the
/// previous draw on top, so the same scenario is never offered twice in a
/// row unless it is the only candidate.
#[derive(Debug, Clone, Default)]
pub struct DeckSelector {
    whole_catalog: bool,
}

impl DeckSelector {
    pub fn pool() -> Self {
        Self { whole_catalog: false }
    }

    pub fn whole_catalog() -> Self {
        Self { whole_catalog: true }
    }

    fn refill(&self, catalog: &ScenarioCatalog, selection: &mut SelectorState) {
        let mut deck = candidates(catalog, self.whole_catalog);
        deck.shuffle(&mut selection.rng);

        // Cards are drawn from the end
        if deck.len() > 1 && deck.last() == selection.last_pool_pick.as_ref() {
            let top = deck.len() - 1;
            let swap_with = selection.rng.gen_range(0..top);
            deck.swap(top, swap_with);
        }

        selection.deck = deck;
    }
}

impl ScenarioSelector for DeckSelector {
    fn name(&self) -> &'static str {
        "deck"
    }

    fn select(
        &self,
        _state: &SimulationState,
        catalog: &ScenarioCatalog,
        selection: &mut SelectorState,
    ) -> Result<ScenarioId> {
        // Drop cards the catalog no longer contains
        selection.deck.retain(|id| catalog.get(id).is_some());

        if selection.deck.is_empty() {
            self.refill(catalog, selection);
        }

        let id = selection
            .deck
            .pop()
            .ok_or_else(|| EngineError::config("scenario catalog is empty"))?;
        selection.last_pool_pick = Some(id.clone());
        Ok(id)
    }
}

/// State-aware policy: acute threats first, then the default pool
pub struct ThresholdSelector {
    critical_density: f64,
    paralysis_efficiency: f64,
    desertion_morale: f64,
    pool: Box<dyn ScenarioSelector>,
}

impl ThresholdSelector {
    pub fn new(config: &EngineConfig, pool: Box<dyn ScenarioSelector>) -> Self {
        Self {
            critical_density: config.attrition.critical_density,
            paralysis_efficiency: config.selection.paralysis_efficiency,
            desertion_morale: config.selection.desertion_morale,
            pool,
        }
    }

    /// Triggers whose condition holds, highest priority first
    pub fn active_triggers(&self, state: &SimulationState) -> Vec<Trigger> {
        Trigger::PRIORITY
            .into_iter()
            .filter(|trigger| match trigger {
                Trigger::BreachThreat => state.density < self.critical_density,
                Trigger::CommandParalysis => state.efficiency < self.paralysis_efficiency,
                Trigger::MassDesertion => state.morale < self.desertion_morale,
            })
            .collect()
    }
}

impl fmt::Debug for ThresholdSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThresholdSelector")
            .field("critical_density", &self.critical_density)
            .field("paralysis_efficiency", &self.paralysis_efficiency)
            .field("desertion_morale", &self.desertion_morale)
            .field("pool", &self.pool.name())
            .finish()
    }
}

impl ScenarioSelector for ThresholdSelector {
    fn name(&self) -> &'static str {
        "threshold"
    }

    fn select(
        &self,
        state: &SimulationState,
        catalog: &ScenarioCatalog,
        selection: &mut SelectorState,
    ) -> Result<ScenarioId> {
        for trigger in self.active_triggers(state) {
            if let Some(scenario) = catalog.for_trigger(trigger) {
                tracing::debug!(?trigger, scenario = %scenario.id, "Threshold scenario selected");
                return Ok(scenario.id.clone());
            }
        }
        self.pool.select(state, catalog, selection)
    }
}

/// Selection policy named on the command line or in tooling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind {
    Threshold,
    Deck,
    Random,
}

impl SelectorKind {
    pub fn build(self, config: &EngineConfig) -> Box<dyn ScenarioSelector> {
        match self {
            SelectorKind::Threshold => default_selector(config),
            SelectorKind::Deck => Box::new(DeckSelector::whole_catalog()),
            SelectorKind::Random => Box::new(UniformSelector::whole_catalog()),
        }
    }
}

impl FromStr for SelectorKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "threshold" => Ok(SelectorKind::Threshold),
            "deck" => Ok(SelectorKind::Deck),
            "random" => Ok(SelectorKind::Random),
            other => Err(EngineError::config(format!(
                "unknown selector `{}` (expected threshold, deck or random)",
                other
            ))),
        }
    }
}

/// Threshold policy with the configured pool strategy
pub fn default_selector(config: &EngineConfig) -> Box<dyn ScenarioSelector> {
    let pool: Box<dyn ScenarioSelector> = match config.selection.pool {
        PoolStrategy::Deck => Box::new(DeckSelector::pool()),
        PoolStrategy::Random => Box::new(UniformSelector::pool()),
    };
    Box::new(ThresholdSelector::new(config, pool))
}
