//! Scenario catalog
//!
//! Scenarios are static content. The engine reads the catalog but never
//! mutates it.

use std::collections::HashSet;

use crate::core::error::{EngineError, Result};
use crate::core::types::{ScenarioId, Trigger};
use crate::engine::effect::{Effect, EffectDelta};
use crate::engine::state::SimulationState;
use crate::scenario::loader;

/// One option of a scenario
#[derive(Debug, Clone)]
pub struct Choice {
    pub label: String,
    pub description: String,
    pub effect: Effect,
}

impl Choice {
    pub fn new(label: impl Into<String>, description: impl Into<String>, effect: impl Into<Effect>) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
            effect: effect.into(),
        }
    }

    /// Choice backed by a closure instead of a declarative spec
    pub fn custom<F>(label: impl Into<String>, f: F) -> Self
    where
        F: Fn(&SimulationState) -> EffectDelta + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            description: String::new(),
            effect: Effect::custom(f),
        }
    }
}

/// A decision point offered to the player
#[derive(Debug, Clone)]
pub struct Scenario {
    pub id: ScenarioId,
    pub title: String,
    pub description: String,
    /// Threshold this scenario answers; `None` puts it in the default pool
    pub trigger: Option<Trigger>,
    pub choices: Vec<Choice>,
}

impl Scenario {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: ScenarioId::new(id),
            title: title.into(),
            description: String::new(),
            trigger: None,
            choices: Vec::new(),
        }
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn choice(&self, index: usize) -> Option<&Choice> {
        self.choices.get(index)
    }
}

/// Validated, immutable set of scenarios
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    scenarios: Vec<Scenario>,
}

impl ScenarioCatalog {
    /// Build a catalog, rejecting empty catalogs, duplicate ids, scenarios
    /// without choices and invalid declarative effects.
    pub fn new(scenarios: Vec<Scenario>) -> Result<Self> {
        if scenarios.is_empty() {
            return Err(EngineError::config("scenario catalog is empty"));
        }

        let mut seen = HashSet::new();
        for scenario in &scenarios {
            if !seen.insert(scenario.id.clone()) {
                return Err(EngineError::config(format!("duplicate scenario id `{}`", scenario.id)));
            }
            if scenario.choices.is_empty() {
                return Err(EngineError::config(format!("scenario `{}` has no choices", scenario.id)));
            }
            for choice in &scenario.choices {
                if let Effect::Declarative(spec) = &choice.effect {
                    spec.validate().map_err(|e| match e {
                        EngineError::Config(msg) => EngineError::config(format!(
                            "scenario `{}`, choice `{}`: {}",
                            scenario.id, choice.label, msg
                        )),
                        other => other,
                    })?;
                }
            }
        }

        Ok(Self { scenarios })
    }

    /// The built-in catalog shipped with the crate
    pub fn standard() -> Result<Self> {
        loader::parse_catalog(loader::STANDARD_CATALOG)
    }

    pub fn get(&self, id: &ScenarioId) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| &s.id == id)
    }

    /// First scenario answering the given trigger
    pub fn for_trigger(&self, trigger: Trigger) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.trigger == Some(trigger))
    }

    /// Ids eligible for the default branch, in catalog order.
    ///
    /// Catalogs made only of triggered scenarios draw from all of them.
    pub fn pool(&self) -> Vec<&ScenarioId> {
        let untriggered: Vec<&ScenarioId> =
            self.scenarios.iter().filter(|s| s.trigger.is_none()).map(|s| &s.id).collect();
        if untriggered.is_empty() {
            self.scenarios.iter().map(|s| &s.id).collect()
        } else {
            untriggered
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}
