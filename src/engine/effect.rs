//! Choice effects
//!
//! An effect is a pure function from the current state to an
//! [`EffectDelta`]. Catalog content usually describes effects
//! declaratively with an [`EffectSpec`]; programmatic catalogs can supply
//! any closure.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};
use crate::core::types::Metric;
use crate::engine::modifiers::{Expiry, ModifierKind, ModifierTarget};
use crate::engine::state::SimulationState;

/// Personnel to mobilize now and deliver later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinforcementOrder {
    pub amount: u64,
    /// Turn advances before arrival; 0 means the same turn
    pub delay_turns: u32,
}

/// Modifier requested by an effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierRequest {
    pub target: ModifierTarget,
    pub kind: ModifierKind,
    /// `None` uses the engine's configured default duration
    pub expiry: Option<Expiry>,
}

/// Partial update produced by a choice
///
/// Fields left as `None` keep their current value. Percentages are clamped
/// to [0, 100], manpower to at least 0, units to at least 1 and the front to
/// the configured floor when the delta is merged. Manpower and units stay
/// fractional here and are floored on merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectDelta {
    pub territory: Option<f64>,
    pub front_length: Option<f64>,
    pub manpower: Option<f64>,
    pub units: Option<f64>,
    pub morale: Option<f64>,
    pub support: Option<f64>,
    pub reputation: Option<f64>,
    pub budget: Option<f64>,
    pub enqueue_reinforcement: Option<ReinforcementOrder>,
    pub modifiers: Vec<ModifierRequest>,
    pub log: String,
}

impl EffectDelta {
    /// A delta that changes nothing but still reports what happened
    pub fn log(log: impl Into<String>) -> Self {
        Self {
            log: log.into(),
            ..Self::default()
        }
    }

    pub fn with_reinforcement(mut self, amount: u64, delay_turns: u32) -> Self {
        self.enqueue_reinforcement = Some(ReinforcementOrder { amount, delay_turns });
        self
    }

    pub fn with_modifier(mut self, target: ModifierTarget, kind: ModifierKind, expiry: Option<Expiry>) -> Self {
        self.modifiers.push(ModifierRequest { target, kind, expiry });
        self
    }

    /// Set a metric to an absolute value
    pub fn set(mut self, metric: Metric, value: f64) -> Self {
        match metric {
            Metric::Territory => self.territory = Some(value),
            Metric::FrontLength => self.front_length = Some(value),
            Metric::Manpower => self.manpower = Some(value),
            Metric::Units => self.units = Some(value),
            Metric::Morale => self.morale = Some(value),
            Metric::Support => self.support = Some(value),
            Metric::Reputation => self.reputation = Some(value),
            Metric::Budget => self.budget = Some(value),
        }
        self
    }
}

/// One declarative adjustment: `value · scale + add`, then optional bounds.
///
/// A bound only limits the change. A value already below `min` is never
/// raised to it, and one already above `max` is never lowered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub metric: Metric,
    #[serde(default)]
    pub add: f64,
    #[serde(default = "unit_scale")]
    pub scale: f64,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

fn unit_scale() -> f64 {
    1.0
}

impl Adjustment {
    pub fn add(metric: Metric, add: f64) -> Self {
        Self {
            metric,
            add,
            scale: 1.0,
            min: None,
            max: None,
        }
    }

    pub fn scale(metric: Metric, scale: f64) -> Self {
        Self {
            metric,
            add: 0.0,
            scale,
            min: None,
            max: None,
        }
    }

    pub fn at_least(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn apply(&self, current: f64) -> f64 {
        let mut value = current * self.scale + self.add;
        if let Some(min) = self.min {
            value = value.max(min.min(current));
        }
        if let Some(max) = self.max {
            value = value.min(max.max(current));
        }
        value
    }
}

/// Declarative modifier as written in catalog files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierSpec {
    pub target: ModifierTarget,
    #[serde(default)]
    pub multiply: Option<f64>,
    #[serde(default)]
    pub add: Option<f64>,
    #[serde(default)]
    pub turns: Option<u32>,
    #[serde(default)]
    pub permanent: bool,
}

impl ModifierSpec {
    fn to_request(&self) -> Result<ModifierRequest> {
        let kind = match (self.multiply, self.add) {
            (Some(factor), None) => ModifierKind::Multiply(factor),
            (None, Some(offset)) => ModifierKind::Add(offset),
            _ => {
                return Err(EngineError::config(format!(
                    "{:?} modifier must set exactly one of `multiply` or `add`",
                    self.target
                )))
            }
        };

        let expiry = match (self.permanent, self.turns) {
            (true, None) => Some(Expiry::Permanent),
            (true, Some(_)) => {
                return Err(EngineError::config("a permanent modifier cannot also set `turns`"));
            }
            (false, Some(0)) => return Err(EngineError::config("modifier `turns` must be at least 1")),
            (false, Some(turns)) => Some(Expiry::Turns(turns)),
            (false, None) => None,
        };

        Ok(ModifierRequest {
            target: self.target,
            kind,
            expiry,
        })
    }
}

/// Data-driven effect
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EffectSpec {
    pub log: String,
    #[serde(default)]
    pub adjust: Vec<Adjustment>,
    #[serde(default)]
    pub reinforcement: Option<ReinforcementOrder>,
    #[serde(default)]
    pub modifiers: Vec<ModifierSpec>,
}

impl EffectSpec {
    pub fn new(log: impl Into<String>) -> Self {
        Self {
            log: log.into(),
            ..Self::default()
        }
    }

    pub fn adjust(mut self, adjustment: Adjustment) -> Self {
        self.adjust.push(adjustment);
        self
    }

    pub fn reinforce(mut self, amount: u64, delay_turns: u32) -> Self {
        self.reinforcement = Some(ReinforcementOrder { amount, delay_turns });
        self
    }

    pub fn modifier(mut self, modifier: ModifierSpec) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Reject specs that could produce non-finite or nonsensical deltas
    pub fn validate(&self) -> Result<()> {
        if self.log.trim().is_empty() {
            return Err(EngineError::config("effect log text must not be empty"));
        }

        for adjustment in &self.adjust {
            let bounds = [adjustment.min, adjustment.max];
            let all_finite = adjustment.add.is_finite()
                && adjustment.scale.is_finite()
                && bounds.iter().flatten().all(|b| b.is_finite());
            if !all_finite {
                return Err(EngineError::config(format!(
                    "adjustment of {} contains a non-finite number",
                    adjustment.metric
                )));
            }
            if let (Some(min), Some(max)) = (adjustment.min, adjustment.max) {
                if min > max {
                    return Err(EngineError::config(format!(
                        "adjustment of {} has min {} above max {}",
                        adjustment.metric, min, max
                    )));
                }
            }
        }

        if let Some(order) = &self.reinforcement {
            if order.amount == 0 {
                return Err(EngineError::config("reinforcement amount must be positive"));
            }
        }

        for modifier in &self.modifiers {
            let request = modifier.to_request()?;
            let value = match request.kind {
                ModifierKind::Multiply(v) | ModifierKind::Add(v) => v,
            };
            if !value.is_finite() {
                return Err(EngineError::config("modifier value must be finite"));
            }
        }

        Ok(())
    }

    /// Evaluate against the current state.
    ///
    /// Adjustments to the same metric compose in order.
    pub fn evaluate(&self, state: &SimulationState) -> EffectDelta {
        let mut values: Vec<(Metric, f64)> = Vec::new();

        for adjustment in &self.adjust {
            let current = values
                .iter()
                .rev()
                .find(|(metric, _)| *metric == adjustment.metric)
                .map(|(_, value)| *value)
                .unwrap_or_else(|| state.metric(adjustment.metric));
            values.push((adjustment.metric, adjustment.apply(current)));
        }

        let mut delta = EffectDelta::log(self.log.clone());
        for (metric, value) in values {
            delta = delta.set(metric, value);
        }
        delta.enqueue_reinforcement = self.reinforcement;
        // Specs are validated on load, so conversion only fails for hand-built ones
        delta.modifiers = self.modifiers.iter().filter_map(|m| m.to_request().ok()).collect();
        delta
    }
}

type EffectFn = dyn Fn(&SimulationState) -> EffectDelta + Send + Sync;

/// What happens when a choice is taken
#[derive(Clone)]
pub enum Effect {
    Declarative(EffectSpec),
    Custom(Arc<EffectFn>),
}

impl Effect {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&SimulationState) -> EffectDelta + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    pub fn evaluate(&self, state: &SimulationState) -> EffectDelta {
        match self {
            Effect::Declarative(spec) => spec.evaluate(state),
            Effect::Custom(f) => f(state),
        }
    }
}

impl From<EffectSpec> for Effect {
    fn from(spec: EffectSpec) -> Self {
        Effect::Declarative(spec)
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Declarative(spec) => f.debug_tuple("Declarative").field(spec).finish(),
            Effect::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
