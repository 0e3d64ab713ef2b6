//! Engine configuration with documented constants
//!
//! Every tuning constant of the attrition model lives here, with the
//! baseline balance values as defaults. Configurations
//! load from TOML; any key left out falls back to its default.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for the scenario selector's random source
    ///
    /// Two runs with the same seed, config, catalog and choice sequence
    /// produce identical states and scenarios.
    pub seed: u64,
    pub initial: InitialConditions,
    pub efficiency: EfficiencyConstants,
    pub density: DensityConstants,
    pub attrition: AttritionConstants,
    pub reinforcement: ReinforcementConstants,
    pub decay: DecayConstants,
    pub terminal: TerminalConstants,
    pub selection: SelectionConstants,
    pub modifiers: ModifierConstants,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed_0f_d3fe_05e,
            initial: InitialConditions::default(),
            efficiency: EfficiencyConstants::default(),
            density: DensityConstants::default(),
            attrition: AttritionConstants::default(),
            reinforcement: ReinforcementConstants::default(),
            decay: DecayConstants::default(),
            terminal: TerminalConstants::default(),
            selection: SelectionConstants::default(),
            modifiers: ModifierConstants::default(),
        }
    }
}

/// Baseline state at the start of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialConditions {
    /// Remaining controlled territory (km²)
    pub territory: f64,
    /// Length of the contested line (km)
    pub front_length: f64,
    /// Personnel under arms
    pub manpower: u64,
    /// Number of brigades
    ///
    /// The baseline of 15 sits above the optimum of 10, so the run starts
    /// with an efficiency of roughly 0.74.
    pub units: u32,
    pub morale: f64,
    pub support: f64,
    pub reputation: f64,
    pub budget: f64,
}

impl Default for InitialConditions {
    fn default() -> Self {
        Self {
            territory: 100_000.0,
            front_length: 1_200.0,
            manpower: 200_000,
            units: 15,
            morale: 75.0,
            support: 80.0,
            reputation: 70.0,
            budget: 60.0,
        }
    }
}

/// Span-of-control formula constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EfficiencyConstants {
    /// Unit count at which command efficiency peaks
    pub optimal_units: u32,
    /// Scale of the exponential penalty term
    pub alpha: f64,
    /// Growth rate of the penalty per unit above the optimum
    pub beta: f64,
    /// Lower bound applied after modifiers
    ///
    /// Efficiency divides territory loss, so it must never reach zero even
    /// when a stack of shocks multiplies it down.
    pub min_efficiency: f64,
}

impl Default for EfficiencyConstants {
    fn default() -> Self {
        Self {
            optimal_units: 10,
            alpha: 0.1,
            beta: 0.25,
            min_efficiency: 0.05,
        }
    }
}

/// Force-to-space ratio constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityConstants {
    /// Soldiers per km of front that counts as a relative density of 1.0
    pub norm: f64,
    /// Shortest front an effect can shrink the line to (km)
    pub front_length_floor: f64,
}

impl Default for DensityConstants {
    fn default() -> Self {
        Self {
            norm: 150.0,
            front_length_floor: 800.0,
        }
    }
}

/// Territory and desertion loss constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttritionConstants {
    /// Relative density below which the exponential collapse term applies
    pub critical_density: f64,
    /// Creeping territory loss per turn at full efficiency (km²)
    pub base_loss: f64,
    /// Amplitude of the collapse term
    pub collapse_scale: f64,
    /// Steepness of the collapse term
    ///
    /// At 5.0, a density of 0.3 adds 100·e^1 ≈ 272 km² before the
    /// efficiency division.
    pub collapse_rate: f64,
    /// Weekly desertion rate when morale is healthy
    pub awol_base_rate: f64,
    /// Quadratic desertion scale below the morale threshold
    ///
    /// At morale 0 the rate becomes 0.01 + 0.2 = 21% per turn.
    pub awol_quadratic_scale: f64,
    /// Morale below which desertion accelerates
    pub morale_threshold: f64,
}

impl Default for AttritionConstants {
    fn default() -> Self {
        Self {
            critical_density: 0.5,
            base_loss: 50.0,
            collapse_scale: 100.0,
            collapse_rate: 5.0,
            awol_base_rate: 0.01,
            awol_quadratic_scale: 0.2,
            morale_threshold: 50.0,
        }
    }
}

/// Leaky-bucket constants for arriving reinforcements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReinforcementConstants {
    /// Fraction of mobilized personnel reaching the front
    pub arrival_base_efficiency: f64,
    /// Morale below which the arrival penalty applies
    pub morale_penalty_threshold: f64,
    /// Arrival efficiency lost while morale is below the threshold
    pub morale_penalty: f64,
}

impl Default for ReinforcementConstants {
    fn default() -> Self {
        Self {
            arrival_base_efficiency: 0.7,
            morale_penalty_threshold: 40.0,
            morale_penalty: 0.2,
        }
    }
}

/// Fixed per-turn decay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConstants {
    /// Weekly budget burn
    pub budget_per_turn: f64,
    /// Weekly fatigue
    pub morale_per_turn: f64,
}

impl Default for DecayConstants {
    fn default() -> Self {
        Self {
            budget_per_turn: 2.0,
            morale_per_turn: 1.0,
        }
    }
}

/// Collapse thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConstants {
    /// Manpower at or below which the army stops existing as a force
    pub manpower_floor: u64,
}

impl Default for TerminalConstants {
    fn default() -> Self {
        Self { manpower_floor: 5_000 }
    }
}

/// How the default (non-acute) scenario pool is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStrategy {
    /// Shuffled deck without immediate repeats
    Deck,
    /// Uniform random draw with replacement
    Random,
}

/// Scenario trigger thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConstants {
    /// Efficiency below which command paralysis is offered
    pub paralysis_efficiency: f64,
    /// Morale below which mass desertion is offered
    pub desertion_morale: f64,
    /// Strategy for the default branch
    pub pool: PoolStrategy,
}

impl Default for SelectionConstants {
    fn default() -> Self {
        Self {
            paralysis_efficiency: 0.6,
            desertion_morale: 40.0,
            pool: PoolStrategy::Deck,
        }
    }
}

/// Modifier stack defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierConstants {
    /// Turns a modifier lasts when its effect does not state a duration
    ///
    /// A duration of 1 folds the shock into the turn in which it was chosen
    /// and nothing more.
    pub default_duration_turns: u32,
}

impl Default for ModifierConstants {
    fn default() -> Self {
        Self {
            default_duration_turns: 1,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text and validate it
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("initial.territory", self.initial.territory),
            ("initial.front_length", self.initial.front_length),
            ("efficiency.alpha", self.efficiency.alpha),
            ("efficiency.beta", self.efficiency.beta),
            ("efficiency.min_efficiency", self.efficiency.min_efficiency),
            ("density.norm", self.density.norm),
            ("density.front_length_floor", self.density.front_length_floor),
            ("attrition.critical_density", self.attrition.critical_density),
            ("attrition.base_loss", self.attrition.base_loss),
            ("attrition.collapse_scale", self.attrition.collapse_scale),
            ("attrition.collapse_rate", self.attrition.collapse_rate),
            ("attrition.awol_base_rate", self.attrition.awol_base_rate),
            ("attrition.awol_quadratic_scale", self.attrition.awol_quadratic_scale),
            ("attrition.morale_threshold", self.attrition.morale_threshold),
            ("reinforcement.morale_penalty_threshold", self.reinforcement.morale_penalty_threshold),
            ("reinforcement.morale_penalty", self.reinforcement.morale_penalty),
            ("decay.budget_per_turn", self.decay.budget_per_turn),
            ("decay.morale_per_turn", self.decay.morale_per_turn),
            ("selection.paralysis_efficiency", self.selection.paralysis_efficiency),
            ("selection.desertion_morale", self.selection.desertion_morale),
        ];
        if let Some((name, value)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(EngineError::config(format!("{} must be finite, got {}", name, value)));
        }

        if self.initial.front_length <= 0.0 {
            return Err(EngineError::config(format!(
                "initial.front_length must be positive, got {}",
                self.initial.front_length
            )));
        }
        if self.density.front_length_floor <= 0.0 {
            return Err(EngineError::config("density.front_length_floor must be positive"));
        }
        if self.density.norm <= 0.0 {
            return Err(EngineError::config("density.norm must be positive"));
        }
        if self.initial.units < 1 {
            return Err(EngineError::config("initial.units must be at least 1"));
        }

        let percentages = [
            ("initial.morale", self.initial.morale),
            ("initial.support", self.initial.support),
            ("initial.reputation", self.initial.reputation),
            ("initial.budget", self.initial.budget),
        ];
        for (name, value) in percentages {
            if !(0.0..=100.0).contains(&value) {
                return Err(EngineError::config(format!(
                    "{} must lie in [0, 100], got {}",
                    name, value
                )));
            }
        }

        if self.efficiency.min_efficiency <= 0.0 || self.efficiency.min_efficiency > 1.0 {
            return Err(EngineError::config("efficiency.min_efficiency must lie in (0, 1]"));
        }
        if self.efficiency.alpha < 0.0 {
            return Err(EngineError::config("efficiency.alpha must not be negative"));
        }

        let arrival = self.reinforcement.arrival_base_efficiency;
        if !(arrival > 0.0 && arrival <= 1.0) {
            return Err(EngineError::config(format!(
                "reinforcement.arrival_base_efficiency must lie in (0, 1], got {}",
                arrival
            )));
        }
        if self.reinforcement.morale_penalty < 0.0 || self.reinforcement.morale_penalty >= arrival {
            return Err(EngineError::config(
                "reinforcement.morale_penalty must be non-negative and below the arrival efficiency",
            ));
        }

        if self.attrition.morale_threshold <= 0.0 {
            return Err(EngineError::config("attrition.morale_threshold must be positive"));
        }
        if self.attrition.awol_base_rate < 0.0 || self.attrition.awol_quadratic_scale < 0.0 {
            return Err(EngineError::config("desertion rates must not be negative"));
        }
        if self.attrition.awol_base_rate + self.attrition.awol_quadratic_scale > 1.0 {
            return Err(EngineError::config(
                "attrition.awol_base_rate + attrition.awol_quadratic_scale must not exceed 1",
            ));
        }

        if self.modifiers.default_duration_turns == 0 {
            return Err(EngineError::config("modifiers.default_duration_turns must be at least 1"));
        }

        Ok(())
    }
}
