//! Core type definitions used throughout the codebase

use std::fmt;

use serde::{Deserialize, Serialize};

/// Turn counter (one turn is one in-game week)
pub type Turn = u32;

/// Identifier of a scenario within a catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(pub String);

impl ScenarioId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScenarioId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ScenarioId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Authoritative state fields a choice effect may adjust.
///
/// `efficiency` and `density` are deliberately absent: they are derived every
/// turn and can only be influenced through modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Territory,
    FrontLength,
    Manpower,
    Units,
    Morale,
    Support,
    Reputation,
    Budget,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Territory => "territory",
            Metric::FrontLength => "front_length",
            Metric::Manpower => "manpower",
            Metric::Units => "units",
            Metric::Morale => "morale",
            Metric::Support => "support",
            Metric::Reputation => "reputation",
            Metric::Budget => "budget",
        };
        f.write_str(name)
    }
}

/// Acute threat a scenario responds to.
///
/// Declaration order is selection priority: breach threats pre-empt
/// command paralysis, which pre-empts mass desertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    BreachThreat,
    CommandParalysis,
    MassDesertion,
}

impl Trigger {
    pub const PRIORITY: [Trigger; 3] = [
        Trigger::BreachThreat,
        Trigger::CommandParalysis,
        Trigger::MassDesertion,
    ];
}

/// Percentage metrics live on [0, 100]
pub fn clamp_percentage(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}
