//! TOML catalog loading

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::core::error::Result;
use crate::core::types::{ScenarioId, Trigger};
use crate::engine::effect::EffectSpec;
use crate::scenario::catalog::{Choice, Scenario, ScenarioCatalog};

/// Standard catalog embedded at compile time
pub const STANDARD_CATALOG: &str = include_str!("../../data/scenarios.toml");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "scenario")]
    scenarios: Vec<ScenarioEntry>,
}

#[derive(Debug, Deserialize)]
struct ScenarioEntry {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    trigger: Option<Trigger>,
    #[serde(default, rename = "choice")]
    choices: Vec<ChoiceEntry>,
}

#[derive(Debug, Deserialize)]
struct ChoiceEntry {
    label: String,
    #[serde(default)]
    description: String,
    effect: EffectSpec,
}

impl From<ScenarioEntry> for Scenario {
    fn from(entry: ScenarioEntry) -> Self {
        Scenario {
            id: ScenarioId::new(entry.id),
            title: entry.title,
            description: entry.description,
            trigger: entry.trigger,
            choices: entry
                .choices
                .into_iter()
                .map(|c| Choice::new(c.label, c.description, c.effect))
                .collect(),
        }
    }
}

/// Parse and validate a catalog from TOML text
pub fn parse_catalog(contents: &str) -> Result<ScenarioCatalog> {
    let file: CatalogFile = toml::from_str(contents)?;
    let scenarios = file.scenarios.into_iter().map(Scenario::from).collect();
    ScenarioCatalog::new(scenarios)
}

/// Load a catalog from `path`
pub fn load_catalog(path: &Path) -> Result<ScenarioCatalog> {
    let contents = fs::read_to_string(path)?;
    let catalog = parse_catalog(&contents)?;
    tracing::debug!(path = %path.display(), scenarios = catalog.len(), "Loaded scenario catalog");
    Ok(catalog)
}
