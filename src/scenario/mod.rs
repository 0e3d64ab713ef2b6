//! Scenario content and selection

pub mod catalog;
pub mod loader;
pub mod selector;

pub use catalog::{Choice, Scenario, ScenarioCatalog};
pub use loader::{load_catalog, parse_catalog};
pub use selector::{
    default_selector, DeckSelector, ScenarioSelector, SelectorKind, ThresholdSelector, UniformSelector,
};
