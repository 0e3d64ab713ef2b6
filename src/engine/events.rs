//! Structured turn events and their log lines

use serde::{Deserialize, Serialize};

use crate::core::types::Turn;
use crate::engine::modifiers::ModifierTarget;
use crate::engine::state::TerminalReason;

/// Territory loss above which the log line escalates (km²)
pub const CRITICAL_TERRITORY_LOSS: f64 = 200.0;

/// Weekly desertion above which a warning is logged
pub const HEAVY_DESERTION: u64 = 500;

/// Something that happened while resolving a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    ChoiceApplied {
        turn: Turn,
        log: String,
    },
    ReinforcementsArrived {
        arrived: u64,
        mobilized: u64,
        leaked: u64,
    },
    TerritoryLost {
        km2: f64,
    },
    Desertion {
        deserters: u64,
    },
    ModifierExpired {
        target: ModifierTarget,
        source: String,
    },
    Collapse {
        reason: TerminalReason,
    },
}

impl TurnEvent {
    /// Line for the player-facing log, if this event is reported there
    pub fn log_line(&self) -> Option<String> {
        match self {
            TurnEvent::ChoiceApplied { turn, log } => Some(format!("Week {}: {}", turn, log)),
            TurnEvent::ReinforcementsArrived {
                arrived,
                mobilized,
                leaked,
            } => Some(format!(
                "Reinforcements arrived: +{} (mobilized {}, lost to the leaky bucket {})",
                arrived, mobilized, leaked
            )),
            TurnEvent::TerritoryLost { km2 } if *km2 > CRITICAL_TERRITORY_LOSS => Some(format!(
                "Critical territory loss: -{:.0} km² due to low density!",
                km2
            )),
            TurnEvent::TerritoryLost { km2 } => Some(format!("Territory lost: -{:.0} km².", km2)),
            TurnEvent::Desertion { deserters } if *deserters > HEAVY_DESERTION => {
                Some(format!("Desertion this week: -{} personnel.", deserters))
            }
            TurnEvent::Desertion { .. } => None,
            TurnEvent::ModifierExpired { .. } => None,
            TurnEvent::Collapse { reason } => Some(format!("Collapse: {}", reason)),
        }
    }
}

/// Render the log lines of a turn in event order
pub fn render_log(events: &[TurnEvent]) -> Vec<String> {
    events.iter().filter_map(TurnEvent::log_line).collect()
}
