//! Run statistics and serializable summaries

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::{ScenarioId, Turn};
use crate::engine::events::TurnEvent;
use crate::engine::state::StateSnapshot;

/// Aggregates accumulated over a run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub turns_played: u32,
    pub territory_lost: f64,
    pub deserters: u64,
    pub reinforcements_mobilized: u64,
    pub reinforcements_arrived: u64,
    pub reinforcements_leaked: u64,
    pub critical_turns: u32,
}

impl RunStats {
    /// Fold one resolved turn into the totals
    pub fn record(&mut self, events: &[TurnEvent]) {
        self.turns_played += 1;
        for event in events {
            match event {
                TurnEvent::ReinforcementsArrived {
                    arrived,
                    mobilized,
                    leaked,
                } => {
                    self.reinforcements_arrived += arrived;
                    self.reinforcements_mobilized += mobilized;
                    self.reinforcements_leaked += leaked;
                }
                TurnEvent::TerritoryLost { km2 } => {
                    self.territory_lost += km2;
                    if *km2 > crate::engine::events::CRITICAL_TERRITORY_LOSS {
                        self.critical_turns += 1;
                    }
                }
                TurnEvent::Desertion { deserters } => self.deserters += deserters,
                _ => {}
            }
        }
    }
}

/// One resolved turn as recorded in a session journal
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub turn: Turn,
    pub scenario: ScenarioId,
    pub choice: String,
    pub lines: Vec<String>,
}

/// Complete record of a run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub final_state: StateSnapshot,
    pub statistics: RunStats,
    pub journal: Vec<JournalEntry>,
}

impl RunSummary {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn summary(&self) -> String {
        let state = &self.final_state;
        let outcome = match state.terminal_reason {
            Some(reason) => format!("collapsed in week {}: {}", state.turn, reason),
            None => format!("still standing after {} weeks", self.statistics.turns_played),
        };

        format!(
            "Defense {}\n\
             Territory {:.0} km² (lost {:.0}), manpower {}, units {}\n\
             Morale {:.0}, support {:.0}, reputation {:.0}, budget {:.0}\n\
             Reinforcements: {} mobilized, {} arrived, {} leaked; {} deserted",
            outcome,
            state.territory,
            self.statistics.territory_lost,
            state.manpower,
            state.units,
            state.morale,
            state.support,
            state.reputation,
            state.budget,
            self.statistics.reinforcements_mobilized,
            self.statistics.reinforcements_arrived,
            self.statistics.reinforcements_leaked,
            self.statistics.deserters,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accumulate_events() {
        let mut stats = RunStats::default();
        stats.record(&[
            TurnEvent::ReinforcementsArrived {
                arrived: 3_500,
                mobilized: 5_000,
                leaked: 1_500,
            },
            TurnEvent::TerritoryLost { km2: 250.0 },
            TurnEvent::Desertion { deserters: 2_000 },
        ]);
        stats.record(&[TurnEvent::TerritoryLost { km2: 50.0 }, TurnEvent::Desertion { deserters: 10 }]);

        assert_eq!(stats.turns_played, 2);
        assert_eq!(stats.territory_lost, 300.0);
        assert_eq!(stats.deserters, 2_010);
        assert_eq!(stats.reinforcements_leaked, 1_500);
        assert_eq!(stats.critical_turns, 1);
    }
}
