//! Delayed reinforcement queue
//!
//! Mobilized personnel spend a few turns in the pipeline before reaching
//! the front, and only part of each batch arrives: the rest leaks away to
//! bureaucracy and training attrition, more so when morale is low.

use serde::{Deserialize, Serialize};

use crate::core::config::ReinforcementConstants;
use crate::core::error::{EngineError, Result};

/// Personnel mobilized but not yet at the front
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinforcementBatch {
    pub mobilized_amount: u64,
    pub turns_remaining: u32,
}

/// Result of converting arriving batches into front-line personnel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Arrivals {
    /// Personnel that reached the front
    pub arrived: u64,
    /// Personnel mobilized in the arriving batches
    pub mobilized: u64,
    /// Personnel lost on the way
    pub leaked: u64,
    /// Number of batches that completed this turn
    pub batches: usize,
}

impl Arrivals {
    pub fn is_empty(&self) -> bool {
        self.batches == 0
    }
}

/// Fraction of a batch that reaches the front at the given morale
pub fn arrival_efficiency(current_morale: f64, constants: &ReinforcementConstants) -> f64 {
    if current_morale < constants.morale_penalty_threshold {
        constants.arrival_base_efficiency - constants.morale_penalty
    } else {
        constants.arrival_base_efficiency
    }
}

/// Convert a single mobilized amount into (arrived, leaked)
pub fn convert(mobilized_amount: u64, current_morale: f64, constants: &ReinforcementConstants) -> (u64, u64) {
    let efficiency = arrival_efficiency(current_morale, constants);
    let arrived = ((mobilized_amount as f64 * efficiency).floor() as u64).min(mobilized_amount);
    (arrived, mobilized_amount - arrived)
}

/// Ordered pending batches; all batches advance together each turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinforcementQueue {
    batches: Vec<ReinforcementBatch>,
}

impl ReinforcementQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch arriving after `delay_turns` advances.
    ///
    /// Same-turn arrivals are not queue entries; callers route them around
    /// the queue instead.
    pub fn enqueue(&mut self, amount: u64, delay_turns: u32) -> Result<()> {
        if amount == 0 {
            return Err(EngineError::config("reinforcement amount must be positive"));
        }
        if delay_turns == 0 {
            return Err(EngineError::config(
                "reinforcement delay must be at least one turn; same-turn arrivals bypass the queue",
            ));
        }

        self.batches.push(ReinforcementBatch {
            mobilized_amount: amount,
            turns_remaining: delay_turns,
        });
        Ok(())
    }

    /// Decrement every batch and convert those reaching zero.
    pub fn advance(&mut self, current_morale: f64, constants: &ReinforcementConstants) -> Arrivals {
        let mut arrivals = Arrivals::default();

        for batch in &mut self.batches {
            batch.turns_remaining = batch.turns_remaining.saturating_sub(1);
        }

        self.batches.retain(|batch| {
            if batch.turns_remaining > 0 {
                return true;
            }
            let (arrived, leaked) = convert(batch.mobilized_amount, current_morale, constants);
            arrivals.arrived += arrived;
            arrivals.leaked += leaked;
            arrivals.mobilized += batch.mobilized_amount;
            arrivals.batches += 1;
            false
        });

        arrivals
    }

    pub fn batches(&self) -> &[ReinforcementBatch] {
        &self.batches
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Personnel still in the pipeline
    pub fn pending_personnel(&self) -> u64 {
        self.batches.iter().map(|b| b.mobilized_amount).sum()
    }
}
