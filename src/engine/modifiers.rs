//! Time-limited modifiers on derived indicators
//!
//! Choices that shock efficiency or density cannot write those fields
//! directly, since both are recomputed every turn. They push a modifier
//! instead, and the recomputation folds active modifiers into the base
//! value. Modifiers age once per turn after the losses they influence have
//! been applied.

use serde::{Deserialize, Serialize};

/// Quantity a modifier adjusts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierTarget {
    Efficiency,
    Density,
    /// Territory lost this turn, after the efficiency division
    TerritoryLoss,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    Multiply(f64),
    Add(f64),
}

/// How long a modifier stays on the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiry {
    /// Number of turn resolutions the modifier participates in
    Turns(u32),
    Permanent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub target: ModifierTarget,
    pub kind: ModifierKind,
    pub expiry: Expiry,
    /// Log text of the choice that pushed it
    pub source: String,
}

impl Modifier {
    pub fn is_expired(&self) -> bool {
        matches!(self.expiry, Expiry::Turns(0))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifierStack {
    entries: Vec<Modifier>,
}

impl ModifierStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, modifier: Modifier) {
        if !modifier.is_expired() {
            self.entries.push(modifier);
        }
    }

    /// Apply every active modifier for `target` to `base`.
    ///
    /// Multipliers compose first, then additive terms are summed on top, so
    /// the result does not depend on push order.
    pub fn fold(&self, target: ModifierTarget, base: f64) -> f64 {
        let mut factor = 1.0;
        let mut offset = 0.0;

        for modifier in self.entries.iter().filter(|m| m.target == target) {
            match modifier.kind {
                ModifierKind::Multiply(value) => factor *= value,
                ModifierKind::Add(value) => offset += value,
            }
        }

        base * factor + offset
    }

    /// Count down timed modifiers and drop the ones that ran out.
    /// Returns the modifiers removed this turn.
    pub fn age(&mut self) -> Vec<Modifier> {
        for modifier in &mut self.entries {
            if let Expiry::Turns(turns) = &mut modifier.expiry {
                *turns = turns.saturating_sub(1);
            }
        }

        let (expired, active): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.entries).into_iter().partition(Modifier::is_expired);
        self.entries = active;
        expired
    }

    pub fn iter(&self) -> impl Iterator<Item = &Modifier> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
