//! Simulation engine: formulas, attrition, reinforcements and turn resolution

pub mod attrition;
pub mod effect;
pub mod events;
pub mod formulas;
pub mod modifiers;
pub mod output;
pub mod reinforcement;
pub mod session;
pub mod state;
pub mod turn;

pub use effect::{Adjustment, Effect, EffectDelta, EffectSpec, ModifierSpec, ReinforcementOrder};
pub use events::TurnEvent;
pub use modifiers::{Expiry, Modifier, ModifierKind, ModifierStack, ModifierTarget};
pub use output::{RunStats, RunSummary};
pub use reinforcement::{ReinforcementBatch, ReinforcementQueue};
pub use session::Session;
pub use state::{SimulationState, StateSnapshot, TerminalReason};
pub use turn::{TurnEngine, TurnOutcome};
