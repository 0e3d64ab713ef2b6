//! Defense Entropy - Turn-Based Attrition Simulation
//!
//! A player picks one response per week to the situation on offer; the
//! engine merges the choice, delivers delayed reinforcements, recomputes
//! command efficiency and front density, applies territory and desertion
//! losses and checks for collapse.

pub mod core;
pub mod engine;
pub mod scenario;
