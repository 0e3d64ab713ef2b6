//! Turn resolution
//!
//! `TurnEngine` holds only immutable inputs: config, catalog and selection
//! policy. Every turn takes the current [`SimulationState`] by reference and
//! returns the next one, so a failed turn leaves the caller's state intact
//! and any recorded state can be replayed.

use std::fmt;

use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, Result};
use crate::core::types::clamp_percentage;
use crate::engine::attrition;
use crate::engine::effect::{EffectDelta, ModifierRequest};
use crate::engine::events::{self, TurnEvent, CRITICAL_TERRITORY_LOSS, HEAVY_DESERTION};
use crate::engine::formulas::BaseMetrics;
use crate::engine::modifiers::{Expiry, Modifier, ModifierKind, ModifierTarget};
use crate::engine::reinforcement::{self, Arrivals};
use crate::engine::state::{SimulationState, TerminalReason};
use crate::scenario::catalog::{Scenario, ScenarioCatalog};
use crate::scenario::selector::{default_selector, ScenarioSelector};

/// Result of resolving one turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub state: SimulationState,
    /// Player-facing log lines, in the order they happened
    pub log_entries: Vec<String>,
    pub events: Vec<TurnEvent>,
}

pub struct TurnEngine {
    config: EngineConfig,
    catalog: ScenarioCatalog,
    selector: Box<dyn ScenarioSelector>,
}

impl fmt::Debug for TurnEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnEngine")
            .field("seed", &self.config.seed)
            .field("scenarios", &self.catalog.len())
            .field("selector", &self.selector.name())
            .finish()
    }
}

impl TurnEngine {
    /// Engine with the threshold selection policy
    pub fn new(config: EngineConfig, catalog: ScenarioCatalog) -> Result<Self> {
        let selector = default_selector(&config);
        Self::with_selector(config, catalog, selector)
    }

    pub fn with_selector(
        config: EngineConfig,
        catalog: ScenarioCatalog,
        selector: Box<dyn ScenarioSelector>,
    ) -> Result<Self> {
        config.validate()?;
        if catalog.is_empty() {
            return Err(EngineError::config("scenario catalog is empty"));
        }
        Ok(Self {
            config,
            catalog,
            selector,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    pub fn selector_name(&self) -> &'static str {
        self.selector.name()
    }

    /// Fresh baseline state with its first scenario selected
    pub fn initialize(&self) -> Result<SimulationState> {
        let mut state = SimulationState::baseline(&self.config);
        self.select_next(&mut state)?;
        tracing::debug!(
            seed = self.config.seed,
            scenario = ?state.scenario,
            "Initialized simulation state"
        );
        Ok(state)
    }

    /// Scenario currently on offer; stable until the next turn resolves
    pub fn scenario<'a>(&'a self, state: &SimulationState) -> Result<&'a Scenario> {
        if state.is_terminal() {
            return Err(EngineError::illegal_state("the run has ended; no scenario is on offer"));
        }
        let id = state
            .scenario
            .as_ref()
            .ok_or_else(|| EngineError::illegal_state("state has no scenario selected"))?;
        self.catalog
            .get(id)
            .ok_or_else(|| EngineError::illegal_state(format!("scenario `{}` is not in the catalog", id)))
    }

    /// Resolve the current scenario's choice at `choice_index`
    pub fn apply(&self, state: &SimulationState, choice_index: usize) -> Result<TurnOutcome> {
        let scenario = self.scenario(state)?;
        self.apply_choice(state, scenario, choice_index)
    }

    /// Resolve one turn.
    ///
    /// `scenario` must be the scenario currently on offer for `state`.
    pub fn apply_choice(&self, state: &SimulationState, scenario: &Scenario, choice_index: usize) -> Result<TurnOutcome> {
        if state.is_terminal() {
            return Err(EngineError::illegal_state("cannot apply a choice after the run has ended"));
        }
        if state.scenario.as_ref() != Some(&scenario.id) {
            return Err(EngineError::illegal_state(format!(
                "scenario `{}` is not the one on offer",
                scenario.id
            )));
        }
        let choice = scenario.choice(choice_index).ok_or(EngineError::InvalidChoice {
            index: choice_index,
            available: scenario.choices.len(),
        })?;

        let mut next = state.clone();
        let mut events = Vec::new();

        // 1. Evaluate and merge the choice effect
        let delta = choice.effect.evaluate(state);
        let mut non_finite = delta_non_finite(&delta);
        events.push(TurnEvent::ChoiceApplied {
            turn: state.turn,
            log: delta.log.clone(),
        });
        self.merge(&mut next, &delta);

        let mut immediate = None;
        if let Some(order) = delta.enqueue_reinforcement {
            if order.delay_turns == 0 {
                if order.amount == 0 {
                    return Err(EngineError::config("reinforcement amount must be positive"));
                }
                immediate = Some(order.amount);
            } else {
                next.reinforcements.enqueue(order.amount, order.delay_turns)?;
            }
        }

        // 2. Advance the pipeline at post-choice morale
        let constants = &self.config.reinforcement;
        let mut arrivals = next.reinforcements.advance(next.morale, constants);
        if let Some(amount) = immediate {
            let (arrived, leaked) = reinforcement::convert(amount, next.morale, constants);
            arrivals.arrived += arrived;
            arrivals.leaked += leaked;
            arrivals.mobilized += amount;
            arrivals.batches += 1;
        }
        next.manpower = next.manpower.saturating_add(arrivals.arrived);
        if !arrivals.is_empty() {
            tracing::debug!(
                arrived = arrivals.arrived,
                leaked = arrivals.leaked,
                batches = arrivals.batches,
                "Reinforcements arrived"
            );
            events.push(arrival_event(&arrivals));
        }

        // 3. Recompute derived metrics and fold in modifiers
        self.recompute(&mut next);

        // 4. Territory loss
        let base_loss = attrition::territory_loss(next.density, next.efficiency, &self.config.attrition);
        let territory_loss = next.modifiers.fold(ModifierTarget::TerritoryLoss, base_loss).max(0.0);
        next.territory -= territory_loss;
        if territory_loss > CRITICAL_TERRITORY_LOSS {
            tracing::warn!(loss = territory_loss, density = next.density, "Critical territory loss");
        }
        events.push(TurnEvent::TerritoryLost { km2: territory_loss });

        // 5. Desertion
        let deserters = attrition::awol_loss(next.manpower, next.morale, &self.config.attrition);
        next.manpower -= deserters;
        if deserters > HEAVY_DESERTION {
            tracing::warn!(deserters, morale = next.morale, "Heavy desertion");
        }
        events.push(TurnEvent::Desertion { deserters });

        // 6. Age modifiers
        for expired in next.modifiers.age() {
            tracing::debug!(target_metric = ?expired.target, source = %expired.source, "Modifier expired");
            events.push(TurnEvent::ModifierExpired {
                target: expired.target,
                source: expired.source,
            });
        }

        // 7. Weekly decay
        next.budget = clamp_percentage(next.budget - self.config.decay.budget_per_turn);
        next.morale = clamp_percentage(next.morale - self.config.decay.morale_per_turn);

        // 8. Advance the clock
        next.turn += 1;

        // 9. Terminal conditions
        next.terminal_reason = self.terminal_reason(&next);

        non_finite.extend(next.non_finite_fields());
        if !non_finite.is_empty() {
            tracing::warn!(fields = ?non_finite, turn = state.turn, "Effect produced non-finite values");
            return Err(EngineError::config(format!(
                "choice `{}` of scenario `{}` produced non-finite values: {}",
                choice.label,
                scenario.id,
                non_finite.join(", ")
            )));
        }

        // 10. Next decision point
        match next.terminal_reason {
            Some(reason) => {
                next.scenario = None;
                tracing::info!(turn = next.turn, reason = reason.name(), "Run collapsed");
                events.push(TurnEvent::Collapse { reason });
            }
            None => self.select_next(&mut next)?,
        }

        tracing::debug!(
            turn = next.turn,
            territory = next.territory,
            manpower = next.manpower,
            efficiency = next.efficiency,
            density = next.density,
            "Turn resolved"
        );

        let log_entries = events::render_log(&events);
        Ok(TurnOutcome {
            state: next,
            log_entries,
            events,
        })
    }

    fn merge(&self, next: &mut SimulationState, delta: &EffectDelta) {
        if let Some(territory) = delta.territory {
            next.territory = territory;
        }
        if let Some(front_length) = delta.front_length {
            next.front_length = front_length.max(self.config.density.front_length_floor);
        }
        if let Some(manpower) = delta.manpower {
            next.manpower = manpower.floor().max(0.0) as u64;
        }
        if let Some(units) = delta.units {
            next.units = units.floor().clamp(1.0, f64::from(u32::MAX)) as u32;
        }
        if let Some(morale) = delta.morale {
            next.morale = clamp_percentage(morale);
        }
        if let Some(support) = delta.support {
            next.support = clamp_percentage(support);
        }
        if let Some(reputation) = delta.reputation {
            next.reputation = clamp_percentage(reputation);
        }
        if let Some(budget) = delta.budget {
            next.budget = clamp_percentage(budget);
        }

        for request in &delta.modifiers {
            next.modifiers.push(self.modifier_from(request, &delta.log));
        }
    }

    fn modifier_from(&self, request: &ModifierRequest, source: &str) -> Modifier {
        let default_turns = self.config.modifiers.default_duration_turns;
        Modifier {
            target: request.target,
            kind: request.kind,
            expiry: request.expiry.unwrap_or(Expiry::Turns(default_turns)),
            source: source.to_string(),
        }
    }

    fn recompute(&self, next: &mut SimulationState) {
        let base = BaseMetrics::compute(
            next.units,
            next.manpower,
            next.front_length,
            &self.config.efficiency,
            &self.config.density,
        );
        next.efficiency = next
            .modifiers
            .fold(ModifierTarget::Efficiency, base.efficiency)
            .max(self.config.efficiency.min_efficiency);
        next.density = next.modifiers.fold(ModifierTarget::Density, base.density).max(0.0);

        tracing::debug!(
            base_efficiency = base.efficiency,
            efficiency = next.efficiency,
            base_density = base.density,
            density = next.density,
            "Derived metrics recomputed"
        );
    }

    /// First matching collapse condition, in priority order
    fn terminal_reason(&self, state: &SimulationState) -> Option<TerminalReason> {
        if state.territory <= 0.0 {
            Some(TerminalReason::TerritorialCollapse)
        } else if state.manpower <= self.config.terminal.manpower_floor {
            Some(TerminalReason::ManpowerCollapse)
        } else if state.support <= 0.0 && state.reputation <= 0.0 {
            Some(TerminalReason::LegitimacyCollapse)
        } else {
            None
        }
    }

    fn select_next(&self, state: &mut SimulationState) -> Result<()> {
        let mut selection = state.selector.clone();
        let id = self.selector.select(state, &self.catalog, &mut selection)?;
        state.selector = selection;
        state.scenario = Some(id);
        Ok(())
    }
}

fn arrival_event(arrivals: &Arrivals) -> TurnEvent {
    TurnEvent::ReinforcementsArrived {
        arrived: arrivals.arrived,
        mobilized: arrivals.mobilized,
        leaked: arrivals.leaked,
    }
}

fn delta_non_finite(delta: &EffectDelta) -> Vec<&'static str> {
    let fields = [
        ("territory", delta.territory),
        ("front_length", delta.front_length),
        ("manpower", delta.manpower),
        ("units", delta.units),
        ("morale", delta.morale),
        ("support", delta.support),
        ("reputation", delta.reputation),
        ("budget", delta.budget),
    ];
    let mut bad: Vec<&'static str> = fields
        .iter()
        .filter(|(_, value)| value.map_or(false, |v| !v.is_finite()))
        .map(|(name, _)| *name)
        .collect();

    let modifier_ok = delta.modifiers.iter().all(|m| match m.kind {
        ModifierKind::Multiply(v) | ModifierKind::Add(v) => v.is_finite(),
    });
    if !modifier_ok {
        bad.push("modifier");
    }
    bad
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Metric;
    use crate::engine::effect::EffectSpec;
    use crate::scenario::catalog::Choice;

    fn engine_with(choices: Vec<Choice>) -> (TurnEngine, SimulationState) {
        let mut scenario = Scenario::new("test", "Test");
        scenario.choices = choices;
        let catalog = ScenarioCatalog::new(vec![scenario]).unwrap();
        let engine = TurnEngine::new(EngineConfig::default(), catalog).unwrap();
        let state = engine.initialize().unwrap();
        (engine, state)
    }

    fn noop() -> Choice {
        Choice::new("wait", "", EffectSpec::new("x"))
    }

    #[test]
    fn test_noop_turn_matches_reference_values() {
        let (engine, state) = engine_with(vec![noop()]);
        let outcome = engine.apply(&state, 0).unwrap();
        let next = &outcome.state;

        let efficiency = 1.0 / (1.0 + 0.1 * 1.25_f64.exp());
        assert!((next.efficiency - efficiency).abs() < 1e-12);
        assert!((next.density - 200_000.0 / 1_200.0 / 150.0).abs() < 1e-12);
        assert!((next.territory - (100_000.0 - 50.0 / efficiency)).abs() < 1e-9);
        assert_eq!(next.manpower, 198_000);
        assert_eq!(next.turn, 2);
        assert_eq!(next.morale, 74.0);
        assert_eq!(next.budget, 58.0);

        assert_eq!(outcome.log_entries[0], "Week 1: x");
        assert_eq!(outcome.log_entries[1], "Territory lost: -67 km².");
        assert_eq!(outcome.log_entries[2], "Desertion this week: -2000 personnel.");
    }

    #[test]
    fn test_invalid_choice_index() {
        let (engine, state) = engine_with(vec![noop(), noop()]);
        let err = engine.apply(&state, 2).unwrap_err();
        assert!(matches!(err, EngineError::InvalidChoice { index: 2, available: 2 }));
    }

    #[test]
    fn test_wrong_scenario_rejected() {
        let (engine, state) = engine_with(vec![noop()]);
        let other = Scenario::new("other", "Other").with_choice(noop());
        assert!(matches!(
            engine.apply_choice(&state, &other, 0),
            Err(EngineError::IllegalState(_))
        ));
    }

    #[test]
    fn test_terminal_state_rejects_choices() {
        let collapse = Choice::custom("surrender", |_: &SimulationState| {
            EffectDelta::log("surrender").set(Metric::Territory, 0.0)
        });
        let (engine, state) = engine_with(vec![collapse]);

        let outcome = engine.apply(&state, 0).unwrap();
        assert_eq!(outcome.state.terminal_reason, Some(TerminalReason::TerritorialCollapse));
        assert!(outcome.state.scenario.is_none());

        let scenario = engine.catalog().get(&"test".into()).unwrap();
        assert!(matches!(
            engine.apply_choice(&outcome.state, scenario, 0),
            Err(EngineError::IllegalState(_))
        ));
        assert!(matches!(engine.scenario(&outcome.state), Err(EngineError::IllegalState(_))));
    }

    #[test]
    fn test_scenario_is_stable_between_turns() {
        let (engine, state) = engine_with(vec![noop()]);
        let first = engine.scenario(&state).unwrap().id.clone();
        let second = engine.scenario(&state).unwrap().id.clone();
        assert_eq!(first, second);
    }

    #[test]
    fn test_same_turn_reinforcement_bypasses_queue() {
        let rush = Choice::new("rush", "", EffectSpec::new("rush").reinforce(5_000, 0));
        let (engine, state) = engine_with(vec![rush]);

        let outcome = engine.apply(&state, 0).unwrap();
        let arrived = (5_000.0 * 0.7_f64).floor() as u64;
        let before_awol = 200_000 + arrived;
        let awol = (before_awol as f64 * 0.01).floor() as u64;

        assert!(outcome.state.reinforcements.is_empty());
        assert_eq!(outcome.state.manpower, before_awol - awol);
        assert!(outcome.log_entries[1].starts_with("Reinforcements arrived: +3500"));
    }

    #[test]
    fn test_efficiency_modifier_survives_recomputation() {
        let shock = Choice::custom("shock", |_: &SimulationState| {
            EffectDelta::log("shock").with_modifier(ModifierTarget::Efficiency, ModifierKind::Multiply(0.5), None)
        });
        let (engine, state) = engine_with(vec![shock, noop()]);
        let base = state.efficiency;

        let shocked = engine.apply(&state, 0).unwrap().state;
        assert!((shocked.efficiency - base * 0.5).abs() < 1e-12);
        assert!((shocked.territory - (100_000.0 - 50.0 / (base * 0.5))).abs() < 1e-9);
        assert!(shocked.modifiers.is_empty());

        let recovered = engine.apply(&shocked, 1).unwrap().state;
        assert!((recovered.efficiency - base).abs() < 1e-12);
    }

    #[test]
    fn test_efficiency_floor_applies() {
        let shock = Choice::custom("shock", |_: &SimulationState| {
            EffectDelta::log("shock").with_modifier(ModifierTarget::Efficiency, ModifierKind::Multiply(0.0), None)
        });
        let (engine, state) = engine_with(vec![shock]);
        let next = engine.apply(&state, 0).unwrap().state;
        assert_eq!(next.efficiency, engine.config().efficiency.min_efficiency);
        assert!(next.territory.is_finite());
    }

    #[test]
    fn test_front_length_clamped_to_floor() {
        let shrink = Choice::custom("shrink", |_: &SimulationState| {
            EffectDelta::log("shrink").set(Metric::FrontLength, 10.0)
        });
        let (engine, state) = engine_with(vec![shrink]);
        assert_eq!(engine.apply(&state, 0).unwrap().state.front_length, 800.0);
    }

    #[test]
    fn test_units_and_manpower_floors() {
        let purge = Choice::custom("purge", |_: &SimulationState| {
            let mut delta = EffectDelta::log("purge");
            delta.units = Some(-4.0);
            delta.morale = Some(250.0);
            delta.support = Some(-10.0);
            delta
        });
        let (engine, state) = engine_with(vec![purge]);
        let next = engine.apply(&state, 0).unwrap().state;
        assert_eq!(next.units, 1);
        assert_eq!(next.morale, 99.0);
        assert_eq!(next.support, 0.0);
    }

    #[test]
    fn test_non_finite_effect_is_config_error() {
        let broken = Choice::custom("broken", |_: &SimulationState| {
            EffectDelta::log("broken").set(Metric::Morale, f64::NAN)
        });
        let (engine, state) = engine_with(vec![broken]);
        assert!(matches!(engine.apply(&state, 0), Err(EngineError::Config(_))));
        assert_eq!(state.turn, 1);
    }

    #[test]
    fn test_non_finite_headcount_is_config_error() {
        for (metric, value) in [
            (Metric::Manpower, f64::NAN),
            (Metric::Manpower, f64::INFINITY),
            (Metric::Units, f64::NAN),
            (Metric::Units, f64::NEG_INFINITY),
        ] {
            let broken = Choice::custom("broken", move |_: &SimulationState| {
                EffectDelta::log("broken").set(metric, value)
            });
            let (engine, state) = engine_with(vec![broken]);
            match engine.apply(&state, 0) {
                Err(EngineError::Config(msg)) => assert!(msg.contains(&metric.to_string()), "{}", msg),
                other => panic!("{} = {} gave {:?}", metric, value, other.map(|o| o.state.turn)),
            }
        }
    }

    #[test]
    fn test_fractional_headcount_floored_on_merge() {
        let trim = Choice::custom("trim", |_: &SimulationState| {
            EffectDelta::log("trim").set(Metric::Units, 12.9).set(Metric::Manpower, 150_000.7)
        });
        let (engine, state) = engine_with(vec![trim]);
        let next = engine.apply(&state, 0).unwrap().state;
        assert_eq!(next.units, 12);
        assert_eq!(next.manpower, 150_000 - (150_000.0_f64 * 0.01).floor() as u64);
    }

    #[test]
    fn test_legitimacy_collapse() {
        let scandal = Choice::custom("scandal", |_: &SimulationState| {
            EffectDelta::log("scandal")
                .set(Metric::Support, 0.0)
                .set(Metric::Reputation, 0.0)
        });
        let (engine, state) = engine_with(vec![scandal]);
        let outcome = engine.apply(&state, 0).unwrap();
        assert_eq!(outcome.state.terminal_reason, Some(TerminalReason::LegitimacyCollapse));
        assert!(outcome.log_entries.last().unwrap().starts_with("Collapse:"));
    }

    #[test]
    fn test_manpower_collapse_at_floor() {
        let rout = Choice::custom("rout", |_: &SimulationState| {
            EffectDelta::log("rout").set(Metric::Manpower, 5_000.0)
        });
        let (engine, state) = engine_with(vec![rout]);
        let outcome = engine.apply(&state, 0).unwrap();
        assert_eq!(outcome.state.terminal_reason, Some(TerminalReason::ManpowerCollapse));
    }

    #[test]
    fn test_empty_catalog_rejected_by_engine() {
        assert!(ScenarioCatalog::new(Vec::new()).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.initial.front_length = -5.0;
        let catalog = ScenarioCatalog::standard().unwrap();
        assert!(matches!(TurnEngine::new(config, catalog), Err(EngineError::Config(_))));
    }
}
