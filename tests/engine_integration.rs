//! Turn engine integration tests

use defense_entropy::core::config::EngineConfig;
use defense_entropy::core::error::EngineError;
use defense_entropy::core::types::{Metric, Trigger};
use defense_entropy::engine::*;
use defense_entropy::scenario::{Choice, Scenario, ScenarioCatalog};

/// Engine over a single pool scenario, so the same choices are always on offer
fn engine_with(choices: Vec<Choice>) -> TurnEngine {
    let mut scenario = Scenario::new("situation", "Situation");
    scenario.choices = choices;
    TurnEngine::new(EngineConfig::default(), ScenarioCatalog::new(vec![scenario]).unwrap()).unwrap()
}

fn noop() -> Choice {
    Choice::new("Wait", "Do nothing", EffectSpec::new("x"))
}

fn base_efficiency() -> f64 {
    1.0 / (1.0 + 0.1 * 1.25_f64.exp())
}

fn territory_losses(events: &[TurnEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            TurnEvent::TerritoryLost { km2 } => Some(*km2),
            _ => None,
        })
        .collect()
}

#[test]
fn test_end_to_end_noop_turn() {
    let engine = engine_with(vec![noop()]);
    let state = engine.initialize().unwrap();
    assert_eq!(state.turn, 1);

    let outcome = engine.apply(&state, 0).unwrap();
    let next = outcome.state;

    assert!((next.efficiency - base_efficiency()).abs() < 1e-12);
    assert!((next.density - 1.1111).abs() < 1e-4);
    assert!((next.territory - 99_932.6).abs() < 0.1);
    assert_eq!(next.manpower, 198_000);
    assert_eq!(next.turn, 2);
    assert!(!next.is_terminal());

    let losses = territory_losses(&outcome.events);
    assert_eq!(losses.len(), 1);
    assert!((losses[0] - 67.4).abs() < 0.1);
    assert_eq!(
        outcome.log_entries,
        vec![
            "Week 1: x".to_string(),
            "Territory lost: -67 km².".to_string(),
            "Desertion this week: -2000 personnel.".to_string(),
        ]
    );
}

#[test]
fn test_caller_state_is_untouched() {
    let engine = engine_with(vec![noop()]);
    let state = engine.initialize().unwrap();
    let before = state.snapshot();

    engine.apply(&state, 0).unwrap();
    assert_eq!(state.snapshot(), before);
}

#[test]
fn test_replay_is_deterministic() {
    let play = || {
        let engine = TurnEngine::new(EngineConfig::default().with_seed(99), ScenarioCatalog::standard().unwrap()).unwrap();
        let mut state = engine.initialize().unwrap();
        let mut history = vec![(state.snapshot(), Vec::new())];

        for week in 0..40usize {
            if state.is_terminal() {
                break;
            }
            let choices = engine.scenario(&state).unwrap().choices.len();
            let outcome = engine.apply(&state, week % choices).unwrap();
            history.push((outcome.state.snapshot(), outcome.log_entries));
            state = outcome.state;
        }
        history
    };

    assert_eq!(play(), play());
}

#[test]
fn test_replay_from_recorded_state() {
    let engine = TurnEngine::new(EngineConfig::default(), ScenarioCatalog::standard().unwrap()).unwrap();
    let mut state = engine.initialize().unwrap();
    for _ in 0..5 {
        state = engine.apply(&state, 1).unwrap().state;
    }

    let recorded = state.clone();
    let first = engine.apply(&state, 0).unwrap();
    let second = engine.apply(&recorded, 0).unwrap();
    assert_eq!(first.state.snapshot(), second.state.snapshot());
    assert_eq!(first.log_entries, second.log_entries);
}

#[test]
fn test_territorial_collapse_outranks_manpower_collapse() {
    let doom = Choice::custom("Doom", |_: &SimulationState| {
        EffectDelta::log("Everything fails at once.")
            .set(Metric::Territory, -10.0)
            .set(Metric::Manpower, 0.0)
            .set(Metric::Support, 0.0)
            .set(Metric::Reputation, 0.0)
    });
    let engine = engine_with(vec![doom]);
    let state = engine.initialize().unwrap();

    let outcome = engine.apply(&state, 0).unwrap();
    assert_eq!(outcome.state.terminal_reason, Some(TerminalReason::TerritorialCollapse));
    assert_eq!(
        outcome.log_entries.last().unwrap(),
        &format!("Collapse: {}", TerminalReason::TerritorialCollapse)
    );
}

#[test]
fn test_manpower_collapse_outranks_legitimacy() {
    let doom = Choice::custom("Doom", |_: &SimulationState| {
        EffectDelta::log("The army dissolves.")
            .set(Metric::Manpower, 100.0)
            .set(Metric::Support, 0.0)
            .set(Metric::Reputation, 0.0)
    });
    let engine = engine_with(vec![doom]);
    let outcome = engine.apply(&engine.initialize().unwrap(), 0).unwrap();
    assert_eq!(outcome.state.terminal_reason, Some(TerminalReason::ManpowerCollapse));
}

#[test]
fn test_terminal_state_is_absorbing() {
    let doom = Choice::custom("Doom", |_: &SimulationState| {
        EffectDelta::log("Lost.").set(Metric::Territory, 0.0)
    });
    let engine = engine_with(vec![doom]);
    let terminal = engine.apply(&engine.initialize().unwrap(), 0).unwrap().state;
    let frozen = terminal.snapshot();

    assert!(matches!(engine.apply(&terminal, 0), Err(EngineError::IllegalState(_))));
    let scenario = engine.catalog().get(&"situation".into()).unwrap();
    assert!(matches!(
        engine.apply_choice(&terminal, scenario, 0),
        Err(EngineError::IllegalState(_))
    ));
    assert_eq!(terminal.snapshot(), frozen);
}

#[test]
fn test_out_of_range_choice() {
    let engine = engine_with(vec![noop(), noop(), noop()]);
    let state = engine.initialize().unwrap();
    assert!(matches!(
        engine.apply(&state, 3),
        Err(EngineError::InvalidChoice { index: 3, available: 3 })
    ));
}

#[test]
fn test_reinforcement_arrives_on_the_following_turn() {
    let replenish = Choice::new("Replenish", "", EffectSpec::new("Replenish.").reinforce(5_000, 2));
    let engine = engine_with(vec![noop(), replenish]);
    let state = engine.initialize().unwrap();

    let first = engine.apply(&state, 1).unwrap();
    assert_eq!(first.state.manpower, 198_000);
    assert_eq!(first.state.reinforcements.len(), 1);
    assert_eq!(first.state.reinforcements.batches()[0].turns_remaining, 1);
    assert!(!first.log_entries.iter().any(|l| l.starts_with("Reinforcements")));

    let second = engine.apply(&first.state, 0).unwrap();
    let arrived = (5_000.0 * 0.7_f64).floor() as u64;
    let before_awol = 198_000 + arrived;
    let awol = (before_awol as f64 * 0.01).floor() as u64;

    assert!(second.state.reinforcements.is_empty());
    assert_eq!(second.state.manpower, before_awol - awol);
    assert_eq!(
        second.log_entries[1],
        "Reinforcements arrived: +3500 (mobilized 5000, lost to the leaky bucket 1500)"
    );
}

#[test]
fn test_low_morale_reinforcements_leak_more() {
    let desperate = Choice::custom("Draft", |_: &SimulationState| {
        EffectDelta::log("Draft.")
            .set(Metric::Morale, 30.0)
            .with_reinforcement(15_000, 0)
    });
    let engine = engine_with(vec![desperate]);
    let outcome = engine.apply(&engine.initialize().unwrap(), 0).unwrap();

    let arrived = (15_000.0 * (0.7 - 0.2_f64)).floor() as u64;
    let expected = TurnEvent::ReinforcementsArrived {
        arrived,
        mobilized: 15_000,
        leaked: 15_000 - arrived,
    };
    assert!(outcome.events.contains(&expected));
}

#[test]
fn test_territory_loss_modifier_lasts_its_duration() {
    let strike = Choice::new(
        "Deep strike",
        "",
        EffectSpec::new("Strike.").modifier(ModifierSpec {
            target: ModifierTarget::TerritoryLoss,
            multiply: Some(0.8),
            add: None,
            turns: Some(2),
            permanent: false,
        }),
    );
    let engine = engine_with(vec![noop(), strike]);
    let full = 50.0 / base_efficiency();

    let mut state = engine.initialize().unwrap();
    let mut losses = Vec::new();
    for index in [1, 0, 0] {
        let outcome = engine.apply(&state, index).unwrap();
        losses.extend(territory_losses(&outcome.events));
        state = outcome.state;
    }

    assert!((losses[0] - full * 0.8).abs() < 1e-9);
    assert!((losses[1] - full * 0.8).abs() < 1e-9);
    assert!((losses[2] - full).abs() < 1e-9);
}

#[test]
fn test_permanent_modifier_with_configured_default() {
    let mut config = EngineConfig::default();
    config.modifiers.default_duration_turns = 3;

    let shock = Choice::custom("Shock", |_: &SimulationState| {
        EffectDelta::log("Shock.").with_modifier(ModifierTarget::Efficiency, ModifierKind::Multiply(0.9), None)
    });
    let scar = Choice::custom("Scar", |_: &SimulationState| {
        EffectDelta::log("Scar.").with_modifier(ModifierTarget::Density, ModifierKind::Add(-0.1), Some(Expiry::Permanent))
    });
    let mut scenario = Scenario::new("situation", "Situation");
    scenario.choices = vec![noop(), shock, scar];
    let engine = TurnEngine::new(config, ScenarioCatalog::new(vec![scenario]).unwrap()).unwrap();

    let mut state = engine.initialize().unwrap();
    state = engine.apply(&state, 1).unwrap().state;
    state = engine.apply(&state, 2).unwrap().state;
    for _ in 0..4 {
        state = engine.apply(&state, 0).unwrap().state;
    }

    // The timed shock has expired; the permanent density penalty remains
    assert_eq!(state.modifiers.len(), 1);
    assert_eq!(state.modifiers.iter().next().unwrap().expiry, Expiry::Permanent);
}

#[test]
fn test_breach_threat_offered_when_density_falls() {
    let thin = Choice::custom("Thin out", |_: &SimulationState| {
        EffectDelta::log("Brigades redeployed.").set(Metric::Manpower, 80_000.0)
    });
    let calm = Scenario::new("calm", "Calm").with_choice(thin);
    let breach = Scenario::new("breach", "Breach")
        .with_trigger(Trigger::BreachThreat)
        .with_choice(noop());
    let engine = TurnEngine::new(EngineConfig::default(), ScenarioCatalog::new(vec![calm, breach]).unwrap()).unwrap();

    let state = engine.initialize().unwrap();
    assert_eq!(engine.scenario(&state).unwrap().id.as_str(), "calm");

    let next = engine.apply(&state, 0).unwrap().state;
    assert!(next.density < 0.5);
    assert_eq!(engine.scenario(&next).unwrap().id.as_str(), "breach");
}

#[test]
fn test_non_finite_custom_effect_is_rejected() {
    let broken = Choice::custom("Broken", |_: &SimulationState| {
        EffectDelta::log("Broken.").set(Metric::Territory, f64::INFINITY)
    });
    let engine = engine_with(vec![broken]);
    let state = engine.initialize().unwrap();
    assert!(matches!(engine.apply(&state, 0), Err(EngineError::Config(_))));
}

#[test]
fn test_session_tracks_statistics() {
    let engine = engine_with(vec![noop()]);
    let mut session = Session::new(engine).unwrap();
    for _ in 0..3 {
        session.choose(0).unwrap();
    }

    let stats = session.stats();
    assert_eq!(stats.turns_played, 3);
    assert!(stats.deserters > 5_000);
    assert!((stats.territory_lost - 3.0 * 50.0 / base_efficiency()).abs() < 1e-6);

    let summary = session.summary();
    assert_eq!(summary.journal.len(), 3);
    assert_eq!(summary.final_state.turn, 4);
}
