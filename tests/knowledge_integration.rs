//! Knowledge store integration tests
//!
//! Exercises the full learn / generalize / persist lifecycle through the
//! public API: recording experiences, outcome flipping, rule merging, and
//! the JSON round trip.

use veldt::core::types::{state_keys, Outcome, PredatorAction, State};
use veldt::knowledge::{Condition, KnowledgeStore, Rule};

fn hunt_state(spot: i64, distance: &str, prey_action: &str, hidden: bool) -> State {
    let mut state = State::new();
    state.insert(state_keys::POSITION.to_string(), spot.into());
    state.insert(state_keys::DISTANCE.to_string(), distance.into());
    state.insert(state_keys::PREY_ACTION.to_string(), prey_action.into());
    state.insert(state_keys::HIDDEN.to_string(), hidden.into());
    state
}

fn test_store(seed: u64) -> KnowledgeStore {
    KnowledgeStore::with_seed(PredatorAction::vocabulary(), seed)
}

#[test]
fn test_learning_lifecycle() {
    let mut store = test_store(7);
    let state = hunt_state(3, "far", "beber", false);

    // Three identical successes fold into a single rule
    for _ in 0..3 {
        store.record_experience(&state, "advance", Outcome::Success);
    }
    assert_eq!(store.len(), 1);
    let rule = &store.rules()[0];
    assert_eq!(rule.observation_count, 3);
    assert_eq!(rule.success_rate, 1.0);

    // With exploration off, the learned rule drives the choice
    let (action, matched) = store.best_action(&state, 0.0);
    assert_eq!(action, "advance");
    assert!(matched.is_some());

    // An unseen state falls back to a random action with no rule
    let unseen = hunt_state(8, "very_close", "huir", true);
    let (_, matched) = store.best_action(&unseen, 0.0);
    assert!(matched.is_none());
}

#[test]
fn test_outcome_label_self_corrects() {
    let state = hunt_state(2, "close", "ver_frente", false);
    let mut rule = Rule::from_state(&state, "attack", Outcome::Failure);

    // Mounting successes push the rate past 0.7 and flip the label
    rule.update(Outcome::Success);
    rule.update(Outcome::Success);
    assert_eq!(rule.outcome, Outcome::Failure);
    rule.update(Outcome::Success);
    assert_eq!(rule.observation_count, 4);
    assert!(rule.success_rate > 0.7);
    assert_eq!(rule.outcome, Outcome::Success);
}

#[test]
fn test_merge_survives_round_trip() {
    let mut store = test_store(11);
    store.record_experience(&hunt_state(3, "far", "beber", false), "advance", Outcome::Success);
    store.record_experience(&hunt_state(4, "far", "beber", false), "advance", Outcome::Success);
    assert_eq!(store.len(), 2);

    // The two rules differ only in position, so one pass merges them
    assert_eq!(store.generalize(), 1);
    assert_eq!(store.len(), 1);
    let merged = &store.rules()[0];
    assert_eq!(merged.observation_count, 2);
    assert!(matches!(
        merged.conditions.get(state_keys::POSITION),
        Some(Condition::Set(values)) if values.len() == 2
    ));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("knowledge.json");
    store.save(&path).unwrap();

    let mut reloaded = test_store(0);
    assert_eq!(reloaded.load(&path).unwrap(), 1);

    // The generalized rule still covers both origin states
    for spot in [3, 4] {
        let matches = reloaded.find_matching(&hunt_state(spot, "far", "beber", false));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].action, "advance");
    }
    assert!(reloaded
        .find_matching(&hunt_state(5, "far", "beber", false))
        .is_empty());
}

#[test]
fn test_exact_rule_regrows_next_to_general_one() {
    let mut store = test_store(3);
    let state_a = hunt_state(1, "medium", "beber", false);
    let state_b = hunt_state(2, "medium", "beber", false);
    store.record_experience(&state_a, "hide", Outcome::Success);
    store.record_experience(&state_b, "hide", Outcome::Success);
    store.generalize();
    assert_eq!(store.len(), 1);

    // Recording an already-covered state grows a fresh exact rule
    store.record_experience(&state_a, "hide", Outcome::Success);
    assert_eq!(store.len(), 2);
    assert_eq!(store.find_matching(&state_a).len(), 2);
    assert_eq!(store.find_matching(&state_b).len(), 1);
}

#[test]
fn test_heavier_evidence_wins_and_ties_go_to_scan_order() {
    let mut store = test_store(5);
    let state = hunt_state(6, "medium", "ver_izquierda", false);

    store.record_experience(&state, "advance", Outcome::Success);
    for _ in 0..3 {
        store.record_experience(&state, "hide", Outcome::Success);
    }

    // weight = success_rate * observation_count favors the heavier rule
    let (action, _) = store.best_action(&state, 0.0);
    assert_eq!(action, "hide");

    // On equal weight the earlier rule wins
    let mut store = test_store(5);
    store.record_experience(&state, "advance", Outcome::Success);
    store.record_experience(&state, "hide", Outcome::Success);
    let (action, _) = store.best_action(&state, 0.0);
    assert_eq!(action, "advance");
}

#[test]
fn test_known_failures_steer_toward_untried_action() {
    let mut store = test_store(9);
    let state = hunt_state(7, "close", "huir", false);
    store.record_experience(&state, "advance", Outcome::Failure);
    store.record_experience(&state, "attack", Outcome::Failure);

    // hide is the only action without a recorded failure here
    for _ in 0..20 {
        let (action, matched) = store.best_action(&state, 0.0);
        assert_eq!(action, "hide");
        assert!(matched.is_none());
    }
}

#[test]
fn test_missing_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = test_store(1);
    assert_eq!(store.load(&dir.path().join("absent.json")).unwrap(), 0);
    assert!(store.is_empty());
}

#[test]
fn test_malformed_file_resets_store_but_keeps_it_usable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    let mut store = test_store(1);
    let state = hunt_state(1, "far", "beber", false);
    store.record_experience(&state, "advance", Outcome::Success);

    assert!(store.load(&path).is_err());
    assert!(store.is_empty());

    store.record_experience(&state, "advance", Outcome::Success);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_prune_thresholds() {
    let mut store = test_store(2);

    // count 1 with rate 1.0 survives, count 1 with rate 0.0 does not
    store.record_experience(&hunt_state(1, "far", "beber", false), "advance", Outcome::Success);
    store.record_experience(&hunt_state(2, "far", "huir", false), "attack", Outcome::Failure);

    // count 2 survives regardless of rate
    let repeated = hunt_state(3, "close", "huir", false);
    store.record_experience(&repeated, "attack", Outcome::Failure);
    store.record_experience(&repeated, "attack", Outcome::Failure);

    assert_eq!(store.prune(2, 0.2), 1);
    assert_eq!(store.len(), 2);
    assert!(store
        .rules()
        .iter()
        .all(|r| r.observation_count >= 2 || r.success_rate >= 0.2));
}
