//! The knowledge store: owns the rule collection and its statistics
//!
//! Query, experience recording, generalization, pruning, and persistence
//! all live here. The store is single-threaded and synchronous; the only
//! nondeterminism is its owned seedable RNG, so a fixed seed reproduces an
//! entire run.

use chrono::Utc;
use ordered_float::OrderedFloat;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::core::config::config;
use crate::core::error::{Result, VeldtError};
use crate::core::types::{Outcome, State};
use crate::knowledge::rule::{conditions_from_state, Rule};

/// Aggregate counters kept alongside the rule list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_rules: usize,
    pub rules_success: usize,
    pub rules_failure: usize,
    pub total_queries: u64,
    pub hits: u64,
}

impl Statistics {
    /// Fraction of queries answered from a learned success rule
    pub fn hit_rate(&self) -> f64 {
        if self.total_queries == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_queries as f64
        }
    }
}

/// On-disk shape of the knowledge file
#[derive(Serialize, Deserialize)]
struct KnowledgeFile {
    rules: Vec<Rule>,
    statistics: Statistics,
    saved_at: String,
    /// Redundant with rules.len(), written for quick inspection
    total_rules: usize,
}

/// Mutable collection of learned rules plus the fixed action vocabulary
pub struct KnowledgeStore {
    rules: Vec<Rule>,
    statistics: Statistics,
    actions: Vec<String>,
    rng: ChaCha8Rng,
}

impl KnowledgeStore {
    /// Create an empty store with an entropy-seeded RNG.
    ///
    /// The action vocabulary must be non-empty; an empty one is a fatal
    /// configuration error, not a per-call condition.
    pub fn new(actions: Vec<String>) -> Self {
        Self::with_rng(actions, ChaCha8Rng::from_entropy())
    }

    /// Create an empty store with a deterministic RNG
    pub fn with_seed(actions: Vec<String>, seed: u64) -> Self {
        Self::with_rng(actions, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Create an empty store with the given RNG
    pub fn with_rng(actions: Vec<String>, rng: ChaCha8Rng) -> Self {
        assert!(!actions.is_empty(), "action vocabulary must not be empty");
        Self {
            rules: Vec::new(),
            statistics: Statistics::default(),
            actions,
            rng,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All rules whose condition set is satisfied by the state, in
    /// insertion order
    pub fn find_matching(&self, state: &State) -> Vec<&Rule> {
        self.rules.iter().filter(|r| r.matches(state)).collect()
    }

    /// Pick an action for the given state.
    ///
    /// With probability `exploration`, or when nothing matches, the choice
    /// is a uniformly random action and no rule is returned. Otherwise the
    /// success rule maximizing success_rate * observation_count wins (first
    /// in scan order on ties). When only failure rules match, the random
    /// fallback avoids their actions if any alternative remains.
    pub fn best_action(&mut self, state: &State, exploration: f64) -> (String, Option<&Rule>) {
        self.statistics.total_queries += 1;

        let matching: Vec<usize> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.matches(state))
            .map(|(i, _)| i)
            .collect();

        // The exploration draw is only consumed when something matched
        if matching.is_empty() || self.rng.gen::<f64>() < exploration {
            return (self.random_action(), None);
        }

        let mut best: Option<usize> = None;
        let mut best_weight = OrderedFloat(f64::NEG_INFINITY);
        for &i in &matching {
            let rule = &self.rules[i];
            if rule.outcome != Outcome::Success {
                continue;
            }
            let weight = OrderedFloat(rule.weight());
            if weight > best_weight {
                best = Some(i);
                best_weight = weight;
            }
        }

        if let Some(i) = best {
            self.statistics.hits += 1;
            return (self.rules[i].action.clone(), Some(&self.rules[i]));
        }

        // Everything that matched is a known mistake; try the rest first
        let tried: BTreeSet<String> = matching
            .iter()
            .map(|&i| self.rules[i].action.clone())
            .collect();
        let remaining: Vec<String> = self
            .actions
            .iter()
            .filter(|a| !tried.contains(a.as_str()))
            .cloned()
            .collect();

        if remaining.is_empty() {
            (self.random_action(), None)
        } else {
            let i = self.rng.gen_range(0..remaining.len());
            (remaining[i].clone(), None)
        }
    }

    fn random_action(&mut self) -> String {
        let i = self.rng.gen_range(0..self.actions.len());
        self.actions[i].clone()
    }

    /// Fold one experience into the store.
    ///
    /// Deduplication is exact: the raw state (as an all-scalar condition
    /// set), the action, and the current outcome label must all be equal.
    /// Merged rules are never re-matched here, so an already-generalized
    /// state still grows a fresh exact rule next to the general one.
    pub fn record_experience(&mut self, state: &State, action: &str, outcome: Outcome) {
        let conditions = conditions_from_state(state);

        if let Some(rule) = self
            .rules
            .iter_mut()
            .find(|r| r.conditions == conditions && r.action == action && r.outcome == outcome)
        {
            rule.update(outcome);
            return;
        }

        let rule = Rule::new(conditions, action, outcome);
        match rule.outcome {
            Outcome::Success => self.statistics.rules_success += 1,
            Outcome::Failure => self.statistics.rules_failure += 1,
        }
        self.rules.push(rule);
        self.statistics.total_rules = self.rules.len();
    }

    /// One greedy generalization pass.
    ///
    /// Walks the rule vector in order with a parallel consumed mask; each
    /// unconsumed rule merges with the first later rule it can, and both
    /// are replaced by the merged rule at the earlier position. Not a
    /// fixed point: repeated calls may find further merges. Low-confidence
    /// rules are pruned afterwards. Returns the number of merges.
    pub fn generalize(&mut self) -> usize {
        let mut consumed = vec![false; self.rules.len()];
        let mut kept: Vec<Rule> = Vec::with_capacity(self.rules.len());
        let mut merges = 0;

        for i in 0..self.rules.len() {
            if consumed[i] {
                continue;
            }

            let mut merged: Option<(usize, Rule)> = None;
            for j in (i + 1)..self.rules.len() {
                if consumed[j] {
                    continue;
                }
                if let Some(rule) = self.rules[i].merge_with(&self.rules[j]) {
                    merged = Some((j, rule));
                    break;
                }
            }

            consumed[i] = true;
            match merged {
                Some((j, rule)) => {
                    consumed[j] = true;
                    kept.push(rule);
                    merges += 1;
                }
                None => kept.push(self.rules[i].clone()),
            }
        }

        self.rules = kept;
        self.statistics.total_rules = self.rules.len();

        tracing::debug!(merges, rules = self.rules.len(), "generalization pass complete");

        let cfg = config();
        self.prune(cfg.prune_min_count, cfg.prune_min_rate);

        merges
    }

    /// Drop unreliable rules.
    ///
    /// A rule survives when it has been observed at least `min_count`
    /// times, or has at least one observation with a success rate at or
    /// above `min_rate`. Permissive early, strict as noise accumulates.
    /// Returns the number of rules removed.
    pub fn prune(&mut self, min_count: u32, min_rate: f64) -> usize {
        let before = self.rules.len();
        self.rules.retain(|r| {
            r.observation_count >= min_count
                || (r.observation_count >= 1 && r.success_rate >= min_rate)
        });
        let removed = before - self.rules.len();
        self.statistics.total_rules = self.rules.len();

        if removed > 0 {
            tracing::debug!(removed, rules = self.rules.len(), "pruned unreliable rules");
        }
        removed
    }

    /// Drop every rule and zero the statistics
    pub fn clear(&mut self) {
        self.rules.clear();
        self.statistics = Statistics::default();
    }

    /// Write the full rule list and statistics as JSON.
    ///
    /// All-or-nothing: on failure the in-memory store is unchanged and the
    /// error propagates.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = KnowledgeFile {
            rules: self.rules.clone(),
            statistics: self.statistics.clone(),
            saved_at: Utc::now().to_rfc3339(),
            total_rules: self.rules.len(),
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(&file)?)?;

        tracing::info!(rules = self.rules.len(), path = %path.display(), "knowledge saved");
        Ok(())
    }

    /// Load rules and statistics from a JSON file.
    ///
    /// A missing file is not an error: the store stays empty and Ok(0) is
    /// returned. A malformed file resets the store to empty and returns
    /// the diagnostic, leaving the store usable.
    pub fn load(&mut self, path: &Path) -> Result<usize> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no knowledge file found, starting empty");
            return Ok(0);
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str::<KnowledgeFile>(&content) {
            Ok(file) => {
                self.rules = file.rules;
                self.statistics = file.statistics;
                tracing::info!(rules = self.rules.len(), path = %path.display(), "knowledge loaded");
                Ok(self.rules.len())
            }
            Err(e) => {
                self.clear();
                tracing::warn!(path = %path.display(), error = %e, "malformed knowledge file, starting empty");
                Err(VeldtError::MalformedKnowledge(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        }
    }

    /// Human-readable dump: statistics, then one block per rule.
    ///
    /// Output only; this format is never parsed back.
    pub fn export_text(&self, path: &Path) -> Result<()> {
        let mut out = String::new();
        out.push_str(&format!(
            "KNOWLEDGE BASE - {}\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        ));
        out.push_str(&"=".repeat(60));
        out.push_str("\n\nSTATISTICS:\n");
        out.push_str(&format!("  total_rules: {}\n", self.statistics.total_rules));
        out.push_str(&format!("  rules_success: {}\n", self.statistics.rules_success));
        out.push_str(&format!("  rules_failure: {}\n", self.statistics.rules_failure));
        out.push_str(&format!("  total_queries: {}\n", self.statistics.total_queries));
        out.push_str(&format!("  hits: {}\n", self.statistics.hits));

        out.push_str("\n\nRULES:\n");
        out.push_str(&"=".repeat(60));
        out.push('\n');

        for (i, rule) in self.rules.iter().enumerate() {
            out.push_str(&format!("\nRule #{}:\n", i + 1));
            out.push_str("  Conditions:\n");
            for (key, condition) in &rule.conditions {
                out.push_str(&format!("    - {}{}\n", key, condition));
            }
            out.push_str(&format!("  Action: {}\n", rule.action));
            out.push_str(&format!("  Outcome: {}\n", rule.outcome));
            out.push_str(&format!(
                "  Confidence: {:.1}% (n={})\n",
                rule.success_rate * 100.0,
                rule.observation_count
            ));
            out.push_str(&format!("  Last updated: {}\n", rule.last_updated));
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, out)?;

        tracing::info!(rules = self.rules.len(), path = %path.display(), "knowledge exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{PredatorAction, StateValue};
    use crate::knowledge::rule::ConditionSet;

    fn state(entries: &[(&str, StateValue)]) -> State {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn test_store() -> KnowledgeStore {
        KnowledgeStore::with_seed(PredatorAction::vocabulary(), 42)
    }

    #[test]
    #[should_panic(expected = "action vocabulary must not be empty")]
    fn test_empty_vocabulary_is_fatal() {
        KnowledgeStore::new(Vec::new());
    }

    #[test]
    fn test_record_new_experience() {
        let mut store = test_store();
        let s = state(&[("position", 1i64.into()), ("distance", "close".into())]);

        store.record_experience(&s, "advance", Outcome::Success);

        assert_eq!(store.len(), 1);
        assert_eq!(store.statistics().total_rules, 1);
        assert_eq!(store.statistics().rules_success, 1);
        assert_eq!(store.statistics().rules_failure, 0);
    }

    #[test]
    fn test_record_identical_experience_updates_in_place() {
        let mut store = test_store();
        let s = state(&[("position", 1i64.into()), ("distance", "close".into())]);

        store.record_experience(&s, "advance", Outcome::Success);
        store.record_experience(&s, "advance", Outcome::Success);

        assert_eq!(store.len(), 1);
        assert_eq!(store.rules()[0].observation_count, 2);
        assert_eq!(store.rules()[0].success_rate, 1.0);
    }

    #[test]
    fn test_distinct_outcome_creates_parallel_rule() {
        let mut store = test_store();
        let s = state(&[("position", 1i64.into())]);

        store.record_experience(&s, "advance", Outcome::Success);
        store.record_experience(&s, "advance", Outcome::Failure);

        // Dedup key includes the outcome label, so this is a second rule
        assert_eq!(store.len(), 2);
        assert_eq!(store.statistics().rules_success, 1);
        assert_eq!(store.statistics().rules_failure, 1);
    }

    #[test]
    fn test_find_matching_preserves_insertion_order() {
        let mut store = test_store();
        store.record_experience(
            &state(&[("position", 1i64.into()), ("distance", "close".into())]),
            "advance",
            Outcome::Success,
        );
        store.record_experience(
            &state(&[("position", 2i64.into()), ("distance", "close".into())]),
            "hide",
            Outcome::Failure,
        );
        store.record_experience(
            &state(&[("distance", "close".into())]),
            "attack",
            Outcome::Success,
        );

        let query = state(&[("position", 1i64.into()), ("distance", "close".into())]);
        let matching = store.find_matching(&query);

        assert_eq!(matching.len(), 2);
        assert_eq!(matching[0].action, "advance");
        assert_eq!(matching[1].action, "attack");
    }

    #[test]
    fn test_best_action_deterministic_without_exploration() {
        let mut store = test_store();
        let s = state(&[("position", 1i64.into()), ("distance", "close".into())]);
        store.record_experience(&s, "advance", Outcome::Success);

        for _ in 0..20 {
            let (action, rule) = store.best_action(&s, 0.0);
            assert_eq!(action, "advance");
            let rule = rule.expect("matching success rule");
            assert_eq!(rule.outcome, Outcome::Success);
        }
    }

    #[test]
    fn test_best_action_picks_highest_weight() {
        let mut store = test_store();
        let s = state(&[("distance", "close".into())]);

        // weight 1.0
        store.record_experience(&s, "hide", Outcome::Success);
        // weight 3.0 after three identical recordings
        let s2 = state(&[("distance", "close".into()), ("hidden", true.into())]);
        store.record_experience(&s2, "attack", Outcome::Success);
        store.record_experience(&s2, "attack", Outcome::Success);
        store.record_experience(&s2, "attack", Outcome::Success);

        let query = state(&[("distance", "close".into()), ("hidden", true.into())]);
        let (action, rule) = store.best_action(&query, 0.0);
        assert_eq!(action, "attack");
        assert_eq!(rule.unwrap().observation_count, 3);
    }

    #[test]
    fn test_best_action_tie_goes_to_first_in_scan_order() {
        let mut store = test_store();
        let s = state(&[("distance", "close".into())]);
        store.record_experience(&s, "hide", Outcome::Success);
        store.record_experience(&s, "attack", Outcome::Success);

        // Equal weights; the earlier rule wins every time
        for _ in 0..10 {
            let (action, _) = store.best_action(&s, 0.0);
            assert_eq!(action, "hide");
        }
    }

    #[test]
    fn test_best_action_unmatched_state_is_unguided() {
        let mut store = test_store();
        let (action, rule) = store.best_action(&state(&[("position", 1i64.into())]), 0.0);

        assert!(rule.is_none());
        assert!(store.actions().contains(&action));
    }

    #[test]
    fn test_best_action_full_exploration_ignores_rules() {
        let mut store = test_store();
        let s = state(&[("position", 1i64.into())]);
        store.record_experience(&s, "advance", Outcome::Success);

        let (_, rule) = store.best_action(&s, 1.0);
        assert!(rule.is_none());
    }

    #[test]
    fn test_best_action_avoids_known_failures() {
        let mut store = test_store();
        let s = state(&[("position", 1i64.into())]);
        store.record_experience(&s, "advance", Outcome::Failure);
        store.record_experience(&s, "attack", Outcome::Failure);

        // Only "hide" has not failed here yet
        for _ in 0..10 {
            let (action, rule) = store.best_action(&s, 0.0);
            assert_eq!(action, "hide");
            assert!(rule.is_none());
        }
    }

    #[test]
    fn test_best_action_all_failures_falls_back_to_full_set() {
        let mut store = test_store();
        let s = state(&[("position", 1i64.into())]);
        store.record_experience(&s, "advance", Outcome::Failure);
        store.record_experience(&s, "hide", Outcome::Failure);
        store.record_experience(&s, "attack", Outcome::Failure);

        let (action, rule) = store.best_action(&s, 0.0);
        assert!(rule.is_none());
        assert!(store.actions().contains(&action));
    }

    #[test]
    fn test_query_counters() {
        let mut store = test_store();
        let s = state(&[("position", 1i64.into())]);
        store.record_experience(&s, "advance", Outcome::Success);

        store.best_action(&s, 0.0);
        store.best_action(&state(&[("position", 5i64.into())]), 0.0);

        assert_eq!(store.statistics().total_queries, 2);
        assert_eq!(store.statistics().hits, 1);
        assert!((store.statistics().hit_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_generalize_merges_single_difference_pair() {
        let mut store = test_store();
        store.record_experience(
            &state(&[
                ("position", 1i64.into()),
                ("distance", "close".into()),
                ("accion_impala", "ver_izquierda".into()),
            ]),
            "advance",
            Outcome::Success,
        );
        store.record_experience(
            &state(&[
                ("position", 1i64.into()),
                ("distance", "close".into()),
                ("accion_impala", "ver_derecha".into()),
            ]),
            "advance",
            Outcome::Success,
        );

        let merges = store.generalize();
        assert_eq!(merges, 1);
        assert_eq!(store.len(), 1);

        // Either original state now matches the merged rule
        let (action, rule) = store.best_action(
            &state(&[
                ("position", 1i64.into()),
                ("distance", "close".into()),
                ("accion_impala", "ver_derecha".into()),
            ]),
            0.0,
        );
        assert_eq!(action, "advance");
        assert_eq!(rule.unwrap().observation_count, 2);
    }

    #[test]
    fn test_generalize_is_single_pass() {
        let mut store = test_store();
        for position in [1i64, 2, 3] {
            store.record_experience(
                &state(&[("position", position.into()), ("distance", "close".into())]),
                "advance",
                Outcome::Success,
            );
        }

        // First pass merges rules 1 and 2; rule 3 stays (the merged rule's
        // set-vs-scalar difference is found on the next pass)
        assert_eq!(store.generalize(), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.generalize(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_exact_insert_after_generalize_creates_parallel_rule() {
        let mut store = test_store();
        let left = state(&[
            ("position", 1i64.into()),
            ("accion_impala", "ver_izquierda".into()),
        ]);
        let right = state(&[
            ("position", 1i64.into()),
            ("accion_impala", "ver_derecha".into()),
        ]);

        store.record_experience(&left, "advance", Outcome::Success);
        store.record_experience(&right, "advance", Outcome::Success);
        assert_eq!(store.generalize(), 1);
        assert_eq!(store.len(), 1);

        // The merged rule covers this state, but dedup is on the raw state,
        // so a fresh exact rule appears next to the general one
        store.record_experience(&left, "advance", Outcome::Success);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_prune_boundary() {
        let mut store = test_store();

        let mut doomed = Rule::new(ConditionSet::new(), "advance", Outcome::Failure);
        doomed.success_rate = 0.15;
        let mut kept = Rule::new(ConditionSet::new(), "hide", Outcome::Failure);
        kept.success_rate = 0.25;
        let seasoned = {
            let mut r = Rule::new(ConditionSet::new(), "attack", Outcome::Failure);
            r.observation_count = 2;
            r
        };
        store.rules = vec![doomed, kept, seasoned];

        let removed = store.prune(2, 0.2);
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 2);
        assert!(store.rules().iter().all(|r| r.action != "advance"));
        assert_eq!(store.statistics().total_rules, 2);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge.json");

        let mut store = test_store();
        store.record_experience(
            &state(&[("position", 1i64.into()), ("hidden", false.into())]),
            "advance",
            Outcome::Success,
        );
        store.record_experience(
            &state(&[("position", 2i64.into())]),
            "hide",
            Outcome::Failure,
        );
        store.best_action(&state(&[("position", 1i64.into()), ("hidden", false.into())]), 0.0);
        store.save(&path).unwrap();

        let mut reloaded = test_store();
        let count = reloaded.load(&path).unwrap();
        assert_eq!(count, 2);
        assert_eq!(reloaded.rules(), store.rules());
        assert_eq!(reloaded.statistics(), store.statistics());
    }

    #[test]
    fn test_load_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = test_store();
        let count = store.load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(count, 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_malformed_file_surfaces_error_and_resets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge.json");
        std::fs::write(&path, "not json at all {").unwrap();

        let mut store = test_store();
        store.record_experience(&state(&[("position", 1i64.into())]), "advance", Outcome::Success);

        let result = store.load(&path);
        assert!(matches!(result, Err(VeldtError::MalformedKnowledge(_))));
        // Usable, but empty
        assert!(store.is_empty());
        assert_eq!(store.statistics().total_rules, 0);
        let (_, rule) = store.best_action(&state(&[("position", 1i64.into())]), 0.0);
        assert!(rule.is_none());
    }

    #[test]
    fn test_knowledge_file_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge.json");

        let mut store = test_store();
        store.record_experience(&state(&[("position", 1i64.into())]), "advance", Outcome::Success);
        store.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.get("rules").unwrap().is_array());
        assert!(raw.get("saved_at").is_some());
        assert_eq!(raw.get("total_rules").unwrap(), 1);

        let stats = raw.get("statistics").unwrap();
        for field in ["total_rules", "rules_success", "rules_failure", "total_queries", "hits"] {
            assert!(stats.get(field).is_some(), "missing field {}", field);
        }

        let rule = &raw.get("rules").unwrap()[0];
        assert_eq!(rule.get("action").unwrap(), "advance");
        assert_eq!(rule.get("outcome").unwrap(), "success");
        assert_eq!(rule.get("condition_set").unwrap().get("position").unwrap(), 1);
    }

    #[test]
    fn test_export_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge.txt");

        let mut store = test_store();
        store.record_experience(
            &state(&[("position", 1i64.into()), ("distance", "far".into())]),
            "advance",
            Outcome::Success,
        );
        store.export_text(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("STATISTICS:"));
        assert!(text.contains("Rule #1:"));
        assert!(text.contains("- position=1"));
        assert!(text.contains("Action: advance"));
        assert!(text.contains("Outcome: success"));
        assert!(text.contains("Confidence: 100.0% (n=1)"));
    }

    #[test]
    fn test_clear() {
        let mut store = test_store();
        store.record_experience(&state(&[("position", 1i64.into())]), "advance", Outcome::Success);
        store.best_action(&state(&[("position", 1i64.into())]), 0.0);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.statistics(), &Statistics::default());
    }

    #[test]
    fn test_end_to_end_single_experience_query() {
        let mut store = test_store();
        let s = state(&[
            ("position", 1i64.into()),
            ("distance", "far".into()),
            ("accion_impala", "beber".into()),
            ("hidden", false.into()),
        ]);

        store.record_experience(&s, "advance", Outcome::Success);
        let (action, rule) = store.best_action(&s, 0.0);

        assert_eq!(action, "advance");
        let rule = rule.expect("rule backing the answer");
        assert_eq!(rule.observation_count, 1);
        assert_eq!(rule.success_rate, 1.0);
    }
}
