//! Tournament aggregation and the fixed-baseline fitness path

use std::collections::BTreeMap;

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::game::{run_match, MatchError, MatchOutcome, Winner};

/// Tournament configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentConfig {
    /// Matches played per (agent, opponent) pairing.
    pub repetitions: u32,
    /// Root seed; every match derives its own rng from this and its match
    /// index, so results do not depend on worker scheduling.
    pub seed: u64,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            repetitions: 100,
            seed: 0,
        }
    }
}

/// Aggregated results for one agent across many matches, always from that
/// agent's own seat.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStats {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    /// Evaluations aborted by a match-level error. Not counted in
    /// `games_played`, so `wins + losses + draws == games_played` holds
    /// exactly.
    pub failures: u32,
    pub games_played: u32,
    pub total_score: i64,
}

impl AgentStats {
    fn record(&mut self, outcome: &MatchOutcome) {
        match outcome.winner {
            Winner::A => self.wins += 1,
            Winner::B => self.losses += 1,
            Winner::Draw => self.draws += 1,
        }
        self.total_score += outcome.score_a as i64;
        self.games_played += 1;
    }

    fn merge(&mut self, other: &AgentStats) {
        self.wins += other.wins;
        self.losses += other.losses;
        self.draws += other.draws;
        self.failures += other.failures;
        self.games_played += other.games_played;
        self.total_score += other.total_score;
    }

    pub fn win_rate(&self) -> f64 {
        self.rate(self.wins)
    }

    pub fn loss_rate(&self) -> f64 {
        self.rate(self.losses)
    }

    pub fn draw_rate(&self) -> f64 {
        self.rate(self.draws)
    }

    fn rate(&self, count: u32) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            count as f64 / self.games_played as f64 * 100.0
        }
    }
}

/// Exploratory all-pairs tournament: every registered agent plays every
/// registered agent (itself included) `repetitions` times.
///
/// Matches are independent, so they fan out across rayon workers; each
/// worker accumulates into its own stats vector and the per-worker vectors
/// are merged in a single reduction at the end. Failed matches are logged
/// and counted, never retried.
pub struct Tournament {
    config: TournamentConfig,
    agents: Vec<(String, Box<dyn Agent>)>,
}

impl Tournament {
    pub fn new(config: TournamentConfig) -> Self {
        Self {
            config,
            agents: Vec::new(),
        }
    }

    /// Register a named agent. Names are expected to be unique.
    pub fn register(&mut self, name: impl Into<String>, agent: Box<dyn Agent>) {
        self.agents.push((name.into(), agent));
    }

    /// Run every pairing and return per-agent aggregates keyed by name.
    pub fn run_all_pairs(&self) -> BTreeMap<String, AgentStats> {
        let n = self.agents.len();
        let repetitions = self.config.repetitions as usize;

        let mut jobs = Vec::with_capacity(n * n * repetitions);
        for a in 0..n {
            for b in 0..n {
                for _ in 0..repetitions {
                    jobs.push((a, b));
                }
            }
        }

        info!(
            "all-pairs tournament: {} agents, {} repetitions per pairing, {} matches",
            n,
            repetitions,
            jobs.len()
        );

        let totals = jobs
            .par_iter()
            .enumerate()
            .map(|(index, &(a, b))| {
                let mut rng = SmallRng::seed_from_u64(match_seed(self.config.seed, index as u64));
                let result = run_match(
                    self.agents[a].1.as_ref(),
                    self.agents[b].1.as_ref(),
                    &mut rng,
                );
                (a, result)
            })
            .fold(
                || vec![AgentStats::default(); n],
                |mut acc, (a, result)| {
                    match result {
                        Ok(outcome) => acc[a].record(&outcome),
                        Err(err) => {
                            warn!("match failed for {}: {}", self.agents[a].0, err);
                            acc[a].failures += 1;
                        }
                    }
                    acc
                },
            )
            .reduce(
                || vec![AgentStats::default(); n],
                |mut left, right| {
                    for (stats, partial) in left.iter_mut().zip(&right) {
                        stats.merge(partial);
                    }
                    left
                },
            );

        self.agents
            .iter()
            .map(|(name, _)| name.clone())
            .zip(totals)
            .collect()
    }
}

/// Per-match seed derivation, independent of execution order.
fn match_seed(seed: u64, index: u64) -> u64 {
    seed ^ index.wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

/// Fitness report for one candidate evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitnessReport {
    /// The candidate's final score, surfaced to the optimizer as fitness.
    pub score: i32,
    /// True when the score clears the success threshold.
    pub solved: bool,
    pub outcome: MatchOutcome,
}

/// Fixed-baseline fitness scoring: one candidate against a stable
/// reference agent.
///
/// Scores a single representative match per call; callers wanting a
/// lower-variance signal run `evaluate` repeatedly with fresh rng state
/// and average the scores themselves.
pub struct FitnessEvaluator {
    baseline: Box<dyn Agent>,
    success_threshold: i32,
}

impl FitnessEvaluator {
    pub fn new(baseline: Box<dyn Agent>, success_threshold: i32) -> Self {
        Self {
            baseline,
            success_threshold,
        }
    }

    /// Evaluate one candidate (seated as player A) against the baseline.
    pub fn evaluate(
        &self,
        candidate: &dyn Agent,
        rng: &mut SmallRng,
    ) -> Result<FitnessReport, MatchError> {
        let outcome = run_match(candidate, self.baseline.as_ref(), rng)?;
        let report = FitnessReport {
            score: outcome.score_a,
            solved: outcome.score_a > self.success_threshold,
            outcome,
        };
        debug!("candidate fitness {} (solved: {})", report.score, report.solved);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{
        AlwaysCooperate, AlwaysDefect, ExternalModel, Random, TitForTat,
    };
    use proptest::prelude::*;

    fn config(repetitions: u32) -> TournamentConfig {
        TournamentConfig {
            repetitions,
            seed: 42,
        }
    }

    #[test]
    fn test_aggregate_invariant_holds_per_agent() {
        let mut tournament = Tournament::new(config(5));
        tournament.register("tit_for_tat", Box::new(TitForTat));
        tournament.register("always_defect", Box::new(AlwaysDefect));
        tournament.register("random", Box::new(Random));

        let stats = tournament.run_all_pairs();
        assert_eq!(stats.len(), 3);

        for agent_stats in stats.values() {
            assert_eq!(agent_stats.games_played, 15);
            assert_eq!(agent_stats.failures, 0);
            assert_eq!(
                agent_stats.wins + agent_stats.losses + agent_stats.draws,
                agent_stats.games_played
            );
        }
    }

    #[test]
    fn test_all_pairs_deterministic_for_seed() {
        let build = || {
            let mut tournament = Tournament::new(config(3));
            tournament.register("random", Box::new(Random));
            tournament.register("tit_for_tat", Box::new(TitForTat));
            tournament
        };

        assert_eq!(build().run_all_pairs(), build().run_all_pairs());
    }

    #[test]
    fn test_head_to_head_bookkeeping() {
        let mut tournament = Tournament::new(config(1));
        tournament.register("cooperate", Box::new(AlwaysCooperate));
        tournament.register("defect", Box::new(AlwaysDefect));

        let stats = tournament.run_all_pairs();

        let defect = &stats["defect"];
        assert_eq!(defect.wins, 1);
        assert_eq!(defect.losses, 0);
        assert_eq!(defect.draws, 1);
        assert_eq!(defect.total_score, 30 - 10);

        let cooperate = &stats["cooperate"];
        assert_eq!(cooperate.wins, 0);
        assert_eq!(cooperate.losses, 1);
        assert_eq!(cooperate.draws, 1);
        assert_eq!(cooperate.total_score, 10 - 20);
    }

    #[test]
    fn test_failed_evaluations_do_not_crash_the_tournament() {
        let mut tournament = Tournament::new(config(1));
        tournament.register(
            "broken_model",
            Box::new(ExternalModel::new(|_: &[f64; 2]| {
                Err("model unavailable".to_string())
            })),
        );
        tournament.register("cooperate", Box::new(AlwaysCooperate));

        let stats = tournament.run_all_pairs();

        // Both of the broken agent's own matches abort, plus the match
        // where it sits opposite the cooperator.
        let broken = &stats["broken_model"];
        assert_eq!(broken.failures, 2);
        assert_eq!(broken.games_played, 0);

        let cooperate = &stats["cooperate"];
        assert_eq!(cooperate.failures, 1);
        assert_eq!(cooperate.games_played, 1);
        assert_eq!(cooperate.draws, 1);
    }

    #[test]
    fn test_fitness_threshold_flags_winner() {
        let evaluator = FitnessEvaluator::new(Box::new(AlwaysCooperate), 16);
        let mut rng = SmallRng::seed_from_u64(42);

        let report = evaluator.evaluate(&AlwaysDefect, &mut rng).unwrap();
        assert_eq!(report.score, 30);
        assert!(report.solved);
        assert_eq!(report.outcome.winner, Winner::A);

        let report = evaluator.evaluate(&AlwaysCooperate, &mut rng).unwrap();
        assert_eq!(report.score, 10);
        assert!(!report.solved);
    }

    #[test]
    fn test_fitness_accepts_external_decision_function() {
        let evaluator = FitnessEvaluator::new(Box::new(AlwaysCooperate), 16);
        let candidate = ExternalModel::new(|_: &[f64; 2]| Ok(vec![1.0]));
        let mut rng = SmallRng::seed_from_u64(42);

        let report = evaluator.evaluate(&candidate, &mut rng).unwrap();
        assert_eq!(report.score, 30);
        assert!(report.solved);
    }

    #[test]
    fn test_fitness_propagates_model_failure() {
        let evaluator = FitnessEvaluator::new(Box::new(AlwaysCooperate), 16);
        let candidate = ExternalModel::new(|_: &[f64; 2]| Err("forward pass failed".to_string()));
        let mut rng = SmallRng::seed_from_u64(42);

        let err = evaluator.evaluate(&candidate, &mut rng).unwrap_err();
        assert_eq!(err, MatchError::Model("forward pass failed".to_string()));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_rates_sum_to_one_hundred(seed in any::<u64>(), repetitions in 1u32..4) {
            let mut tournament = Tournament::new(TournamentConfig { repetitions, seed });
            tournament.register("random", Box::new(Random));
            tournament.register("tit_for_tat", Box::new(TitForTat));

            for agent_stats in tournament.run_all_pairs().values() {
                prop_assert_eq!(
                    agent_stats.wins + agent_stats.losses + agent_stats.draws,
                    agent_stats.games_played
                );
                let total =
                    agent_stats.win_rate() + agent_stats.loss_rate() + agent_stats.draw_rate();
                prop_assert!((total - 100.0).abs() < 1e-9, "rates sum to {}", total);
            }
        }
    }
}
