//! Core game logic for iterated Prisoner's Dilemma strategy evaluation.
//!
//! The crate has three layers:
//! - [`Game`]: one repeated session — scores, round counter, and the
//!   previous round's choices, advanced one payoff application at a time.
//! - [`Agent`]: anything that maps a [`GameState`] view to a [`Choice`].
//!   Fixed, randomized, reactive, and externally-modelled strategies all
//!   implement the same trait.
//! - [`Tournament`] / [`FitnessEvaluator`]: run many matches and aggregate
//!   outcomes. The fixed-baseline fitness path is the surface an external
//!   optimizer (e.g. an evolutionary search) consumes: it wraps each
//!   candidate decision function in an [`ExternalModel`], evaluates it
//!   against a stable reference agent, and reads back the final score.
//!
//! The search engine that produces candidates, and the network runtime
//! behind [`ExternalModel`], are external collaborators and not part of
//! this crate.

mod agent;
mod game;
mod tournament;

pub use agent::{
    Agent, AlwaysCooperate, AlwaysDefect, Choice, ExternalModel, Random, RandomMostlyCooperate,
    RandomOftenDefect, TitForTat, TitForTatReversed,
};
pub use game::{run_match, Game, GameState, MatchError, MatchOutcome, Seat, Winner, SCORED_ROUNDS};
pub use tournament::{
    AgentStats, FitnessEvaluator, FitnessReport, Tournament, TournamentConfig,
};

/// Payoff matrix for one scored round.
/// Returns (delta_a, delta_b).
///
/// Mutual cooperation pays a small reward, mutual defection a small
/// punishment, and a lone defector exploits the cooperator.
pub fn payoff(a: Choice, b: Choice) -> (i32, i32) {
    match (a, b) {
        (Choice::Cooperate, Choice::Cooperate) => (1, 1),
        (Choice::Defect, Choice::Defect) => (-1, -1),
        (Choice::Cooperate, Choice::Defect) => (-2, 3),
        (Choice::Defect, Choice::Cooperate) => (3, -2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_payoff_matrix() {
        assert_eq!(payoff(Choice::Cooperate, Choice::Cooperate), (1, 1));
        assert_eq!(payoff(Choice::Defect, Choice::Defect), (-1, -1));
        assert_eq!(payoff(Choice::Cooperate, Choice::Defect), (-2, 3));
        assert_eq!(payoff(Choice::Defect, Choice::Cooperate), (3, -2));
    }

    fn any_choice() -> impl Strategy<Value = Choice> {
        prop_oneof![Just(Choice::Cooperate), Just(Choice::Defect)]
    }

    proptest! {
        #[test]
        fn test_payoff_symmetric_under_role_swap(a in any_choice(), b in any_choice()) {
            let (delta_a, delta_b) = payoff(a, b);
            let (swapped_b, swapped_a) = payoff(b, a);
            prop_assert_eq!(delta_a, swapped_a);
            prop_assert_eq!(delta_b, swapped_b);
        }
    }
}
