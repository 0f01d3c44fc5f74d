//! Agent trait and the baseline strategy set

use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::{GameState, MatchError};

/// A player's action for one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Choice {
    Cooperate,
    Defect,
}

/// Anything that can produce a choice from the visible game state.
///
/// Agents are stateless with respect to the game: every decision derives
/// from the passed [`GameState`] alone. Randomized strategies draw from
/// the rng threaded in by the match loop, which keeps matches reproducible
/// under a fixed seed. Only the external-model adapter can fail; the
/// built-in strategies always return a choice.
pub trait Agent: Send + Sync {
    fn decide(&self, state: &GameState, rng: &mut SmallRng) -> Result<Choice, MatchError>;
}

/// Always returns Cooperate.
pub struct AlwaysCooperate;

impl Agent for AlwaysCooperate {
    fn decide(&self, _state: &GameState, _rng: &mut SmallRng) -> Result<Choice, MatchError> {
        Ok(Choice::Cooperate)
    }
}

/// Always returns Defect.
pub struct AlwaysDefect;

impl Agent for AlwaysDefect {
    fn decide(&self, _state: &GameState, _rng: &mut SmallRng) -> Result<Choice, MatchError> {
        Ok(Choice::Defect)
    }
}

/// Uniform coin flip each round.
pub struct Random;

impl Agent for Random {
    fn decide(&self, _state: &GameState, rng: &mut SmallRng) -> Result<Choice, MatchError> {
        Ok(if rng.random_range(0..2) == 0 {
            Choice::Cooperate
        } else {
            Choice::Defect
        })
    }
}

/// Defects with probability 1/10, cooperates otherwise.
pub struct RandomMostlyCooperate;

impl Agent for RandomMostlyCooperate {
    fn decide(&self, _state: &GameState, rng: &mut SmallRng) -> Result<Choice, MatchError> {
        Ok(if rng.random_range(0..10) == 0 {
            Choice::Defect
        } else {
            Choice::Cooperate
        })
    }
}

/// Defects with probability 1/3, cooperates otherwise.
pub struct RandomOftenDefect;

impl Agent for RandomOftenDefect {
    fn decide(&self, _state: &GameState, rng: &mut SmallRng) -> Result<Choice, MatchError> {
        Ok(if rng.random_range(0..3) == 0 {
            Choice::Defect
        } else {
            Choice::Cooperate
        })
    }
}

/// Copies the opponent's previous choice; cooperates on the post-seeding
/// state where no real previous choice exists yet.
pub struct TitForTat;

impl Agent for TitForTat {
    fn decide(&self, state: &GameState, _rng: &mut SmallRng) -> Result<Choice, MatchError> {
        Ok(match state.opponent_previous {
            Some(Choice::Defect) => Choice::Defect,
            _ => Choice::Cooperate,
        })
    }
}

/// Inverted Tit-for-Tat: defects iff the opponent cooperated last round.
pub struct TitForTatReversed;

impl Agent for TitForTatReversed {
    fn decide(&self, state: &GameState, _rng: &mut SmallRng) -> Result<Choice, MatchError> {
        Ok(match state.opponent_previous {
            Some(Choice::Cooperate) => Choice::Defect,
            _ => Choice::Cooperate,
        })
    }
}

/// Adapter over an externally supplied decision function (typically a
/// trained network's forward pass).
///
/// The contract is two numbers in, one threshold out: the previous choices
/// are forwarded as `(opponent, own)` encoded via [`encode_choice`], and
/// the first output is mapped to Defect when strictly above 0.5. A failing
/// model or an empty output vector aborts the match; the adapter never
/// substitutes a default choice.
pub struct ExternalModel<F> {
    model: F,
}

impl<F> ExternalModel<F>
where
    F: Fn(&[f64; 2]) -> Result<Vec<f64>, String>,
{
    pub fn new(model: F) -> Self {
        Self { model }
    }
}

impl<F> Agent for ExternalModel<F>
where
    F: Fn(&[f64; 2]) -> Result<Vec<f64>, String> + Send + Sync,
{
    fn decide(&self, state: &GameState, _rng: &mut SmallRng) -> Result<Choice, MatchError> {
        let inputs = [
            encode_choice(state.opponent_previous),
            encode_choice(state.own_previous),
        ];
        let outputs = (self.model)(&inputs).map_err(MatchError::Model)?;
        let activation = outputs.first().ok_or(MatchError::EmptyModelOutput)?;

        Ok(if *activation > 0.5 {
            Choice::Defect
        } else {
            Choice::Cooperate
        })
    }
}

/// Model-input encoding: Cooperate 0.0, Defect 1.0, seeding-round
/// sentinel -1.0.
fn encode_choice(choice: Option<Choice>) -> f64 {
    match choice {
        None => -1.0,
        Some(Choice::Cooperate) => 0.0,
        Some(Choice::Defect) => 1.0,
    }
}
