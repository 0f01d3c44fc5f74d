//! Repeated-game state machine and match execution

use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::{Agent, Choice};
use crate::payoff;

/// Number of scored rounds per match. The seeding round comes on top of
/// this, so a full match advances the round counter 11 times.
pub const SCORED_ROUNDS: u32 = 10;

/// Error that aborts a single match.
///
/// Both variants are agent contract breaches. They abort the match; the
/// score of a partially played match is never reported.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MatchError {
    /// The external decision function reported an error.
    #[error("external model failed: {0}")]
    Model(String),
    /// The external decision function returned no outputs.
    #[error("external model produced no output")]
    EmptyModelOutput,
}

/// Which side of the board an agent sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Seat {
    A,
    B,
}

/// Read-only view of the game handed to an agent each round.
///
/// The previous-choice fields are `None` only before the first scored
/// round has been played; the seeding round leaves them at the sentinel.
/// Each agent gets its own view: `opponent_previous` always refers to the
/// other player, whichever seat the agent occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub opponent_previous: Option<Choice>,
    pub own_previous: Option<Choice>,
    pub round: u32,
}

/// Winner of a finished match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    A,
    B,
    Draw,
}

/// Final result of one match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub score_a: i32,
    pub score_b: i32,
    pub winner: Winner,
}

/// One repeated-game session: cumulative scores, round counter, and the
/// previous round's choices. Owned exclusively by the match loop; nothing
/// outlives the match, the tournament only keeps aggregated results.
#[derive(Clone, Debug, Default)]
pub struct Game {
    score_a: i32,
    score_b: i32,
    round: u32,
    previous_a: Option<Choice>,
    previous_b: Option<Choice>,
}

impl Game {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score_a(&self) -> i32 {
        self.score_a
    }

    pub fn score_b(&self) -> i32 {
        self.score_b
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// View of the board from one seat: the opponent's previous choice in
    /// a fixed slot regardless of which seat the agent occupies.
    pub fn state_for(&self, seat: Seat) -> GameState {
        let (opponent_previous, own_previous) = match seat {
            Seat::A => (self.previous_b, self.previous_a),
            Seat::B => (self.previous_a, self.previous_b),
        };
        GameState {
            opponent_previous,
            own_previous,
            round: self.round,
        }
    }

    /// True once the horizon is reached: 1 seeding round + 10 scored
    /// rounds. Fixed, not configurable.
    pub fn is_over(&self) -> bool {
        self.round > SCORED_ROUNDS
    }

    /// Seeding round: rewrites the previous-choice pair with the sentinel
    /// and advances the round counter without touching the scores. Counted
    /// toward the horizon exactly like a scored round.
    pub fn seed(&mut self) {
        self.apply(None, None);
    }

    /// Play one scored round: apply the payoff matrix, record both
    /// choices, advance the round counter. A single step that cannot fail;
    /// choices are valid by construction.
    pub fn play(&mut self, choice_a: Choice, choice_b: Choice) {
        self.apply(Some(choice_a), Some(choice_b));
    }

    fn apply(&mut self, choice_a: Option<Choice>, choice_b: Option<Choice>) {
        if let (Some(a), Some(b)) = (choice_a, choice_b) {
            let (delta_a, delta_b) = payoff(a, b);
            self.score_a += delta_a;
            self.score_b += delta_b;
        }
        self.previous_a = choice_a;
        self.previous_b = choice_b;
        self.round += 1;
    }

    pub fn outcome(&self) -> MatchOutcome {
        let winner = if self.score_a > self.score_b {
            Winner::A
        } else if self.score_a < self.score_b {
            Winner::B
        } else {
            Winner::Draw
        };
        MatchOutcome {
            score_a: self.score_a,
            score_b: self.score_b,
            winner,
        }
    }
}

/// Run a complete match between two agents.
///
/// Plays the seeding round, then queries both agents against the same
/// snapshot each round until the horizon — neither agent observes the
/// other's current-round choice before both have committed. Any agent
/// error aborts the match; there is nothing to retry, the outcome is a
/// deterministic (or properly seeded) function of its inputs.
pub fn run_match(
    agent_a: &dyn Agent,
    agent_b: &dyn Agent,
    rng: &mut SmallRng,
) -> Result<MatchOutcome, MatchError> {
    let mut game = Game::new();
    game.seed();

    while !game.is_over() {
        let choice_a = agent_a.decide(&game.state_for(Seat::A), rng)?;
        let choice_b = agent_b.decide(&game.state_for(Seat::B), rng)?;
        game.play(choice_a, choice_b);
    }

    Ok(game.outcome())
}
