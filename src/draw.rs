use std::collections::HashSet;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::roster::Roster;
use crate::types::{DrawResult, Participant};

/// Two-phase draw: winners from the whole roster, then alternates from
/// whoever was not drawn as a winner. Both phases use a uniform
/// (Fisher-Yates) shuffle and keep the shuffle order as the ranking.
pub struct DrawEngine {
    rng: StdRng,
}

impl DrawEngine {
    pub fn new() -> Self {
        DrawEngine {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible draws for rehearsals and tests.
    pub fn seeded(seed: u64) -> Self {
        DrawEngine {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => DrawEngine::seeded(seed),
            None => DrawEngine::new(),
        }
    }

    /// Never fails: a short roster just yields fewer winners, and
    /// alternates come only from what is left after the winners.
    pub fn draw(&mut self, roster: &Roster, winner_count: usize, alternate_count: usize) -> DrawResult {
        let winners = self.sample(roster.participants().to_vec(), winner_count);

        let winner_names: HashSet<&str> = winners.iter().map(|w| w.username.as_str()).collect();
        let remaining: Vec<Participant> = roster
            .participants()
            .iter()
            .filter(|p| !winner_names.contains(p.username.as_str()))
            .cloned()
            .collect();
        let alternates = self.sample(remaining, alternate_count);

        tracing::info!(
            roster = roster.len(),
            winners = winners.len(),
            alternates = alternates.len(),
            "draw complete"
        );
        DrawResult { winners, alternates }
    }

    fn sample(&mut self, mut pool: Vec<Participant>, count: usize) -> Vec<Participant> {
        pool.shuffle(&mut self.rng);
        pool.truncate(count);
        pool
    }
}

impl Default for DrawEngine {
    fn default() -> Self {
        DrawEngine::new()
    }
}
