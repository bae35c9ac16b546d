use std::collections::BTreeMap;

use itertools::Itertools;
use tracing::debug;

use crate::model::entity::{Game, Player};
use crate::model::policy::ScorePolicy;

/// How well one group fits one shared game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameFit {
    game: Game,
    cost: f64,
    gaps: BTreeMap<i32, usize>,
}

impl GameFit {
    fn build(game: Game, ratings: &[i32], policy: &ScorePolicy) -> GameFit {
        let pair_costs: Vec<f64> = ratings
            .iter()
            .tuple_combinations()
            .map(|(a, b)| policy.score_pair(*a, *b))
            .collect();
        let mut gaps = BTreeMap::new();
        for (a, b) in ratings.iter().tuple_combinations() {
            *gaps.entry((a.abs() - b.abs()).abs()).or_insert(0) += 1;
        }
        GameFit {
            game,
            cost: (policy.combine)(&pair_costs),
            gaps,
        }
    }

    pub fn game(&self) -> &str {
        &self.game
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Multiset of pairwise absolute rating gaps. Two fits with equal gap
    /// profiles balance out the same way even if their costs differ.
    pub fn gaps(&self) -> &BTreeMap<i32, usize> {
        &self.gaps
    }
}

/// A candidate group: a fixed-size set of players plus a scored fit for
/// every game all of them know, cheapest first.
#[derive(Debug, Clone)]
pub struct Overlap<'a> {
    players: Vec<&'a Player>,
    fits: Vec<GameFit>,
}

impl<'a> Overlap<'a> {
    /// Scores every game shared by all of `players`. The member list is
    /// kept in name order so downstream balancing and reporting stay
    /// deterministic.
    pub fn build(mut players: Vec<&'a Player>, policy: &ScorePolicy) -> Overlap<'a> {
        players.sort();
        let mut fits: Vec<GameFit> = shared_games(&players)
            .into_iter()
            .map(|game| {
                let ratings: Vec<i32> = players
                    .iter()
                    .map(|player| {
                        player
                            .proficiency(&game)
                            .expect("shared game is known to every member")
                    })
                    .collect();
                GameFit::build(game, &ratings, policy)
            })
            .collect();
        // stable sort: cost ties keep the alphabetical game order
        fits.sort_by(|a, b| a.cost.total_cmp(&b.cost));
        Overlap { players, fits }
    }

    /// Members in name order.
    pub fn players(&self) -> &[&'a Player] {
        &self.players
    }

    /// True when the members share no game at all.
    pub fn is_empty(&self) -> bool {
        self.fits.is_empty()
    }

    /// The cheapest fit, `None` for an empty overlap. Cost ties go to the
    /// alphabetically first game.
    pub fn best_fit(&self) -> Option<&GameFit> {
        self.fits.first()
    }

    /// All fits, ascending by cost.
    pub fn fits(&self) -> &[GameFit] {
        &self.fits
    }

    /// Every fit except the best one.
    pub fn alternatives(&self) -> &[GameFit] {
        self.fits.get(1..).unwrap_or(&[])
    }
}

/// Games known to every player, in game-name order.
fn shared_games(players: &[&Player]) -> Vec<Game> {
    match players.split_first() {
        None => Vec::new(),
        Some((first, rest)) => first
            .known_games()
            .filter(|game| rest.iter().all(|player| player.knows(game)))
            .cloned()
            .collect(),
    }
}

/// Builds every size-`group_size` combination of `players`, discarding
/// groups that share no game. Combinatorial in the population size.
pub fn enumerate_overlaps<'a>(
    players: &[&'a Player],
    group_size: usize,
    policy: &ScorePolicy,
) -> Vec<Overlap<'a>> {
    let overlaps: Vec<Overlap<'a>> = players
        .iter()
        .copied()
        .combinations(group_size)
        .map(|combo| Overlap::build(combo, policy))
        .filter(|overlap| !overlap.is_empty())
        .collect();
    debug!(
        event = "overlaps_enumerated",
        players = players.len(),
        group_size,
        candidates = overlaps.len()
    );
    overlaps
}
