pub mod entity {
    use std::collections::BTreeMap;
    use std::fmt;
    use std::hash::{Hash, Hasher};

    /// A game is identified by its name.
    pub type Game = String;

    /// A participant with signed ratings for the games they know.
    ///
    /// Identity is the name alone: equality, ordering and hashing ignore
    /// the rating table. A negative rating means the player can play the
    /// game at `|rating|` strength but would rather not.
    #[derive(Clone)]
    pub struct Player {
        name: String,
        proficiencies: BTreeMap<Game, i32>,
    }

    impl Player {
        pub fn new<N, G, I>(name: N, ratings: I) -> Player
        where
            N: Into<String>,
            G: Into<Game>,
            I: IntoIterator<Item = (G, i32)>,
        {
            Player {
                name: name.into(),
                proficiencies: ratings
                    .into_iter()
                    .map(|(game, score)| (game.into(), score))
                    .collect(),
            }
        }

        pub fn name(&self) -> &str {
            &self.name
        }

        /// Raw signed rating for `game`, `None` if the player never rated it.
        pub fn proficiency(&self, game: &str) -> Option<i32> {
            self.proficiencies.get(game).copied()
        }

        pub fn knows(&self, game: &str) -> bool {
            self.proficiencies.contains_key(game)
        }

        /// Known games in name order.
        pub fn known_games(&self) -> impl Iterator<Item = &Game> {
            self.proficiencies.keys()
        }

        pub fn ratings(&self) -> impl Iterator<Item = (&Game, i32)> {
            self.proficiencies.iter().map(|(game, score)| (game, *score))
        }
    }

    impl fmt::Debug for Player {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Player<{}>", self.name)
        }
    }

    impl PartialEq for Player {
        fn eq(&self, other: &Player) -> bool {
            self.name == other.name
        }
    }

    impl Eq for Player {}

    impl Hash for Player {
        fn hash<H: Hasher>(&self, state: &mut H) {
            self.name.hash(state);
        }
    }

    impl PartialOrd for Player {
        fn partial_cmp(&self, other: &Player) -> Option<std::cmp::Ordering> {
            Some(self.cmp(other))
        }
    }

    impl Ord for Player {
        fn cmp(&self, other: &Player) -> std::cmp::Ordering {
            self.name.cmp(&other.name)
        }
    }
}

pub mod roster {
    use std::collections::HashSet;

    use super::entity::Player;
    use crate::error::{MatchupError, Result};

    /// The owning catalog of players. Everything downstream of the roster
    /// borrows from it, so it must outlive any overlaps or matchups built
    /// on top.
    #[derive(Debug, Clone, Default)]
    pub struct Roster {
        players: Vec<Player>,
    }

    impl Roster {
        /// Builds a roster, rejecting duplicate names since the name is the
        /// identity key.
        pub fn new(players: Vec<Player>) -> Result<Roster> {
            let mut seen = HashSet::new();
            for player in &players {
                if !seen.insert(player.name()) {
                    return Err(MatchupError::DuplicatePlayer(player.name().to_owned()));
                }
            }
            Ok(Roster { players })
        }

        /// All players, in insertion order.
        pub fn players(&self) -> &[Player] {
            &self.players
        }

        pub fn len(&self) -> usize {
            self.players.len()
        }

        pub fn is_empty(&self) -> bool {
            self.players.is_empty()
        }

        pub fn get(&self, name: &str) -> Option<&Player> {
            self.players.iter().find(|player| player.name() == name)
        }

        /// Resolves a subset by name, preserving the given order.
        pub fn select(&self, names: &[&str]) -> Result<Vec<&Player>> {
            names
                .iter()
                .map(|name| {
                    self.get(name)
                        .ok_or_else(|| MatchupError::UnknownPlayer((*name).to_owned()))
                })
                .collect()
        }
    }
}

pub mod policy {
    /// Pairwise cost over two absolute ratings.
    pub type PairScoreFn = fn(&ScorePolicy, i32, i32) -> f64;
    /// Folds all pairwise costs of a group into one group cost.
    pub type CombineFn = fn(&[f64]) -> f64;

    /// Scoring knobs and hooks. Lower cost means a better fit.
    #[derive(Clone)]
    pub struct ScorePolicy {
        /// Top of the rating scale.
        pub max_score: i32,
        /// Lowest rating still counted as fully comfortable; weaker ratings
        /// are charged their shortfall below it.
        pub good_score: i32,
        /// Flat charge whenever two ratings differ at all.
        pub mismatch_penalty: f64,
        /// Added once per pair when either raw rating is negative.
        pub opt_out_penalty: f64,
        pub pair_score: PairScoreFn,
        pub combine: CombineFn,
    }

    impl Default for ScorePolicy {
        fn default() -> ScorePolicy {
            ScorePolicy {
                max_score: 5,
                good_score: 8,
                mismatch_penalty: 4.0,
                opt_out_penalty: 100.0,
                pair_score: skill_gap_score,
                combine: mean,
            }
        }
    }

    impl ScorePolicy {
        /// Cost of pairing two raw signed ratings on one game. The pair
        /// formula sees absolute strengths; the opt-out penalty is added on
        /// top when either rating is negative.
        pub fn score_pair(&self, a: i32, b: i32) -> f64 {
            let base = (self.pair_score)(self, a.abs(), b.abs());
            if a < 0 || b < 0 {
                base + self.opt_out_penalty
            } else {
                base
            }
        }

        /// Whether an opt-out pair always costs more than any all-positive
        /// pair on the `0..=max_score` scale. Assumes the pair formula takes
        /// its maximum at the `(0, max_score)` extreme, as the default does.
        pub fn opt_out_dominates(&self) -> bool {
            self.opt_out_penalty > (self.pair_score)(self, 0, self.max_score)
        }
    }

    /// Default pair formula: squared rating gap, a flat mismatch charge, and
    /// the weaker player's shortfall below `good_score`.
    pub fn skill_gap_score(policy: &ScorePolicy, a: i32, b: i32) -> f64 {
        let gap = f64::from(a - b);
        let mismatch = if a != b { policy.mismatch_penalty } else { 0.0 };
        let shortfall = policy.good_score - policy.good_score.min(a).min(b);
        gap * gap + mismatch + f64::from(shortfall)
    }

    /// Default aggregation: arithmetic mean. A group with no pairs costs
    /// nothing.
    pub fn mean(scores: &[f64]) -> f64 {
        if scores.is_empty() {
            return 0.0;
        }
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}
