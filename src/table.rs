use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::warn;

use crate::error::MatchupError;
use crate::model::entity::{Game, Player};
use crate::model::roster::Roster;

/// How raw table entries are admitted into a roster.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Entries weaker than this (by absolute value) are treated as not
    /// knowing the game at all.
    pub min_proficiency: i32,
    /// Drop negative entries instead of carrying them as reluctant ratings.
    pub drop_opt_outs: bool,
}

impl Default for LoadOptions {
    fn default() -> LoadOptions {
        LoadOptions {
            min_proficiency: 2,
            drop_opt_outs: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read roster table: {0}")]
    Io(#[from] std::io::Error),
    #[error("roster table has no header row")]
    MissingHeader,
    #[error("invalid score {value:?} for player {player:?} under {game:?}")]
    BadScore {
        player: String,
        game: String,
        value: String,
    },
    #[error("conflicting scores for player {player:?} under {game:?}: {existing} vs {incoming}")]
    ScoreConflict {
        player: String,
        game: String,
        existing: i32,
        incoming: i32,
    },
    #[error(transparent)]
    Roster(#[from] MatchupError),
}

/// Parses a tab-separated rating table. The header row names the games,
/// every other row is one player; blank cells mean the player never rated
/// that game.
pub fn parse_roster(text: &str, options: &LoadOptions) -> Result<Roster, TableError> {
    let mut lines = text.lines();
    let header = lines.next().ok_or(TableError::MissingHeader)?;
    let games: Vec<&str> = header.trim().split('\t').skip(1).collect();

    let mut players = Vec::new();
    for raw in lines {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let mut columns = line.split('\t');
        let name = columns.next().unwrap_or_default();
        let mut ratings: BTreeMap<Game, i32> = BTreeMap::new();
        for (game, cell) in games.iter().zip(columns) {
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }
            let score: i32 = cell.parse().map_err(|_| TableError::BadScore {
                player: name.to_owned(),
                game: (*game).to_owned(),
                value: cell.to_owned(),
            })?;
            if score < 0 && options.drop_opt_outs {
                continue;
            }
            if score.abs() < options.min_proficiency {
                continue;
            }
            ratings.insert((*game).to_owned(), score);
        }
        players.push(Player::new(name, ratings));
    }
    Ok(Roster::new(players)?)
}

/// Reads and parses a rating table from disk.
pub fn load_roster(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Roster, TableError> {
    let text = fs::read_to_string(path)?;
    parse_roster(&text, options)
}

/// Folds the ratings of `additional` into `base`. Games unknown to a base
/// player are adopted; a score that contradicts one already on record fails
/// the merge. Players present on only one side are logged and skipped.
pub fn merge_rosters(base: Roster, additional: &Roster) -> Result<Roster, TableError> {
    let base_names: BTreeSet<&str> = base.players().iter().map(|p| p.name()).collect();
    let extra_names: BTreeSet<&str> = additional.players().iter().map(|p| p.name()).collect();
    let missing: Vec<&&str> = base_names.difference(&extra_names).collect();
    if !missing.is_empty() {
        warn!(event = "merge_missing_players", players = ?missing);
    }
    let surplus: Vec<&&str> = extra_names.difference(&base_names).collect();
    if !surplus.is_empty() {
        warn!(event = "merge_surplus_players", players = ?surplus);
    }

    let mut merged = Vec::with_capacity(base.len());
    for player in base.players() {
        let mut ratings: BTreeMap<Game, i32> =
            player.ratings().map(|(game, score)| (game.clone(), score)).collect();
        if let Some(other) = additional.get(player.name()) {
            for (game, score) in other.ratings() {
                match ratings.get(game.as_str()) {
                    None => {
                        ratings.insert(game.clone(), score);
                    }
                    Some(&existing) if existing != score => {
                        return Err(TableError::ScoreConflict {
                            player: player.name().to_owned(),
                            game: game.clone(),
                            existing,
                            incoming: score,
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        merged.push(Player::new(player.name(), ratings));
    }
    Ok(Roster::new(merged)?)
}
