use std::collections::HashMap;

use tracing::info;

use crate::error::{MatchupError, Result};
use crate::model::entity::Player;
use crate::model::policy::ScorePolicy;
use crate::overlap::enumerate_overlaps;
use crate::search::{find_matchups, Matchup, SearchConfig};

/// The whole pipeline in one call: enumerate candidate overlaps for
/// `players`, check that everyone can be grouped at all, and run the
/// partition search.
pub fn plan_matchups<'a>(
    players: &[&'a Player],
    group_size: usize,
    policy: &ScorePolicy,
    config: &SearchConfig,
) -> Result<Vec<Matchup<'a>>> {
    info!(event = "plan_start", players = players.len(), group_size);
    let overlaps = enumerate_overlaps(players, group_size, policy);

    // name the unmatchable players instead of letting the search fail dry
    let mut appearances: HashMap<&str, usize> =
        players.iter().map(|player| (player.name(), 0)).collect();
    for overlap in &overlaps {
        for player in overlap.players() {
            if let Some(count) = appearances.get_mut(player.name()) {
                *count += 1;
            }
        }
    }
    let mut unmatched: Vec<&str> = appearances
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(name, _)| *name)
        .collect();
    if !unmatched.is_empty() {
        unmatched.sort_unstable();
        return Err(MatchupError::NoValidMatchups(format!(
            "players {unmatched:?} cannot fill any group of {group_size}"
        )));
    }

    find_matchups(players, &overlaps, config)
}
