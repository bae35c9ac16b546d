use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::info;

use crate::error::{MatchupError, Result};
use crate::model::entity::Player;
use crate::overlap::Overlap;

/// Population membership as a bit-set. Bit `i` stands for player `i` of one
/// search's private ordinal numbering.
type PlayerMask = u128;

/// A candidate overlap as the search sees it: membership mask and the cost
/// of its best fit.
type Candidate = (PlayerMask, f64);

/// The widest population a single search can index.
pub const MAX_POPULATION: usize = PlayerMask::BITS as usize;

/// Search knobs. These trade time for memory and core usage; every mode
/// returns the same set of best totals.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// How many matchups to keep. Smaller ledgers prune harder.
    pub max_results: usize,
    /// Split the search into shards completed on a worker pool.
    pub parallel: bool,
    /// Grow the shard prefix until it fans out into more shards than this.
    pub min_shards: usize,
    /// Ledger size per shard worker, capped by `max_results`. Workers that
    /// keep fewer than `max_results` entries can drop globally good results,
    /// so raise this to `max_results` when completeness matters more than
    /// memory.
    pub results_per_worker: usize,
    /// Let workers share one advisory cost bound. The bound only ever
    /// decreases; stale reads just prune less.
    pub share_bound: bool,
}

impl Default for SearchConfig {
    fn default() -> SearchConfig {
        SearchConfig {
            max_results: 10,
            parallel: false,
            min_shards: 20,
            results_per_worker: 3,
            share_bound: false,
        }
    }
}

/// One way to split the whole population into disjoint groups, each playing
/// its best shared game. Produced by [`find_matchups`], cheapest first.
#[derive(Debug, Clone)]
pub struct Matchup<'a> {
    groups: Vec<Overlap<'a>>,
    total_cost: f64,
}

impl<'a> Matchup<'a> {
    pub(crate) fn from_parts(groups: Vec<Overlap<'a>>, total_cost: f64) -> Matchup<'a> {
        Matchup { groups, total_cost }
    }

    /// The chosen groups, in the order the search filled its slots.
    pub fn groups(&self) -> &[Overlap<'a>] {
        &self.groups
    }

    /// Sum of the groups' best-fit costs.
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }
}

/// A recorded completion: chosen masks, their total, and the candidates
/// still live at that point. The leftovers seed shard workers; full-depth
/// runs always record an empty list.
#[derive(Debug, Clone)]
struct Found {
    slots: Vec<PlayerMask>,
    total: f64,
    leftover: Vec<Candidate>,
}

/// Result ledger with the running prune bound. `keep: None` records every
/// completion and never tightens the bound, which is what the shard prefix
/// pass needs.
struct Ledger {
    keep: Option<usize>,
    full: PlayerMask,
    bound: f64,
    found: Vec<Found>,
}

impl Ledger {
    fn new(keep: Option<usize>, full: PlayerMask) -> Ledger {
        Ledger {
            keep,
            full,
            bound: f64::INFINITY,
            found: Vec::new(),
        }
    }

    fn record(&mut self, slots: Vec<PlayerMask>, total: f64, leftover: Vec<Candidate>) {
        self.found.push(Found {
            slots,
            total,
            leftover,
        });
        self.found.sort_by(|a, b| a.total.total_cmp(&b.total));
        if let Some(keep) = self.keep {
            if self.found.len() > keep {
                self.found.pop();
            }
            if self.found.len() == keep {
                // the worst kept total is the tightest bound that cannot
                // prune a result we would keep; the prune is strict, so
                // ties at the bound still compete
                if let Some(worst) = self.found.last() {
                    self.bound = worst.total;
                }
            }
        }
    }
}

/// Fixed data of one search: the candidate list sorted cheapest first and
/// the mapping back from masks to overlaps.
struct Space {
    group_count: usize,
    full: PlayerMask,
    candidates: Vec<Candidate>,
    by_mask: HashMap<PlayerMask, usize>,
}

fn build_space(players: &[&Player], overlaps: &[Overlap<'_>]) -> Result<Space> {
    if players.is_empty() {
        return Err(MatchupError::NoPlayers);
    }
    if overlaps.is_empty() {
        return Err(MatchupError::NoOverlaps);
    }
    if players.len() > MAX_POPULATION {
        return Err(MatchupError::TooManyPlayers {
            count: players.len(),
            max: MAX_POPULATION,
        });
    }

    let group_size = overlaps[0].players().len();
    for overlap in overlaps {
        if overlap.players().len() != group_size {
            return Err(MatchupError::MixedGroupSizes {
                expected: group_size,
                found: overlap.players().len(),
            });
        }
    }
    if group_size == 0 || players.len() % group_size != 0 {
        return Err(MatchupError::UnevenSplit {
            players: players.len(),
            group_size,
        });
    }

    // ordinal numbering, private to this search
    let mut index = HashMap::with_capacity(players.len());
    for (ordinal, player) in players.iter().enumerate() {
        if index.insert(player.name(), ordinal).is_some() {
            return Err(MatchupError::DuplicatePlayer(player.name().to_owned()));
        }
    }
    let full = PlayerMask::MAX >> (MAX_POPULATION - players.len());

    let mut candidates = Vec::with_capacity(overlaps.len());
    let mut by_mask = HashMap::with_capacity(overlaps.len());
    for (position, overlap) in overlaps.iter().enumerate() {
        let mut mask: PlayerMask = 0;
        for player in overlap.players() {
            let ordinal = index
                .get(player.name())
                .ok_or_else(|| MatchupError::UnknownPlayer(player.name().to_owned()))?;
            mask |= 1 << ordinal;
        }
        let best = overlap
            .best_fit()
            .expect("empty overlaps are discarded before the search");
        candidates.push((mask, best.cost()));
        by_mask.insert(mask, position);
    }

    // fail fast when somebody cannot be grouped at all
    let reachable = candidates.iter().fold(0, |acc, (mask, _)| acc | mask);
    if reachable != full {
        let missing: Vec<&str> = players
            .iter()
            .map(|player| player.name())
            .filter(|name| reachable & (1 << index[name]) == 0)
            .collect();
        return Err(MatchupError::NoValidMatchups(format!(
            "players {missing:?} appear in no candidate overlap"
        )));
    }

    candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
    Ok(Space {
        group_count: players.len() / group_size,
        full,
        candidates,
        by_mask,
    })
}

/// Depth-first slot filling. Candidates are consumed cheapest first and the
/// recursion only ever looks at the suffix after the chosen one, so every
/// unordered set of disjoint groups is visited exactly once.
fn explore(
    stack: &mut Vec<PlayerMask>,
    pool: &[Candidate],
    used: PlayerMask,
    slots_left: usize,
    total: f64,
    ledger: &mut Ledger,
) {
    let live: Vec<Candidate> = pool
        .iter()
        .copied()
        .filter(|(mask, _)| mask & used == 0)
        .collect();

    if slots_left == 0 {
        ledger.record(stack.clone(), total, live);
        return;
    }

    // the live candidates must be able to seat everyone who is still free
    let reach = live.iter().fold(used, |acc, (mask, _)| acc | mask);
    if reach != ledger.full {
        return;
    }

    for i in 0..live.len() {
        let (mask, cost) = live[i];
        let next = total + cost;
        if next > ledger.bound {
            continue;
        }
        stack.push(mask);
        explore(stack, &live[i + 1..], used | mask, slots_left - 1, next, ledger);
        stack.pop();
    }
}

fn run_single(space: &Space, config: &SearchConfig) -> Vec<Found> {
    let mut ledger = Ledger::new(Some(config.max_results), space.full);
    explore(
        &mut Vec::new(),
        &space.candidates,
        0,
        space.group_count,
        0.0,
        &mut ledger,
    );
    ledger.found
}

fn run_parallel(space: &Space, config: &SearchConfig) -> Vec<Found> {
    let worker_cap = config.results_per_worker.min(config.max_results);

    // deepen the unbounded prefix pass until it fans out widely enough
    let mut presets = Vec::new();
    let mut depth = 0;
    for d in 1..space.group_count {
        let mut ledger = Ledger::new(None, space.full);
        explore(&mut Vec::new(), &space.candidates, 0, d, 0.0, &mut ledger);
        presets = ledger.found;
        depth = d;
        if presets.len() > config.min_shards {
            break;
        }
    }
    if presets.is_empty() {
        // a single group cannot be sharded; same answers, one thread
        return run_single(space, config);
    }
    info!(event = "shards_dispatched", shards = presets.len(), depth);

    let shared_bound = config
        .share_bound
        .then(|| Arc::new(AtomicU64::new(f64::INFINITY.to_bits())));
    let group_count = space.group_count;
    let full = space.full;

    let mut found: Vec<Found> = presets
        .into_par_iter()
        .flat_map(|preset| {
            let mut ledger = Ledger::new(Some(worker_cap), full);
            if let Some(bound) = &shared_bound {
                // advisory only: a stale value just prunes less; costs are
                // non-negative, so their bit patterns order like the floats
                ledger.bound = f64::from_bits(bound.load(Ordering::Relaxed));
            }
            let mut stack = preset.slots;
            let used = stack.iter().fold(0, |acc, mask| acc | mask);
            explore(
                &mut stack,
                &preset.leftover,
                used,
                group_count - depth,
                preset.total,
                &mut ledger,
            );
            if let Some(bound) = &shared_bound {
                bound.fetch_min(ledger.bound.to_bits(), Ordering::Relaxed);
            }
            ledger.found
        })
        .collect();

    found.sort_by(|a, b| a.total.total_cmp(&b.total));
    found.truncate(config.max_results);
    found
}

/// Finds the cheapest ways to split `players` into disjoint groups drawn
/// from `overlaps`. Returns at most `config.max_results` matchups sorted
/// ascending by total cost; equal totals may come back in any order.
pub fn find_matchups<'a>(
    players: &[&'a Player],
    overlaps: &[Overlap<'a>],
    config: &SearchConfig,
) -> Result<Vec<Matchup<'a>>> {
    let space = build_space(players, overlaps)?;
    info!(
        event = "search_start",
        players = players.len(),
        candidates = space.candidates.len(),
        groups = space.group_count,
        parallel = config.parallel
    );

    let found = if config.parallel {
        run_parallel(&space, config)
    } else {
        run_single(&space, config)
    };

    if found.is_empty() {
        return Err(MatchupError::NoValidMatchups(
            "the candidate overlaps admit no complete split".to_owned(),
        ));
    }

    let matchups: Vec<Matchup<'a>> = found
        .into_iter()
        .map(|result| {
            let groups: Vec<Overlap<'a>> = result
                .slots
                .iter()
                .map(|mask| overlaps[space.by_mask[mask]].clone())
                .collect();
            Matchup::from_parts(groups, result.total)
        })
        .collect();

    info!(
        event = "search_end",
        matchups = matchups.len(),
        best_cost = matchups[0].total_cost
    );
    Ok(matchups)
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::model::policy::ScorePolicy;
    use crate::model::roster::Roster;
    use crate::overlap::enumerate_overlaps;

    fn player(name: &str, ratings: &[(&str, i32)]) -> Player {
        Player::new(name, ratings.iter().copied())
    }

    fn chess_quartet() -> Roster {
        Roster::new(vec![
            player("Ada", &[("chess", 5)]),
            player("Ben", &[("chess", 5)]),
            player("Cid", &[("chess", 3)]),
            player("Dot", &[("chess", 3)]),
        ])
        .unwrap()
    }

    fn group_names(matchup: &Matchup<'_>) -> Vec<Vec<String>> {
        matchup
            .groups()
            .iter()
            .map(|group| {
                group
                    .players()
                    .iter()
                    .map(|p| p.name().to_owned())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn pairs_matched_ratings_over_mixed_ones() {
        let roster = chess_quartet();
        let players: Vec<&Player> = roster.players().iter().collect();
        let overlaps = enumerate_overlaps(&players, 2, &ScorePolicy::default());
        let matchups = find_matchups(&players, &overlaps, &SearchConfig::default()).unwrap();

        // {Ada,Ben} costs 3, {Cid,Dot} costs 5; any mixed pairing costs 13
        assert_eq!(matchups[0].total_cost(), 8.0);
        let groups = group_names(&matchups[0]);
        assert!(groups.contains(&vec!["Ada".to_owned(), "Ben".to_owned()]));
        assert!(groups.contains(&vec!["Cid".to_owned(), "Dot".to_owned()]));

        assert!(matchups[1].total_cost() > matchups[0].total_cost());
        for pair in matchups.windows(2) {
            assert!(pair[0].total_cost() <= pair[1].total_cost());
        }
    }

    #[test]
    fn every_matchup_is_an_exact_split_of_the_population() {
        let roster = chess_quartet();
        let players: Vec<&Player> = roster.players().iter().collect();
        let overlaps = enumerate_overlaps(&players, 2, &ScorePolicy::default());
        let matchups = find_matchups(&players, &overlaps, &SearchConfig::default()).unwrap();

        assert_eq!(matchups.len(), 3);
        for matchup in &matchups {
            let mut names: Vec<String> = group_names(matchup).into_iter().flatten().collect();
            names.sort();
            assert_eq!(names, ["Ada", "Ben", "Cid", "Dot"]);
        }
    }

    #[test]
    fn repeated_searches_return_the_same_answer() {
        let roster = chess_quartet();
        let players: Vec<&Player> = roster.players().iter().collect();
        let overlaps = enumerate_overlaps(&players, 2, &ScorePolicy::default());
        let config = SearchConfig::default();

        let first = find_matchups(&players, &overlaps, &config).unwrap();
        let second = find_matchups(&players, &overlaps, &config).unwrap();
        let totals = |found: &[Matchup<'_>]| -> Vec<f64> {
            found.iter().map(|m| m.total_cost()).collect()
        };
        assert_eq!(totals(&first), totals(&second));
        assert_eq!(group_names(&first[0]), group_names(&second[0]));
    }

    #[test]
    fn ledger_keeps_at_most_max_results() {
        let roster = chess_quartet();
        let players: Vec<&Player> = roster.players().iter().collect();
        let overlaps = enumerate_overlaps(&players, 2, &ScorePolicy::default());
        let config = SearchConfig {
            max_results: 1,
            ..SearchConfig::default()
        };
        let matchups = find_matchups(&players, &overlaps, &config).unwrap();
        assert_eq!(matchups.len(), 1);
        assert_eq!(matchups[0].total_cost(), 8.0);
    }

    #[test]
    fn coverage_gaps_are_reported_before_searching() {
        let roster = Roster::new(vec![
            player("Ada", &[("chess", 5)]),
            player("Ben", &[("chess", 5)]),
            player("Cid", &[("chess", 3)]),
            player("Eve", &[("go", 3)]),
        ])
        .unwrap();
        let players: Vec<&Player> = roster.players().iter().collect();
        let overlaps = enumerate_overlaps(&players, 2, &ScorePolicy::default());
        let err = find_matchups(&players, &overlaps, &SearchConfig::default()).unwrap_err();
        match err {
            MatchupError::NoValidMatchups(reason) => assert!(reason.contains("Eve")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn coverage_without_a_complete_split_still_fails() {
        // every pair contains Ada, so two disjoint pairs cannot exist
        let roster = Roster::new(vec![
            player("Ada", &[("ab", 3), ("ac", 3), ("ad", 3)]),
            player("Ben", &[("ab", 3)]),
            player("Cid", &[("ac", 3)]),
            player("Dot", &[("ad", 3)]),
        ])
        .unwrap();
        let players: Vec<&Player> = roster.players().iter().collect();
        let overlaps = enumerate_overlaps(&players, 2, &ScorePolicy::default());
        assert_eq!(overlaps.len(), 3);
        let err = find_matchups(&players, &overlaps, &SearchConfig::default()).unwrap_err();
        assert!(matches!(err, MatchupError::NoValidMatchups(_)));
    }

    #[test]
    fn rejects_bad_inputs_before_searching() {
        let roster = chess_quartet();
        let players: Vec<&Player> = roster.players().iter().collect();
        let policy = ScorePolicy::default();
        let overlaps = enumerate_overlaps(&players, 2, &policy);
        let config = SearchConfig::default();

        assert_eq!(
            find_matchups(&[], &overlaps, &config).unwrap_err(),
            MatchupError::NoPlayers
        );
        assert_eq!(
            find_matchups(&players, &[], &config).unwrap_err(),
            MatchupError::NoOverlaps
        );

        let trio = enumerate_overlaps(&players[..3], 3, &policy);
        let mixed: Vec<Overlap<'_>> = overlaps.iter().take(1).chain(trio.iter()).cloned().collect();
        assert_eq!(
            find_matchups(&players, &mixed, &config).unwrap_err(),
            MatchupError::MixedGroupSizes {
                expected: 2,
                found: 3
            }
        );

        assert_eq!(
            find_matchups(&players[..3], &overlaps, &config).unwrap_err(),
            MatchupError::UnevenSplit {
                players: 3,
                group_size: 2
            }
        );

        let doubled = [players[0], players[0]];
        assert_eq!(
            find_matchups(&doubled, &overlaps, &config).unwrap_err(),
            MatchupError::DuplicatePlayer("Ada".to_owned())
        );
    }

    #[test]
    fn overlap_members_outside_the_population_are_refused() {
        let roster = chess_quartet();
        let players: Vec<&Player> = roster.players().iter().collect();
        // candidates drawn from the whole quartet, searched over half of it
        let overlaps = enumerate_overlaps(&players, 2, &ScorePolicy::default());
        assert_eq!(
            find_matchups(&players[..2], &overlaps, &SearchConfig::default()).unwrap_err(),
            MatchupError::UnknownPlayer("Cid".to_owned())
        );
    }

    #[test]
    fn oversized_populations_are_refused() {
        let many: Vec<Player> = (0..=MAX_POPULATION)
            .map(|i| player(&format!("p{i:03}"), &[("chess", 3)]))
            .collect();
        let players: Vec<&Player> = many.iter().collect();
        let overlaps = enumerate_overlaps(&players[..2], 2, &ScorePolicy::default());
        assert_eq!(
            find_matchups(&players, &overlaps, &SearchConfig::default()).unwrap_err(),
            MatchupError::TooManyPlayers {
                count: MAX_POPULATION + 1,
                max: MAX_POPULATION
            }
        );
    }

    /// Twelve players who all share one game, most with extras, so any seed
    /// yields a fully matchable population.
    fn random_dozen(seed: u64) -> Vec<Player> {
        let mut rng = SmallRng::seed_from_u64(seed);
        (0..12)
            .map(|i| {
                let mut ratings = vec![("catan".to_owned(), rng.gen_range(1..=9))];
                for game in ["chess", "go", "tarot", "uno"] {
                    if rng.gen_bool(0.6) {
                        ratings.push((game.to_owned(), rng.gen_range(-3..=9)));
                    }
                }
                Player::new(format!("p{i:02}"), ratings)
            })
            .collect()
    }

    #[test]
    fn parallel_search_agrees_with_single_threaded() {
        let population = random_dozen(0x5eed);
        let players: Vec<&Player> = population.iter().collect();
        let overlaps = enumerate_overlaps(&players, 2, &ScorePolicy::default());

        let single = SearchConfig::default();
        let sharded = SearchConfig {
            parallel: true,
            min_shards: 1,
            results_per_worker: single.max_results,
            ..SearchConfig::default()
        };

        let sequential = find_matchups(&players, &overlaps, &single).unwrap();
        let parallel = find_matchups(&players, &overlaps, &sharded).unwrap();

        assert_eq!(sequential.len(), parallel.len());
        let totals = |found: &[Matchup<'_>]| -> Vec<f64> {
            found.iter().map(|m| m.total_cost()).collect()
        };
        assert_eq!(totals(&sequential), totals(&parallel));
    }

    #[test]
    fn underfull_shard_dispatch_agrees_with_single_threaded() {
        // six candidates never fan out past the default shard threshold, so
        // the dispatch runs on the deepest prefix it reached
        let roster = chess_quartet();
        let players: Vec<&Player> = roster.players().iter().collect();
        let overlaps = enumerate_overlaps(&players, 2, &ScorePolicy::default());

        let single = SearchConfig::default();
        let sharded = SearchConfig {
            parallel: true,
            ..SearchConfig::default()
        };

        let sequential = find_matchups(&players, &overlaps, &single).unwrap();
        let parallel = find_matchups(&players, &overlaps, &sharded).unwrap();
        let totals = |found: &[Matchup<'_>]| -> Vec<f64> {
            found.iter().map(|m| m.total_cost()).collect()
        };
        assert_eq!(totals(&sequential), [8.0, 26.0, 26.0]);
        assert_eq!(totals(&sequential), totals(&parallel));
    }

    #[test]
    fn sharing_the_bound_does_not_change_the_answers() {
        let population = random_dozen(0xbeef);
        let players: Vec<&Player> = population.iter().collect();
        let overlaps = enumerate_overlaps(&players, 2, &ScorePolicy::default());

        let isolated = SearchConfig {
            parallel: true,
            min_shards: 1,
            results_per_worker: 10,
            share_bound: false,
            ..SearchConfig::default()
        };
        let shared = SearchConfig {
            share_bound: true,
            ..isolated.clone()
        };

        let without = find_matchups(&players, &overlaps, &isolated).unwrap();
        let with = find_matchups(&players, &overlaps, &shared).unwrap();
        let totals = |found: &[Matchup<'_>]| -> Vec<f64> {
            found.iter().map(|m| m.total_cost()).collect()
        };
        assert_eq!(totals(&without), totals(&with));
    }

    #[test]
    fn parallel_mode_handles_a_single_group() {
        // one group means nothing to shard; the search must still answer
        let roster = Roster::new(vec![
            player("Ada", &[("chess", 5)]),
            player("Ben", &[("chess", 5)]),
        ])
        .unwrap();
        let players: Vec<&Player> = roster.players().iter().collect();
        let overlaps = enumerate_overlaps(&players, 2, &ScorePolicy::default());
        let config = SearchConfig {
            parallel: true,
            ..SearchConfig::default()
        };
        let matchups = find_matchups(&players, &overlaps, &config).unwrap();
        assert_eq!(matchups.len(), 1);
        assert_eq!(matchups[0].total_cost(), 3.0);
    }
}
