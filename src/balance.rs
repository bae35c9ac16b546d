use crate::model::entity::{Game, Player};
use crate::search::Matchup;

/// Groups with internal rating mismatches tolerated before a balancing
/// stops being reported as optimal. Heuristic, not a proof.
pub const DEFAULT_MISMATCH_TOLERANCE: usize = 2;

/// One player seated on a sub-team, playing their group's game at
/// `proficiency` strength. Reluctant ratings count at full strength here.
#[derive(Debug, Clone)]
pub struct Assignment<'a> {
    pub player: &'a Player,
    pub game: Game,
    pub proficiency: i32,
}

impl<'a> Assignment<'a> {
    fn build(player: &'a Player, game: &str) -> Assignment<'a> {
        let rating = player
            .proficiency(game)
            .expect("assigned game is known to the player");
        Assignment {
            player,
            game: game.to_owned(),
            proficiency: rating.abs(),
        }
    }
}

/// A sub-team: one seat per group of the matchup.
#[derive(Debug, Clone, Default)]
pub struct Team<'a> {
    pub assignments: Vec<Assignment<'a>>,
    pub total: i32,
}

/// A matchup split into sub-teams, with advisory quality flags.
#[derive(Debug, Clone)]
pub struct BalancedMatchup<'a> {
    pub teams: Vec<Team<'a>>,
    /// At most the tolerated number of groups had internal rating
    /// mismatches, so the greedy pass had little room to go wrong.
    pub optimal_balancing: bool,
    /// Some group could play a different game with a different gap profile.
    pub alternate_games: bool,
}

impl<'a> BalancedMatchup<'a> {
    /// Difference between the strongest and weakest team totals.
    pub fn spread(&self) -> i32 {
        let strongest = self.teams.iter().map(|team| team.total).max().unwrap_or(0);
        let weakest = self.teams.iter().map(|team| team.total).min().unwrap_or(0);
        strongest - weakest
    }

    /// True when every team lands on the same aggregate strength.
    pub fn is_even(&self) -> bool {
        self.spread() == 0
    }
}

/// Balances with [`DEFAULT_MISMATCH_TOLERANCE`].
pub fn balance_matchup<'a>(matchup: &Matchup<'a>) -> BalancedMatchup<'a> {
    greedy_balance(matchup, DEFAULT_MISMATCH_TOLERANCE)
}

/// Spreads each group's members over as many sub-teams as a group has
/// seats: per group, the weakest incoming player joins the currently
/// strongest team. Greedy, so not always optimal, but it only loses when
/// more than a couple of groups are internally mismatched.
///
/// Panics when `matchup` has no groups.
pub fn greedy_balance<'a>(matchup: &Matchup<'a>, mismatch_tolerance: usize) -> BalancedMatchup<'a> {
    let groups = matchup.groups();
    assert!(!groups.is_empty(), "cannot balance an empty matchup");

    let seats = groups[0].players().len();
    let mut teams: Vec<Team<'a>> = (0..seats).map(|_| Team::default()).collect();
    let mut mismatched_groups = 0;
    let mut alternate_games = false;

    for group in groups {
        let best = group
            .best_fit()
            .expect("matchup groups always have a playable game");
        alternate_games |= group
            .alternatives()
            .iter()
            .any(|alt| alt.gaps() != best.gaps());

        // strongest team first, weakest incoming player first; both sorts
        // are stable and the members arrive in name order, so rating ties
        // stay deterministic
        teams.sort_by(|a, b| b.total.cmp(&a.total));
        let mut incoming: Vec<Assignment<'a>> = group
            .players()
            .iter()
            .copied()
            .map(|player| Assignment::build(player, best.game()))
            .collect();
        incoming.sort_by_key(|assignment| assignment.proficiency);

        if incoming
            .iter()
            .any(|assignment| assignment.proficiency != incoming[0].proficiency)
        {
            mismatched_groups += 1;
        }
        for (team, assignment) in teams.iter_mut().zip(incoming) {
            team.total += assignment.proficiency;
            team.assignments.push(assignment);
        }
    }

    BalancedMatchup {
        teams,
        optimal_balancing: mismatched_groups <= mismatch_tolerance,
        alternate_games,
    }
}
