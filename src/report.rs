//! Render matchups and balancings the way you would read them out to the
//! table: plain sentences, one group or team per line.

use crate::balance::BalancedMatchup;
use crate::model::entity::Player;
use crate::search::Matchup;

/// Joins items like prose: "a", "a and b", "a, b and c".
pub fn human_readable_list<I>(items: I) -> String
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let items: Vec<String> = items.into_iter().map(Into::into).collect();
    match items.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        [rest @ .., last] => format!("{} and {}", rest.join(", "), last),
    }
}

fn raw_rating(player: &Player, game: &str) -> i32 {
    player
        .proficiency(game)
        .expect("reported game is known to every member")
}

/// One paragraph per matchup: the overall error term, then per group who
/// plays what, with raw signed ratings and any alternative games.
pub fn format_matchup(matchup: &Matchup<'_>) -> String {
    let mut out = format!(
        "Found matchup with overall error term {}.\n\n",
        matchup.total_cost()
    );
    for group in matchup.groups() {
        let best = group
            .best_fit()
            .expect("matchup groups always have a playable game");
        let members = human_readable_list(
            group
                .players()
                .iter()
                .map(|p| format!("{} ({})", p.name(), raw_rating(p, best.game()))),
        );
        let mut line = format!(
            "{members} can play {} (Error term: {}).",
            best.game(),
            best.cost()
        );

        let alternatives = group.alternatives();
        if !alternatives.is_empty() {
            line.push_str(if alternatives.len() == 1 {
                " Alternative: "
            } else {
                " Alternatives: "
            });
            line.push_str(&human_readable_list(alternatives.iter().map(|alt| {
                let ratings: Vec<String> = group
                    .players()
                    .iter()
                    .map(|p| raw_rating(p, alt.game()).to_string())
                    .collect();
                format!("{} ({})", alt.game(), ratings.join("/"))
            })));
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// The team split, one line per team, with advice on how the balance might
/// still be improved when it is not already even.
pub fn format_balancing(balanced: &BalancedMatchup<'_>) -> String {
    let header = if balanced.is_even() {
        "Optimally balanced teams:"
    } else if balanced.optimal_balancing {
        if balanced.alternate_games {
            "Optimally balanced teams with these games:"
        } else {
            "Optimally balanced teams:"
        }
    } else if balanced.alternate_games {
        "One way to balance the teams with these games:"
    } else {
        "One way to balance the teams:"
    };

    let mut out = String::from(header);
    out.push('\n');
    for (i, team) in balanced.teams.iter().enumerate() {
        let members = human_readable_list(
            team.assignments
                .iter()
                .map(|a| format!("{} ({})", a.player.name(), a.proficiency)),
        );
        out.push_str(&format!(
            "Team {}: {members} - Overall proficiency: {}.\n",
            i + 1,
            team.total
        ));
    }

    if !balanced.is_even() {
        let advice = if balanced.alternate_games && !balanced.optimal_balancing {
            Some("You may be able to achieve a better balance by choosing alternate games or swapping players.")
        } else if balanced.alternate_games {
            Some("You may be able to achieve a better balance by choosing alternate games.")
        } else if !balanced.optimal_balancing {
            Some("You may be able to achieve a better balance by swapping players.")
        } else {
            None
        };
        if let Some(advice) = advice {
            out.push('\n');
            out.push_str(advice);
            out.push('\n');
        }
    }
    out
}

/// Matchup paragraph and team split in one go.
pub fn format_report(matchup: &Matchup<'_>, balanced: &BalancedMatchup<'_>) -> String {
    format!("{}\n{}", format_matchup(matchup), format_balancing(balanced))
}
