//! Who plays what with whom: split a roster of rated players into
//! fixed-size groups that each share a game they genuinely want to play,
//! pairing comparable ratings wherever possible. A winning split can then
//! be spread over sub-teams that are as even as a greedy pass can make
//! them.
//!
//! The pipeline has three stages:
//!
//! 1. build or load a [`Roster`], the owning catalog of rated [`Player`]s,
//! 2. enumerate candidate [`Overlap`]s and let [`find_matchups`] search for
//!    the cheapest complete splits of the whole population,
//! 3. hand a winning [`Matchup`] to [`balance_matchup`] and render both
//!    with the [`report`] helpers.
//!
//! ```
//! use game_matchup::{
//!     balance_matchup, enumerate_overlaps, find_matchups, Player, Roster, ScorePolicy,
//!     SearchConfig,
//! };
//!
//! let roster = Roster::new(vec![
//!     Player::new("Ada", [("chess", 5)]),
//!     Player::new("Ben", [("chess", 5)]),
//!     Player::new("Cid", [("chess", 3)]),
//!     Player::new("Dot", [("chess", 3)]),
//! ])?;
//! let players: Vec<_> = roster.players().iter().collect();
//!
//! let overlaps = enumerate_overlaps(&players, 2, &ScorePolicy::default());
//! let matchups = find_matchups(&players, &overlaps, &SearchConfig::default())?;
//!
//! // equals pair with equals: {Ada, Ben} and {Cid, Dot}
//! assert_eq!(matchups[0].total_cost(), 8.0);
//! assert!(balance_matchup(&matchups[0]).is_even());
//! # Ok::<(), game_matchup::MatchupError>(())
//! ```

pub mod balance;
pub mod error;
pub mod model;
pub mod overlap;
pub mod plan;
pub mod report;
pub mod search;
pub mod table;

pub use balance::{
    balance_matchup, greedy_balance, Assignment, BalancedMatchup, Team,
    DEFAULT_MISMATCH_TOLERANCE,
};
pub use error::{MatchupError, Result};
pub use model::entity::{Game, Player};
pub use model::policy::ScorePolicy;
pub use model::roster::Roster;
pub use overlap::{enumerate_overlaps, GameFit, Overlap};
pub use plan::plan_matchups;
pub use search::{find_matchups, Matchup, SearchConfig, MAX_POPULATION};
pub use table::{load_roster, merge_rosters, parse_roster, LoadOptions, TableError};
