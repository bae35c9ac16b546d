use thiserror::Error;

/// Everything the matching engine can refuse to do.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MatchupError {
    #[error("no players to match")]
    NoPlayers,
    #[error("no candidate overlaps to search")]
    NoOverlaps,
    #[error("overlaps of mixed sizes: expected {expected}, found {found}")]
    MixedGroupSizes { expected: usize, found: usize },
    #[error("{players} players cannot be evenly divided into groups of {group_size}")]
    UnevenSplit { players: usize, group_size: usize },
    #[error("{count} players exceed the supported maximum of {max}")]
    TooManyPlayers { count: usize, max: usize },
    #[error("duplicate player {0:?}")]
    DuplicatePlayer(String),
    #[error("unknown player {0:?}")]
    UnknownPlayer(String),
    #[error("no valid matchups: {0}")]
    NoValidMatchups(String),
}

pub type Result<T> = std::result::Result<T, MatchupError>;
