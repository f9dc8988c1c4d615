//! Error types for board assembly and play.

use thiserror::Error;

use crate::board::RevealState;

/// A single category could not be retrieved.
///
/// The assembler treats every variant as "zero usable clues" and moves on to
/// another ID; none of these abort board construction.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, DNS or timeout failure.
    #[error("network error fetching category {id}: {message}")]
    Network { id: u32, message: String },

    /// The API answered with a non-success status.
    #[error("category {id} returned HTTP {status}")]
    Status { id: u32, status: u16 },

    /// The body was not a category record of the expected shape.
    #[error("malformed payload for category {id}: {message}")]
    Payload { id: u32, message: String },
}

impl FetchError {
    pub fn category_id(&self) -> u32 {
        match self {
            Self::Network { id, .. } | Self::Status { id, .. } | Self::Payload { id, .. } => *id,
        }
    }
}

/// The bucketer could not fill every row of a category.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BucketError {
    #[error("no clue available at or below tier {row}")]
    NoDonor { row: u32 },
}

/// A rejected click on a board cell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RevealError {
    #[error("cannot move clue from {from} to {to}")]
    InvalidTransition { from: RevealState, to: RevealState },

    #[error("no clue at category {category}, row {row}")]
    OutOfBounds { category: usize, row: usize },

    #[error("no board is ready")]
    NoBoard,
}

/// Invalid [`GameConfig`](crate::GameConfig) values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },

    #[error("max clue value {max_value} is smaller than the {tiers} difficulty tiers")]
    TierWidth { max_value: u32, tiers: usize },

    #[error("ID space of {id_space} cannot supply {categories} distinct categories")]
    IdSpace { id_space: u32, categories: usize },
}

/// Errors surfaced by board construction.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("category {id} has {usable} usable clues, {required} required")]
    InsufficientClues {
        id: u32,
        usable: usize,
        required: usize,
    },

    /// Fatal: not enough unused IDs remain to fill the board.
    #[error("ID space exhausted: {requested} categories requested, {available} IDs available")]
    SamplingExhausted { requested: usize, available: usize },

    /// Fatal: the safety cap on fetch attempts was hit.
    #[error("gave up after {attempts} fetch attempts with {accepted} of {required} categories")]
    AttemptsExhausted {
        attempts: usize,
        accepted: usize,
        required: usize,
    },

    /// The run was superseded by a newer session start.
    #[error("board assembly was superseded by a restart")]
    Superseded,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BoardError {
    /// Whether this error ends board construction instead of triggering a resample.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Fetch(_) | Self::InsufficientClues { .. })
    }
}

pub type Result<T> = std::result::Result<T, BoardError>;
