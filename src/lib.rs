//! Trivia boards assembled from a jService-style category API.
//!
//! [`assemble`] samples category IDs, fetches each category, keeps usable
//! and unique clues, orders them by difficulty tier, and backfills rejected
//! columns until the board is full. [`Session`] wraps that pipeline with the
//! state a game needs between clicks.

mod assemble;
mod board;
mod bucket;
mod config;
mod data;
mod error;
mod fetch;
mod sampler;
mod sanitize;
mod session;
mod telemetry;
mod validate;

#[cfg(feature = "web")]
pub mod web;

pub use assemble::{Assembly, assemble, build_category};
pub use board::{Board, Category, Clue, RevealState, row_display_value};
pub use bucket::{TierMap, assign_rows, bucket, tier_for};
pub use config::{
    DEFAULT_API_URL, DEFAULT_ID_SPACE, DEFAULT_MAX_CLUE_VALUE, GameConfig, RegistryPolicy,
    SourceConfig,
};
pub use data::{RawCategory, RawClue, parse_category};
pub use error::{BoardError, BucketError, ConfigError, FetchError, Result, RevealError};
pub use fetch::{CategorySource, HttpCategorySource};
pub use sampler::{ConsumedIds, available_ids, sample};
pub use sanitize::sanitize;
pub use session::{RunTicket, Session, SessionStatus};
pub use telemetry::{AssemblyStats, Rejection, Stage};
pub use validate::filter_valid;
