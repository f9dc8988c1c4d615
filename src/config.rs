use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Category IDs on jService start at 1 and end here.
pub const DEFAULT_ID_SPACE: u32 = 18_418;
/// Highest clue value seen on jService.
pub const DEFAULT_MAX_CLUE_VALUE: u32 = 1_000;
pub const DEFAULT_API_URL: &str = "https://jservice.io/api";

/// What `restart()` does with the consumed-ID registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryPolicy {
    /// Forget consumed IDs, so a restart may repeat earlier categories.
    #[default]
    ClearOnRestart,
    /// Keep consumed IDs until an explicit reset.
    Persist,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Board columns.
    pub num_categories: usize,
    /// Board rows, also the number of difficulty tiers.
    pub clues_per_category: usize,
    pub id_space_max: u32,
    pub max_clue_value: u32,
    /// Fetches allowed per assembly before giving up; `None` retries forever.
    pub max_attempts: Option<usize>,
    /// Skip IDs rejected earlier in the same assembly.
    pub exclude_rejected: bool,
    pub registry_policy: RegistryPolicy,
    /// Fixed RNG seed for reproducible boards.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            num_categories: 6,
            clues_per_category: 5,
            id_space_max: DEFAULT_ID_SPACE,
            max_clue_value: DEFAULT_MAX_CLUE_VALUE,
            max_attempts: Some(200),
            exclude_rejected: false,
            registry_policy: RegistryPolicy::default(),
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_categories == 0 {
            return Err(ConfigError::Zero {
                field: "num_categories",
            });
        }
        if self.clues_per_category == 0 {
            return Err(ConfigError::Zero {
                field: "clues_per_category",
            });
        }
        if self.max_attempts == Some(0) {
            return Err(ConfigError::Zero {
                field: "max_attempts",
            });
        }
        if (self.max_clue_value as usize) < self.clues_per_category {
            return Err(ConfigError::TierWidth {
                max_value: self.max_clue_value,
                tiers: self.clues_per_category,
            });
        }
        if (self.id_space_max as usize) < self.num_categories {
            return Err(ConfigError::IdSpace {
                id_space: self.id_space_max,
                categories: self.num_categories,
            });
        }
        Ok(())
    }

    pub fn tiers(&self) -> u32 {
        self.clues_per_category as u32
    }
}

/// Connection settings for [`HttpCategorySource`](crate::HttpCategorySource).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(10),
            user_agent: concat!("jeopardy-rs/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
