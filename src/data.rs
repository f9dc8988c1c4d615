use serde::{Deserialize, Deserializer, Serialize};

use crate::error::FetchError;

/// One category as served by `GET /category?id=N`.
///
/// Unknown fields (air dates, game IDs, timestamps) are ignored; missing or
/// mistyped required fields fail the parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCategory {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub clues_count: Option<u32>,
    pub clues: Vec<RawClue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawClue {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub question: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub answer: String,
    #[serde(default)]
    pub value: Option<u32>,
    #[serde(default)]
    pub invalid_count: Option<u32>,
}

impl RawClue {
    /// Point value, with a missing value counted as zero.
    pub fn points(&self) -> u32 {
        self.value.unwrap_or(0)
    }

    pub fn is_flagged(&self) -> bool {
        self.invalid_count.is_some()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parses a category body and checks it answers the request for `id`.
pub fn parse_category(id: u32, bytes: &[u8]) -> Result<RawCategory, FetchError> {
    let category: RawCategory =
        serde_json::from_slice(bytes).map_err(|err| FetchError::Payload {
            id,
            message: err.to_string(),
        })?;
    if category.id != id {
        return Err(FetchError::Payload {
            id,
            message: format!("payload is for category {}", category.id),
        });
    }
    Ok(category)
}
