use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{BoardError, Result};

/// Category IDs accepted onto a board during the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumedIds {
    ids: BTreeSet<u32>,
}

impl ConsumedIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id`; returns `false` if it was already consumed.
    pub fn insert(&mut self, id: u32) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn reset(&mut self) {
        self.ids.clear();
    }

    pub fn as_set(&self) -> &BTreeSet<u32> {
        &self.ids
    }

    pub fn extend<I: IntoIterator<Item = u32>>(&mut self, ids: I) {
        self.ids.extend(ids);
    }
}

/// Number of IDs in `1..=id_space_max` that are not excluded.
pub fn available_ids(id_space_max: u32, excluded: &BTreeSet<u32>) -> usize {
    let taken = excluded.range(1..=id_space_max.max(1)).count();
    (id_space_max as usize).saturating_sub(taken)
}

/// Draws `count` distinct IDs from `1..=id_space_max`, skipping `excluded`.
///
/// IDs come back in draw order. Fails with
/// [`BoardError::SamplingExhausted`] instead of spinning when the space
/// cannot supply `count` fresh IDs.
pub fn sample<R: Rng + ?Sized>(
    count: usize,
    id_space_max: u32,
    excluded: &BTreeSet<u32>,
    rng: &mut R,
) -> Result<Vec<u32>> {
    let available = available_ids(id_space_max, excluded);
    if available < count {
        return Err(BoardError::SamplingExhausted {
            requested: count,
            available,
        });
    }
    let mut drawn = Vec::with_capacity(count);
    let mut seen = BTreeSet::new();
    while drawn.len() < count {
        let id = rng.gen_range(1..=id_space_max);
        if !excluded.contains(&id) && seen.insert(id) {
            drawn.push(id);
        }
    }
    Ok(drawn)
}
