use rand::Rng;
use std::collections::BTreeMap;

use crate::error::BucketError;

/// Clues grouped by difficulty tier. Tier 1 is the easiest row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierMap<T> {
    tiers: BTreeMap<u32, Vec<T>>,
}

impl<T> Default for TierMap<T> {
    fn default() -> Self {
        Self {
            tiers: BTreeMap::new(),
        }
    }
}

impl<T> TierMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `item` to `tier`; tier 0 is folded into tier 1.
    pub fn insert(&mut self, tier: u32, item: T) {
        self.tiers.entry(tier.max(1)).or_default().push(item);
    }

    pub fn tier(&self, tier: u32) -> &[T] {
        self.tiers.get(&tier).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.tiers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes a random clue for board row `row` (1-based).
    ///
    /// Draws from tier `row` when it has clues, otherwise from the nearest
    /// lower non-empty tier. Returns `None` once every tier from `row` down
    /// to 1 is empty.
    pub fn take_for_row<R: Rng + ?Sized>(&mut self, row: u32, rng: &mut R) -> Option<T> {
        let donor = (1..=row)
            .rev()
            .find(|tier| self.tiers.get(tier).is_some_and(|pool| !pool.is_empty()))?;
        let pool = self.tiers.get_mut(&donor)?;
        let item = pool.remove(rng.gen_range(0..pool.len()));
        if pool.is_empty() {
            self.tiers.remove(&donor);
        }
        Some(item)
    }
}

/// Tier for a point value: `round(value / (max_value / num_tiers))`, at least 1.
pub fn tier_for(value: u32, num_tiers: u32, max_value: u32) -> u32 {
    if num_tiers == 0 || max_value == 0 {
        return 1;
    }
    let width = f64::from(max_value) / f64::from(num_tiers);
    ((f64::from(value) / width).round() as u32).max(1)
}

/// Groups clues into difficulty tiers by point value.
pub fn bucket<T, I, F>(clues: I, num_tiers: u32, max_value: u32, value_of: F) -> TierMap<T>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> u32,
{
    let mut map = TierMap::new();
    for clue in clues {
        let tier = tier_for(value_of(&clue), num_tiers, max_value);
        map.insert(tier, clue);
    }
    map
}

/// Picks one clue per row, easiest first, consuming `map`.
pub fn assign_rows<T, R: Rng + ?Sized>(
    mut map: TierMap<T>,
    num_tiers: u32,
    rng: &mut R,
) -> Result<Vec<T>, BucketError> {
    let mut rows = Vec::with_capacity(num_tiers as usize);
    for row in 1..=num_tiers {
        let clue = map
            .take_for_row(row, rng)
            .ok_or(BucketError::NoDonor { row })?;
        rows.push(clue);
    }
    Ok(rows)
}
