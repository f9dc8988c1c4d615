use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RevealError;

/// Visible face of a board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealState {
    #[default]
    Hidden,
    Question,
    Answer,
}

impl RevealState {
    /// The only state reachable from `self`, if any.
    pub fn next(self) -> Option<RevealState> {
        match self {
            RevealState::Hidden => Some(RevealState::Question),
            RevealState::Question => Some(RevealState::Answer),
            RevealState::Answer => None,
        }
    }

    /// Checks a requested transition against the forward-only table.
    pub fn advance_to(self, target: RevealState) -> Result<RevealState, RevealError> {
        match self.next() {
            Some(next) if next == target => Ok(next),
            _ => Err(RevealError::InvalidTransition {
                from: self,
                to: target,
            }),
        }
    }
}

impl fmt::Display for RevealState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevealState::Hidden => write!(f, "hidden"),
            RevealState::Question => write!(f, "question"),
            RevealState::Answer => write!(f, "answer"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clue {
    pub question: String,
    pub answer: String,
    pub value: u32,
    reveal_state: RevealState,
}

impl Clue {
    pub fn new(question: impl Into<String>, answer: impl Into<String>, value: u32) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            value,
            reveal_state: RevealState::Hidden,
        }
    }

    pub fn reveal_state(&self) -> RevealState {
        self.reveal_state
    }

    /// Moves the clue one step forward and returns the new state.
    pub fn advance(&mut self) -> Result<RevealState, RevealError> {
        let target = self
            .reveal_state
            .next()
            .ok_or(RevealError::InvalidTransition {
                from: self.reveal_state,
                to: self.reveal_state,
            })?;
        self.advance_to(target)
    }

    pub fn advance_to(&mut self, target: RevealState) -> Result<RevealState, RevealError> {
        self.reveal_state = self.reveal_state.advance_to(target)?;
        Ok(self.reveal_state)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Source category ID from the API.
    pub id: u32,
    pub title: String,
    /// One clue per row, easiest first.
    pub clues: Vec<Clue>,
}

/// The finished grid: one column per category, one row per difficulty tier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Board {
    categories: Vec<Category>,
}

impl Board {
    pub(crate) fn from_categories(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Number of rows, taken from the first column.
    pub fn rows(&self) -> usize {
        self.categories.first().map_or(0, |c| c.clues.len())
    }

    pub fn category_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.categories.iter().map(|c| c.id)
    }

    /// Cells of one row, left to right.
    pub fn row(&self, row: usize) -> impl Iterator<Item = &Clue> + '_ {
        self.categories.iter().filter_map(move |c| c.clues.get(row))
    }

    pub fn clue(&self, category: usize, row: usize) -> Option<&Clue> {
        self.categories.get(category)?.clues.get(row)
    }

    pub(crate) fn clue_mut(&mut self, category: usize, row: usize) -> Option<&mut Clue> {
        self.categories.get_mut(category)?.clues.get_mut(row)
    }

    pub fn is_finished(&self) -> bool {
        self.categories
            .iter()
            .flat_map(|c| c.clues.iter())
            .all(|clue| clue.reveal_state() == RevealState::Answer)
    }
}

/// Dollar label painted on row `row` (0-based), rounded to the nearest 50.
pub fn row_display_value(row: usize, rows: usize, max_value: u32) -> u32 {
    if rows == 0 {
        return 0;
    }
    let raw = f64::from(max_value) / rows as f64 * (row + 1) as f64;
    ((raw / 50.0).round() * 50.0) as u32
}
