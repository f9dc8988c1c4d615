//! Board assembly: sample IDs, fetch, validate, bucket, and backfill until
//! every column holds an accepted category.
//!
//! Each round samples one ID per missing column and fetches the batch
//! concurrently. Results are processed in draw order, so a seeded run always
//! produces the same board. A rejected ID is not added to the consumed-ID
//! registry and may be drawn again in a later round unless
//! [`GameConfig::exclude_rejected`] is set.

use futures::future::join_all;
use rand::Rng;
use std::borrow::Cow;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::board::{Board, Category, Clue};
use crate::bucket::{assign_rows, bucket};
use crate::config::GameConfig;
use crate::data::{RawCategory, RawClue};
use crate::error::{BoardError, FetchError, Result};
use crate::fetch::CategorySource;
use crate::sampler::{ConsumedIds, sample};
use crate::sanitize::sanitize;
use crate::telemetry::{AssemblyStats, Stage, Timer};
use crate::validate::filter_valid;

/// A finished board and how it was reached.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub board: Board,
    pub stats: AssemblyStats,
}

/// Builds a full board, registering accepted IDs in `registry`.
///
/// Fails only on fatal errors: [`BoardError::SamplingExhausted`] when the ID
/// space runs dry and [`BoardError::AttemptsExhausted`] when the configured
/// fetch cap is hit. `registry` is only written once the board is complete,
/// so a failed run leaves it untouched.
pub async fn assemble<S, R>(
    source: &S,
    config: &GameConfig,
    registry: &mut ConsumedIds,
    rng: &mut R,
) -> Result<Assembly>
where
    S: CategorySource,
    R: Rng + Send + ?Sized,
{
    config.validate()?;
    let timer = Timer::start();
    let wanted = config.num_categories;
    let mut stats = AssemblyStats::default();
    let mut accepted: Vec<Category> = Vec::with_capacity(wanted);
    let mut taken: BTreeSet<u32> = BTreeSet::new();
    let mut rejected: BTreeSet<u32> = BTreeSet::new();

    while accepted.len() < wanted {
        let missing = wanted - accepted.len();
        let mut batch = {
            let skip_rejected = config.exclude_rejected && !rejected.is_empty();
            let excluded: Cow<'_, BTreeSet<u32>> = if skip_rejected || !taken.is_empty() {
                let mut merged = registry.as_set().clone();
                merged.extend(taken.iter().copied());
                if skip_rejected {
                    merged.extend(rejected.iter().copied());
                }
                Cow::Owned(merged)
            } else {
                Cow::Borrowed(registry.as_set())
            };
            sample(missing, config.id_space_max, &excluded, rng)?
        };
        if let Some(cap) = config.max_attempts {
            let remaining = cap.saturating_sub(stats.attempts);
            if remaining == 0 {
                return Err(BoardError::AttemptsExhausted {
                    attempts: stats.attempts,
                    accepted: accepted.len(),
                    required: wanted,
                });
            }
            batch.truncate(remaining);
        }
        stats.record_round(batch.len());
        debug!(round = stats.rounds, ids = ?batch, "sampled category IDs");

        let fetched = join_all(batch.iter().map(|&id| source.fetch(id))).await;
        for (id, result) in batch.into_iter().zip(fetched) {
            match build_category(id, result, config, rng) {
                Ok(category) => {
                    taken.insert(id);
                    info!(id, title = %category.title, "accepted category");
                    stats.record_accept();
                    accepted.push(category);
                }
                Err((stage, err)) => {
                    warn!(id, %stage, error = %err, "rejected category");
                    stats.record_reject(id, stage);
                    rejected.insert(id);
                }
            }
        }
    }

    registry.extend(taken);
    stats.finish(timer.elapsed());
    Ok(Assembly {
        board: Board::from_categories(accepted),
        stats,
    })
}

/// Runs one fetched category through validation, bucketing and cleanup.
pub fn build_category<R: Rng + ?Sized>(
    id: u32,
    fetched: std::result::Result<RawCategory, FetchError>,
    config: &GameConfig,
    rng: &mut R,
) -> std::result::Result<Category, (Stage, BoardError)> {
    let raw = fetched.map_err(|err| (Stage::Fetching, BoardError::from(err)))?;
    let required = config.clues_per_category;

    let cleaned: Vec<RawClue> = raw.clues.iter().map(clean_clue).collect();
    let valid = filter_valid(&cleaned);
    if valid.len() < required {
        return Err((
            Stage::Validating,
            BoardError::InsufficientClues {
                id,
                usable: valid.len(),
                required,
            },
        ));
    }

    let usable = valid.len();
    let tiers = bucket(valid, config.tiers(), config.max_clue_value, |clue| {
        clue.points()
    });
    let rows = assign_rows(tiers, config.tiers(), rng).map_err(|err| {
        debug!(id, error = %err, "bucketing left a row empty");
        (
            Stage::Bucketing,
            BoardError::InsufficientClues {
                id,
                usable,
                required,
            },
        )
    })?;

    Ok(Category {
        id,
        title: sanitize(&raw.title),
        clues: rows
            .into_iter()
            .map(|clue| Clue::new(clue.question.clone(), clue.answer.clone(), clue.points()))
            .collect(),
    })
}

/// Sanitized copy of a source clue, so duplicate checks see display text.
fn clean_clue(clue: &RawClue) -> RawClue {
    RawClue {
        id: clue.id,
        question: sanitize(&clue.question),
        answer: sanitize(&clue.answer),
        value: clue.value,
        invalid_count: clue.invalid_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::scripted::{Reply, ScriptedSource, category};
    use rand::{SeedableRng, rngs::StdRng};

    fn config() -> GameConfig {
        GameConfig {
            seed: Some(11),
            ..GameConfig::default()
        }
    }

    fn assert_board_shape(board: &Board, config: &GameConfig) {
        assert_eq!(board.len(), config.num_categories);
        for category in board.categories() {
            assert_eq!(category.clues.len(), config.clues_per_category);
            let questions: BTreeSet<_> = category.clues.iter().map(|c| &c.question).collect();
            assert_eq!(questions.len(), category.clues.len());
        }
        let ids: BTreeSet<_> = board.category_ids().collect();
        assert_eq!(ids.len(), board.len());
    }

    #[tokio::test]
    async fn all_valid_categories_fill_the_board_in_one_pass() {
        let config = config();
        let source = ScriptedSource::valid(5);
        let mut registry = ConsumedIds::new();
        let mut rng = StdRng::seed_from_u64(1);

        let assembly = assemble(&source, &config, &mut registry, &mut rng)
            .await
            .unwrap();

        assert_board_shape(&assembly.board, &config);
        assert_eq!(assembly.stats.rounds, 1);
        assert_eq!(source.calls().len(), 6);
        assert_eq!(registry.len(), 6);
        assert!(assembly.board.category_ids().all(|id| registry.contains(id)));
    }

    #[tokio::test]
    async fn two_rejections_cost_exactly_two_more_fetches() {
        let config = config();
        let source = ScriptedSource::new(vec![Reply::Short(3), Reply::Short(3)], 5);
        let mut registry = ConsumedIds::new();
        let mut rng = StdRng::seed_from_u64(2);

        let assembly = assemble(&source, &config, &mut registry, &mut rng)
            .await
            .unwrap();

        assert_board_shape(&assembly.board, &config);
        assert_eq!(source.calls().len(), 8);
        assert_eq!(assembly.stats.rounds, 2);
        assert_eq!(assembly.stats.rejected_at(Stage::Validating), 2);
        assert_eq!(assembly.stats.rejected_at(Stage::Bucketing), 0);
        assert_eq!(registry.len(), 6);
    }

    #[tokio::test]
    async fn fetch_failures_are_backfilled() {
        let config = config();
        let source = ScriptedSource::new(vec![Reply::Unreachable, Reply::Valid, Reply::Unreachable], 5);
        let mut registry = ConsumedIds::new();
        let mut rng = StdRng::seed_from_u64(3);

        let assembly = assemble(&source, &config, &mut registry, &mut rng)
            .await
            .unwrap();

        assert_board_shape(&assembly.board, &config);
        assert_eq!(assembly.stats.rejected_at(Stage::Fetching), 2);
        assert_eq!(source.calls().len(), 8);
    }

    #[tokio::test]
    async fn board_order_follows_draw_order() {
        let config = config();
        let source = ScriptedSource::valid(5);
        let mut rng = StdRng::seed_from_u64(4);
        let assembly = assemble(&source, &config, &mut ConsumedIds::new(), &mut rng)
            .await
            .unwrap();
        let ids: Vec<u32> = assembly.board.category_ids().collect();
        assert_eq!(ids, source.calls());
    }

    #[tokio::test]
    async fn previously_consumed_ids_are_never_drawn() {
        let config = GameConfig {
            id_space_max: 12,
            ..config()
        };
        let source = ScriptedSource::valid(5);
        let mut registry = ConsumedIds::new();
        registry.extend(1..=6);
        let mut rng = StdRng::seed_from_u64(5);

        let assembly = assemble(&source, &config, &mut registry, &mut rng)
            .await
            .unwrap();

        let mut ids: Vec<u32> = assembly.board.category_ids().collect();
        ids.sort_unstable();
        assert_eq!(ids, (7..=12).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn exhausted_id_space_is_fatal() {
        let config = GameConfig {
            id_space_max: 8,
            ..config()
        };
        let source = ScriptedSource::valid(5);
        let mut registry = ConsumedIds::new();
        registry.extend(1..=4);
        let mut rng = StdRng::seed_from_u64(6);

        let err = assemble(&source, &config, &mut registry, &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BoardError::SamplingExhausted {
                requested: 6,
                available: 4
            }
        ));
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn attempt_cap_stops_a_degraded_api() {
        let config = GameConfig {
            max_attempts: Some(10),
            ..config()
        };
        let source = ScriptedSource::new(vec![Reply::Unreachable; 64], 5);
        let mut rng = StdRng::seed_from_u64(7);

        let err = assemble(&source, &config, &mut ConsumedIds::new(), &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BoardError::AttemptsExhausted {
                attempts: 10,
                accepted: 0,
                required: 6
            }
        ));
        assert_eq!(source.calls().len(), 10);
    }

    #[tokio::test]
    async fn failed_run_leaves_the_registry_untouched() {
        let config = GameConfig {
            max_attempts: Some(8),
            ..config()
        };
        let script = vec![
            Reply::Valid,
            Reply::Valid,
            Reply::Valid,
            Reply::Unreachable,
            Reply::Unreachable,
            Reply::Unreachable,
            Reply::Unreachable,
            Reply::Unreachable,
        ];
        let source = ScriptedSource::new(script, 5);
        let mut registry = ConsumedIds::new();
        registry.insert(500);
        let mut rng = StdRng::seed_from_u64(8);

        let err = assemble(&source, &config, &mut registry, &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BoardError::AttemptsExhausted {
                attempts: 8,
                accepted: 3,
                ..
            }
        ));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(500));
    }

    #[tokio::test]
    async fn excluding_rejected_ids_never_refetches_them() {
        let config = GameConfig {
            id_space_max: 9,
            exclude_rejected: true,
            ..config()
        };
        let source = ScriptedSource::new(vec![Reply::Short(1); 3], 5);
        let mut rng = StdRng::seed_from_u64(8);

        let assembly = assemble(&source, &config, &mut ConsumedIds::new(), &mut rng)
            .await
            .unwrap();

        let calls = source.calls();
        let unique: BTreeSet<_> = calls.iter().collect();
        assert_eq!(unique.len(), calls.len());
        assert_eq!(assembly.board.len(), 6);
    }

    #[test]
    fn short_category_is_rejected_before_bucketing() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(9);
        let (stage, err) =
            build_category(31, Ok(category(31, 3)), &config, &mut rng).unwrap_err();
        assert_eq!(stage, Stage::Validating);
        assert!(matches!(
            err,
            BoardError::InsufficientClues {
                id: 31,
                usable: 3,
                required: 5
            }
        ));
    }

    #[test]
    fn unfillable_low_rows_are_rejected_at_bucketing() {
        let config = config();
        let mut raw = category(40, 5);
        for clue in &mut raw.clues {
            clue.value = Some(1000);
        }
        let mut rng = StdRng::seed_from_u64(10);
        let (stage, _) = build_category(40, Ok(raw), &config, &mut rng).unwrap_err();
        assert_eq!(stage, Stage::Bucketing);
    }

    #[test]
    fn accepted_text_is_sanitized_and_rows_ascend() {
        let config = config();
        let mut raw = category(50, 5);
        raw.clues.reverse();
        raw.clues[0].question = "it\\'s <i>here</i>".to_string();
        let mut rng = StdRng::seed_from_u64(12);

        let built = build_category(50, Ok(raw), &config, &mut rng).unwrap();

        assert_eq!(built.title, "CATEGORY #50");
        let values: Vec<u32> = built.clues.iter().map(|c| c.value).collect();
        assert_eq!(values, vec![200, 400, 600, 800, 1000]);
        assert!(built.clues.iter().any(|c| c.question == "IT'S HERE"));
    }

    #[test]
    fn questions_equal_after_cleanup_count_once() {
        let config = config();
        let mut raw = category(60, 5);
        raw.clues[1].question = raw.clues[0].question.to_uppercase();
        let mut rng = StdRng::seed_from_u64(13);
        let (stage, err) = build_category(60, Ok(raw), &config, &mut rng).unwrap_err();
        assert_eq!(stage, Stage::Validating);
        assert!(matches!(err, BoardError::InsufficientClues { usable: 4, .. }));
    }
}
