use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::info;

/// Pipeline stage a category was rejected at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetching,
    Validating,
    Bucketing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetching => write!(f, "fetching"),
            Stage::Validating => write!(f, "validating"),
            Stage::Bucketing => write!(f, "bucketing"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub id: u32,
    pub stage: Stage,
}

/// Counters for one board assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyStats {
    /// Sampling rounds, one per backfill pass.
    pub rounds: usize,
    /// Category fetches issued.
    pub attempts: usize,
    pub accepted: usize,
    pub rejections: Vec<Rejection>,
    pub elapsed_ms: u64,
}

impl AssemblyStats {
    pub fn record_round(&mut self, fetches: usize) {
        self.rounds += 1;
        self.attempts += fetches;
    }

    pub fn record_accept(&mut self) {
        self.accepted += 1;
    }

    pub fn record_reject(&mut self, id: u32, stage: Stage) {
        self.rejections.push(Rejection { id, stage });
    }

    pub fn rejected_at(&self, stage: Stage) -> usize {
        self.rejections.iter().filter(|r| r.stage == stage).count()
    }

    pub fn finish(&mut self, elapsed: Duration) {
        self.elapsed_ms = elapsed.as_millis().min(u128::from(u64::MAX)) as u64;
        info!(
            rounds = self.rounds,
            attempts = self.attempts,
            accepted = self.accepted,
            fetch_failures = self.rejected_at(Stage::Fetching),
            too_few_clues = self.rejected_at(Stage::Validating),
            unfillable_rows = self.rejected_at(Stage::Bucketing),
            elapsed_ms = self.elapsed_ms,
            "board assembled"
        );
    }
}

/// Wall clock for an assembly run.
pub struct Timer(Instant);

impl Timer {
    pub fn start() -> Self {
        Self(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_stage() {
        let mut stats = AssemblyStats::default();
        stats.record_round(6);
        stats.record_round(2);
        stats.record_reject(4, Stage::Validating);
        stats.record_reject(9, Stage::Fetching);
        stats.record_reject(11, Stage::Validating);
        assert_eq!(stats.rounds, 2);
        assert_eq!(stats.attempts, 8);
        assert_eq!(stats.rejected_at(Stage::Validating), 2);
        assert_eq!(stats.rejected_at(Stage::Bucketing), 0);
        stats.finish(Duration::from_millis(1500));
        assert_eq!(stats.elapsed_ms, 1500);
    }
}
