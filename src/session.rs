//! One game session: the consumed-ID registry, the current board, and the
//! reveal hook the rendering layer calls on each click.
//!
//! Every start bumps a session token. An assembly run works on a snapshot
//! of the registry and only commits if its token is still current, so a
//! superseded run never writes into the newer board.

use parking_lot::Mutex;
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::assemble::{Assembly, assemble};
use crate::board::{Board, Clue};
use crate::config::{GameConfig, RegistryPolicy};
use crate::error::{BoardError, ConfigError, Result, RevealError};
use crate::fetch::CategorySource;
use crate::sampler::ConsumedIds;
use crate::telemetry::AssemblyStats;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Loading,
    Ready,
    /// Board construction aborted; shown instead of the loading view.
    Failed { message: String },
}

#[derive(Debug, Default)]
struct SessionState {
    token: u64,
    registry: ConsumedIds,
    board: Option<Board>,
    status: Option<SessionStatus>,
    stats: Option<AssemblyStats>,
}

/// A pending assembly run and its private registry snapshot.
#[derive(Debug)]
pub struct RunTicket {
    token: u64,
    registry: ConsumedIds,
}

impl RunTicket {
    pub fn token(&self) -> u64 {
        self.token
    }
}

pub struct Session<S> {
    source: S,
    config: GameConfig,
    state: Mutex<SessionState>,
}

impl<S: CategorySource> Session<S> {
    pub fn new(source: S, config: GameConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            source,
            config,
            state: Mutex::new(SessionState::default()),
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Builds a board, keeping IDs consumed earlier in the session excluded.
    pub async fn start(&self) -> Result<()> {
        let ticket = self.begin(false);
        self.run(ticket).await
    }

    /// Builds a fresh board, first applying the configured [`RegistryPolicy`].
    pub async fn restart(&self) -> Result<()> {
        let ticket = self.begin(true);
        self.run(ticket).await
    }

    /// Forgets every consumed ID and drops the board, superseding any run in flight.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.token += 1;
        state.registry.reset();
        state.board = None;
        state.stats = None;
        state.status = Some(SessionStatus::Idle);
        info!(token = state.token, "session reset");
    }

    /// Marks the session as loading and hands out a ticket for a new run.
    pub fn begin(&self, restart: bool) -> RunTicket {
        let mut state = self.state.lock();
        state.token += 1;
        if restart && self.config.registry_policy == RegistryPolicy::ClearOnRestart {
            state.registry.reset();
        }
        state.board = None;
        state.status = Some(SessionStatus::Loading);
        debug!(
            token = state.token,
            consumed = state.registry.len(),
            restart,
            "starting board assembly"
        );
        RunTicket {
            token: state.token,
            registry: state.registry.clone(),
        }
    }

    async fn run(&self, mut ticket: RunTicket) -> Result<()> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(ticket.token)),
            None => StdRng::from_entropy(),
        };
        let result = assemble(&self.source, &self.config, &mut ticket.registry, &mut rng).await;
        self.finish(ticket, result)
    }

    /// Commits a run's outcome unless a newer run has started since.
    pub fn finish(&self, ticket: RunTicket, result: Result<Assembly>) -> Result<()> {
        let mut state = self.state.lock();
        if state.token != ticket.token {
            debug!(
                stale = ticket.token,
                current = state.token,
                "discarding superseded assembly"
            );
            return Err(BoardError::Superseded);
        }
        match result {
            Ok(assembly) => {
                state.registry = ticket.registry;
                state.board = Some(assembly.board);
                state.stats = Some(assembly.stats);
                state.status = Some(SessionStatus::Ready);
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "board assembly failed");
                state.status = Some(SessionStatus::Failed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.state
            .lock()
            .status
            .clone()
            .unwrap_or(SessionStatus::Idle)
    }

    /// Snapshot of the current board, present only once every slot is filled.
    pub fn board(&self) -> Option<Board> {
        self.state.lock().board.clone()
    }

    pub fn stats(&self) -> Option<AssemblyStats> {
        self.state.lock().stats.clone()
    }

    pub fn consumed_ids(&self) -> ConsumedIds {
        self.state.lock().registry.clone()
    }

    /// Advances one cell (hidden → question → answer) and returns it as it
    /// now stands, read under the same lock as the transition.
    pub fn reveal(&self, category: usize, row: usize) -> std::result::Result<Clue, RevealError> {
        let mut state = self.state.lock();
        let board = state.board.as_mut().ok_or(RevealError::NoBoard)?;
        let clue = board
            .clue_mut(category, row)
            .ok_or(RevealError::OutOfBounds { category, row })?;
        clue.advance()?;
        Ok(clue.clone())
    }
}
