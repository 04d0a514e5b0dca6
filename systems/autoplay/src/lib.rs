#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic autoplay system that drives the grid with random swaps.
//!
//! Each action clicks a random cell and then one of its neighbors. The system
//! only ever speaks through [`Command::Click`]; it never resumes suspended
//! resolutions, which stays the adapter's job once its presentation is idle.

use gemfall_core::{CellId, Command, Event};
use gemfall_world::query::GridView;
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Number of actions performed by a session when no cap is configured.
pub const DEFAULT_MAX_ACTIONS: u64 = 1_000_000;

const DEFAULT_AUTOPLAY_SEED: u64 = 0x5eed_0fa0_7051;

/// Configuration parameters required to construct the autoplay system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
    max_actions: u64,
}

impl Config {
    /// Creates a new configuration using the provided seed and action cap.
    #[must_use]
    pub const fn new(rng_seed: u64, max_actions: u64) -> Self {
        Self {
            rng_seed,
            max_actions,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOPLAY_SEED, DEFAULT_MAX_ACTIONS)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Stopped,
    PickAnchor,
    PickNeighbor { anchor: CellId },
}

/// Pure system that emits random swap clicks while a session runs.
#[derive(Debug)]
pub struct Autoplay {
    rng: ChaCha8Rng,
    max_actions: u64,
    actions: u64,
    phase: Phase,
    stop_requested: bool,
}

impl Autoplay {
    /// Creates a new, stopped autoplay system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            max_actions: config.max_actions,
            actions: 0,
            phase: Phase::Stopped,
            stop_requested: false,
        }
    }

    /// Starts a new session, resetting the action counter.
    pub fn start(&mut self) {
        self.actions = 0;
        self.stop_requested = false;
        self.phase = Phase::PickAnchor;
    }

    /// Requests that the running session stop at its next step.
    pub fn stop(&mut self) {
        if self.phase != Phase::Stopped {
            self.stop_requested = true;
        }
    }

    /// Reports whether a session is in progress.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase != Phase::Stopped
    }

    /// Number of completed swap attempts in the current or last session.
    #[must_use]
    pub fn actions(&self) -> u64 {
        self.actions
    }

    /// Consumes world events and the grid view to emit the next click, if any.
    ///
    /// Nothing is emitted while `presentation_busy` is set or while the world
    /// waits for a resume.
    pub fn handle(
        &mut self,
        events: &[Event],
        grid: &GridView<'_>,
        presentation_busy: bool,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::GridInitialized { .. } | Event::CommandRejected { .. } => {
                    if self.phase != Phase::Stopped {
                        self.phase = Phase::PickAnchor;
                    }
                }
                _ => {}
            }
        }

        if self.phase == Phase::Stopped || presentation_busy || grid.awaiting_resume() {
            return;
        }

        match self.phase {
            Phase::Stopped => {}
            Phase::PickAnchor => {
                if self.stop_requested || self.actions >= self.max_actions {
                    self.finish();
                    return;
                }

                let cells: Vec<CellId> = grid.cells().map(|cell| cell.id).collect();
                if let Some(anchor) = cells.choose(&mut self.rng).copied() {
                    out.push(Command::Click { cell: anchor });
                    self.phase = Phase::PickNeighbor { anchor };
                }
            }
            Phase::PickNeighbor { anchor } => {
                if self.stop_requested {
                    out.push(Command::Click { cell: anchor });
                    self.finish();
                    return;
                }

                let neighbors = grid.neighbors(anchor);
                let Some(target) = neighbors.choose(&mut self.rng).copied() else {
                    out.push(Command::Click { cell: anchor });
                    self.phase = Phase::PickAnchor;
                    return;
                };

                out.push(Command::Click { cell: target });
                self.actions = self.actions.saturating_add(1);
                if self.actions >= self.max_actions {
                    self.finish();
                } else {
                    self.phase = Phase::PickAnchor;
                }
            }
        }
    }

    fn finish(&mut self) {
        self.phase = Phase::Stopped;
        self.stop_requested = false;
    }
}

impl Default for Autoplay {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
