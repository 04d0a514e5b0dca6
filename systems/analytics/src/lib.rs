#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic analytics system that aggregates session statistics from world events.

use gemfall_core::Event;

/// Aggregated statistics for a play session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    resolutions_finished: u64,
    resolutions_cancelled: u64,
    swaps: u64,
    swaps_reverted: u64,
    cells_destroyed: u64,
    cells_refilled: u64,
    longest_cascade: u32,
}

impl SessionStats {
    /// Number of resolutions that ran to completion.
    #[must_use]
    pub const fn resolutions_finished(&self) -> u64 {
        self.resolutions_finished
    }

    /// Number of resolutions abandoned through a cancel request.
    #[must_use]
    pub const fn resolutions_cancelled(&self) -> u64 {
        self.resolutions_cancelled
    }

    /// Number of swaps performed by the player, reverts excluded.
    #[must_use]
    pub const fn swaps(&self) -> u64 {
        self.swaps
    }

    /// Number of swaps undone because they produced no match.
    #[must_use]
    pub const fn swaps_reverted(&self) -> u64 {
        self.swaps_reverted
    }

    /// Total number of cells destroyed by matches.
    #[must_use]
    pub const fn cells_destroyed(&self) -> u64 {
        self.cells_destroyed
    }

    /// Number of cells created by refills after the grid was initialized.
    #[must_use]
    pub const fn cells_refilled(&self) -> u64 {
        self.cells_refilled
    }

    /// Highest number of destroy waves observed within a single resolution.
    #[must_use]
    pub const fn longest_cascade(&self) -> u32 {
        self.longest_cascade
    }
}

/// Pure analytics system that folds the event stream into [`SessionStats`].
#[derive(Debug, Default)]
pub struct Analytics {
    stats: SessionStats,
    swaps_in_flight: u32,
    cascade_in_flight: u32,
}

impl Analytics {
    /// Creates a new analytics system with zeroed statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the statistics accumulated so far.
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Consumes world events and publishes a report whenever a resolution finishes.
    ///
    /// A fresh grid resets the statistics.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<SessionStats>) {
        for event in events {
            match event {
                Event::GridInitialized { .. } => {
                    *self = Self::default();
                }
                Event::CellsSwapped { .. } => {
                    if self.swaps_in_flight == 0 {
                        self.stats.swaps += 1;
                    } else {
                        self.stats.swaps_reverted += 1;
                    }
                    self.swaps_in_flight += 1;
                }
                Event::CellsDestroyed { cells } => {
                    self.stats.cells_destroyed += cells.len() as u64;
                    self.cascade_in_flight += 1;
                }
                Event::CellsCreated {
                    cells,
                    initial: false,
                } => {
                    self.stats.cells_refilled += cells.len() as u64;
                }
                Event::ResolutionFinished => {
                    self.stats.resolutions_finished += 1;
                    self.stats.longest_cascade =
                        self.stats.longest_cascade.max(self.cascade_in_flight);
                    self.end_resolution();
                    out.push(self.stats);
                }
                Event::ResolutionCancelled => {
                    self.stats.resolutions_cancelled += 1;
                    self.end_resolution();
                }
                _ => {}
            }
        }
    }

    fn end_resolution(&mut self) {
        self.swaps_in_flight = 0;
        self.cascade_in_flight = 0;
    }
}
