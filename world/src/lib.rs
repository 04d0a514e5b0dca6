#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative grid state management for Gemfall.
//!
//! The world owns every cell and slot. Mutating commands that the view is
//! expected to animate (swaps, destructions, drops) suspend the running
//! resolution right after their event is emitted; the caller sends
//! [`Command::Resume`] once its presentation is idle and the resolution picks
//! up where it stopped.

mod grid;
mod refill;

use std::collections::BTreeSet;

use gemfall_core::{
    CellId, CellSnapshot, Command, ConfigError, Event, GridConfig, GridLayout, LayoutError,
    RejectionReason, DEFAULT_SEED, MATCH_RUN,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::grid::Grid;

/// Errors raised while applying a command.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    /// The requested configuration is unusable.
    #[error("invalid grid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The requested layout does not fit the configuration.
    #[error("invalid grid layout: {0}")]
    Layout(#[from] LayoutError),
    /// Every palette color would complete a match at the slot being refilled.
    #[error("no palette color can fill {cell:?} without completing a match")]
    PaletteExhausted {
        /// Slot that could not be filled.
        cell: gemfall_core::CellCoord,
    },
    /// Every cell identifier has been handed out.
    #[error("cell identifiers are exhausted")]
    CellIdsExhausted,
}

/// Represents the authoritative Gemfall grid state.
#[derive(Debug)]
pub struct World {
    config: Option<GridConfig>,
    grid: Grid,
    rng: ChaCha8Rng,
    selection: Option<CellId>,
    pending: Option<Stage>,
}

/// Next step of a suspended resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Stage {
    /// The swap was shown; look for matches around both cells.
    MatchSwap { first: CellId, second: CellId },
    /// The undo of a fruitless swap was shown.
    FinishRevert,
    /// Destroyed cells were shown; run the next gravity pass.
    Drop { refill: bool },
    /// Falling cells were shown; destroy the matches they formed.
    CascadeMatches { moved: Vec<CellId>, refill: bool },
}

impl World {
    /// Creates an empty world awaiting [`Command::ConfigureGrid`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: None,
            grid: Grid::default(),
            rng: ChaCha8Rng::seed_from_u64(DEFAULT_SEED),
            selection: None,
            pending: None,
        }
    }

    fn configure(
        &mut self,
        config: GridConfig,
        layout: Option<GridLayout>,
        out_events: &mut Vec<Event>,
    ) -> Result<(), GridError> {
        config.validate()?;
        if let Some(layout) = &layout {
            layout.check_against(&config)?;
        }

        let mut grid = Grid::new(config.columns(), config.rows())?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed());
        let created = match &layout {
            Some(layout) => grid.populate(layout)?,
            None => refill::fill_empty_slots(
                &mut grid,
                config.palette(),
                config.refill_rule(),
                &mut rng,
            )?,
        };

        out_events.push(Event::GridInitialized {
            columns: config.columns(),
            rows: config.rows(),
        });
        out_events.push(Event::CellsCreated {
            cells: created,
            initial: true,
        });

        self.grid = grid;
        self.rng = rng;
        self.config = Some(config);
        self.selection = None;
        self.pending = None;
        Ok(())
    }

    fn refusal(&self, cell: Option<CellId>) -> Option<RejectionReason> {
        if self.config.is_none() {
            return Some(RejectionReason::GridNotConfigured);
        }
        if self.pending.is_some() {
            return Some(RejectionReason::ResolutionInFlight);
        }
        match cell {
            Some(cell) if !self.grid.contains(cell) => Some(RejectionReason::UnknownCell { cell }),
            _ => None,
        }
    }

    fn click(&mut self, cell: CellId, out_events: &mut Vec<Event>) {
        if let Some(reason) = self.refusal(Some(cell)) {
            out_events.push(Event::CommandRejected { reason });
            return;
        }

        let Some(selected) = self.selection.take() else {
            self.selection = Some(cell);
            out_events.push(Event::CellsPulsed { cells: None });
            out_events.push(Event::CellsPulsed {
                cells: Some(vec![cell]),
            });
            return;
        };

        out_events.push(Event::CellsPulsed { cells: None });
        if !self.grid.are_neighbors(selected, cell) {
            return;
        }

        if let Some((first, second)) = self.grid.swap(selected, cell) {
            out_events.push(Event::CellsSwapped { first, second });
            self.pending = Some(Stage::MatchSwap {
                first: selected,
                second: cell,
            });
        }
    }

    fn settle(&mut self, refill: bool, out_events: &mut Vec<Event>) -> Result<(), GridError> {
        if let Some(reason) = self.refusal(None) {
            out_events.push(Event::CommandRejected { reason });
            return Ok(());
        }

        if self.selection.take().is_some() {
            out_events.push(Event::CellsPulsed { cells: None });
        }
        self.advance(Stage::Drop { refill }, out_events)
    }

    fn resume(&mut self, out_events: &mut Vec<Event>) -> Result<(), GridError> {
        match self.pending.take() {
            Some(stage) => self.advance(stage, out_events),
            None => Ok(()),
        }
    }

    fn advance(&mut self, stage: Stage, out_events: &mut Vec<Event>) -> Result<(), GridError> {
        self.pending = self.run_stage(stage, out_events)?;
        if self.pending.is_none() {
            out_events.push(Event::ResolutionFinished);
        }
        Ok(())
    }

    /// Performs one step of a resolution, returning the stage to run after the next resume.
    fn run_stage(
        &mut self,
        stage: Stage,
        out_events: &mut Vec<Event>,
    ) -> Result<Option<Stage>, GridError> {
        match stage {
            Stage::MatchSwap { first, second } => {
                let mut matches = self.grid.find_matches(first, MATCH_RUN);
                matches.extend(self.grid.find_matches(second, MATCH_RUN));

                if !matches.is_empty() {
                    self.destroy(&matches, out_events);
                    return Ok(Some(Stage::Drop { refill: true }));
                }

                let strict = self
                    .config
                    .as_ref()
                    .map_or(false, GridConfig::disallow_loose_swap);
                if strict {
                    if let Some((first, second)) = self.grid.swap(first, second) {
                        out_events.push(Event::CellsSwapped { first, second });
                        return Ok(Some(Stage::FinishRevert));
                    }
                }
                Ok(None)
            }
            Stage::FinishRevert => Ok(None),
            Stage::Drop { refill } => {
                let moved = self.grid.drop_pass();
                if !moved.is_empty() {
                    out_events.push(Event::CellsMoved {
                        cells: self.snapshots_of(&moved),
                    });
                    return Ok(Some(Stage::CascadeMatches { moved, refill }));
                }

                if refill {
                    self.refill(out_events)?;
                }
                Ok(None)
            }
            Stage::CascadeMatches { moved, refill } => {
                let mut matches = BTreeSet::new();
                for cell in &moved {
                    matches.extend(self.grid.find_matches(*cell, MATCH_RUN));
                }

                if matches.is_empty() {
                    return self.run_stage(Stage::Drop { refill }, out_events);
                }

                self.destroy(&matches, out_events);
                Ok(Some(Stage::Drop { refill }))
            }
        }
    }

    fn destroy(&mut self, cells: &BTreeSet<CellId>, out_events: &mut Vec<Event>) {
        let destroyed: Vec<CellSnapshot> = cells
            .iter()
            .filter_map(|cell| self.grid.remove(*cell))
            .collect();
        out_events.push(Event::CellsDestroyed { cells: destroyed });
    }

    fn refill(&mut self, out_events: &mut Vec<Event>) -> Result<(), GridError> {
        let Some(config) = self.config.as_ref() else {
            return Ok(());
        };

        let created = refill::fill_empty_slots(
            &mut self.grid,
            config.palette(),
            config.refill_rule(),
            &mut self.rng,
        )?;
        if !created.is_empty() {
            out_events.push(Event::CellsCreated {
                cells: created,
                initial: false,
            });
        }
        Ok(())
    }

    fn snapshots_of(&self, cells: &[CellId]) -> Vec<CellSnapshot> {
        cells
            .iter()
            .filter_map(|cell| self.grid.snapshot(*cell))
            .collect()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Commands that start a resolution return at the first suspension point;
/// [`query::awaiting_resume`] reports whether a [`Command::Resume`] is expected.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) -> Result<(), GridError> {
    let result = match command {
        Command::ConfigureGrid { config } => world.configure(config, None, out_events),
        Command::LoadLayout { config, layout } => world.configure(config, Some(layout), out_events),
        Command::Click { cell } => {
            world.click(cell, out_events);
            Ok(())
        }
        Command::Resume => world.resume(out_events),
        Command::Settle { refill } => world.settle(refill, out_events),
        Command::CancelResolution => {
            if world.pending.take().is_some() {
                out_events.push(Event::ResolutionCancelled);
            }
            Ok(())
        }
    };

    debug_assert!(
        world.grid.is_consistent(),
        "cell coordinates diverged from grid slots"
    );
    result
}

/// Applies the command and keeps resuming until no resolution remains suspended.
///
/// Intended for headless callers that have no presentation to wait for.
pub fn apply_to_completion(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), GridError> {
    apply(world, command, out_events)?;
    while world.pending.is_some() {
        apply(world, Command::Resume, out_events)?;
    }
    Ok(())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use gemfall_core::{
        CellCoord, CellId, CellSnapshot, GridConfig, GridLayout, LayoutError, Palette, MATCH_RUN,
    };

    use super::{grid::Grid, World};

    /// Provides the active configuration, if a grid was configured.
    #[must_use]
    pub fn config(world: &World) -> Option<&GridConfig> {
        world.config.as_ref()
    }

    /// Provides the active palette, if a grid was configured.
    #[must_use]
    pub fn palette(world: &World) -> Option<&Palette> {
        world.config.as_ref().map(GridConfig::palette)
    }

    /// Number of columns and rows of the grid; `(0, 0)` before configuration.
    #[must_use]
    pub fn dimensions(world: &World) -> (u32, u32) {
        world.grid.dimensions()
    }

    /// Looks up a live cell by identifier.
    #[must_use]
    pub fn cell(world: &World, cell: CellId) -> Option<CellSnapshot> {
        world.grid.snapshot(cell)
    }

    /// Looks up the cell occupying a slot.
    #[must_use]
    pub fn cell_at(world: &World, cell: CellCoord) -> Option<CellSnapshot> {
        world
            .grid
            .occupant(cell)
            .and_then(|id| world.grid.snapshot(id))
    }

    /// Captures every live cell in identifier order.
    #[must_use]
    pub fn cells(world: &World) -> Vec<CellSnapshot> {
        world.grid.snapshots().collect()
    }

    /// Finds the cells forming runs through `anchor` of at least `min_run` cells.
    ///
    /// The horizontal and vertical runs are evaluated independently and the
    /// qualifying ones are merged. Unknown anchors produce no matches.
    #[must_use]
    pub fn find_matches(world: &World, anchor: CellId, min_run: usize) -> Vec<CellId> {
        world.grid.find_matches(anchor, min_run).into_iter().collect()
    }

    /// Occupied neighbors of a cell in Left, Right, Up, Down order.
    #[must_use]
    pub fn neighbors(world: &World, cell: CellId) -> Vec<CellId> {
        world.grid.neighbors(cell)
    }

    /// Cell currently selected by the interaction state machine.
    #[must_use]
    pub fn selection(world: &World) -> Option<CellId> {
        world.selection
    }

    /// Reports whether a resolution is suspended until [`gemfall_core::Command::Resume`].
    #[must_use]
    pub fn awaiting_resume(world: &World) -> bool {
        world.pending.is_some()
    }

    /// Reports whether any run of three or more equal colors exists.
    #[must_use]
    pub fn has_matches(world: &World) -> bool {
        world.grid.has_matches(MATCH_RUN)
    }

    /// Exports the colors of every slot.
    pub fn layout(world: &World) -> Result<GridLayout, LayoutError> {
        world.grid.layout()
    }

    /// Exposes a read-only view of the grid for systems.
    #[must_use]
    pub fn grid_view(world: &World) -> GridView<'_> {
        GridView {
            grid: &world.grid,
            awaiting_resume: world.pending.is_some(),
        }
    }

    /// Read-only view into the grid slots.
    #[derive(Clone, Copy, Debug)]
    pub struct GridView<'a> {
        grid: &'a Grid,
        awaiting_resume: bool,
    }

    impl<'a> GridView<'a> {
        /// Provides the dimensions of the underlying grid.
        #[must_use]
        pub fn dimensions(&self) -> (u32, u32) {
            self.grid.dimensions()
        }

        /// Returns the cell occupying the provided slot, if any.
        #[must_use]
        pub fn occupant(&self, cell: CellCoord) -> Option<CellId> {
            self.grid.occupant(cell)
        }

        /// Looks up a live cell by identifier.
        #[must_use]
        pub fn cell(&self, cell: CellId) -> Option<CellSnapshot> {
            self.grid.snapshot(cell)
        }

        /// Occupied neighbors of a cell in Left, Right, Up, Down order.
        #[must_use]
        pub fn neighbors(&self, cell: CellId) -> Vec<CellId> {
            self.grid.neighbors(cell)
        }

        /// Iterator over every live cell in identifier order.
        pub fn cells(&self) -> impl Iterator<Item = CellSnapshot> + 'a {
            self.grid.snapshots()
        }

        /// Reports whether the world waits for a resume before accepting clicks.
        #[must_use]
        pub fn awaiting_resume(&self) -> bool {
            self.awaiting_resume
        }
    }
}
