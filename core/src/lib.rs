#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Gemfall engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative grid world, and pure systems. Adapters submit [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values that a view
//! layer animates and systems react to deterministically. Systems consume
//! event streams, query immutable snapshots, and respond exclusively with new
//! command batches.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest palette accepted by [`GridConfig::validate`].
///
/// Refill visits column tops after gravity settled the grid, so at most the
/// left, right and lower neighbors of a slot can forbid a color.
pub const MIN_PALETTE_COLORS: usize = 4;

/// Largest palette whose colors all have a text layout glyph (`A` to `Z`).
pub const MAX_PALETTE_COLORS: usize = 26;

/// Largest number of slots a grid or layout may hold.
pub const MAX_GRID_SLOTS: usize = 1 << 20;

/// Run length that qualifies as a match and gets destroyed.
pub const MATCH_RUN: usize = 3;

/// Seed used when a configuration does not specify one.
pub const DEFAULT_SEED: u64 = 0x6765_6d66_616c_6c21;

/// Number of slots in a `columns × rows` grid, or `None` above [`MAX_GRID_SLOTS`].
#[must_use]
pub fn slot_count(columns: u32, rows: u32) -> Option<usize> {
    let slots = usize::try_from(u64::from(columns) * u64::from(rows)).ok()?;
    (slots <= MAX_GRID_SLOTS).then_some(slots)
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Allocates a fresh grid and fills every slot without creating matches.
    ConfigureGrid {
        /// Dimensions, palette and rules of the new grid.
        config: GridConfig,
    },
    /// Installs an explicit layout verbatim, without refill or match checks.
    LoadLayout {
        /// Dimensions, palette and rules of the new grid.
        config: GridConfig,
        /// Colors assigned to each slot of the grid.
        layout: GridLayout,
    },
    /// Feeds a player (or driver) click on a cell into the interaction state machine.
    Click {
        /// Identifier of the clicked cell.
        cell: CellId,
    },
    /// Continues a suspended resolution once the presentation is idle.
    Resume,
    /// Drops every cell under gravity, destroying cascaded matches on the way.
    Settle {
        /// Whether empty slots are refilled once the grid stops moving.
        refill: bool,
    },
    /// Abandons the suspended resolution, keeping the grid as it currently stands.
    CancelResolution,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Announces that a new grid was allocated.
    GridInitialized {
        /// Number of columns in the grid.
        columns: u32,
        /// Number of rows in the grid.
        rows: u32,
    },
    /// Reports cells that entered the grid.
    CellsCreated {
        /// Cells created by this batch.
        cells: Vec<CellSnapshot>,
        /// Whether the batch populated a freshly initialized grid.
        initial: bool,
    },
    /// Requests that the view highlight cells; `None` clears every highlight.
    CellsPulsed {
        /// Cells to highlight, or `None` to clear all highlights.
        cells: Option<Vec<CellId>>,
    },
    /// Confirms that two neighboring cells exchanged slots.
    CellsSwapped {
        /// First cell, reported at its position after the swap.
        first: CellSnapshot,
        /// Second cell, reported at its position after the swap.
        second: CellSnapshot,
    },
    /// Reports cells consumed by a match and removed from the grid.
    CellsDestroyed {
        /// Destroyed cells at the slots they occupied when removed.
        cells: Vec<CellSnapshot>,
    },
    /// Reports cells that fell during one settle pass.
    CellsMoved {
        /// Moved cells at the slots they came to rest in.
        cells: Vec<CellSnapshot>,
    },
    /// Indicates that the in-flight resolution ran to completion.
    ResolutionFinished,
    /// Indicates that the in-flight resolution was abandoned.
    ResolutionCancelled,
    /// Reports that a command could not be processed.
    CommandRejected {
        /// Specific reason the command was refused.
        reason: RejectionReason,
    },
}

/// Reasons a command may be refused by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    /// No grid has been configured yet.
    GridNotConfigured,
    /// The referenced cell does not exist, typically because it was destroyed.
    UnknownCell {
        /// Identifier supplied with the command.
        cell: CellId,
    },
    /// A resolution is suspended and awaiting [`Command::Resume`].
    ResolutionInFlight,
}

/// Unique identifier assigned to a cell for its whole lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(u32);

impl CellId {
    /// Creates a new cell identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a grid slot expressed as column and row coordinates.
///
/// Row zero is the floor; rows grow upwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid slot coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the slot.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the slot.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Returns the adjacent coordinate in `direction` if it lies within the bounds.
    #[must_use]
    pub fn step(self, direction: Direction, columns: u32, rows: u32) -> Option<CellCoord> {
        let (column, row) = match direction {
            Direction::Left => (self.column.checked_sub(1)?, self.row),
            Direction::Right => (self.column.checked_add(1)?, self.row),
            Direction::Up => (self.column, self.row.checked_add(1)?),
            Direction::Down => (self.column, self.row.checked_sub(1)?),
        };

        if column < columns && row < rows {
            Some(CellCoord::new(column, row))
        } else {
            None
        }
    }

    /// Reports whether the two coordinates share an edge.
    #[must_use]
    pub fn is_adjacent(self, other: CellCoord) -> bool {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row) == 1
    }
}

/// Cardinal directions used for adjacency and run detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward decreasing column indices.
    Left,
    /// Toward increasing column indices.
    Right,
    /// Toward increasing row indices, away from the floor.
    Up,
    /// Toward decreasing row indices, toward the floor.
    Down,
}

impl Direction {
    /// Every direction in neighbor enumeration order.
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];
}

/// Index of a color within the configured [`Palette`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellColor(u8);

impl CellColor {
    /// Creates a color referencing the palette entry at `index`.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Palette index referenced by the color.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// Single-character glyph used by text layouts: `A` for index zero, `B` for one, and so on.
    #[must_use]
    pub fn glyph(&self) -> char {
        if usize::from(self.0) < MAX_PALETTE_COLORS {
            char::from(b'A' + self.0)
        } else {
            '?'
        }
    }

    /// Parses a text layout glyph produced by [`CellColor::glyph`].
    #[must_use]
    pub fn from_glyph(glyph: char) -> Option<Self> {
        if glyph.is_ascii_uppercase() {
            Some(Self(glyph as u8 - b'A'))
        } else {
            None
        }
    }
}

/// Visual appearance of a palette entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    red: u8,
    green: u8,
    blue: u8,
}

impl Rgb {
    /// Creates a new color from byte RGB components.
    #[must_use]
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Red component of the color.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Green component of the color.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Blue component of the color.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }
}

const DEFAULT_PALETTE: [Rgb; 5] = [
    Rgb::from_rgb(0x2f, 0x95, 0x32),
    Rgb::from_rgb(0xc8, 0x2a, 0x36),
    Rgb::from_rgb(0xff, 0xc1, 0x07),
    Rgb::from_rgb(0x58, 0x47, 0xff),
    Rgb::from_rgb(0xe0, 0x6c, 0xd8),
];

/// Ordered set of colors a grid draws its cells from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    /// Creates a palette from the provided colors, in index order.
    #[must_use]
    pub fn new(colors: Vec<Rgb>) -> Self {
        Self { colors }
    }

    /// Number of colors in the palette.
    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Reports whether the palette holds no colors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Looks up the appearance of a palette index.
    #[must_use]
    pub fn get(&self, color: CellColor) -> Option<Rgb> {
        self.colors.get(color.index()).copied()
    }

    /// Iterator over every palette index in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = CellColor> {
        let len = self.colors.len().min(MAX_PALETTE_COLORS);
        (0..len).map(|index| CellColor::new(index as u8))
    }

    /// Reports whether `color` addresses an entry of this palette.
    #[must_use]
    pub fn contains(&self, color: CellColor) -> bool {
        color.index() < self.colors.len()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE.to_vec())
    }
}

/// Immutable description of a cell used in event payloads and queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellSnapshot {
    /// Identifier of the cell.
    pub id: CellId,
    /// Slot occupied by the cell.
    pub cell: CellCoord,
    /// Color of the cell.
    pub color: CellColor,
}

/// Strategy used to keep freshly generated cells from forming matches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefillRule {
    /// Excludes a color only when it would complete a run of [`MATCH_RUN`] cells.
    #[default]
    CompleteRunsOnly,
    /// Excludes the color of every filled cardinal neighbor.
    AnyNeighbor,
}

/// Configuration parameters required to initialize a grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    columns: u32,
    rows: u32,
    palette: Palette,
    disallow_loose_swap: bool,
    refill_rule: RefillRule,
    seed: u64,
}

impl GridConfig {
    /// Creates a configuration with loose swaps allowed, the default refill rule and seed.
    #[must_use]
    pub fn new(columns: u32, rows: u32, palette: Palette) -> Self {
        Self {
            columns,
            rows,
            palette,
            disallow_loose_swap: false,
            refill_rule: RefillRule::default(),
            seed: DEFAULT_SEED,
        }
    }

    /// Sets whether swaps that produce no match are reverted.
    #[must_use]
    pub fn with_disallow_loose_swap(mut self, disallow: bool) -> Self {
        self.disallow_loose_swap = disallow;
        self
    }

    /// Sets the strategy used when generating new cells.
    #[must_use]
    pub fn with_refill_rule(mut self, rule: RefillRule) -> Self {
        self.refill_rule = rule;
        self
    }

    /// Sets the seed of the color generator.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Colors available to cells.
    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Whether swaps that produce no match are reverted.
    #[must_use]
    pub const fn disallow_loose_swap(&self) -> bool {
        self.disallow_loose_swap
    }

    /// Strategy used when generating new cells.
    #[must_use]
    pub const fn refill_rule(&self) -> RefillRule {
        self.refill_rule
    }

    /// Seed of the color generator.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Checks the configuration for values the engine cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(ConfigError::EmptyGrid {
                columns: self.columns,
                rows: self.rows,
            });
        }
        if slot_count(self.columns, self.rows).is_none() {
            return Err(ConfigError::GridTooLarge {
                columns: self.columns,
                rows: self.rows,
                limit: MAX_GRID_SLOTS,
            });
        }

        let colors = self.palette.len();
        if colors < MIN_PALETTE_COLORS {
            return Err(ConfigError::PaletteTooSmall {
                found: colors,
                required: MIN_PALETTE_COLORS,
            });
        }
        if colors > MAX_PALETTE_COLORS {
            return Err(ConfigError::PaletteTooLarge {
                found: colors,
                limit: MAX_PALETTE_COLORS,
            });
        }

        for (index, color) in self.palette.colors.iter().enumerate() {
            if self.palette.colors[..index].contains(color) {
                return Err(ConfigError::DuplicateColor { index });
            }
        }

        Ok(())
    }
}

/// Reasons a [`GridConfig`] is refused.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The grid would contain no slots.
    #[error("grid must have at least one column and one row, got {columns}x{rows}")]
    EmptyGrid {
        /// Requested column count.
        columns: u32,
        /// Requested row count.
        rows: u32,
    },
    /// The grid holds more slots than [`MAX_GRID_SLOTS`].
    #[error("grid of {columns}x{rows} exceeds the limit of {limit} slots")]
    GridTooLarge {
        /// Requested column count.
        columns: u32,
        /// Requested row count.
        rows: u32,
        /// Largest supported slot count.
        limit: usize,
    },
    /// The palette cannot guarantee match-free refills.
    #[error("palette needs at least {required} colors to refill without matches, found {found}")]
    PaletteTooSmall {
        /// Colors supplied.
        found: usize,
        /// Colors required.
        required: usize,
    },
    /// The palette has more colors than text layouts have glyphs for.
    #[error("palette holds {found} colors but layouts can encode at most {limit}")]
    PaletteTooLarge {
        /// Colors supplied.
        found: usize,
        /// Largest supported palette.
        limit: usize,
    },
    /// Two palette entries share the same appearance.
    #[error("palette entry {index} duplicates an earlier color")]
    DuplicateColor {
        /// Index of the repeated entry.
        index: usize,
    },
}

/// Dense description of which color occupies each slot of a grid.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridLayout {
    columns: u32,
    rows: u32,
    slots: Vec<Option<CellColor>>,
}

impl GridLayout {
    /// Creates a layout with every slot empty.
    pub fn empty(columns: u32, rows: u32) -> Result<Self, LayoutError> {
        let capacity = slot_count(columns, rows).ok_or(LayoutError::TooLarge)?;
        Ok(Self {
            columns,
            rows,
            slots: vec![None; capacity],
        })
    }

    /// Parses text rows, top row first, using `.` for empty slots and `A`, `B`, ... for colors.
    pub fn parse(lines: &[&str]) -> Result<Self, LayoutError> {
        let rows = u32::try_from(lines.len()).map_err(|_| LayoutError::TooLarge)?;
        let first = lines.first().ok_or(LayoutError::NoRows)?;
        let columns =
            u32::try_from(first.chars().count()).map_err(|_| LayoutError::TooLarge)?;
        if columns == 0 {
            return Err(LayoutError::NoRows);
        }

        let mut layout = Self::empty(columns, rows)?;
        for (line_index, line) in lines.iter().enumerate() {
            let row = rows - 1 - line_index as u32;
            let width = line.chars().count();
            if width != columns as usize {
                return Err(LayoutError::RaggedRow {
                    row,
                    expected: columns,
                    found: width,
                });
            }

            for (column, glyph) in line.chars().enumerate() {
                let cell = CellCoord::new(column as u32, row);
                let color = match glyph {
                    '.' => None,
                    other => Some(
                        CellColor::from_glyph(other)
                            .ok_or(LayoutError::UnknownGlyph { glyph: other, cell })?,
                    ),
                };
                layout.set(cell, color)?;
            }
        }

        Ok(layout)
    }

    /// Number of columns described by the layout.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows described by the layout.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Color stored at `cell`, or `None` when the slot is empty or out of bounds.
    #[must_use]
    pub fn get(&self, cell: CellCoord) -> Option<CellColor> {
        self.index(cell)
            .and_then(|index| self.slots.get(index).copied().flatten())
    }

    /// Stores `color` at `cell`.
    pub fn set(&mut self, cell: CellCoord, color: Option<CellColor>) -> Result<(), LayoutError> {
        let slot = self
            .index(cell)
            .and_then(|index| self.slots.get_mut(index))
            .ok_or(LayoutError::OutOfBounds { cell })?;
        *slot = color;
        Ok(())
    }

    /// Iterator over every slot, row by row from the floor up.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, Option<CellColor>)> + '_ {
        let columns = self.columns.max(1);
        self.slots.iter().enumerate().map(move |(index, color)| {
            let index = index as u32;
            (CellCoord::new(index % columns, index / columns), *color)
        })
    }

    /// Renders the layout as text rows, top row first, in the format read by [`GridLayout::parse`].
    #[must_use]
    pub fn to_lines(&self) -> Vec<String> {
        (0..self.rows)
            .rev()
            .map(|row| {
                (0..self.columns)
                    .map(|column| {
                        self.get(CellCoord::new(column, row))
                            .map_or('.', |color| color.glyph())
                    })
                    .collect()
            })
            .collect()
    }

    /// Checks that the layout fits the configured dimensions and palette.
    pub fn check_against(&self, config: &GridConfig) -> Result<(), LayoutError> {
        if self.columns != config.columns() || self.rows != config.rows() {
            return Err(LayoutError::DimensionMismatch {
                expected: (config.columns(), config.rows()),
                found: (self.columns, self.rows),
            });
        }

        let expected_slots = u64::from(self.columns) * u64::from(self.rows);
        if self.slots.len() as u64 != expected_slots {
            return Err(LayoutError::SlotCountMismatch {
                expected: expected_slots,
                found: self.slots.len(),
            });
        }

        for (cell, color) in self.iter() {
            if let Some(color) = color {
                if !config.palette().contains(color) {
                    return Err(LayoutError::ColorOutOfPalette { cell, color });
                }
            }
        }

        Ok(())
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

/// Reasons a [`GridLayout`] cannot be built or installed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The text layout contained no rows or an empty first row.
    #[error("layout has no rows")]
    NoRows,
    /// The layout holds more slots than [`MAX_GRID_SLOTS`].
    #[error("layout exceeds the limit of {} slots", MAX_GRID_SLOTS)]
    TooLarge,
    /// A text row differs in width from the first row.
    #[error("row {row} has {found} slots, expected {expected}")]
    RaggedRow {
        /// Grid row (floor is zero) of the offending line.
        row: u32,
        /// Width of the first line.
        expected: u32,
        /// Width of the offending line.
        found: usize,
    },
    /// A text row contained a character that is neither `.` nor `A`-`Z`.
    #[error("unknown glyph '{glyph}' at {cell:?}")]
    UnknownGlyph {
        /// Offending character.
        glyph: char,
        /// Slot the character describes.
        cell: CellCoord,
    },
    /// A slot outside the layout bounds was addressed.
    #[error("slot {cell:?} lies outside the layout")]
    OutOfBounds {
        /// Offending slot.
        cell: CellCoord,
    },
    /// The layout dimensions differ from the grid configuration.
    #[error("layout is {found:?} (columns, rows) but the grid is {expected:?}")]
    DimensionMismatch {
        /// Configured dimensions.
        expected: (u32, u32),
        /// Layout dimensions.
        found: (u32, u32),
    },
    /// The serialized slot array does not cover the layout dimensions.
    #[error("layout stores {found} slots, expected {expected}")]
    SlotCountMismatch {
        /// Slot count implied by the dimensions.
        expected: u64,
        /// Slot count actually stored.
        found: usize,
    },
    /// A slot references a color missing from the palette.
    #[error("slot {cell:?} uses color {color:?} which the palette does not define")]
    ColorOutOfPalette {
        /// Offending slot.
        cell: CellCoord,
        /// Offending color.
        color: CellColor,
    },
}
