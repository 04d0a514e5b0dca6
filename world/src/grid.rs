use std::collections::{BTreeMap, BTreeSet};

use gemfall_core::{
    slot_count, CellColor, CellCoord, CellId, CellSnapshot, ConfigError, Direction, GridLayout,
    LayoutError, MAX_GRID_SLOTS,
};

use crate::GridError;

/// Slot storage plus the cells that occupy it.
///
/// Slots are stored row by row from the floor up. Every cell's stored
/// coordinate names the slot holding its id.
#[derive(Clone, Debug, Default)]
pub(crate) struct Grid {
    columns: u32,
    rows: u32,
    slots: Vec<Option<CellId>>,
    cells: BTreeMap<CellId, Cell>,
    next_id: u32,
}

#[derive(Clone, Copy, Debug)]
struct Cell {
    id: CellId,
    cell: CellCoord,
    color: CellColor,
}

impl Cell {
    fn snapshot(&self) -> CellSnapshot {
        CellSnapshot {
            id: self.id,
            cell: self.cell,
            color: self.color,
        }
    }
}

impl Grid {
    pub(crate) fn new(columns: u32, rows: u32) -> Result<Self, GridError> {
        let capacity = slot_count(columns, rows).ok_or(ConfigError::GridTooLarge {
            columns,
            rows,
            limit: MAX_GRID_SLOTS,
        })?;
        Ok(Self {
            columns,
            rows,
            slots: vec![None; capacity],
            cells: BTreeMap::new(),
            next_id: 0,
        })
    }

    pub(crate) fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    pub(crate) fn occupant(&self, cell: CellCoord) -> Option<CellId> {
        self.index(cell)
            .and_then(|index| self.slots.get(index).copied().flatten())
    }

    pub(crate) fn color_at(&self, cell: CellCoord) -> Option<CellColor> {
        self.occupant(cell)
            .and_then(|id| self.cells.get(&id))
            .map(|cell| cell.color)
    }

    pub(crate) fn snapshot(&self, id: CellId) -> Option<CellSnapshot> {
        self.cells.get(&id).map(Cell::snapshot)
    }

    pub(crate) fn snapshots(&self) -> impl Iterator<Item = CellSnapshot> + '_ {
        self.cells.values().map(Cell::snapshot)
    }

    pub(crate) fn contains(&self, id: CellId) -> bool {
        self.cells.contains_key(&id)
    }

    /// Places a new cell into an empty slot; out-of-bounds or occupied slots yield `None`.
    ///
    /// Identifiers are never reused, so spawning fails once they run out.
    pub(crate) fn spawn(
        &mut self,
        cell: CellCoord,
        color: CellColor,
    ) -> Result<Option<CellSnapshot>, GridError> {
        let Some(index) = self.index(cell) else {
            return Ok(None);
        };
        if self.slots[index].is_some() {
            return Ok(None);
        }

        let id = CellId::new(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or(GridError::CellIdsExhausted)?;
        self.slots[index] = Some(id);
        let created = Cell { id, cell, color };
        let _ = self.cells.insert(id, created);
        Ok(Some(created.snapshot()))
    }

    /// Replaces the whole grid content with the cells described by `layout`.
    pub(crate) fn populate(&mut self, layout: &GridLayout) -> Result<Vec<CellSnapshot>, GridError> {
        let mut created = Vec::new();
        for (cell, color) in layout.iter() {
            if let Some(color) = color {
                if let Some(snapshot) = self.spawn(cell, color)? {
                    created.push(snapshot);
                }
            }
        }
        Ok(created)
    }

    pub(crate) fn remove(&mut self, id: CellId) -> Option<CellSnapshot> {
        let removed = self.cells.remove(&id)?;
        if let Some(index) = self.index(removed.cell) {
            self.slots[index] = None;
        }
        Some(removed.snapshot())
    }

    /// Exchanges the slots of two cells, returning both at their new positions.
    pub(crate) fn swap(&mut self, first: CellId, second: CellId) -> Option<(CellSnapshot, CellSnapshot)> {
        let first_cell = self.cells.get(&first)?.cell;
        let second_cell = self.cells.get(&second)?.cell;
        let first_index = self.index(first_cell)?;
        let second_index = self.index(second_cell)?;

        self.slots.swap(first_index, second_index);
        let moved_first = self.cells.get_mut(&first)?;
        moved_first.cell = second_cell;
        let first_snapshot = moved_first.snapshot();
        let moved_second = self.cells.get_mut(&second)?;
        moved_second.cell = first_cell;
        let second_snapshot = moved_second.snapshot();

        Some((first_snapshot, second_snapshot))
    }

    pub(crate) fn are_neighbors(&self, first: CellId, second: CellId) -> bool {
        match (self.cells.get(&first), self.cells.get(&second)) {
            (Some(first), Some(second)) => first.cell.is_adjacent(second.cell),
            _ => false,
        }
    }

    /// Occupied neighbors of a cell in Left, Right, Up, Down order.
    pub(crate) fn neighbors(&self, id: CellId) -> Vec<CellId> {
        let Some(anchor) = self.cells.get(&id) else {
            return Vec::new();
        };

        Direction::ALL
            .iter()
            .filter_map(|direction| anchor.cell.step(*direction, self.columns, self.rows))
            .filter_map(|cell| self.occupant(cell))
            .collect()
    }

    /// Counts consecutive cells of `color` starting next to `origin` and walking in `direction`.
    pub(crate) fn run_length(&self, origin: CellCoord, direction: Direction, color: CellColor) -> usize {
        let mut length = 0;
        let mut cursor = origin.step(direction, self.columns, self.rows);
        while let Some(cell) = cursor {
            if self.color_at(cell) != Some(color) {
                break;
            }
            length += 1;
            cursor = cell.step(direction, self.columns, self.rows);
        }
        length
    }

    /// Cells sharing the anchor's color along each axis, keeping the axes of at least `min_run` cells.
    pub(crate) fn find_matches(&self, anchor: CellId, min_run: usize) -> BTreeSet<CellId> {
        let mut matches = BTreeSet::new();
        let Some(origin) = self.cells.get(&anchor) else {
            return matches;
        };

        let axes = [
            [Direction::Left, Direction::Right],
            [Direction::Up, Direction::Down],
        ];
        for axis in axes {
            let mut line = vec![anchor];
            for direction in axis {
                self.collect_run(origin.cell, direction, origin.color, &mut line);
            }
            if line.len() >= min_run {
                matches.extend(line);
            }
        }

        matches
    }

    fn collect_run(&self, origin: CellCoord, direction: Direction, color: CellColor, out: &mut Vec<CellId>) {
        let mut cursor = origin.step(direction, self.columns, self.rows);
        while let Some(cell) = cursor {
            match self.occupant(cell) {
                Some(id) if self.color_at(cell) == Some(color) => out.push(id),
                _ => break,
            }
            cursor = cell.step(direction, self.columns, self.rows);
        }
    }

    /// Drops every cell as far as it can fall, returning the cells that moved.
    ///
    /// Columns are processed left to right and each column from the floor up,
    /// so a single pass compacts every column.
    pub(crate) fn drop_pass(&mut self) -> Vec<CellId> {
        let mut moved = Vec::new();
        for column in 0..self.columns {
            let mut floor = 0;
            for row in 0..self.rows {
                let from = CellCoord::new(column, row);
                let Some(id) = self.occupant(from) else {
                    continue;
                };

                if floor != row {
                    let to = CellCoord::new(column, floor);
                    self.relocate(id, from, to);
                    moved.push(id);
                }
                floor += 1;
            }
        }
        moved
    }

    fn relocate(&mut self, id: CellId, from: CellCoord, to: CellCoord) {
        if let (Some(from_index), Some(to_index)) = (self.index(from), self.index(to)) {
            self.slots[from_index] = None;
            self.slots[to_index] = Some(id);
            if let Some(cell) = self.cells.get_mut(&id) {
                cell.cell = to;
            }
        }
    }

    /// Empty slots in refill order: columns left to right, each from the floor up.
    pub(crate) fn empty_slots(&self) -> Vec<CellCoord> {
        let mut empty = Vec::new();
        for column in 0..self.columns {
            for row in 0..self.rows {
                let cell = CellCoord::new(column, row);
                if self.occupant(cell).is_none() {
                    empty.push(cell);
                }
            }
        }
        empty
    }

    pub(crate) fn layout(&self) -> Result<GridLayout, LayoutError> {
        let mut layout = GridLayout::empty(self.columns, self.rows)?;
        for cell in self.cells.values() {
            layout.set(cell.cell, Some(cell.color))?;
        }
        Ok(layout)
    }

    /// Reports whether any cell sits in a run of [`gemfall_core::MATCH_RUN`] or more.
    pub(crate) fn has_matches(&self, min_run: usize) -> bool {
        self.cells
            .keys()
            .any(|id| !self.find_matches(*id, min_run).is_empty())
    }

    /// Checks that slots and stored cell coordinates agree.
    pub(crate) fn is_consistent(&self) -> bool {
        let occupied = self.slots.iter().filter(|slot| slot.is_some()).count();
        occupied == self.cells.len()
            && self
                .cells
                .values()
                .all(|cell| self.occupant(cell.cell) == Some(cell.id))
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
