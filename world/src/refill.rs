//! Generation of new cells that never complete a match on arrival.

use gemfall_core::{CellColor, CellCoord, CellSnapshot, Direction, Palette, RefillRule, MATCH_RUN};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::{grid::Grid, GridError};

/// Fills every empty slot, columns left to right and each column from the floor up.
pub(crate) fn fill_empty_slots(
    grid: &mut Grid,
    palette: &Palette,
    rule: RefillRule,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<CellSnapshot>, GridError> {
    let mut created = Vec::new();
    for cell in grid.empty_slots() {
        let pool = candidate_colors(grid, cell, palette, rule);
        let color = *pool
            .choose(rng)
            .ok_or(GridError::PaletteExhausted { cell })?;
        if let Some(snapshot) = grid.spawn(cell, color)? {
            created.push(snapshot);
        }
    }
    Ok(created)
}

/// Palette colors that may occupy `cell` under `rule`, in palette order.
pub(crate) fn candidate_colors(
    grid: &Grid,
    cell: CellCoord,
    palette: &Palette,
    rule: RefillRule,
) -> Vec<CellColor> {
    match rule {
        RefillRule::CompleteRunsOnly => palette
            .indices()
            .filter(|color| !completes_run(grid, cell, *color))
            .collect(),
        RefillRule::AnyNeighbor => {
            let (columns, rows) = grid.dimensions();
            let forbidden: Vec<CellColor> = Direction::ALL
                .iter()
                .filter_map(|direction| cell.step(*direction, columns, rows))
                .filter_map(|neighbor| grid.color_at(neighbor))
                .collect();
            palette
                .indices()
                .filter(|color| !forbidden.contains(color))
                .collect()
        }
    }
}

fn completes_run(grid: &Grid, cell: CellCoord, color: CellColor) -> bool {
    let horizontal = 1
        + grid.run_length(cell, Direction::Left, color)
        + grid.run_length(cell, Direction::Right, color);
    let vertical = 1
        + grid.run_length(cell, Direction::Up, color)
        + grid.run_length(cell, Direction::Down, color);
    horizontal >= MATCH_RUN || vertical >= MATCH_RUN
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemfall_core::GridLayout;
    use rand::SeedableRng;

    fn grid_from(lines: &[&str]) -> Grid {
        let layout = GridLayout::parse(lines).expect("layout parses");
        let mut grid = Grid::new(layout.columns(), layout.rows()).expect("grid fits");
        let _ = grid.populate(&layout).expect("layout populates");
        grid
    }

    #[test]
    fn complete_runs_only_excludes_colors_that_finish_a_run() {
        let grid = grid_from(&[
            "....",
            "C...",
            "C.AA",
        ]);
        let palette = Palette::default();

        let pool = candidate_colors(&grid, CellCoord::new(1, 0), &palette, RefillRule::CompleteRunsOnly);
        assert!(!pool.contains(&CellColor::new(0)));
        assert!(pool.contains(&CellColor::new(2)));

        let above = candidate_colors(&grid, CellCoord::new(0, 2), &palette, RefillRule::CompleteRunsOnly);
        assert!(!above.contains(&CellColor::new(2)));
        assert_eq!(above.len(), palette.len() - 1);
    }

    #[test]
    fn complete_runs_only_considers_both_sides_of_the_slot() {
        let grid = grid_from(&["B.B"]);
        let palette = Palette::default();

        let pool = candidate_colors(&grid, CellCoord::new(1, 0), &palette, RefillRule::CompleteRunsOnly);

        assert!(!pool.contains(&CellColor::new(1)));
        assert_eq!(pool.len(), palette.len() - 1);
    }

    #[test]
    fn any_neighbor_excludes_every_adjacent_color() {
        let grid = grid_from(&[
            ".B.",
            "A.C",
            ".D.",
        ]);
        let palette = Palette::default();

        let pool = candidate_colors(&grid, CellCoord::new(1, 1), &palette, RefillRule::AnyNeighbor);

        assert_eq!(pool, vec![CellColor::new(4)]);
    }

    #[test]
    fn fill_leaves_no_matches_behind() {
        let mut grid = Grid::new(9, 9).expect("grid fits");
        let palette = Palette::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let created = fill_empty_slots(&mut grid, &palette, RefillRule::CompleteRunsOnly, &mut rng)
            .expect("palette suffices");

        assert_eq!(created.len(), 81);
        assert!(grid.empty_slots().is_empty());
        assert!(!grid.has_matches(MATCH_RUN));
        assert!(grid.is_consistent());
    }
}
