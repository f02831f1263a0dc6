use crate::components::{Dir, Pos};
use crate::level::Grid;

/// Where a step from `from` in `dir` lands, or `None` if it would leave the
/// grid or walk into a wall.
pub fn next_position(grid: &Grid, from: Pos, dir: Dir) -> Option<Pos> {
    let next = grid.neighbor(from, dir)?;
    grid.get(next).is_walkable().then_some(next)
}

/// Removes the supply lying on `pos`, if any. Returns whether one was taken.
pub fn take_supply(supplies: &mut Vec<Pos>, pos: Pos) -> bool {
    match supplies.iter().position(|s| *s == pos) {
        Some(idx) => {
            supplies.remove(idx);
            true
        }
        None => false,
    }
}
