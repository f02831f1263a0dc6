use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use thiserror::Error;
use tracing::info;

use crate::components::{Dir, Pos, Tile};

/// The supply-run layout: wide rooms joined by chokepoints, exit hatch in the
/// bottom-right corner.
pub const RAW_MAP: [&str; 21] = [
    "########################",
    "#....#.....#....#......#",
    "#.##.#.###.#.##.#.####.#",
    "#.#..#...#.#.#..#....#.#",
    "#.#.####.#.#.#.#####.#.#",
    "#.#....#.#.#.#.....#.#.#",
    "#.####.#.#.#.#####.#.#.#",
    "#......#...#.....#.#...#",
    "######.#####.###.#.###.#",
    "#....#.....#.#...#.#...#",
    "#.##.#####.#.#.###.#.###",
    "#..#.....#.#.#.....#...#",
    "##.#####.#.#.#########.#",
    "#......#.#.#.........#.#",
    "####.#.#.#.#########.#.#",
    "#....#.#.#.....#.....#.#",
    "#.####.#.#####.#.#####.#",
    "#.#....#.....#.#.....#.#",
    "#.#.#########.#.###.#.#.",
    "#.#...........#...#.#..E",
    "########################",
];

const WALL_CHAR: char = '#';
const FLOOR_CHAR: char = '.';
const EXIT_CHAR: char = 'E';

const WALL_COST: u32 = 5;
const FLOOR_COST: u32 = 1;
const FALLBACK_START: Pos = Pos::new(1, 1);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("map layout is empty")]
    Empty,
    #[error("row {row} has {found} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown tile {ch:?} at column {x}, row {y}")]
    UnknownTile { ch: char, x: usize, y: usize },
    #[error("map has no exit")]
    MissingExit,
    #[error("map has a second exit at column {x}, row {y}")]
    MultipleExits { x: usize, y: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl Grid {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, pos: Pos) -> Tile {
        self.tiles[self.index(pos)]
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// In bounds and not a wall.
    pub fn is_walkable(&self, pos: Pos) -> bool {
        self.in_bounds(pos) && self.get(pos).is_walkable()
    }

    pub fn neighbor(&self, pos: Pos, dir: Dir) -> Option<Pos> {
        pos.step(dir, self.width, self.height)
    }

    fn set(&mut self, pos: Pos, tile: Tile) {
        let idx = self.index(pos);
        self.tiles[idx] = tile;
    }

    fn index(&self, pos: Pos) -> usize {
        pos.y * self.width + pos.x
    }

    fn pos_of(&self, idx: usize) -> Pos {
        Pos::new(idx % self.width, idx / self.width)
    }
}

/// Set of walkable cells reachable from one origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    width: usize,
    mask: Vec<bool>,
    len: usize,
}

impl Region {
    pub fn contains(&self, pos: Pos) -> bool {
        pos.x < self.width
            && self
                .mask
                .get(pos.y * self.width + pos.x)
                .copied()
                .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn cells(&self) -> Vec<Pos> {
        self.mask
            .iter()
            .enumerate()
            .filter(|(_, inside)| **inside)
            .map(|(idx, _)| Pos::new(idx % self.width, idx / self.width))
            .collect()
    }
}

/// Immutable play area: the grid after connectivity repair, plus the
/// region reachable from the exit.
#[derive(Clone, Debug)]
pub struct Map {
    grid: Grid,
    start: Pos,
    exit: Pos,
    region: Region,
    carved: Vec<Pos>,
}

impl Map {
    pub fn tunnels() -> Result<Self, MapError> {
        Self::parse(&RAW_MAP)
    }

    pub fn parse(layout: &[&str]) -> Result<Self, MapError> {
        let (mut grid, exit) = parse_grid(layout)?;

        let largest = largest_component(&grid);
        let mut carved = Vec::new();
        if !largest.is_empty() && !largest.contains(exit) {
            if let Some(path) = path_to_region(&grid, exit, &largest) {
                for pos in path {
                    if grid.get(pos) == Tile::Wall {
                        grid.set(pos, Tile::Floor);
                        carved.push(pos);
                    }
                }
            }
        }

        let region = flood(&grid, exit);
        let start = find_start(&grid, &region).unwrap_or(FALLBACK_START);

        info!(
            width = grid.width,
            height = grid.height,
            region = region.len(),
            carved = carved.len(),
            "map built"
        );

        Ok(Self {
            grid,
            start,
            exit,
            region,
            carved,
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    pub fn start(&self) -> Pos {
        self.start
    }

    pub fn exit(&self) -> Pos {
        self.exit
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn carved(&self) -> &[Pos] {
        &self.carved
    }

    /// Connected floor cells, row-major. Entities spawn only here.
    pub fn spawn_cells(&self) -> Vec<Pos> {
        self.region
            .cells()
            .into_iter()
            .filter(|pos| self.grid.get(*pos) == Tile::Floor)
            .collect()
    }
}

fn parse_grid(layout: &[&str]) -> Result<(Grid, Pos), MapError> {
    let first = layout.first().ok_or(MapError::Empty)?;
    let width = first.chars().count();
    if width == 0 {
        return Err(MapError::Empty);
    }

    let mut tiles = Vec::with_capacity(width * layout.len());
    let mut exit = None;
    for (y, row) in layout.iter().enumerate() {
        let found = row.chars().count();
        if found != width {
            return Err(MapError::Ragged {
                row: y,
                expected: width,
                found,
            });
        }
        for (x, ch) in row.chars().enumerate() {
            let tile = match ch {
                WALL_CHAR => Tile::Wall,
                FLOOR_CHAR => Tile::Floor,
                EXIT_CHAR => {
                    if exit.is_some() {
                        return Err(MapError::MultipleExits { x, y });
                    }
                    exit = Some(Pos::new(x, y));
                    Tile::Exit
                }
                _ => return Err(MapError::UnknownTile { ch, x, y }),
            };
            tiles.push(tile);
        }
    }

    let exit = exit.ok_or(MapError::MissingExit)?;
    let grid = Grid {
        width,
        height: layout.len(),
        tiles,
    };
    Ok((grid, exit))
}

fn flood(grid: &Grid, start: Pos) -> Region {
    let mut mask = vec![false; grid.width * grid.height];
    let mut len = 0;
    if grid.is_walkable(start) {
        let mut q = VecDeque::new();
        mask[grid.index(start)] = true;
        len += 1;
        q.push_back(start);
        while let Some(pos) = q.pop_front() {
            for dir in Dir::ALL {
                let Some(next) = grid.neighbor(pos, dir) else {
                    continue;
                };
                let idx = grid.index(next);
                if mask[idx] || !grid.get(next).is_walkable() {
                    continue;
                }
                mask[idx] = true;
                len += 1;
                q.push_back(next);
            }
        }
    }
    Region {
        width: grid.width,
        mask,
        len,
    }
}

/// Largest 4-connected walkable component; the first one found in
/// row-major order wins ties.
fn largest_component(grid: &Grid) -> Region {
    let mut visited = vec![false; grid.width * grid.height];
    let mut largest = Region {
        width: grid.width,
        mask: vec![false; grid.width * grid.height],
        len: 0,
    };
    for idx in 0..grid.tiles.len() {
        if visited[idx] || !grid.tiles[idx].is_walkable() {
            continue;
        }
        let component = flood(grid, grid.pos_of(idx));
        for (seen, inside) in visited.iter_mut().zip(&component.mask) {
            *seen |= *inside;
        }
        if component.len > largest.len {
            largest = component;
        }
    }
    largest
}

/// Cheapest path from `start` into `targets`, where stepping onto a wall
/// costs `WALL_COST` and onto anything else `FLOOR_COST`. Open nodes are
/// ordered by estimated total, then accumulated cost, then row-major index.
fn path_to_region(grid: &Grid, start: Pos, targets: &Region) -> Option<Vec<Pos>> {
    let target_cells = targets.cells();
    let heuristic = |pos: Pos| -> u32 {
        target_cells
            .iter()
            .map(|t| t.manhattan(pos) as u32)
            .min()
            .unwrap_or(0)
    };
    let cost = |pos: Pos| -> u32 {
        if grid.get(pos) == Tile::Wall {
            WALL_COST
        } else {
            FLOOR_COST
        }
    };

    let cells = grid.width * grid.height;
    let mut best = vec![u32::MAX; cells];
    let mut came_from: Vec<Option<usize>> = vec![None; cells];
    let mut closed = vec![false; cells];
    let mut open = BinaryHeap::new();

    let start_idx = grid.index(start);
    best[start_idx] = 0;
    open.push(Reverse((heuristic(start), 0u32, start_idx)));

    while let Some(Reverse((_, g, idx))) = open.pop() {
        if closed[idx] {
            continue;
        }
        closed[idx] = true;
        let pos = grid.pos_of(idx);
        if targets.contains(pos) {
            let mut path = vec![pos];
            let mut cursor = came_from[idx];
            while let Some(prev) = cursor {
                path.push(grid.pos_of(prev));
                cursor = came_from[prev];
            }
            path.reverse();
            return Some(path);
        }
        for dir in Dir::ALL {
            let Some(next) = grid.neighbor(pos, dir) else {
                continue;
            };
            let next_idx = grid.index(next);
            let tentative = g + cost(next);
            if tentative < best[next_idx] {
                best[next_idx] = tentative;
                came_from[next_idx] = Some(idx);
                open.push(Reverse((tentative + heuristic(next), tentative, next_idx)));
            }
        }
    }
    None
}

fn find_start(grid: &Grid, region: &Region) -> Option<Pos> {
    for y in 1..grid.height.saturating_sub(1) {
        for x in 1..grid.width.saturating_sub(1) {
            let pos = Pos::new(x, y);
            if grid.get(pos) == Tile::Floor && region.contains(pos) {
                return Some(pos);
            }
        }
    }
    None
}
