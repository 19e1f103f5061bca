//! Tile-grid pathfinding shared by player path requests and monster AI.
//!
//! This module provides:
//! - Path requests that carry their own temporary obstacles
//! - A* search over the static grid with diagonal steps

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;

use gridrealm_shared::TilePos;
use log::{debug, trace};

use crate::world::GridMap;

/// Cost of an orthogonal step
const STRAIGHT_COST: u32 = 10;

/// Cost of a diagonal step
const DIAGONAL_COST: u32 = 14;

/// The eight neighbour offsets
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0), (-1, 0), (0, 1), (0, -1),
    (1, 1), (1, -1), (-1, 1), (-1, -1),
];

// ============================================================================
// Requests
// ============================================================================

/// One path query. Temporary obstacles live on the request, so concurrent
/// queries never see each other's blocked tiles.
#[derive(Debug, Clone)]
pub struct PathRequest {
    pub from: TilePos,
    pub to: TilePos,
    /// Tiles treated as walls for this request only
    pub avoid: HashSet<TilePos>,
}

impl PathRequest {
    pub fn new(from: TilePos, to: TilePos) -> Self {
        Self {
            from,
            to,
            avoid: HashSet::new(),
        }
    }

    /// Add temporary obstacles
    pub fn avoiding(mut self, tiles: impl IntoIterator<Item = TilePos>) -> Self {
        self.avoid.extend(tiles);
        self
    }

    fn is_open(&self, grid: &GridMap, tile: TilePos) -> bool {
        grid.is_walkable(tile) && !self.avoid.contains(&tile)
    }
}

// ============================================================================
// A* Pathfinding
// ============================================================================

/// Octile distance scaled to the step costs
fn heuristic(a: TilePos, b: TilePos) -> u32 {
    let dx = (a.x - b.x).unsigned_abs();
    let dy = (a.y - b.y).unsigned_abs();
    let (min, max) = if dx < dy { (dx, dy) } else { (dy, dx) };
    DIAGONAL_COST * min + STRAIGHT_COST * (max - min)
}

/// A* search over the shared read-only grid
#[derive(Debug, Clone)]
pub struct Pathfinder {
    grid: Arc<GridMap>,
    /// Node expansions before giving up
    max_iterations: usize,
}

impl Pathfinder {
    pub fn new(grid: Arc<GridMap>, max_iterations: usize) -> Self {
        Self { grid, max_iterations }
    }

    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    /// Find a path for `request`.
    ///
    /// The returned path starts with `request.from` and ends with `request.to`.
    /// A request for the tile you are standing on yields just that tile.
    /// Returns `None` if the goal is not walkable, is avoided, or cannot be reached.
    pub fn find_path(&self, request: &PathRequest) -> Option<Vec<TilePos>> {
        let (start, goal) = (request.from, request.to);

        if !request.is_open(&self.grid, goal) {
            trace!("[PATH] goal ({}, {}) is blocked", goal.x, goal.y);
            return None;
        }
        if start == goal {
            return Some(vec![start]);
        }

        let mut open = BinaryHeap::new();
        let mut g_scores: HashMap<TilePos, u32> = HashMap::new();
        let mut came_from: HashMap<TilePos, TilePos> = HashMap::new();

        g_scores.insert(start, 0);
        open.push(Reverse((heuristic(start, goal), 0u32, start)));

        let mut iterations = 0;
        while let Some(Reverse((_f, g_cost, current))) = open.pop() {
            if g_cost > g_scores.get(&current).copied().unwrap_or(u32::MAX) {
                continue;
            }

            if current == goal {
                let mut path = vec![goal];
                let mut node = goal;
                while let Some(&parent) = came_from.get(&node) {
                    path.push(parent);
                    node = parent;
                }
                path.reverse();
                trace!(
                    "[PATH] ({}, {}) -> ({}, {}): {} tiles after {} expansions",
                    start.x, start.y, goal.x, goal.y, path.len(), iterations
                );
                return Some(path);
            }

            iterations += 1;
            if iterations > self.max_iterations {
                debug!(
                    "[PATH] gave up on ({}, {}) -> ({}, {}) after {} expansions",
                    start.x, start.y, goal.x, goal.y, iterations
                );
                return None;
            }

            for &(dx, dy) in &DIRECTIONS {
                let neighbor = current.offset(dx, dy);
                if !request.is_open(&self.grid, neighbor) {
                    continue;
                }

                let step = if dx != 0 && dy != 0 { DIAGONAL_COST } else { STRAIGHT_COST };
                let tentative = g_cost + step;
                if tentative < g_scores.get(&neighbor).copied().unwrap_or(u32::MAX) {
                    g_scores.insert(neighbor, tentative);
                    came_from.insert(neighbor, current);
                    open.push(Reverse((tentative + heuristic(neighbor, goal), tentative, neighbor)));
                }
            }
        }

        None
    }
}
