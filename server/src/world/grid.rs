//! Static tile grid shared by occupancy checks and the pathfinder.

use gridrealm_shared::TilePos;
use thiserror::Error;

/// Walkable tile flag
pub const TILE_OPEN: u8 = 0;

/// Impassable tile flag
pub const TILE_WALL: u8 = 1;

/// Problems with a map definition. Any of these is fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("map has no tiles")]
    Empty,
    #[error("map row {row} has {found} tiles, expected {expected}")]
    Ragged { row: usize, expected: usize, found: usize },
    #[error("map tile ({x}, {y}) has unknown flag {value}")]
    InvalidFlag { x: usize, y: usize, value: u8 },
}

/// Immutable rectangular grid of tile flags
#[derive(Debug, Clone)]
pub struct GridMap {
    width: usize,
    height: usize,
    /// Row-major flags
    tiles: Vec<u8>,
}

impl GridMap {
    /// Build a grid from row-major rows, validating shape and flags
    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Self, MapError> {
        let height = rows.len();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(MapError::Empty);
        }

        let mut tiles = Vec::with_capacity(width * height);
        for (y, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(MapError::Ragged { row: y, expected: width, found: row.len() });
            }
            for (x, &value) in row.iter().enumerate() {
                if value != TILE_OPEN && value != TILE_WALL {
                    return Err(MapError::InvalidFlag { x, y, value });
                }
                tiles.push(value);
            }
        }

        Ok(Self { width, height, tiles })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn in_bounds(&self, tile: TilePos) -> bool {
        tile.x >= 0 && tile.y >= 0 && (tile.x as usize) < self.width && (tile.y as usize) < self.height
    }

    /// True if the tile is inside the grid and its flag is walkable
    pub fn is_walkable(&self, tile: TilePos) -> bool {
        self.in_bounds(tile) && self.tiles[tile.y as usize * self.width + tile.x as usize] == TILE_OPEN
    }

    /// Clamp a tile into the grid bounds
    pub fn clamp(&self, tile: TilePos) -> TilePos {
        TilePos::new(
            tile.x.clamp(0, self.width as i32 - 1),
            tile.y.clamp(0, self.height as i32 - 1),
        )
    }

    /// Rows in wire format
    pub fn rows(&self) -> Vec<Vec<u8>> {
        self.tiles.chunks(self.width).map(|row| row.to_vec()).collect()
    }
}
