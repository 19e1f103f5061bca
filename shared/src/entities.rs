//! Shared entity definitions.

use serde::{Deserialize, Serialize};

use crate::protocol::TILE_SIZE;

/// A cell on the tile grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }

    /// Straight-line distance in tiles
    pub fn distance_to(&self, other: TilePos) -> f32 {
        let dx = (other.x - self.x) as f32;
        let dy = (other.y - self.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// Pixel coordinate of the tile centre, for presentation only
    pub fn pixel_center(&self) -> (i32, i32) {
        (
            self.x * TILE_SIZE + TILE_SIZE / 2,
            self.y * TILE_SIZE + TILE_SIZE / 2,
        )
    }
}

/// Serializable view of a player or monster sent to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: String,
    pub name: String,
    /// Set for players only
    pub player_id: Option<String>,
    pub tile_x: i32,
    pub tile_y: i32,
    pub x: i32,
    pub y: i32,
    /// Milliseconds per tile step
    pub speed: u64,
    pub color: String,
    pub is_monster: bool,
    pub health: u32,
    pub max_health: u32,
}

impl EntitySnapshot {
    pub fn tile(&self) -> TilePos {
        TilePos::new(self.tile_x, self.tile_y)
    }
}
