//! State common to every positioned, movable, damageable actor.

use std::collections::VecDeque;

use gridrealm_shared::{EntitySnapshot, TilePos};

/// Shared entity record embedded in players and monsters
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: String,
    pub name: String,
    /// Authoritative position
    pub tile: TilePos,
    /// Milliseconds required per tile step. Lower is faster.
    pub speed: u64,
    pub health: u32,
    pub max_health: u32,
    pub color: String,
    /// When the last step was taken, `None` before the first one
    pub last_move_time: Option<u64>,
    /// Tiles still to walk, front first. Empty means idle.
    pub move_path: VecDeque<TilePos>,
}

impl Entity {
    pub fn new(id: String, name: String, tile: TilePos, speed: u64, max_health: u32, color: String) -> Self {
        Self {
            id,
            name,
            tile,
            speed,
            health: max_health,
            max_health,
            color,
            last_move_time: None,
            move_path: VecDeque::new(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Apply damage, flooring health at zero
    pub fn take_damage(&mut self, amount: u32) {
        self.health = self.health.saturating_sub(amount);
    }

    /// Back to full health at `tile` with no path
    pub fn respawn(&mut self, tile: TilePos) {
        self.health = self.max_health;
        self.tile = tile;
        self.move_path.clear();
    }

    /// True once `speed` ms have passed since the last step
    pub fn can_move(&self, now: u64) -> bool {
        match self.last_move_time {
            Some(last) => now >= last.saturating_add(self.speed),
            None => true,
        }
    }

    pub fn step_to(&mut self, tile: TilePos, now: u64) {
        self.tile = tile;
        self.last_move_time = Some(now);
    }

    pub fn has_path(&self) -> bool {
        !self.move_path.is_empty()
    }

    pub fn set_path(&mut self, path: impl IntoIterator<Item = TilePos>) {
        self.move_path = path.into_iter().collect();
    }

    pub fn clear_path(&mut self) {
        self.move_path.clear();
    }

    pub(crate) fn snapshot(&self, player_id: Option<String>, is_monster: bool) -> EntitySnapshot {
        let (x, y) = self.tile.pixel_center();
        EntitySnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            player_id,
            tile_x: self.tile.x,
            tile_y: self.tile.y,
            x,
            y,
            speed: self.speed,
            color: self.color.clone(),
            is_monster,
            health: self.health,
            max_health: self.max_health,
        }
    }
}
