//! Tile occupancy: the static grid plus every living entity.
//!
//! Never cached. Entities move every tick, so callers ask at the point of use.

use std::collections::HashSet;

use gridrealm_shared::TilePos;

use super::GameWorld;
use crate::entities::Entity;

impl GameWorld {
    /// Living players and monsters
    pub(crate) fn alive_entities(&self) -> impl Iterator<Item = &Entity> {
        self.players
            .values()
            .map(|p| &p.entity)
            .chain(self.monsters.values().map(|m| &m.entity))
            .filter(|e| e.is_alive())
    }

    /// True if the tile is off the map, a wall, or stood on by a living entity
    pub fn is_tile_blocked(&self, tile: TilePos) -> bool {
        if !self.grid.is_walkable(tile) {
            return true;
        }
        self.alive_entities().any(|e| e.tile == tile)
    }

    /// Closest free tile to `center` by ring distance, `center` itself first.
    /// Ties within a ring go to the smaller row, then the smaller column.
    pub(crate) fn free_tile_near(&self, center: TilePos) -> Option<TilePos> {
        let reach = self.grid.width().max(self.grid.height()) as i32;
        (0..=reach).find_map(|radius| {
            (-radius..=radius)
                .flat_map(|dy| (-radius..=radius).map(move |dx| (dx, dy)))
                .filter(|(dx, dy)| dx.abs() == radius || dy.abs() == radius)
                .map(|(dx, dy)| center.offset(dx, dy))
                .find(|tile| !self.is_tile_blocked(*tile))
        })
    }

    /// Tiles of living entities other than those named in `except`.
    /// Used as temporary obstacles for path requests.
    pub(crate) fn occupied_tiles_except(&self, except: &[&str]) -> HashSet<TilePos> {
        self.alive_entities()
            .filter(|e| !except.contains(&e.id.as_str()))
            .map(|e| e.tile)
            .collect()
    }
}
