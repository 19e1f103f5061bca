//! Player movement intents: single-step moves and click-to-move paths.

use gridrealm_shared::{direction_delta, ServerMessage, TilePos};
use log::debug;

use super::{GameWorld, Outgoing};
use crate::navigation::PathRequest;

impl GameWorld {
    /// Move one tile in `direction` (e.g. "up", "down-left").
    ///
    /// An accepted move cancels any queued path and is broadcast at once.
    /// Anything else gets a `MoveRejected` back to the requester.
    pub fn request_move(&mut self, player_id: &str, direction: &str, now: u64) -> Vec<Outgoing> {
        let Some(player) = self.players.get(player_id) else {
            return Vec::new();
        };
        let rejected = || vec![Outgoing::to_player(player_id, ServerMessage::MoveRejected)];

        if !player.is_alive() || !player.entity.can_move(now) {
            return rejected();
        }
        let Some((dx, dy)) = direction_delta(direction) else {
            debug!("{} sent unusable direction {:?}", player_id, direction);
            return rejected();
        };

        let destination = player.entity.tile.offset(dx, dy);
        if self.is_tile_blocked(destination) {
            return rejected();
        }

        let Some(player) = self.players.get_mut(player_id) else {
            return Vec::new();
        };
        player.entity.clear_path();
        player.entity.step_to(destination, now);
        vec![Outgoing::broadcast(ServerMessage::EntityMoved {
            entity: player.snapshot(),
            path_complete: None,
        })]
    }

    /// Plan a path to `target` around walls and other entities.
    ///
    /// Ignored while a previous path is still being walked. Returns true if a
    /// path was queued; steps are taken by the tick.
    pub fn request_path(&mut self, player_id: &str, target: TilePos) -> bool {
        let Some(player) = self.players.get(player_id) else {
            return false;
        };
        if !player.is_alive() || player.entity.has_path() {
            return false;
        }

        let obstacles = self.occupied_tiles_except(&[player_id]);
        let request = PathRequest::new(player.entity.tile, target).avoiding(obstacles);
        let Some(path) = self.pathfinder.find_path(&request) else {
            debug!("{} has no path to ({}, {})", player_id, target.x, target.y);
            return false;
        };
        if path.len() <= 1 {
            return false;
        }

        match self.players.get_mut(player_id) {
            Some(player) => {
                player.entity.set_path(path.into_iter().skip(1));
                true
            }
            None => false,
        }
    }
}
