//! Network protocol definitions shared between client and server.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entities::EntitySnapshot;

/// Protocol version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 1;

/// Default simulation tick interval in milliseconds
pub const TICK_INTERVAL_MS: u64 = 200;

/// Default server port
pub const DEFAULT_PORT: u16 = 7777;

/// Edge length of one tile in pixels. Clients must use the same value.
pub const TILE_SIZE: i32 = 32;

// =============================================================================
// Client -> Server Messages
// =============================================================================

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Join the world
    Connect {
        protocol_version: u32,
    },

    /// Leave gracefully
    Disconnect,

    /// Keep-alive, sent while idle
    Heartbeat,

    /// Step one tile, e.g. "up", "down-left"
    RequestMove {
        direction: String,
    },

    /// Walk to a tile along a server-computed path
    RequestPath {
        x: i32,
        y: i32,
    },

    /// Aim at an entity
    RequestTarget {
        target_id: String,
    },

    /// Hit the current target
    RequestAttack,

    /// Come back after dying
    RequestRespawn,
}

// =============================================================================
// Server -> Client Messages
// =============================================================================

/// Messages sent from server to client(s)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Identity assigned to the receiving connection
    Welcome {
        player_id: String,
    },

    /// Every connected player, sent on join
    CurrentPlayers {
        players: HashMap<String, EntitySnapshot>,
    },

    /// Every monster including dead ones, sent on join
    CurrentMonsters {
        monsters: HashMap<String, EntitySnapshot>,
    },

    /// Row-major tile grid, 0 = walkable, 1 = blocked
    MapData {
        grid: Vec<Vec<u8>>,
    },

    NewPlayer {
        player: EntitySnapshot,
    },

    PlayerDisconnected {
        id: String,
    },

    /// `path_complete` is only present for path-driven steps
    EntityMoved {
        entity: EntitySnapshot,
        path_complete: Option<bool>,
    },

    MoveRejected,

    UpdateTarget {
        target_id: Option<String>,
    },

    EntityDamaged {
        id: String,
        health: u32,
        damage: u32,
    },

    EntityDied {
        id: String,
    },

    EntityRespawned {
        entity: EntitySnapshot,
    },
}

/// Parse a move direction such as "up", "right" or "down-left" into a tile delta.
///
/// Returns `None` when no direction is named or when opposite directions are
/// combined.
pub fn direction_delta(direction: &str) -> Option<(i32, i32)> {
    let direction = direction.to_ascii_lowercase();
    let up = direction.contains("up");
    let down = direction.contains("down");
    let left = direction.contains("left");
    let right = direction.contains("right");

    if (up && down) || (left && right) {
        return None;
    }

    let dx = if left { -1 } else if right { 1 } else { 0 };
    let dy = if up { -1 } else if down { 1 } else { 0 };

    if dx == 0 && dy == 0 {
        None
    } else {
        Some((dx, dy))
    }
}

// =============================================================================
// Serialization helpers
// =============================================================================

impl ClientMessage {
    pub fn serialize(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

impl ServerMessage {
    pub fn serialize(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}
