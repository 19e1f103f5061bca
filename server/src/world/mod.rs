//! Game world management.
//!
//! `GameWorld` owns every player and monster plus the static grid. All
//! mutation goes through `&mut self`, so the gateway's single task is the
//! only writer. Every operation takes an explicit `now` in milliseconds and
//! returns the messages it produced, addressed by `Recipient`.

mod grid;
mod occupancy;
mod movement;
mod monster_ai;
mod combat;
mod intents;

pub use grid::{GridMap, MapError, TILE_OPEN, TILE_WALL};

use std::collections::HashMap;
use std::sync::Arc;

use gridrealm_shared::{EntitySnapshot, ServerMessage, TilePos};
use log::{info, warn};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::config::{ConfigError, ServerConfig};
use crate::entities::{ActorId, Entity, MonsterState, ServerMonster, ServerPlayer};
use crate::navigation::Pathfinder;

/// Random attempts at finding a free spawn tile before scanning the grid
const SPAWN_SEARCH_ATTEMPTS: usize = 100;

/// Length of generated player ids
const PLAYER_ID_LEN: usize = 16;

/// Failures while processing a single entity. During a tick they are logged
/// and the tick moves on to the next entity.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("entity {0} vanished during the tick")]
    UnknownEntity(String),
    #[error("no free tile left to place a player on")]
    NoFreeTile,
}

/// Who should receive an outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    All,
    Player(String),
    AllExcept(String),
}

/// A message produced by the world, waiting for the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub recipient: Recipient,
    pub message: ServerMessage,
}

impl Outgoing {
    pub fn broadcast(message: ServerMessage) -> Self {
        Self { recipient: Recipient::All, message }
    }

    pub fn to_player(id: &str, message: ServerMessage) -> Self {
        Self { recipient: Recipient::Player(id.to_string()), message }
    }

    pub fn to_others(id: &str, message: ServerMessage) -> Self {
        Self { recipient: Recipient::AllExcept(id.to_string()), message }
    }
}

/// The game world containing all entities
pub struct GameWorld {
    grid: Arc<GridMap>,
    pathfinder: Pathfinder,
    players: HashMap<String, ServerPlayer>,
    monsters: HashMap<String, ServerMonster>,
    config: ServerConfig,
    rng: StdRng,
}

impl GameWorld {
    pub fn new(config: ServerConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Build a world with a given random source, for reproducible runs
    pub fn with_rng(config: ServerConfig, rng: StdRng) -> Result<Self, ConfigError> {
        let grid = Arc::new(config.validate()?);
        let pathfinder = Pathfinder::new(Arc::clone(&grid), config.path_search_limit);

        let mut world = Self {
            grid,
            pathfinder,
            players: HashMap::new(),
            monsters: HashMap::new(),
            config,
            rng,
        };
        world.spawn_monsters();

        info!(
            "World ready: {}x{} map, {} monsters",
            world.grid.width(),
            world.grid.height(),
            world.monsters.len()
        );
        Ok(world)
    }

    /// Seed one monster per configured type
    fn spawn_monsters(&mut self) {
        for (index, monster_type) in self.config.monster_types.iter().enumerate() {
            let id = format!("{}_{}", monster_type.id_prefix, index + 1);
            let monster = ServerMonster::new(id.clone(), monster_type);
            self.monsters.insert(id, monster);
        }
    }

    /// Advance the simulation by one tick: due respawns, then movement, then monster AI
    pub fn tick(&mut self, now: u64) -> Vec<Outgoing> {
        let mut out = Vec::new();
        self.process_respawns(now, &mut out);
        self.execute_movement(now, &mut out);
        self.update_monster_ai(now, &mut out);
        out
    }

    // ------------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------------

    /// Add a new player at the spawn tile.
    ///
    /// Returns the new id plus the join burst: the world state for the new
    /// player and a `NewPlayer` notice for everyone else. Fails when every
    /// walkable tile is taken.
    pub fn connect_player(&mut self) -> Result<(String, Vec<Outgoing>), WorldError> {
        let tile = self
            .find_spawn_tile(self.config.player.spawn_point)
            .ok_or(WorldError::NoFreeTile)?;
        let id = self.generate_player_id();
        let color = format!("0x{:06x}", self.rng.gen_range(0..=0xFF_FFFFu32));

        let player = ServerPlayer::new(id.clone(), tile, color, &self.config.player);
        let snapshot = player.snapshot();
        self.players.insert(id.clone(), player);
        info!("Player {} joined at ({}, {})", id, tile.x, tile.y);

        let out = vec![
            Outgoing::to_player(&id, ServerMessage::Welcome { player_id: id.clone() }),
            Outgoing::to_player(&id, ServerMessage::CurrentPlayers { players: self.player_snapshots() }),
            Outgoing::to_player(&id, ServerMessage::CurrentMonsters { monsters: self.monster_snapshots() }),
            Outgoing::to_player(&id, ServerMessage::MapData { grid: self.grid.rows() }),
            Outgoing::to_others(&id, ServerMessage::NewPlayer { player: snapshot }),
        ];
        Ok((id, out))
    }

    /// Remove a player. Anyone targeting them forgets the target at once.
    pub fn disconnect_player(&mut self, id: &str) -> Vec<Outgoing> {
        if self.players.remove(id).is_none() {
            return Vec::new();
        }

        for monster in self.monsters.values_mut() {
            if monster.target_id.as_deref() == Some(id) {
                monster.target_id = None;
                if monster.state == MonsterState::Chasing {
                    monster.set_state(MonsterState::Returning);
                }
            }
        }
        for player in self.players.values_mut() {
            if player.target_id.as_deref() == Some(id) {
                player.target_id = None;
            }
        }

        info!("Player {} left", id);
        vec![Outgoing::broadcast(ServerMessage::PlayerDisconnected { id: id.to_string() })]
    }

    fn generate_player_id(&mut self) -> String {
        loop {
            let id: String = (&mut self.rng)
                .sample_iter(Alphanumeric)
                .take(PLAYER_ID_LEN)
                .map(char::from)
                .collect();
            if !self.players.contains_key(&id) && !self.monsters.contains_key(&id) {
                return id;
            }
        }
    }

    /// The preferred tile if free, otherwise a random free tile, otherwise the
    /// first free tile in row-major order. `None` only when the map is full.
    pub(crate) fn find_spawn_tile(&mut self, preferred: TilePos) -> Option<TilePos> {
        if !self.is_tile_blocked(preferred) {
            return Some(preferred);
        }

        let (width, height) = (self.grid.width() as i32, self.grid.height() as i32);
        for _ in 0..SPAWN_SEARCH_ATTEMPTS {
            let tile = TilePos::new(self.rng.gen_range(0..width), self.rng.gen_range(0..height));
            if !self.is_tile_blocked(tile) {
                return Some(tile);
            }
        }

        let tile = (0..height)
            .flat_map(|y| (0..width).map(move |x| TilePos::new(x, y)))
            .find(|tile| !self.is_tile_blocked(*tile));
        if tile.is_none() {
            warn!("Every walkable tile is occupied");
        }
        tile
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    pub fn get_player(&self, id: &str) -> Option<&ServerPlayer> {
        self.players.get(id)
    }

    pub fn get_player_mut(&mut self, id: &str) -> Option<&mut ServerPlayer> {
        self.players.get_mut(id)
    }

    pub fn get_monster(&self, id: &str) -> Option<&ServerMonster> {
        self.monsters.get(id)
    }

    pub fn get_monster_mut(&mut self, id: &str) -> Option<&mut ServerMonster> {
        self.monsters.get_mut(id)
    }

    pub fn players(&self) -> impl Iterator<Item = &ServerPlayer> {
        self.players.values()
    }

    pub fn monsters(&self) -> impl Iterator<Item = &ServerMonster> {
        self.monsters.values()
    }

    pub fn player_snapshots(&self) -> HashMap<String, EntitySnapshot> {
        self.players.iter().map(|(id, p)| (id.clone(), p.snapshot())).collect()
    }

    pub fn monster_snapshots(&self) -> HashMap<String, EntitySnapshot> {
        self.monsters.iter().map(|(id, m)| (id.clone(), m.snapshot())).collect()
    }

    pub(crate) fn entity(&self, actor: &ActorId) -> Option<&Entity> {
        match actor {
            ActorId::Player(id) => self.players.get(id).map(|p| &p.entity),
            ActorId::Monster(id) => self.monsters.get(id).map(|m| &m.entity),
        }
    }

    pub(crate) fn entity_mut(&mut self, actor: &ActorId) -> Option<&mut Entity> {
        match actor {
            ActorId::Player(id) => self.players.get_mut(id).map(|p| &mut p.entity),
            ActorId::Monster(id) => self.monsters.get_mut(id).map(|m| &mut m.entity),
        }
    }

    pub(crate) fn snapshot_of(&self, actor: &ActorId) -> Option<EntitySnapshot> {
        match actor {
            ActorId::Player(id) => self.players.get(id).map(ServerPlayer::snapshot),
            ActorId::Monster(id) => self.monsters.get(id).map(ServerMonster::snapshot),
        }
    }
}
