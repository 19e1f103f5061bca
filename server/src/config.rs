//! Server configuration: map, player rules and monster roster.
//!
//! Everything has a built-in default matching the sample deployment, so a
//! config file only needs to name the values it changes.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use gridrealm_shared::{TilePos, TICK_INTERVAL_MS};
use log::info;
use serde::Deserialize;
use thiserror::Error;

use crate::world::{GridMap, MapError};

/// Sample map: 12 rows by 20 columns
const SAMPLE_MAP: [[u8; 20]; 12] = [
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 1, 1, 1, 1, 0, 0, 0, 1, 1, 0, 1, 0, 0, 1, 1, 0, 1],
    [1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 1, 1, 1, 1, 0, 0, 1, 0, 0, 1],
    [1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 0, 1, 0, 0, 1, 0, 0, 1],
    [1, 0, 0, 1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 1, 0, 0, 1],
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
];

/// Errors that stop the server from starting
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("{what} spawn tile ({x}, {y}) is not a walkable tile on the map")]
    BadSpawn { what: String, x: i32, y: i32 },
    #[error("duplicate monster id prefix '{0}'")]
    DuplicatePrefix(String),
    #[error("{first} and {second} share the spawn tile ({x}, {y})")]
    SharedSpawn { first: String, second: String, x: i32, y: i32 },
}

/// Player rules
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub spawn_point: TilePos,
    /// Milliseconds per tile step
    pub speed_ms: u64,
    pub max_health: u32,
    pub attack_damage: u32,
    /// Tiles; 1.5 reaches diagonal neighbours
    pub attack_range: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            spawn_point: TilePos::new(2, 2),
            speed_ms: 180,
            max_health: 100,
            attack_damage: 10,
            attack_range: 1.5,
        }
    }
}

/// One configured monster. Each type is seeded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct MonsterType {
    /// Monster ids are `<prefix>_<index>`
    pub id_prefix: String,
    pub name: String,
    pub speed_ms: u64,
    pub color: String,
    /// Tiles
    pub detection_range: f32,
    #[serde(default = "default_monster_health")]
    pub health: u32,
    #[serde(default = "default_monster_damage")]
    pub damage: u32,
    #[serde(default = "default_monster_experience")]
    pub experience: u64,
    #[serde(default = "default_attack_cooldown")]
    pub attack_cooldown_ms: u64,
    #[serde(default = "default_attack_range")]
    pub attack_range: f32,
    pub spawn_point: TilePos,
}

fn default_monster_health() -> u32 {
    100
}

fn default_monster_damage() -> u32 {
    5
}

fn default_monster_experience() -> u64 {
    10
}

fn default_attack_cooldown() -> u64 {
    2000
}

fn default_attack_range() -> f32 {
    1.5
}

/// Top-level server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Row-major tile flags
    pub map: Vec<Vec<u8>>,
    pub player: PlayerConfig,
    pub monster_types: Vec<MonsterType>,
    pub monster_respawn_delay_ms: u64,
    /// Patrol targets are picked within this many tiles of the spawn anchor
    pub patrol_radius: i32,
    /// Upper bound on A* node expansions per request
    pub path_search_limit: usize,
    pub tick_interval_ms: u64,
    pub client_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            map: SAMPLE_MAP.iter().map(|row| row.to_vec()).collect(),
            player: PlayerConfig::default(),
            monster_types: vec![
                MonsterType {
                    id_prefix: "orc".to_string(),
                    name: "Orc".to_string(),
                    speed_ms: 300,
                    color: "0x228B22".to_string(),
                    detection_range: 5.0,
                    health: 70,
                    damage: 8,
                    experience: 25,
                    attack_cooldown_ms: 2200,
                    attack_range: 1.5,
                    spawn_point: TilePos::new(15, 4),
                },
                MonsterType {
                    id_prefix: "cyclops".to_string(),
                    name: "Cyclops".to_string(),
                    speed_ms: 350,
                    color: "0xff4500".to_string(),
                    detection_range: 4.0,
                    health: 150,
                    damage: 15,
                    experience: 70,
                    attack_cooldown_ms: 2800,
                    attack_range: 1.5,
                    spawn_point: TilePos::new(17, 9),
                },
            ],
            monster_respawn_delay_ms: 20_000,
            patrol_radius: 2,
            path_search_limit: 4_000,
            tick_interval_ms: TICK_INTERVAL_MS,
            client_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ServerConfig = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Check the map and every spawn point, returning the validated grid
    pub fn validate(&self) -> Result<GridMap, ConfigError> {
        let grid = GridMap::from_rows(&self.map)?;

        let spawn = self.player.spawn_point;
        if !grid.is_walkable(spawn) {
            return Err(ConfigError::BadSpawn {
                what: "player".to_string(),
                x: spawn.x,
                y: spawn.y,
            });
        }

        let mut prefixes = HashSet::new();
        let mut anchors: HashMap<TilePos, &str> = HashMap::new();
        for monster in &self.monster_types {
            if !prefixes.insert(monster.id_prefix.as_str()) {
                return Err(ConfigError::DuplicatePrefix(monster.id_prefix.clone()));
            }
            let spawn = monster.spawn_point;
            if !grid.is_walkable(spawn) {
                return Err(ConfigError::BadSpawn {
                    what: monster.name.clone(),
                    x: spawn.x,
                    y: spawn.y,
                });
            }
            // Monsters are seeded on their anchors, so two anchors on one tile stack them
            if let Some(first) = anchors.insert(spawn, monster.id_prefix.as_str()) {
                return Err(ConfigError::SharedSpawn {
                    first: first.to_string(),
                    second: monster.id_prefix.clone(),
                    x: spawn.x,
                    y: spawn.y,
                });
            }
        }

        Ok(grid)
    }
}
