//! Server-side player entity.

use gridrealm_shared::{EntitySnapshot, TilePos};
use log::info;

use crate::config::PlayerConfig;
use crate::entities::Entity;

/// Experience needed to leave `level` is `level * EXPERIENCE_PER_LEVEL`
pub const EXPERIENCE_PER_LEVEL: u64 = 100;

/// Server-side player state
#[derive(Debug, Clone)]
pub struct ServerPlayer {
    pub entity: Entity,
    /// Entity being aimed at
    pub target_id: Option<String>,
    pub experience: u64,
    pub level: u32,
}

impl ServerPlayer {
    pub fn new(id: String, tile: TilePos, color: String, rules: &PlayerConfig) -> Self {
        let short: String = id.chars().take(4).collect();
        let name = format!("Player-{}", short);
        Self {
            entity: Entity::new(id, name, tile, rules.speed_ms, rules.max_health, color),
            target_id: None,
            experience: 0,
            level: 1,
        }
    }

    pub fn id(&self) -> &str {
        &self.entity.id
    }

    pub fn is_alive(&self) -> bool {
        self.entity.is_alive()
    }

    /// Add experience, levelling up as thresholds are crossed.
    /// Returns the number of levels gained.
    pub fn gain_experience(&mut self, amount: u64) -> u32 {
        self.experience += amount;
        info!("{} gained {} XP (total {})", self.entity.id, amount, self.experience);

        let mut gained = 0;
        while self.experience >= u64::from(self.level) * EXPERIENCE_PER_LEVEL {
            self.level += 1;
            gained += 1;
            info!("{} reached level {}", self.entity.id, self.level);
        }
        gained
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        self.entity.snapshot(Some(self.entity.id.clone()), false)
    }
}
