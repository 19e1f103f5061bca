//! Server-side monster entity.
//!
//! Monsters are seeded once at startup and never removed. Death parks them
//! until `respawn_at`, when they come back at their spawn anchor.

use gridrealm_shared::{EntitySnapshot, TilePos};
use log::debug;

use crate::config::MonsterType;
use crate::entities::Entity;

/// Behaviour state of the monster AI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonsterState {
    /// Wandering around the spawn anchor
    Patrolling,
    /// Following and attacking a player
    Chasing,
    /// Walking back to the spawn anchor
    Returning,
}

/// Server-side monster state
#[derive(Debug, Clone)]
pub struct ServerMonster {
    pub entity: Entity,
    pub state: MonsterState,
    pub spawn_point: TilePos,
    /// Tiles
    pub detection_range: f32,
    /// Tiles
    pub attack_range: f32,
    /// Milliseconds between attacks
    pub attack_cooldown: u64,
    pub last_attack_time: Option<u64>,
    pub damage: u32,
    /// Experience awarded to the killer
    pub experience: u64,
    pub target_id: Option<String>,
    /// Set while dead
    pub respawn_at: Option<u64>,
}

impl ServerMonster {
    pub fn new(id: String, monster_type: &MonsterType) -> Self {
        Self {
            entity: Entity::new(
                id,
                monster_type.name.clone(),
                monster_type.spawn_point,
                monster_type.speed_ms,
                monster_type.health,
                monster_type.color.clone(),
            ),
            state: MonsterState::Patrolling,
            spawn_point: monster_type.spawn_point,
            detection_range: monster_type.detection_range,
            attack_range: monster_type.attack_range,
            attack_cooldown: monster_type.attack_cooldown_ms,
            last_attack_time: None,
            damage: monster_type.damage,
            experience: monster_type.experience,
            target_id: None,
            respawn_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.entity.id
    }

    pub fn is_alive(&self) -> bool {
        self.entity.is_alive()
    }

    pub fn set_state(&mut self, state: MonsterState) {
        if self.state != state {
            debug!("{} {:?} -> {:?}", self.entity.id, self.state, state);
            self.state = state;
        }
    }

    /// True once strictly more than `attack_cooldown` ms have passed since the last attack
    pub fn attack_ready(&self, now: u64) -> bool {
        match self.last_attack_time {
            Some(last) => now > last.saturating_add(self.attack_cooldown),
            None => true,
        }
    }

    pub fn mark_attacked(&mut self, now: u64) {
        self.last_attack_time = Some(now);
    }

    pub fn schedule_respawn(&mut self, due: u64) {
        self.respawn_at = Some(due);
    }

    /// Bring the monster back on `tile` if it is dead and its respawn is due.
    /// `tile` is normally the spawn anchor; the patrol area stays anchored there
    /// either way.
    ///
    /// A live monster only has its stale schedule dropped, so firing twice is harmless.
    pub fn try_respawn(&mut self, now: u64, tile: TilePos) -> bool {
        if self.is_alive() {
            self.respawn_at = None;
            return false;
        }
        match self.respawn_at {
            Some(due) if now >= due => {
                self.entity.respawn(tile);
                self.state = MonsterState::Patrolling;
                self.target_id = None;
                self.last_attack_time = None;
                self.respawn_at = None;
                true
            }
            _ => false,
        }
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        self.entity.snapshot(None, true)
    }
}
