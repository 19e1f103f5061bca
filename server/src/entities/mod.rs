//! Server-side entity definitions.

mod entity;
mod player;
mod monster;

pub use entity::Entity;
pub use player::{ServerPlayer, EXPERIENCE_PER_LEVEL};
pub use monster::{ServerMonster, MonsterState};

/// Identifies an entity together with its kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActorId {
    Player(String),
    Monster(String),
}

impl ActorId {
    pub fn as_str(&self) -> &str {
        match self {
            ActorId::Player(id) | ActorId::Monster(id) => id,
        }
    }
}
