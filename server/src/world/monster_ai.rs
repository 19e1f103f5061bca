//! Monster behaviour: patrol around the spawn anchor, chase and attack the
//! nearest player in detection range, walk home when they get away.
//!
//! A monster that is dead or still walking a path makes no decision that tick.

use gridrealm_shared::{ServerMessage, TilePos};
use log::{debug, info, warn};
use rand::Rng;

use super::{GameWorld, Outgoing, WorldError};
use crate::entities::MonsterState;
use crate::navigation::PathRequest;

impl GameWorld {
    /// Run one decision for every monster
    pub(crate) fn update_monster_ai(&mut self, now: u64, out: &mut Vec<Outgoing>) {
        let ids: Vec<String> = self.monsters.keys().cloned().collect();
        for id in ids {
            if let Err(e) = self.think(&id, now, out) {
                warn!("AI skipped for {}: {}", id, e);
            }
        }
    }

    /// Closest living player to `from` and their distance in tiles
    fn closest_alive_player(&self, from: TilePos) -> Option<(String, f32)> {
        self.players
            .values()
            .filter(|p| p.is_alive())
            .map(|p| (p.entity.id.clone(), from.distance_to(p.entity.tile)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    fn think(&mut self, id: &str, now: u64, out: &mut Vec<Outgoing>) -> Result<(), WorldError> {
        let monster = self.monsters.get(id).ok_or_else(|| WorldError::UnknownEntity(id.to_string()))?;
        if !monster.is_alive() || monster.entity.has_path() {
            return Ok(());
        }

        let Some((closest, distance)) = self.closest_alive_player(monster.entity.tile) else {
            return Ok(());
        };

        let monster = self.monsters.get_mut(id).ok_or_else(|| WorldError::UnknownEntity(id.to_string()))?;
        let in_range = distance <= monster.detection_range;

        if monster.state == MonsterState::Chasing && !in_range {
            monster.set_state(MonsterState::Returning);
            monster.target_id = None;
        }
        if in_range {
            monster.set_state(MonsterState::Chasing);
            monster.target_id = Some(closest);
        }

        let state = monster.state;
        match state {
            MonsterState::Patrolling => self.patrol(id),
            MonsterState::Chasing => self.chase(id, now, out),
            MonsterState::Returning => self.return_to_spawn(id),
        }
        Ok(())
    }

    /// Wander to a random tile near the spawn anchor. Failures are ignored;
    /// next tick picks another tile.
    fn patrol(&mut self, id: &str) {
        let Some(monster) = self.monsters.get(id) else {
            return;
        };
        let radius = self.config.patrol_radius.max(0);
        let from = monster.entity.tile;
        let anchor = monster.spawn_point;

        let dx = self.rng.gen_range(-radius..=radius);
        let dy = self.rng.gen_range(-radius..=radius);
        let goal = self.grid.clamp(anchor.offset(dx, dy));

        if let Some(path) = self.pathfinder.find_path(&PathRequest::new(from, goal)) {
            if path.len() > 1 {
                if let Some(monster) = self.monsters.get_mut(id) {
                    monster.entity.set_path(path.into_iter().skip(1));
                }
            }
        }
    }

    fn chase(&mut self, id: &str, now: u64, out: &mut Vec<Outgoing>) {
        let Some(monster) = self.monsters.get(id) else {
            return;
        };
        let Some(target_id) = monster.target_id.clone() else {
            return;
        };
        let Some(target) = self.players.get(&target_id).filter(|p| p.is_alive()) else {
            return;
        };

        let from = monster.entity.tile;
        let target_tile = target.entity.tile;
        let distance = from.distance_to(target_tile);

        if distance <= monster.attack_range {
            if !monster.attack_ready(now) {
                return;
            }
            let damage = monster.damage;

            let Some(player) = self.players.get_mut(&target_id) else {
                return;
            };
            player.entity.take_damage(damage);
            let health = player.entity.health;
            let killed = !player.is_alive();
            out.push(Outgoing::broadcast(ServerMessage::EntityDamaged {
                id: target_id.clone(),
                health,
                damage,
            }));

            if let Some(monster) = self.monsters.get_mut(id) {
                monster.mark_attacked(now);
                if killed {
                    info!("{} killed {}", id, target_id);
                    monster.set_state(MonsterState::Returning);
                    monster.target_id = None;
                }
            }
            if killed {
                out.push(Outgoing::broadcast(ServerMessage::EntityDied { id: target_id }));
            }
            return;
        }

        // Stop next to the target instead of walking onto it
        let obstacles = self.occupied_tiles_except(&[id, target_id.as_str()]);
        let request = PathRequest::new(from, target_tile).avoiding(obstacles);
        match self.pathfinder.find_path(&request) {
            Some(mut path) if path.len() > 1 => {
                path.pop();
                path.remove(0);
                if !path.is_empty() {
                    if let Some(monster) = self.monsters.get_mut(id) {
                        monster.entity.set_path(path);
                    }
                }
            }
            _ => debug!("{} has no route to {}", id, target_id),
        }
    }

    fn return_to_spawn(&mut self, id: &str) {
        let Some(monster) = self.monsters.get(id) else {
            return;
        };
        let request = PathRequest::new(monster.entity.tile, monster.spawn_point);

        match self.pathfinder.find_path(&request) {
            Some(path) if path.len() > 1 => {
                if let Some(monster) = self.monsters.get_mut(id) {
                    monster.entity.set_path(path.into_iter().skip(1));
                }
            }
            Some(_) => {
                if let Some(monster) = self.monsters.get_mut(id) {
                    monster.set_state(MonsterState::Patrolling);
                }
            }
            None => debug!("{} cannot find its way home", id),
        }
    }
}
