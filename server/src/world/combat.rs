//! Targeting, player attacks, deaths and respawns.

use gridrealm_shared::{ServerMessage, TilePos};
use log::{debug, info, warn};

use super::{GameWorld, Outgoing};

/// How long a due monster waits for its anchor before taking the nearest free tile
const ANCHOR_GRACE_MS: u64 = 5_000;

impl GameWorld {
    /// Aim at a living player or monster. Only the requester is told.
    pub fn request_target(&mut self, player_id: &str, target_id: &str) -> Vec<Outgoing> {
        let target_alive = self
            .monsters
            .get(target_id)
            .map(|m| m.is_alive())
            .or_else(|| self.players.get(target_id).map(|p| p.is_alive()))
            .unwrap_or(false);
        if !target_alive {
            debug!("{} cannot target {}", player_id, target_id);
            return Vec::new();
        }

        let Some(player) = self.players.get_mut(player_id) else {
            return Vec::new();
        };
        player.target_id = Some(target_id.to_string());
        vec![Outgoing::to_player(
            player_id,
            ServerMessage::UpdateTarget { target_id: Some(target_id.to_string()) },
        )]
    }

    /// Hit the current target if it is a living monster within reach.
    ///
    /// A kill awards experience, clears the attacker's target and schedules
    /// the monster's respawn.
    pub fn request_attack(&mut self, player_id: &str, now: u64) -> Vec<Outgoing> {
        let mut out = Vec::new();
        let Some(player) = self.players.get(player_id) else {
            return out;
        };
        if !player.is_alive() {
            return out;
        }
        let Some(target_id) = player.target_id.clone() else {
            return out;
        };
        let from = player.entity.tile;

        // Only monsters can be hit; a dead or missing target is forgotten
        let Some(monster) = self.monsters.get_mut(&target_id).filter(|m| m.is_alive()) else {
            if let Some(player) = self.players.get_mut(player_id) {
                player.target_id = None;
            }
            out.push(Outgoing::to_player(player_id, ServerMessage::UpdateTarget { target_id: None }));
            return out;
        };

        if from.distance_to(monster.entity.tile) > self.config.player.attack_range {
            debug!("{} is out of reach of {}", player_id, target_id);
            return out;
        }

        let damage = self.config.player.attack_damage;
        monster.entity.take_damage(damage);
        out.push(Outgoing::broadcast(ServerMessage::EntityDamaged {
            id: target_id.clone(),
            health: monster.entity.health,
            damage,
        }));

        if monster.is_alive() {
            return out;
        }

        monster.entity.clear_path();
        monster.target_id = None;
        monster.schedule_respawn(now.saturating_add(self.config.monster_respawn_delay_ms));
        let experience = monster.experience;
        out.push(Outgoing::broadcast(ServerMessage::EntityDied { id: target_id.clone() }));

        if let Some(player) = self.players.get_mut(player_id) {
            info!("{} killed {} and earned {} XP", player_id, target_id, experience);
            player.gain_experience(experience);
            if player.target_id.as_deref() == Some(target_id.as_str()) {
                player.target_id = None;
                out.push(Outgoing::to_player(player_id, ServerMessage::UpdateTarget { target_id: None }));
            }
        }
        out
    }

    /// Bring a dead player back at the spawn tile. Ignored while alive.
    pub fn request_respawn(&mut self, player_id: &str) -> Vec<Outgoing> {
        match self.players.get(player_id) {
            Some(player) if !player.is_alive() => {}
            Some(_) => {
                debug!("{} asked to respawn while alive", player_id);
                return Vec::new();
            }
            None => return Vec::new(),
        }

        let Some(tile) = self.find_spawn_tile(self.config.player.spawn_point) else {
            warn!("{} cannot respawn: no free tile", player_id);
            return Vec::new();
        };
        let Some(player) = self.players.get_mut(player_id) else {
            return Vec::new();
        };
        player.entity.respawn(tile);
        info!("{} respawned at ({}, {})", player_id, tile.x, tile.y);
        vec![Outgoing::broadcast(ServerMessage::EntityRespawned { entity: player.snapshot() })]
    }

    /// Restore every dead monster whose respawn time has come.
    ///
    /// A monster whose anchor is occupied waits; once `ANCHOR_GRACE_MS` has
    /// passed it comes back on the nearest free tile instead.
    pub(crate) fn process_respawns(&mut self, now: u64, out: &mut Vec<Outgoing>) {
        let due: Vec<(String, TilePos, u64)> = self
            .monsters
            .values()
            .filter(|m| !m.is_alive())
            .filter_map(|m| m.respawn_at.filter(|at| now >= *at).map(|at| (m.id().to_string(), m.spawn_point, at)))
            .collect();

        for (id, anchor, due_at) in due {
            let tile = if !self.is_tile_blocked(anchor) {
                anchor
            } else if now >= due_at.saturating_add(ANCHOR_GRACE_MS) {
                match self.free_tile_near(anchor) {
                    Some(tile) => tile,
                    None => {
                        warn!("No free tile for {} to respawn on", id);
                        continue;
                    }
                }
            } else {
                debug!("{} waits for its spawn tile to clear", id);
                continue;
            };

            if let Some(monster) = self.monsters.get_mut(&id) {
                if monster.try_respawn(now, tile) {
                    info!("{} respawned at ({}, {})", id, tile.x, tile.y);
                    out.push(Outgoing::broadcast(ServerMessage::EntityRespawned { entity: monster.snapshot() }));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::ServerConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_target_living_entities_only() {
        let mut world = world();
        let id = player_at(&mut world, TilePos::new(2, 2));

        assert_eq!(
            world.request_target(&id, "orc_1"),
            vec![Outgoing::to_player(&id, ServerMessage::UpdateTarget { target_id: Some("orc_1".into()) })]
        );
        assert_eq!(world.get_player(&id).unwrap().target_id.as_deref(), Some("orc_1"));

        assert!(world.request_target(&id, "nobody").is_empty());

        world.get_monster_mut("cyclops_2").unwrap().entity.take_damage(1_000);
        assert!(world.request_target(&id, "cyclops_2").is_empty());
        assert_eq!(world.get_player(&id).unwrap().target_id.as_deref(), Some("orc_1"));
    }

    #[test]
    fn test_attack_needs_reach() {
        let mut world = world();
        let id = player_at(&mut world, TilePos::new(12, 4));
        world.request_target(&id, "orc_1");

        assert!(world.request_attack(&id, 1_000).is_empty());
        assert_eq!(world.get_monster("orc_1").unwrap().entity.health, 70);

        world.get_player_mut(&id).unwrap().entity.tile = TilePos::new(14, 5);
        assert_eq!(
            world.request_attack(&id, 1_000),
            vec![Outgoing::broadcast(ServerMessage::EntityDamaged { id: "orc_1".into(), health: 60, damage: 10 })]
        );
    }

    #[test]
    fn test_attack_without_target_or_while_dead() {
        let mut world = world();
        let id = player_at(&mut world, TilePos::new(14, 4));
        assert!(world.request_attack(&id, 1_000).is_empty());

        world.request_target(&id, "orc_1");
        world.get_player_mut(&id).unwrap().entity.take_damage(1_000);
        assert!(world.request_attack(&id, 1_000).is_empty());
        assert_eq!(world.get_monster("orc_1").unwrap().entity.health, 70);
    }

    #[test]
    fn test_player_target_is_dropped_on_attack() {
        let mut world = world();
        let attacker = player_at(&mut world, TilePos::new(5, 5));
        let victim = player_at(&mut world, TilePos::new(5, 6));
        world.request_target(&attacker, &victim);

        assert_eq!(
            world.request_attack(&attacker, 1_000),
            vec![Outgoing::to_player(&attacker, ServerMessage::UpdateTarget { target_id: None })]
        );
        assert_eq!(world.get_player(&victim).unwrap().entity.health, 100);
        assert!(world.get_player(&attacker).unwrap().target_id.is_none());
    }

    #[test]
    fn test_kill_awards_experience_and_schedules_respawn() {
        let mut world = world();
        let id = player_at(&mut world, TilePos::new(14, 4));
        world.request_target(&id, "orc_1");
        world.get_monster_mut("orc_1").unwrap().entity.health = 10;

        let out = world.request_attack(&id, 5_000);
        assert_eq!(
            out,
            vec![
                Outgoing::broadcast(ServerMessage::EntityDamaged { id: "orc_1".into(), health: 0, damage: 10 }),
                Outgoing::broadcast(ServerMessage::EntityDied { id: "orc_1".into() }),
                Outgoing::to_player(&id, ServerMessage::UpdateTarget { target_id: None }),
            ]
        );

        let player = world.get_player(&id).unwrap();
        assert_eq!(player.experience, 25);
        assert!(player.target_id.is_none());
        assert_eq!(world.get_monster("orc_1").unwrap().respawn_at, Some(25_000));

        // The corpse cannot be targeted or hit again
        assert!(world.request_target(&id, "orc_1").is_empty());
    }

    #[test]
    fn test_player_respawn_only_when_dead() {
        let mut world = world();
        let id = player_at(&mut world, TilePos::new(9, 9));
        assert!(world.request_respawn(&id).is_empty());

        {
            let player = world.get_player_mut(&id).unwrap();
            player.entity.set_path([TilePos::new(10, 9)]);
            player.entity.take_damage(1_000);
        }
        let out = world.request_respawn(&id);
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0].message, ServerMessage::EntityRespawned { entity } if entity.tile() == TilePos::new(2, 2) && entity.health == 100));

        let player = world.get_player(&id).unwrap();
        assert!(player.is_alive());
        assert!(!player.entity.has_path());
        assert!(world.request_respawn(&id).is_empty());
    }

    #[test]
    fn test_monster_respawn_on_tick() {
        let mut world = world();
        {
            let orc = world.get_monster_mut("orc_1").unwrap();
            orc.entity.tile = TilePos::new(12, 9);
            orc.entity.take_damage(1_000);
            orc.schedule_respawn(20_000);
        }

        let mut out = Vec::new();
        world.process_respawns(19_999, &mut out);
        assert!(out.is_empty());

        world.process_respawns(20_000, &mut out);
        assert_eq!(out.len(), 1);
        let orc = world.get_monster("orc_1").unwrap();
        assert_eq!(orc.entity.tile, TilePos::new(15, 4));
        assert_eq!(orc.entity.health, 70);

        let mut out = Vec::new();
        world.process_respawns(40_000, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_monster_respawn_waits_for_free_anchor() {
        let mut world = world();
        {
            let orc = world.get_monster_mut("orc_1").unwrap();
            orc.entity.tile = TilePos::new(12, 9);
            orc.entity.take_damage(1_000);
            orc.schedule_respawn(20_000);
        }
        let camper = player_at(&mut world, TilePos::new(15, 4));

        let mut out = Vec::new();
        world.process_respawns(20_000, &mut out);
        assert!(out.is_empty());
        assert!(!world.get_monster("orc_1").unwrap().is_alive());

        world.get_player_mut(&camper).unwrap().entity.tile = TilePos::new(2, 9);
        world.process_respawns(20_200, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(world.get_monster("orc_1").unwrap().entity.tile, TilePos::new(15, 4));
    }
    #[test]
    fn test_camped_anchor_falls_back_to_nearest_free_tile() {
        let mut world = world();
        {
            let orc = world.get_monster_mut("orc_1").unwrap();
            orc.entity.take_damage(1_000);
            orc.schedule_respawn(20_000);
        }
        player_at(&mut world, TilePos::new(15, 4));

        let mut out = Vec::new();
        world.process_respawns(20_000 + ANCHOR_GRACE_MS - 1, &mut out);
        assert!(out.is_empty());

        world.process_respawns(20_000 + ANCHOR_GRACE_MS, &mut out);
        assert_eq!(out.len(), 1);
        let orc = world.get_monster("orc_1").unwrap();
        assert!(orc.is_alive());
        assert_eq!(orc.entity.tile, TilePos::new(14, 3));
        assert_eq!(orc.spawn_point, TilePos::new(15, 4));
    }

    #[test]
    fn test_huge_respawn_delay_never_fires() {
        let config = ServerConfig {
            monster_respawn_delay_ms: u64::MAX,
            ..ServerConfig::default()
        };
        let mut world = GameWorld::with_rng(config, StdRng::seed_from_u64(7)).unwrap();
        let id = player_at(&mut world, TilePos::new(14, 4));
        world.request_target(&id, "orc_1");

        let mut out = Vec::new();
        for hit in 0..7u64 {
            out = world.request_attack(&id, 1_000 + hit);
        }
        assert!(out.contains(&Outgoing::broadcast(ServerMessage::EntityDied { id: "orc_1".into() })));
        assert_eq!(world.get_monster("orc_1").unwrap().respawn_at, Some(u64::MAX));

        let mut out = Vec::new();
        world.process_respawns(u64::MAX - ANCHOR_GRACE_MS, &mut out);
        assert!(out.is_empty());
    }
}
