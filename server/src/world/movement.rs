//! Path execution: one step per entity per eligible tick.

use gridrealm_shared::ServerMessage;
use log::{debug, trace, warn};

use super::{GameWorld, Outgoing, WorldError};
use crate::entities::{ActorId, MonsterState};

impl GameWorld {
    /// Advance every living entity with a queued path by at most one tile
    pub(crate) fn execute_movement(&mut self, now: u64, out: &mut Vec<Outgoing>) {
        let movers: Vec<ActorId> = self
            .players
            .values()
            .filter(|p| p.is_alive() && p.entity.has_path())
            .map(|p| ActorId::Player(p.entity.id.clone()))
            .chain(
                self.monsters
                    .values()
                    .filter(|m| m.is_alive() && m.entity.has_path())
                    .map(|m| ActorId::Monster(m.entity.id.clone())),
            )
            .collect();

        for actor in movers {
            if let Err(e) = self.advance_along_path(&actor, now, out) {
                warn!("Movement skipped for {}: {}", actor.as_str(), e);
            }
        }
    }

    fn advance_along_path(&mut self, actor: &ActorId, now: u64, out: &mut Vec<Outgoing>) -> Result<(), WorldError> {
        let unknown = || WorldError::UnknownEntity(actor.as_str().to_string());

        let entity = self.entity(actor).ok_or_else(unknown)?;
        if !entity.is_alive() || !entity.can_move(now) {
            return Ok(());
        }
        let Some(&next) = entity.move_path.front() else {
            return Ok(());
        };

        if self.is_tile_blocked(next) {
            debug!("{} path blocked at ({}, {})", actor.as_str(), next.x, next.y);
            self.entity_mut(actor).ok_or_else(unknown)?.clear_path();
            if let ActorId::Monster(id) = actor {
                if let Some(monster) = self.monsters.get_mut(id) {
                    monster.set_state(MonsterState::Patrolling);
                }
            }
            return Ok(());
        }

        let entity = self.entity_mut(actor).ok_or_else(unknown)?;
        entity.move_path.pop_front();
        entity.step_to(next, now);
        let path_complete = entity.move_path.is_empty();
        trace!("{} stepped to ({}, {})", actor.as_str(), next.x, next.y);

        if path_complete {
            if let ActorId::Monster(id) = actor {
                if let Some(monster) = self.monsters.get_mut(id) {
                    if monster.state == MonsterState::Returning {
                        monster.set_state(MonsterState::Patrolling);
                    }
                }
            }
        }

        let snapshot = self.snapshot_of(actor).ok_or_else(unknown)?;
        out.push(Outgoing::broadcast(ServerMessage::EntityMoved {
            entity: snapshot,
            path_complete: Some(path_complete),
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use gridrealm_shared::TilePos;

    fn moved(out: &[Outgoing]) -> Vec<(TilePos, Option<bool>)> {
        out.iter()
            .filter_map(|o| match &o.message {
                ServerMessage::EntityMoved { entity, path_complete } => Some((entity.tile(), *path_complete)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_one_step_per_tick_and_completion_flag() {
        let mut world = empty_world();
        let id = player_at(&mut world, TilePos::new(1, 1));
        world
            .get_player_mut(&id)
            .unwrap()
            .entity
            .set_path([TilePos::new(2, 1), TilePos::new(3, 1)]);

        let out = world.tick(1_000);
        assert_eq!(moved(&out), vec![(TilePos::new(2, 1), Some(false))]);
        assert_eq!(world.get_player(&id).unwrap().entity.move_path.len(), 1);

        let out = world.tick(1_200);
        assert_eq!(moved(&out), vec![(TilePos::new(3, 1), Some(true))]);
        assert!(!world.get_player(&id).unwrap().entity.has_path());

        assert!(moved(&world.tick(1_400)).is_empty());
    }

    #[test]
    fn test_speed_gates_steps() {
        let mut world = empty_world();
        let id = player_at(&mut world, TilePos::new(1, 1));
        world
            .get_player_mut(&id)
            .unwrap()
            .entity
            .set_path([TilePos::new(2, 1), TilePos::new(3, 1)]);

        assert_eq!(moved(&world.tick(1_000)).len(), 1);
        // 180 ms per tile
        assert!(moved(&world.tick(1_100)).is_empty());
        assert_eq!(moved(&world.tick(1_180)).len(), 1);
    }

    #[test]
    fn test_blocked_step_clears_path() {
        let mut world = empty_world();
        let walker = player_at(&mut world, TilePos::new(1, 1));
        let _blocker = player_at(&mut world, TilePos::new(2, 1));
        world
            .get_player_mut(&walker)
            .unwrap()
            .entity
            .set_path([TilePos::new(2, 1), TilePos::new(3, 1)]);

        let out = world.tick(1_000);
        assert!(moved(&out).is_empty());
        let walker = world.get_player(&walker).unwrap();
        assert_eq!(walker.entity.tile, TilePos::new(1, 1));
        assert!(!walker.entity.has_path());
    }

    #[test]
    fn test_blocked_monster_falls_back_to_patrol() {
        let mut world = world();
        let _blocker = player_at(&mut world, TilePos::new(14, 4));
        {
            let orc = world.get_monster_mut("orc_1").unwrap();
            orc.set_state(MonsterState::Returning);
            orc.entity.set_path([TilePos::new(14, 4)]);
        }

        world.execute_movement(1_000, &mut Vec::new());
        let orc = world.get_monster("orc_1").unwrap();
        assert_eq!(orc.state, MonsterState::Patrolling);
        assert!(!orc.entity.has_path());
    }

    #[test]
    fn test_returning_monster_patrols_on_arrival() {
        let mut world = world();
        {
            let orc = world.get_monster_mut("orc_1").unwrap();
            orc.entity.tile = TilePos::new(15, 5);
            orc.set_state(MonsterState::Returning);
            orc.entity.set_path([TilePos::new(15, 4)]);
        }

        let mut out = Vec::new();
        world.execute_movement(1_000, &mut out);
        assert_eq!(moved(&out), vec![(TilePos::new(15, 4), Some(true))]);
        assert_eq!(world.get_monster("orc_1").unwrap().state, MonsterState::Patrolling);
    }

    #[test]
    fn test_dead_entities_do_not_walk() {
        let mut world = empty_world();
        let id = player_at(&mut world, TilePos::new(1, 1));
        {
            let player = world.get_player_mut(&id).unwrap();
            player.entity.set_path([TilePos::new(2, 1)]);
            player.entity.take_damage(1_000);
        }

        assert!(moved(&world.tick(1_000)).is_empty());
        assert_eq!(world.get_player(&id).unwrap().entity.tile, TilePos::new(1, 1));
    }
}
