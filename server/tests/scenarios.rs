//! End-to-end world scenarios driven through the public API with explicit
//! timestamps.

use gridrealm_server::config::ServerConfig;
use gridrealm_server::entities::MonsterState;
use gridrealm_server::world::{GameWorld, Outgoing, Recipient};
use gridrealm_shared::{ServerMessage, TilePos};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

fn world(seed: u64) -> GameWorld {
    GameWorld::with_rng(ServerConfig::default(), StdRng::seed_from_u64(seed)).unwrap()
}

fn join_at(world: &mut GameWorld, tile: TilePos) -> String {
    let (id, _) = world.connect_player().unwrap();
    world.get_player_mut(&id).unwrap().entity.tile = tile;
    id
}

fn damaged(out: &[Outgoing], id: &str) -> bool {
    out.iter()
        .any(|o| matches!(&o.message, ServerMessage::EntityDamaged { id: hit, .. } if hit == id))
}

/// No two living entities share a tile and nobody stands in a wall
fn assert_world_consistent(world: &GameWorld) {
    let mut seen = HashSet::new();
    let living = world
        .players()
        .map(|p| &p.entity)
        .chain(world.monsters().map(|m| &m.entity))
        .filter(|e| e.is_alive());
    for entity in living {
        assert!(world.grid().is_walkable(entity.tile), "{} is in a wall", entity.id);
        assert!(seen.insert(entity.tile), "two entities on {:?}", entity.tile);
        assert!(entity.health <= entity.max_health);
    }
}

#[test]
fn orc_chases_and_attacks_nearby_player() {
    let mut world = world(1);
    let id = join_at(&mut world, TilePos::new(11, 5));

    world.tick(1_000);
    let orc = world.get_monster("orc_1").unwrap();
    assert_eq!(orc.state, MonsterState::Chasing);
    assert_eq!(orc.target_id.as_deref(), Some(id.as_str()));

    let mut now = 1_200;
    let mut hit = false;
    for _ in 0..40 {
        let out = world.tick(now);
        assert_world_consistent(&world);
        if damaged(&out, &id) {
            hit = true;
            break;
        }
        now += 200;
    }

    assert!(hit, "orc never reached the player");
    let orc = world.get_monster("orc_1").unwrap();
    assert_eq!(orc.state, MonsterState::Chasing);
    assert!(orc.entity.tile.distance_to(TilePos::new(11, 5)) <= 1.5);
    assert_eq!(world.get_player(&id).unwrap().entity.health, 92);
}

#[test]
fn killing_the_orc_and_its_respawn() {
    let mut world = world(2);
    let id = join_at(&mut world, TilePos::new(14, 4));
    world.request_target(&id, "orc_1");

    let mut out = Vec::new();
    for hit in 0..7u64 {
        out = world.request_attack(&id, 1_000 + hit * 100);
    }
    assert!(out.contains(&Outgoing::broadcast(ServerMessage::EntityDied { id: "orc_1".into() })));
    assert!(out.contains(&Outgoing::to_player(&id, ServerMessage::UpdateTarget { target_id: None })));

    let player = world.get_player(&id).unwrap();
    assert_eq!(player.experience, 25);
    assert!(player.target_id.is_none());

    // Respawn is due 20 s after the killing blow at 1600
    let early = world.tick(21_599);
    assert!(!early
        .iter()
        .any(|o| matches!(o.message, ServerMessage::EntityRespawned { .. })));
    assert!(!world.get_monster("orc_1").unwrap().is_alive());

    let out = world.tick(21_600);
    let respawned = out.iter().find_map(|o| match &o.message {
        ServerMessage::EntityRespawned { entity } => Some(entity.clone()),
        _ => None,
    });
    let snapshot = respawned.expect("orc did not respawn");
    assert_eq!(snapshot.id, "orc_1");
    assert_eq!(snapshot.health, 70);
    assert_eq!(snapshot.tile(), TilePos::new(15, 4));
    assert!(snapshot.is_monster);
}

#[test]
fn direct_moves_respect_speed() {
    let mut world = world(3);
    let id = join_at(&mut world, TilePos::new(5, 9));

    let accepted = world.request_move(&id, "right", 5_000);
    assert!(matches!(accepted[0].message, ServerMessage::EntityMoved { path_complete: None, .. }));

    let rejected = world.request_move(&id, "right", 5_050);
    assert_eq!(rejected, vec![Outgoing::to_player(&id, ServerMessage::MoveRejected)]);
    assert_eq!(world.get_player(&id).unwrap().entity.tile, TilePos::new(6, 9));
}

#[test]
fn pointless_path_requests_store_nothing() {
    let mut world = world(4);
    let id = join_at(&mut world, TilePos::new(2, 2));

    assert!(!world.request_path(&id, TilePos::new(2, 2)));
    assert!(!world.request_path(&id, TilePos::new(3, 3)));
    assert!(!world.get_player(&id).unwrap().entity.has_path());
}

#[test]
fn click_to_move_walks_one_tile_per_tick() {
    let mut world = world(5);
    let id = join_at(&mut world, TilePos::new(1, 10));
    assert!(world.request_path(&id, TilePos::new(5, 10)));

    let mut now = 1_000;
    let mut steps = Vec::new();
    for _ in 0..10 {
        for o in world.tick(now) {
            if let ServerMessage::EntityMoved { entity, path_complete } = o.message {
                if entity.id == id {
                    steps.push((entity.tile(), path_complete));
                }
            }
        }
        now += 200;
    }

    assert_eq!(steps.len(), 4);
    assert_eq!(steps.last(), Some(&(TilePos::new(5, 10), Some(true))));
    assert!(steps[..3].iter().all(|(_, complete)| *complete == Some(false)));
}

#[test]
fn disconnect_mid_path_frees_the_tile() {
    let mut world = world(6);
    let id = join_at(&mut world, TilePos::new(1, 10));
    assert!(world.request_path(&id, TilePos::new(8, 10)));
    world.tick(1_000);

    let out = world.disconnect_player(&id);
    assert_eq!(out[0].recipient, Recipient::All);
    assert!(world.get_player(&id).is_none());
    assert!(!world.is_tile_blocked(TilePos::new(2, 10)));

    let out = world.tick(1_200);
    assert!(!out.iter().any(|o| matches!(
        &o.message,
        ServerMessage::EntityMoved { entity, .. } if entity.id == id
    )));
}

#[test]
fn respawn_only_after_death() {
    let mut world = world(7);
    let id = join_at(&mut world, TilePos::new(9, 10));
    assert!(world.request_respawn(&id).is_empty());

    world.get_player_mut(&id).unwrap().entity.take_damage(500);
    assert_eq!(world.get_player(&id).unwrap().entity.health, 0);
    assert_eq!(world.request_move(&id, "up", 1_000), vec![Outgoing::to_player(&id, ServerMessage::MoveRejected)]);

    let out = world.request_respawn(&id);
    assert_eq!(out.len(), 1);
    let player = world.get_player(&id).unwrap();
    assert_eq!(player.entity.health, 100);
    assert_eq!(player.entity.tile, TilePos::new(2, 2));
}

#[test]
fn busy_world_stays_consistent() {
    let mut world = world(8);
    let a = join_at(&mut world, TilePos::new(12, 5));
    let b = join_at(&mut world, TilePos::new(15, 9));
    let c = join_at(&mut world, TilePos::new(3, 10));

    let goals = [TilePos::new(18, 1), TilePos::new(1, 1), TilePos::new(10, 10), TilePos::new(17, 7)];
    let mut now = 1_000;
    for round in 0..300usize {
        for (i, id) in [&a, &b, &c].into_iter().enumerate() {
            let player = world.get_player(id).unwrap();
            if !player.is_alive() {
                world.request_respawn(id);
            } else if !player.entity.has_path() {
                world.request_path(id, goals[(round + i) % goals.len()]);
            }
        }
        world.tick(now);
        assert_world_consistent(&world);
        now += 200;
    }
}
