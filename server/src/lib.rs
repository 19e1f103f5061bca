//! Gridrealm server library.
//!
//! An authoritative tile-grid game server: clients send intents, the world
//! validates them against walls, occupancy, health and cooldowns, runs the
//! monster AI and walks queued paths on a fixed tick, and broadcasts the
//! results over UDP.

pub mod config;
pub mod entities;
pub mod navigation;
pub mod network;
pub mod world;
