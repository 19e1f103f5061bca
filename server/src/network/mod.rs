//! Network gateway: UDP transport between clients and the game world.

mod server;

pub use server::{ClientConnection, Server};
