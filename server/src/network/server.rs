//! UDP Game Server implementation.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use tokio::net::UdpSocket;

use gridrealm_shared::{ClientMessage, ServerMessage, TilePos, PROTOCOL_VERSION};

use crate::world::{GameWorld, Outgoing, Recipient};

/// Maximum packet size
const MAX_PACKET_SIZE: usize = 65_507;

/// Client connection state
#[derive(Debug)]
pub struct ClientConnection {
    pub addr: SocketAddr,
    pub player_id: String,
    pub last_seen: Instant,
}

impl ClientConnection {
    pub fn new(addr: SocketAddr, player_id: String) -> Self {
        Self {
            addr,
            player_id,
            last_seen: Instant::now(),
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Game server: owns the socket and the address <-> player mapping.
/// The world is passed in by the caller and only touched from this task.
pub struct Server {
    socket: UdpSocket,
    clients: HashMap<SocketAddr, ClientConnection>,
    addr_by_player: HashMap<String, SocketAddr>,
    client_timeout: Duration,
    started: Instant,
}

impl Server {
    /// Bind the UDP socket on `addr`, e.g. "0.0.0.0:7777"
    pub async fn bind(addr: &str, client_timeout: Duration) -> Result<Self, std::io::Error> {
        let socket = UdpSocket::bind(addr).await?;
        info!("Listening on {}", socket.local_addr()?);

        Ok(Self {
            socket,
            clients: HashMap::new(),
            addr_by_player: HashMap::new(),
            client_timeout,
            started: Instant::now(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.socket.local_addr()
    }

    /// Milliseconds since the server started; the world's clock
    pub fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Main loop: drain packets, tick the world, sleep until the next tick.
    /// Never returns; socket errors are logged and the loop keeps serving.
    pub async fn run(&mut self, world: &mut GameWorld, tick_interval: Duration) {
        info!("Tick interval: {} ms", tick_interval.as_millis());
        let mut tick_count: u64 = 0;

        loop {
            let tick_start = Instant::now();

            self.process_incoming(world).await;

            let out = world.tick(self.now_ms());
            self.dispatch(out).await;

            self.check_timeouts(world).await;

            tick_count += 1;
            if tick_count % 300 == 0 {
                debug!("Tick {}: {} clients connected", tick_count, self.clients.len());
            }

            let elapsed = tick_start.elapsed();
            if elapsed < tick_interval {
                tokio::time::sleep(tick_interval - elapsed).await;
            }
        }
    }

    /// Process every packet waiting on the socket without blocking
    pub async fn process_incoming(&mut self, world: &mut GameWorld) {
        let mut buf = vec![0u8; MAX_PACKET_SIZE];

        loop {
            match self.socket.try_recv_from(&mut buf) {
                Ok((len, addr)) => {
                    self.handle_packet(&buf[..len], addr, world).await;
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    break;
                }
                // ICMP port unreachable from a vanished client surfaces here on some platforms
                Err(ref e) if e.kind() == std::io::ErrorKind::ConnectionReset => {
                    continue;
                }
                Err(e) => {
                    error!("Error receiving packet: {}", e);
                    break;
                }
            }
        }
    }

    /// Handle a received packet
    async fn handle_packet(&mut self, data: &[u8], addr: SocketAddr, world: &mut GameWorld) {
        let message = match ClientMessage::deserialize(data) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Failed to deserialize packet from {}: {}", addr, e);
                return;
            }
        };

        if let ClientMessage::Connect { protocol_version } = message {
            self.handle_connect(addr, protocol_version, world).await;
            return;
        }

        let Some(client) = self.clients.get_mut(&addr) else {
            warn!("Packet from unknown address {}, ignoring", addr);
            return;
        };
        client.last_seen = Instant::now();
        let player_id = client.player_id.clone();
        let now = self.now_ms();

        let out = match message {
            ClientMessage::Connect { .. } | ClientMessage::Heartbeat => Vec::new(),
            ClientMessage::Disconnect => {
                self.handle_disconnect(addr, world).await;
                return;
            }
            ClientMessage::RequestMove { direction } => world.request_move(&player_id, &direction, now),
            ClientMessage::RequestPath { x, y } => {
                world.request_path(&player_id, TilePos::new(x, y));
                Vec::new()
            }
            ClientMessage::RequestTarget { target_id } => world.request_target(&player_id, &target_id),
            ClientMessage::RequestAttack => world.request_attack(&player_id, now),
            ClientMessage::RequestRespawn => world.request_respawn(&player_id),
        };
        self.dispatch(out).await;
    }

    /// Join a new client: create the player and send the join burst
    async fn handle_connect(&mut self, addr: SocketAddr, protocol_version: u32, world: &mut GameWorld) {
        if protocol_version != PROTOCOL_VERSION {
            warn!(
                "Protocol version mismatch from {}. Server: {}, Client: {}",
                addr, PROTOCOL_VERSION, protocol_version
            );
            return;
        }

        if self.clients.contains_key(&addr) {
            warn!("Client {} already connected, ignoring", addr);
            return;
        }

        let (player_id, out) = match world.connect_player() {
            Ok(joined) => joined,
            Err(e) => {
                warn!("Refusing client {}: {}", addr, e);
                return;
            }
        };
        info!("Client {} connected as {}", addr, player_id);
        self.addr_by_player.insert(player_id.clone(), addr);
        self.clients.insert(addr, ClientConnection::new(addr, player_id));
        self.dispatch(out).await;
    }

    async fn handle_disconnect(&mut self, addr: SocketAddr, world: &mut GameWorld) {
        if let Some(connection) = self.clients.remove(&addr) {
            self.addr_by_player.remove(&connection.player_id);
            info!("Client {} ({}) disconnected", addr, connection.player_id);

            let out = world.disconnect_player(&connection.player_id);
            self.dispatch(out).await;
        }
    }

    /// Drop clients that have been silent for longer than the timeout
    async fn check_timeouts(&mut self, world: &mut GameWorld) {
        let timed_out: Vec<SocketAddr> = self
            .clients
            .values()
            .filter(|c| c.is_timed_out(self.client_timeout))
            .map(|c| c.addr)
            .collect();

        for addr in timed_out {
            if let Some(connection) = self.clients.remove(&addr) {
                self.addr_by_player.remove(&connection.player_id);
                warn!("Client {} ({}) timed out", addr, connection.player_id);

                let out = world.disconnect_player(&connection.player_id);
                self.dispatch(out).await;
            }
        }
    }

    /// Send world output to the addresses its recipients resolve to
    async fn dispatch(&self, out: Vec<Outgoing>) {
        for Outgoing { recipient, message } in out {
            match recipient {
                Recipient::All => {
                    for addr in self.clients.keys() {
                        self.send_to(*addr, &message).await;
                    }
                }
                Recipient::AllExcept(id) => {
                    let except = self.addr_by_player.get(&id);
                    for addr in self.clients.keys().filter(|a| Some(*a) != except) {
                        self.send_to(*addr, &message).await;
                    }
                }
                Recipient::Player(id) => match self.addr_by_player.get(&id) {
                    Some(addr) => self.send_to(*addr, &message).await,
                    None => debug!("No connection for {}, dropping message", id),
                },
            }
        }
    }

    /// Send a message to a specific address
    async fn send_to(&self, addr: SocketAddr, msg: &ServerMessage) {
        let data = match msg.serialize() {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to serialize message for {}: {}", addr, e);
                return;
            }
        };
        if let Err(e) = self.socket.send_to(&data, addr).await {
            error!("Failed to send to {}: {}", addr, e);
        }
    }
}
