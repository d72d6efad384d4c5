//! Server network layer: request handling, liveness probing and outbound delivery

use crate::config::ServerConfig;
use crate::coordinator::{deliveries_for, Delivery};
use crate::directory::Directory;
use log::{debug, error, info, warn};
use shared::{
    max_list_len, validate_name, ErrorCode, MemberName, MessageType, Packet, ProtocolError,
    MAX_ENCODED_MEMBER_NAME, RECV_BUFFER_LEN,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    Shutdown,
}

/// Messages queued for the outbound sender task
#[derive(Debug)]
pub enum OutboundMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
}

/// Room server: one control socket for directory requests, one probe socket
/// for liveness traffic, and a single lock around the directory
pub struct Server {
    socket: Arc<UdpSocket>,
    probe_socket: Arc<UdpSocket>,
    directory: Arc<RwLock<Directory>>,
    probe_period: Duration,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    outbound_tx: mpsc::UnboundedSender<OutboundMessage>,
    outbound_rx: Option<mpsc::UnboundedReceiver<OutboundMessage>>,
}

impl Server {
    /// Binds both sockets. Failure here is fatal to the process.
    pub async fn new(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;
        let socket = Arc::new(UdpSocket::bind(config.control_addr).await?);
        let probe_socket = Arc::new(UdpSocket::bind(config.probe_addr).await?);
        info!(
            "Server listening on {} (liveness on {})",
            socket.local_addr()?,
            probe_socket.local_addr()?
        );

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            probe_socket,
            directory: Arc::new(RwLock::new(Directory::new(
                config.max_rooms,
                config.max_members,
            ))),
            probe_period: config.probe_period,
            server_tx,
            server_rx,
            outbound_tx,
            outbound_rx: Some(outbound_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn probe_addr(&self) -> std::io::Result<SocketAddr> {
        self.probe_socket.local_addr()
    }

    pub fn directory(&self) -> Arc<RwLock<Directory>> {
        Arc::clone(&self.directory)
    }

    /// Handle that stops [`Server::run`] when sent [`ServerMessage::Shutdown`]
    pub fn control_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for directory requests
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; RECV_BUFFER_LEN];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match Packet::decode(&buffer[..len]) {
                        Ok(packet) => {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        }
                        Err(e) => warn!("Dropping packet from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes the outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let Some(mut outbound_rx) = self.outbound_rx.take() else {
            return;
        };

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                match message {
                    OutboundMessage::SendPacket { packet, addr } => {
                        if let Err(e) = send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that records probe responses arriving on the liveness socket
    fn spawn_probe_receiver(&self) {
        let probe_socket = Arc::clone(&self.probe_socket);
        let directory = Arc::clone(&self.directory);

        tokio::spawn(async move {
            let mut buffer = [0u8; RECV_BUFFER_LEN];

            loop {
                match probe_socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match Packet::decode(&buffer[..len]) {
                        Ok(packet) if packet.message_type() == MessageType::Probe => {
                            let known = directory.write().await.mark_alive(&addr);
                            if !known {
                                debug!("Probe response from unregistered peer {}", addr);
                            }
                        }
                        Ok(packet) => warn!(
                            "Unexpected {:?} on liveness socket from {}",
                            packet.message_type(),
                            addr
                        ),
                        Err(e) => warn!("Dropping liveness packet from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving probe response: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns the liveness monitor
    ///
    /// Each cycle clears every alive flag, probes every peer once, waits one
    /// full period and then evicts whoever stayed silent. There is no retry:
    /// one lost probe or response is enough to be evicted.
    fn spawn_liveness_monitor(&self) {
        let probe_socket = Arc::clone(&self.probe_socket);
        let directory = Arc::clone(&self.directory);
        let outbound_tx = self.outbound_tx.clone();
        let period = self.probe_period;

        tokio::spawn(async move {
            let probe = Packet::empty(MessageType::Probe, 0);

            loop {
                let targets = directory.write().await.begin_probe_cycle();
                for addr in &targets {
                    if let Err(e) = send_packet_impl(&probe_socket, &probe, *addr).await {
                        error!("Failed to probe {}: {}", addr, e);
                    }
                }
                debug!("Probed {} peers", targets.len());

                tokio::time::sleep(period).await;

                let mut guard = directory.write().await;
                for mutation in guard.evict_unresponsive() {
                    for delivery in deliveries_for(&guard, &mutation) {
                        queue_delivery(&outbound_tx, delivery);
                    }
                }
            }
        });
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        queue_delivery(&self.outbound_tx, Delivery { to: addr, packet });
    }

    fn send_all(&self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            queue_delivery(&self.outbound_tx, delivery);
        }
    }

    /// Applies one directory request and queues every resulting packet
    ///
    /// Mutations and the snapshots they produce are computed under one write
    /// guard, so no other request can slip in between the change and the
    /// membership lists that describe it.
    async fn handle_packet(&self, packet: Packet, addr: SocketAddr) {
        debug!("{:?} from {}", packet.header(), addr);

        match packet.message_type() {
            MessageType::CreateGame => {
                let name = match display_name(&packet) {
                    Ok(name) => name,
                    Err(e) => {
                        warn!("Ignoring create from {}: {}", addr, e);
                        return;
                    }
                };

                let mut directory = self.directory.write().await;
                match directory.create(addr, &name) {
                    Ok(mutation) => self.send_all(deliveries_for(&directory, &mutation)),
                    Err(code) => {
                        warn!("Create from {} rejected: {}", addr, code);
                        self.send_packet(Packet::rejection(code, 0), addr);
                    }
                }
            }

            MessageType::JoinGame => {
                let name = match display_name(&packet) {
                    Ok(name) => name,
                    Err(e) => {
                        warn!("Ignoring join from {}: {}", addr, e);
                        return;
                    }
                };
                let room_id = packet.room_id();

                let mut directory = self.directory.write().await;
                match directory.join(addr, &name, room_id) {
                    Ok(mutation) => self.send_all(deliveries_for(&directory, &mutation)),
                    Err(code) => {
                        warn!("Join of game {} from {} rejected: {}", room_id, addr, code);
                        self.send_packet(Packet::rejection(code, room_id), addr);
                    }
                }
            }

            MessageType::LeaveGame => {
                let mut directory = self.directory.write().await;
                match directory.leave(addr) {
                    Ok(mutation) => self.send_all(deliveries_for(&directory, &mutation)),
                    Err(code) => self.send_packet(Packet::rejection(code, 0), addr),
                }
            }

            MessageType::RoomList => {
                let rooms = self.directory.read().await.list();
                match Packet::with_rooms(&rooms) {
                    Ok(response) => self.send_packet(response, addr),
                    Err(e) => error!("Failed to build room list for {}: {}", addr, e),
                }
            }

            MessageType::NameQuery => {
                let endpoints = match packet.peers() {
                    Ok(endpoints) => endpoints,
                    Err(e) => {
                        warn!("Ignoring name query from {}: {}", addr, e);
                        return;
                    }
                };

                let names: Vec<MemberName> = {
                    let directory = self.directory.read().await;
                    endpoints
                        .into_iter()
                        .filter_map(|endpoint| {
                            directory.name_of(&endpoint).map(|name| MemberName {
                                endpoint,
                                name: name.to_string(),
                            })
                        })
                        .take(max_list_len(MAX_ENCODED_MEMBER_NAME))
                        .collect()
                };

                let response = if names.is_empty() {
                    Ok(Packet::rejection(ErrorCode::UnknownPeer, 0))
                } else {
                    Packet::with_names(&names)
                };
                match response {
                    Ok(response) => self.send_packet(response, addr),
                    Err(e) => error!("Failed to build name list for {}: {}", addr, e),
                }
            }

            other => {
                warn!("Unexpected {:?} on control socket from {}", other, addr);
            }
        }
    }

    /// Main server loop: spawns the network tasks and serves requests until shutdown
    pub async fn run(&mut self) {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_probe_receiver();
        self.spawn_liveness_monitor();

        info!("Server started successfully");

        loop {
            match self.server_rx.recv().await {
                Some(ServerMessage::PacketReceived { packet, addr }) => {
                    self.handle_packet(packet, addr).await;
                }
                Some(ServerMessage::Shutdown) | None => {
                    info!("Server shutting down");
                    break;
                }
            }
        }
    }
}

fn display_name(packet: &Packet) -> Result<String, ProtocolError> {
    let text = packet.as_text()?;
    Ok(validate_name(text)?.to_string())
}

fn queue_delivery(outbound_tx: &mpsc::UnboundedSender<OutboundMessage>, delivery: Delivery) {
    if let Err(e) = outbound_tx.send(OutboundMessage::SendPacket {
        packet: delivery.packet,
        addr: delivery.to,
    }) {
        error!("Failed to queue packet for sending: {}", e);
    }
}

async fn send_packet_impl(
    socket: &UdpSocket,
    packet: &Packet,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let data = packet.encode()?;
    socket.send_to(&data, addr).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn test_config() -> ServerConfig {
        ServerConfig {
            control_addr: "127.0.0.1:0".parse().unwrap(),
            probe_addr: "127.0.0.1:0".parse().unwrap(),
            max_rooms: 2,
            max_members: 3,
            probe_period: Duration::from_secs(60),
        }
    }

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    fn drain(server: &mut Server) -> Vec<(SocketAddr, Packet)> {
        let rx = server.outbound_rx.as_mut().unwrap();
        let mut sent = Vec::new();
        while let Ok(OutboundMessage::SendPacket { packet, addr }) = rx.try_recv() {
            sent.push((addr, packet));
        }
        sent
    }

    fn named(kind: MessageType, room_id: u32, name: &str) -> Packet {
        Packet::text(kind, room_id, name).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_join_queues_snapshots() {
        let mut server = tokio_test::assert_ok!(Server::new(test_config()).await);

        server
            .handle_packet(named(MessageType::CreateGame, 0, "alice"), peer(5001))
            .await;
        let sent = drain(&mut server);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, peer(5001));
        assert_eq!(sent[0].1.message_type(), MessageType::CreateGame);
        assert_eq!(sent[0].1.room_id(), 1);

        server
            .handle_packet(named(MessageType::JoinGame, 1, "bob"), peer(5002))
            .await;
        let sent = drain(&mut server);
        assert_eq!(sent.len(), 2);
        for (addr, packet) in &sent {
            assert_eq!(packet.peers().unwrap(), vec![peer(5001), peer(5002)]);
            let expected = if *addr == peer(5002) {
                MessageType::JoinGame
            } else {
                MessageType::MembershipUpdate
            };
            assert_eq!(packet.message_type(), expected);
        }
    }

    #[tokio::test]
    async fn test_rejections_are_scoped_and_do_not_mutate() {
        let mut server = tokio_test::assert_ok!(Server::new(test_config()).await);

        server
            .handle_packet(named(MessageType::JoinGame, 4, "bob"), peer(5002))
            .await;
        let sent = drain(&mut server);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.message_type(), MessageType::JoinGame);
        assert_eq!(sent[0].1.error(), Some(ErrorCode::NotFound));

        server
            .handle_packet(Packet::empty(MessageType::LeaveGame, 0), peer(5002))
            .await;
        let sent = drain(&mut server);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.error(), Some(ErrorCode::NotInGame));

        assert!(server.directory().read().await.is_empty());
    }

    #[tokio::test]
    async fn test_room_limit_reported_to_creator() {
        let mut server = tokio_test::assert_ok!(Server::new(test_config()).await);
        for port in [5001, 5002] {
            server
                .handle_packet(named(MessageType::CreateGame, 0, "p"), peer(port))
                .await;
        }
        drain(&mut server);

        server
            .handle_packet(named(MessageType::CreateGame, 0, "late"), peer(5003))
            .await;
        let sent = drain(&mut server);

        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.error(), Some(ErrorCode::CapacityExceeded));
        assert_eq!(server.directory().read().await.room_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_name_is_dropped_silently() {
        let mut server = tokio_test::assert_ok!(Server::new(test_config()).await);

        server
            .handle_packet(
                named(MessageType::CreateGame, 0, "a-name-that-is-far-too-long"),
                peer(5001),
            )
            .await;

        assert!(drain(&mut server).is_empty());
        assert!(server.directory().read().await.is_empty());
    }

    #[tokio::test]
    async fn test_room_list_and_name_query() {
        let mut server = tokio_test::assert_ok!(Server::new(test_config()).await);
        server
            .handle_packet(named(MessageType::CreateGame, 0, "alice"), peer(5001))
            .await;
        server
            .handle_packet(named(MessageType::JoinGame, 1, "bob"), peer(5002))
            .await;
        drain(&mut server);

        server
            .handle_packet(Packet::empty(MessageType::RoomList, 0), peer(5003))
            .await;
        let sent = drain(&mut server);
        let rooms = sent[0].1.rooms().unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].members, 2);
        assert_eq!(rooms[0].capacity, 3);

        let query =
            Packet::with_peers(MessageType::NameQuery, 1, &[peer(5001), peer(5002), peer(9)])
                .unwrap();
        server.handle_packet(query, peer(5001)).await;
        let sent = drain(&mut server);
        let names = sent[0].1.names().unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names[0].name, "alice");
        assert_eq!(names[1].name, "bob");

        let unknown = Packet::with_peers(MessageType::NameQuery, 1, &[peer(9)]).unwrap();
        server.handle_packet(unknown, peer(5001)).await;
        let sent = drain(&mut server);
        assert_eq!(sent[0].1.error(), Some(ErrorCode::UnknownPeer));
    }

    #[tokio::test]
    async fn test_oversized_member_limit_refuses_to_start() {
        let mut config = test_config();
        config.max_members = 150;
        assert!(Server::new(config).await.is_err());
    }

    #[tokio::test]
    async fn test_name_answer_capped_to_one_datagram() {
        let mut server = tokio_test::assert_ok!(Server::new(test_config()).await);
        server
            .handle_packet(named(MessageType::CreateGame, 0, "alice"), peer(5001))
            .await;
        drain(&mut server);

        // The same known endpoint asked for more times than one answer can hold.
        let repeated = vec![peer(5001); 40];
        let query = Packet::with_peers(MessageType::NameQuery, 1, &repeated).unwrap();
        server.handle_packet(query, peer(5001)).await;
        let sent = drain(&mut server);
        let names = sent[0].1.names().unwrap();
        assert_eq!(names.len(), max_list_len(MAX_ENCODED_MEMBER_NAME));
    }

    #[tokio::test]
    async fn test_round_traffic_is_not_served() {
        let mut server = tokio_test::assert_ok!(Server::new(test_config()).await);

        server
            .handle_packet(
                Packet::text(MessageType::RoundMessage, 1, "42").unwrap(),
                peer(5001),
            )
            .await;

        assert!(drain(&mut server).is_empty());
    }
}
