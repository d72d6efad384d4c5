use crate::board::{BingoBoard, Board};
use crate::input::{parse_command, Command, HELP};
use crate::round::{Broadcast, RoundAction, RoundCoordinator};
use crate::session::{PeerSession, SessionEvent};
use log::{debug, error, info, warn};
use shared::{validate_name, MessageType, Packet, RECV_BUFFER_LEN};
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Default pause before each round fan-out, so the room can follow along
pub const DEFAULT_DRAW_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_addr: SocketAddr,
    pub bind_addr: SocketAddr,
    pub name: String,
    pub draw_delay: Duration,
}

/// Messages queued for the outbound sender task
#[derive(Debug)]
pub enum OutboundMessage {
    /// A single datagram: directory requests and probe replies
    SendPacket { packet: Packet, addr: SocketAddr },
    /// Round traffic for every room member, sent after the draw delay
    Fanout {
        packet: Packet,
        peers: Vec<SocketAddr>,
    },
}

/// Peer process: one socket shared by server and room traffic, and a single
/// event loop that owns the session and the round state
pub struct Client<B: Board> {
    socket: Arc<UdpSocket>,
    server_addr: SocketAddr,
    session: PeerSession,
    round: RoundCoordinator<B>,
    draw_delay: Duration,

    outbound_tx: mpsc::UnboundedSender<OutboundMessage>,
    outbound_rx: Option<mpsc::UnboundedReceiver<OutboundMessage>>,
}

impl Client<BingoBoard> {
    pub async fn new(config: ClientConfig) -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_board(config, BingoBoard::new()).await
    }
}

impl<B: Board> Client<B> {
    /// Validates the display name and binds the local socket. Either failure
    /// is fatal to the process.
    pub async fn with_board(
        config: ClientConfig,
        board: B,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let name = validate_name(&config.name)?.to_string();
        let socket = Arc::new(UdpSocket::bind(config.bind_addr).await?);
        info!(
            "{} bound to {}, server at {}",
            name,
            socket.local_addr()?,
            config.server_addr
        );

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Ok(Client {
            socket,
            server_addr: config.server_addr,
            session: PeerSession::new(name),
            round: RoundCoordinator::new(board),
            draw_delay: config.draw_delay,
            outbound_tx,
            outbound_rx: Some(outbound_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn session(&self) -> &PeerSession {
        &self.session
    }

    pub fn round(&self) -> &RoundCoordinator<B> {
        &self.round
    }

    /// Spawns task that drains the outbound queue
    ///
    /// Fan-out is sequential. A failed send to one member is logged and the
    /// rest of the room still gets the datagram.
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let draw_delay = self.draw_delay;
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
                    OutboundMessage::Fanout { packet, peers } => {
                        tokio::time::sleep(draw_delay).await;
                        for addr in peers {
                            if let Err(e) = send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send round message to {}: {}", addr, e);
                            }
                        }
                    }
                }
            }
        });
    }

    fn queue(&self, message: OutboundMessage) {
        if let Err(e) = self.outbound_tx.send(message) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn send_to_server(&self, packet: Packet) {
        self.queue(OutboundMessage::SendPacket {
            packet,
            addr: self.server_addr,
        });
    }

    /// Operator output. Only the event loop calls this, so lines never interleave.
    fn say(&self, message: impl Display) {
        println!("{}", message);
    }

    fn handle_line(&mut self, line: &str) {
        match parse_command(line) {
            Ok(Some(command)) => self.handle_command(command),
            Ok(None) => {}
            Err(e) => self.say(e),
        }
    }

    fn handle_command(&mut self, command: Command) {
        let request = match command {
            Command::CreateRoom => self.session.create_request().map(Some),
            Command::JoinRoom(room_id) => self.session.join_request(room_id).map(Some),
            Command::LeaveRoom => Ok(Some(self.session.leave_request())),
            Command::ListRooms => Ok(Some(self.session.list_request())),
            Command::ShowInfo => {
                self.say(self.session.describe());
                self.say(self.round.board().render());
                self.session.names_request()
            }
            Command::ToggleRound => {
                if self.session.room_id().is_none() {
                    error!("Cannot toggle the round outside a game");
                    self.say("You are not in a game");
                } else {
                    let actions = self.round.toggle();
                    self.perform(actions);
                }
                Ok(None)
            }
            Command::Help => {
                self.say(HELP);
                Ok(None)
            }
        };

        match request {
            Ok(Some(packet)) => self.send_to_server(packet),
            Ok(None) => {}
            Err(e) => error!("Failed to build {:?} request: {}", command, e),
        }
    }

    fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        debug!("{:?} from {}", packet.header(), addr);

        match packet.message_type() {
            MessageType::Probe => {
                self.queue(OutboundMessage::SendPacket {
                    packet: Packet::empty(MessageType::Probe, 0),
                    addr,
                });
            }

            kind @ (MessageType::RoundMessage | MessageType::ElectionMessage) => {
                if !self.session.accepts_round(packet.room_id()) {
                    debug!(
                        "Ignoring round traffic for game {} from {}",
                        packet.room_id(),
                        addr
                    );
                    return;
                }

                let actions = if kind == MessageType::ElectionMessage {
                    // Our own hand-off coming back must not restart us.
                    if Some(addr) == self.session.self_endpoint() {
                        debug!("Ignoring own election message");
                        return;
                    }
                    self.round.on_election()
                } else {
                    match packet.as_text() {
                        Ok(text) => self.round.on_round_message(text),
                        Err(e) => {
                            warn!("Dropping round message from {}: {}", addr, e);
                            return;
                        }
                    }
                };
                self.perform(actions);
            }

            _ => match self.session.apply(&packet) {
                Ok(Some(event)) => {
                    if matches!(
                        event,
                        SessionEvent::Created(_) | SessionEvent::Joined(_) | SessionEvent::Left
                    ) {
                        self.round.leave_round();
                    }
                    self.say(event)
                }
                Ok(None) => {}
                Err(e) => warn!(
                    "Dropping {:?} from {}: {}",
                    packet.message_type(),
                    addr,
                    e
                ),
            },
        }
    }

    fn perform(&mut self, actions: Vec<RoundAction>) {
        for action in actions {
            match action {
                RoundAction::Broadcast(broadcast) => self.broadcast(broadcast),
                RoundAction::Notify(notice) => self.say(notice),
            }
        }
    }

    fn broadcast(&self, broadcast: Broadcast) {
        let Some(room_id) = self.session.room_id() else {
            return;
        };

        // Elections hand the round to someone else, so they skip this peer.
        let peers = if broadcast.message_type == MessageType::ElectionMessage {
            self.session.other_peers()
        } else {
            self.session.peers().to_vec()
        };

        match Packet::text(broadcast.message_type, room_id, &broadcast.text) {
            Ok(packet) => self.queue(OutboundMessage::Fanout { packet, peers }),
            Err(e) => error!("Failed to build round message: {}", e),
        }
    }

    /// Main client loop: serves the console and the socket until stdin closes
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_sender();
        let mut console_rx = spawn_console_reader();
        let socket = Arc::clone(&self.socket);
        let mut buffer = [0u8; RECV_BUFFER_LEN];

        self.say(HELP);

        loop {
            tokio::select! {
                result = socket.recv_from(&mut buffer) => match result {
                    Ok((len, addr)) => match Packet::decode(&buffer[..len]) {
                        Ok(packet) => self.handle_packet(packet, addr),
                        Err(e) => warn!("Dropping packet from {}: {}", addr, e),
                    },
                    Err(e) => error!("Error receiving packet: {}", e),
                },

                line = console_rx.recv() => match line {
                    Some(line) => self.handle_line(&line),
                    None => {
                        info!("Console closed");
                        break;
                    }
                },
            }
        }

        // Sent directly: the sender task may not get another turn before exit.
        if self.session.room_id().is_some() {
            let leave = self.session.leave_request();
            if let Err(e) = send_packet_impl(&socket, &leave, self.server_addr).await {
                error!("Failed to leave game on exit: {}", e);
            }
        }

        Ok(())
    }
}

/// Spawns task that forwards console lines to the event loop
fn spawn_console_reader() -> mpsc::UnboundedReceiver<String> {
    let (console_tx, console_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if console_tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Error reading console: {}", e);
                    break;
                }
            }
        }
    });

    console_rx
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
