use std::{net::SocketAddr, sync::Arc, time::Duration};

use galena_defs::{
    PROTOCOL_NAME, PROTOCOL_VERSION,
    packet::{handshake, login, play, status},
};
use galena_util::{
    UUID, Vec3,
    connection::{
        Connection, ConnectionEncryption, ConnectionError, PacketHandler, RawPacket,
    },
    crypto::LoginHash,
    nbt::NBTError,
};
use rsa::Pkcs1v15Encrypt;
use thiserror::Error;

use crate::{
    entity::PlayerEntity,
    keepalive::{KeepAlive, KeepAliveTimeout},
    server::{OnlinePlayer, ServerShared},
    session::SessionError,
    world::{self, Chunk, WorldError},
};

const BRAND: &str = concat!("galena/", env!("CARGO_PKG_VERSION"));
const COMPRESSION_LEVEL: u32 = 6;
/// Naive speed check: reject any single movement farther than this.
const MAX_MOVE_DISTANCE: f64 = 100.0;
const RECEIVE_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    ConnectionError(#[from] ConnectionError),
    #[error(transparent)]
    NBTError(#[from] NBTError),
    #[error(transparent)]
    WorldError(#[from] WorldError),
    #[error(transparent)]
    RsaError(#[from] rsa::Error),
    #[error(transparent)]
    SessionError(#[from] SessionError),
    /// Transport or framing fault; the connection closes silently.
    #[error("{0}")]
    Protocol(String),
    /// Semantically invalid client input; the reason goes out in a
    /// Disconnect packet before the connection closes.
    #[error("{0}")]
    IllegalData(String),
}

impl From<KeepAliveTimeout> for ClientError {
    fn from(err: KeepAliveTimeout) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl ClientError {
    fn disconnect_reason(&self) -> Option<&str> {
        match self {
            ClientError::IllegalData(reason) => Some(reason),
            _ => None,
        }
    }
}

/// A logged-in player bound to one connection.
#[derive(Debug)]
pub struct Player {
    pub uuid: UUID,
    pub name: String,
    pub entity: PlayerEntity,
    /// Unacknowledged teleport nonces. Clients confirm in order, but
    /// removal tolerates out-of-order acknowledgements.
    pub teleport_ids: Vec<i32>,
    pub settings: Option<play::ClientSettings>,
}

#[derive(Debug)]
struct PlaySession {
    player: Player,
    keepalive: KeepAlive,
}

#[derive(Debug)]
enum ClientState {
    Handshake,
    Status,
    Login {
        name: Option<String>,
        verify_token: [u8; 4],
    },
    Play(Box<PlaySession>),
    Closed,
}

/// One connection's worker: drives the protocol state machine over the
/// non-blocking [`Connection`] until the peer disconnects or errors out.
pub struct Client {
    connection: Connection,
    address: SocketAddr,
    shared: Arc<ServerShared>,
    protocol_version: i32,
    state: ClientState,
}

fn parse_packet<T>(raw: RawPacket) -> Result<Option<T>, ClientError>
where
    T: TryFrom<RawPacket, Error = ConnectionError>,
{
    match T::try_from(raw) {
        Ok(packet) => Ok(Some(packet)),
        Err(ConnectionError::UnsupportedPacket(state, id)) => {
            log::debug!("Ignoring unknown {} packet {:#04X}", state, id);
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

impl Client {
    pub fn new(connection: Connection, address: SocketAddr, shared: Arc<ServerShared>) -> Self {
        Self {
            connection,
            address,
            shared,
            protocol_version: -1,
            state: ClientState::Handshake,
        }
    }

    /// Protocol version the peer advertised in its handshake; -1 before one
    /// arrives.
    pub fn protocol_version(&self) -> i32 {
        self.protocol_version
    }

    pub fn run(mut self) {
        if let Err(err) = self.run_loop() {
            match err.disconnect_reason() {
                Some(reason) => {
                    log::warn!("<{}> kicked: {}", self.address, reason);
                    let reason = reason.to_owned();
                    let result = match &self.state {
                        ClientState::Play(..) => {
                            self.connection.send(&play::Disconnect { reason })
                        }
                        _ => self.connection.send(&login::LoginDisconnect { reason }),
                    };
                    if let Err(err) = result {
                        log::debug!("<{}> disconnect packet not sent: {}", self.address, err);
                    }
                }
                None => log::warn!("<{}> protocol error: {}", self.address, err),
            }
        }
        self.close();
    }

    fn run_loop(&mut self) -> Result<(), ClientError> {
        loop {
            if matches!(self.state, ClientState::Closed) || self.connection.is_closed() {
                return Ok(());
            }
            if self.connection.idle_time() > self.shared.config.idle_timeout() {
                return Err(ClientError::Protocol("Connection timed out".to_owned()));
            }
            match self.connection.receive()? {
                Some(raw) => self.handle_packet(raw)?,
                None => std::thread::sleep(RECEIVE_POLL_INTERVAL),
            }
            if let ClientState::Play(session) = &self.state {
                session.keepalive.check()?;
            }
        }
    }

    fn handle_packet(&mut self, raw: RawPacket) -> Result<(), ClientError> {
        match self.state {
            ClientState::Handshake => self.handle_handshake(raw),
            ClientState::Status => self.handle_status(raw),
            ClientState::Login { .. } => self.handle_login(raw),
            ClientState::Play(..) => self.handle_play(raw),
            ClientState::Closed => Ok(()),
        }
    }

    fn handle_handshake(&mut self, raw: RawPacket) -> Result<(), ClientError> {
        let Some(handshake::HandshakePacket::Handshake(handshake)) = parse_packet(raw)? else {
            return Ok(());
        };
        log::debug!(
            "<{}> handshake: protocol {} via {}:{}",
            self.address,
            handshake.protocol_version,
            handshake.server_address,
            handshake.server_port,
        );
        self.protocol_version = handshake.protocol_version;
        self.state = match handshake.next_state {
            handshake::NextState::Status => ClientState::Status,
            handshake::NextState::Login => ClientState::Login {
                name: None,
                verify_token: rand::random(),
            },
        };
        Ok(())
    }

    fn handle_status(&mut self, raw: RawPacket) -> Result<(), ClientError> {
        match parse_packet(raw)? {
            Some(status::StatusPacket::Request(_)) => {
                self.connection.send(&status::Response {
                    version: status::ResponseVersion {
                        name: PROTOCOL_NAME.to_owned(),
                        protocol: PROTOCOL_VERSION,
                    },
                    players: status::ResponsePlayers {
                        max: self.shared.config.players.max,
                        online: self.shared.online_players(),
                    },
                    description: status::ResponseDescription {
                        text: self.shared.config.description.clone(),
                    },
                })?;
            }
            Some(status::StatusPacket::Ping(ping)) => {
                self.connection.send(&ping)?;
                self.state = ClientState::Closed;
            }
            None => {}
        }
        Ok(())
    }

    fn handle_login(&mut self, raw: RawPacket) -> Result<(), ClientError> {
        let Some(packet) = parse_packet::<login::LoginPacket>(raw)? else {
            return Ok(());
        };
        match packet {
            login::LoginPacket::LoginStart(login_start) => {
                let verify_token = {
                    let ClientState::Login { name, verify_token } = &mut self.state else {
                        return Ok(());
                    };
                    *name = Some(login_start.name.clone());
                    *verify_token
                };
                if self.shared.config.online {
                    self.connection.send(&login::EncryptionRequest {
                        server_id: String::new(),
                        public_key: self.shared.public_key_der.clone(),
                        verify_token: verify_token.to_vec().into_boxed_slice(),
                    })?;
                } else {
                    let uuid = self.shared.session.resolve_uuid(&login_start.name);
                    self.join_game(uuid, login_start.name)?;
                }
            }
            login::LoginPacket::EncryptionResponse(response) => {
                let (name, verify_token) = {
                    let ClientState::Login { name, verify_token } = &self.state else {
                        return Ok(());
                    };
                    (name.clone(), *verify_token)
                };
                let Some(name) = name else {
                    return Err(ClientError::Protocol(
                        "Encryption response before login start".to_owned(),
                    ));
                };

                if self
                    .shared
                    .private_key
                    .decrypt(Pkcs1v15Encrypt, &response.verify_token)?
                    != verify_token
                {
                    return Err(ClientError::IllegalData(
                        "Verify tokens do not match!".to_owned(),
                    ));
                }

                let shared_secret = self
                    .shared
                    .private_key
                    .decrypt(Pkcs1v15Encrypt, &response.shared_secret)?;
                let shared_secret: [u8; 16] = shared_secret
                    .try_into()
                    .map_err(|_| ClientError::IllegalData("Invalid shared secret!".to_owned()))?;

                // From here on every byte in both directions is ciphered.
                self.connection.set_encryption(
                    ConnectionEncryption::new_aes(&shared_secret)
                        .map_err(ConnectionError::from)?,
                );

                let server_id = {
                    let mut hasher = LoginHash::default();
                    hasher.update("");
                    hasher.update(shared_secret);
                    hasher.update(&self.shared.public_key_der);
                    hasher.finalize()
                };
                let Some(profile) = self.shared.session.has_joined(&name, &server_id)? else {
                    return Err(ClientError::IllegalData("User is not logged in!".to_owned()));
                };
                let uuid = profile.uuid().map_err(SessionError::from)?;
                log::info!("<{}> session verified for {} ({})", self.address, profile.name, uuid);
                self.join_game(uuid, profile.name)?;
            }
        }
        Ok(())
    }

    /// The post-login clientbound burst, ending with the player's current
    /// chunk, then the transition into PLAY.
    fn join_game(&mut self, uuid: UUID, name: String) -> Result<(), ClientError> {
        let config = self.shared.config.clone();

        if config.compression >= 0 {
            self.connection.send(&login::SetCompression {
                threshold: config.compression,
            })?;
            self.connection.set_packet_handler(
                PacketHandler::new_zlib(config.compression as usize, COMPRESSION_LEVEL)
                    .map_err(ConnectionError::from)?,
            );
        }
        self.connection.send(&login::LoginSuccess {
            uuid,
            name: name.clone(),
        })?;

        let (entity, difficulty, spawn, chunk_data) = {
            let mut world = self.shared.world.lock().unwrap();
            let mut entity = world.player_data(&uuid)?;
            entity.set_uuid(uuid);
            let difficulty = world.level().difficulty.unwrap_or(config.difficulty);
            let spawn = world.level().spawn_position();
            let position = entity.position();
            let chunk_data = world
                .chunk(
                    entity.dimension,
                    (position.x.floor() as i32) >> 4,
                    (position.z.floor() as i32) >> 4,
                )?
                .map(Chunk::to_chunk_data);
            (entity, difficulty, spawn, chunk_data)
        };

        self.shared.players.lock().unwrap().push(OnlinePlayer {
            uuid,
            name: name.clone(),
            entity_id: entity.entity_id(),
        });
        log::info!("{} ({}) joined from <{}>", name, uuid, self.address);

        self.connection.send(&play::JoinGame {
            entity_id: entity.entity_id(),
            gamemode: entity.gamemode as u8,
            dimension: entity.dimension as i8,
            difficulty,
            max_players: config.players.max.min(u8::MAX as u32) as u8,
            level_type: "default".to_owned(),
            reduced_debug_info: false,
        })?;
        self.connection.send(&play::PluginMessage::brand(BRAND))?;
        self.connection.send(&play::ServerDifficulty { difficulty })?;
        self.connection.send(&play::SpawnPosition { position: spawn })?;
        self.connection.send(&play::PlayerAbilities {
            flags: entity.ability_flags(),
            flying_speed: entity.abilities.fly_speed,
            walking_speed: entity.abilities.walk_speed,
        })?;

        let mut player = Player {
            uuid,
            name,
            entity,
            teleport_ids: Vec::new(),
            settings: None,
        };
        let position = player.entity.position();
        let teleport_id = rand::random_range(1..(1 << 24) - 1);
        self.connection.send(&play::PlayerPositionAndLook {
            x: position.x,
            y: position.y,
            z: position.z,
            yaw: player.entity.mob.entity.yaw(),
            pitch: player.entity.mob.entity.pitch(),
            flags: 0,
            teleport_id,
        })?;
        player.teleport_ids.push(teleport_id);

        match chunk_data {
            Some(chunk_data) => self.connection.send(&chunk_data)?,
            None => log::warn!("No generated chunk under {} at join", player.name),
        }

        let keepalive = KeepAlive::start(
            self.connection.sender(),
            config.keepalive_send_interval(),
            config.keepalive_timeout(),
        );
        self.state = ClientState::Play(Box::new(PlaySession { player, keepalive }));
        Ok(())
    }

    fn handle_play(&mut self, raw: RawPacket) -> Result<(), ClientError> {
        let Some(packet) = parse_packet::<play::PlayPacket>(raw)? else {
            return Ok(());
        };
        let ClientState::Play(session) = &mut self.state else {
            return Ok(());
        };
        match packet {
            play::PlayPacket::TeleportConfirm(confirm) => {
                session
                    .player
                    .teleport_ids
                    .retain(|id| *id != confirm.teleport_id);
            }
            play::PlayPacket::ClientStatus(client_status) => {
                log::debug!("<{}> client status action {}", self.address, client_status.action);
            }
            play::PlayPacket::ClientSettings(settings) => {
                session.player.settings = Some(settings);
            }
            play::PlayPacket::PluginMessage(message) => {
                log::debug!("<{}> plugin message on {:?}", self.address, message.channel);
            }
            play::PlayPacket::KeepAlive(keep_alive) => {
                session.keepalive.acknowledge(keep_alive.id);
            }
            play::PlayPacket::Position(update) => {
                Self::apply_movement(
                    &mut session.player,
                    Vec3::new(update.x, update.y, update.z),
                    None,
                    update.on_ground,
                )?;
            }
            play::PlayPacket::PositionLook(update) => {
                Self::apply_movement(
                    &mut session.player,
                    Vec3::new(update.x, update.y, update.z),
                    Some([update.yaw, update.pitch]),
                    update.on_ground,
                )?;
            }
            play::PlayPacket::Look(update) => {
                let entity = &mut session.player.entity.mob.entity;
                entity.rotation = [update.yaw, update.pitch];
                entity.on_ground = update.on_ground;
            }
            play::PlayPacket::OnGround(update) => {
                session.player.entity.mob.entity.on_ground = update.on_ground;
            }
        }
        Ok(())
    }

    fn apply_movement(
        player: &mut Player,
        position: Vec3<f64>,
        rotation: Option<[f32; 2]>,
        on_ground: bool,
    ) -> Result<(), ClientError> {
        let entity = &mut player.entity.mob.entity;
        if entity.position.distance(&position) > MAX_MOVE_DISTANCE {
            return Err(ClientError::IllegalData("You moved too quickly!".to_owned()));
        }
        entity.position = position;
        if let Some(rotation) = rotation {
            entity.rotation = rotation;
        }
        entity.on_ground = on_ground;
        Ok(())
    }

    /// Idempotent teardown: persists and deregisters the player, closes the
    /// socket (which also stops the keepalive emitter on its next tick),
    /// and prunes the server's connection list.
    fn close(&mut self) {
        if let ClientState::Play(session) = std::mem::replace(&mut self.state, ClientState::Closed)
        {
            let player = &session.player;
            self.shared
                .players
                .lock()
                .unwrap()
                .retain(|online| online.uuid != player.uuid);
            if let Err(err) = world::save_player_data(
                &self.shared.config.data_dir(),
                &player.uuid,
                &player.entity,
            ) {
                log::warn!("<{}> player data not saved: {}", self.address, err);
            }
        }
        self.connection.close();
        let mut connections = self.shared.connections.lock().unwrap();
        connections.retain(|connection| !connection.is_closed());
        log::info!("term <{}> ({} left)", self.address, connections.len());
    }
}
