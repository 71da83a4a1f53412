use std::{
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use galena_util::{
    UUID,
    connection::{Connection, ConnectionSender},
    crypto::encode_public_key_der,
};
use rsa::RsaPrivateKey;
use thiserror::Error;

use crate::{
    client::Client,
    config::ServerConfig,
    session::SessionService,
    world::{World, WorldError},
};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    WorldError(#[from] WorldError),
    #[error(transparent)]
    RsaError(#[from] rsa::Error),
}

/// Presence record for a connected, logged-in player.
#[derive(Debug, Clone)]
pub struct OnlinePlayer {
    pub uuid: UUID,
    pub name: String,
    pub entity_id: i32,
}

/// State shared between the accept loop and every connection worker. The
/// RSA keypair is generated once at startup and immutable afterwards; the
/// world and the presence lists each sit behind a single mutex.
#[derive(Debug)]
pub struct ServerShared {
    pub config: ServerConfig,
    pub private_key: RsaPrivateKey,
    pub public_key_der: Box<[u8]>,
    pub world: Mutex<World>,
    pub session: SessionService,
    pub players: Mutex<Vec<OnlinePlayer>>,
    pub connections: Mutex<Vec<ConnectionSender>>,
    closed: AtomicBool,
}

impl ServerShared {
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let world = World::open(&config.world)?;
        let private_key = RsaPrivateKey::new(&mut rsa::rand_core::OsRng, 1024)?;
        let public_key_der = encode_public_key_der(&private_key.to_public_key());
        let session = SessionService::new(config.data_dir());
        Ok(Self {
            config,
            private_key,
            public_key_der,
            world: Mutex::new(world),
            session,
            players: Mutex::new(Vec::new()),
            connections: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    pub fn online_players(&self) -> u32 {
        self.players.lock().unwrap().len() as u32
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// One listener plus its accept loop; connection workers run on their own
/// threads and share [`ServerShared`].
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    shared: Arc<ServerShared>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind_address())?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            shared: Arc::new(ServerShared::new(config)?),
        })
    }

    pub fn shared(&self) -> Arc<ServerShared> {
        self.shared.clone()
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts until [`Server::close`] is called.
    pub fn run(&self) -> Result<(), ServerError> {
        log::info!("est. <{}>", self.listener.local_addr()?);
        loop {
            if self.shared.is_closed() {
                return Ok(());
            }
            match self.listener.accept() {
                Ok((stream, address)) => self.accept(stream, address),
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn accept(&self, stream: TcpStream, address: SocketAddr) {
        let mut connections = self.shared.connections.lock().unwrap();
        connections.retain(|connection| !connection.is_closed());
        if connections.len() >= self.shared.config.max_connections {
            log::warn!("deny <{}>: connection limit reached", address);
            return;
        }
        match Connection::new(stream) {
            Ok(connection) => {
                connections.push(connection.sender());
                log::info!("open <{}> ({} total)", address, connections.len());
                drop(connections);

                let shared = self.shared.clone();
                std::thread::spawn(move || Client::new(connection, address, shared).run());
            }
            Err(err) => log::error!("Failed to set up connection from <{}>: {}", address, err),
        }
    }

    /// Idempotent: the first call closes every live connection; the accept
    /// loop exits on its next poll and the socket is released with the
    /// server.
    pub fn close(&self) {
        if !self.shared.closed.swap(true, Ordering::SeqCst) {
            for connection in self.shared.connections.lock().unwrap().drain(..) {
                connection.close();
            }
        }
    }
}
