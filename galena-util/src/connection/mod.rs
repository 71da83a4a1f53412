mod codec;
mod encryption;
mod handler;
pub mod varint;

use std::{
    collections::VecDeque,
    io::{Read as _, Write as _},
    net::TcpStream,
    sync::{Arc, Mutex},
    time::Instant,
};

use thiserror::Error;

pub use codec::*;
pub use encryption::{ConnectionEncryption, ConnectionEncryptionError};
pub use handler::{PacketHandler, PacketHandlerError};
use varint::try_read_varint_ret_bytes;

use crate::ReadExt as _;

const PACKET_RECEIVE_BUFFER_SIZE: usize = 1024;

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
    #[error("Unsupported packet {0}: {1:#X}")]
    UnsupportedPacket(String, i32),
    #[error("Invalid raw packet ID for parser (expected: {0}, found: {1})")]
    InvalidRawPacketIDForParser(i32, i32),
    #[error(transparent)]
    HandlerError(#[from] PacketHandlerError),
    #[error(transparent)]
    EncryptionError(#[from] ConnectionEncryptionError),
}

/// One framed packet, after the compression layer and before typed parsing.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RawPacket {
    pub id: i32,
    pub data: Box<[u8]>,
}

impl RawPacket {
    pub fn new(id: i32, data: Box<[u8]>) -> Self {
        Self { id, data }
    }

    pub fn into_bytes(self) -> Box<[u8]> {
        let mut data = Vec::new();
        data.encode(self.id).unwrap();
        data.write_all(&self.data).unwrap();
        data.into_boxed_slice()
    }
}

pub trait ServerboundPacket {
    const SERVERBOUND_ID: i32;

    fn packet_read(reader: impl std::io::Read) -> Result<Self, ConnectionError>
    where
        Self: Sized;

    fn packet_raw_read(raw: &RawPacket) -> Result<Self, ConnectionError>
    where
        Self: Sized,
    {
        if raw.id != Self::SERVERBOUND_ID {
            return Err(ConnectionError::InvalidRawPacketIDForParser(
                Self::SERVERBOUND_ID,
                raw.id,
            ));
        }
        Self::packet_read(std::io::Cursor::new(&raw.data))
    }
}

pub trait ClientboundPacket {
    const CLIENTBOUND_ID: i32;

    fn packet_write(&self, writer: impl std::io::Write) -> Result<(), ConnectionError>;

    fn raw_packet(&self) -> Result<RawPacket, ConnectionError> {
        let mut raw_data = Vec::new();
        self.packet_write(&mut raw_data)?;
        Ok(RawPacket {
            id: Self::CLIENTBOUND_ID,
            data: raw_data.into_boxed_slice(),
        })
    }
}

/// Generates a sum type over the serverbound packets of one protocol state,
/// dispatching on the packet id. Unknown ids surface as
/// [`ConnectionError::UnsupportedPacket`], which callers log and discard.
#[macro_export]
macro_rules! serverbound_packet_enum {
    ($enum_vis:vis $enum_name:ident; $($type:ty, $name:ident;)*) => {
        #[derive(Debug)]
        $enum_vis enum $enum_name {
            $(
                $name($type),
            )*
        }

        impl TryFrom<$crate::connection::RawPacket> for $enum_name {
            type Error = $crate::connection::ConnectionError;

            fn try_from(value: $crate::connection::RawPacket) -> std::result::Result<Self, Self::Error> {
                use $crate::connection::ServerboundPacket as _;
                let mut reader = std::io::Cursor::new(&value.data);
                match value.id {
                    $(
                        <$type>::SERVERBOUND_ID => Ok(Self::$name(<$type>::packet_read(&mut reader)?)),
                    )*
                    _ => Err(Self::Error::UnsupportedPacket(stringify!($enum_name).to_owned(), value.id)),
                }
            }
        }
    }
}

#[derive(Debug)]
struct ConnectionInner {
    stream: Option<TcpStream>,
    encryption: ConnectionEncryption,
    handler: PacketHandler,
}

/// The cloneable write half of a [`Connection`]. All of framing,
/// compression, and encryption for one outgoing packet happen under the
/// inner mutex, so packets from different threads never interleave.
#[derive(Debug, Clone)]
pub struct ConnectionSender {
    inner: Arc<Mutex<ConnectionInner>>,
}

impl ConnectionSender {
    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().stream.is_none()
    }

    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(stream) = inner.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }

    pub fn send(&self, packet: &impl ClientboundPacket) -> Result<(), ConnectionError> {
        let raw: RawPacket = packet.raw_packet()?;
        let bytes = raw.into_bytes();

        let mut inner = self.inner.lock().unwrap();

        let encoded = inner.handler.write(&bytes)?;
        let mut framed = Vec::new();
        framed.encode(encoded.len() as i32)?;
        framed.write_all(&encoded)?;
        inner.encryption.encrypt(&mut framed);

        let Some(stream) = inner.stream.as_mut() else {
            return Ok(());
        };
        match stream.write_all(&framed) {
            Err(err)
                if err.kind() == std::io::ErrorKind::BrokenPipe
                    || err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                inner.stream = None
            }
            v => v?,
        }
        Ok(())
    }
}

/// Receiving & sending packets over a [`TcpStream`]. The stream is
/// non-blocking; [`Connection::receive`] drains available bytes into an
/// internal queue and frames complete packets out of it.
#[derive(Debug)]
pub struct Connection {
    inner: Arc<Mutex<ConnectionInner>>,
    bytes: VecDeque<u8>,
    last_activity: Instant,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Result<Self, ConnectionError> {
        stream.set_nonblocking(true)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(ConnectionInner {
                stream: Some(stream),
                encryption: ConnectionEncryption::Unencrypted,
                handler: PacketHandler::Uncompressed,
            })),
            bytes: VecDeque::new(),
            last_activity: Instant::now(),
        })
    }

    pub fn sender(&self) -> ConnectionSender {
        ConnectionSender {
            inner: self.inner.clone(),
        }
    }

    /// Installed atomically with respect to framing: no frame is read or
    /// written between the handshake packet and the cipher taking effect.
    pub fn set_encryption(&self, encryption: ConnectionEncryption) {
        self.inner.lock().unwrap().encryption = encryption;
    }

    pub fn set_packet_handler(&self, handler: PacketHandler) {
        self.inner.lock().unwrap().handler = handler;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().stream.is_none()
    }

    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(stream) = inner.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }

    /// Time since any byte last arrived; used for the connection idle check.
    pub fn idle_time(&self) -> std::time::Duration {
        self.last_activity.elapsed()
    }

    pub fn send(&self, packet: &impl ClientboundPacket) -> Result<(), ConnectionError> {
        self.sender().send(packet)
    }

    fn receive_bytes(&mut self) -> Result<(), ConnectionError> {
        let mut buf = [0u8; PACKET_RECEIVE_BUFFER_SIZE];
        let mut inner = self.inner.lock().unwrap();
        loop {
            let Some(stream) = inner.stream.as_mut() else {
                return Ok(());
            };
            match stream.read(&mut buf) {
                Ok(0) => {
                    inner.stream = None;
                    break;
                }
                Ok(n) => {
                    inner.encryption.decrypt(&mut buf[..n]);
                    self.bytes.extend(&buf[..n]);
                    self.last_activity = Instant::now();
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    break;
                }
                Err(err)
                    if err.kind() == std::io::ErrorKind::BrokenPipe
                        || err.kind() == std::io::ErrorKind::UnexpectedEof
                        || err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    inner.stream = None;
                    break;
                }
                Err(err) => return Err(err)?,
            }
        }
        Ok(())
    }

    /// Frame one packet out of the byte queue, if a whole one has arrived.
    pub fn receive(&mut self) -> Result<Option<RawPacket>, ConnectionError> {
        self.receive_bytes()?;

        let Some((size_bytes, size)) = try_read_varint_ret_bytes(self.bytes.make_contiguous())?
        else {
            return Ok(None);
        };
        if size < 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Negative packet length {}", size),
            )
            .into());
        }

        if self.bytes.len() < size_bytes + (size as usize) {
            return Ok(None);
        }

        self.bytes.drain(..size_bytes);
        let encoded: Vec<u8> = self.bytes.drain(..size as usize).collect();

        let handler = self.inner.lock().unwrap().handler.clone();
        let decoded = handler.read(&encoded)?;

        let mut reader = std::io::Cursor::new(&decoded);
        Ok(Some(RawPacket {
            id: reader.decode::<i32>()?,
            data: reader.read_all()?,
        }))
    }

    /// Receive & parse into a per-state packet enum, if available.
    pub fn receive_into<T>(&mut self) -> Result<Option<T>, ConnectionError>
    where
        T: TryFrom<RawPacket, Error = ConnectionError>,
    {
        self.receive().map(|i| i.map(T::try_from).transpose())?
    }
}
