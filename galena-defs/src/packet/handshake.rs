use std::io::Read;

use galena_util::{
    connection::{ConnectionError, PacketDecoder as _, ServerboundPacket},
    serverbound_packet_enum,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextState {
    Status,
    Login,
}

impl TryFrom<i32> for NextState {
    type Error = ConnectionError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(NextState::Status),
            2 => Ok(NextState::Login),
            _ => Err(ConnectionError::Other(
                format!("Handshake next_state invalid value {}", value).into(),
            )),
        }
    }
}

#[derive(Debug)]
pub struct Handshake {
    pub protocol_version: i32,
    pub server_address: String,
    pub server_port: u16,
    pub next_state: NextState,
}

impl ServerboundPacket for Handshake {
    const SERVERBOUND_ID: i32 = 0x00;

    fn packet_read(mut reader: impl Read) -> Result<Self, ConnectionError>
    where
        Self: Sized,
    {
        Ok(Self {
            protocol_version: reader.decode()?,
            server_address: reader.decode()?,
            server_port: reader.decode()?,
            next_state: NextState::try_from(reader.decode::<i32>()?)?,
        })
    }
}

serverbound_packet_enum!(pub HandshakePacket;
    Handshake, Handshake;
);
