use std::io::{Read, Write};

use galena_util::{
    connection::{ClientboundPacket, ConnectionError, PacketEncoder as _, ServerboundPacket},
    serverbound_packet_enum,
};
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub struct Request;

impl ServerboundPacket for Request {
    const SERVERBOUND_ID: i32 = 0x00;

    fn packet_read(_reader: impl Read) -> Result<Self, ConnectionError>
    where
        Self: Sized,
    {
        Ok(Self)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseVersion {
    pub name: String,
    pub protocol: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResponsePlayers {
    pub max: u32,
    pub online: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseDescription {
    pub text: String,
}

/// The server-list JSON payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub version: ResponseVersion,
    pub players: ResponsePlayers,
    pub description: ResponseDescription,
}

impl ClientboundPacket for Response {
    const CLIENTBOUND_ID: i32 = 0x00;

    fn packet_write(&self, mut writer: impl Write) -> Result<(), ConnectionError> {
        writer.encode(
            &serde_json::to_string(self).map_err(|err| ConnectionError::Other(Box::new(err)))?,
        )?;
        Ok(())
    }
}

/// Ping and pong share the 64-bit payload; the server echoes it verbatim.
#[derive(Debug)]
pub struct Ping {
    pub payload: i64,
}

impl ServerboundPacket for Ping {
    const SERVERBOUND_ID: i32 = 0x01;

    fn packet_read(mut reader: impl Read) -> Result<Self, ConnectionError>
    where
        Self: Sized,
    {
        Ok(Self {
            payload: i64::from_be_bytes(galena_util::ReadExt::read_const(&mut reader)?),
        })
    }
}

impl ClientboundPacket for Ping {
    const CLIENTBOUND_ID: i32 = 0x01;

    fn packet_write(&self, mut writer: impl Write) -> Result<(), ConnectionError> {
        writer.write_all(&self.payload.to_be_bytes())?;
        Ok(())
    }
}

serverbound_packet_enum!(pub StatusPacket;
    Request, Request;
    Ping, Ping;
);
