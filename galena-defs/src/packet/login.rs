use std::io::{Read, Write};

use galena_util::{
    UUID,
    connection::{
        ClientboundPacket, ConnectionError, PacketDecoder as _, PacketEncoder as _,
        ServerboundPacket,
    },
    serverbound_packet_enum,
};

#[derive(Debug)]
pub struct LoginStart {
    pub name: String,
}

impl ServerboundPacket for LoginStart {
    const SERVERBOUND_ID: i32 = 0x00;

    fn packet_read(mut reader: impl Read) -> Result<Self, ConnectionError>
    where
        Self: Sized,
    {
        Ok(Self {
            name: reader.decode()?,
        })
    }
}

/// Kicks a client that is still in the login state; the reason is a JSON
/// chat component.
#[derive(Debug)]
pub struct LoginDisconnect {
    pub reason: String,
}

impl ClientboundPacket for LoginDisconnect {
    const CLIENTBOUND_ID: i32 = 0x00;

    fn packet_write(&self, mut writer: impl Write) -> Result<(), ConnectionError> {
        writer.encode(&serde_json::json!({ "text": self.reason }).to_string())?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct EncryptionRequest {
    pub server_id: String,
    pub public_key: Box<[u8]>,
    pub verify_token: Box<[u8]>,
}

impl ClientboundPacket for EncryptionRequest {
    const CLIENTBOUND_ID: i32 = 0x01;

    fn packet_write(&self, mut writer: impl Write) -> Result<(), ConnectionError> {
        writer.encode(&self.server_id)?;
        writer.encode(&*self.public_key)?;
        writer.encode(&*self.verify_token)?;
        Ok(())
    }
}

/// Both fields are RSA-encrypted against the key from [`EncryptionRequest`].
#[derive(Debug)]
pub struct EncryptionResponse {
    pub shared_secret: Box<[u8]>,
    pub verify_token: Box<[u8]>,
}

impl ServerboundPacket for EncryptionResponse {
    const SERVERBOUND_ID: i32 = 0x01;

    fn packet_read(mut reader: impl Read) -> Result<Self, ConnectionError>
    where
        Self: Sized,
    {
        Ok(Self {
            shared_secret: reader.decode()?,
            verify_token: reader.decode()?,
        })
    }
}

/// At this protocol version the UUID travels as a dashed string.
#[derive(Debug)]
pub struct LoginSuccess {
    pub uuid: UUID,
    pub name: String,
}

impl ClientboundPacket for LoginSuccess {
    const CLIENTBOUND_ID: i32 = 0x02;

    fn packet_write(&self, mut writer: impl Write) -> Result<(), ConnectionError> {
        writer.encode(&self.uuid.to_string())?;
        writer.encode(&self.name)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct SetCompression {
    pub threshold: i32,
}

impl ClientboundPacket for SetCompression {
    const CLIENTBOUND_ID: i32 = 0x03;

    fn packet_write(&self, mut writer: impl Write) -> Result<(), ConnectionError> {
        writer.encode(self.threshold)?;
        Ok(())
    }
}

serverbound_packet_enum!(pub LoginPacket;
    LoginStart, LoginStart;
    EncryptionResponse, EncryptionResponse;
);
