use std::io::{Read, Write};

use galena_util::{
    Position, ReadExt as _,
    connection::{
        ClientboundPacket, ConnectionError, PacketDecoder as _, PacketEncoder as _,
        ServerboundPacket,
    },
    serverbound_packet_enum,
};

// -- Serverbound --

#[derive(Debug)]
pub struct TeleportConfirm {
    pub teleport_id: i32,
}

impl ServerboundPacket for TeleportConfirm {
    const SERVERBOUND_ID: i32 = 0x00;

    fn packet_read(mut reader: impl Read) -> Result<Self, ConnectionError>
    where
        Self: Sized,
    {
        Ok(Self {
            teleport_id: reader.decode()?,
        })
    }
}

#[derive(Debug)]
pub struct ClientStatus {
    pub action: i32,
}

impl ClientStatus {
    pub const RESPAWN: i32 = 0;
    pub const REQUEST_STATS: i32 = 1;
    pub const OPEN_INVENTORY: i32 = 2;
}

impl ServerboundPacket for ClientStatus {
    const SERVERBOUND_ID: i32 = 0x03;

    fn packet_read(mut reader: impl Read) -> Result<Self, ConnectionError>
    where
        Self: Sized,
    {
        Ok(Self {
            action: reader.decode()?,
        })
    }
}

#[derive(Debug)]
pub struct ClientSettings {
    pub locale: String,
    pub view_distance: u8,
    pub chat_mode: i32,
    pub chat_colors: bool,
    pub skin_parts: u8,
    pub main_hand: i32,
}

impl ServerboundPacket for ClientSettings {
    const SERVERBOUND_ID: i32 = 0x04;

    fn packet_read(mut reader: impl Read) -> Result<Self, ConnectionError>
    where
        Self: Sized,
    {
        Ok(Self {
            locale: reader.decode()?,
            view_distance: reader.decode()?,
            chat_mode: reader.decode()?,
            chat_colors: reader.decode()?,
            skin_parts: reader.decode()?,
            main_hand: reader.decode()?,
        })
    }
}

/// Opaque named channel payload; serverbound 0x09, clientbound 0x18. The
/// data is the remainder of the packet, with no length prefix of its own.
#[derive(Debug)]
pub struct PluginMessage {
    pub channel: String,
    pub data: Box<[u8]>,
}

impl PluginMessage {
    pub const BRAND_CHANNEL: &'static str = "MC|Brand";

    pub fn brand(brand: &str) -> Self {
        let mut data = Vec::new();
        data.encode(brand).unwrap();
        Self {
            channel: Self::BRAND_CHANNEL.to_owned(),
            data: data.into_boxed_slice(),
        }
    }
}

impl ServerboundPacket for PluginMessage {
    const SERVERBOUND_ID: i32 = 0x09;

    fn packet_read(mut reader: impl Read) -> Result<Self, ConnectionError>
    where
        Self: Sized,
    {
        Ok(Self {
            channel: reader.decode()?,
            data: reader.read_all()?,
        })
    }
}

impl ClientboundPacket for PluginMessage {
    const CLIENTBOUND_ID: i32 = 0x18;

    fn packet_write(&self, mut writer: impl Write) -> Result<(), ConnectionError> {
        writer.encode(&self.channel)?;
        writer.write_all(&self.data)?;
        Ok(())
    }
}

/// Heartbeat token; serverbound 0x0B echoes the clientbound 0x1F.
#[derive(Debug, Clone, Copy)]
pub struct KeepAlive {
    pub id: i32,
}

impl ServerboundPacket for KeepAlive {
    const SERVERBOUND_ID: i32 = 0x0B;

    fn packet_read(mut reader: impl Read) -> Result<Self, ConnectionError>
    where
        Self: Sized,
    {
        Ok(Self {
            id: reader.decode()?,
        })
    }
}

impl ClientboundPacket for KeepAlive {
    const CLIENTBOUND_ID: i32 = 0x1F;

    fn packet_write(&self, mut writer: impl Write) -> Result<(), ConnectionError> {
        writer.encode(self.id)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct PlayerPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub on_ground: bool,
}

impl ServerboundPacket for PlayerPosition {
    const SERVERBOUND_ID: i32 = 0x0C;

    fn packet_read(mut reader: impl Read) -> Result<Self, ConnectionError>
    where
        Self: Sized,
    {
        Ok(Self {
            x: reader.decode()?,
            y: reader.decode()?,
            z: reader.decode()?,
            on_ground: reader.decode()?,
        })
    }
}

#[derive(Debug)]
pub struct PlayerPositionLook {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl ServerboundPacket for PlayerPositionLook {
    const SERVERBOUND_ID: i32 = 0x0D;

    fn packet_read(mut reader: impl Read) -> Result<Self, ConnectionError>
    where
        Self: Sized,
    {
        Ok(Self {
            x: reader.decode()?,
            y: reader.decode()?,
            z: reader.decode()?,
            yaw: reader.decode()?,
            pitch: reader.decode()?,
            on_ground: reader.decode()?,
        })
    }
}

#[derive(Debug)]
pub struct PlayerLook {
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl ServerboundPacket for PlayerLook {
    const SERVERBOUND_ID: i32 = 0x0E;

    fn packet_read(mut reader: impl Read) -> Result<Self, ConnectionError>
    where
        Self: Sized,
    {
        Ok(Self {
            yaw: reader.decode()?,
            pitch: reader.decode()?,
            on_ground: reader.decode()?,
        })
    }
}

#[derive(Debug)]
pub struct PlayerOnGround {
    pub on_ground: bool,
}

impl ServerboundPacket for PlayerOnGround {
    const SERVERBOUND_ID: i32 = 0x0F;

    fn packet_read(mut reader: impl Read) -> Result<Self, ConnectionError>
    where
        Self: Sized,
    {
        Ok(Self {
            on_ground: reader.decode()?,
        })
    }
}

serverbound_packet_enum!(pub PlayPacket;
    TeleportConfirm, TeleportConfirm;
    ClientStatus, ClientStatus;
    ClientSettings, ClientSettings;
    PluginMessage, PluginMessage;
    KeepAlive, KeepAlive;
    PlayerPosition, Position;
    PlayerPositionLook, PositionLook;
    PlayerLook, Look;
    PlayerOnGround, OnGround;
);

// -- Clientbound --

#[derive(Debug)]
pub struct ServerDifficulty {
    pub difficulty: u8,
}

impl ClientboundPacket for ServerDifficulty {
    const CLIENTBOUND_ID: i32 = 0x0D;

    fn packet_write(&self, mut writer: impl Write) -> Result<(), ConnectionError> {
        writer.encode(self.difficulty)?;
        Ok(())
    }
}

/// Kicks a playing client; the reason is a JSON chat component.
#[derive(Debug)]
pub struct Disconnect {
    pub reason: String,
}

impl ClientboundPacket for Disconnect {
    const CLIENTBOUND_ID: i32 = 0x1A;

    fn packet_write(&self, mut writer: impl Write) -> Result<(), ConnectionError> {
        writer.encode(&serde_json::json!({ "text": self.reason }).to_string())?;
        Ok(())
    }
}

/// Prepared chunk column: `data` is the concatenated section payloads
/// followed by the biome bytes, exactly what the size field counts.
#[derive(Debug)]
pub struct ChunkData {
    pub chunk_x: i32,
    pub chunk_z: i32,
    pub primary_bit_mask: i32,
    pub data: Box<[u8]>,
}

impl ClientboundPacket for ChunkData {
    const CLIENTBOUND_ID: i32 = 0x20;

    fn packet_write(&self, mut writer: impl Write) -> Result<(), ConnectionError> {
        writer.write_all(&self.chunk_x.to_be_bytes())?;
        writer.write_all(&self.chunk_z.to_be_bytes())?;
        // Ground-up continuous; this server only ever sends whole columns.
        writer.encode(true)?;
        writer.encode(self.primary_bit_mask)?;
        writer.encode(self.data.len() as i32)?;
        writer.write_all(&self.data)?;
        // Zero tile entities, but the count is always present.
        writer.encode(0i32)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct JoinGame {
    pub entity_id: i32,
    pub gamemode: u8,
    pub dimension: i8,
    pub difficulty: u8,
    pub max_players: u8,
    pub level_type: String,
    pub reduced_debug_info: bool,
}

impl ClientboundPacket for JoinGame {
    const CLIENTBOUND_ID: i32 = 0x23;

    fn packet_write(&self, mut writer: impl Write) -> Result<(), ConnectionError> {
        writer.write_all(&self.entity_id.to_be_bytes())?;
        writer.encode(self.gamemode)?;
        writer.encode(self.dimension)?;
        writer.encode(self.difficulty)?;
        writer.encode(self.max_players)?;
        writer.encode(&self.level_type)?;
        writer.encode(self.reduced_debug_info)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct PlayerAbilities {
    pub flags: i8,
    pub flying_speed: f32,
    pub walking_speed: f32,
}

impl PlayerAbilities {
    pub const INVULNERABLE: i8 = 0x01;
    pub const FLYING: i8 = 0x02;
    pub const ALLOW_FLYING: i8 = 0x04;
    pub const CREATIVE_MODE: i8 = 0x08;
}

impl ClientboundPacket for PlayerAbilities {
    const CLIENTBOUND_ID: i32 = 0x2B;

    fn packet_write(&self, mut writer: impl Write) -> Result<(), ConnectionError> {
        writer.encode(self.flags)?;
        writer.encode(self.flying_speed)?;
        writer.encode(self.walking_speed)?;
        Ok(())
    }
}

/// Server-authoritative position update. Every send carries a fresh
/// teleport id that the client acknowledges with [`TeleportConfirm`].
#[derive(Debug)]
pub struct PlayerPositionAndLook {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub flags: i8,
    pub teleport_id: i32,
}

impl ClientboundPacket for PlayerPositionAndLook {
    const CLIENTBOUND_ID: i32 = 0x2E;

    fn packet_write(&self, mut writer: impl Write) -> Result<(), ConnectionError> {
        writer.encode(self.x)?;
        writer.encode(self.y)?;
        writer.encode(self.z)?;
        writer.encode(self.yaw)?;
        writer.encode(self.pitch)?;
        writer.encode(self.flags)?;
        writer.encode(self.teleport_id)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct SpawnPosition {
    pub position: Position,
}

impl ClientboundPacket for SpawnPosition {
    const CLIENTBOUND_ID: i32 = 0x43;

    fn packet_write(&self, mut writer: impl Write) -> Result<(), ConnectionError> {
        writer.encode(&self.position)?;
        Ok(())
    }
}
