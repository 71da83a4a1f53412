pub mod item;
pub mod packet;

/// Protocol 107, game version 1.9.
pub const PROTOCOL_VERSION: i32 = 107;
pub const PROTOCOL_NAME: &str = "1.9";
