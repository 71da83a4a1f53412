use std::fmt;

use sha1::{Digest as _, Sha1};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Invalid UUID string \"{0}\"")]
pub struct UUIDParseError(String);

#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
pub struct UUID(pub [u8; 16]);

impl UUID {
    /// Random UUID, used for entities that were never persisted.
    pub fn new_v4() -> Self {
        let mut bytes: [u8; 16] = rand::random();
        bytes[6] = (bytes[6] & 0x0F) | 0x40;
        bytes[8] = (bytes[8] & 0x3F) | 0x80;
        Self(bytes)
    }

    /// Name-based UUID (SHA-1), used for offline players.
    pub fn new_v5(namespace: &UUID, name: &str) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(namespace.0);
        hasher.update(name.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        bytes[6] = (bytes[6] & 0x0F) | 0x50;
        bytes[8] = (bytes[8] & 0x3F) | 0x80;
        Self(bytes)
    }

    /// The two signed 64-bit halves used for NBT persistence (UUIDMost, UUIDLeast).
    pub fn halves(&self) -> (i64, i64) {
        (
            i64::from_be_bytes(self.0[..8].try_into().unwrap()),
            i64::from_be_bytes(self.0[8..].try_into().unwrap()),
        )
    }

    pub fn from_halves(most: i64, least: i64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&most.to_be_bytes());
        bytes[8..].copy_from_slice(&least.to_be_bytes());
        Self(bytes)
    }
}

impl TryFrom<&str> for UUID {
    type Error = UUIDParseError;

    /// Parses both dashed and undashed forms (Mojang APIs return undashed).
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let hex: String = value.chars().filter(|c| *c != '-').collect();
        if hex.len() != 32 {
            return Err(UUIDParseError(value.to_owned()));
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| UUIDParseError(value.to_owned()))?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for UUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3],
            self.0[4], self.0[5],
            self.0[6], self.0[7],
            self.0[8], self.0[9],
            self.0[10], self.0[11], self.0[12], self.0[13], self.0[14], self.0[15],
        )
    }
}

#[cfg(test)]
mod test {
    use super::UUID;

    #[test]
    fn parse_display_roundtrip() {
        let uuid = UUID::try_from("a71dca7e-c0f6-4399-935f-a818651f6a36").unwrap();
        assert_eq!(uuid.to_string(), "a71dca7e-c0f6-4399-935f-a818651f6a36");
        let undashed = UUID::try_from("a71dca7ec0f64399935fa818651f6a36").unwrap();
        assert_eq!(uuid, undashed);
        assert!(UUID::try_from("not-a-uuid").is_err());
    }

    #[test]
    fn halves_roundtrip() {
        let uuid = UUID::new_v4();
        let (most, least) = uuid.halves();
        assert_eq!(UUID::from_halves(most, least), uuid);
    }

    #[test]
    fn v5_is_deterministic() {
        let namespace = UUID::try_from("a71dca7e-c0f6-4399-935f-a818651f6a36").unwrap();
        let a = UUID::new_v5(&namespace, "Notch");
        let b = UUID::new_v5(&namespace, "Notch");
        assert_eq!(a, b);
        assert_ne!(a, UUID::new_v5(&namespace, "jeb_"));
        assert_eq!(a.0[6] >> 4, 5);
    }
}
