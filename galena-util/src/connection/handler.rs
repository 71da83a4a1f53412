use std::io::Write as _;

use thiserror::Error;

use crate::ReadExt as _;

use super::{PacketDecoder as _, PacketEncoder as _};

#[derive(Debug, Error)]
pub enum PacketHandlerError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Zlib compression level must be inside range 0..=9, but got {0}")]
    InvalidZlibCompressionLevel(u32),
    #[error("Packet too small for compression ({size} < {threshold})")]
    PacketBelowThreshold { size: usize, threshold: usize },
    #[error("Inflated packet size mismatch (expected {expected}, got {got})")]
    InflatedSizeMismatch { expected: usize, got: usize },
}

/// Framing applied between the outer length prefix and the id‖payload body.
///
/// Uncompressed: the body follows the outer length directly. Zlib: an inner
/// varint carries the uncompressed body size (0 means the body is literal,
/// used for bodies below the threshold).
#[derive(Debug, Clone)]
pub enum PacketHandler {
    Uncompressed,
    Zlib {
        threshold: usize,
        /// MUST be in range 0..=9
        compression_level: u32,
    },
}

impl PacketHandler {
    pub fn new_zlib(threshold: usize, compression_level: u32) -> Result<Self, PacketHandlerError> {
        if compression_level > 9 {
            return Err(PacketHandlerError::InvalidZlibCompressionLevel(
                compression_level,
            ));
        }
        Ok(Self::Zlib {
            threshold,
            compression_level,
        })
    }

    pub fn write(&self, raw: &[u8]) -> Result<Box<[u8]>, PacketHandlerError> {
        match self {
            PacketHandler::Uncompressed => Ok(raw.to_owned().into_boxed_slice()),
            PacketHandler::Zlib {
                threshold,
                compression_level,
            } => {
                let mut writer = Vec::new();
                if raw.len() < *threshold {
                    writer.encode(0)?;
                    writer.write_all(raw)?;
                } else {
                    let mut encoder = flate2::write::ZlibEncoder::new(
                        Vec::new(),
                        flate2::Compression::new(*compression_level),
                    );
                    encoder.write_all(raw)?;
                    let compressed = encoder.finish()?;

                    writer.encode(raw.len() as i32)?;
                    writer.write_all(&compressed)?;
                }
                Ok(writer.into_boxed_slice())
            }
        }
    }

    pub fn read(&self, buf: &[u8]) -> Result<Box<[u8]>, PacketHandlerError> {
        match self {
            PacketHandler::Uncompressed => Ok(buf.to_owned().into_boxed_slice()),
            PacketHandler::Zlib { threshold, .. } => {
                let mut reader = std::io::Cursor::new(buf);
                match reader.decode::<i32>()? {
                    0 => Ok(reader.read_all()?),
                    size => {
                        let size = size as usize;
                        if size < *threshold {
                            return Err(PacketHandlerError::PacketBelowThreshold {
                                size,
                                threshold: *threshold,
                            });
                        }
                        let inflated = flate2::read::ZlibDecoder::new(reader).read_all()?;
                        if inflated.len() != size {
                            return Err(PacketHandlerError::InflatedSizeMismatch {
                                expected: size,
                                got: inflated.len(),
                            });
                        }
                        Ok(inflated)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{PacketHandler, PacketHandlerError};

    #[test]
    fn small_body_is_sent_literal() {
        let handler = PacketHandler::new_zlib(256, 6).unwrap();
        let body = [0x2A; 10];
        let encoded = handler.write(&body).unwrap();
        // Inner raw-length varint of zero, then the literal body.
        assert_eq!(encoded[0], 0x00);
        assert_eq!(&encoded[1..], &body);
        assert_eq!(&*handler.read(&encoded).unwrap(), &body);
    }

    #[test]
    fn large_body_is_deflated() {
        let handler = PacketHandler::new_zlib(16, 6).unwrap();
        let body = [0x55; 512];
        let encoded = handler.write(&body).unwrap();
        assert_ne!(encoded[0], 0x00);
        assert!(encoded.len() < body.len());
        assert_eq!(&*handler.read(&encoded).unwrap(), &body);
    }

    #[test]
    fn declared_size_below_threshold_is_rejected() {
        let handler = PacketHandler::new_zlib(256, 6).unwrap();
        // A frame claiming a nonzero uncompressed size below the threshold
        // must fail, whatever its payload inflates to.
        let small = PacketHandler::new_zlib(4, 6).unwrap();
        let encoded = small.write(&[0x55; 10]).unwrap();
        assert!(matches!(
            handler.read(&encoded),
            Err(PacketHandlerError::PacketBelowThreshold { size: 10, threshold: 256 })
        ));
    }

    #[test]
    fn inflated_size_must_match() {
        let sender = PacketHandler::new_zlib(4, 6).unwrap();
        let receiver = PacketHandler::new_zlib(4, 6).unwrap();
        let mut encoded = sender.write(&[0x55; 64]).unwrap().to_vec();
        // Corrupt the declared uncompressed size (64 -> 65).
        assert_eq!(encoded[0], 64);
        encoded[0] = 65;
        assert!(matches!(
            receiver.read(&encoded),
            Err(PacketHandlerError::InflatedSizeMismatch { expected: 65, got: 64 })
        ));
    }

    #[test]
    fn invalid_compression_level() {
        assert!(matches!(
            PacketHandler::new_zlib(256, 10),
            Err(PacketHandlerError::InvalidZlibCompressionLevel(10))
        ));
    }
}
