use std::io::{Read, Write};

use crate::ReadExt as _;

pub trait PacketEncodable {
    fn packet_encode(self, writer: impl Write) -> std::io::Result<()>;
}

pub trait PacketDecodable
where
    Self: Sized,
{
    fn packet_decode(reader: impl Read) -> std::io::Result<Self>;
}

pub trait PacketEncoder {
    fn encode<V: PacketEncodable>(&mut self, value: V) -> std::io::Result<()>;
}

impl<W: Write> PacketEncoder for W {
    fn encode<V: PacketEncodable>(&mut self, value: V) -> std::io::Result<()> {
        value.packet_encode(self)
    }
}

pub trait PacketDecoder {
    fn decode<V: PacketDecodable>(&mut self) -> std::io::Result<V>;
}

impl<R: Read> PacketDecoder for R {
    fn decode<V: PacketDecodable>(&mut self) -> std::io::Result<V> {
        V::packet_decode(self)
    }
}

// Wire primitives. VarInt-encoded i32 / VarLong-encoded i64 are the protocol
// default; packets needing fixed-width integers write `to_be_bytes` directly.

impl PacketEncodable for bool {
    fn packet_encode(self, mut writer: impl Write) -> std::io::Result<()> {
        writer.write_all(&[self as u8])
    }
}

impl PacketDecodable for bool {
    fn packet_decode(mut reader: impl Read) -> std::io::Result<Self> {
        match reader.read_const::<1>()? {
            [0] => Ok(false),
            [1] => Ok(true),
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "Boolean must be either 0 or 1",
            )),
        }
    }
}

impl PacketEncodable for u8 {
    fn packet_encode(self, mut writer: impl Write) -> std::io::Result<()> {
        writer.write_all(&[self])
    }
}

impl PacketDecodable for u8 {
    fn packet_decode(mut reader: impl Read) -> std::io::Result<Self> {
        Ok(reader.read_const::<1>()?[0])
    }
}

impl PacketEncodable for i8 {
    fn packet_encode(self, mut writer: impl Write) -> std::io::Result<()> {
        writer.write_all(&self.to_be_bytes())
    }
}

impl PacketDecodable for i8 {
    fn packet_decode(mut reader: impl Read) -> std::io::Result<Self> {
        Ok(i8::from_be_bytes(reader.read_const()?))
    }
}

impl PacketEncodable for u16 {
    fn packet_encode(self, mut writer: impl Write) -> std::io::Result<()> {
        writer.write_all(&self.to_be_bytes())
    }
}

impl PacketDecodable for u16 {
    fn packet_decode(mut reader: impl Read) -> std::io::Result<Self> {
        Ok(u16::from_be_bytes(reader.read_const()?))
    }
}

impl PacketEncodable for i16 {
    fn packet_encode(self, mut writer: impl Write) -> std::io::Result<()> {
        writer.write_all(&self.to_be_bytes())
    }
}

impl PacketDecodable for i16 {
    fn packet_decode(mut reader: impl Read) -> std::io::Result<Self> {
        Ok(i16::from_be_bytes(reader.read_const()?))
    }
}

impl PacketEncodable for i32 {
    fn packet_encode(self, writer: impl Write) -> std::io::Result<()> {
        super::varint::write_varint(writer, self)
    }
}

impl PacketDecodable for i32 {
    fn packet_decode(reader: impl Read) -> std::io::Result<Self> {
        super::varint::read_varint(reader)
    }
}

impl PacketEncodable for i64 {
    fn packet_encode(self, writer: impl Write) -> std::io::Result<()> {
        super::varint::write_varlong(writer, self)
    }
}

impl PacketDecodable for i64 {
    fn packet_decode(reader: impl Read) -> std::io::Result<Self> {
        super::varint::read_varlong(reader)
    }
}

impl PacketEncodable for f32 {
    fn packet_encode(self, mut writer: impl Write) -> std::io::Result<()> {
        writer.write_all(&self.to_be_bytes())
    }
}

impl PacketDecodable for f32 {
    fn packet_decode(mut reader: impl Read) -> std::io::Result<Self> {
        Ok(f32::from_be_bytes(reader.read_const()?))
    }
}

impl PacketEncodable for f64 {
    fn packet_encode(self, mut writer: impl Write) -> std::io::Result<()> {
        writer.write_all(&self.to_be_bytes())
    }
}

impl PacketDecodable for f64 {
    fn packet_decode(mut reader: impl Read) -> std::io::Result<Self> {
        Ok(f64::from_be_bytes(reader.read_const()?))
    }
}

impl PacketEncodable for &str {
    fn packet_encode(self, mut writer: impl Write) -> std::io::Result<()> {
        writer.encode(self.len() as i32)?;
        writer.write_all(self.as_bytes())
    }
}

impl PacketEncodable for &String {
    fn packet_encode(self, writer: impl Write) -> std::io::Result<()> {
        self.as_str().packet_encode(writer)
    }
}

impl PacketDecodable for String {
    fn packet_decode(mut reader: impl Read) -> std::io::Result<Self> {
        let length: i32 = reader.decode()?;
        let buf = reader.read_var(length as usize)?;
        String::from_utf8(buf.to_vec())
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }
}

/// Length-prefixed byte array.
impl PacketEncodable for &[u8] {
    fn packet_encode(self, mut writer: impl Write) -> std::io::Result<()> {
        writer.encode(self.len() as i32)?;
        writer.write_all(self)
    }
}

impl PacketDecodable for Box<[u8]> {
    fn packet_decode(mut reader: impl Read) -> std::io::Result<Self> {
        let length: i32 = reader.decode()?;
        reader.read_var(length as usize)
    }
}

impl<T: PacketEncodable> PacketEncodable for Option<T> {
    fn packet_encode(self, mut writer: impl Write) -> std::io::Result<()> {
        match self {
            None => writer.encode(false),
            Some(inner) => {
                writer.encode(true)?;
                writer.encode(inner)
            }
        }
    }
}

impl<T: PacketDecodable> PacketDecodable for Option<T> {
    fn packet_decode(mut reader: impl Read) -> std::io::Result<Self> {
        reader
            .decode::<bool>()?
            .then(|| reader.decode())
            .transpose()
    }
}

impl PacketEncodable for &crate::Vec3<f64> {
    fn packet_encode(self, mut writer: impl Write) -> std::io::Result<()> {
        writer.encode(self.x)?;
        writer.encode(self.y)?;
        writer.encode(self.z)
    }
}

impl PacketDecodable for crate::Vec3<f64> {
    fn packet_decode(mut reader: impl Read) -> std::io::Result<Self> {
        Ok(Self::new(reader.decode()?, reader.decode()?, reader.decode()?))
    }
}

#[cfg(test)]
mod test {
    use super::{PacketDecoder as _, PacketEncoder as _};

    #[test]
    fn string_roundtrip() {
        for s in ["", "galena", "ünïcødé ⛏", "日本語テスト"] {
            let mut buf = Vec::new();
            buf.encode(s).unwrap();
            let mut reader = std::io::Cursor::new(&buf);
            assert_eq!(reader.decode::<String>().unwrap(), s);
        }
    }

    #[test]
    fn string_invalid_utf8() {
        let mut buf = Vec::new();
        buf.encode(2i32).unwrap();
        buf.extend([0xC0, 0x80]);
        let mut reader = std::io::Cursor::new(&buf);
        assert!(reader.decode::<String>().is_err());
    }

    #[test]
    fn byte_array_roundtrip() {
        let data: &[u8] = &[0x00, 0xFF, 0x10, 0x20];
        let mut buf = Vec::new();
        buf.encode(data).unwrap();
        let mut reader = std::io::Cursor::new(&buf);
        assert_eq!(&*reader.decode::<Box<[u8]>>().unwrap(), data);
    }
}
