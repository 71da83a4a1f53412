use std::io::{Read, Write};

pub const VARINT_MAX_BYTES: usize = 5;
pub const VARLONG_MAX_BYTES: usize = 10;

fn too_long(name: &str) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("{} too long", name),
    )
}

pub fn write_varint(mut writer: impl Write, value: i32) -> std::io::Result<()> {
    let mut value = value as u32;
    loop {
        let mut byte = value as u8 & 0x7F;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        writer.write_all(&[byte])?;
        if value == 0 {
            break;
        }
    }
    Ok(())
}

pub fn write_varlong(mut writer: impl Write, value: i64) -> std::io::Result<()> {
    let mut value = value as u64;
    loop {
        let mut byte = value as u8 & 0x7F;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        writer.write_all(&[byte])?;
        if value == 0 {
            break;
        }
    }
    Ok(())
}

/// Encoded length in bytes, derived from the unsigned magnitude. Callers use
/// this to subtract the packet-id length from a pre-read total length.
pub const fn varint_size(value: i32) -> usize {
    let bits = 32 - (value as u32).leading_zeros() as usize;
    if bits == 0 { 1 } else { (bits + 6) / 7 }
}

pub const fn varlong_size(value: i64) -> usize {
    let bits = 64 - (value as u64).leading_zeros() as usize;
    if bits == 0 { 1 } else { (bits + 6) / 7 }
}

pub fn read_varint_ret_bytes(mut reader: impl Read) -> std::io::Result<(usize, i32)> {
    let mut bytes = 0;
    let mut value: u32 = 0;
    loop {
        let mut buf = [0u8; 1];
        reader.read_exact(&mut buf)?;
        let byte = buf[0];
        value |= ((byte & 0x7F) as u32) << (bytes * 7);
        bytes += 1;
        if byte & 0x80 == 0 {
            break;
        }
        if bytes >= VARINT_MAX_BYTES {
            return Err(too_long("VarInt"));
        }
    }
    Ok((bytes, value as i32))
}

pub fn read_varint(reader: impl Read) -> std::io::Result<i32> {
    Ok(read_varint_ret_bytes(reader)?.1)
}

pub fn read_varlong(mut reader: impl Read) -> std::io::Result<i64> {
    let mut bytes = 0;
    let mut value: u64 = 0;
    loop {
        let mut buf = [0u8; 1];
        reader.read_exact(&mut buf)?;
        let byte = buf[0];
        value |= ((byte & 0x7F) as u64) << (bytes * 7);
        bytes += 1;
        if byte & 0x80 == 0 {
            break;
        }
        if bytes >= VARLONG_MAX_BYTES {
            return Err(too_long("VarLong"));
        }
    }
    Ok(value as i64)
}

/// Reads a varint from a buffer that may not yet hold all of its bytes;
/// `None` means "wait for more data".
pub fn try_read_varint_ret_bytes(data: &[u8]) -> std::io::Result<Option<(usize, i32)>> {
    match read_varint_ret_bytes(data) {
        Ok(varint) => Ok(Some(varint)),
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn encode_varint(value: i32) -> Vec<u8> {
        let mut writer = Vec::new();
        write_varint(&mut writer, value).unwrap();
        writer
    }

    fn encode_varlong(value: i64) -> Vec<u8> {
        let mut writer = Vec::new();
        write_varlong(&mut writer, value).unwrap();
        writer
    }

    #[test]
    #[rustfmt::skip]
    fn varint_known_encodings() {
        assert_eq!(encode_varint(0), &[0x00]);
        assert_eq!(encode_varint(42), &[0x2A]);
        assert_eq!(encode_varint(127), &[0x7F]);
        assert_eq!(encode_varint(128), &[0x80, 0x01]);
        assert_eq!(encode_varint(300), &[0xAC, 0x02]);
        assert_eq!(encode_varint(25565), &[0xDD, 0xC7, 0x01]);
        assert_eq!(encode_varint(2147483647), &[0xFF, 0xFF, 0xFF, 0xFF, 0x07]);
        assert_eq!(encode_varint(-1), &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(encode_varint(-2147483648), &[0x80, 0x80, 0x80, 0x80, 0x08]);
    }

    #[test]
    fn varint_roundtrip_and_size() {
        for value in [
            0, 1, 2, 127, 128, 255, 300, 25565, 2097151, 2147483647, -1, -255, -2147483648,
        ] {
            let encoded = encode_varint(value);
            assert_eq!(encoded.len(), varint_size(value));
            let (bytes, decoded) = read_varint_ret_bytes(std::io::Cursor::new(&encoded)).unwrap();
            assert_eq!(bytes, encoded.len());
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn varlong_roundtrip_and_size() {
        for value in [
            0i64,
            1,
            127,
            128,
            2147483647,
            9223372036854775807,
            -1,
            -2147483648,
            -9223372036854775808,
        ] {
            let encoded = encode_varlong(value);
            assert_eq!(encoded.len(), varlong_size(value));
            assert_eq!(
                read_varlong(std::io::Cursor::new(&encoded)).unwrap(),
                value
            );
        }
        assert_eq!(
            encode_varlong(-1),
            &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]
        );
    }

    #[test]
    fn varint_too_long() {
        let err = read_varint(std::io::Cursor::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]))
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        let err =
            read_varlong(std::io::Cursor::new(&[0xFF; 11])).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn varint_partial_buffer() {
        assert_eq!(try_read_varint_ret_bytes(&[0x80]).unwrap(), None);
        assert_eq!(try_read_varint_ret_bytes(&[]).unwrap(), None);
        assert_eq!(try_read_varint_ret_bytes(&[0xAC, 0x02]).unwrap(), Some((2, 300)));
    }
}
