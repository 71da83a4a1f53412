mod de;

use std::{
    collections::HashMap,
    io::{Read, Write},
};

use thiserror::Error;

use crate::ReadExt as _;

pub use de::{bool_from_byte, from_nbt, opt_bool_from_byte};

#[derive(Error, Debug)]
pub enum NBTError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    FromUtf8Error(#[from] std::string::FromUtf8Error),
    #[error("NBT invalid tag value {0}")]
    InvalidTagValue(u8),
    #[error("NBT unexpected end tag")]
    UnexpectedEnd,
    #[error("NBT could not write list with mixed element types")]
    InvalidList,
    #[error("NBT error while deserializing: {0}")]
    DeserializeError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NBTTag {
    End,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    ByteArray,
    String,
    List,
    Compound,
    IntArray,
    LongArray,
}

impl TryFrom<u8> for NBTTag {
    type Error = NBTError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(NBTTag::End),
            1 => Ok(NBTTag::Byte),
            2 => Ok(NBTTag::Short),
            3 => Ok(NBTTag::Int),
            4 => Ok(NBTTag::Long),
            5 => Ok(NBTTag::Float),
            6 => Ok(NBTTag::Double),
            7 => Ok(NBTTag::ByteArray),
            8 => Ok(NBTTag::String),
            9 => Ok(NBTTag::List),
            10 => Ok(NBTTag::Compound),
            11 => Ok(NBTTag::IntArray),
            12 => Ok(NBTTag::LongArray),
            _ => Err(NBTError::InvalidTagValue(value)),
        }
    }
}

impl From<NBTTag> for u8 {
    fn from(val: NBTTag) -> Self {
        match val {
            NBTTag::End => 0,
            NBTTag::Byte => 1,
            NBTTag::Short => 2,
            NBTTag::Int => 3,
            NBTTag::Long => 4,
            NBTTag::Float => 5,
            NBTTag::Double => 6,
            NBTTag::ByteArray => 7,
            NBTTag::String => 8,
            NBTTag::List => 9,
            NBTTag::Compound => 10,
            NBTTag::IntArray => 11,
            NBTTag::LongArray => 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NBT {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    List(Vec<NBT>),
    Compound(HashMap<String, NBT>),
    ByteArray(Box<[i8]>),
    IntArray(Box<[i32]>),
    LongArray(Box<[i64]>),
}

macro_rules! nbt_from {
    ($type:ty, $ident:ident) => {
        impl From<$type> for NBT {
            fn from(value: $type) -> Self {
                Self::$ident(value)
            }
        }
    };
}

nbt_from!(i8, Byte);
nbt_from!(i16, Short);
nbt_from!(i32, Int);
nbt_from!(i64, Long);
nbt_from!(f32, Float);
nbt_from!(f64, Double);
nbt_from!(String, String);
nbt_from!(Box<[i8]>, ByteArray);
nbt_from!(Box<[i32]>, IntArray);
nbt_from!(Box<[i64]>, LongArray);

impl From<&str> for NBT {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<bool> for NBT {
    fn from(value: bool) -> Self {
        Self::Byte(value as i8)
    }
}

impl<T: Into<NBT>> From<Vec<T>> for NBT {
    fn from(value: Vec<T>) -> Self {
        NBT::List(value.into_iter().map(|v| v.into()).collect())
    }
}

#[macro_export]
macro_rules! nbt_compound {
    [$($name:expr => $value:expr,)*] => {
        $crate::nbt::NBT::Compound(
            [
                $(
                    ($name.to_string(), $crate::nbt::NBT::from($value)),
                )*
            ].into_iter().collect::<std::collections::HashMap<String, $crate::nbt::NBT>>()
        )
    };
}

impl NBT {
    /// Empty NBT compound.
    pub fn empty() -> Self {
        Self::Compound(HashMap::new())
    }

    fn tag(&self) -> NBTTag {
        match self {
            NBT::Byte(..) => NBTTag::Byte,
            NBT::Short(..) => NBTTag::Short,
            NBT::Int(..) => NBTTag::Int,
            NBT::Long(..) => NBTTag::Long,
            NBT::Float(..) => NBTTag::Float,
            NBT::Double(..) => NBTTag::Double,
            NBT::String(..) => NBTTag::String,
            NBT::List(..) => NBTTag::List,
            NBT::Compound(..) => NBTTag::Compound,
            NBT::ByteArray(..) => NBTTag::ByteArray,
            NBT::IntArray(..) => NBTTag::IntArray,
            NBT::LongArray(..) => NBTTag::LongArray,
        }
    }

    pub fn get(&self, key: &str) -> Option<&NBT> {
        match self {
            NBT::Compound(compound) => compound.get(key),
            _ => None,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<NBT>) {
        if let NBT::Compound(compound) = self {
            compound.insert(key.into(), value.into());
        }
    }

    fn read_tag(data: &mut impl Read, tag: NBTTag) -> Result<NBT, NBTError> {
        match tag {
            NBTTag::End => Err(NBTError::UnexpectedEnd),
            NBTTag::Byte => Ok(NBT::Byte(i8::from_be_bytes(data.read_const()?))),
            NBTTag::Short => Ok(NBT::Short(i16::from_be_bytes(data.read_const()?))),
            NBTTag::Int => Ok(NBT::Int(i32::from_be_bytes(data.read_const()?))),
            NBTTag::Long => Ok(NBT::Long(i64::from_be_bytes(data.read_const()?))),
            NBTTag::Float => Ok(NBT::Float(f32::from_be_bytes(data.read_const()?))),
            NBTTag::Double => Ok(NBT::Double(f64::from_be_bytes(data.read_const()?))),
            NBTTag::ByteArray => {
                let length = i32::from_be_bytes(data.read_const()?) as usize;
                let bytes = data.read_var(length)?;
                Ok(NBT::ByteArray(
                    bytes.iter().map(|b| *b as i8).collect::<Vec<_>>().into(),
                ))
            }
            NBTTag::String => Ok(NBT::String(Self::read_string(data)?)),
            NBTTag::List => {
                let tag = NBTTag::try_from(u8::from_be_bytes(data.read_const()?))?;
                let length = i32::from_be_bytes(data.read_const()?).max(0);
                if tag == NBTTag::End {
                    return Ok(NBT::List(Vec::new()));
                }
                Ok(NBT::List(
                    (0..length)
                        .map(|_| NBT::read_tag(data, tag))
                        .collect::<Result<Vec<_>, _>>()?,
                ))
            }
            NBTTag::Compound => {
                let mut compound = HashMap::new();
                loop {
                    let tag = NBTTag::try_from(u8::from_be_bytes(data.read_const()?))?;
                    if tag == NBTTag::End {
                        break;
                    }
                    let name = Self::read_string(data)?;
                    compound.insert(name, NBT::read_tag(data, tag)?);
                }
                Ok(NBT::Compound(compound))
            }
            NBTTag::IntArray => Ok(NBT::IntArray(
                (0..i32::from_be_bytes(data.read_const()?))
                    .map(|_| Ok(i32::from_be_bytes(data.read_const()?)))
                    .collect::<Result<Vec<_>, std::io::Error>>()?
                    .into(),
            )),
            NBTTag::LongArray => Ok(NBT::LongArray(
                (0..i32::from_be_bytes(data.read_const()?))
                    .map(|_| Ok(i64::from_be_bytes(data.read_const()?)))
                    .collect::<Result<Vec<_>, std::io::Error>>()?
                    .into(),
            )),
        }
    }

    fn read_string(data: &mut impl Read) -> Result<String, NBTError> {
        let length = u16::from_be_bytes(data.read_const()?) as usize;
        Ok(String::from_utf8(data.read_var(length)?.to_vec())?)
    }

    /// Reads a named root tag, optionally gzip-wrapped (level.dat and player
    /// data files are; region chunk payloads are not).
    pub fn read(mut data: impl Read, compressed: bool) -> Result<(String, NBT), NBTError> {
        if compressed {
            Self::read_root(&mut flate2::read::GzDecoder::new(data))
        } else {
            Self::read_root(&mut data)
        }
    }

    fn read_root(data: &mut impl Read) -> Result<(String, NBT), NBTError> {
        let tag = NBTTag::try_from(u8::from_be_bytes(data.read_const()?))?;
        let name = Self::read_string(data)?;
        Ok((name, NBT::read_tag(data, tag)?))
    }

    /// Network variant: root tag carries no name.
    pub fn read_network(mut data: impl Read) -> Result<NBT, NBTError> {
        let tag = NBTTag::try_from(u8::from_be_bytes(data.read_const()?))?;
        NBT::read_tag(&mut data, tag)
    }

    /// Named root where a single End tag byte stands for "no value"; used
    /// for the optional NBT trailing an item slot.
    pub fn read_optional(mut data: impl Read) -> Result<Option<(String, NBT)>, NBTError> {
        let tag = NBTTag::try_from(u8::from_be_bytes(data.read_const()?))?;
        if tag == NBTTag::End {
            return Ok(None);
        }
        let name = Self::read_string(&mut data)?;
        Ok(Some((name, NBT::read_tag(&mut data, tag)?)))
    }

    fn write_tag(
        &self,
        name: Option<&str>,
        with_tag: bool,
        data: &mut impl Write,
    ) -> Result<(), NBTError> {
        if with_tag {
            data.write_all(&[u8::from(self.tag())])?;
        }
        if let Some(name) = name {
            data.write_all(&(name.len() as u16).to_be_bytes())?;
            data.write_all(name.as_bytes())?;
        }
        match self {
            NBT::Byte(byte) => data.write_all(&byte.to_be_bytes())?,
            NBT::Short(short) => data.write_all(&short.to_be_bytes())?,
            NBT::Int(int) => data.write_all(&int.to_be_bytes())?,
            NBT::Long(long) => data.write_all(&long.to_be_bytes())?,
            NBT::Float(float) => data.write_all(&float.to_be_bytes())?,
            NBT::Double(double) => data.write_all(&double.to_be_bytes())?,
            NBT::String(string) => {
                data.write_all(&(string.len() as u16).to_be_bytes())?;
                data.write_all(string.as_bytes())?;
            }
            NBT::List(list) => {
                let tag = match list.first() {
                    None => NBTTag::End,
                    Some(first) => {
                        let tag = first.tag();
                        if list.iter().any(|item| item.tag() != tag) {
                            return Err(NBTError::InvalidList);
                        }
                        tag
                    }
                };
                data.write_all(&[u8::from(tag)])?;
                data.write_all(&(list.len() as i32).to_be_bytes())?;
                for item in list.iter() {
                    item.write_tag(None, false, data)?;
                }
            }
            NBT::Compound(compound) => {
                for (key, value) in compound.iter() {
                    value.write_tag(Some(key), true, data)?;
                }
                data.write_all(&[u8::from(NBTTag::End)])?;
            }
            NBT::ByteArray(bytes) => {
                data.write_all(&(bytes.len() as i32).to_be_bytes())?;
                data.write_all(&bytes.iter().map(|b| *b as u8).collect::<Vec<_>>())?;
            }
            NBT::IntArray(ints) => {
                data.write_all(&(ints.len() as i32).to_be_bytes())?;
                for int in ints.iter() {
                    data.write_all(&int.to_be_bytes())?;
                }
            }
            NBT::LongArray(longs) => {
                data.write_all(&(longs.len() as i32).to_be_bytes())?;
                for long in longs.iter() {
                    data.write_all(&long.to_be_bytes())?;
                }
            }
        }
        Ok(())
    }

    pub fn write(
        &self,
        name: &str,
        mut data: impl Write,
        compressed: bool,
    ) -> Result<(), NBTError> {
        if compressed {
            let mut encoder =
                flate2::write::GzEncoder::new(data, flate2::Compression::default());
            self.write_tag(Some(name), true, &mut encoder)?;
            encoder.finish()?;
        } else {
            self.write_tag(Some(name), true, &mut data)?;
        }
        Ok(())
    }

    pub fn write_network(&self, mut data: impl Write) -> Result<(), NBTError> {
        self.write_tag(None, true, &mut data)
    }
}

#[cfg(test)]
mod test {
    use super::NBT;

    fn sample() -> NBT {
        nbt_compound![
            "name" => "galena",
            "count" => 3i32,
            "health" => 20.0f32,
            "pos" => vec![1.5f64, 64.0, -7.25],
            "data" => vec![0i8, 1, -2, 127].into_boxed_slice(),
            "nested" => nbt_compound![
                "flag" => true,
            ],
        ]
    }

    #[test]
    fn roundtrip_plain() {
        let nbt = sample();
        let mut buf = Vec::new();
        nbt.write("", &mut buf, false).unwrap();
        let (name, read) = NBT::read(std::io::Cursor::new(&buf), false).unwrap();
        assert_eq!(name, "");
        assert_eq!(read, nbt);
    }

    #[test]
    fn roundtrip_gzip() {
        let nbt = sample();
        let mut buf = Vec::new();
        nbt.write("root", &mut buf, true).unwrap();
        assert_eq!(&buf[..2], &[0x1F, 0x8B]);
        let (name, read) = NBT::read(std::io::Cursor::new(&buf), true).unwrap();
        assert_eq!(name, "root");
        assert_eq!(read, nbt);
    }

    #[test]
    fn empty_list_has_end_tag() {
        let nbt = NBT::List(Vec::new());
        let mut buf = Vec::new();
        nbt.write("", &mut buf, false).unwrap();
        // tag, empty name, element tag End, length 0
        assert_eq!(buf, &[9, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn mixed_list_is_rejected() {
        let nbt = NBT::List(vec![NBT::Byte(1), NBT::Int(2)]);
        let mut buf = Vec::new();
        assert!(nbt.write("", &mut buf, false).is_err());
    }
}
