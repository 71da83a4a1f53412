//! Deserialize domain schemas straight out of an [`NBT`] tree. A struct with
//! `#[derive(Deserialize)]` and `#[serde(rename)]` tag keys replaces the
//! runtime field-descriptor tables a dynamic language would use.

use std::fmt::Display;

use serde::{
    Deserialize, Deserializer, forward_to_deserialize_any,
    de::{DeserializeOwned, MapAccess, SeqAccess, Visitor},
};

use super::{NBT, NBTError};

impl serde::de::Error for NBTError {
    fn custom<T>(msg: T) -> Self
    where
        T: Display,
    {
        Self::DeserializeError(msg.to_string())
    }
}

pub fn from_nbt<T: DeserializeOwned>(nbt: NBT) -> Result<T, NBTError> {
    T::deserialize(NBTDeserializer(nbt))
}

/// NBT stores booleans as bytes. Schema structs use these with
/// `#[serde(deserialize_with)]` so byte-backed flags survive even when the
/// field sits behind a `#[serde(flatten)]` (which buffers values through
/// serde's internal content type and loses the byte-to-bool mapping the
/// deserializer would otherwise apply).
pub fn bool_from_byte<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(i8::deserialize(deserializer)? != 0)
}

pub fn opt_bool_from_byte<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i8>::deserialize(deserializer)?.map(|byte| byte != 0))
}

struct NBTDeserializer(NBT);

struct ListAccess<I: Iterator<Item = NBT>>(I);

impl<'de, I: Iterator<Item = NBT>> SeqAccess<'de> for ListAccess<I> {
    type Error = NBTError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: serde::de::DeserializeSeed<'de>,
    {
        self.0
            .next()
            .map(|next| seed.deserialize(NBTDeserializer(next)))
            .transpose()
    }
}

struct CompoundAccess<M: Iterator<Item = (String, NBT)>> {
    entries: M,
    value: Option<NBT>,
}

impl<'de, M: Iterator<Item = (String, NBT)>> MapAccess<'de> for CompoundAccess<M> {
    type Error = NBTError;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: serde::de::DeserializeSeed<'de>,
    {
        let Some((key, value)) = self.entries.next() else {
            return Ok(None);
        };
        self.value = Some(value);
        Ok(Some(seed.deserialize(NBTDeserializer(NBT::String(key)))?))
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: serde::de::DeserializeSeed<'de>,
    {
        let value = self
            .value
            .take()
            .expect("next_value_seed called before next_key_seed");
        seed.deserialize(NBTDeserializer(value))
    }
}

impl<'de> Deserializer<'de> for NBTDeserializer {
    type Error = NBTError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.0 {
            NBT::Byte(v) => visitor.visit_i8(v),
            NBT::Short(v) => visitor.visit_i16(v),
            NBT::Int(v) => visitor.visit_i32(v),
            NBT::Long(v) => visitor.visit_i64(v),
            NBT::Float(v) => visitor.visit_f32(v),
            NBT::Double(v) => visitor.visit_f64(v),
            NBT::String(v) => visitor.visit_string(v),
            NBT::List(list) => visitor.visit_seq(ListAccess(list.into_iter())),
            NBT::Compound(map) => visitor.visit_map(CompoundAccess {
                entries: map.into_iter(),
                value: None,
            }),
            NBT::ByteArray(array) => {
                visitor.visit_seq(ListAccess(array.into_vec().into_iter().map(NBT::Byte)))
            }
            NBT::IntArray(array) => {
                visitor.visit_seq(ListAccess(array.into_vec().into_iter().map(NBT::Int)))
            }
            NBT::LongArray(array) => {
                visitor.visit_seq(ListAccess(array.into_vec().into_iter().map(NBT::Long)))
            }
        }
    }

    /// NBT has no boolean tag; bytes 0/1 stand in for it.
    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.0 {
            NBT::Byte(v) => visitor.visit_bool(v != 0),
            other => Err(NBTError::DeserializeError(format!(
                "expected byte-backed boolean, got {:?}",
                other,
            ))),
        }
    }

    /// Optionality is key presence; a present key is always `Some`.
    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    forward_to_deserialize_any! {
        i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string bytes
        byte_buf unit unit_struct newtype_struct seq tuple tuple_struct map
        struct enum identifier ignored_any
    }
}

#[cfg(test)]
mod test {
    use serde::Deserialize;

    use super::from_nbt;
    use crate::nbt_compound;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Inner {
        flag: bool,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(default)]
    struct Sample {
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "Count")]
        count: i32,
        pos: Vec<f64>,
        data: Box<[i8]>,
        nested: Inner,
        missing: Option<i32>,
    }

    impl Default for Sample {
        fn default() -> Self {
            Self {
                name: "unnamed".to_owned(),
                count: -1,
                pos: Vec::new(),
                data: Box::new([]),
                nested: Inner { flag: false },
                missing: None,
            }
        }
    }

    #[test]
    fn derive_from_compound() {
        let nbt = nbt_compound![
            "Name" => "galena",
            "Count" => 3i32,
            "pos" => vec![1.5f64, 64.0, -7.25],
            "data" => vec![0i8, 1, -2].into_boxed_slice(),
            "nested" => nbt_compound![
                "flag" => true,
            ],
            "unknown_key" => "is ignored",
        ];
        let sample: Sample = from_nbt(nbt).unwrap();
        assert_eq!(
            sample,
            Sample {
                name: "galena".to_owned(),
                count: 3,
                pos: vec![1.5, 64.0, -7.25],
                data: vec![0, 1, -2].into(),
                nested: Inner { flag: true },
                missing: None,
            }
        );
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let sample: Sample = from_nbt(nbt_compound![
            "Count" => 7i32,
        ])
        .unwrap();
        assert_eq!(sample.name, "unnamed");
        assert_eq!(sample.count, 7);
    }
}
