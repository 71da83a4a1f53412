use std::io::{Read, Write};

use galena_util::{
    connection::{PacketDecodable, PacketDecoder as _, PacketEncodable, PacketEncoder as _},
    nbt::NBT,
};

/// One item stack as it appears on the wire. An empty slot is the single
/// i16 `-1`; a populated slot is id, count, damage, then either an End tag
/// byte or a named NBT compound.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    pub id: i16,
    pub count: u8,
    pub damage: i16,
    pub tag: Option<NBT>,
}

impl PacketEncodable for &Option<ItemStack> {
    fn packet_encode(self, mut writer: impl Write) -> std::io::Result<()> {
        let Some(item) = self else {
            return writer.encode(-1i16);
        };
        writer.encode(item.id)?;
        writer.encode(item.count)?;
        writer.encode(item.damage)?;
        match &item.tag {
            None => writer.write_all(&[0])?,
            Some(tag) => tag
                .write("", &mut writer, false)
                .map_err(std::io::Error::other)?,
        }
        Ok(())
    }
}

impl PacketDecodable for Option<ItemStack> {
    fn packet_decode(mut reader: impl Read) -> std::io::Result<Self> {
        let id: i16 = reader.decode()?;
        if id == -1 {
            return Ok(None);
        }
        Ok(Some(ItemStack {
            id,
            count: reader.decode()?,
            damage: reader.decode()?,
            tag: NBT::read_optional(&mut reader)
                .map_err(std::io::Error::other)?
                .map(|(_, nbt)| nbt),
        }))
    }
}

#[cfg(test)]
mod test {
    use galena_util::{
        connection::{PacketDecoder as _, PacketEncoder as _},
        nbt_compound,
    };

    use super::ItemStack;

    #[test]
    fn empty_slot() {
        let mut buf = Vec::new();
        buf.encode(&None::<ItemStack>).unwrap();
        assert_eq!(buf, [0xFF, 0xFF]);
        let mut reader = std::io::Cursor::new(&buf);
        assert_eq!(reader.decode::<Option<ItemStack>>().unwrap(), None);
    }

    #[test]
    fn slot_roundtrip() {
        for item in [
            ItemStack {
                id: 276,
                count: 1,
                damage: 10,
                tag: None,
            },
            ItemStack {
                id: 1,
                count: 64,
                damage: 0,
                tag: Some(nbt_compound![
                    "Unbreakable" => true,
                ]),
            },
        ] {
            let mut buf = Vec::new();
            buf.encode(&Some(item.clone())).unwrap();
            let mut reader = std::io::Cursor::new(&buf);
            assert_eq!(reader.decode::<Option<ItemStack>>().unwrap(), Some(item));
        }
    }
}
