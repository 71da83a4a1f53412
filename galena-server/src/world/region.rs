use std::{fs::File, io::Seek as _, path::Path};

use galena_util::{ReadExt as _, nbt::NBT};

use super::WorldError;

pub const REGION_SIZE: usize = 32;
pub const CHUNKS_PER_REGION: usize = REGION_SIZE * REGION_SIZE;

/// One Anvil `r.{x}.{z}.mca` file: a 4 KiB offset/length table followed by
/// per-chunk compressed NBT payloads.
#[derive(Debug)]
pub struct Region {
    file: File,
    locations: [(u32, u32); CHUNKS_PER_REGION],
}

impl Region {
    /// `Ok(None)` when the file does not exist or is too short to carry a
    /// header; missing regions are normal for sparse worlds.
    pub fn open(path: &Path) -> Result<Option<Self>, WorldError> {
        let mut file = match File::open(path) {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            result => result?,
        };
        file.rewind()?;
        let header: [u8; 8 * CHUNKS_PER_REGION] = match file.read_const() {
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            result => result?,
        };
        Ok(Some(Self {
            file,
            locations: std::array::from_fn(|i| {
                let offset = u32::from_be_bytes([0, header[i * 4], header[i * 4 + 1], header[i * 4 + 2]]) * 0x1000;
                let length = (header[i * 4 + 3] as u32) * 0x1000;
                (offset, length)
            }),
        }))
    }

    fn read_payload(&mut self, chunk_x: u8, chunk_z: u8) -> Result<Option<Box<[u8]>>, WorldError> {
        let (offset, length) =
            self.locations[(chunk_x as usize) + (chunk_z as usize) * REGION_SIZE];
        if offset == 0 || length == 0 {
            return Ok(None);
        }
        self.file.seek(std::io::SeekFrom::Start(offset as u64))?;
        let length = u32::from_be_bytes(self.file.read_const()?);
        if length <= 1 {
            return Ok(None);
        }
        let compression = self.file.read_const::<1>()?[0];
        let compressed = self.file.read_var((length as usize) - 1)?;
        match compression {
            1 => Ok(Some(
                flate2::read::GzDecoder::new(std::io::Cursor::new(compressed)).read_all()?,
            )),
            2 => Ok(Some(
                flate2::read::ZlibDecoder::new(std::io::Cursor::new(compressed)).read_all()?,
            )),
            3 => Ok(Some(compressed)),
            other => Err(WorldError::UnknownRegionCompression(other)),
        }
    }

    /// Chunk NBT root at region-local coordinates.
    pub fn chunk_nbt(
        &mut self,
        chunk_x: u8,
        chunk_z: u8,
    ) -> Result<Option<(String, NBT)>, WorldError> {
        Ok(self
            .read_payload(chunk_x, chunk_z)?
            .map(|payload| NBT::read(std::io::Cursor::new(payload), false))
            .transpose()?)
    }
}
