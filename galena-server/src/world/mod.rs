mod chunk;
mod level;
mod region;

use std::{
    collections::HashMap,
    fs::File,
    path::{Path, PathBuf},
};

use galena_util::{
    UUID, Vec3,
    nbt::{NBT, NBTError, from_nbt},
};
use thiserror::Error;

use crate::entity::PlayerEntity;

pub use chunk::{BIOMES_LEN, Chunk, ChunkContainer, SECTIONS_PER_CHUNK, Section, TileEntity, TileTick};
pub use level::{LevelContainer, LevelData};
pub use region::{CHUNKS_PER_REGION, REGION_SIZE, Region};

pub const OVERWORLD: i32 = 0;

#[derive(Error, Debug)]
pub enum WorldError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    NBTError(#[from] NBTError),
    #[error("World base path {0:?} must exist and be a directory")]
    NotADirectory(PathBuf),
    #[error("Region chunk has unknown compression type {0}")]
    UnknownRegionCompression(u8),
}

/// An on-disk world: parsed level.dat plus lazily loaded region files and
/// chunks, both keyed by dimension.
#[derive(Debug)]
pub struct World {
    base: PathBuf,
    level: LevelData,
    regions: HashMap<(i32, i32, i32), Option<Region>>,
    chunks: HashMap<(i32, i32, i32), Option<ChunkContainer>>,
}

impl World {
    pub fn open(base: impl Into<PathBuf>) -> Result<Self, WorldError> {
        let base = base.into();
        if !base.is_dir() {
            return Err(WorldError::NotADirectory(base));
        }
        let (_, nbt) = NBT::read(File::open(base.join("level.dat"))?, true)?;
        let container: LevelContainer = from_nbt(nbt)?;
        Ok(Self {
            base,
            level: container.data,
            regions: HashMap::new(),
            chunks: HashMap::new(),
        })
    }

    pub fn level(&self) -> &LevelData {
        &self.level
    }

    fn region(
        &mut self,
        dimension: i32,
        region_x: i32,
        region_z: i32,
    ) -> Result<Option<&mut Region>, WorldError> {
        if !self.regions.contains_key(&(dimension, region_x, region_z)) {
            let mut path = self.base.clone();
            if dimension != OVERWORLD {
                path.push(format!("DIM{}", dimension));
            }
            path.push("region");
            path.push(format!("r.{}.{}.mca", region_x, region_z));
            self.regions
                .insert((dimension, region_x, region_z), Region::open(&path)?);
        }
        Ok(self
            .regions
            .get_mut(&(dimension, region_x, region_z))
            .and_then(|region| region.as_mut()))
    }

    fn load_chunk(
        &mut self,
        dimension: i32,
        chunk_x: i32,
        chunk_z: i32,
    ) -> Result<Option<ChunkContainer>, WorldError> {
        let Some(region) = self.region(dimension, chunk_x >> 5, chunk_z >> 5)? else {
            return Ok(None);
        };
        let Some((_, nbt)) = region.chunk_nbt((chunk_x & 0x1F) as u8, (chunk_z & 0x1F) as u8)?
        else {
            return Ok(None);
        };
        Ok(Some(from_nbt(nbt)?))
    }

    /// Read-through cached chunk lookup; `None` for never-generated chunks.
    pub fn chunk(
        &mut self,
        dimension: i32,
        chunk_x: i32,
        chunk_z: i32,
    ) -> Result<Option<&Chunk>, WorldError> {
        if !self.chunks.contains_key(&(dimension, chunk_x, chunk_z)) {
            let loaded = self.load_chunk(dimension, chunk_x, chunk_z)?;
            self.chunks.insert((dimension, chunk_x, chunk_z), loaded);
        }
        Ok(self
            .chunks
            .get(&(dimension, chunk_x, chunk_z))
            .and_then(|chunk| chunk.as_ref())
            .map(|container| &container.level))
    }

    /// The stored player entity, or a fresh one placed at the world spawn.
    pub fn player_data(&self, uuid: &UUID) -> Result<PlayerEntity, WorldError> {
        let path = self.base.join("playerdata").join(format!("{}.dat", uuid));
        let file = match File::open(path) {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let mut entity = PlayerEntity::default();
                self.place_at_spawn(&mut entity);
                return Ok(entity);
            }
            result => result?,
        };
        let (_, nbt) = NBT::read(file, true)?;
        let mut entity: PlayerEntity = from_nbt(nbt)?;
        if entity.position() == Vec3::zero() {
            self.place_at_spawn(&mut entity);
        }
        Ok(entity)
    }

    fn place_at_spawn(&self, entity: &mut PlayerEntity) {
        let spawn = self.level.spawn_position();
        entity.mob.entity.position = Vec3::new(spawn.x as f64, spawn.y as f64, spawn.z as f64);
        entity.set_spawn_position(spawn.x, spawn.y as i32, spawn.z);
    }
}

/// Persists a player entity under `<dir>/playerdata/{uuid}.dat` (gzip NBT),
/// written on disconnect.
pub fn save_player_data(dir: &Path, uuid: &UUID, entity: &PlayerEntity) -> Result<(), WorldError> {
    let dir = dir.join("playerdata");
    std::fs::create_dir_all(&dir)?;
    let file = File::create(dir.join(format!("{}.dat", uuid)))?;
    entity.to_nbt().write("", file, true)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test {
    use std::io::{Seek as _, SeekFrom, Write as _};
    use std::path::Path;

    use galena_util::{UUID, Vec3, nbt::NBT, nbt_compound};

    use super::{REGION_SIZE, World, save_player_data};

    /// Builds a minimal but well-formed world directory: gzip level.dat and
    /// one region holding a single chunk at the given coordinates.
    pub fn write_test_world(dir: &Path, chunk_x: i32, chunk_z: i32) {
        std::fs::create_dir_all(dir.join("region")).unwrap();
        std::fs::create_dir_all(dir.join("playerdata")).unwrap();

        let level = nbt_compound![
            "Data" => nbt_compound![
                "LevelName" => "test world",
                "RandomSeed" => 982451653i64,
                "MapFeatures" => true,
                "GameType" => 0i32,
                "Difficulty" => 2i8,
                "Time" => 6000i64,
                "DayTime" => 6000i64,
                "SpawnX" => 8i32,
                "SpawnY" => 65i32,
                "SpawnZ" => 8i32,
                "raining" => false,
                "rainTime" => 12000i32,
                "thundering" => false,
            ],
        ];
        level
            .write("", std::fs::File::create(dir.join("level.dat")).unwrap(), true)
            .unwrap();

        let chunk = nbt_compound![
            "DataVersion" => 169i32,
            "Level" => nbt_compound![
                "xPos" => chunk_x,
                "zPos" => chunk_z,
                "TerrainPopulated" => true,
                "LightPopulated" => true,
                "Biomes" => vec![1i8; 256].into_boxed_slice(),
                "Sections" => NBT::List(vec![nbt_compound![
                    "Y" => 0i8,
                    "Blocks" => {
                        let mut blocks = vec![0i8; 4096];
                        blocks[..256].fill(7);
                        blocks.into_boxed_slice()
                    },
                    "Data" => vec![0i8; 2048].into_boxed_slice(),
                    "BlockLight" => vec![0i8; 2048].into_boxed_slice(),
                    "SkyLight" => vec![-1i8; 2048].into_boxed_slice(),
                ]]),
                "Entities" => NBT::List(Vec::new()),
                "TileEntities" => NBT::List(Vec::new()),
            ],
        ];
        let mut payload = Vec::new();
        {
            let mut encoder =
                flate2::write::ZlibEncoder::new(&mut payload, flate2::Compression::default());
            chunk.write("", &mut encoder, false).unwrap();
            encoder.finish().unwrap();
        }
        write_region(dir, chunk_x, chunk_z, &payload);
    }

    fn write_region(dir: &Path, chunk_x: i32, chunk_z: i32, payload: &[u8]) {
        let region_x = chunk_x >> 5;
        let region_z = chunk_z >> 5;
        let local_x = (chunk_x & 0x1F) as usize;
        let local_z = (chunk_z & 0x1F) as usize;

        let mut file = std::fs::File::create(
            dir.join("region")
                .join(format!("r.{}.{}.mca", region_x, region_z)),
        )
        .unwrap();
        // 8 KiB header: locations then (unused) timestamps.
        file.write_all(&[0u8; 8192]).unwrap();
        // Chunk payload at sector 2: length, zlib marker, data.
        file.write_all(&((payload.len() + 1) as u32).to_be_bytes())
            .unwrap();
        file.write_all(&[2]).unwrap();
        file.write_all(payload).unwrap();

        let entry = (local_x + local_z * REGION_SIZE) * 4;
        file.seek(SeekFrom::Start(entry as u64)).unwrap();
        let sector_count = (payload.len() + 5).div_ceil(4096) as u8;
        file.write_all(&[0, 0, 2, sector_count]).unwrap();
    }

    #[test]
    fn open_reads_level_data() {
        let dir = std::env::temp_dir().join(format!("galena-world-{}", UUID::new_v4()));
        write_test_world(&dir, 0, 0);
        let world = World::open(&dir).unwrap();
        assert_eq!(world.level().name, "test world");
        assert_eq!(world.level().seed, 982451653);
        assert_eq!(world.level().difficulty, Some(2));
        assert_eq!(world.level().spawn_position().x, 8);
        assert_eq!(world.level().spawn_position().y, 65);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn open_rejects_missing_directory() {
        assert!(World::open("/definitely/not/a/world").is_err());
    }

    #[test]
    fn chunk_lookup_and_serialisation() {
        let dir = std::env::temp_dir().join(format!("galena-world-{}", UUID::new_v4()));
        write_test_world(&dir, 5, -3);
        let mut world = World::open(&dir).unwrap();

        let chunk = world.chunk(0, 5, -3).unwrap().expect("chunk exists");
        assert_eq!((chunk.x, chunk.z), (5, -3));
        assert_eq!(chunk.primary_bit_mask(), 0b1);

        let packet = chunk.to_chunk_data();
        assert_eq!(
            packet.data.len(),
            super::Section::payload_len() + super::BIOMES_LEN
        );

        // Never-generated chunks resolve to None, not an error.
        assert!(world.chunk(0, 100, 100).unwrap().is_none());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn player_data_roundtrip() {
        let dir = std::env::temp_dir().join(format!("galena-world-{}", UUID::new_v4()));
        write_test_world(&dir, 0, 0);
        let world = World::open(&dir).unwrap();
        let uuid = UUID::new_v4();

        // Unknown players spawn fresh at the world spawn.
        let fresh = world.player_data(&uuid).unwrap();
        assert_eq!(fresh.position(), Vec3::new(8.0, 65.0, 8.0));

        let mut entity = fresh;
        entity.set_uuid(uuid);
        entity.mob.entity.position = Vec3::new(100.0, 70.0, -40.0);
        entity.xp_level = 12;
        save_player_data(&dir, &uuid, &entity).unwrap();

        let restored = world.player_data(&uuid).unwrap();
        assert_eq!(restored.uuid(), uuid);
        assert_eq!(restored.position(), Vec3::new(100.0, 70.0, -40.0));
        assert_eq!(restored.xp_level, 12);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
