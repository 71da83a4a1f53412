use galena_util::{Position, nbt::bool_from_byte};
use serde::Deserialize;

/// The `Data` compound of `level.dat`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LevelData {
    pub version: i32,
    #[serde(rename = "LevelName")]
    pub name: String,
    #[serde(rename = "RandomSeed")]
    pub seed: i64,
    #[serde(rename = "MapFeatures", deserialize_with = "bool_from_byte")]
    pub features: bool,
    #[serde(rename = "LastPlayed")]
    pub last_played: i64,
    #[serde(rename = "allowCommands", deserialize_with = "bool_from_byte")]
    pub allow_commands: bool,
    #[serde(rename = "GameType")]
    pub gamemode: i32,
    #[serde(rename = "Difficulty")]
    pub difficulty: Option<u8>,
    #[serde(rename = "Time")]
    pub time: i64,
    #[serde(rename = "DayTime")]
    pub day_time: i64,
    #[serde(rename = "SpawnX")]
    pub spawn_x: i32,
    #[serde(rename = "SpawnY")]
    pub spawn_y: i32,
    #[serde(rename = "SpawnZ")]
    pub spawn_z: i32,
    #[serde(deserialize_with = "bool_from_byte")]
    pub raining: bool,
    #[serde(rename = "rainTime")]
    pub rain_time: i32,
    #[serde(deserialize_with = "bool_from_byte")]
    pub thundering: bool,
    #[serde(rename = "thunderTime")]
    pub thunder_time: i32,
    #[serde(rename = "clearWeatherTime")]
    pub clear_time: i32,
}

impl LevelData {
    pub fn spawn_position(&self) -> Position {
        Position::new(self.spawn_x, self.spawn_y as i16, self.spawn_z)
    }
}

/// `level.dat` root: an unnamed compound wrapping `Data`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LevelContainer {
    #[serde(rename = "Data")]
    pub data: LevelData,
}
