//! NBT-backed entity schemas. Reading goes through the serde bridge
//! ([`galena_util::nbt::from_nbt`]) so each field declares its tag key and
//! optionality on the struct; writing is the hand-built inverse.

use std::sync::atomic::{AtomicI32, Ordering};

use galena_util::{
    UUID, Vec3,
    nbt::{NBT, bool_from_byte, opt_bool_from_byte},
    nbt_compound,
};
use serde::Deserialize;

static NEXT_ENTITY_ID: AtomicI32 = AtomicI32::new(0);

/// Runtime entity ids are monotone and unique for the server's lifetime;
/// they are never persisted.
pub fn next_entity_id() -> i32 {
    NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed)
}

pub mod gamemode {
    pub const SURVIVAL: i32 = 0;
    pub const CREATIVE: i32 = 1;
    pub const ADVENTURE: i32 = 2;
    pub const SPECTATOR: i32 = 3;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Entity {
    #[serde(skip, default = "next_entity_id")]
    pub entity_id: i32,
    #[serde(rename = "id")]
    pub kind: String,
    #[serde(rename = "Pos")]
    pub position: Vec3<f64>,
    #[serde(rename = "Motion")]
    pub motion: Vec3<f64>,
    /// Yaw then pitch.
    #[serde(rename = "Rotation")]
    pub rotation: [f32; 2],
    #[serde(rename = "FallDistance")]
    pub fall_distance: f32,
    #[serde(rename = "Fire")]
    pub fire: i16,
    #[serde(rename = "Air")]
    pub air: i16,
    #[serde(rename = "OnGround", deserialize_with = "bool_from_byte")]
    pub on_ground: bool,
    #[serde(rename = "Invulnerable", deserialize_with = "bool_from_byte")]
    pub invulnerable: bool,
    #[serde(rename = "PortalCooldown")]
    pub portal_cooldown: i32,
    #[serde(rename = "UUIDMost")]
    pub uuid_most: i64,
    #[serde(rename = "UUIDLeast")]
    pub uuid_least: i64,
    #[serde(rename = "CustomName")]
    pub custom_name: Option<String>,
    #[serde(rename = "CustomNameVisible", deserialize_with = "opt_bool_from_byte")]
    pub custom_name_visible: Option<bool>,
    #[serde(rename = "Silent", deserialize_with = "bool_from_byte")]
    pub silent: bool,
    #[serde(rename = "Glowing", deserialize_with = "bool_from_byte")]
    pub glowing: bool,
    #[serde(rename = "Passengers")]
    pub passengers: Vec<Entity>,
    #[serde(rename = "Tags")]
    pub tags: Vec<String>,
}

impl Default for Entity {
    fn default() -> Self {
        let uuid = UUID::new_v4();
        let (uuid_most, uuid_least) = uuid.halves();
        Self {
            entity_id: next_entity_id(),
            kind: String::new(),
            position: Vec3::zero(),
            motion: Vec3::zero(),
            rotation: [0.0, 0.0],
            fall_distance: 0.0,
            fire: -20,
            air: 300,
            on_ground: false,
            invulnerable: false,
            portal_cooldown: 0,
            uuid_most,
            uuid_least,
            custom_name: None,
            custom_name_visible: None,
            silent: false,
            glowing: false,
            passengers: Vec::new(),
            tags: Vec::new(),
        }
    }
}

impl Entity {
    pub fn uuid(&self) -> UUID {
        UUID::from_halves(self.uuid_most, self.uuid_least)
    }

    pub fn set_uuid(&mut self, uuid: UUID) {
        (self.uuid_most, self.uuid_least) = uuid.halves();
    }

    pub fn yaw(&self) -> f32 {
        self.rotation[0]
    }

    pub fn pitch(&self) -> f32 {
        self.rotation[1]
    }

    pub fn to_nbt(&self) -> NBT {
        let mut nbt = nbt_compound![
            "id" => self.kind.clone(),
            "Pos" => vec![self.position.x, self.position.y, self.position.z],
            "Motion" => vec![self.motion.x, self.motion.y, self.motion.z],
            "Rotation" => self.rotation.to_vec(),
            "FallDistance" => self.fall_distance,
            "Fire" => self.fire,
            "Air" => self.air,
            "OnGround" => self.on_ground,
            "Invulnerable" => self.invulnerable,
            "PortalCooldown" => self.portal_cooldown,
            "UUIDMost" => self.uuid_most,
            "UUIDLeast" => self.uuid_least,
            "Silent" => self.silent,
            "Glowing" => self.glowing,
            "Passengers" => NBT::List(self.passengers.iter().map(Entity::to_nbt).collect()),
            "Tags" => self.tags.clone(),
        ];
        if let Some(custom_name) = &self.custom_name {
            nbt.insert("CustomName", custom_name.clone());
            nbt.insert("CustomNameVisible", self.custom_name_visible.unwrap_or(false));
        }
        nbt
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AttributeModifier {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Amount")]
    pub amount: f64,
    #[serde(rename = "Operation")]
    pub operation: i32,
    #[serde(rename = "UUIDMost")]
    pub uuid_most: i64,
    #[serde(rename = "UUIDLeast")]
    pub uuid_least: i64,
}

impl AttributeModifier {
    fn to_nbt(&self) -> NBT {
        nbt_compound![
            "Name" => self.name.clone(),
            "Amount" => self.amount,
            "Operation" => self.operation,
            "UUIDMost" => self.uuid_most,
            "UUIDLeast" => self.uuid_least,
        ]
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Attribute {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Base")]
    pub base: f64,
    #[serde(rename = "Modifiers")]
    pub modifiers: Vec<AttributeModifier>,
}

impl Attribute {
    fn to_nbt(&self) -> NBT {
        nbt_compound![
            "Name" => self.name.clone(),
            "Base" => self.base,
            "Modifiers" => NBT::List(self.modifiers.iter().map(AttributeModifier::to_nbt).collect()),
        ]
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Effect {
    #[serde(rename = "Id")]
    pub id: i8,
    #[serde(rename = "Amplifier")]
    pub amplifier: i8,
    #[serde(rename = "Duration")]
    pub duration: i32,
    #[serde(rename = "Ambient", deserialize_with = "bool_from_byte")]
    pub ambient: bool,
    #[serde(rename = "ShowParticles", deserialize_with = "bool_from_byte")]
    pub show_particles: bool,
}

impl Effect {
    fn to_nbt(&self) -> NBT {
        nbt_compound![
            "Id" => self.id,
            "Amplifier" => self.amplifier,
            "Duration" => self.duration,
            "Ambient" => self.ambient,
            "ShowParticles" => self.show_particles,
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Mob {
    #[serde(flatten)]
    pub entity: Entity,
    #[serde(rename = "Health")]
    pub health: f32,
    #[serde(rename = "AbsorptionAmount")]
    pub absorption: f32,
    #[serde(rename = "HurtTime")]
    pub hurt_time: i16,
    #[serde(rename = "HurtByTimestamp")]
    pub hurt_timestamp: i32,
    #[serde(rename = "DeathTime")]
    pub death_time: i16,
    #[serde(rename = "FallFlying", deserialize_with = "bool_from_byte")]
    pub fall_flying: bool,
    #[serde(rename = "Attributes")]
    pub attributes: Vec<Attribute>,
    #[serde(rename = "ActiveEffects")]
    pub active_effects: Vec<Effect>,
}

impl Default for Mob {
    fn default() -> Self {
        Self {
            entity: Entity::default(),
            health: 20.0,
            absorption: 0.0,
            hurt_time: 0,
            hurt_timestamp: 0,
            death_time: 0,
            fall_flying: false,
            attributes: Vec::new(),
            active_effects: Vec::new(),
        }
    }
}

impl Mob {
    pub fn to_nbt(&self) -> NBT {
        let mut nbt = self.entity.to_nbt();
        nbt.insert("Health", self.health);
        nbt.insert("AbsorptionAmount", self.absorption);
        nbt.insert("HurtTime", self.hurt_time);
        nbt.insert("HurtByTimestamp", self.hurt_timestamp);
        nbt.insert("DeathTime", self.death_time);
        nbt.insert("FallFlying", self.fall_flying);
        nbt.insert(
            "Attributes",
            NBT::List(self.attributes.iter().map(Attribute::to_nbt).collect()),
        );
        nbt.insert(
            "ActiveEffects",
            NBT::List(self.active_effects.iter().map(Effect::to_nbt).collect()),
        );
        nbt
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Abilities {
    #[serde(rename = "walkSpeed")]
    pub walk_speed: f32,
    #[serde(rename = "flySpeed")]
    pub fly_speed: f32,
    #[serde(rename = "mayfly", deserialize_with = "bool_from_byte")]
    pub may_fly: bool,
    #[serde(rename = "flying", deserialize_with = "bool_from_byte")]
    pub flying: bool,
    #[serde(rename = "invulnerable", deserialize_with = "bool_from_byte")]
    pub invulnerable: bool,
    #[serde(rename = "mayBuild", deserialize_with = "bool_from_byte")]
    pub may_build: bool,
    #[serde(rename = "instabuild", deserialize_with = "bool_from_byte")]
    pub instant_build: bool,
}

impl Default for Abilities {
    fn default() -> Self {
        Self {
            walk_speed: 0.1,
            fly_speed: 0.05,
            may_fly: false,
            flying: false,
            invulnerable: false,
            may_build: true,
            instant_build: false,
        }
    }
}

impl Abilities {
    fn to_nbt(&self) -> NBT {
        nbt_compound![
            "walkSpeed" => self.walk_speed,
            "flySpeed" => self.fly_speed,
            "mayfly" => self.may_fly,
            "flying" => self.flying,
            "invulnerable" => self.invulnerable,
            "mayBuild" => self.may_build,
            "instabuild" => self.instant_build,
        ]
    }
}

/// One item stack as persisted inside `Inventory` / `EnderItems`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct InventorySlot {
    pub id: String,
    #[serde(rename = "Count")]
    pub count: i8,
    #[serde(rename = "Damage")]
    pub damage: i16,
    #[serde(rename = "Slot")]
    pub slot: Option<i8>,
}

impl InventorySlot {
    fn to_nbt(&self) -> NBT {
        let mut nbt = nbt_compound![
            "id" => self.id.clone(),
            "Count" => self.count,
            "Damage" => self.damage,
        ];
        if let Some(slot) = self.slot {
            nbt.insert("Slot", slot);
        }
        nbt
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerEntity {
    #[serde(flatten)]
    pub mob: Mob,
    #[serde(rename = "DataVersion")]
    pub data_version: i32,
    #[serde(rename = "Dimension")]
    pub dimension: i32,
    #[serde(rename = "playerGameType")]
    pub gamemode: i32,
    #[serde(rename = "Score")]
    pub score: i32,
    #[serde(rename = "SelectedItemSlot")]
    pub selected_slot: i32,
    #[serde(rename = "SpawnX")]
    spawn_x: Option<i32>,
    #[serde(rename = "SpawnY")]
    spawn_y: Option<i32>,
    #[serde(rename = "SpawnZ")]
    spawn_z: Option<i32>,
    #[serde(rename = "SpawnForced", deserialize_with = "bool_from_byte")]
    pub spawn_forced: bool,
    #[serde(rename = "foodLevel")]
    pub food_level: i32,
    #[serde(rename = "foodExhaustionLevel")]
    pub food_exhaustion: f32,
    #[serde(rename = "foodSaturationLevel")]
    pub food_saturation: f32,
    #[serde(rename = "foodTickTimer")]
    pub food_tick_timer: i32,
    #[serde(rename = "XpLevel")]
    pub xp_level: i32,
    #[serde(rename = "XpP")]
    pub xp_percent: f32,
    #[serde(rename = "XpTotal")]
    pub xp_total: i32,
    #[serde(rename = "Inventory")]
    pub inventory: Vec<InventorySlot>,
    #[serde(rename = "EnderItems")]
    pub ender_items: Vec<InventorySlot>,
    pub abilities: Abilities,
}

impl Default for PlayerEntity {
    fn default() -> Self {
        Self {
            mob: Mob::default(),
            data_version: 0,
            dimension: 0,
            gamemode: gamemode::SURVIVAL,
            score: 0,
            selected_slot: 0,
            spawn_x: None,
            spawn_y: None,
            spawn_z: None,
            spawn_forced: false,
            food_level: 20,
            food_exhaustion: 0.0,
            food_saturation: 5.0,
            food_tick_timer: 0,
            xp_level: 0,
            xp_percent: 0.0,
            xp_total: 0,
            inventory: Vec::new(),
            ender_items: Vec::new(),
            abilities: Abilities::default(),
        }
    }
}

impl PlayerEntity {
    pub fn entity_id(&self) -> i32 {
        self.mob.entity.entity_id
    }

    pub fn uuid(&self) -> UUID {
        self.mob.entity.uuid()
    }

    pub fn set_uuid(&mut self, uuid: UUID) {
        self.mob.entity.set_uuid(uuid);
    }

    pub fn position(&self) -> Vec3<f64> {
        self.mob.entity.position
    }

    pub fn spawn_position(&self) -> Option<Vec3<f64>> {
        match (self.spawn_x, self.spawn_y, self.spawn_z) {
            (Some(x), Some(y), Some(z)) => Some(Vec3::new(x as f64, y as f64, z as f64)),
            _ => None,
        }
    }

    pub fn set_spawn_position(&mut self, x: i32, y: i32, z: i32) {
        self.spawn_x = Some(x);
        self.spawn_y = Some(y);
        self.spawn_z = Some(z);
    }

    /// The bit field sent in the PlayerAbilities packet.
    pub fn ability_flags(&self) -> i8 {
        use galena_defs::packet::play::PlayerAbilities;
        let mut flags = 0;
        if self.abilities.invulnerable {
            flags |= PlayerAbilities::INVULNERABLE;
        }
        if self.abilities.flying {
            flags |= PlayerAbilities::FLYING;
        }
        if self.abilities.may_fly {
            flags |= PlayerAbilities::ALLOW_FLYING;
        }
        if self.gamemode == gamemode::CREATIVE {
            flags |= PlayerAbilities::CREATIVE_MODE;
        }
        flags
    }

    pub fn to_nbt(&self) -> NBT {
        let mut nbt = self.mob.to_nbt();
        nbt.insert("DataVersion", self.data_version);
        nbt.insert("Dimension", self.dimension);
        nbt.insert("playerGameType", self.gamemode);
        nbt.insert("Score", self.score);
        nbt.insert("SelectedItemSlot", self.selected_slot);
        if let (Some(x), Some(y), Some(z)) = (self.spawn_x, self.spawn_y, self.spawn_z) {
            nbt.insert("SpawnX", x);
            nbt.insert("SpawnY", y);
            nbt.insert("SpawnZ", z);
            nbt.insert("SpawnForced", self.spawn_forced);
        }
        nbt.insert("foodLevel", self.food_level);
        nbt.insert("foodExhaustionLevel", self.food_exhaustion);
        nbt.insert("foodSaturationLevel", self.food_saturation);
        nbt.insert("foodTickTimer", self.food_tick_timer);
        nbt.insert("XpLevel", self.xp_level);
        nbt.insert("XpP", self.xp_percent);
        nbt.insert("XpTotal", self.xp_total);
        nbt.insert(
            "Inventory",
            NBT::List(self.inventory.iter().map(InventorySlot::to_nbt).collect()),
        );
        nbt.insert(
            "EnderItems",
            NBT::List(self.ender_items.iter().map(InventorySlot::to_nbt).collect()),
        );
        nbt.insert("abilities", self.abilities.to_nbt());
        nbt
    }
}

#[cfg(test)]
mod test {
    use galena_util::{UUID, Vec3, nbt::from_nbt};

    use super::{InventorySlot, PlayerEntity, next_entity_id};

    #[test]
    fn entity_ids_are_monotone() {
        let a = next_entity_id();
        let b = next_entity_id();
        assert!(b > a);
        let entity = PlayerEntity::default();
        assert!(entity.entity_id() > b);
    }

    #[test]
    fn player_nbt_roundtrip() {
        let mut player = PlayerEntity::default();
        player.set_uuid(UUID::try_from("069a79f4-44e9-4726-a5be-fca90e38aaf5").unwrap());
        player.mob.entity.position = Vec3::new(8.5, 65.0, -120.25);
        player.mob.entity.rotation = [45.0, -10.0];
        player.mob.health = 17.5;
        player.gamemode = super::gamemode::CREATIVE;
        player.food_level = 18;
        player.xp_level = 30;
        player.set_spawn_position(0, 64, 0);
        player.abilities.may_fly = true;
        player.inventory.push(InventorySlot {
            id: "minecraft:diamond_pickaxe".to_owned(),
            count: 1,
            damage: 10,
            slot: Some(0),
        });

        let restored: PlayerEntity = from_nbt(player.to_nbt()).unwrap();
        assert_eq!(restored.uuid(), player.uuid());
        assert_eq!(restored.position(), player.position());
        assert_eq!(restored.mob.entity.rotation, [45.0, -10.0]);
        assert_eq!(restored.mob.health, 17.5);
        assert_eq!(restored.gamemode, super::gamemode::CREATIVE);
        assert_eq!(restored.food_level, 18);
        assert_eq!(restored.xp_level, 30);
        assert_eq!(restored.spawn_position(), Some(Vec3::new(0.0, 64.0, 0.0)));
        assert!(restored.abilities.may_fly);
        assert!(restored.abilities.may_build);
        assert_eq!(restored.inventory.len(), 1);
        assert_eq!(restored.inventory[0].id, "minecraft:diamond_pickaxe");
        // Runtime ids are never persisted; the restored entity gets a new one.
        assert_ne!(restored.entity_id(), player.entity_id());
    }

    #[test]
    fn fresh_entity_defaults() {
        let player = PlayerEntity::default();
        assert_eq!(player.mob.entity.fire, -20);
        assert_eq!(player.mob.entity.air, 300);
        assert_eq!(player.mob.health, 20.0);
        assert_eq!(player.abilities.walk_speed, 0.1);
        assert_eq!(player.abilities.fly_speed, 0.05);
        assert_eq!(player.spawn_position(), None);
    }
}
