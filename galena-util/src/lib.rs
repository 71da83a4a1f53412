pub mod connection;
pub mod crypto;
pub mod nbt;
pub mod position;
pub mod read_ext;
pub mod uuid;
pub mod vec3;

pub use position::Position;
pub use read_ext::ReadExt;
pub use uuid::UUID;
pub use vec3::Vec3;
