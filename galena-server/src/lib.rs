pub mod client;
pub mod config;
pub mod entity;
pub mod keepalive;
pub mod server;
pub mod session;
pub mod world;

pub use client::{Client, ClientError};
pub use config::ServerConfig;
pub use server::{Server, ServerError};
