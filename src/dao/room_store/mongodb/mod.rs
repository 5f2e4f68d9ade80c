//! MongoDB-backed [`RoomStore`](crate::dao::room_store::RoomStore) implementation.

mod config;
mod connection;
mod error;
mod models;
mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoRoomStore;
