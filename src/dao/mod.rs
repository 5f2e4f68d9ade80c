//! Persistence layer: backend-agnostic contract plus the MongoDB implementation.

/// Database model definitions shared across layers.
pub mod models;
/// Room persistence abstraction and its backends.
pub mod room_store;
/// Storage abstraction layer for database operations.
pub mod storage;
