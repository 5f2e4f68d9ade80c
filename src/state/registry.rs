//! Process-wide mapping from room code to live session.

use std::sync::Arc;

use dashmap::DashMap;
use rand::Rng;
use tokio::sync::Mutex;

use crate::{error::ServiceError, state::session::RoomSession};

/// A registered session; all access to the room goes through this lock.
pub type SharedSession = Arc<Mutex<RoomSession>>;

/// Attempts at finding a free code before giving up. With six-digit codes the
/// space holds 900k entries, so exhausting this bound means the registry is
/// effectively full.
const MAX_CODE_ATTEMPTS: usize = 16;

/// Registry of active rooms, the only structure shared across rooms.
///
/// The backing map hands out fully constructed sessions only: a session is
/// inserted after its durable row exists, and lookups never observe a
/// partially built entry.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, SharedSession>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a random six-digit code not currently present in the registry.
    ///
    /// The later [`RoomRegistry::insert`] still checks for collisions: a code
    /// drawn here can lose a race against a concurrent creation.
    pub fn allocate_code(&self) -> Result<String, ServiceError> {
        let mut rng = rand::rng();
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = rng.random_range(100_000..1_000_000).to_string();
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
        }
        Err(ServiceError::DuplicateCode)
    }

    /// Register a session under `code`.
    ///
    /// Fails with [`ServiceError::DuplicateCode`] when the code is already
    /// active, leaving the existing room untouched.
    pub fn insert(&self, code: String, session: SharedSession) -> Result<(), ServiceError> {
        match self.rooms.entry(code) {
            dashmap::Entry::Occupied(_) => Err(ServiceError::DuplicateCode),
            dashmap::Entry::Vacant(entry) => {
                entry.insert(session);
                Ok(())
            }
        }
    }

    /// Look up the session registered under `code`.
    pub fn lookup(&self, code: &str) -> Option<SharedSession> {
        self.rooms.get(code).map(|entry| entry.value().clone())
    }

    /// Remove the session registered under `code`, returning it if present.
    pub fn remove(&self, code: &str) -> Option<SharedSession> {
        self.rooms.remove(code).map(|(_, session)| session)
    }

    /// Snapshot the currently registered sessions.
    pub fn sessions(&self) -> Vec<SharedSession> {
        self.rooms.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Number of active rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no room is active.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;
    use uuid::Uuid;

    use crate::dao::models::{RoomEntity, RoomStatus};

    fn session(code: &str) -> SharedSession {
        Arc::new(Mutex::new(RoomSession::new(RoomEntity {
            id: Uuid::new_v4(),
            code: code.into(),
            host_conn_id: Uuid::new_v4(),
            host_name: "host".into(),
            target_word: None,
            status: RoomStatus::Waiting,
            max_players: 8,
            created_at: SystemTime::now(),
        })))
    }

    #[test]
    fn insert_lookup_remove_roundtrip() {
        let registry = RoomRegistry::new();
        registry.insert("123456".into(), session("123456")).unwrap();

        assert!(registry.lookup("123456").is_some());
        assert!(registry.lookup("654321").is_none());

        assert!(registry.remove("123456").is_some());
        assert!(registry.lookup("123456").is_none());
        assert!(registry.remove("123456").is_none());
    }

    #[test]
    fn duplicate_code_is_rejected() {
        let registry = RoomRegistry::new();
        registry.insert("123456".into(), session("123456")).unwrap();

        assert!(matches!(
            registry.insert("123456".into(), session("123456")),
            Err(ServiceError::DuplicateCode)
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn allocated_codes_are_six_digits_and_free() {
        let registry = RoomRegistry::new();
        for _ in 0..32 {
            let code = registry.allocate_code().unwrap();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(registry.lookup(&code).is_none());
        }
    }
}
