//! Who is signed in, restored from and mirrored to [`Storage`].

use crate::storage::{Storage, StorageError};
use taskly_core::User;

const USER_KEY: &str = "user";
const TOKEN_KEY: &str = "token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated { user: User, token: String },
}

/// Session context holding the current user and bearer token.
///
/// Storage always holds both entries or neither.
pub struct Session<S: Storage> {
    storage: S,
    state: SessionState,
}

impl<S: Storage> Session<S> {
    /// Restores the session persisted in `storage`.
    ///
    /// A missing entry or an unreadable user blob leaves the session anonymous
    /// and clears whatever was left behind.
    pub fn restore(storage: S) -> Self {
        let user = storage.get(USER_KEY);
        let token = storage.get(TOKEN_KEY);
        let mut session = Session {
            storage,
            state: SessionState::Anonymous,
        };

        match (user, token) {
            (Some(user), Some(token)) => match serde_json::from_str::<User>(&user) {
                Ok(user) => session.state = SessionState::Authenticated { user, token },
                Err(err) => {
                    tracing::warn!("Discarding unreadable stored user: {}", err);
                    session.discard_leftovers();
                }
            },
            (None, None) => {}
            _ => session.discard_leftovers(),
        }
        session
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    pub fn current_user(&self) -> Option<&User> {
        match &self.state {
            SessionState::Authenticated { user, .. } => Some(user),
            SessionState::Anonymous => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated { token, .. } => Some(token),
            SessionState::Anonymous => None,
        }
    }

    /// Signs `user` in, persisting both entries before the state changes.
    pub fn set_session(&mut self, user: User, token: String) -> Result<(), StorageError> {
        let blob = serde_json::to_string(&user)?;
        self.storage.set(USER_KEY, &blob)?;
        self.storage.set(TOKEN_KEY, &token)?;
        self.state = SessionState::Authenticated { user, token };
        Ok(())
    }

    /// Signs out. The in-memory state is anonymous even if storage fails.
    pub fn clear_session(&mut self) -> Result<(), StorageError> {
        self.state = SessionState::Anonymous;
        self.storage.remove(USER_KEY)?;
        self.storage.remove(TOKEN_KEY)?;
        Ok(())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn discard_leftovers(&mut self) {
        if let Err(err) = self.clear_session() {
            tracing::warn!("Failed to clear stored session: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use chrono::TimeZone;

    fn alice() -> User {
        let created = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        User {
            id: 1,
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn starts_anonymous_with_empty_storage() {
        let session = Session::restore(MemoryStorage::new());

        assert_eq!(session.state(), &SessionState::Anonymous);
        assert_eq!(session.current_user(), None);
        assert_eq!(session.token(), None);
    }

    #[test]
    fn set_session_persists_user_and_token() {
        let mut session = Session::restore(MemoryStorage::new());
        session.set_session(alice(), "abc".to_string()).unwrap();

        let restored = Session::restore(session.storage().clone());
        assert_eq!(restored.current_user(), Some(&alice()));
        assert_eq!(restored.token(), Some("abc"));
    }

    #[test]
    fn clear_session_removes_both_entries() {
        let mut session = Session::restore(MemoryStorage::new());
        session.set_session(alice(), "abc".to_string()).unwrap();

        session.clear_session().unwrap();

        assert!(!session.is_authenticated());
        assert_eq!(session.storage().get("user"), None);
        assert_eq!(session.storage().get("token"), None);
    }

    #[test]
    fn token_without_user_restores_anonymous() {
        let mut storage = MemoryStorage::new();
        storage.set("token", "abc").unwrap();

        let session = Session::restore(storage);

        assert!(!session.is_authenticated());
        assert_eq!(session.storage().get("token"), None);
    }

    #[test]
    fn corrupt_user_blob_restores_anonymous() {
        let mut storage = MemoryStorage::new();
        storage.set("user", "{broken").unwrap();
        storage.set("token", "abc").unwrap();

        let session = Session::restore(storage);

        assert_eq!(session.state(), &SessionState::Anonymous);
        assert_eq!(session.storage().get("user"), None);
        assert_eq!(session.storage().get("token"), None);
    }
}
