// 🔐 Auth slice - the only state that survives a restart
//
// Domain caches live in memory for the session. The signed-in user and
// their tokens are written to a small SQLite file on every change and read
// back on start.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

const AUTH_KEY: &str = "auth";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("corrupt session record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

// ============================================================================
// AUTH STATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub is_authenticated: bool,
}

impl AuthState {
    pub fn sign_in(&mut self, user: User, access_token: String, refresh_token: String) {
        self.user = Some(user);
        self.access_token = Some(access_token);
        self.refresh_token = Some(refresh_token);
        self.is_authenticated = true;
    }

    /// Swap in a new access token; ignored when signed out
    pub fn refresh(&mut self, access_token: String) {
        if self.is_authenticated {
            self.access_token = Some(access_token);
        }
    }

    pub fn sign_out(&mut self) {
        *self = AuthState::default();
    }
}

// ============================================================================
// SESSION STORE (SQLite)
// ============================================================================

pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    pub fn open(path: &Path) -> Result<Self, SessionError> {
        let conn = Connection::open(path)?;
        // WAL mode for crash recovery
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        Self::setup(conn)
    }

    pub fn in_memory() -> Result<Self, SessionError> {
        Self::setup(Connection::open_in_memory()?)
    }

    fn setup(conn: Connection) -> Result<Self, SessionError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;
        Ok(SessionStore { conn })
    }

    pub fn load(&self) -> Result<AuthState, SessionError> {
        let stored: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![AUTH_KEY], |row| row.get(0))
            .optional()?;

        match stored {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(AuthState::default()),
        }
    }

    pub fn save(&self, state: &AuthState) -> Result<(), SessionError> {
        let json = serde_json::to_string(state)?;
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
            params![AUTH_KEY, json],
        )?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![AUTH_KEY])?;
        Ok(())
    }
}

/// Auth state bound to its persistence: every reducer call is saved
pub struct AuthSlice {
    state: AuthState,
    session: SessionStore,
}

impl AuthSlice {
    /// Rehydrate from the session store
    pub fn restore(session: SessionStore) -> Result<Self, SessionError> {
        let state = session.load()?;
        if let Some(user) = &state.user {
            info!(user = %user.email, "restored session");
        }
        Ok(AuthSlice { state, session })
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn sign_in(&mut self, user: User, access_token: String, refresh_token: String) -> Result<(), SessionError> {
        info!(user = %user.email, "signed in");
        self.state.sign_in(user, access_token, refresh_token);
        self.session.save(&self.state)
    }

    pub fn refresh(&mut self, access_token: String) -> Result<(), SessionError> {
        self.state.refresh(access_token);
        self.session.save(&self.state)
    }

    pub fn sign_out(&mut self) -> Result<(), SessionError> {
        info!("signed out");
        self.state.sign_out();
        self.session.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> User {
        User {
            id: 1,
            name: "Parish Office".to_string(),
            email: "office@stmarys.example".to_string(),
            role: "admin".to_string(),
        }
    }

    #[test]
    fn test_reducers() {
        let mut state = AuthState::default();
        state.refresh("ignored".to_string());
        assert_eq!(state.access_token, None);

        state.sign_in(admin(), "a1".to_string(), "r1".to_string());
        assert!(state.is_authenticated);

        state.refresh("a2".to_string());
        assert_eq!(state.access_token.as_deref(), Some("a2"));
        assert_eq!(state.refresh_token.as_deref(), Some("r1"));

        state.sign_out();
        assert_eq!(state, AuthState::default());
    }

    #[test]
    fn test_empty_store_loads_signed_out() {
        let store = SessionStore::in_memory().unwrap();
        assert_eq!(store.load().unwrap(), AuthState::default());
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.db");

        {
            let mut slice = AuthSlice::restore(SessionStore::open(&path).unwrap()).unwrap();
            slice.sign_in(admin(), "access".to_string(), "refresh".to_string()).unwrap();
            slice.refresh("access-2".to_string()).unwrap();
        }

        let slice = AuthSlice::restore(SessionStore::open(&path).unwrap()).unwrap();
        assert!(slice.state().is_authenticated);
        assert_eq!(slice.state().user, Some(admin()));
        assert_eq!(slice.state().access_token.as_deref(), Some("access-2"));
    }

    #[test]
    fn test_sign_out_clears_persisted_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.db");

        let mut slice = AuthSlice::restore(SessionStore::open(&path).unwrap()).unwrap();
        slice.sign_in(admin(), "a".to_string(), "r".to_string()).unwrap();
        slice.sign_out().unwrap();
        drop(slice);

        let reopened = SessionStore::open(&path).unwrap();
        assert_eq!(reopened.load().unwrap(), AuthState::default());
    }
}
