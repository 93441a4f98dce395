//! Thread-safe holder for the current credential
//!
//! Reads return a snapshot clone and never wait on I/O. Writes replace the
//! whole credential under the lock, so a reader observes either the old or
//! the new value, never a mix of the two. Concurrent writers race;
//! whichever writes last wins.

use parking_lot::RwLock;
use tracing::debug;

use super::types::Credential;

/// Shared credential storage
#[derive(Debug, Default)]
pub struct TokenStore {
    current: RwLock<Option<Credential>>,
}

impl TokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_credential(credential: Credential) -> Self {
        Self { current: RwLock::new(Some(credential)) }
    }

    /// Snapshot of the current credential
    #[must_use]
    pub fn get(&self) -> Option<Credential> {
        self.current.read().clone()
    }

    /// Atomically replace the current credential
    pub fn set(&self, credential: Credential) {
        debug!(
            has_refresh_token = credential.can_refresh(),
            expires_at = ?credential.expires_at,
            "credential stored"
        );
        *self.current.write() = Some(credential);
    }

    /// Remove the current credential (logout)
    pub fn clear(&self) {
        *self.current.write() = None;
    }

    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.current.read().is_some()
    }

    /// `true` when the stored credential has passed its expiry.
    ///
    /// A credential without expiry is never expired; an empty store reports
    /// expired because there is nothing usable in it.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.current.read().as_ref().map_or(true, Credential::is_expired)
    }
}
