//! Process-wide claims on device resources.
//!
//! A spacenavd socket, the 3DconnexionClient registration and the Raw Input
//! registration can each serve only one session per process.  A backend
//! acquires a [`ResourceClaim`] for its resource before touching the OS; a
//! second daemon asking for the same resource is refused.
//!
//! Claims are keyed by resource rather than held in one global flag, so two
//! daemons pointed at different spacenavd sockets can coexist.

use std::collections::HashSet;
use std::sync::{Mutex, OnceLock, PoisonError};

use tracing::debug;

/// Key used by the macOS client-callback backend.
pub const CONNEXION_CLIENT: &str = "3dconnexion-client";
/// Key used by the Windows message-pump backend.
pub const RAW_INPUT: &str = "raw-input";

fn registry() -> &'static Mutex<HashSet<String>> {
    static CLAIMS: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    CLAIMS.get_or_init(|| Mutex::new(HashSet::new()))
}

/// RAII marker that a resource is owned by a live session.  Released on drop.
#[derive(Debug)]
pub struct ResourceClaim {
    key: String,
}

impl ResourceClaim {
    /// Claims `key`, or returns `None` if it is already claimed.
    pub fn acquire(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let mut claims = registry().lock().unwrap_or_else(PoisonError::into_inner);
        if !claims.insert(key.clone()) {
            debug!(resource = %key, "resource already claimed");
            return None;
        }
        Some(Self { key })
    }

    /// Returns `true` if some live claim holds `key`.
    pub fn is_claimed(key: &str) -> bool {
        registry()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for ResourceClaim {
    fn drop(&mut self) {
        registry()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_on_same_key_is_refused() {
        // Arrange
        let first = ResourceClaim::acquire("test-claim-same").expect("first claim");

        // Act
        let second = ResourceClaim::acquire("test-claim-same");

        // Assert
        assert!(second.is_none());
        assert_eq!(first.key(), "test-claim-same");
    }

    #[test]
    fn test_drop_releases_claim() {
        let claim = ResourceClaim::acquire("test-claim-drop").expect("claim");
        assert!(ResourceClaim::is_claimed("test-claim-drop"));

        drop(claim);

        assert!(!ResourceClaim::is_claimed("test-claim-drop"));
        assert!(ResourceClaim::acquire("test-claim-drop").is_some());
    }

    #[test]
    fn test_different_keys_do_not_collide() {
        let a = ResourceClaim::acquire("test-claim-a");
        let b = ResourceClaim::acquire("test-claim-b");
        assert!(a.is_some() && b.is_some());
    }
}
