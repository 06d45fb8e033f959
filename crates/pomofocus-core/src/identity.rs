//! Identity provider contract.
//!
//! Session and task operations are scoped to a user. When no identity is
//! present they short-circuit instead of failing.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::KvStore;

/// Opaque reference to the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRef(String);

impl UserRef {
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait IdentityProvider {
    fn current_identity(&self) -> Option<UserRef>;
}

/// Identity fixed at construction time.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<UserRef>);

impl StaticIdentity {
    pub fn signed_in(user: UserRef) -> Self {
        Self(Some(user))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_identity(&self) -> Option<UserRef> {
        self.0.clone()
    }
}

const IDENTITY_KEY: &str = "identity.current_user";

/// Signed-in user persisted in the store's key-value table.
pub struct StoredIdentity<'a, K: KvStore> {
    kv: &'a K,
}

impl<'a, K: KvStore> StoredIdentity<'a, K> {
    pub fn new(kv: &'a K) -> Self {
        Self { kv }
    }

    pub fn login(&self, user: &UserRef) -> Result<()> {
        self.kv.kv_set(IDENTITY_KEY, user.as_str())?;
        tracing::info!(user = %user, "signed in");
        Ok(())
    }

    /// Returns the user that was signed out, if any.
    pub fn logout(&self) -> Result<Option<UserRef>> {
        let previous = self.current_identity();
        self.kv.kv_delete(IDENTITY_KEY)?;
        if let Some(ref user) = previous {
            tracing::info!(user = %user, "signed out");
        }
        Ok(previous)
    }
}

impl<K: KvStore> IdentityProvider for StoredIdentity<'_, K> {
    fn current_identity(&self) -> Option<UserRef> {
        match self.kv.kv_get(IDENTITY_KEY) {
            Ok(value) => value.and_then(UserRef::new),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stored identity");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[test]
    fn blank_user_is_not_an_identity() {
        assert!(UserRef::new("  ").is_none());
        assert_eq!(UserRef::new(" ada ").unwrap().as_str(), "ada");
    }

    #[test]
    fn static_identity() {
        assert!(StaticIdentity::anonymous().current_identity().is_none());
        let user = UserRef::new("ada").unwrap();
        assert_eq!(
            StaticIdentity::signed_in(user.clone()).current_identity(),
            Some(user)
        );
    }

    #[test]
    fn stored_identity_login_logout() {
        let db = Database::open_memory().unwrap();
        let identity = StoredIdentity::new(&db);
        assert!(identity.current_identity().is_none());

        let user = UserRef::new("ada").unwrap();
        identity.login(&user).unwrap();
        assert_eq!(identity.current_identity(), Some(user.clone()));

        assert_eq!(identity.logout().unwrap(), Some(user));
        assert!(identity.current_identity().is_none());
        assert_eq!(identity.logout().unwrap(), None);
    }
}
