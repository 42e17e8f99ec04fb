//! Permission guards: choose between an allowed and a denied rendition.
//!
//! A guard never errors on denial; the only failure is constructing one with
//! a permission code the catalog does not know.

use scholaris_auth::{Authorizer, ConfigurationError, PermissionCatalog, PermissionCode};

use crate::bus::{SessionEvent, Subscription};
use crate::store::SessionStore;

/// Gate on a single permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard<T> {
    required: PermissionCode,
    allow: T,
    deny: T,
}

impl<T> Guard<T> {
    /// Fails with `UnknownPermission` (or `MalformedPermission`) when
    /// `required` is not in `catalog`.
    pub fn new(catalog: &PermissionCatalog, required: &str, allow: T, deny: T) -> Result<Self, ConfigurationError> {
        let required = catalog.resolve(required)?;
        Ok(Self { required, allow, deny })
    }

    pub fn required(&self) -> &PermissionCode {
        &self.required
    }

    pub fn is_allowed(&self, authz: &impl Authorizer) -> bool {
        authz.can_do(self.required.as_str())
    }

    pub fn resolve(&self, authz: &impl Authorizer) -> &T {
        if self.is_allowed(authz) {
            &self.allow
        } else {
            &self.deny
        }
    }

    /// Bind to a session so the decision follows principal and role changes.
    pub fn watch(self, store: &SessionStore) -> WatchedGuard<T> {
        WatchedGuard::new(self, store)
    }
}

/// A guard bound to a session store.
///
/// Subscribes before the first evaluation, so no change between the two is
/// missed. [`WatchedGuard::poll`] re-evaluates whenever events arrived.
#[derive(Debug)]
pub struct WatchedGuard<T> {
    guard: Guard<T>,
    events: Subscription<SessionEvent>,
    allowed: bool,
}

impl<T> WatchedGuard<T> {
    pub fn new(guard: Guard<T>, store: &SessionStore) -> Self {
        let events = store.subscribe();
        let allowed = guard.is_allowed(store);
        Self { guard, events, allowed }
    }

    /// The rendition chosen at the last evaluation.
    pub fn current(&self) -> &T {
        if self.allowed {
            &self.guard.allow
        } else {
            &self.guard.deny
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Re-evaluate if the session changed since the last call.
    pub fn poll(&mut self, store: &SessionStore) -> &T {
        if !self.events.drain().is_empty() {
            let allowed = self.guard.is_allowed(store);
            if allowed != self.allowed {
                tracing::debug!(permission = %self.guard.required, allowed, "guard decision changed");
            }
            self.allowed = allowed;
        }
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scholaris_auth::{Principal, RoleRegistry, codes, system_roles};
    use scholaris_core::{PrincipalId, School, SchoolId};

    use super::*;
    use crate::SessionConfig;
    use crate::storage::MemoryStorage;

    const SCHOOL: SchoolId = SchoolId::from_u128(3);

    fn store() -> (SessionStore, RoleRegistry) {
        let catalog = Arc::new(PermissionCatalog::standard());
        let registry = RoleRegistry::with_system_roles(Arc::clone(&catalog));
        (
            SessionStore::new(catalog, Arc::new(MemoryStorage::new()), SessionConfig::default()),
            registry,
        )
    }

    #[test]
    fn unknown_permission_is_a_configuration_error() {
        let catalog = PermissionCatalog::standard();
        assert!(matches!(
            Guard::new(&catalog, "fee.teleport", "on", "off"),
            Err(ConfigurationError::UnknownPermission(_))
        ));
        assert!(matches!(
            Guard::new(&catalog, "FeeCollect", "on", "off"),
            Err(ConfigurationError::MalformedPermission(_))
        ));
    }

    #[test]
    fn resolves_against_any_authorizer() {
        let (store, registry) = store();
        let guard = store.guard(codes::FEE_COLLECT, "collect", "hidden").unwrap();
        assert_eq!(*guard.resolve(&store), "hidden");

        let principal = Principal::new(
            PrincipalId::from_u128(1),
            registry.get(system_roles::SCHOOL_ADMIN).unwrap(),
            None,
            false,
            School { id: SCHOOL, has_branches: false },
        )
        .unwrap();
        assert_eq!(*guard.resolve(&principal), "collect");
    }

    #[test]
    fn watched_guard_follows_role_edits() {
        let (store, registry) = store();
        let clerk = registry.create(SCHOOL, "Clerk", "CLERK", [codes::FEE_READ]).unwrap();
        store.set_principal(
            Principal::new(
                PrincipalId::from_u128(2),
                Arc::clone(&clerk),
                None,
                false,
                School { id: SCHOOL, has_branches: false },
            )
            .unwrap(),
        );

        let mut watched = store.guard(codes::FEE_COLLECT, 1, 0).unwrap().watch(&store);
        assert_eq!(*watched.current(), 0);

        let edited = registry.toggle_permission(clerk.id, codes::FEE_COLLECT).unwrap();
        store.update_role(edited).unwrap();
        // Not re-evaluated until polled.
        assert_eq!(*watched.current(), 0);
        assert_eq!(*watched.poll(&store), 1);

        store.clear();
        assert_eq!(*watched.poll(&store), 0);
        assert!(!watched.is_allowed());
    }
}
