//! Session store: the current principal and scope, with change notification.
//!
//! One store per session, injected where it is needed (no global). Readers
//! take an `Arc<Principal>` snapshot and evaluate against it without holding
//! a lock; writers publish a whole new snapshot.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use scholaris_auth::{
    AuthMarker, Authorizer, ConfigurationError, PermissionCatalog, Principal, PrincipalPayload, Role,
    validate_marker,
};
use scholaris_core::BranchId;

use crate::bus::{SessionBus, SessionEvent, Subscription};
use crate::guard::Guard;
use crate::scope::{BranchScopeResolver, IgnoredReason, Scope, ScopeChange};
use crate::storage::{self, MARKER_KEY, SCOPE_KEY, SessionStorage, StorageError};
use crate::SessionConfig;

#[derive(Debug)]
pub struct SessionStore {
    catalog: Arc<PermissionCatalog>,
    config: SessionConfig,
    storage: Arc<dyn SessionStorage>,
    principal: RwLock<Option<Arc<Principal>>>,
    resolver: Mutex<BranchScopeResolver>,
    bus: SessionBus<SessionEvent>,
}

impl SessionStore {
    pub fn new(
        catalog: Arc<PermissionCatalog>,
        storage: Arc<dyn SessionStorage>,
        config: SessionConfig,
    ) -> Self {
        Self {
            catalog,
            config,
            resolver: Mutex::new(BranchScopeResolver::new(Arc::clone(&storage))),
            storage,
            principal: RwLock::new(None),
            bus: SessionBus::new(),
        }
    }

    /// Store with storage opened from `config`.
    pub fn from_config(catalog: Arc<PermissionCatalog>, config: SessionConfig) -> Result<Self, StorageError> {
        let storage = config.open_storage()?;
        Ok(Self::new(catalog, storage, config))
    }

    pub fn catalog(&self) -> &Arc<PermissionCatalog> {
        &self.catalog
    }

    // ── Principal ──

    /// Current principal snapshot.
    pub fn principal(&self) -> Option<Arc<Principal>> {
        self.principal.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Turn a login response into the session's principal.
    pub fn login(&self, payload: PrincipalPayload) -> Result<Scope, ConfigurationError> {
        let principal = Principal::from_payload(payload, &self.catalog)?;
        Ok(self.set_principal(principal))
    }

    /// Store `principal`, write the auth marker and (re-)initialize the scope.
    ///
    /// Scope initialization runs on every call, so a principal re-fetched with
    /// a different role is re-scoped immediately.
    pub fn set_principal(&self, principal: Principal) -> Scope {
        let principal = Arc::new(principal);
        let mut resolver = self.resolver();

        let before = resolver.scope().clone();
        let scope = resolver.initialize(&principal).clone();
        *self.principal.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&principal));

        self.write_marker(&principal);
        tracing::info!(
            principal_id = %principal.id,
            role = %principal.role.code,
            master = principal.is_master,
            "principal stored"
        );

        self.bus.publish(SessionEvent::PrincipalChanged {
            principal_id: principal.id,
        });
        if scope != before {
            self.bus.publish(SessionEvent::ScopeChanged(scope.clone()));
        }
        drop(resolver);
        scope
    }

    /// Swap in a newer snapshot of a role (edited server-side mid-session).
    ///
    /// Returns `Ok(false)` when the stored principal does not hold `role`.
    pub fn update_role(&self, role: Arc<Role>) -> Result<bool, ConfigurationError> {
        let mut resolver = self.resolver();
        let Some(current) = self.principal() else {
            return Ok(false);
        };
        if !current.holds_role(&role) {
            return Ok(false);
        }

        let next = Arc::new(current.with_role(Arc::clone(&role))?);
        let before = resolver.scope().clone();
        let scope = resolver.initialize(&next).clone();
        *self.principal.write().unwrap_or_else(PoisonError::into_inner) = Some(next);

        tracing::info!(role_id = %role.id, role = %role.code, permissions = role.permissions.len(), "session role updated");
        self.bus.publish(SessionEvent::RoleUpdated { role_id: role.id });
        if scope != before {
            self.bus.publish(SessionEvent::ScopeChanged(scope));
        }
        Ok(true)
    }

    /// Logout: drop the principal, reset the scope, remove the marker.
    pub fn clear(&self) {
        let mut resolver = self.resolver();
        resolver.reset();
        let previous = self.principal.write().unwrap_or_else(PoisonError::into_inner).take();

        if let Err(err) = self.storage.remove(MARKER_KEY) {
            tracing::warn!(error = %err, "failed to remove auth marker");
        }
        if let Some(p) = previous {
            tracing::info!(principal_id = %p.id, "session cleared");
        }
        self.bus.publish(SessionEvent::Cleared);
    }

    // ── Evaluation ──

    /// `false` when nobody is logged in.
    pub fn can_do(&self, code: &str) -> bool {
        self.principal()
            .is_some_and(|p| scholaris_auth::can_do(&p, code))
    }

    pub fn is_master_admin(&self) -> bool {
        self.principal()
            .is_some_and(|p| scholaris_auth::is_master_admin(&p))
    }

    pub fn school_has_branches(&self) -> bool {
        self.principal()
            .is_some_and(|p| scholaris_auth::school_has_branches(&p))
    }

    /// A guard whose permission is checked against this session's catalog.
    pub fn guard<T>(&self, required: &str, allow: T, deny: T) -> Result<Guard<T>, ConfigurationError> {
        Guard::new(&self.catalog, required, allow, deny)
    }

    // ── Scope ──

    pub fn scope(&self) -> Scope {
        self.resolver().scope().clone()
    }

    pub fn active_branch_id(&self) -> Option<BranchId> {
        self.resolver().active_branch_id()
    }

    pub fn set_active_branch(
        &self,
        branch_id: BranchId,
        name: impl Into<String>,
    ) -> Result<ScopeChange, StorageError> {
        let name = name.into();
        self.change_scope(|resolver, principal| resolver.select_branch(principal, branch_id, Some(name)))
    }

    pub fn clear_active_branch(&self) -> Result<ScopeChange, StorageError> {
        self.change_scope(|resolver, principal| resolver.clear_branch(principal))
    }

    fn change_scope<F>(&self, change: F) -> Result<ScopeChange, StorageError>
    where
        F: FnOnce(&mut BranchScopeResolver, &Principal) -> Result<ScopeChange, StorageError>,
    {
        let mut resolver = self.resolver();
        let Some(principal) = self.principal() else {
            return Ok(ScopeChange::Ignored(IgnoredReason::NoPrincipal));
        };
        let outcome = change(&mut resolver, &principal)?;

        if let ScopeChange::Changed(scope) = &outcome {
            self.bus.publish(SessionEvent::ScopeChanged(scope.clone()));
        }
        Ok(outcome)
    }

    // ── Notification ──

    pub fn subscribe(&self) -> Subscription<SessionEvent> {
        self.bus.subscribe()
    }

    // ── Auth marker ──

    /// The persisted marker, if present and still valid at `now`.
    ///
    /// Invalid or unreadable markers are removed together with the persisted
    /// scope: the session they belonged to is over.
    pub fn restore_marker(&self, now: DateTime<Utc>) -> Option<AuthMarker> {
        let marker = match storage::load_json::<AuthMarker>(self.storage.as_ref(), MARKER_KEY) {
            Ok(marker) => marker?,
            Err(err) => {
                tracing::warn!(error = %err, "auth marker unreadable; discarding");
                self.discard_persisted_session();
                return None;
            }
        };

        match validate_marker(&marker, now) {
            Ok(()) => Some(marker),
            Err(err) => {
                tracing::debug!(error = %err, "auth marker rejected");
                self.discard_persisted_session();
                None
            }
        }
    }

    fn write_marker(&self, principal: &Principal) {
        let marker = AuthMarker::issue(principal.role.code.clone(), Utc::now(), self.config.marker_ttl);
        if let Err(err) = storage::save_json(self.storage.as_ref(), MARKER_KEY, &marker) {
            tracing::warn!(error = %err, "failed to persist auth marker");
        }
    }

    fn discard_persisted_session(&self) {
        let _resolver = self.resolver();
        for key in [MARKER_KEY, SCOPE_KEY] {
            if let Err(err) = self.storage.remove(key) {
                tracing::warn!(key, error = %err, "failed to discard persisted session state");
            }
        }
    }

    // Scope writes, principal swaps and their events are serialized through
    // this lock, so subscribers see changes in the order they were applied.
    fn resolver(&self) -> MutexGuard<'_, BranchScopeResolver> {
        self.resolver.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Authorizer for SessionStore {
    fn can_do(&self, code: &str) -> bool {
        SessionStore::can_do(self, code)
    }
}
