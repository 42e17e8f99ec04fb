//! Branch scope resolver: the active branch filter for tenant-scoped queries.
//!
//! States are `Unscoped` (whole school visible) and `Scoped(branch)`. A fixed
//! branch admin is initialized into its own branch and can never leave it;
//! everyone else may switch when they hold `branch.read` and the school has
//! branches.
//!
//! The resolver is a client-side filter. Servers still enforce branch
//! visibility on every query.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use scholaris_auth::{Principal, can_do, codes};
use scholaris_core::{BranchId, PrincipalId, SchoolId};

use crate::storage::{self, SCOPE_KEY, SessionStorage, StorageError};

/// The active branch filter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Scope {
    /// No branch restriction: full school visibility.
    #[default]
    Unscoped,
    Scoped {
        branch_id: BranchId,
        /// Display name, when known (branch admins are scoped by id only).
        branch_name: Option<String>,
    },
}

impl Scope {
    pub fn branch_id(&self) -> Option<BranchId> {
        match self {
            Scope::Unscoped => None,
            Scope::Scoped { branch_id, .. } => Some(*branch_id),
        }
    }

    pub fn branch_name(&self) -> Option<&str> {
        match self {
            Scope::Unscoped => None,
            Scope::Scoped { branch_name, .. } => branch_name.as_deref(),
        }
    }

    pub fn is_scoped(&self) -> bool {
        matches!(self, Scope::Scoped { .. })
    }

    pub fn filter(&self) -> ScopeFilter {
        ScopeFilter {
            branch_id: self.branch_id(),
        }
    }
}

/// Optional branch filter handed to query builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScopeFilter {
    pub branch_id: Option<BranchId>,
}

impl ScopeFilter {
    /// Whether a row belonging to `row_branch` passes the filter.
    ///
    /// Rows without a branch (school-wide records) only pass an unscoped
    /// filter.
    pub fn matches(&self, row_branch: Option<BranchId>) -> bool {
        match self.branch_id {
            None => true,
            Some(active) => row_branch == Some(active),
        }
    }
}

/// Why a scope change request was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReason {
    /// Branch admins are pinned to their branch.
    FixedBranchAdmin,
    /// The school has no branches; scoping has no effect.
    NoBranchSupport,
    /// The principal lacks `branch.read`.
    MissingCapability,
    /// No principal is logged in.
    NoPrincipal,
}

/// Outcome of a scope change request.
///
/// Rejections are outcomes, not errors: the resolver is a UX convenience and
/// a disallowed change is a silent no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeChange {
    Changed(Scope),
    Unchanged,
    Ignored(IgnoredReason),
}

impl ScopeChange {
    pub fn is_changed(&self) -> bool {
        matches!(self, ScopeChange::Changed(_))
    }
}

/// Scope as persisted for reload, tagged with the principal and school it
/// belongs to. Restored only for that same pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PersistedScope {
    principal_id: PrincipalId,
    school_id: SchoolId,
    branch_id: BranchId,
    branch_name: Option<String>,
}

#[derive(Debug)]
pub struct BranchScopeResolver {
    storage: Arc<dyn SessionStorage>,
    scope: Scope,
}

impl BranchScopeResolver {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            storage,
            scope: Scope::Unscoped,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn active_branch_id(&self) -> Option<BranchId> {
        self.scope.branch_id()
    }

    /// Establish the scope for `principal`.
    ///
    /// Safe to call repeatedly (on login and on every role change):
    /// - school without branches: `Unscoped`
    /// - fixed branch admin: `Scoped(principal.branch_id)`, left untouched when
    ///   already correct
    /// - otherwise: the persisted scope if it was saved by this principal in
    ///   this school and the principal may switch branches, else `Unscoped`
    pub fn initialize(&mut self, principal: &Principal) -> &Scope {
        if !principal.school.has_branches {
            self.discard_persisted();
            self.scope = Scope::Unscoped;
            return &self.scope;
        }

        if principal.is_fixed_branch_admin() {
            // `Principal::new` guarantees the branch; fall back to the current
            // value rather than ever unscoping a branch admin.
            if let Some(branch_id) = principal.branch_id {
                if self.scope.branch_id() != Some(branch_id) {
                    self.scope = Scope::Scoped {
                        branch_id,
                        branch_name: None,
                    };
                    tracing::info!(principal_id = %principal.id, branch_id = %branch_id, "branch admin scoped to own branch");
                }
            }
            return &self.scope;
        }

        self.scope = if may_switch(principal) {
            self.restore(principal)
        } else {
            Scope::Unscoped
        };
        &self.scope
    }

    /// Switch to `branch_id`. Persists before acknowledging.
    pub fn select_branch(
        &mut self,
        principal: &Principal,
        branch_id: BranchId,
        branch_name: Option<String>,
    ) -> Result<ScopeChange, StorageError> {
        if let Some(reason) = switch_blocked(principal) {
            tracing::debug!(principal_id = %principal.id, branch_id = %branch_id, ?reason, "branch selection ignored");
            return Ok(ScopeChange::Ignored(reason));
        }

        let next = Scope::Scoped {
            branch_id,
            branch_name: branch_name.clone(),
        };
        if next == self.scope {
            return Ok(ScopeChange::Unchanged);
        }

        storage::save_json(
            self.storage.as_ref(),
            SCOPE_KEY,
            &PersistedScope {
                principal_id: principal.id,
                school_id: principal.school.id,
                branch_id,
                branch_name,
            },
        )?;
        self.scope = next;
        tracing::info!(principal_id = %principal.id, branch_id = %branch_id, "active branch selected");
        Ok(ScopeChange::Changed(self.scope.clone()))
    }

    /// Return to `Unscoped`. Idempotent.
    pub fn clear_branch(&mut self, principal: &Principal) -> Result<ScopeChange, StorageError> {
        if let Some(reason) = switch_blocked(principal) {
            tracing::debug!(principal_id = %principal.id, ?reason, "branch clear ignored");
            return Ok(ScopeChange::Ignored(reason));
        }

        self.storage.remove(SCOPE_KEY)?;
        if self.scope == Scope::Unscoped {
            return Ok(ScopeChange::Unchanged);
        }
        self.scope = Scope::Unscoped;
        tracing::info!(principal_id = %principal.id, "active branch cleared");
        Ok(ScopeChange::Changed(Scope::Unscoped))
    }

    /// Logout: unconditionally unscoped, persisted scope discarded.
    pub fn reset(&mut self) {
        self.discard_persisted();
        self.scope = Scope::Unscoped;
    }

    fn restore(&self, principal: &Principal) -> Scope {
        match storage::load_json::<PersistedScope>(self.storage.as_ref(), SCOPE_KEY) {
            Ok(Some(saved)) if saved.principal_id == principal.id && saved.school_id == principal.school.id => {
                Scope::Scoped {
                    branch_id: saved.branch_id,
                    branch_name: saved.branch_name,
                }
            }
            Ok(Some(_)) => {
                tracing::debug!(
                    principal_id = %principal.id,
                    school_id = %principal.school.id,
                    "persisted scope belongs to another session; discarding"
                );
                self.discard_persisted();
                Scope::Unscoped
            }
            Ok(None) => Scope::Unscoped,
            Err(err) => {
                tracing::warn!(error = %err, "persisted scope unreadable; starting unscoped");
                self.discard_persisted();
                Scope::Unscoped
            }
        }
    }

    fn discard_persisted(&self) {
        if let Err(err) = self.storage.remove(SCOPE_KEY) {
            tracing::warn!(error = %err, "failed to discard persisted scope");
        }
    }
}

fn may_switch(principal: &Principal) -> bool {
    switch_blocked(principal).is_none()
}

fn switch_blocked(principal: &Principal) -> Option<IgnoredReason> {
    if principal.is_fixed_branch_admin() {
        Some(IgnoredReason::FixedBranchAdmin)
    } else if !principal.school.has_branches {
        Some(IgnoredReason::NoBranchSupport)
    } else if !can_do(principal, codes::BRANCH_READ) {
        Some(IgnoredReason::MissingCapability)
    } else {
        None
    }
}
