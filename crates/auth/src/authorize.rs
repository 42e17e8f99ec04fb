//! Authorization evaluator: the single decision point for privileged actions.
//!
//! - No IO
//! - No panics
//! - Total: every `(principal, code)` pair yields a boolean

use serde::Serialize;

use scholaris_core::PrincipalId;

use crate::Principal;

/// Decide whether `principal` may perform `code`.
///
/// 1. Master principals are always allowed (even with an empty role).
/// 2. Otherwise the role's permission set must contain `code`.
/// 3. Everything else is denied, including malformed or unknown codes.
///
/// Membership is a hash lookup, O(1) in the size of the permission set.
pub fn can_do(principal: &Principal, code: &str) -> bool {
    principal.is_master || principal.role.permissions.contains(code)
}

pub fn is_master_admin(principal: &Principal) -> bool {
    principal.is_master
}

pub fn school_has_branches(principal: &Principal) -> bool {
    principal.school.has_branches
}

/// Capability consulted wherever an action is gated.
///
/// Implemented by [`Principal`] directly and by the session store (which
/// delegates to its current principal), so call sites depend on this trait
/// rather than re-implementing checks.
pub trait Authorizer {
    fn can_do(&self, code: &str) -> bool;

    fn can_do_all(&self, codes: &[&str]) -> bool {
        codes.iter().all(|c| self.can_do(c))
    }

    fn can_do_any(&self, codes: &[&str]) -> bool {
        codes.iter().any(|c| self.can_do(c))
    }
}

impl Authorizer for Principal {
    fn can_do(&self, code: &str) -> bool {
        can_do(self, code)
    }
}

impl<A: Authorizer + ?Sized> Authorizer for &A {
    fn can_do(&self, code: &str) -> bool {
        (**self).can_do(code)
    }
}

impl<A: Authorizer + ?Sized> Authorizer for std::sync::Arc<A> {
    fn can_do(&self, code: &str) -> bool {
        (**self).can_do(code)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    MasterBypass,
    RolePermission,
    MissingPermission,
    /// The code is not even well formed (`<module>.<action>`).
    UnknownPermission,
}

/// Detailed explanation of an authorization decision (for audit/debug views).
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub principal_id: PrincipalId,
    pub required_permission: String,
    pub granted: bool,
    pub kind: DecisionKind,
    pub role_code: String,
    pub reason: String,
    pub suggestions: Vec<String>,
}

/// Explain the decision [`can_do`] makes for the same inputs.
///
/// `granted` always equals `can_do(principal, code)`.
pub fn explain(principal: &Principal, code: &str) -> AuthorizationExplanation {
    let role_code = principal.role.code.to_string();

    let (kind, reason, suggestions) = if principal.is_master {
        (
            DecisionKind::MasterBypass,
            "Principal is a master admin; permission checks are bypassed".to_string(),
            Vec::new(),
        )
    } else if principal.role.permissions.contains(code) {
        (
            DecisionKind::RolePermission,
            format!("Role '{role_code}' grants '{code}'"),
            Vec::new(),
        )
    } else if !crate::permissions::is_well_formed(code) {
        (
            DecisionKind::UnknownPermission,
            format!("'{code}' is not a valid permission code"),
            vec!["Use a constant from `scholaris_auth::codes` instead of a literal".to_string()],
        )
    } else {
        (
            DecisionKind::MissingPermission,
            format!("Role '{role_code}' does not grant '{code}'"),
            vec![
                format!("Grant '{code}' to role '{role_code}' in the role editor"),
                format!("Assign a role that grants '{code}'"),
            ],
        )
    };

    let granted = matches!(kind, DecisionKind::MasterBypass | DecisionKind::RolePermission);
    if !granted {
        tracing::debug!(principal_id = %principal.id, role = %role_code, permission = code, ?kind, "authorization denied");
    }

    AuthorizationExplanation {
        principal_id: principal.id,
        required_permission: code.to_string(),
        granted,
        kind,
        role_code,
        reason,
        suggestions,
    }
}
