use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use scholaris_core::{BranchId, PrincipalId, RoleId, School};

use crate::{ConfigurationError, PermissionCatalog, PermissionCode, Role, RoleCode};

/// An authenticated actor, as the authorization engine sees it.
///
/// Owned by the authentication subsystem: the engine reads it and never
/// mutates it. Role updates produce a *new* principal carrying the new role
/// snapshot (see [`Principal::with_role`]).
///
/// # Invariants
/// - A non-master principal whose role is `BRANCH_ADMIN` has a branch.
/// - A master principal bypasses every check; its role and branch are
///   informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: PrincipalId,
    pub role: Arc<Role>,
    pub branch_id: Option<BranchId>,
    pub is_master: bool,
    pub school: School,
}

impl Principal {
    pub fn new(
        id: PrincipalId,
        role: Arc<Role>,
        branch_id: Option<BranchId>,
        is_master: bool,
        school: School,
    ) -> Result<Self, ConfigurationError> {
        if !is_master && role.is_branch_admin() && branch_id.is_none() {
            return Err(ConfigurationError::MissingBranch(role.code.to_string()));
        }
        Ok(Self {
            id,
            role,
            branch_id,
            is_master,
            school,
        })
    }

    /// Build a principal from the identity endpoint's response.
    ///
    /// Permission codes the catalog does not know are dropped (and logged):
    /// the server is the authority on grants, and a code that cannot be
    /// resolved could never be asked for through a valid call site anyway.
    pub fn from_payload(
        payload: PrincipalPayload,
        catalog: &PermissionCatalog,
    ) -> Result<Self, ConfigurationError> {
        let code = RoleCode::parse(payload.role.code)?;

        let mut permissions: HashSet<PermissionCode> = HashSet::with_capacity(payload.role.permissions.len());
        for raw in payload.role.permissions {
            match catalog.resolve(&raw) {
                Ok(code) => {
                    permissions.insert(code);
                }
                Err(err) => {
                    tracing::warn!(principal_id = %payload.id, error = %err, "dropping permission from login payload");
                }
            }
        }

        // System roles are global; custom roles belong to the principal's school.
        let is_system = code == RoleCode::SCHOOL_ADMIN || code == RoleCode::BRANCH_ADMIN;
        let role = Role {
            id: payload.role.id.unwrap_or_else(RoleId::new),
            school_id: (!is_system).then_some(payload.school.id),
            name: payload.role.name.unwrap_or_else(|| code.to_string()),
            is_system,
            code,
            permissions,
            archived: false,
        };

        Self::new(payload.id, Arc::new(role), payload.branch_id, payload.is_master, payload.school)
    }

    /// Whether the role is pinned to one branch for the whole session.
    pub fn is_fixed_branch_admin(&self) -> bool {
        !self.is_master && self.role.is_branch_admin()
    }

    /// Whether `role` is (a newer snapshot of) the role this principal holds.
    ///
    /// Codes are unique within a school, so a code match within the
    /// principal's school (or a global role) identifies the same role.
    pub fn holds_role(&self, role: &Role) -> bool {
        role.id == self.role.id
            || (role.code == self.role.code
                && role.school_id.is_none_or(|school| school == self.school.id))
    }

    /// Same principal, new role snapshot.
    pub fn with_role(&self, role: Arc<Role>) -> Result<Self, ConfigurationError> {
        Self::new(self.id, role, self.branch_id, self.is_master, self.school)
    }
}

/// Role part of the login response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePayload {
    #[serde(default)]
    pub id: Option<RoleId>,
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Principal shape returned by the identity/login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalPayload {
    pub id: PrincipalId,
    pub role: RolePayload,
    #[serde(default)]
    pub branch_id: Option<BranchId>,
    pub school: School,
    #[serde(default)]
    pub is_master: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes;
    use scholaris_core::SchoolId;

    fn payload(json: &str) -> PrincipalPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn parses_login_payload() {
        let catalog = PermissionCatalog::standard();
        let principal = Principal::from_payload(
            payload(
                r#"{
                    "id": "00000000-0000-0000-0000-0000000000aa",
                    "role": {"code": "FEE_MANAGER", "permissions": ["fee.read", "fee.collect", "fee.bogus"]},
                    "school": {"id": "00000000-0000-0000-0000-000000000001", "hasBranches": true}
                }"#,
            ),
            &catalog,
        )
        .unwrap();

        assert!(!principal.is_master);
        assert_eq!(principal.branch_id, None);
        assert_eq!(principal.role.permissions.len(), 2);
        assert!(principal.role.has_permission(codes::FEE_COLLECT));
        assert!(!principal.role.is_system);
        assert_eq!(principal.role.school_id, Some(SchoolId::from_u128(1)));
    }

    #[test]
    fn branch_admin_without_branch_is_rejected() {
        let catalog = PermissionCatalog::standard();
        let result = Principal::from_payload(
            payload(
                r#"{
                    "id": "00000000-0000-0000-0000-0000000000ab",
                    "role": {"code": "BRANCH_ADMIN", "permissions": []},
                    "school": {"id": "00000000-0000-0000-0000-000000000001", "hasBranches": true}
                }"#,
            ),
            &catalog,
        );
        assert!(matches!(result, Err(ConfigurationError::MissingBranch(_))));
    }

    #[test]
    fn master_branch_admin_needs_no_branch() {
        let catalog = PermissionCatalog::standard();
        let principal = Principal::from_payload(
            payload(
                r#"{
                    "id": "00000000-0000-0000-0000-0000000000ac",
                    "role": {"code": "BRANCH_ADMIN"},
                    "school": {"id": "00000000-0000-0000-0000-000000000001", "hasBranches": true},
                    "isMaster": true
                }"#,
            ),
            &catalog,
        )
        .unwrap();
        assert!(!principal.is_fixed_branch_admin());
    }

    #[test]
    fn system_role_from_payload_is_global() {
        let catalog = PermissionCatalog::standard();
        let principal = Principal::from_payload(
            payload(
                r#"{
                    "id": "00000000-0000-0000-0000-0000000000ae",
                    "role": {"code": "SCHOOL_ADMIN", "permissions": ["branch.read"]},
                    "school": {"id": "00000000-0000-0000-0000-000000000001", "hasBranches": true}
                }"#,
            ),
            &catalog,
        )
        .unwrap();
        assert!(principal.role.is_system);
        assert_eq!(principal.role.school_id, None);
    }

    #[test]
    fn malformed_role_code_is_rejected() {
        let catalog = PermissionCatalog::standard();
        let result = Principal::from_payload(
            payload(
                r#"{
                    "id": "00000000-0000-0000-0000-0000000000ad",
                    "role": {"code": "fee manager"},
                    "school": {"id": "00000000-0000-0000-0000-000000000001", "hasBranches": false}
                }"#,
            ),
            &catalog,
        );
        assert!(matches!(result, Err(ConfigurationError::MalformedRoleCode(_))));
    }

    #[test]
    fn holds_role_matches_by_id_or_code() {
        let catalog = PermissionCatalog::standard();
        let school = School { id: SchoolId::from_u128(1), has_branches: false };
        let role = Role::create(&catalog, Some(school.id), "Clerk", "CLERK", [codes::FEE_READ]).unwrap();
        let principal = Principal::new(PrincipalId::from_u128(1), Arc::new(role.clone()), None, false, school).unwrap();

        assert!(principal.holds_role(&role));

        let same_code = Role { id: RoleId::from_u128(77), ..role.clone() };
        assert!(principal.holds_role(&same_code));

        let other_school = Role { id: RoleId::from_u128(78), school_id: Some(SchoolId::from_u128(2)), ..role };
        assert!(!principal.holds_role(&other_school));
    }
}
