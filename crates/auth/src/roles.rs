use std::borrow::Cow;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use scholaris_core::{Entity, RoleId, SchoolId};

use crate::{ConfigurationError, PermissionCatalog, PermissionCode};

/// Role code used for RBAC lookups (e.g. `FEE_MANAGER`).
///
/// Uppercase ASCII letters, digits and underscores, starting with a letter.
/// Unique within a school.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleCode(Cow<'static, str>);

impl RoleCode {
    /// School-wide administrator (system role).
    pub const SCHOOL_ADMIN: RoleCode = RoleCode(Cow::Borrowed("SCHOOL_ADMIN"));
    /// Administrator pinned to one branch (system role).
    pub const BRANCH_ADMIN: RoleCode = RoleCode(Cow::Borrowed("BRANCH_ADMIN"));

    pub fn parse(code: impl Into<Cow<'static, str>>) -> Result<Self, ConfigurationError> {
        let code = code.into();
        let mut bytes = code.bytes();
        let well_formed = matches!(bytes.next(), Some(b) if b.is_ascii_uppercase())
            && bytes.all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
            && !code.ends_with('_')
            && !code.contains("__");
        if well_formed {
            Ok(Self(code))
        } else {
            Err(ConfigurationError::MalformedRoleCode(code.into_owned()))
        }
    }

    /// Derive a code from a display name: `"Fee manager"` -> `FEE_MANAGER`.
    pub fn from_name(name: &str) -> Result<Self, ConfigurationError> {
        let mut code = String::with_capacity(name.len());
        let mut pending_separator = false;
        for c in name.trim().chars() {
            if c.is_ascii_alphanumeric() {
                if pending_separator && !code.is_empty() {
                    code.push('_');
                }
                pending_separator = false;
                code.push(c.to_ascii_uppercase());
            } else {
                pending_separator = true;
            }
        }
        Self::parse(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_branch_admin(&self) -> bool {
        *self == Self::BRANCH_ADMIN
    }
}

impl TryFrom<String> for RoleCode {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RoleCode> for String {
    fn from(value: RoleCode) -> Self {
        value.0.into_owned()
    }
}

impl core::fmt::Display for RoleCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

const MAX_NAME_LEN: usize = 100;

fn validate_name(name: &str) -> Result<String, ConfigurationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ConfigurationError::InvalidRoleName("name must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ConfigurationError::InvalidRoleName(format!(
            "name must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// A named, coded bundle of permissions.
///
/// Roles are values: every mutation returns a new `Role`, so a snapshot handed
/// to an evaluator never changes underneath it.
///
/// # Invariants
/// - Every permission exists in the catalog the role was validated against.
/// - Permissions form a set (membership checks are O(1)).
/// - `school_id == None` marks a global role (system roles are global).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub school_id: Option<SchoolId>,
    pub name: String,
    pub code: RoleCode,
    pub is_system: bool,
    pub permissions: HashSet<PermissionCode>,
    #[serde(default)]
    pub archived: bool,
}

impl Role {
    /// Validate and build a custom role.
    ///
    /// Uniqueness of `code` is a school-level concern checked by
    /// [`crate::RoleRegistry::create`].
    pub fn create<I, S>(
        catalog: &PermissionCatalog,
        school_id: Option<SchoolId>,
        name: &str,
        code: &str,
        permissions: I,
    ) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            id: RoleId::new(),
            school_id,
            name: validate_name(name)?,
            code: RoleCode::parse(code.to_string())?,
            is_system: false,
            permissions: catalog.resolve_all(permissions)?,
            archived: false,
        })
    }

    /// Build a system role (global, undeletable).
    pub fn system(
        id: RoleId,
        name: &str,
        code: RoleCode,
        permissions: HashSet<PermissionCode>,
    ) -> Self {
        Self {
            id,
            school_id: None,
            name: name.to_string(),
            code,
            is_system: true,
            permissions,
            archived: false,
        }
    }

    pub fn has_permission(&self, code: &str) -> bool {
        self.permissions.contains(code)
    }

    pub fn is_branch_admin(&self) -> bool {
        self.code.is_branch_admin()
    }

    /// Add `code` if absent, remove it if present.
    pub fn toggle_permission(&self, code: &PermissionCode) -> Self {
        let mut next = self.clone();
        if !next.permissions.remove(code) {
            next.permissions.insert(code.clone());
        }
        next
    }

    /// If every code of `module` is held, drop them all; otherwise grant them all.
    ///
    /// Applying this twice from "none selected" returns to "none selected".
    pub fn toggle_module(
        &self,
        catalog: &PermissionCatalog,
        module: &str,
    ) -> Result<Self, ConfigurationError> {
        let codes = catalog.module_codes(module)?;
        let mut next = self.clone();
        if codes.iter().all(|c| next.permissions.contains(c)) {
            for c in codes {
                next.permissions.remove(c);
            }
        } else {
            next.permissions.extend(codes.iter().cloned());
        }
        Ok(next)
    }

    /// Whether the role holds every code of `module` (editor checkbox state).
    pub fn has_module(&self, catalog: &PermissionCatalog, module: &str) -> bool {
        match catalog.module_codes(module) {
            Ok(codes) => !codes.is_empty() && codes.iter().all(|c| self.permissions.contains(c)),
            Err(_) => false,
        }
    }

    pub fn with_name(&self, name: &str) -> Result<Self, ConfigurationError> {
        Ok(Self {
            name: validate_name(name)?,
            ..self.clone()
        })
    }

    pub fn with_permissions(&self, permissions: HashSet<PermissionCode>) -> Self {
        Self {
            permissions,
            ..self.clone()
        }
    }

    /// Permissions sorted for display.
    pub fn sorted_permissions(&self) -> Vec<&PermissionCode> {
        let mut perms: Vec<&PermissionCode> = self.permissions.iter().collect();
        perms.sort();
        perms
    }
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
