//! Role registry: school-scoped role definitions with copy-on-write snapshots.
//!
//! Readers get `Arc<Role>` snapshots. Every edit builds a new `Role` and swaps
//! the `Arc` in one step, so a reader evaluating an old snapshot never sees a
//! half-applied permission set.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use scholaris_core::{RoleId, SchoolId};

use crate::codes::SCHOOL_ONLY_MODULES;
use crate::{ConfigurationError, PermissionCatalog, PermissionCode, Role, RoleCode, codes};

/// Well-known ids of the global system roles.
pub mod system_roles {
    use scholaris_core::RoleId;

    /// School Admin role - every permission, school-wide scope.
    pub const SCHOOL_ADMIN: RoleId = RoleId::from_u128(0x00000000_0000_0000_0000_000000000001);
    /// Branch Admin role - branch-level management, pinned to one branch.
    pub const BRANCH_ADMIN: RoleId = RoleId::from_u128(0x00000000_0000_0000_0000_000000000002);

    pub fn all() -> Vec<RoleId> {
        vec![SCHOOL_ADMIN, BRANCH_ADMIN]
    }

    pub fn is_system_role(role_id: &RoleId) -> bool {
        all().contains(role_id)
    }
}

/// What `RoleRegistry::delete` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Role still referenced by an active principal: archived, still resolvable.
    Archived,
    /// Role removed.
    Removed,
}

/// In-process role store.
///
/// The registry does not talk to the role-management API; callers load it
/// from whatever the API returned and push edits back themselves.
#[derive(Debug)]
pub struct RoleRegistry {
    catalog: Arc<PermissionCatalog>,
    roles: RwLock<HashMap<RoleId, Arc<Role>>>,
}

impl RoleRegistry {
    pub fn new(catalog: Arc<PermissionCatalog>) -> Self {
        Self {
            catalog,
            roles: RwLock::new(HashMap::new()),
        }
    }

    /// Registry pre-populated with the global system roles.
    pub fn with_system_roles(catalog: Arc<PermissionCatalog>) -> Self {
        let registry = Self::new(catalog);
        registry.seed_system_roles();
        registry
    }

    pub fn catalog(&self) -> &Arc<PermissionCatalog> {
        &self.catalog
    }

    /// Install (or refresh) `SCHOOL_ADMIN` and `BRANCH_ADMIN`.
    ///
    /// Branch admins get everything except school-wide modules, keeping only
    /// `branch.read` from those.
    pub fn seed_system_roles(&self) {
        let all: HashSet<PermissionCode> = self.catalog.all_codes().cloned().collect();
        let branch_level: HashSet<PermissionCode> = all
            .iter()
            .filter(|c| {
                !SCHOOL_ONLY_MODULES.iter().any(|m| *m == c.module()) || c.as_str() == codes::BRANCH_READ
            })
            .cloned()
            .collect();

        let mut roles = self.write();
        roles.insert(
            system_roles::SCHOOL_ADMIN,
            Arc::new(Role::system(
                system_roles::SCHOOL_ADMIN,
                "School Admin",
                RoleCode::SCHOOL_ADMIN,
                all,
            )),
        );
        roles.insert(
            system_roles::BRANCH_ADMIN,
            Arc::new(Role::system(
                system_roles::BRANCH_ADMIN,
                "Branch Admin",
                RoleCode::BRANCH_ADMIN,
                branch_level,
            )),
        );
    }

    /// Insert a role fetched from the role-management API.
    ///
    /// Permissions are re-validated against the catalog.
    pub fn load(&self, role: Role) -> Result<Arc<Role>, ConfigurationError> {
        for code in &role.permissions {
            self.catalog.resolve(code.as_str())?;
        }
        let mut roles = self.write();
        if Self::code_taken(&roles, role.school_id, &role.code, Some(role.id)) {
            return Err(ConfigurationError::DuplicateRoleCode(role.code.to_string()));
        }
        let role = Arc::new(role);
        roles.insert(role.id, Arc::clone(&role));
        Ok(role)
    }

    /// Create a custom role.
    ///
    /// Fails with `DuplicateRoleCode` if the code exists in the school (or is
    /// a global system code); the existing role is left untouched.
    pub fn create<I, S>(
        &self,
        school_id: SchoolId,
        name: &str,
        code: &str,
        permissions: I,
    ) -> Result<Arc<Role>, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let role = Role::create(&self.catalog, Some(school_id), name, code, permissions)?;

        let mut roles = self.write();
        if Self::code_taken(&roles, role.school_id, &role.code, None) {
            tracing::debug!(school_id = %school_id, code = %role.code, "duplicate role code rejected");
            return Err(ConfigurationError::DuplicateRoleCode(role.code.to_string()));
        }
        let role = Arc::new(role);
        roles.insert(role.id, Arc::clone(&role));
        tracing::info!(role_id = %role.id, code = %role.code, "role created");
        Ok(role)
    }

    pub fn get(&self, role_id: RoleId) -> Option<Arc<Role>> {
        self.read().get(&role_id).cloned()
    }

    /// Find an active role visible to `school_id` by code.
    pub fn find_by_code(&self, school_id: SchoolId, code: &str) -> Option<Arc<Role>> {
        self.read()
            .values()
            .find(|r| {
                !r.archived
                    && r.code.as_str() == code
                    && (r.school_id == Some(school_id) || r.school_id.is_none())
            })
            .cloned()
    }

    /// Active roles visible to a school (its own plus global ones), system
    /// roles first, then by name.
    pub fn list(&self, school_id: SchoolId) -> Vec<Arc<Role>> {
        let mut roles: Vec<Arc<Role>> = self
            .read()
            .values()
            .filter(|r| !r.archived && (r.school_id == Some(school_id) || r.school_id.is_none()))
            .cloned()
            .collect();
        roles.sort_by(|a, b| b.is_system.cmp(&a.is_system).then_with(|| a.name.cmp(&b.name)));
        roles
    }

    pub fn rename(&self, role_id: RoleId, name: &str) -> Result<Arc<Role>, ConfigurationError> {
        self.update(role_id, |role| role.with_name(name))
    }

    pub fn set_permissions<I, S>(&self, role_id: RoleId, permissions: I) -> Result<Arc<Role>, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let permissions = self.catalog.resolve_all(permissions)?;
        self.update(role_id, |role| Ok(role.with_permissions(permissions)))
    }

    pub fn toggle_permission(&self, role_id: RoleId, code: &str) -> Result<Arc<Role>, ConfigurationError> {
        let code = self.catalog.resolve(code)?;
        self.update(role_id, |role| Ok(role.toggle_permission(&code)))
    }

    pub fn toggle_module(&self, role_id: RoleId, module: &str) -> Result<Arc<Role>, ConfigurationError> {
        let catalog = Arc::clone(&self.catalog);
        self.update(role_id, |role| role.toggle_module(&catalog, module))
    }

    /// Change a custom role's code. System role codes are fixed.
    pub fn change_code(&self, role_id: RoleId, code: &str) -> Result<Arc<Role>, ConfigurationError> {
        let code = RoleCode::parse(code.to_string())?;
        let mut roles = self.write();
        let current = roles
            .get(&role_id)
            .cloned()
            .ok_or_else(|| ConfigurationError::RoleNotFound(role_id.to_string()))?;
        if current.is_system {
            return Err(ConfigurationError::SystemRoleImmutable(current.code.to_string()));
        }
        if Self::code_taken(&roles, current.school_id, &code, Some(role_id)) {
            return Err(ConfigurationError::DuplicateRoleCode(code.to_string()));
        }
        let next = Arc::new(Role {
            code,
            ..(*current).clone()
        });
        roles.insert(role_id, Arc::clone(&next));
        Ok(next)
    }

    /// Delete a custom role.
    ///
    /// `referenced` tells whether an active principal still holds the role; in
    /// that case it is archived instead of removed.
    pub fn delete(&self, role_id: RoleId, referenced: bool) -> Result<DeleteOutcome, ConfigurationError> {
        let mut roles = self.write();
        let current = roles
            .get(&role_id)
            .cloned()
            .ok_or_else(|| ConfigurationError::RoleNotFound(role_id.to_string()))?;
        if current.is_system {
            return Err(ConfigurationError::SystemRoleImmutable(current.code.to_string()));
        }

        if referenced {
            let archived = Role {
                archived: true,
                ..(*current).clone()
            };
            roles.insert(role_id, Arc::new(archived));
            tracing::info!(role_id = %role_id, "role archived (still referenced)");
            Ok(DeleteOutcome::Archived)
        } else {
            roles.remove(&role_id);
            tracing::info!(role_id = %role_id, "role removed");
            Ok(DeleteOutcome::Removed)
        }
    }

    fn update<F>(&self, role_id: RoleId, edit: F) -> Result<Arc<Role>, ConfigurationError>
    where
        F: FnOnce(&Role) -> Result<Role, ConfigurationError>,
    {
        let mut roles = self.write();
        let current = roles
            .get(&role_id)
            .ok_or_else(|| ConfigurationError::RoleNotFound(role_id.to_string()))?;
        let next = Arc::new(edit(current)?);
        roles.insert(role_id, Arc::clone(&next));
        tracing::debug!(role_id = %role_id, permissions = next.permissions.len(), "role updated");
        Ok(next)
    }

    fn code_taken(
        roles: &HashMap<RoleId, Arc<Role>>,
        school_id: Option<SchoolId>,
        code: &RoleCode,
        except: Option<RoleId>,
    ) -> bool {
        // Archived roles release their code.
        roles.values().any(|r| {
            Some(r.id) != except
                && !r.archived
                && r.code == *code
                && (r.school_id == school_id || r.school_id.is_none() || school_id.is_none())
        })
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<RoleId, Arc<Role>>> {
        self.roles.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<RoleId, Arc<Role>>> {
        self.roles.write().unwrap_or_else(PoisonError::into_inner)
    }
}
