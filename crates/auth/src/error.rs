//! Configuration errors raised while defining catalogs, roles and principals.

use thiserror::Error;

use scholaris_core::DomainError;

/// A definition-time failure.
///
/// These are raised synchronously when a catalog is loaded, a role is saved
/// or a login payload is turned into a principal. Evaluation never produces
/// one: an unknown permission simply denies.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("malformed permission code '{0}' (expected '<module>.<action>')")]
    MalformedPermission(String),

    #[error("permission '{0}' is not in the catalog")]
    UnknownPermission(String),

    #[error("module '{0}' is not in the catalog")]
    UnknownModule(String),

    #[error("module '{0}' is declared more than once")]
    DuplicateModule(String),

    #[error("permission '{0}' is declared more than once")]
    DuplicatePermission(String),

    #[error("permission '{code}' does not belong to module '{module}'")]
    ModuleMismatch { module: String, code: String },

    #[error("malformed role code '{0}' (expected UPPER_SNAKE_CASE)")]
    MalformedRoleCode(String),

    #[error("invalid role name: {0}")]
    InvalidRoleName(String),

    #[error("role code '{0}' already exists in this school")]
    DuplicateRoleCode(String),

    #[error("system role '{0}' cannot be deleted or recoded")]
    SystemRoleImmutable(String),

    #[error("role '{0}' not found")]
    RoleNotFound(String),

    #[error("principal with role '{0}' must be assigned to a branch")]
    MissingBranch(String),

    #[error("invalid catalog document: {0}")]
    InvalidCatalog(String),
}

impl From<ConfigurationError> for DomainError {
    fn from(value: ConfigurationError) -> Self {
        match value {
            ConfigurationError::DuplicateRoleCode(_) => DomainError::conflict(value.to_string()),
            ConfigurationError::RoleNotFound(id) => DomainError::not_found(format!("role {id}")),
            ConfigurationError::SystemRoleImmutable(_) | ConfigurationError::MissingBranch(_) => {
                DomainError::invariant(value.to_string())
            }
            other => DomainError::validation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_onto_domain_errors() {
        assert!(matches!(
            DomainError::from(ConfigurationError::DuplicateRoleCode("CLERK".into())),
            DomainError::Conflict(_)
        ));
        assert_eq!(
            DomainError::from(ConfigurationError::RoleNotFound("42".into())),
            DomainError::NotFound("role 42".into())
        );
        assert!(matches!(
            DomainError::from(ConfigurationError::UnknownPermission("fee.fly".into())),
            DomainError::Validation(msg) if msg.contains("fee.fly")
        ));
    }
}
