//! `scholaris-auth`: pure authorization boundary for the school console.
//!
//! This crate is intentionally decoupled from HTTP and storage: it defines the
//! permission catalog, roles, principals and the evaluator that answers
//! "may this principal do that?".

pub mod authorize;
pub mod catalog;
pub mod claims;
pub mod codes;
pub mod error;
pub mod permissions;
pub mod principal;
pub mod registry;
pub mod roles;

pub use authorize::{
    AuthorizationExplanation, Authorizer, DecisionKind, can_do, explain, is_master_admin,
    school_has_branches,
};
pub use catalog::{Module, PermissionCatalog};
pub use claims::{AuthMarker, DEFAULT_MARKER_TTL_DAYS, MarkerValidationError, validate_marker};
pub use error::ConfigurationError;
pub use permissions::PermissionCode;
pub use principal::{Principal, PrincipalPayload, RolePayload};
pub use registry::{DeleteOutcome, RoleRegistry, system_roles};
pub use roles::{Role, RoleCode};
