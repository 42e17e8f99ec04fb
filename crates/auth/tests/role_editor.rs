//! Role editor workflows against the registry and a fetched catalog.

use std::sync::Arc;

use scholaris_auth::{
    ConfigurationError, DeleteOutcome, PermissionCatalog, Principal, RoleRegistry, can_do, codes, explain,
    system_roles,
};
use scholaris_core::{PrincipalId, School, SchoolId};

const SCHOOL: SchoolId = SchoolId::from_u128(10);
const OTHER_SCHOOL: SchoolId = SchoolId::from_u128(11);

const CATALOG_DOC: &str = r#"[
    {"module": "fee", "codes": ["fee.read", "fee.collect", "fee.refund"]},
    {"module": "student", "codes": ["student.read", "student.create"]},
    {"module": "branch", "codes": ["branch.read"]}
]"#;

fn registry() -> RoleRegistry {
    let catalog = PermissionCatalog::from_json(CATALOG_DOC).unwrap();
    RoleRegistry::with_system_roles(Arc::new(catalog))
}

fn principal_with(role: Arc<scholaris_auth::Role>) -> Principal {
    Principal::new(
        PrincipalId::from_u128(1),
        role,
        None,
        false,
        School {
            id: SCHOOL,
            has_branches: true,
        },
    )
    .unwrap()
}

#[test]
fn fetched_catalog_drives_system_roles() {
    let registry = registry();
    let admin = registry.get(system_roles::SCHOOL_ADMIN).unwrap();
    assert_eq!(admin.permissions.len(), 6);

    // Branch admins keep branch.read from the school-wide modules.
    let branch_admin = registry.get(system_roles::BRANCH_ADMIN).unwrap();
    assert!(branch_admin.has_permission(codes::BRANCH_READ));
    assert!(branch_admin.has_permission(codes::FEE_REFUND));
}

#[test]
fn codes_outside_the_fetched_catalog_are_rejected() {
    let registry = registry();
    let err = registry
        .create(SCHOOL, "Examiner", "EXAMINER", [codes::EXAM_PUBLISH])
        .unwrap_err();
    assert_eq!(err, ConfigurationError::UnknownPermission(codes::EXAM_PUBLISH.to_string()));
}

#[test]
fn duplicate_code_keeps_the_existing_role() {
    let registry = registry();
    let original = registry
        .create(SCHOOL, "Fee Manager", "FEE_MANAGER", [codes::FEE_READ])
        .unwrap();

    let err = registry
        .create(SCHOOL, "Fee Manager 2", "FEE_MANAGER", [codes::FEE_REFUND])
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::DuplicateRoleCode(_)));
    assert_eq!(registry.get(original.id).unwrap(), original);

    // Same code in another school is fine.
    assert!(
        registry
            .create(OTHER_SCHOOL, "Fee Manager", "FEE_MANAGER", [codes::FEE_READ])
            .is_ok()
    );
    // System codes are global.
    assert!(registry.create(SCHOOL, "Admin", "SCHOOL_ADMIN", [codes::FEE_READ]).is_err());
}

#[test]
fn editing_a_role_changes_decisions_for_new_snapshots_only() {
    let registry = registry();
    let role = registry
        .create(SCHOOL, "Fee Manager", "FEE_MANAGER", [codes::FEE_READ, codes::FEE_COLLECT])
        .unwrap();
    let before = principal_with(Arc::clone(&role));
    assert!(!can_do(&before, codes::FEE_REFUND));

    let edited = registry.toggle_module(role.id, "fee").unwrap();
    assert!(edited.has_module(registry.catalog(), "fee"));
    let after = before.with_role(edited).unwrap();

    assert!(can_do(&after, codes::FEE_REFUND));
    assert!(!can_do(&before, codes::FEE_REFUND));

    let explanation = explain(&before, codes::FEE_REFUND);
    assert!(!explanation.granted);
    assert_eq!(explanation.role_code, "FEE_MANAGER");
}

#[test]
fn toggle_module_twice_restores_empty_selection() {
    let registry = registry();
    let role = registry
        .create(SCHOOL, "Reader", "READER", std::iter::empty::<&str>())
        .unwrap();

    let once = registry.toggle_module(role.id, "student").unwrap();
    assert!(once.has_module(registry.catalog(), "student"));
    let twice = registry.toggle_module(role.id, "student").unwrap();
    assert!(twice.permissions.is_empty());
}

#[test]
fn list_puts_system_roles_first() {
    let registry = registry();
    registry.create(SCHOOL, "Accountant", "ACCOUNTANT", [codes::FEE_READ]).unwrap();
    registry.create(OTHER_SCHOOL, "Hidden", "HIDDEN", [codes::FEE_READ]).unwrap();

    let names: Vec<String> = registry.list(SCHOOL).iter().map(|r| r.name.clone()).collect();
    assert_eq!(names, vec!["Branch Admin", "School Admin", "Accountant"]);
}

#[test]
fn referenced_roles_are_archived_not_removed() {
    let registry = registry();
    let kept = registry.create(SCHOOL, "Clerk", "CLERK", [codes::FEE_READ]).unwrap();
    let dropped = registry.create(SCHOOL, "Temp", "TEMP", [codes::FEE_READ]).unwrap();

    assert_eq!(registry.delete(kept.id, true).unwrap(), DeleteOutcome::Archived);
    assert_eq!(registry.delete(dropped.id, false).unwrap(), DeleteOutcome::Removed);

    assert!(registry.get(kept.id).unwrap().archived);
    assert!(registry.get(dropped.id).is_none());
    assert!(registry.find_by_code(SCHOOL, "CLERK").is_none());

    assert!(matches!(
        registry.delete(system_roles::BRANCH_ADMIN, false),
        Err(ConfigurationError::SystemRoleImmutable(_))
    ));
}
