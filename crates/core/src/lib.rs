//! `scholaris-core`: foundation types shared by the access engine.
//!
//! This crate contains **pure domain** primitives (no storage, no transport).

pub mod entity;
pub mod error;
pub mod id;
pub mod tenancy;

pub use entity::Entity;
pub use error::DomainError;
pub use id::{BranchId, PrincipalId, RoleId, SchoolId};
pub use tenancy::{Branch, BranchSummary, School};
