//! Tenancy entities: a school (tenant) and its branches (sub-tenants).

use serde::{Deserialize, Serialize};

use crate::{BranchId, Entity, SchoolId};

/// A school. `has_branches` switches branch scoping on or off entirely.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct School {
    pub id: SchoolId,
    pub has_branches: bool,
}

/// A campus belonging to exactly one school.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    pub school_id: SchoolId,
}

/// Row of the branch directory API (`[{id, name}]`, scoped to the current
/// school by the server).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSummary {
    pub id: BranchId,
    pub name: String,
}

impl Branch {
    pub fn summary(&self) -> BranchSummary {
        BranchSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

impl Entity for School {
    type Id = SchoolId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Entity for Branch {
    type Id = BranchId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn school_uses_camel_case() {
        let school: School = serde_json::from_str(
            r#"{"id":"00000000-0000-0000-0000-000000000007","hasBranches":true}"#,
        )
        .unwrap();
        assert!(school.has_branches);
        assert_eq!(school.id, SchoolId::from_u128(7));
    }

    #[test]
    fn branch_summary_keeps_identity() {
        let branch = Branch {
            id: BranchId::from_u128(1),
            name: "North Campus".to_string(),
            school_id: SchoolId::from_u128(7),
        };
        let summary = branch.summary();
        assert_eq!(summary.id, *branch.id());
        assert_eq!(summary.name, "North Campus");
    }
}
