//! Permission catalog: the source of truth for valid permission codes.
//!
//! The catalog is loaded once (bundled or fetched) and never mutated; share it
//! as `Arc<PermissionCatalog>`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::codes::STANDARD_MODULES;
use crate::{ConfigurationError, PermissionCode};

/// A named group of related permission codes (presentation unit of the role
/// editor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub module: String,
    pub codes: Vec<PermissionCode>,
}

impl Module {
    pub fn name(&self) -> &str {
        &self.module
    }
}

/// Validated, ordered set of permission codes grouped by module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCatalog {
    modules: Vec<Module>,
    index: HashMap<String, usize>,
    codes: HashSet<PermissionCode>,
}

impl PermissionCatalog {
    /// Build a catalog from modules in declaration order.
    ///
    /// Every code must be well formed and carry its module's name as prefix;
    /// neither modules nor codes may repeat.
    pub fn new(modules: Vec<Module>) -> Result<Self, ConfigurationError> {
        let mut index = HashMap::with_capacity(modules.len());
        let mut codes = HashSet::new();

        for (position, module) in modules.iter().enumerate() {
            if module.module.is_empty() {
                return Err(ConfigurationError::InvalidCatalog("empty module name".to_string()));
            }
            if index.insert(module.module.clone(), position).is_some() {
                return Err(ConfigurationError::DuplicateModule(module.module.clone()));
            }
            for code in &module.codes {
                if code.module() != module.module {
                    return Err(ConfigurationError::ModuleMismatch {
                        module: module.module.clone(),
                        code: code.to_string(),
                    });
                }
                if !codes.insert(code.clone()) {
                    return Err(ConfigurationError::DuplicatePermission(code.to_string()));
                }
            }
        }

        Ok(Self { modules, index, codes })
    }

    /// The catalog bundled with the application.
    pub fn standard() -> Self {
        let modules = STANDARD_MODULES
            .iter()
            .map(|(name, codes)| Module {
                module: (*name).to_string(),
                codes: codes
                    .iter()
                    .map(|c| PermissionCode::parse(*c))
                    .collect::<Result<_, _>>()
                    .unwrap_or_default(),
            })
            .collect();

        // The bundled table is checked by `standard_catalog_is_consistent`.
        Self::new(modules).unwrap_or_else(|err| {
            tracing::error!(error = %err, "bundled permission catalog is inconsistent");
            Self::empty()
        })
    }

    /// A catalog with no modules (every code is invalid).
    pub fn empty() -> Self {
        Self {
            modules: Vec::new(),
            index: HashMap::new(),
            codes: HashSet::new(),
        }
    }

    /// Load the fetched catalog document: `[{"module": "...", "codes": [...]}]`.
    pub fn from_json(document: &str) -> Result<Self, ConfigurationError> {
        let modules: Vec<Module> = serde_json::from_str(document)
            .map_err(|e| ConfigurationError::InvalidCatalog(e.to_string()))?;
        Self::new(modules)
    }

    /// Modules in declaration order.
    pub fn list_modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.index.get(name).map(|&i| &self.modules[i])
    }

    /// Codes of a module, or `UnknownModule`.
    pub fn module_codes(&self, name: &str) -> Result<&[PermissionCode], ConfigurationError> {
        self.module(name)
            .map(|m| m.codes.as_slice())
            .ok_or_else(|| ConfigurationError::UnknownModule(name.to_string()))
    }

    pub fn is_valid(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    /// Turn a raw string into a catalog code.
    pub fn resolve(&self, code: &str) -> Result<PermissionCode, ConfigurationError> {
        if !crate::permissions::is_well_formed(code) {
            return Err(ConfigurationError::MalformedPermission(code.to_string()));
        }
        self.codes
            .get(code)
            .cloned()
            .ok_or_else(|| ConfigurationError::UnknownPermission(code.to_string()))
    }

    /// Resolve many codes; the first failure wins.
    pub fn resolve_all<I, S>(&self, codes: I) -> Result<HashSet<PermissionCode>, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        codes.into_iter().map(|c| self.resolve(c.as_ref())).collect()
    }

    /// Every code, in declaration order.
    pub fn all_codes(&self) -> impl Iterator<Item = &PermissionCode> {
        self.modules.iter().flat_map(|m| m.codes.iter())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
