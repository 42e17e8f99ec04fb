//! Session configuration (environment driven).

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration;

use scholaris_auth::DEFAULT_MARKER_TTL_DAYS;

use crate::storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};

/// Directory holding persisted session files. Unset: in-memory storage.
pub const ENV_SESSION_DIR: &str = "SCHOLARIS_SESSION_DIR";
/// Lifetime of the authentication marker, in days.
pub const ENV_MARKER_TTL_DAYS: &str = "SCHOLARIS_MARKER_TTL_DAYS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub storage_dir: Option<PathBuf>,
    pub marker_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_dir: None,
            marker_ttl: Duration::days(DEFAULT_MARKER_TTL_DAYS),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup (tests pass a closure).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let storage_dir = lookup(ENV_SESSION_DIR)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let marker_ttl = match lookup(ENV_MARKER_TTL_DAYS) {
            None => defaults.marker_ttl,
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(days) if days > 0 => Duration::days(days),
                _ => {
                    tracing::warn!(value = %raw, "{ENV_MARKER_TTL_DAYS} is not a positive integer; using default");
                    defaults.marker_ttl
                }
            },
        };

        Self {
            storage_dir,
            marker_ttl,
        }
    }

    /// Open the configured storage backend.
    pub fn open_storage(&self) -> Result<Arc<dyn SessionStorage>, StorageError> {
        match &self.storage_dir {
            Some(dir) => Ok(Arc::new(FileStorage::open(dir)?)),
            None => Ok(Arc::new(MemoryStorage::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = SessionConfig::from_lookup(lookup(&[]));
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.marker_ttl, Duration::days(7));
    }

    #[test]
    fn reads_overrides() {
        let config = SessionConfig::from_lookup(lookup(&[
            (ENV_SESSION_DIR, "/tmp/scholaris"),
            (ENV_MARKER_TTL_DAYS, "3"),
        ]));
        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/scholaris")));
        assert_eq!(config.marker_ttl, Duration::days(3));
    }

    #[test]
    fn invalid_ttl_falls_back() {
        for bad in ["0", "-2", "week"] {
            let config = SessionConfig::from_lookup(lookup(&[(ENV_MARKER_TTL_DAYS, bad)]));
            assert_eq!(config.marker_ttl, Duration::days(DEFAULT_MARKER_TTL_DAYS));
        }
    }

    #[test]
    fn opens_file_storage_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig {
            storage_dir: Some(dir.path().join("session")),
            ..SessionConfig::default()
        };
        let storage = config.open_storage().unwrap();
        storage.save("k", "v").unwrap();
        assert!(dir.path().join("session").join("k.json").exists());
    }
}
