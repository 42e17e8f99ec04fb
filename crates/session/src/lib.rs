//! Session layer: current principal, branch scope and change notification.
//!
//! Everything here evaluates against immutable snapshots from
//! `scholaris-auth`. The store is an injected dependency (one per session);
//! persisted state is limited to the auth marker and the active branch.

pub mod bus;
pub mod config;
pub mod directory;
pub mod guard;
pub mod scope;
pub mod storage;
pub mod store;

pub use bus::{SessionBus, SessionEvent, Subscription};
pub use config::{ENV_MARKER_TTL_DAYS, ENV_SESSION_DIR, SessionConfig};
pub use directory::{CachedDirectory, DirectorySource};
pub use guard::{Guard, WatchedGuard};
pub use scope::{BranchScopeResolver, IgnoredReason, Scope, ScopeChange, ScopeFilter};
pub use storage::{FileStorage, MARKER_KEY, MemoryStorage, SCOPE_KEY, SessionStorage, StorageError};
pub use store::SessionStore;
