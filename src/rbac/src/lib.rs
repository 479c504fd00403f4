//! # CretoAI RBAC
//!
//! Role-based access control with a concurrency-safe enforcer.
//!
//! ## Features
//!
//! - **Synced enforcer** wrapping a non-thread-safe engine behind one
//!   reader-writer lock: shared for queries, exclusive for mutations
//! - **Role hierarchy** with transitive lookups and optional domains
//! - **Permission management** with "affected" results for every mutation
//! - **TOML configuration** for the model and role manager
//! - **Prometheus metrics** for operation counts and lock wait time
//!
//! ## Example
//!
//! ```rust
//! use cretoai_rbac::{EnforcerConfig, SyncedEnforcer};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let enforcer = SyncedEnforcer::from_config(&EnforcerConfig::default())?;
//!
//!     assert!(enforcer.add_role_for_user("alice", "admin", None)?);
//!     assert!(!enforcer.add_role_for_user("alice", "admin", None)?);
//!     assert!(enforcer.add_permission_for_user("admin", &["data1", "read"])?);
//!
//!     assert!(enforcer.has_role_for_user("alice", "admin", None)?);
//!     assert_eq!(
//!         enforcer.get_implicit_permissions_for_user("alice", None)?,
//!         vec![vec!["admin", "data1", "read"]]
//!     );
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod enforcer;
pub mod error;
pub mod metrics;
pub mod model;
pub mod role_manager;
pub mod synced;
pub mod types;

// Re-export commonly used types
pub use config::EnforcerConfig;
pub use enforcer::{Enforcer, RbacEngine};
pub use error::{RbacError, Result};
pub use metrics::FacadeMetrics;
pub use synced::SyncedEnforcer;
pub use types::{LockMode, Rule, DEFAULT_DOMAIN};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
