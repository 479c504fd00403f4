//! Thread-safe facade over an RBAC engine
//!
//! [`SyncedEnforcer`] owns one engine behind a single `parking_lot::RwLock`.
//! Queries take the lock shared, mutations take it exclusive, and the guard
//! lives only for the delegated engine call: it is dropped on every return
//! path, error returns and unwinding included. Nothing else runs under the
//! lock, so no call can re-acquire it.
//!
//! The lock is task-fair: once a writer is queued, new readers wait behind
//! it, so writers are not starved by a steady stream of reads.
//!
//! # Preconditions
//!
//! The engine must only be reached through the facade once wrapped. The
//! facade never hands out a reference to it; [`SyncedEnforcer::into_inner`]
//! gives it back only by consuming the facade.

use crate::config::EnforcerConfig;
use crate::enforcer::{Enforcer, RbacEngine};
use crate::error::{RbacError, Result};
use crate::metrics::FacadeMetrics;
use crate::types::{LockMode, Rule};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, trace};

/// Concurrency-safe RBAC enforcer
///
/// # Example
///
/// ```
/// use cretoai_rbac::{Enforcer, SyncedEnforcer};
/// use std::sync::Arc;
/// use std::thread;
///
/// let enforcer = Arc::new(SyncedEnforcer::new(Enforcer::default()));
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let enforcer = Arc::clone(&enforcer);
///         thread::spawn(move || enforcer.add_role_for_user("alice", "admin", None).unwrap())
///     })
///     .collect();
///
/// let affected = handles
///     .into_iter()
///     .map(|h| h.join().unwrap())
///     .filter(|added| *added)
///     .count();
///
/// assert_eq!(affected, 1);
/// assert_eq!(enforcer.get_roles_for_user("alice", None).unwrap(), vec!["admin"]);
/// ```
pub struct SyncedEnforcer<E = Enforcer> {
    engine: RwLock<E>,
    metrics: Option<Arc<FacadeMetrics>>,
}

impl SyncedEnforcer<Enforcer> {
    /// Build the in-memory enforcer described by `config` and wrap it
    pub fn from_config(config: &EnforcerConfig) -> Result<Self> {
        let enforcer = Enforcer::new(config)?;

        let metrics = if config.metrics.enabled {
            let metrics = FacadeMetrics::new(&config.metrics.namespace)
                .map_err(|e| RbacError::Config(format!("metrics: {}", e)))?;
            Some(Arc::new(metrics))
        } else {
            None
        };

        info!(
            "SyncedEnforcer initialized with roles={}, domains={}, permission_fields={:?}, metrics={}",
            config.model.role_definition,
            config.model.domains,
            config.model.permission_fields,
            config.metrics.enabled
        );

        Ok(Self {
            engine: RwLock::new(enforcer),
            metrics,
        })
    }
}

impl Default for SyncedEnforcer<Enforcer> {
    fn default() -> Self {
        Self::new(Enforcer::default())
    }
}

impl<E: RbacEngine> SyncedEnforcer<E> {
    /// Wrap an engine; the facade takes sole ownership of it
    pub fn new(engine: E) -> Self {
        Self {
            engine: RwLock::new(engine),
            metrics: None,
        }
    }

    pub fn with_metrics(engine: E, metrics: Arc<FacadeMetrics>) -> Self {
        Self {
            engine: RwLock::new(engine),
            metrics: Some(metrics),
        }
    }

    pub fn metrics(&self) -> Option<&Arc<FacadeMetrics>> {
        self.metrics.as_ref()
    }

    /// Give the engine back, ending synchronized access
    pub fn into_inner(self) -> E {
        self.engine.into_inner()
    }

    /// Run `f` against the engine under a shared lock
    fn read<T>(&self, op: &'static str, f: impl FnOnce(&E) -> Result<T>) -> Result<T> {
        let start = Instant::now();
        let guard = self.engine.read();
        let waited = start.elapsed();
        trace!(op, mode = "read", "lock acquired");

        let result = f(&*guard);
        drop(guard);

        self.record(op, LockMode::Read, waited, result.is_err());
        result
    }

    /// Run `f` against the engine under an exclusive lock
    fn write<T>(&self, op: &'static str, f: impl FnOnce(&mut E) -> Result<T>) -> Result<T> {
        let start = Instant::now();
        let mut guard = self.engine.write();
        let waited = start.elapsed();
        trace!(op, mode = "write", "lock acquired");

        let result = f(&mut *guard);
        drop(guard);

        self.record(op, LockMode::Write, waited, result.is_err());
        result
    }

    fn record(&self, op: &str, mode: LockMode, waited: Duration, failed: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_lock_wait(mode.as_str(), waited);
            metrics.record_operation(op, mode.as_str(), failed);
        }
    }

    /// Gets the roles that a user has.
    pub fn get_roles_for_user(&self, name: &str, domain: Option<&str>) -> Result<Vec<String>> {
        self.read("get_roles_for_user", |e| e.get_roles_for_user(name, domain))
    }

    /// Gets the users that have a role.
    pub fn get_users_for_role(&self, name: &str, domain: Option<&str>) -> Result<Vec<String>> {
        self.read("get_users_for_role", |e| e.get_users_for_role(name, domain))
    }

    /// Determines whether a user has a role.
    pub fn has_role_for_user(&self, name: &str, role: &str, domain: Option<&str>) -> Result<bool> {
        self.read("has_role_for_user", |e| e.has_role_for_user(name, role, domain))
    }

    /// Adds a role for a user.
    /// Returns false if the user already has the role (aka not affected).
    pub fn add_role_for_user(&self, user: &str, role: &str, domain: Option<&str>) -> Result<bool> {
        self.write("add_role_for_user", |e| e.add_role_for_user(user, role, domain))
    }

    /// Adds several roles for a user in one step.
    /// Returns false, adding nothing, if the user already has any of them.
    pub fn add_roles_for_user(&self, user: &str, roles: &[&str], domain: Option<&str>) -> Result<bool> {
        self.write("add_roles_for_user", |e| e.add_roles_for_user(user, roles, domain))
    }

    /// Deletes a role for a user.
    /// Returns false if the user does not have the role (aka not affected).
    pub fn delete_role_for_user(&self, user: &str, role: &str, domain: Option<&str>) -> Result<bool> {
        self.write("delete_role_for_user", |e| e.delete_role_for_user(user, role, domain))
    }

    /// Deletes all roles for a user.
    /// Returns false if the user does not have any roles (aka not affected).
    pub fn delete_roles_for_user(&self, user: &str, domain: Option<&str>) -> Result<bool> {
        self.write("delete_roles_for_user", |e| e.delete_roles_for_user(user, domain))
    }

    /// Deletes a user.
    /// Returns false if the user does not exist (aka not affected).
    pub fn delete_user(&self, user: &str) -> Result<bool> {
        self.write("delete_user", |e| e.delete_user(user))
    }

    /// Deletes a role.
    /// Returns false if the role does not exist (aka not affected).
    pub fn delete_role(&self, role: &str) -> Result<bool> {
        self.write("delete_role", |e| e.delete_role(role))
    }

    /// Deletes a permission.
    /// Returns false if the permission does not exist (aka not affected).
    pub fn delete_permission(&self, permission: &[&str]) -> Result<bool> {
        self.write("delete_permission", |e| e.delete_permission(permission))
    }

    /// Adds a permission for a user or role.
    /// Returns false if the user or role already has the permission (aka not affected).
    pub fn add_permission_for_user(&self, user: &str, permission: &[&str]) -> Result<bool> {
        self.write("add_permission_for_user", |e| e.add_permission_for_user(user, permission))
    }

    /// Deletes a permission for a user or role.
    /// Returns false if the user or role does not have the permission (aka not affected).
    pub fn delete_permission_for_user(&self, user: &str, permission: &[&str]) -> Result<bool> {
        self.write("delete_permission_for_user", |e| e.delete_permission_for_user(user, permission))
    }

    /// Deletes permissions for a user or role.
    /// Returns false if the user or role does not have any permissions (aka not affected).
    pub fn delete_permissions_for_user(&self, user: &str) -> Result<bool> {
        self.write("delete_permissions_for_user", |e| e.delete_permissions_for_user(user))
    }

    /// Gets permissions for a user or role.
    pub fn get_permissions_for_user(&self, user: &str, domain: Option<&str>) -> Result<Vec<Rule>> {
        self.read("get_permissions_for_user", |e| e.get_permissions_for_user(user, domain))
    }

    /// Determines whether a user has a permission.
    pub fn has_permission_for_user(&self, user: &str, permission: &[&str]) -> Result<bool> {
        self.read("has_permission_for_user", |e| e.has_permission_for_user(user, permission))
    }

    /// Gets implicit roles that a user has.
    pub fn get_implicit_roles_for_user(&self, name: &str, domain: Option<&str>) -> Result<Vec<String>> {
        self.read("get_implicit_roles_for_user", |e| e.get_implicit_roles_for_user(name, domain))
    }

    /// Gets implicit permissions for a user or role.
    pub fn get_implicit_permissions_for_user(&self, user: &str, domain: Option<&str>) -> Result<Vec<Rule>> {
        self.read("get_implicit_permissions_for_user", |e| {
            e.get_implicit_permissions_for_user(user, domain)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Engine that fails every call and counts how often it was reached
    #[derive(Default)]
    struct FailingEngine {
        calls: AtomicUsize,
        inside: AtomicBool,
    }

    impl FailingEngine {
        fn fail<T>(&self) -> Result<T> {
            // A second caller inside the engine at the same time means the
            // exclusive lock was not held.
            assert!(!self.inside.swap(true, Ordering::SeqCst));
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inside.store(false, Ordering::SeqCst);
            Err(RbacError::InvalidArgument("bad domain".to_string()))
        }
    }

    impl RbacEngine for FailingEngine {
        fn get_roles_for_user(&self, _: &str, _: Option<&str>) -> Result<Vec<String>> {
            Err(RbacError::NotFound("name does not exist".to_string()))
        }
        fn get_users_for_role(&self, _: &str, _: Option<&str>) -> Result<Vec<String>> {
            Err(RbacError::Model("no roles".to_string()))
        }
        fn has_role_for_user(&self, _: &str, _: &str, _: Option<&str>) -> Result<bool> {
            Err(RbacError::Model("no roles".to_string()))
        }
        fn add_role_for_user(&mut self, _: &str, _: &str, _: Option<&str>) -> Result<bool> {
            self.fail()
        }
        fn add_roles_for_user(&mut self, _: &str, _: &[&str], _: Option<&str>) -> Result<bool> {
            self.fail()
        }
        fn delete_role_for_user(&mut self, _: &str, _: &str, _: Option<&str>) -> Result<bool> {
            self.fail()
        }
        fn delete_roles_for_user(&mut self, _: &str, _: Option<&str>) -> Result<bool> {
            self.fail()
        }
        fn delete_user(&mut self, _: &str) -> Result<bool> {
            self.fail()
        }
        fn delete_role(&mut self, _: &str) -> Result<bool> {
            self.fail()
        }
        fn delete_permission(&mut self, _: &[&str]) -> Result<bool> {
            self.fail()
        }
        fn add_permission_for_user(&mut self, _: &str, _: &[&str]) -> Result<bool> {
            self.fail()
        }
        fn delete_permission_for_user(&mut self, _: &str, _: &[&str]) -> Result<bool> {
            self.fail()
        }
        fn delete_permissions_for_user(&mut self, _: &str) -> Result<bool> {
            self.fail()
        }
        fn get_permissions_for_user(&self, _: &str, _: Option<&str>) -> Result<Vec<Rule>> {
            Err(RbacError::InvalidArgument("bad domain".to_string()))
        }
        fn has_permission_for_user(&self, _: &str, _: &[&str]) -> Result<bool> {
            Err(RbacError::InvalidArgument("bad tuple".to_string()))
        }
        fn get_implicit_roles_for_user(&self, _: &str, _: Option<&str>) -> Result<Vec<String>> {
            Err(RbacError::Model("no roles".to_string()))
        }
        fn get_implicit_permissions_for_user(&self, _: &str, _: Option<&str>) -> Result<Vec<Rule>> {
            Err(RbacError::Model("no roles".to_string()))
        }
    }

    #[test]
    fn test_errors_pass_through_unchanged() {
        let synced = SyncedEnforcer::new(FailingEngine::default());

        assert_eq!(
            synced.get_roles_for_user("alice", None),
            Err(RbacError::NotFound("name does not exist".to_string()))
        );
        assert_eq!(
            synced.add_role_for_user("alice", "admin", Some("x")),
            Err(RbacError::InvalidArgument("bad domain".to_string()))
        );
        assert_eq!(
            synced.has_role_for_user("alice", "admin", None),
            Err(RbacError::Model("no roles".to_string()))
        );
    }

    #[test]
    fn test_lock_released_after_error() {
        let synced = SyncedEnforcer::new(FailingEngine::default());

        assert!(synced.delete_user("alice").is_err());
        assert!(synced.get_permissions_for_user("alice", None).is_err());
        // Would deadlock if either call had kept its guard
        assert!(synced.delete_role("admin").is_err());
        assert!(synced.delete_permission(&["data1", "read"]).is_err());

        let engine = synced.into_inner();
        assert_eq!(engine.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_lock_released_after_panic() {
        let synced: Arc<SyncedEnforcer> = Arc::new(SyncedEnforcer::default());

        let cloned = Arc::clone(&synced);
        let result = std::thread::spawn(move || {
            cloned
                .read("panicking_read", |_| -> Result<()> { panic!("engine panicked") })
        })
        .join();
        assert!(result.is_err());

        // parking_lot does not poison: the lock is usable again
        assert!(synced.add_role_for_user("alice", "admin", None).unwrap());
    }

    #[test]
    fn test_metrics_recorded_per_operation() {
        let metrics = Arc::new(FacadeMetrics::new("test").unwrap());
        let synced = SyncedEnforcer::with_metrics(Enforcer::default(), Arc::clone(&metrics));

        synced.add_role_for_user("alice", "admin", None).unwrap();
        synced.add_role_for_user("alice", "admin", None).unwrap();
        synced.get_roles_for_user("alice", None).unwrap();
        assert!(synced.get_roles_for_user("ghost", None).is_err());

        assert_eq!(metrics.operation_count("add_role_for_user", "write"), 2);
        assert_eq!(metrics.operation_count("get_roles_for_user", "read"), 2);
        assert_eq!(metrics.error_count("get_roles_for_user"), 1);
    }

    #[test]
    fn test_from_config() {
        let synced = SyncedEnforcer::from_config(&EnforcerConfig::with_domains()).unwrap();
        assert!(synced.metrics().is_some());

        assert!(synced.add_role_for_user("alice", "admin", Some("tenant1")).unwrap());
        assert!(synced.has_role_for_user("alice", "admin", Some("tenant1")).unwrap());

        let mut config = EnforcerConfig::default();
        config.metrics.enabled = false;
        assert!(SyncedEnforcer::from_config(&config).unwrap().metrics().is_none());
    }

    #[test]
    fn test_into_inner_returns_engine_state() {
        let synced: SyncedEnforcer = SyncedEnforcer::default();
        synced.add_permission_for_user("bob", &["data1", "read"]).unwrap();

        let engine = synced.into_inner();
        assert_eq!(engine.policy(), vec![vec!["bob", "data1", "read"]]);
    }
}
