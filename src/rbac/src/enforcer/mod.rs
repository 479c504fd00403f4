//! RBAC engine interface and its in-memory implementation
//!
//! [`RbacEngine`] is the seam the synced facade wraps. Implementations are
//! free to be non-reentrant and non-thread-safe: reads take `&self`, writes
//! take `&mut self`, and the facade decides who gets which.
//!
//! Every write returns an "affected" flag: `true` when the model changed,
//! `false` when the call was a no-op (adding something already present,
//! deleting something absent).

mod memory;


pub use memory::Enforcer;

use crate::error::Result;
use crate::types::Rule;

/// Role and permission management API of an RBAC engine
///
/// `domain` is `None` for the global scope.
pub trait RbacEngine {
    /// Roles directly assigned to `name`
    ///
    /// Fails with `NotFound` if `name` is unknown in that domain.
    fn get_roles_for_user(&self, name: &str, domain: Option<&str>) -> Result<Vec<String>>;

    /// Names directly holding `name`
    fn get_users_for_role(&self, name: &str, domain: Option<&str>) -> Result<Vec<String>>;

    /// Whether `name` holds `role` directly or through inheritance
    fn has_role_for_user(&self, name: &str, role: &str, domain: Option<&str>) -> Result<bool>;

    /// Returns false if the user already has the role
    fn add_role_for_user(&mut self, user: &str, role: &str, domain: Option<&str>) -> Result<bool>;

    /// Adds every role or none; returns false if the user already has any of them
    fn add_roles_for_user(&mut self, user: &str, roles: &[&str], domain: Option<&str>) -> Result<bool>;

    /// Returns false if the user does not have the role
    fn delete_role_for_user(&mut self, user: &str, role: &str, domain: Option<&str>) -> Result<bool>;

    /// Returns false if the user does not have any roles
    fn delete_roles_for_user(&mut self, user: &str, domain: Option<&str>) -> Result<bool>;

    /// Returns false if the user does not exist
    fn delete_user(&mut self, user: &str) -> Result<bool>;

    /// Returns false if the role does not exist
    fn delete_role(&mut self, role: &str) -> Result<bool>;

    /// Returns false if no subject holds the permission
    fn delete_permission(&mut self, permission: &[&str]) -> Result<bool>;

    /// Returns false if the user or role already has the permission
    fn add_permission_for_user(&mut self, user: &str, permission: &[&str]) -> Result<bool>;

    /// Returns false if the user or role does not have the permission
    fn delete_permission_for_user(&mut self, user: &str, permission: &[&str]) -> Result<bool>;

    /// Returns false if the user or role does not have any permissions
    fn delete_permissions_for_user(&mut self, user: &str) -> Result<bool>;

    /// Policy rules attached to a user or role, subject included
    fn get_permissions_for_user(&self, user: &str, domain: Option<&str>) -> Result<Vec<Rule>>;

    fn has_permission_for_user(&self, user: &str, permission: &[&str]) -> Result<bool>;

    /// Every role `name` holds, directly or inherited
    fn get_implicit_roles_for_user(&self, name: &str, domain: Option<&str>) -> Result<Vec<String>>;

    /// Rules attached to the user or to any role it inherits
    fn get_implicit_permissions_for_user(&self, user: &str, domain: Option<&str>) -> Result<Vec<Rule>>;
}
