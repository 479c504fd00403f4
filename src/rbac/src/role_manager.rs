//! Role hierarchy for the in-memory enforcer
//!
//! Each domain holds a directed graph of `name -> role` links together with
//! the reverse `role -> name` index, both in insertion order. Transitive
//! lookups walk the graph breadth-first and stop after
//! `max_hierarchy_level` hops, so cycles and very deep chains terminate.

use crate::error::{RbacError, Result};
use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Default)]
struct RoleNode {
    /// Roles this name directly holds
    roles: IndexSet<String>,

    /// Names directly holding this role
    users: IndexSet<String>,
}

impl RoleNode {
    fn is_isolated(&self) -> bool {
        self.roles.is_empty() && self.users.is_empty()
    }
}

/// Role links for a single domain
#[derive(Debug, Clone, Default)]
struct DomainRoles {
    nodes: IndexMap<String, RoleNode>,
}

impl DomainRoles {
    fn node_mut(&mut self, name: &str) -> &mut RoleNode {
        self.nodes.entry(name.to_string()).or_default()
    }
}

/// Role hierarchy keyed by domain
#[derive(Debug, Clone)]
pub struct RoleManager {
    domains: HashMap<String, DomainRoles>,
    max_hierarchy_level: usize,
}

impl RoleManager {
    pub fn new(max_hierarchy_level: usize) -> Self {
        Self {
            domains: HashMap::new(),
            max_hierarchy_level,
        }
    }

    /// Link `name` to `role`; returns false if the link already existed
    pub fn add_link(&mut self, name: &str, role: &str, domain: &str) -> bool {
        let roles = self.domains.entry(domain.to_string()).or_default();
        let added = roles.node_mut(name).roles.insert(role.to_string());
        roles.node_mut(role).users.insert(name.to_string());
        added
    }

    /// Remove the `name -> role` link; both nodes stay known
    pub fn delete_link(&mut self, name: &str, role: &str, domain: &str) -> bool {
        let Some(roles) = self.domains.get_mut(domain) else {
            return false;
        };

        let removed = roles
            .nodes
            .get_mut(name)
            .map(|node| node.roles.shift_remove(role))
            .unwrap_or(false);

        if let Some(node) = roles.nodes.get_mut(role) {
            node.users.shift_remove(name);
        }

        removed
    }

    /// Whether `name` reaches `role` through at most `max_hierarchy_level` links
    pub fn has_link(&self, name: &str, role: &str, domain: &str) -> bool {
        self.walk(name, domain).iter().any(|r| r == role)
    }

    /// Roles directly held by `name`
    pub fn get_roles(&self, name: &str, domain: &str) -> Result<Vec<String>> {
        self.domains
            .get(domain)
            .and_then(|roles| roles.nodes.get(name))
            .map(|node| node.roles.iter().cloned().collect())
            .ok_or_else(|| RbacError::NotFound(format!("name does not exist: {}", name)))
    }

    /// Names directly holding `role`
    pub fn get_users(&self, role: &str, domain: &str) -> Vec<String> {
        self.domains
            .get(domain)
            .and_then(|roles| roles.nodes.get(role))
            .map(|node| node.users.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every role reachable from `name`, in breadth-first discovery order
    pub fn get_implicit_roles(&self, name: &str, domain: &str) -> Vec<String> {
        self.walk(name, domain)
    }

    /// Drop `name` from every domain once it has no links left.
    /// Returns true if any node was removed.
    pub fn prune(&mut self, name: &str) -> bool {
        let mut pruned = false;
        for roles in self.domains.values_mut() {
            if roles.nodes.get(name).map(RoleNode::is_isolated).unwrap_or(false) {
                roles.nodes.shift_remove(name);
                pruned = true;
            }
        }
        self.domains.retain(|_, roles| !roles.nodes.is_empty());
        pruned
    }

    pub fn clear(&mut self) {
        self.domains.clear();
    }

    fn walk(&self, name: &str, domain: &str) -> Vec<String> {
        let Some(roles) = self.domains.get(domain) else {
            return Vec::new();
        };

        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(name);

        let mut found = Vec::new();
        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
        queue.push_back((name, 0));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= self.max_hierarchy_level {
                continue;
            }

            let Some(node) = roles.nodes.get(current) else {
                continue;
            };

            for role in &node.roles {
                if visited.insert(role.as_str()) {
                    found.push(role.clone());
                    queue.push_back((role.as_str(), depth + 1));
                }
            }
        }

        found
    }
}

impl Default for RoleManager {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_DOMAIN;

    #[test]
    fn test_add_and_get_roles() {
        let mut rm = RoleManager::default();
        assert!(rm.add_link("alice", "admin", DEFAULT_DOMAIN));
        assert!(rm.add_link("alice", "editor", DEFAULT_DOMAIN));
        assert!(!rm.add_link("alice", "admin", DEFAULT_DOMAIN));

        assert_eq!(rm.get_roles("alice", DEFAULT_DOMAIN).unwrap(), vec!["admin", "editor"]);
        assert_eq!(rm.get_users("admin", DEFAULT_DOMAIN), vec!["alice"]);
    }

    #[test]
    fn test_unknown_name_is_not_found() {
        let rm = RoleManager::default();
        assert!(matches!(
            rm.get_roles("ghost", DEFAULT_DOMAIN),
            Err(RbacError::NotFound(_))
        ));
        assert!(rm.get_users("ghost", DEFAULT_DOMAIN).is_empty());
    }

    #[test]
    fn test_delete_link_keeps_node() {
        let mut rm = RoleManager::default();
        rm.add_link("alice", "admin", DEFAULT_DOMAIN);

        assert!(rm.delete_link("alice", "admin", DEFAULT_DOMAIN));
        assert!(!rm.delete_link("alice", "admin", DEFAULT_DOMAIN));
        assert!(rm.get_roles("alice", DEFAULT_DOMAIN).unwrap().is_empty());
        assert!(rm.get_users("admin", DEFAULT_DOMAIN).is_empty());
    }

    #[test]
    fn test_transitive_link() {
        let mut rm = RoleManager::default();
        rm.add_link("alice", "editor", DEFAULT_DOMAIN);
        rm.add_link("editor", "viewer", DEFAULT_DOMAIN);

        assert!(rm.has_link("alice", "editor", DEFAULT_DOMAIN));
        assert!(rm.has_link("alice", "viewer", DEFAULT_DOMAIN));
        assert!(!rm.has_link("viewer", "alice", DEFAULT_DOMAIN));
        assert_eq!(
            rm.get_implicit_roles("alice", DEFAULT_DOMAIN),
            vec!["editor", "viewer"]
        );
    }

    #[test]
    fn test_hierarchy_level_bounds_traversal() {
        let mut rm = RoleManager::new(2);
        rm.add_link("u", "r1", DEFAULT_DOMAIN);
        rm.add_link("r1", "r2", DEFAULT_DOMAIN);
        rm.add_link("r2", "r3", DEFAULT_DOMAIN);

        assert!(rm.has_link("u", "r2", DEFAULT_DOMAIN));
        assert!(!rm.has_link("u", "r3", DEFAULT_DOMAIN));
    }

    #[test]
    fn test_cycle_terminates() {
        let mut rm = RoleManager::default();
        rm.add_link("a", "b", DEFAULT_DOMAIN);
        rm.add_link("b", "c", DEFAULT_DOMAIN);
        rm.add_link("c", "a", DEFAULT_DOMAIN);

        assert_eq!(rm.get_implicit_roles("a", DEFAULT_DOMAIN), vec!["b", "c"]);
        assert!(rm.has_link("b", "a", DEFAULT_DOMAIN));
    }

    #[test]
    fn test_domains_are_isolated() {
        let mut rm = RoleManager::default();
        rm.add_link("alice", "admin", "tenant1");

        assert!(rm.has_link("alice", "admin", "tenant1"));
        assert!(!rm.has_link("alice", "admin", "tenant2"));
        assert!(rm.get_roles("alice", "tenant2").is_err());
    }

    #[test]
    fn test_prune_only_removes_isolated_nodes() {
        let mut rm = RoleManager::default();
        rm.add_link("alice", "admin", DEFAULT_DOMAIN);
        rm.add_link("bob", "admin", DEFAULT_DOMAIN);

        rm.delete_link("alice", "admin", DEFAULT_DOMAIN);
        assert!(rm.prune("alice"));
        assert!(!rm.prune("admin"));
        assert!(!rm.prune("alice"));

        assert!(rm.get_roles("alice", DEFAULT_DOMAIN).is_err());
        assert_eq!(rm.get_users("admin", DEFAULT_DOMAIN), vec!["bob"]);
    }
}
