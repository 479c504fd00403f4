//! In-memory enforcer holding policy and grouping rules

use super::RbacEngine;
use crate::config::EnforcerConfig;
use crate::error::Result;
use crate::model::Model;
use crate::role_manager::RoleManager;
use crate::types::{grouping_of, rule_of, Rule, DEFAULT_DOMAIN};
use indexmap::IndexSet;
use tracing::debug;

/// Non-thread-safe RBAC engine
///
/// Policy rules (`p`) and grouping rules (`g`) are kept in insertion order
/// without duplicates. The role manager is updated in the same call as the
/// grouping rules, so the two never disagree once a call returns.
///
/// Share it between threads through [`crate::SyncedEnforcer`] only.
#[derive(Debug, Clone)]
pub struct Enforcer {
    model: Model,
    policies: IndexSet<Rule>,
    groupings: IndexSet<Rule>,
    role_manager: RoleManager,
}

impl Enforcer {
    /// Create an empty enforcer from a validated configuration
    pub fn new(config: &EnforcerConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            model: Model::new(&config.model),
            policies: IndexSet::new(),
            groupings: IndexSet::new(),
            role_manager: RoleManager::new(config.role_manager.max_hierarchy_level),
        })
    }

    pub fn policy(&self) -> Vec<Rule> {
        self.policies.iter().cloned().collect()
    }

    pub fn grouping_policy(&self) -> Vec<Rule> {
        self.groupings.iter().cloned().collect()
    }

    /// Drop every rule and role link
    pub fn clear_policy(&mut self) {
        self.policies.clear();
        self.groupings.clear();
        self.role_manager.clear();
    }

    fn link_domain(rule: &[String]) -> &str {
        rule.get(2).map(String::as_str).unwrap_or(DEFAULT_DOMAIN)
    }

    fn insert_grouping(&mut self, rule: Rule) -> bool {
        if self.groupings.contains(&rule) {
            return false;
        }
        self.role_manager
            .add_link(&rule[0], &rule[1], Self::link_domain(&rule));
        self.groupings.insert(rule)
    }

    fn remove_grouping(&mut self, rule: &Rule) -> bool {
        if !self.groupings.shift_remove(rule) {
            return false;
        }
        self.role_manager
            .delete_link(&rule[0], &rule[1], Self::link_domain(rule));
        true
    }

    /// Remove every grouping rule matching `pred`, keeping the role manager in step
    fn remove_groupings_where<F>(&mut self, pred: F) -> bool
    where
        F: Fn(&Rule) -> bool,
    {
        let matched: Vec<Rule> = self.groupings.iter().filter(|r| pred(*r)).cloned().collect();
        for rule in &matched {
            self.remove_grouping(rule);
        }
        !matched.is_empty()
    }

    fn remove_policies_where<F>(&mut self, pred: F) -> bool
    where
        F: Fn(&Rule) -> bool,
    {
        let before = self.policies.len();
        self.policies.retain(|r| !pred(r));
        self.policies.len() != before
    }

    fn rules_for_subject(&self, subject: &str, domain: Option<&str>) -> impl Iterator<Item = &Rule> {
        let domain = domain.map(str::to_string);
        let subject = subject.to_string();
        self.policies.iter().filter(move |r| {
            r[0] == subject && domain.as_deref().map_or(true, |d| r[1] == d)
        })
    }
}

impl Default for Enforcer {
    fn default() -> Self {
        Self {
            model: Model::default(),
            policies: IndexSet::new(),
            groupings: IndexSet::new(),
            role_manager: RoleManager::default(),
        }
    }
}

impl RbacEngine for Enforcer {
    fn get_roles_for_user(&self, name: &str, domain: Option<&str>) -> Result<Vec<String>> {
        self.model.check_roles()?;
        self.model.check_name("user", name)?;
        let domain = self.model.resolve_domain(domain)?;

        self.role_manager.get_roles(name, domain)
    }

    fn get_users_for_role(&self, name: &str, domain: Option<&str>) -> Result<Vec<String>> {
        self.model.check_roles()?;
        self.model.check_name("role", name)?;
        let domain = self.model.resolve_domain(domain)?;

        Ok(self.role_manager.get_users(name, domain))
    }

    fn has_role_for_user(&self, name: &str, role: &str, domain: Option<&str>) -> Result<bool> {
        self.model.check_roles()?;
        self.model.check_name("user", name)?;
        self.model.check_name("role", role)?;
        let domain = self.model.resolve_domain(domain)?;

        Ok(self.role_manager.has_link(name, role, domain))
    }

    fn add_role_for_user(&mut self, user: &str, role: &str, domain: Option<&str>) -> Result<bool> {
        self.model.check_roles()?;
        self.model.check_name("user", user)?;
        self.model.check_name("role", role)?;
        let domain = self.model.resolve_domain(domain)?;

        let rule = grouping_of(user, role, self.model.grouping_domain(domain));
        let affected = self.insert_grouping(rule);

        debug!(user, role, domain, affected, "add_role_for_user");
        Ok(affected)
    }

    fn add_roles_for_user(&mut self, user: &str, roles: &[&str], domain: Option<&str>) -> Result<bool> {
        self.model.check_roles()?;
        self.model.check_name("user", user)?;
        for role in roles {
            self.model.check_name("role", role)?;
        }
        let domain = self.model.resolve_domain(domain)?;
        let grouping_domain = self.model.grouping_domain(domain);

        let rules: IndexSet<Rule> = roles
            .iter()
            .map(|role| grouping_of(user, role, grouping_domain))
            .collect();

        if rules.is_empty() || rules.iter().any(|r| self.groupings.contains(r)) {
            debug!(user, domain, count = roles.len(), affected = false, "add_roles_for_user");
            return Ok(false);
        }

        for rule in rules {
            self.insert_grouping(rule);
        }

        debug!(user, domain, count = roles.len(), affected = true, "add_roles_for_user");
        Ok(true)
    }

    fn delete_role_for_user(&mut self, user: &str, role: &str, domain: Option<&str>) -> Result<bool> {
        self.model.check_roles()?;
        self.model.check_name("user", user)?;
        self.model.check_name("role", role)?;
        let domain = self.model.resolve_domain(domain)?;

        let rule = grouping_of(user, role, self.model.grouping_domain(domain));
        let affected = self.remove_grouping(&rule);

        debug!(user, role, domain, affected, "delete_role_for_user");
        Ok(affected)
    }

    fn delete_roles_for_user(&mut self, user: &str, domain: Option<&str>) -> Result<bool> {
        self.model.check_roles()?;
        self.model.check_name("user", user)?;

        let affected = match domain {
            // No domain: every domain the user has roles in
            None => self.remove_groupings_where(|r| r[0] == user),
            Some(_) => {
                let domain = self.model.resolve_domain(domain)?;
                self.remove_groupings_where(|r| r[0] == user && Self::link_domain(r) == domain)
            }
        };

        debug!(user, ?domain, affected, "delete_roles_for_user");
        Ok(affected)
    }

    fn delete_user(&mut self, user: &str) -> Result<bool> {
        self.model.check_name("user", user)?;

        let roles_removed = self.remove_groupings_where(|r| r[0] == user);
        let permissions_removed = self.remove_policies_where(|r| r[0] == user);
        let pruned = self.role_manager.prune(user);

        let affected = roles_removed || permissions_removed || pruned;
        debug!(user, affected, "delete_user");
        Ok(affected)
    }

    fn delete_role(&mut self, role: &str) -> Result<bool> {
        self.model.check_roles()?;
        self.model.check_name("role", role)?;

        let links_removed = self.remove_groupings_where(|r| r[0] == role || r[1] == role);
        let permissions_removed = self.remove_policies_where(|r| r[0] == role);
        let pruned = self.role_manager.prune(role);

        let affected = links_removed || permissions_removed || pruned;
        debug!(role, affected, "delete_role");
        Ok(affected)
    }

    fn delete_permission(&mut self, permission: &[&str]) -> Result<bool> {
        self.model.check_permission(permission)?;

        let affected = self.remove_policies_where(|r| {
            r.len() == permission.len() + 1
                && r[1..].iter().zip(permission).all(|(a, b)| a == b)
        });

        debug!(?permission, affected, "delete_permission");
        Ok(affected)
    }

    fn add_permission_for_user(&mut self, user: &str, permission: &[&str]) -> Result<bool> {
        self.model.check_name("user", user)?;
        self.model.check_permission(permission)?;

        let affected = self.policies.insert(rule_of(user, permission));

        debug!(user, ?permission, affected, "add_permission_for_user");
        Ok(affected)
    }

    fn delete_permission_for_user(&mut self, user: &str, permission: &[&str]) -> Result<bool> {
        self.model.check_name("user", user)?;
        self.model.check_permission(permission)?;

        let affected = self.policies.shift_remove(&rule_of(user, permission));

        debug!(user, ?permission, affected, "delete_permission_for_user");
        Ok(affected)
    }

    fn delete_permissions_for_user(&mut self, user: &str) -> Result<bool> {
        self.model.check_name("user", user)?;

        let affected = self.remove_policies_where(|r| r[0] == user);

        debug!(user, affected, "delete_permissions_for_user");
        Ok(affected)
    }

    fn get_permissions_for_user(&self, user: &str, domain: Option<&str>) -> Result<Vec<Rule>> {
        self.model.check_name("user", user)?;
        if domain.is_some() {
            self.model.resolve_domain(domain)?;
        }

        Ok(self.rules_for_subject(user, domain).cloned().collect())
    }

    fn has_permission_for_user(&self, user: &str, permission: &[&str]) -> Result<bool> {
        self.model.check_name("user", user)?;
        self.model.check_permission(permission)?;

        Ok(self.policies.contains(&rule_of(user, permission)))
    }

    fn get_implicit_roles_for_user(&self, name: &str, domain: Option<&str>) -> Result<Vec<String>> {
        self.model.check_roles()?;
        self.model.check_name("user", name)?;
        let domain = self.model.resolve_domain(domain)?;

        Ok(self.role_manager.get_implicit_roles(name, domain))
    }

    fn get_implicit_permissions_for_user(&self, user: &str, domain: Option<&str>) -> Result<Vec<Rule>> {
        self.model.check_name("user", user)?;
        if domain.is_some() {
            self.model.resolve_domain(domain)?;
        }

        let mut subjects = vec![user.to_string()];
        if self.model.has_roles() {
            let role_domain = domain.unwrap_or(DEFAULT_DOMAIN);
            subjects.extend(self.role_manager.get_implicit_roles(user, role_domain));
        }

        let mut rules: IndexSet<&Rule> = IndexSet::new();
        for subject in &subjects {
            rules.extend(self.rules_for_subject(subject, domain));
        }

        Ok(rules.into_iter().cloned().collect())
    }
}
