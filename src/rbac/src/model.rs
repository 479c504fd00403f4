//! Validated model definition and argument checks

use crate::config::ModelSection;
use crate::error::{RbacError, Result};
use crate::types::DEFAULT_DOMAIN;

/// Immutable view of the `[model]` section used to check operation arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    role_definition: bool,
    domains: bool,
    permission_fields: Vec<String>,
}

impl Model {
    pub fn new(section: &ModelSection) -> Self {
        Self {
            role_definition: section.role_definition,
            domains: section.domains,
            permission_fields: section.permission_fields.clone(),
        }
    }

    pub fn has_roles(&self) -> bool {
        self.role_definition
    }

    /// Number of policy fields following the subject
    pub fn permission_arity(&self) -> usize {
        self.permission_fields.len()
    }

    /// Fails when the model was configured without a role definition
    pub fn check_roles(&self) -> Result<()> {
        if self.role_definition {
            Ok(())
        } else {
            Err(RbacError::Model(
                "role definition is missing from the model".to_string(),
            ))
        }
    }

    /// Effective domain for a call; `None` maps to the global scope
    pub fn resolve_domain<'a>(&self, domain: Option<&'a str>) -> Result<&'a str> {
        match domain {
            None => Ok(DEFAULT_DOMAIN),
            Some(_) if !self.domains => Err(RbacError::InvalidArgument(
                "domain given but the model has no domains".to_string(),
            )),
            Some(dom) if dom.is_empty() => Err(RbacError::InvalidArgument(
                "domain must not be empty".to_string(),
            )),
            Some(dom) => Ok(dom),
        }
    }

    /// Domain value to store in a grouping rule
    pub fn grouping_domain<'a>(&self, domain: &'a str) -> Option<&'a str> {
        if self.domains {
            Some(domain)
        } else {
            None
        }
    }

    pub fn check_name(&self, kind: &str, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(RbacError::InvalidArgument(format!("{} must not be empty", kind)));
        }
        Ok(())
    }

    /// Permission tuple must match the configured fields one-to-one
    pub fn check_permission(&self, permission: &[&str]) -> Result<()> {
        if permission.len() != self.permission_arity() {
            return Err(RbacError::InvalidArgument(format!(
                "permission has {} fields, model expects {} ({})",
                permission.len(),
                self.permission_arity(),
                self.permission_fields.join(", ")
            )));
        }

        if let Some(idx) = permission.iter().position(|f| f.is_empty()) {
            return Err(RbacError::InvalidArgument(format!(
                "permission field '{}' must not be empty",
                self.permission_fields[idx]
            )));
        }

        Ok(())
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new(&ModelSection::default())
    }
}
