//! Enforcer configuration loading and validation

use crate::error::{RbacError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

/// Complete enforcer configuration
///
/// ```toml
/// [model]
/// role_definition = true
/// domains = true
/// permission_fields = ["dom", "obj", "act"]
///
/// [role_manager]
/// max_hierarchy_level = 10
///
/// [metrics]
/// enabled = true
/// namespace = "cretoai"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EnforcerConfig {
    #[serde(default)]
    pub model: ModelSection,

    #[serde(default)]
    pub role_manager: RoleManagerSection,

    #[serde(default)]
    pub metrics: MetricsSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelSection {
    /// Whether the model has a role definition (`g = _, _`)
    #[serde(default = "default_true")]
    pub role_definition: bool,

    /// Whether roles and permissions are scoped by domain
    #[serde(default)]
    pub domains: bool,

    /// Policy fields following the subject; the domain comes first when enabled
    #[serde(default = "default_permission_fields")]
    pub permission_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RoleManagerSection {
    /// Maximum depth followed when resolving inherited roles
    #[serde(default = "default_max_hierarchy_level")]
    pub max_hierarchy_level: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MetricsSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_true() -> bool { true }
fn default_permission_fields() -> Vec<String> { vec!["obj".to_string(), "act".to_string()] }
fn default_max_hierarchy_level() -> usize { 10 }
fn default_namespace() -> String { "cretoai".to_string() }

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            role_definition: true,
            domains: false,
            permission_fields: default_permission_fields(),
        }
    }
}

impl Default for RoleManagerSection {
    fn default() -> Self {
        Self {
            max_hierarchy_level: default_max_hierarchy_level(),
        }
    }
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: default_namespace(),
        }
    }
}

impl EnforcerConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            RbacError::Config(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EnforcerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Model with domains enabled and `dom, obj, act` permission fields
    pub fn with_domains() -> Self {
        let mut config = Self::default();
        config.model.domains = true;
        config.model.permission_fields = vec![
            "dom".to_string(),
            "obj".to_string(),
            "act".to_string(),
        ];
        config
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let fields = &self.model.permission_fields;

        if fields.is_empty() {
            return Err(invalid("model.permission_fields must not be empty"));
        }

        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(invalid("model.permission_fields contains an empty field name"));
        }

        let unique: HashSet<&String> = fields.iter().collect();
        if unique.len() != fields.len() {
            return Err(invalid("model.permission_fields contains duplicate field names"));
        }

        if self.model.domains && fields.len() < 2 {
            return Err(invalid(
                "model.domains requires a domain field followed by at least one permission field",
            ));
        }

        if self.role_manager.max_hierarchy_level == 0 {
            return Err(invalid("role_manager.max_hierarchy_level must be greater than 0"));
        }

        if self.metrics.enabled && self.metrics.namespace.trim().is_empty() {
            return Err(invalid("metrics.namespace must not be empty when metrics are enabled"));
        }

        Ok(())
    }
}

fn invalid(msg: &str) -> RbacError {
    warn!("Rejected enforcer configuration: {}", msg);
    RbacError::Config(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EnforcerConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.model.role_definition);
        assert!(!config.model.domains);
        assert_eq!(config.model.permission_fields, vec!["obj", "act"]);
        assert_eq!(config.role_manager.max_hierarchy_level, 10);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = EnforcerConfig::from_toml_str("").unwrap();
        assert_eq!(config, EnforcerConfig::default());
    }

    #[test]
    fn test_parse_domain_model() {
        let config = EnforcerConfig::from_toml_str(
            r#"
            [model]
            domains = true
            permission_fields = ["dom", "obj", "act"]

            [role_manager]
            max_hierarchy_level = 5
            "#,
        )
        .unwrap();

        assert!(config.model.domains);
        assert_eq!(config.model.permission_fields.len(), 3);
        assert_eq!(config.role_manager.max_hierarchy_level, 5);
        assert_eq!(config, {
            let mut expected = EnforcerConfig::with_domains();
            expected.role_manager.max_hierarchy_level = 5;
            expected
        });
    }

    #[test]
    fn test_rejects_duplicate_fields() {
        let result = EnforcerConfig::from_toml_str(
            r#"
            [model]
            permission_fields = ["obj", "obj"]
            "#,
        );
        assert!(matches!(result, Err(RbacError::Config(msg)) if msg.contains("duplicate")));
    }

    #[test]
    fn test_rejects_zero_hierarchy_level() {
        let mut config = EnforcerConfig::default();
        config.role_manager.max_hierarchy_level = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_domain_model_without_permission_field() {
        let mut config = EnforcerConfig::default();
        config.model.domains = true;
        config.model.permission_fields = vec!["dom".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let result = EnforcerConfig::from_toml_str("[model\ndomains = true");
        assert!(matches!(result, Err(RbacError::Config(_))));
    }
}
