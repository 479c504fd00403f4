//! Core RBAC identifier types

/// Domain used for the global scope (no domain given)
pub const DEFAULT_DOMAIN: &str = "";

/// Stored policy rule: `[subject, field_1, .., field_n]`
pub type Rule = Vec<String>;

/// Mode a facade operation takes the lock in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Shared; any number of readers at once
    Read,
    /// Exclusive; a single writer, no readers
    Write,
}

impl LockMode {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            LockMode::Read => "read",
            LockMode::Write => "write",
        }
    }
}

/// Build a stored rule from a subject and its permission tuple
pub fn rule_of(subject: &str, permission: &[&str]) -> Rule {
    let mut rule = Vec::with_capacity(permission.len() + 1);
    rule.push(subject.to_string());
    rule.extend(permission.iter().map(|f| f.to_string()));
    rule
}

/// Build a grouping rule; the domain is only stored when the model has domains
pub fn grouping_of(user: &str, role: &str, domain: Option<&str>) -> Rule {
    match domain {
        Some(dom) => vec![user.to_string(), role.to_string(), dom.to_string()],
        None => vec![user.to_string(), role.to_string()],
    }
}
