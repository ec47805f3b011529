//! Principals, users and the permission vocabulary of the resource routes.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The authenticated caller, as resolved from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
}

impl Principal {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

/// A `(resource pattern, permission pattern)` pair granted to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub resource: String,
    pub permission: String,
}

impl Grant {
    pub fn new(resource: impl Into<String>, permission: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            permission: permission.into(),
        }
    }

    pub fn allows(&self, resource: &str, permission: &str) -> bool {
        pattern_matches(&self.resource, resource, '/') && pattern_matches(&self.permission, permission, ':')
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub grants: Vec<Grant>,
}

impl User {
    pub fn can(&self, resource: &str, permission: &str) -> bool {
        self.grants.iter().any(|grant| grant.allows(resource, permission))
    }
}

/// Operations guarded on the static-resource routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Load,
    Add,
    Delete,
    PublicToggle,
}

impl Action {
    pub fn permission(&self) -> &'static str {
        match self {
            Action::List => "static-resource:list",
            Action::Load => "static-resource:load",
            Action::Add => "static-resource:add",
            Action::Delete => "static-resource:delete",
            Action::PublicToggle => "static-resource:public-toggle",
        }
    }

    /// Route template the permission is evaluated against.
    pub fn resource_template(&self) -> &'static str {
        match self {
            Action::List => "/static-resource/type/{type}",
            Action::Load | Action::Delete => "/static-resource/{id}",
            Action::Add => "/static-resource/",
            Action::PublicToggle => "/static-resource/{id}/public/toggle",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.permission())
    }
}

/// Glob match where `*` stays within one `separator`-delimited segment and
/// `**` matches anything, separators included.
pub fn pattern_matches(pattern: &str, value: &str, separator: char) -> bool {
    if pattern == "**" || pattern == value {
        return true;
    }

    let sep = regex::escape(&separator.to_string());
    let mut expr = String::from("^");
    let mut rest = pattern;
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix("**") {
            expr.push_str(".*");
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix('*') {
            expr.push_str(&format!("[^{}]*", sep));
            rest = tail;
        } else {
            let next = rest.find('*').unwrap_or(rest.len());
            expr.push_str(&regex::escape(&rest[..next]));
            rest = &rest[next..];
        }
    }
    expr.push('$');

    match Regex::new(&expr) {
        Ok(re) => re.is_match(value),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_pattern() {
        assert!(pattern_matches("/static-resource/{id}", "/static-resource/{id}", '/'));
        assert!(!pattern_matches("/static-resource/{id}", "/static-resource/", '/'));
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        assert!(pattern_matches("/static-resource/*", "/static-resource/{id}", '/'));
        assert!(!pattern_matches(
            "/static-resource/*",
            "/static-resource/{id}/public/toggle",
            '/'
        ));
        assert!(pattern_matches("static-resource:*", "static-resource:public-toggle", ':'));
        assert!(!pattern_matches("static-resource:*", "user:list", ':'));
    }

    #[test]
    fn test_double_star_matches_suffix() {
        assert!(pattern_matches(
            "/static-resource/**",
            "/static-resource/{id}/public/toggle",
            '/'
        ));
        assert!(pattern_matches("**", "/anything/at/all", '/'));
    }

    #[test]
    fn test_user_grants() {
        let user = User {
            id: "1".into(),
            name: "alice".into(),
            grants: vec![
                Grant::new("/static-resource/**", "static-resource:load"),
                Grant::new("/static-resource/", "static-resource:add"),
            ],
        };
        assert!(user.can(Action::Load.resource_template(), Action::Load.permission()));
        assert!(user.can(Action::Add.resource_template(), Action::Add.permission()));
        assert!(!user.can(Action::Delete.resource_template(), Action::Delete.permission()));
    }

    #[test]
    fn test_templates_and_permissions() {
        assert_eq!(Action::PublicToggle.permission(), "static-resource:public-toggle");
        assert_eq!(Action::List.resource_template(), "/static-resource/type/{type}");
        assert_eq!(Action::Delete.to_string(), "static-resource:delete");
    }
}
