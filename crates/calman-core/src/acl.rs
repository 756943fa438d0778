//! Access-control entries for a calendar.
//!
//! An [`AclRule`] grants a role to a scope; the only scope this tool writes
//! is a single user, but fetched rules of any scope round-trip untouched.

use serde::{Deserialize, Serialize};

/// Roles a rule can grant, in the order the menu offers them.
pub const ACL_ROLES: &[&str] = &["reader", "writer", "owner"];

/// One access-control rule on a calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Granted role: `none`, `freeBusyReader`, `reader`, `writer`, `owner`.
    pub role: String,
    pub scope: AclScope,
}

impl AclRule {
    /// A rule granting `role` to a single user.
    pub fn user(email: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: None,
            etag: None,
            role: role.into(),
            scope: AclScope {
                kind: "user".to_string(),
                value: Some(email.into()),
            },
        }
    }

    /// Returns `true` if this rule targets exactly the given user.
    pub fn is_user(&self, email: &str) -> bool {
        self.scope.kind == "user" && self.scope.value.as_deref() == Some(email)
    }
}

/// Who a rule applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclScope {
    /// `default`, `user`, `group` or `domain`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Principal for every kind except `default`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_rule_wire_shape() {
        let rule = AclRule::user("colleague@example.com", "writer");
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["role"], "writer");
        assert_eq!(json["scope"]["type"], "user");
        assert_eq!(json["scope"]["value"], "colleague@example.com");
        assert!(json.get("id").is_none());
    }

    #[test]
    fn matches_only_the_named_user() {
        let rule = AclRule::user("a@example.com", "reader");
        assert!(rule.is_user("a@example.com"));
        assert!(!rule.is_user("b@example.com"));

        let domain_rule: AclRule = serde_json::from_str(
            r#"{"role": "reader", "scope": {"type": "domain", "value": "example.com"}}"#,
        )
        .unwrap();
        assert!(!domain_rule.is_user("example.com"));
    }

    #[test]
    fn default_scope_has_no_value() {
        let rule: AclRule =
            serde_json::from_str(r#"{"role": "reader", "scope": {"type": "default"}}"#).unwrap();
        assert_eq!(rule.scope.kind, "default");
        assert!(rule.scope.value.is_none());
    }
}
