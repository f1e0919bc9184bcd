//! Role rules
//!
//! This module defines the ordered condition-to-role mappings a project can
//! configure to derive a coarse permission label from identity and group data.

use serde::{Deserialize, Serialize};

/// Condition attached to a [`RoleRule`].
///
/// Serialized with an internal `condition_type` tag so a rule is a single
/// flat JSON object:
///
/// ```json
/// {"priority": 1, "role": "office", "condition_type": "group_membership",
///  "group_email": "office@i-seifu.jp"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "condition_type", rename_all = "snake_case")]
pub enum RoleCondition {
    /// Always matches. Intended as the catch-all with the highest priority
    /// number (lowest precedence) in a rule set.
    Default,

    /// Matches when the identity is a member of the given group.
    ///
    /// Never matches when no group data was fetched for the identity.
    GroupMembership {
        /// Group email address to test membership against
        group_email: String,
    },

    /// Matches when the pattern matches the email from the start.
    ///
    /// An invalid pattern is logged and treated as non-matching, not fatal.
    EmailPattern {
        /// Regular expression, anchored at the start of the email
        email_pattern: String,
    },

    /// Matches when the email equals one entry (case-insensitive).
    EmailList {
        /// Explicit list of email addresses
        email_list: Vec<String>,
    },
}

impl RoleCondition {
    /// Whether evaluating this condition needs directory group data.
    pub fn needs_groups(&self) -> bool {
        matches!(self, RoleCondition::GroupMembership { .. })
    }
}

/// An ordered condition-to-role mapping.
///
/// Rules are evaluated in ascending `priority` order (lower number = higher
/// precedence); the first matching rule wins. Priorities are expected to be
/// unique within a rule set; residual ties are broken by original list order
/// (evaluation sorts stably).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleRule {
    /// Evaluation order, lower = higher precedence
    pub priority: u32,

    /// Role label assigned when the condition matches
    pub role: String,

    /// Matching condition
    #[serde(flatten)]
    pub condition: RoleCondition,
}

impl RoleRule {
    /// Create a new role rule.
    pub fn new(priority: u32, role: impl Into<String>, condition: RoleCondition) -> Self {
        Self {
            priority,
            role: role.into(),
            condition,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_json_shape() {
        let rule = RoleRule::new(
            1,
            "office",
            RoleCondition::GroupMembership {
                group_email: "office@i-seifu.jp".to_string(),
            },
        );

        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["priority"], 1);
        assert_eq!(json["role"], "office");
        assert_eq!(json["condition_type"], "group_membership");
        assert_eq!(json["group_email"], "office@i-seifu.jp");
    }

    #[test]
    fn test_default_rule_roundtrip() {
        let json = r#"{"priority": 4, "role": "student", "condition_type": "default"}"#;
        let rule: RoleRule = serde_json::from_str(json).unwrap();

        assert_eq!(rule.priority, 4);
        assert_eq!(rule.role, "student");
        assert_eq!(rule.condition, RoleCondition::Default);
        assert!(!rule.condition.needs_groups());
    }

    #[test]
    fn test_needs_groups() {
        let rule = RoleRule::new(
            2,
            "staff",
            RoleCondition::GroupMembership {
                group_email: "staff@example.com".to_string(),
            },
        );
        assert!(rule.condition.needs_groups());

        let rule = RoleRule::new(
            3,
            "teacher",
            RoleCondition::EmailPattern {
                email_pattern: r"^t\d+".to_string(),
            },
        );
        assert!(!rule.condition.needs_groups());
    }
}
