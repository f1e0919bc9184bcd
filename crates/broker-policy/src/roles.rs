//! Role resolution
//!
//! Evaluates a project's ordered role rules against an identity to derive
//! at most one role label. No matching rule is not an error; token issuance
//! simply proceeds without a role claim.

use broker_config::{RoleCondition, RoleRule};
use regex::Regex;

/// Resolve the role for an identity from a project's role rules.
///
/// Rules are sorted ascending by priority (stable, so equal priorities keep
/// their list order) and the first matching condition wins:
///
/// - `Default` always matches.
/// - `GroupMembership` matches when the group is case-insensitively present
///   in the identity's groups; it never matches when `groups` is `None`.
/// - `EmailPattern` matches when the regex matches from the start of the
///   email (not necessarily to the end). An invalid pattern is logged and
///   treated as non-matching.
/// - `EmailList` matches on case-insensitive equality with any entry.
///
/// Resolution is deterministic: the same rules and identity always yield
/// the same role.
pub fn resolve_role(
    email: &str,
    groups: Option<&[String]>,
    rules: &[RoleRule],
) -> Option<String> {
    let mut sorted: Vec<&RoleRule> = rules.iter().collect();
    sorted.sort_by_key(|r| r.priority);

    for rule in sorted {
        if condition_matches(email, groups, &rule.condition) {
            tracing::debug!(
                email = %email,
                role = %rule.role,
                priority = rule.priority,
                "Role rule matched"
            );
            return Some(rule.role.clone());
        }
    }

    tracing::debug!(email = %email, "No role rule matched");
    None
}

fn condition_matches(email: &str, groups: Option<&[String]>, condition: &RoleCondition) -> bool {
    match condition {
        RoleCondition::Default => true,

        RoleCondition::GroupMembership { group_email } => {
            let Some(groups) = groups else {
                return false;
            };
            let wanted = group_email.to_lowercase();
            groups.iter().any(|g| g.to_lowercase() == wanted)
        }

        RoleCondition::EmailPattern { email_pattern } => match Regex::new(email_pattern) {
            // Anchored at the start only, like a "match" rather than a "fullmatch"
            Ok(re) => re.find(email).is_some_and(|m| m.start() == 0),
            Err(err) => {
                tracing::warn!(pattern = %email_pattern, error = %err, "Invalid role rule regex");
                false
            }
        },

        RoleCondition::EmailList { email_list } => {
            let email_lower = email.to_lowercase();
            email_list.iter().any(|e| e.to_lowercase() == email_lower)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn group_rule(priority: u32, role: &str, group: &str) -> RoleRule {
        RoleRule::new(
            priority,
            role,
            RoleCondition::GroupMembership {
                group_email: group.to_string(),
            },
        )
    }

    #[test]
    fn test_first_match_by_priority_wins() {
        let rules = vec![
            RoleRule::new(4, "student", RoleCondition::Default),
            group_rule(1, "office", "office@i-seifu.jp"),
        ];
        let groups = strings(&["office@i-seifu.jp"]);

        let role = resolve_role("yamada@i-seifu.jp", Some(&groups), &rules);
        assert_eq!(role.as_deref(), Some("office"));
    }

    #[test]
    fn test_default_is_catch_all() {
        let rules = vec![
            group_rule(1, "office", "office@i-seifu.jp"),
            RoleRule::new(4, "student", RoleCondition::Default),
        ];

        let role = resolve_role("1234567@i-seifu.jp", Some(&[]), &rules);
        assert_eq!(role.as_deref(), Some("student"));
    }

    #[test]
    fn test_group_condition_never_matches_without_groups() {
        let rules = vec![group_rule(1, "office", "office@i-seifu.jp")];
        assert_eq!(resolve_role("yamada@i-seifu.jp", None, &rules), None);
    }

    #[test]
    fn test_group_condition_case_insensitive() {
        let rules = vec![group_rule(1, "office", "Office@I-Seifu.jp")];
        let groups = strings(&["office@i-seifu.jp"]);
        assert_eq!(
            resolve_role("yamada@i-seifu.jp", Some(&groups), &rules).as_deref(),
            Some("office")
        );
    }

    #[test]
    fn test_email_pattern_anchored_at_start() {
        let rules = vec![RoleRule::new(
            1,
            "teacher",
            RoleCondition::EmailPattern {
                email_pattern: r"t\d+".to_string(),
            },
        )];

        assert_eq!(
            resolve_role("t1001@i-seifu.jp", None, &rules).as_deref(),
            Some("teacher")
        );
        // Pattern occurs mid-string only; a start-anchored match fails
        assert_eq!(resolve_role("xt1001@i-seifu.jp", None, &rules), None);
    }

    #[test]
    fn test_invalid_regex_is_non_matching() {
        let rules = vec![
            RoleRule::new(
                1,
                "broken",
                RoleCondition::EmailPattern {
                    email_pattern: "[unclosed".to_string(),
                },
            ),
            RoleRule::new(2, "fallback", RoleCondition::Default),
        ];

        assert_eq!(
            resolve_role("yamada@i-seifu.jp", None, &rules).as_deref(),
            Some("fallback")
        );
    }

    #[test]
    fn test_email_list_match() {
        let rules = vec![RoleRule::new(
            1,
            "principal",
            RoleCondition::EmailList {
                email_list: strings(&["Head@i-seifu.jp"]),
            },
        )];

        assert_eq!(
            resolve_role("head@i-seifu.jp", None, &rules).as_deref(),
            Some("principal")
        );
        assert_eq!(resolve_role("other@i-seifu.jp", None, &rules), None);
    }

    #[test]
    fn test_no_match_is_none_not_error() {
        let rules = vec![group_rule(1, "office", "office@i-seifu.jp")];
        assert_eq!(resolve_role("yamada@i-seifu.jp", Some(&[]), &rules), None);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let rules = vec![
            group_rule(2, "staff", "staff@x.jp"),
            group_rule(1, "office", "office@x.jp"),
            RoleRule::new(9, "member", RoleCondition::Default),
        ];
        let groups = strings(&["staff@x.jp", "office@x.jp"]);

        let first = resolve_role("a@x.jp", Some(&groups), &rules);
        let second = resolve_role("a@x.jp", Some(&groups), &rules);
        assert_eq!(first, second);
        assert_eq!(first.as_deref(), Some("office"));
    }

    #[test]
    fn test_equal_priorities_keep_list_order() {
        let rules = vec![
            RoleRule::new(1, "first", RoleCondition::Default),
            RoleRule::new(1, "second", RoleCondition::Default),
        ];
        assert_eq!(resolve_role("a@x.jp", None, &rules).as_deref(), Some("first"));
    }
}
