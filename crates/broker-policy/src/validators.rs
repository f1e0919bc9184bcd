//! Policy validators
//!
//! Pure functions evaluating domain, student, admin, group, and org-unit
//! rules against a project policy and an authenticated identity. The
//! combined [`evaluate_policy`] runs them in a fixed order and reports the
//! first violation; callers and tests depend on that ordering for error
//! selection, so it must not change.

use crate::violation::{PolicyResult, PolicyViolation};
use broker_config::ProjectPolicy;

/// Extract the domain from an email address, lowercased.
///
/// Only the `local@domain` shape is accepted: exactly one `@` with
/// non-empty halves. Anything else returns `None`.
pub fn extract_domain(email: &str) -> Option<String> {
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(domain.to_lowercase())
}

/// Classify an email as a student account.
///
/// Student accounts have a local part of exactly 7 ASCII digits
/// (e.g. `1234567@i-seifu.jp`). Earlier prefix heuristics produced false
/// positives and were dropped.
pub fn is_student_email(email: &str) -> bool {
    let local = email.split('@').next().unwrap_or(email);
    local.len() == 7 && local.bytes().all(|b| b.is_ascii_digit())
}

/// Validate the email's domain against the allow-list.
///
/// The match is exact and case-insensitive. Subdomains do not match:
/// `sub.i-seifu.jp` is rejected against `i-seifu.jp`. Malformed addresses
/// are rejected outright.
pub fn validate_domain(email: &str, allowed_domains: &[String]) -> PolicyResult {
    let denied = |domain: String| PolicyViolation::InvalidDomain {
        domain,
        allowed_domains: allowed_domains.to_vec(),
    };

    let domain = extract_domain(email).ok_or_else(|| denied(String::new()))?;

    if allowed_domains.iter().any(|d| d.to_lowercase() == domain) {
        Ok(())
    } else {
        Err(denied(domain))
    }
}

/// Reject student accounts when the project excludes them.
pub fn validate_student_access(email: &str, student_allowed: bool) -> PolicyResult {
    if !student_allowed && is_student_email(email) {
        return Err(PolicyViolation::StudentNotAllowed {
            email: email.to_string(),
        });
    }
    Ok(())
}

/// Enforce an admin-only restriction when one is configured.
///
/// An empty `admin_emails` list means no restriction. Otherwise the email
/// must case-insensitively match one entry.
pub fn validate_admin_access(email: &str, admin_emails: &[String]) -> PolicyResult {
    if admin_emails.is_empty() {
        return Ok(());
    }

    let email_lower = email.to_lowercase();
    if admin_emails.iter().any(|a| a.to_lowercase() == email_lower) {
        Ok(())
    } else {
        Err(PolicyViolation::AdminOnly {
            email: email.to_string(),
        })
    }
}

/// Validate group membership requirements.
///
/// `required_groups` is an AND condition (every group must be present),
/// `allowed_groups` an OR condition (at least one must match). Both are
/// independent and both are checked when both are configured. Comparison
/// is case-insensitive.
pub fn validate_group_membership(
    user_groups: &[String],
    required_groups: &[String],
    allowed_groups: &[String],
) -> PolicyResult {
    let user_lower: Vec<String> = user_groups.iter().map(|g| g.to_lowercase()).collect();

    if !required_groups.is_empty() {
        let missing: Vec<String> = required_groups
            .iter()
            .filter(|g| !user_lower.contains(&g.to_lowercase()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(PolicyViolation::GroupMembershipRequired {
                missing_groups: missing,
            });
        }
    }

    if !allowed_groups.is_empty() {
        let any_match = allowed_groups
            .iter()
            .any(|g| user_lower.contains(&g.to_lowercase()));
        if !any_match {
            return Err(PolicyViolation::NoMatchingGroup {
                allowed_groups: allowed_groups.to_vec(),
            });
        }
    }

    Ok(())
}

/// Check whether a user's org-unit path matches an allowed path.
///
/// The match is hierarchical: equal paths match, and a path-separator
/// delimited descendant matches its ancestor. `/A/B` matches allowed `/A`;
/// `/A` does not match allowed `/A/B`. Trailing slashes are ignored.
pub fn check_org_unit_hierarchy(user_org_unit: &str, allowed_org_unit: &str) -> bool {
    let user = user_org_unit.trim_end_matches('/');
    let allowed = allowed_org_unit.trim_end_matches('/');

    user == allowed || user.starts_with(&format!("{}/", allowed))
}

/// Validate org-unit requirements.
///
/// Same AND/OR semantics as groups, with hierarchical matching. When the
/// policy configures org-unit rules but no org unit was supplied (the
/// directory lookup failed or returned nothing), the result is
/// [`PolicyViolation::OrgUnitUnavailable`].
pub fn validate_org_unit(
    user_org_unit: Option<&str>,
    required_org_units: &[String],
    allowed_org_units: &[String],
) -> PolicyResult {
    if required_org_units.is_empty() && allowed_org_units.is_empty() {
        return Ok(());
    }

    let user_org_unit = user_org_unit.ok_or(PolicyViolation::OrgUnitUnavailable)?;

    if !required_org_units.is_empty() {
        let uncovered: Vec<String> = required_org_units
            .iter()
            .filter(|ou| !check_org_unit_hierarchy(user_org_unit, ou))
            .cloned()
            .collect();
        if !uncovered.is_empty() {
            return Err(PolicyViolation::OrgUnitRequired {
                required_org_units: uncovered,
            });
        }
    }

    if !allowed_org_units.is_empty() {
        let any_match = allowed_org_units
            .iter()
            .any(|ou| check_org_unit_hierarchy(user_org_unit, ou));
        if !any_match {
            return Err(PolicyViolation::NoMatchingOrgUnit {
                allowed_org_units: allowed_org_units.to_vec(),
            });
        }
    }

    Ok(())
}

/// Run every validator against a policy, in order, short-circuiting on the
/// first violation.
///
/// Order: domain, student, admin, groups, org unit. The group check runs
/// only when the policy configures group rules; absent group data then
/// degrades to an empty set (so a failed directory lookup still denies a
/// group-restricted project). The org-unit check runs only when the policy
/// configures org-unit rules.
pub fn evaluate_policy(
    email: &str,
    groups: Option<&[String]>,
    org_unit: Option<&str>,
    policy: &ProjectPolicy,
) -> PolicyResult {
    validate_domain(email, &policy.allowed_domains)?;
    validate_student_access(email, policy.student_allowed)?;
    validate_admin_access(email, &policy.admin_emails)?;

    if !policy.required_groups.is_empty() || !policy.allowed_groups.is_empty() {
        let groups = groups.unwrap_or(&[]);
        validate_group_membership(groups, &policy.required_groups, &policy.allowed_groups)?;
    }

    validate_org_unit(org_unit, &policy.required_org_units, &policy.allowed_org_units)?;

    tracing::debug!(email = %email, project_id = %policy.project_id, "Passed all policy checks");
    Ok(())
}
