//! Access-policy violation taxonomy
//!
//! Each validator reports a distinct violation kind so the orchestration
//! layer can audit-log a precise cause without parsing strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A specific reason an authenticated identity was denied a project.
///
/// Violations are terminal for the attempt: the pipeline never retries
/// authorization logic.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyViolation {
    /// Email domain is malformed or not in the project's allow-list
    #[error("Domain '{domain}' is not allowed")]
    InvalidDomain {
        /// Domain extracted from the email, empty when malformed
        domain: String,
        /// The project's domain allow-list
        allowed_domains: Vec<String>,
    },

    /// Student account attempted a project that excludes students
    #[error("Student accounts are not allowed for this project")]
    StudentNotAllowed {
        /// The student email
        email: String,
    },

    /// Project is restricted to an explicit admin list
    #[error("This project is restricted to administrators only")]
    AdminOnly {
        /// The rejected email
        email: String,
    },

    /// Identity is missing one or more required groups
    #[error("User is not a member of required groups")]
    GroupMembershipRequired {
        /// Required groups the identity lacks
        missing_groups: Vec<String>,
    },

    /// Identity belongs to none of the allowed groups
    #[error("User is not a member of any allowed groups")]
    NoMatchingGroup {
        /// The project's allowed groups
        allowed_groups: Vec<String>,
    },

    /// Policy requires org-unit data but the directory returned none
    #[error("Organizational unit information is unavailable")]
    OrgUnitUnavailable,

    /// Identity's org unit falls outside a required org unit
    #[error("User is not in the required organizational units")]
    OrgUnitRequired {
        /// Required org-unit paths not covering the identity
        required_org_units: Vec<String>,
    },

    /// Identity's org unit falls under none of the allowed org units
    #[error("User is not in any allowed organizational unit")]
    NoMatchingOrgUnit {
        /// The project's allowed org-unit paths
        allowed_org_units: Vec<String>,
    },
}

/// Result type for policy validation.
pub type PolicyResult = Result<(), PolicyViolation>;
