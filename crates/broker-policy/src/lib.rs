//! # Broker Policy
//!
//! Access-policy evaluation for the unified auth broker.
//!
//! ## Overview
//!
//! Pure, synchronous functions deciding whether an authenticated identity
//! may use a project, and which role it receives:
//!
//! - **Validators**: domain allow-list (exact match, no subdomains), the
//!   7-digit student heuristic, admin allow-lists, group AND/OR membership,
//!   and hierarchical org-unit matching.
//! - **Role resolution**: ordered first-match-wins evaluation of a
//!   project's [`RoleRule`](broker_config::RoleRule)s.
//! - **Violation taxonomy**: each check fails with a distinct
//!   [`PolicyViolation`] kind so callers can audit-log precise causes.
//!
//! Everything here takes immutable inputs and returns values with no side
//! effects, so it is safe on any worker thread.
//!
//! ## Check order
//!
//! [`evaluate_policy`] runs domain, student, admin, group, then org-unit
//! checks and short-circuits on the first violation. The order is part of
//! the contract: it determines which violation a multiply-failing identity
//! reports.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use broker_config::ProjectPolicy;
//! use broker_policy::evaluate_policy;
//!
//! # fn example(policy: &ProjectPolicy) {
//! match evaluate_policy("yamada@i-seifu.jp", None, None, policy) {
//!     Ok(()) => { /* proceed to role resolution and token issuance */ }
//!     Err(violation) => { /* audit-log and deny */ }
//! }
//! # }
//! ```

pub mod roles;
pub mod validators;
pub mod violation;

// Re-export main types
pub use roles::resolve_role;
pub use validators::{
    check_org_unit_hierarchy, evaluate_policy, extract_domain, is_student_email,
    validate_admin_access, validate_domain, validate_group_membership, validate_org_unit,
    validate_student_access,
};
pub use violation::{PolicyResult, PolicyViolation};
