//! Directory lookups
//!
//! Group and org-unit data come from an external workspace directory. The
//! client surface is best-effort: lookup failures degrade to "no data"
//! (empty groups, no org unit) and the policy layer decides whether that
//! is fatal for the attempt.

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};

/// Best-effort boundary to the workspace directory.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Groups the member directly belongs to.
    ///
    /// `member_key` may be a user email or a group email (directories
    /// report the parent groups of a group through the same lookup).
    /// Returns an empty list when the member is unknown or the lookup
    /// fails.
    async fn groups(&self, member_key: &str) -> Vec<String>;

    /// Org-unit path of a user, `None` when unknown or the lookup fails.
    async fn org_unit(&self, email: &str) -> Option<String>;
}

/// Hard cap on directory lookups per transitive expansion.
///
/// The directory's nesting graph is not trusted to terminate; a visited
/// set alone leaves worst-case fan-out unbounded.
pub const MAX_GROUP_EXPANSION_LOOKUPS: usize = 256;

/// Resolve a user's transitive group memberships.
///
/// Breadth-first over nested parent groups with a visited set and the
/// [`MAX_GROUP_EXPANSION_LOOKUPS`] cap. The result contains direct and
/// inherited memberships, deduplicated, in discovery order.
pub async fn expand_transitive_groups(directory: &dyn DirectoryClient, email: &str) -> Vec<String> {
    let direct = directory.groups(email).await;

    let mut all: Vec<String> = Vec::with_capacity(direct.len());
    let mut seen: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();

    for group in direct {
        if seen.insert(group.to_lowercase()) {
            all.push(group.clone());
            queue.push_back(group);
        }
    }

    let mut lookups = 1; // the user lookup above
    while let Some(group) = queue.pop_front() {
        if lookups >= MAX_GROUP_EXPANSION_LOOKUPS {
            tracing::warn!(
                email = %email,
                cap = MAX_GROUP_EXPANSION_LOOKUPS,
                "Group expansion lookup cap reached, returning partial membership"
            );
            break;
        }
        lookups += 1;

        for parent in directory.groups(&group).await {
            if seen.insert(parent.to_lowercase()) {
                all.push(parent.clone());
                queue.push_back(parent);
            }
        }
    }

    tracing::debug!(email = %email, groups = all.len(), lookups, "Expanded transitive groups");
    all
}
