//! Branch protection domain types.
//!
//! This module contains types representing GitHub branch protection rules as exposed by
//! the GraphQL API. Rules are keyed by pattern and identified by their node ID.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "branch_protection_tests.rs"]
mod tests;

/// The full set of fields the organizer manages on a branch protection rule.
///
/// Serializes with the field names of `CreateBranchProtectionRuleInput` and
/// `UpdateBranchProtectionRuleInput`, so the value can be embedded directly in a mutation.
///
/// # Examples
///
/// ```rust
/// use github_client::BranchProtectionSettings;
///
/// let settings = BranchProtectionSettings {
///     requires_approving_reviews: true,
///     required_approving_review_count: 2,
///     ..Default::default()
/// };
///
/// let input = serde_json::to_value(&settings).unwrap();
/// assert_eq!(input["requiredApprovingReviewCount"], 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchProtectionSettings {
    /// Whether approving reviews are required to merge
    pub requires_approving_reviews: bool,
    /// Number of approving reviews required
    pub required_approving_review_count: u32,
    /// Whether commits must be signed
    pub requires_commit_signatures: bool,
    /// Whether the rule also applies to administrators
    pub is_admin_enforced: bool,
    /// Whether new commits dismiss existing approvals
    pub dismisses_stale_reviews: bool,
    /// Whether a code owner must approve
    pub requires_code_owner_reviews: bool,
    /// Whether status checks must pass
    pub requires_status_checks: bool,
    /// Whether the branch must be up to date before merging
    pub requires_strict_status_checks: bool,
    /// Status check contexts that must pass
    pub required_status_check_contexts: Vec<String>,
    /// Whether only specific actors may dismiss reviews
    pub restricts_review_dismissals: bool,
    /// Node IDs of actors allowed to dismiss reviews
    pub review_dismissal_actor_ids: Vec<String>,
    /// Whether only specific actors may push
    pub restricts_pushes: bool,
    /// Node IDs of actors allowed to push
    pub push_actor_ids: Vec<String>,
}

impl BranchProtectionSettings {
    /// Returns `true` when both settings describe the same rule.
    ///
    /// Status check contexts and actor lists are compared as sets, since GitHub does not
    /// preserve their order.
    pub fn is_equivalent(&self, other: &BranchProtectionSettings) -> bool {
        self.requires_approving_reviews == other.requires_approving_reviews
            && self.required_approving_review_count == other.required_approving_review_count
            && self.requires_commit_signatures == other.requires_commit_signatures
            && self.is_admin_enforced == other.is_admin_enforced
            && self.dismisses_stale_reviews == other.dismisses_stale_reviews
            && self.requires_code_owner_reviews == other.requires_code_owner_reviews
            && self.requires_status_checks == other.requires_status_checks
            && self.requires_strict_status_checks == other.requires_strict_status_checks
            && same_members(
                &self.required_status_check_contexts,
                &other.required_status_check_contexts,
            )
            && self.restricts_review_dismissals == other.restricts_review_dismissals
            && same_members(
                &self.review_dismissal_actor_ids,
                &other.review_dismissal_actor_ids,
            )
            && self.restricts_pushes == other.restricts_pushes
            && same_members(&self.push_actor_ids, &other.push_actor_ids)
    }
}

fn same_members(left: &[String], right: &[String]) -> bool {
    let mut left: Vec<&str> = left.iter().map(String::as_str).collect();
    let mut right: Vec<&str> = right.iter().map(String::as_str).collect();
    left.sort_unstable();
    left.dedup();
    right.sort_unstable();
    right.dedup();
    left == right
}

/// A branch protection rule that exists on a repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchProtectionRule {
    /// Node ID of the rule
    pub id: String,
    /// Branch name pattern the rule applies to
    pub pattern: String,
    /// Current field values
    pub settings: BranchProtectionSettings,
}

/// The protection state of a repository as read through GraphQL.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RepositoryProtectionState {
    /// Node ID of the repository, needed to create new rules
    pub repository_node_id: String,
    /// All rules currently defined on the repository
    pub rules: Vec<BranchProtectionRule>,
}

impl RepositoryProtectionState {
    /// Returns the rule with exactly the given pattern.
    pub fn rule_for_pattern(&self, pattern: &str) -> Option<&BranchProtectionRule> {
        self.rules.iter().find(|r| r.pattern == pattern)
    }
}
