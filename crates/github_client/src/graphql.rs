//! GraphQL documents and response handling for branch protection rules.
//!
//! Branch protection rules are keyed by pattern, which the REST API cannot express, so the
//! client reads and writes them through the GraphQL endpoint.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::{BranchProtectionRule, BranchProtectionSettings, Error, RepositoryProtectionState};

#[cfg(test)]
#[path = "graphql_tests.rs"]
mod tests;

pub(crate) const PROTECTION_STATE_QUERY: &str = r#"
query($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    id
    branchProtectionRules(first: 100) {
      nodes {
        id
        pattern
        requiresApprovingReviews
        requiredApprovingReviewCount
        requiresCommitSignatures
        isAdminEnforced
        dismissesStaleReviews
        requiresCodeOwnerReviews
        requiresStatusChecks
        requiresStrictStatusChecks
        requiredStatusCheckContexts
        restrictsReviewDismissals
        restrictsPushes
        reviewDismissalAllowances(first: 100) {
          nodes { actor { ... on Team { id } ... on User { id } ... on App { id } } }
        }
        pushAllowances(first: 100) {
          nodes { actor { ... on Team { id } ... on User { id } ... on App { id } } }
        }
      }
    }
  }
}
"#;

pub(crate) const CREATE_RULE_MUTATION: &str = r#"
mutation($input: CreateBranchProtectionRuleInput!) {
  createBranchProtectionRule(input: $input) {
    branchProtectionRule { id pattern }
  }
}
"#;

pub(crate) const UPDATE_RULE_MUTATION: &str = r#"
mutation($input: UpdateBranchProtectionRuleInput!) {
  updateBranchProtectionRule(input: $input) {
    branchProtectionRule { id pattern }
  }
}
"#;

pub(crate) const DELETE_RULE_MUTATION: &str = r#"
mutation($input: DeleteBranchProtectionRuleInput!) {
  deleteBranchProtectionRule(input: $input) {
    clientMutationId
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProtectionStateData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    id: String,
    branch_protection_rules: Connection<RuleNode>,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleNode {
    id: String,
    pattern: String,
    requires_approving_reviews: bool,
    required_approving_review_count: Option<u32>,
    requires_commit_signatures: bool,
    is_admin_enforced: bool,
    dismisses_stale_reviews: bool,
    requires_code_owner_reviews: bool,
    requires_status_checks: bool,
    requires_strict_status_checks: bool,
    required_status_check_contexts: Option<Vec<String>>,
    restricts_review_dismissals: bool,
    restricts_pushes: bool,
    review_dismissal_allowances: Connection<AllowanceNode>,
    push_allowances: Connection<AllowanceNode>,
}

#[derive(Debug, Deserialize)]
struct AllowanceNode {
    actor: Option<ActorNode>,
}

#[derive(Debug, Deserialize)]
struct ActorNode {
    id: Option<String>,
}

fn actor_ids(connection: Connection<AllowanceNode>) -> Vec<String> {
    connection
        .nodes
        .into_iter()
        .filter_map(|n| n.actor.and_then(|a| a.id))
        .collect()
}

impl From<RuleNode> for BranchProtectionRule {
    fn from(node: RuleNode) -> Self {
        Self {
            id: node.id,
            pattern: node.pattern,
            settings: BranchProtectionSettings {
                requires_approving_reviews: node.requires_approving_reviews,
                required_approving_review_count: node
                    .required_approving_review_count
                    .unwrap_or(0),
                requires_commit_signatures: node.requires_commit_signatures,
                is_admin_enforced: node.is_admin_enforced,
                dismisses_stale_reviews: node.dismisses_stale_reviews,
                requires_code_owner_reviews: node.requires_code_owner_reviews,
                requires_status_checks: node.requires_status_checks,
                requires_strict_status_checks: node.requires_strict_status_checks,
                required_status_check_contexts: node
                    .required_status_check_contexts
                    .unwrap_or_default(),
                restricts_review_dismissals: node.restricts_review_dismissals,
                review_dismissal_actor_ids: actor_ids(node.review_dismissal_allowances),
                restricts_pushes: node.restricts_pushes,
                push_actor_ids: actor_ids(node.push_allowances),
            },
        }
    }
}

/// Strips the GraphQL envelope, turning a populated `errors` array into [`Error::GraphQl`].
pub(crate) fn into_data(mut response: Value) -> Result<Value, Error> {
    if let Some(errors) = response.get("errors").filter(|e| !e.is_null()) {
        let errors: Vec<GraphQlError> = serde_json::from_value(errors.clone())?;
        if !errors.is_empty() {
            let message = errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::GraphQl(message));
        }
    }

    match response.get_mut("data") {
        Some(data) if !data.is_null() => Ok(data.take()),
        _ => Err(Error::InvalidResponse),
    }
}

/// Parses the response to [`PROTECTION_STATE_QUERY`].
pub(crate) fn parse_protection_state(response: Value) -> Result<RepositoryProtectionState, Error> {
    let data: ProtectionStateData = serde_json::from_value(into_data(response)?)?;
    let repository = data.repository.ok_or(Error::NotFound)?;

    Ok(RepositoryProtectionState {
        repository_node_id: repository.id,
        rules: repository
            .branch_protection_rules
            .nodes
            .into_iter()
            .map(BranchProtectionRule::from)
            .collect(),
    })
}

pub(crate) fn protection_state_request(owner: &str, name: &str) -> Value {
    json!({
        "query": PROTECTION_STATE_QUERY,
        "variables": { "owner": owner, "name": name },
    })
}

pub(crate) fn create_rule_request(
    repository_node_id: &str,
    pattern: &str,
    settings: &BranchProtectionSettings,
) -> Result<Value, Error> {
    let mut input = serde_json::to_value(settings)?;
    input["repositoryId"] = json!(repository_node_id);
    input["pattern"] = json!(pattern);

    Ok(json!({
        "query": CREATE_RULE_MUTATION,
        "variables": { "input": input },
    }))
}

pub(crate) fn update_rule_request(
    rule_id: &str,
    pattern: &str,
    settings: &BranchProtectionSettings,
) -> Result<Value, Error> {
    let mut input = serde_json::to_value(settings)?;
    input["branchProtectionRuleId"] = json!(rule_id);
    input["pattern"] = json!(pattern);

    Ok(json!({
        "query": UPDATE_RULE_MUTATION,
        "variables": { "input": input },
    }))
}

pub(crate) fn delete_rule_request(rule_id: &str) -> Value {
    json!({
        "query": DELETE_RULE_MUTATION,
        "variables": { "input": { "branchProtectionRuleId": rule_id } },
    })
}
