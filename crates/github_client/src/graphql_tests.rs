use super::*;

fn rule_node(id: &str, pattern: &str) -> Value {
    json!({
        "id": id,
        "pattern": pattern,
        "requiresApprovingReviews": true,
        "requiredApprovingReviewCount": 1,
        "requiresCommitSignatures": false,
        "isAdminEnforced": false,
        "dismissesStaleReviews": true,
        "requiresCodeOwnerReviews": false,
        "requiresStatusChecks": true,
        "requiresStrictStatusChecks": true,
        "requiredStatusCheckContexts": ["continuous-integration/jenkins/branch"],
        "restrictsReviewDismissals": false,
        "restrictsPushes": true,
        "reviewDismissalAllowances": { "nodes": [] },
        "pushAllowances": {
            "nodes": [
                { "actor": { "id": "T_masters" } },
                { "actor": null },
                { "actor": {} }
            ]
        }
    })
}

#[test]
fn test_parse_protection_state() {
    let response = json!({
        "data": {
            "repository": {
                "id": "R_svc",
                "branchProtectionRules": {
                    "nodes": [rule_node("BPR_1", "master"), rule_node("BPR_2", "develop")]
                }
            }
        }
    });

    let state = parse_protection_state(response).expect("Failed to parse protection state");

    assert_eq!(state.repository_node_id, "R_svc");
    assert_eq!(state.rules.len(), 2);

    let master = state.rule_for_pattern("master").expect("master rule");
    assert_eq!(master.id, "BPR_1");
    assert_eq!(master.settings.required_approving_review_count, 1);
    assert_eq!(master.settings.push_actor_ids, vec!["T_masters".to_string()]);
    assert_eq!(
        master.settings.required_status_check_contexts,
        vec!["continuous-integration/jenkins/branch".to_string()]
    );
}

#[test]
fn test_parse_protection_state_null_review_count() {
    let mut node = rule_node("BPR_1", "master");
    node["requiredApprovingReviewCount"] = Value::Null;
    node["requiredStatusCheckContexts"] = Value::Null;
    let response = json!({
        "data": { "repository": { "id": "R_svc", "branchProtectionRules": { "nodes": [node] } } }
    });

    let state = parse_protection_state(response).expect("Failed to parse protection state");

    assert_eq!(state.rules[0].settings.required_approving_review_count, 0);
    assert!(state.rules[0].settings.required_status_check_contexts.is_empty());
}

#[test]
fn test_parse_protection_state_missing_repository_is_not_found() {
    let response = json!({ "data": { "repository": null } });

    let result = parse_protection_state(response);

    assert!(matches!(result, Err(Error::NotFound)));
}

#[test]
fn test_into_data_reports_graphql_errors() {
    let response = json!({
        "data": null,
        "errors": [
            { "message": "Could not resolve to a Repository" },
            { "message": "Something else" }
        ]
    });

    match into_data(response) {
        Err(Error::GraphQl(message)) => {
            assert_eq!(message, "Could not resolve to a Repository; Something else");
        }
        other => panic!("Expected GraphQl error, got {other:?}"),
    }
}

#[test]
fn test_into_data_without_data_is_invalid() {
    let result = into_data(json!({}));
    assert!(matches!(result, Err(Error::InvalidResponse)));
}

#[test]
fn test_create_rule_request_embeds_repository_and_pattern() {
    let settings = BranchProtectionSettings {
        required_approving_review_count: 1,
        ..Default::default()
    };

    let request = create_rule_request("R_svc", "develop", &settings).unwrap();

    let input = &request["variables"]["input"];
    assert_eq!(input["repositoryId"], "R_svc");
    assert_eq!(input["pattern"], "develop");
    assert_eq!(input["requiredApprovingReviewCount"], 1);
    assert!(request["query"]
        .as_str()
        .unwrap()
        .contains("createBranchProtectionRule"));
}

#[test]
fn test_update_and_delete_requests_use_rule_id() {
    let settings = BranchProtectionSettings::default();

    let update = update_rule_request("BPR_1", "master", &settings).unwrap();
    assert_eq!(update["variables"]["input"]["branchProtectionRuleId"], "BPR_1");
    assert!(update["variables"]["input"].get("repositoryId").is_none());

    let delete = delete_rule_request("BPR_9");
    assert_eq!(delete["variables"]["input"]["branchProtectionRuleId"], "BPR_9");
}
