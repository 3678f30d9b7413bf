use super::*;

fn sample_settings() -> BranchProtectionSettings {
    BranchProtectionSettings {
        requires_approving_reviews: true,
        required_approving_review_count: 1,
        dismisses_stale_reviews: true,
        requires_status_checks: true,
        requires_strict_status_checks: true,
        required_status_check_contexts: vec!["ci/a".to_string(), "ci/b".to_string()],
        restricts_pushes: true,
        push_actor_ids: vec!["T_1".to_string(), "T_2".to_string()],
        ..Default::default()
    }
}

#[test]
fn test_branch_protection_settings_serialize_as_mutation_input() {
    let value = serde_json::to_value(sample_settings()).expect("Failed to serialize settings");

    assert_eq!(value["requiresApprovingReviews"], true);
    assert_eq!(value["requiredApprovingReviewCount"], 1);
    assert_eq!(value["isAdminEnforced"], false);
    assert_eq!(value["pushActorIds"][1], "T_2");
    assert_eq!(value["requiredStatusCheckContexts"][0], "ci/a");
    assert!(value.get("requires_approving_reviews").is_none());
}

#[test]
fn test_equivalence_ignores_list_order() {
    let left = sample_settings();
    let mut right = sample_settings();
    right.push_actor_ids.reverse();
    right.required_status_check_contexts.reverse();

    assert!(left.is_equivalent(&right));
    assert_ne!(left, right);
}

#[test]
fn test_equivalence_ignores_duplicate_actors() {
    let left = sample_settings();
    let mut right = sample_settings();
    right.push_actor_ids.push("T_1".to_string());

    assert!(left.is_equivalent(&right));
}

#[test]
fn test_equivalence_detects_changed_field() {
    let left = sample_settings();
    let mut right = sample_settings();
    right.required_approving_review_count = 2;

    assert!(!left.is_equivalent(&right));
}

#[test]
fn test_equivalence_detects_missing_actor() {
    let left = sample_settings();
    let mut right = sample_settings();
    right.push_actor_ids.pop();

    assert!(!left.is_equivalent(&right));
}

#[test]
fn test_rule_for_pattern_is_exact() {
    let state = RepositoryProtectionState {
        repository_node_id: "R_1".to_string(),
        rules: vec![BranchProtectionRule {
            id: "BPR_1".to_string(),
            pattern: "release/*".to_string(),
            settings: sample_settings(),
        }],
    };

    assert_eq!(
        state.rule_for_pattern("release/*").map(|r| r.id.as_str()),
        Some("BPR_1")
    );
    assert!(state.rule_for_pattern("release/1.0").is_none());
}
