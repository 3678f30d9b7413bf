use super::*;
use crate::context::RunMode;
use crate::test_support::{FakeClient, FakeRepository, ORG};
use github_client::{BranchProtectionSettings, RepositoryPermission, TeamPrivacy};
use std::sync::Arc;
use tracing_test::traced_test;

fn client_with_teams(names: &[&str]) -> FakeClient {
    names.iter().fold(FakeClient::new(), |client, name| {
        client.with_team(name, "", TeamPrivacy::Closed)
    })
}

async fn directory_for(client: &Arc<FakeClient>, repository: &Repository) -> TeamDirectory {
    let names = repository.referenced_teams();
    let mut directory = TeamDirectory::new();
    directory
        .load_referenced(client.as_ref(), ORG, names.iter().map(String::as_str))
        .await
        .unwrap();
    directory
}

async fn reconcile(
    client: &Arc<FakeClient>,
    mode: RunMode,
    repository: &Repository,
) -> (OrganizerResult<()>, ReconcileStats) {
    let ctx = ReconcileContext::new(client.clone(), ORG, mode);
    let directory = directory_for(client, repository).await;
    let defaults = ProtectionOverride::default();
    let mut stats = ReconcileStats::new();
    let result = RepositoryReconciler::new(&ctx, &directory, &defaults)
        .run(repository, &mut stats)
        .await;
    (result, stats)
}

#[tokio::test]
async fn test_direct_collaborator_dry_run_then_apply() {
    let client = Arc::new(
        FakeClient::new().with_repository(FakeRepository::new("svc").with_collaborator("dave")),
    );
    let repository = Repository::new("svc").unwrap();

    let (result, stats) = reconcile(&client, RunMode::DryRun, &repository).await;
    result.unwrap();
    assert!(client.mutations().is_empty());
    assert_eq!(stats.mutations, 1);

    let (result, _) = reconcile(&client, RunMode::Apply, &repository).await;
    result.unwrap();
    assert_eq!(
        client.mutations(),
        vec!["remove_collaborator svc dave".to_string()]
    );
    assert!(client.repository("svc").collaborators.is_empty());
}

#[tokio::test]
async fn test_role_precedence_grants_strongest_role_only() {
    let client = Arc::new(
        client_with_teams(&["ops", "core", "docs"]).with_repository(FakeRepository::new("svc")),
    );
    let repository = Repository::new("svc")
        .unwrap()
        .with_admin_teams(["ops".to_string()])
        .with_master_teams(["ops".to_string(), "core".to_string()])
        .with_pull_teams(["core".to_string(), "docs".to_string()]);

    let (result, _) = reconcile(&client, RunMode::Apply, &repository).await;
    result.unwrap();

    assert_eq!(
        client.mutations(),
        vec![
            "set_team_repository_permission svc ops admin".to_string(),
            "set_team_repository_permission svc core push".to_string(),
            "set_team_repository_permission svc docs pull".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_unlisted_team_removed_before_additions() {
    let client = Arc::new(
        client_with_teams(&["legacy", "core"]).with_repository(
            FakeRepository::new("svc")
                .with_team("legacy", RepositoryPermission::Push)
                .with_team("core", RepositoryPermission::Pull),
        ),
    );
    let repository = Repository::new("svc")
        .unwrap()
        .with_push_teams(["core".to_string()]);

    let (result, _) = reconcile(&client, RunMode::Apply, &repository).await;
    result.unwrap();

    // core is upgraded by the push sync, so the pull sync finds nothing to remove
    assert_eq!(
        client.mutations(),
        vec![
            "remove_team_repository svc legacy".to_string(),
            "set_team_repository_permission svc core push".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_unknown_team_fails_in_apply_mode() {
    let client = Arc::new(FakeClient::new().with_repository(FakeRepository::new("svc")));
    let repository = Repository::new("svc")
        .unwrap()
        .with_push_teams(["ghost".to_string()]);

    let (result, stats) = reconcile(&client, RunMode::DryRun, &repository).await;
    result.unwrap();
    assert_eq!(stats.mutations, 1);

    let (result, _) = reconcile(&client, RunMode::Apply, &repository).await;
    assert!(matches!(result, Err(OrganizerError::NotFound { .. })));
}

#[tokio::test]
async fn test_settings_written_only_on_difference() {
    let client = Arc::new(FakeClient::new().with_repository(FakeRepository::unconfigured("svc")));
    let repository = Repository::new("svc")
        .unwrap()
        .with_default_branch("develop");

    let (result, stats) = reconcile(&client, RunMode::Apply, &repository).await;
    result.unwrap();
    assert_eq!(
        client.mutations(),
        vec![
            "update_repository_settings svc".to_string(),
            "enable_vulnerability_alerts svc".to_string(),
            "enable_automated_security_fixes svc".to_string(),
        ]
    );
    assert_eq!(stats.mutations, 3);

    let live = client.repository("svc").repository;
    assert_eq!(live.allow_merge_commit(), Some(true));
    assert_eq!(live.allow_squash_merge(), Some(false));
    assert_eq!(live.allow_rebase_merge(), Some(false));
    assert_eq!(live.default_branch(), Some("develop"));

    client.clear_mutations();
    let (result, stats) = reconcile(&client, RunMode::Apply, &repository).await;
    result.unwrap();
    assert!(client.mutations().is_empty());
    assert!(!stats.has_changes());
}

#[tokio::test]
async fn test_precreated_branch_and_rule_created_once() {
    let client = Arc::new(
        client_with_teams(&["core"])
            .with_repository(FakeRepository::new("svc").without_branch("develop")),
    );
    let repository = Repository::new("svc")
        .unwrap()
        .with_master_teams(["core".to_string()])
        .with_precreated_branches(["develop".to_string()])
        .with_protection("develop", ProtectionOverride::default());

    let (result, _) = reconcile(&client, RunMode::Apply, &repository).await;
    result.unwrap();
    assert_eq!(
        client.mutations(),
        vec![
            "set_team_repository_permission svc core push".to_string(),
            "create_branch_ref svc develop sha-master".to_string(),
            "create_branch_protection_rule svc develop".to_string(),
        ]
    );

    client.clear_mutations();
    let (result, stats) = reconcile(&client, RunMode::Apply, &repository).await;
    result.unwrap();
    assert!(client.mutations().is_empty());
    assert_eq!(stats.mutations, 0);
}

#[tokio::test]
async fn test_master_pattern_push_actors_include_master_and_admin_teams() {
    let client = Arc::new(
        client_with_teams(&["core", "ops", "release"]).with_repository(FakeRepository::new("svc")),
    );
    let repository = Repository::new("svc")
        .unwrap()
        .with_admin_teams(["ops".to_string()])
        .with_master_teams(["core".to_string()])
        .with_protection(
            "master",
            ProtectionOverride {
                push_teams: Some(vec!["release".to_string()]),
                ..Default::default()
            },
        )
        .with_protection("develop", ProtectionOverride::default());

    let (result, _) = reconcile(&client, RunMode::Apply, &repository).await;
    result.unwrap();

    let rules = client.repository("svc").rules;
    let master = rules.iter().find(|r| r.pattern == "master").unwrap();
    assert_eq!(
        master.settings.push_actor_ids,
        vec!["T_release", "T_core", "T_ops"]
    );
    assert_eq!(master.settings.review_dismissal_actor_ids, vec!["T_core"]);

    let develop = rules.iter().find(|r| r.pattern == "develop").unwrap();
    assert_eq!(develop.settings.push_actor_ids, vec!["T_core"]);
}

#[tokio::test]
async fn test_glob_pattern_matching_custom_master_branch_is_augmented() {
    let client = Arc::new(
        client_with_teams(&["core", "ops"]).with_repository(FakeRepository::new("svc")),
    );
    let repository = Repository::new("svc")
        .unwrap()
        .with_admin_teams(["ops".to_string()])
        .with_master_branch("release/2.x")
        .with_protection(
            "release/*",
            ProtectionOverride {
                push_teams: Some(vec!["core".to_string()]),
                ..Default::default()
            },
        );

    let (result, _) = reconcile(&client, RunMode::Apply, &repository).await;
    result.unwrap();

    let rules = client.repository("svc").rules;
    assert_eq!(rules[0].settings.push_actor_ids, vec!["T_core", "T_ops"]);
}

#[tokio::test]
async fn test_jenkins_contexts_appended_when_jenkinsfile_present() {
    let client = Arc::new(
        FakeClient::new().with_repository(FakeRepository::new("svc").with_file("Jenkinsfile", 120)),
    );
    let repository = Repository::new("svc")
        .unwrap()
        .with_auto_cicd_mode(AutoCicdMode::Jenkins)
        .with_protection(
            "master",
            ProtectionOverride {
                required_status_check_contexts: Some(vec!["lint".to_string()]),
                ..Default::default()
            },
        );

    let (result, _) = reconcile(&client, RunMode::Apply, &repository).await;
    result.unwrap();

    let rules = client.repository("svc").rules;
    assert_eq!(
        rules[0].settings.required_status_check_contexts,
        vec![
            "lint".to_string(),
            "continuous-integration/jenkins/branch".to_string(),
            "continuous-integration/jenkins/pr-merge".to_string(),
        ]
    );
}

#[traced_test]
#[tokio::test]
async fn test_empty_jenkinsfile_adds_no_contexts() {
    let client = Arc::new(
        FakeClient::new().with_repository(FakeRepository::new("svc").with_file("Jenkinsfile", 0)),
    );
    let ctx = ReconcileContext::new(client.clone(), ORG, RunMode::Apply)
        .with_default_cicd_mode(AutoCicdMode::Jenkins);
    let repository = Repository::new("svc")
        .unwrap()
        .with_protection("master", ProtectionOverride::default());
    let directory = TeamDirectory::new();
    let defaults = ProtectionOverride::default();

    RepositoryReconciler::new(&ctx, &directory, &defaults)
        .run(&repository, &mut ReconcileStats::new())
        .await
        .unwrap();

    let rules = client.repository("svc").rules;
    assert!(rules[0].settings.required_status_check_contexts.is_empty());
    assert!(logs_contain("Jenkinsfile is empty"));
}

#[tokio::test]
async fn test_missing_master_branch_stops_protection() {
    let client = Arc::new(
        FakeClient::new().with_repository(
            FakeRepository::new("svc")
                .without_branch("master")
                .with_collaborator("dave"),
        ),
    );
    let repository = Repository::new("svc")
        .unwrap()
        .with_precreated_branches(["develop".to_string()])
        .with_protection("develop", ProtectionOverride::default());

    let (result, _) = reconcile(&client, RunMode::Apply, &repository).await;

    assert!(matches!(
        result,
        Err(OrganizerError::MasterBranchMissing { ref repository }) if repository == "svc"
    ));
    // earlier steps were applied, protection was not
    assert_eq!(
        client.mutations(),
        vec!["remove_collaborator svc dave".to_string()]
    );
    assert!(client.repository("svc").rules.is_empty());
}

#[tokio::test]
async fn test_changed_rule_updated_and_leftover_rule_deleted() {
    let client = Arc::new(
        FakeClient::new().with_repository(
            FakeRepository::new("svc")
                .with_rule("BPR_dev", "develop", BranchProtectionSettings::default())
                .with_rule("BPR_old", "hotfix/*", BranchProtectionSettings::default()),
        ),
    );
    let repository = Repository::new("svc")
        .unwrap()
        .with_protection("develop", ProtectionOverride::default());

    let (result, _) = reconcile(&client, RunMode::Apply, &repository).await;
    result.unwrap();

    assert_eq!(
        client.mutations(),
        vec![
            "update_branch_protection_rule BPR_dev develop".to_string(),
            "delete_branch_protection_rule BPR_old".to_string(),
        ]
    );
    let rules = client.repository("svc").rules;
    assert_eq!(rules.len(), 1);
    assert!(rules[0].settings.requires_approving_reviews);
}

#[traced_test]
#[tokio::test]
async fn test_dry_run_reports_without_writing() {
    let client = Arc::new(
        client_with_teams(&["legacy", "core"]).with_repository(
            FakeRepository::unconfigured("svc")
                .with_collaborator("dave")
                .with_team("legacy", RepositoryPermission::Admin)
                .without_branch("develop"),
        ),
    );
    let repository = Repository::new("svc")
        .unwrap()
        .with_push_teams(["core".to_string()])
        .with_precreated_branches(["develop".to_string()])
        .with_protection("develop", ProtectionOverride::default());

    let (result, stats) = reconcile(&client, RunMode::DryRun, &repository).await;
    result.unwrap();

    assert!(client.mutations().is_empty());
    // settings, two security features, dave, legacy, core
    assert_eq!(stats.mutations, 6);
    assert!(logs_contain("Direct collaborator"));
    assert!(logs_contain("Dry run, branch protection is not evaluated"));
}
