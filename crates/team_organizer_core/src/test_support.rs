//! In-memory [`OrganizationClient`] used by the reconciler tests.
//!
//! Writes change the in-memory state, so a second run sees the result of the first. Every
//! write is also recorded as a short string that tests assert on.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use github_client::models::BranchCommit;
use github_client::{
    Branch, BranchProtectionRule, BranchProtectionSettings, Error, FileMetadata,
    OrganizationClient, Organization, Repository as GhRepository, RepositoryPermission,
    RepositoryProtectionState, RepositorySettingsUpdate, RepositoryTeam, Team as GhTeam,
    TeamCreatePayload, TeamPrivacy, TeamRole, TeamUpdatePayload, User,
};

pub const ORG: &str = "acme";

pub fn slug_of(name: &str) -> String {
    name.to_ascii_lowercase().replace(['/', ' '], "-")
}

#[derive(Debug, Clone)]
pub struct FakeRepository {
    pub repository: GhRepository,
    pub teams: Vec<RepositoryTeam>,
    pub collaborators: Vec<User>,
    pub vulnerability_alerts: bool,
    pub automated_security_fixes: bool,
    pub branches: HashMap<String, String>,
    pub files: HashMap<String, u64>,
    pub rules: Vec<BranchProtectionRule>,
}

impl FakeRepository {
    /// A repository whose settings already match the fixed policy.
    pub fn new(name: &str) -> Self {
        let repository = GhRepository::new(
            name.to_string(),
            format!("{ORG}/{name}"),
            format!("R_{name}"),
            true,
        )
        .with_settings(true, false, false, "master");

        Self {
            repository,
            teams: Vec::new(),
            collaborators: Vec::new(),
            vulnerability_alerts: true,
            automated_security_fixes: true,
            branches: HashMap::from([("master".to_string(), "sha-master".to_string())]),
            files: HashMap::new(),
            rules: Vec::new(),
        }
    }

    /// A repository with every setting out of policy.
    pub fn unconfigured(name: &str) -> Self {
        let mut repo = Self::new(name);
        repo.repository = GhRepository::new(
            name.to_string(),
            format!("{ORG}/{name}"),
            format!("R_{name}"),
            true,
        )
        .with_settings(false, true, true, "master");
        repo.vulnerability_alerts = false;
        repo.automated_security_fixes = false;
        repo
    }

    pub fn with_team(mut self, name: &str, permission: RepositoryPermission) -> Self {
        self.teams.push(RepositoryTeam {
            id: self.teams.len() as u64 + 1000,
            slug: slug_of(name),
            name: name.to_string(),
            permission,
        });
        self
    }

    pub fn with_collaborator(mut self, login: &str) -> Self {
        self.collaborators.push(User {
            id: 9000 + self.collaborators.len() as u64,
            login: login.to_string(),
            node_id: None,
        });
        self
    }

    pub fn with_file(mut self, path: &str, size: u64) -> Self {
        self.files.insert(path.to_string(), size);
        self
    }

    pub fn without_branch(mut self, branch: &str) -> Self {
        self.branches.remove(branch);
        self
    }

    pub fn with_rule(
        mut self,
        id: &str,
        pattern: &str,
        settings: BranchProtectionSettings,
    ) -> Self {
        self.rules.push(BranchProtectionRule {
            id: id.to_string(),
            pattern: pattern.to_string(),
            settings,
        });
        self
    }
}

#[derive(Debug, Default)]
struct FakeState {
    teams: Vec<GhTeam>,
    members: HashMap<(String, TeamRole), Vec<User>>,
    users: HashMap<String, User>,
    repositories: Vec<FakeRepository>,
    next_id: u64,
    mutations: Vec<String>,
    failing: Vec<String>,
}

impl FakeState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn repo_mut(&mut self, name: &str) -> Result<&mut FakeRepository, Error> {
        self.repositories
            .iter_mut()
            .find(|r| r.repository.name().eq_ignore_ascii_case(name))
            .ok_or(Error::NotFound)
    }

    fn user(&mut self, login: &str) -> User {
        let key = login.to_ascii_lowercase();
        if let Some(user) = self.users.get(&key) {
            return user.clone();
        }
        let user = User {
            id: self.next_id(),
            login: login.to_string(),
            node_id: Some(format!("U_{login}")),
        };
        self.users.insert(key, user.clone());
        user
    }

    fn check(&self, operation: &str) -> Result<(), Error> {
        if self.failing.iter().any(|f| f == operation) {
            return Err(Error::ApiError(format!("injected failure in {operation}")));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FakeClient {
    state: Mutex<FakeState>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, login: &str) -> Self {
        self.state.lock().unwrap().user(login);
        self
    }

    pub fn with_team(self, name: &str, description: &str, privacy: TeamPrivacy) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = state.next_id();
            let slug = slug_of(name);
            state.teams.push(GhTeam {
                id,
                node_id: format!("T_{slug}"),
                slug,
                name: name.to_string(),
                description: Some(description.to_string()),
                privacy: Some(privacy),
            });
        }
        self
    }

    pub fn with_team_members(self, team: &str, role: TeamRole, logins: &[&str]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let users: Vec<User> = logins.iter().map(|l| state.user(l)).collect();
            state.members.insert((slug_of(team), role), users);
        }
        self
    }

    pub fn with_repository(self, repository: FakeRepository) -> Self {
        self.state.lock().unwrap().repositories.push(repository);
        self
    }

    /// Makes every call of the named trait method fail.
    pub fn failing_on(self, operation: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing
            .push(operation.to_string());
        self
    }

    pub fn mutations(&self) -> Vec<String> {
        self.state.lock().unwrap().mutations.clone()
    }

    pub fn clear_mutations(&self) {
        self.state.lock().unwrap().mutations.clear();
    }

    pub fn team(&self, name: &str) -> Option<GhTeam> {
        self.state
            .lock()
            .unwrap()
            .teams
            .iter()
            .find(|t| t.matches_name(name))
            .cloned()
    }

    pub fn team_members(&self, team: &str, role: TeamRole) -> Vec<String> {
        let mut logins: Vec<String> = self
            .state
            .lock()
            .unwrap()
            .members
            .get(&(slug_of(team), role))
            .map(|users| users.iter().map(|u| u.login.clone()).collect())
            .unwrap_or_default();
        logins.sort();
        logins
    }

    pub fn repository(&self, name: &str) -> FakeRepository {
        self.state
            .lock()
            .unwrap()
            .repo_mut(name)
            .expect("repository exists in fake")
            .clone()
    }
}

fn record(state: &mut FakeState, mutation: String) {
    state.mutations.push(mutation);
}

#[async_trait]
impl OrganizationClient for FakeClient {
    async fn get_organization(&self, org: &str) -> Result<Organization, Error> {
        let state = self.state.lock().unwrap();
        state.check("get_organization")?;
        Ok(Organization {
            id: 1,
            login: org.to_string(),
            name: None,
        })
    }

    async fn get_user(&self, login: &str) -> Result<User, Error> {
        let state = self.state.lock().unwrap();
        state.check("get_user")?;
        state
            .users
            .get(&login.to_ascii_lowercase())
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn list_teams(&self, _org: &str) -> Result<Vec<GhTeam>, Error> {
        let state = self.state.lock().unwrap();
        state.check("list_teams")?;
        Ok(state.teams.clone())
    }

    async fn create_team(&self, _org: &str, payload: &TeamCreatePayload) -> Result<GhTeam, Error> {
        let mut state = self.state.lock().unwrap();
        state.check("create_team")?;
        let id = state.next_id();
        let slug = slug_of(&payload.name);
        let team = GhTeam {
            id,
            node_id: format!("T_{slug}"),
            slug,
            name: payload.name.clone(),
            description: None,
            privacy: Some(payload.privacy),
        };
        state.teams.push(team.clone());
        record(&mut state, format!("create_team {}", payload.name));
        Ok(team)
    }

    async fn update_team(
        &self,
        _org: &str,
        team_slug: &str,
        payload: &TeamUpdatePayload,
    ) -> Result<GhTeam, Error> {
        let mut state = self.state.lock().unwrap();
        state.check("update_team")?;
        let team = state
            .teams
            .iter_mut()
            .find(|t| t.slug == team_slug)
            .ok_or(Error::NotFound)?;
        team.name = payload.name.clone();
        team.description = Some(payload.description.clone());
        team.privacy = Some(payload.privacy);
        let team = team.clone();
        record(&mut state, format!("update_team {team_slug}"));
        Ok(team)
    }

    async fn list_team_members(
        &self,
        _org: &str,
        team_slug: &str,
        role: TeamRole,
    ) -> Result<Vec<User>, Error> {
        let state = self.state.lock().unwrap();
        state.check("list_team_members")?;
        Ok(state
            .members
            .get(&(team_slug.to_string(), role))
            .cloned()
            .unwrap_or_default())
    }

    async fn add_team_membership(
        &self,
        _org: &str,
        team_slug: &str,
        login: &str,
        role: TeamRole,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.check("add_team_membership")?;
        let user = state.user(login);
        for existing in [TeamRole::Maintainer, TeamRole::Member] {
            if let Some(list) = state.members.get_mut(&(team_slug.to_string(), existing)) {
                list.retain(|u| !u.same_login(login));
            }
        }
        state
            .members
            .entry((team_slug.to_string(), role))
            .or_default()
            .push(user);
        record(
            &mut state,
            format!("add_team_membership {team_slug} {login} {role}"),
        );
        Ok(())
    }

    async fn remove_team_membership(
        &self,
        _org: &str,
        team_slug: &str,
        login: &str,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.check("remove_team_membership")?;
        for role in [TeamRole::Maintainer, TeamRole::Member] {
            if let Some(list) = state.members.get_mut(&(team_slug.to_string(), role)) {
                list.retain(|u| !u.same_login(login));
            }
        }
        record(
            &mut state,
            format!("remove_team_membership {team_slug} {login}"),
        );
        Ok(())
    }

    async fn list_organization_repositories(&self, _org: &str) -> Result<Vec<GhRepository>, Error> {
        let state = self.state.lock().unwrap();
        state.check("list_organization_repositories")?;
        Ok(state
            .repositories
            .iter()
            .map(|r| r.repository.clone())
            .collect())
    }

    async fn get_repository(&self, _owner: &str, repo: &str) -> Result<GhRepository, Error> {
        let mut state = self.state.lock().unwrap();
        state.check("get_repository")?;
        Ok(state.repo_mut(repo)?.repository.clone())
    }

    async fn update_repository_settings(
        &self,
        _owner: &str,
        repo: &str,
        settings: &RepositorySettingsUpdate,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.check("update_repository_settings")?;
        let fake = state.repo_mut(repo)?;
        let current = &fake.repository;
        let default_branch = settings
            .default_branch
            .clone()
            .or_else(|| current.default_branch().map(str::to_string))
            .unwrap_or_else(|| "master".to_string());
        fake.repository = GhRepository::new(
            current.name().to_string(),
            current.full_name().to_string(),
            current.node_id().to_string(),
            current.is_private(),
        )
        .with_settings(
            settings
                .allow_merge_commit
                .or(current.allow_merge_commit())
                .unwrap_or(true),
            settings
                .allow_squash_merge
                .or(current.allow_squash_merge())
                .unwrap_or(true),
            settings
                .allow_rebase_merge
                .or(current.allow_rebase_merge())
                .unwrap_or(true),
            &default_branch,
        );
        record(&mut state, format!("update_repository_settings {repo}"));
        Ok(())
    }

    async fn vulnerability_alerts_enabled(&self, _owner: &str, repo: &str) -> Result<bool, Error> {
        let mut state = self.state.lock().unwrap();
        state.check("vulnerability_alerts_enabled")?;
        Ok(state.repo_mut(repo)?.vulnerability_alerts)
    }

    async fn enable_vulnerability_alerts(&self, _owner: &str, repo: &str) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.check("enable_vulnerability_alerts")?;
        state.repo_mut(repo)?.vulnerability_alerts = true;
        record(&mut state, format!("enable_vulnerability_alerts {repo}"));
        Ok(())
    }

    async fn automated_security_fixes_enabled(
        &self,
        _owner: &str,
        repo: &str,
    ) -> Result<bool, Error> {
        let mut state = self.state.lock().unwrap();
        state.check("automated_security_fixes_enabled")?;
        Ok(state.repo_mut(repo)?.automated_security_fixes)
    }

    async fn enable_automated_security_fixes(
        &self,
        _owner: &str,
        repo: &str,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.check("enable_automated_security_fixes")?;
        state.repo_mut(repo)?.automated_security_fixes = true;
        record(&mut state, format!("enable_automated_security_fixes {repo}"));
        Ok(())
    }

    async fn list_repository_teams(
        &self,
        _owner: &str,
        repo: &str,
    ) -> Result<Vec<RepositoryTeam>, Error> {
        let mut state = self.state.lock().unwrap();
        state.check("list_repository_teams")?;
        Ok(state.repo_mut(repo)?.teams.clone())
    }

    async fn set_team_repository_permission(
        &self,
        _org: &str,
        team_slug: &str,
        _owner: &str,
        repo: &str,
        permission: RepositoryPermission,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.check("set_team_repository_permission")?;
        let team = state
            .teams
            .iter()
            .find(|t| t.slug == team_slug)
            .cloned()
            .ok_or(Error::NotFound)?;
        let fake = state.repo_mut(repo)?;
        fake.teams.retain(|t| t.slug != team_slug);
        fake.teams.push(RepositoryTeam {
            id: team.id,
            slug: team.slug,
            name: team.name,
            permission,
        });
        record(
            &mut state,
            format!("set_team_repository_permission {repo} {team_slug} {permission}"),
        );
        Ok(())
    }

    async fn remove_team_repository(
        &self,
        _org: &str,
        team_slug: &str,
        _owner: &str,
        repo: &str,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.check("remove_team_repository")?;
        state.repo_mut(repo)?.teams.retain(|t| t.slug != team_slug);
        record(&mut state, format!("remove_team_repository {repo} {team_slug}"));
        Ok(())
    }

    async fn list_direct_collaborators(
        &self,
        _owner: &str,
        repo: &str,
    ) -> Result<Vec<User>, Error> {
        let mut state = self.state.lock().unwrap();
        state.check("list_direct_collaborators")?;
        Ok(state.repo_mut(repo)?.collaborators.clone())
    }

    async fn remove_collaborator(
        &self,
        _owner: &str,
        repo: &str,
        login: &str,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.check("remove_collaborator")?;
        state
            .repo_mut(repo)?
            .collaborators
            .retain(|u| !u.same_login(login));
        record(&mut state, format!("remove_collaborator {repo} {login}"));
        Ok(())
    }

    async fn get_branch(&self, _owner: &str, repo: &str, branch: &str) -> Result<Branch, Error> {
        let mut state = self.state.lock().unwrap();
        state.check("get_branch")?;
        let sha = state
            .repo_mut(repo)?
            .branches
            .get(branch)
            .cloned()
            .ok_or(Error::NotFound)?;
        Ok(Branch {
            name: branch.to_string(),
            commit: BranchCommit { sha },
        })
    }

    async fn create_branch_ref(
        &self,
        _owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.check("create_branch_ref")?;
        state
            .repo_mut(repo)?
            .branches
            .insert(branch.to_string(), sha.to_string());
        record(&mut state, format!("create_branch_ref {repo} {branch} {sha}"));
        Ok(())
    }

    async fn get_file(&self, _owner: &str, repo: &str, path: &str) -> Result<FileMetadata, Error> {
        let mut state = self.state.lock().unwrap();
        state.check("get_file")?;
        let size = state
            .repo_mut(repo)?
            .files
            .get(path)
            .copied()
            .ok_or(Error::NotFound)?;
        Ok(FileMetadata {
            name: path.to_string(),
            path: path.to_string(),
            size,
        })
    }

    async fn get_branch_protection_state(
        &self,
        _owner: &str,
        repo: &str,
    ) -> Result<RepositoryProtectionState, Error> {
        let mut state = self.state.lock().unwrap();
        state.check("get_branch_protection_state")?;
        let fake = state.repo_mut(repo)?;
        Ok(RepositoryProtectionState {
            repository_node_id: fake.repository.node_id().to_string(),
            rules: fake.rules.clone(),
        })
    }

    async fn create_branch_protection_rule(
        &self,
        repository_node_id: &str,
        pattern: &str,
        settings: &BranchProtectionSettings,
    ) -> Result<String, Error> {
        let mut state = self.state.lock().unwrap();
        state.check("create_branch_protection_rule")?;
        let id = format!("BPR_{}", state.next_id());
        let fake = state
            .repositories
            .iter_mut()
            .find(|r| r.repository.node_id() == repository_node_id)
            .ok_or(Error::NotFound)?;
        fake.rules.push(BranchProtectionRule {
            id: id.clone(),
            pattern: pattern.to_string(),
            settings: settings.clone(),
        });
        let repo = fake.repository.name().to_string();
        record(
            &mut state,
            format!("create_branch_protection_rule {repo} {pattern}"),
        );
        Ok(id)
    }

    async fn update_branch_protection_rule(
        &self,
        rule_id: &str,
        pattern: &str,
        settings: &BranchProtectionSettings,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.check("update_branch_protection_rule")?;
        let rule = state
            .repositories
            .iter_mut()
            .flat_map(|r| r.rules.iter_mut())
            .find(|r| r.id == rule_id)
            .ok_or(Error::NotFound)?;
        rule.pattern = pattern.to_string();
        rule.settings = settings.clone();
        record(
            &mut state,
            format!("update_branch_protection_rule {rule_id} {pattern}"),
        );
        Ok(())
    }

    async fn delete_branch_protection_rule(&self, rule_id: &str) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.check("delete_branch_protection_rule")?;
        for repo in state.repositories.iter_mut() {
            repo.rules.retain(|r| r.id != rule_id);
        }
        record(&mut state, format!("delete_branch_protection_rule {rule_id}"));
        Ok(())
    }
}
