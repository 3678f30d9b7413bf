//! Branch protection specifications.
//!
//! A [`ProtectionSpec`] is the fully merged protection for one branch pattern. It is built
//! from three layers, each overwriting the keys it sets:
//!
//! 1. the built-in template ([`ProtectionSpec::template`]),
//! 2. the organization-wide defaults from configuration,
//! 3. the per-pattern override of a repository.
//!
//! Actors are team names at this stage. They are resolved to node IDs only when the spec is
//! turned into [`BranchProtectionSettings`] for the provider.

use github_client::BranchProtectionSettings;
use glob::Pattern;
use serde::Deserialize;

use crate::errors::{OrganizerError, OrganizerResult};

#[cfg(test)]
#[path = "protection_tests.rs"]
mod tests;

/// Status check contexts required when a repository builds with Jenkins.
pub const JENKINS_STATUS_CONTEXTS: [&str; 2] = [
    "continuous-integration/jenkins/branch",
    "continuous-integration/jenkins/pr-merge",
];

/// A partial set of protection fields. Unset fields inherit from the layer below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtectionOverride {
    pub requires_approving_reviews: Option<bool>,
    pub required_approving_review_count: Option<u32>,
    pub requires_commit_signatures: Option<bool>,
    pub is_admin_enforced: Option<bool>,
    pub dismisses_stale_reviews: Option<bool>,
    pub requires_code_owner_reviews: Option<bool>,
    pub requires_status_checks: Option<bool>,
    pub requires_strict_status_checks: Option<bool>,
    pub required_status_check_contexts: Option<Vec<String>>,
    pub restricts_review_dismissals: Option<bool>,
    /// Names of teams allowed to dismiss reviews
    pub review_dismissal_teams: Option<Vec<String>>,
    pub restricts_pushes: Option<bool>,
    /// Names of teams allowed to push
    pub push_teams: Option<Vec<String>>,
}

impl ProtectionOverride {
    /// Layers `other` on top of `self`. Keys set in `other` win.
    pub fn overlay(&self, other: &ProtectionOverride) -> ProtectionOverride {
        ProtectionOverride {
            requires_approving_reviews: other
                .requires_approving_reviews
                .or(self.requires_approving_reviews),
            required_approving_review_count: other
                .required_approving_review_count
                .or(self.required_approving_review_count),
            requires_commit_signatures: other
                .requires_commit_signatures
                .or(self.requires_commit_signatures),
            is_admin_enforced: other.is_admin_enforced.or(self.is_admin_enforced),
            dismisses_stale_reviews: other
                .dismisses_stale_reviews
                .or(self.dismisses_stale_reviews),
            requires_code_owner_reviews: other
                .requires_code_owner_reviews
                .or(self.requires_code_owner_reviews),
            requires_status_checks: other.requires_status_checks.or(self.requires_status_checks),
            requires_strict_status_checks: other
                .requires_strict_status_checks
                .or(self.requires_strict_status_checks),
            required_status_check_contexts: other
                .required_status_check_contexts
                .clone()
                .or_else(|| self.required_status_check_contexts.clone()),
            restricts_review_dismissals: other
                .restricts_review_dismissals
                .or(self.restricts_review_dismissals),
            review_dismissal_teams: other
                .review_dismissal_teams
                .clone()
                .or_else(|| self.review_dismissal_teams.clone()),
            restricts_pushes: other.restricts_pushes.or(self.restricts_pushes),
            push_teams: other
                .push_teams
                .clone()
                .or_else(|| self.push_teams.clone()),
        }
    }

    /// Team names referenced by this override.
    pub fn referenced_teams(&self) -> impl Iterator<Item = &str> {
        self.review_dismissal_teams
            .iter()
            .chain(self.push_teams.iter())
            .flatten()
            .map(String::as_str)
    }
}

/// The merged protection for one pattern, with actors given as team names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionSpec {
    pub requires_approving_reviews: bool,
    pub required_approving_review_count: u32,
    pub requires_commit_signatures: bool,
    pub is_admin_enforced: bool,
    pub dismisses_stale_reviews: bool,
    pub requires_code_owner_reviews: bool,
    pub requires_status_checks: bool,
    pub requires_strict_status_checks: bool,
    pub required_status_check_contexts: Vec<String>,
    pub restricts_review_dismissals: bool,
    pub review_dismissal_teams: Vec<String>,
    pub restricts_pushes: bool,
    pub push_teams: Vec<String>,
}

impl ProtectionSpec {
    /// The built-in template. Master teams may dismiss reviews and push.
    pub fn template(master_teams: &[String]) -> Self {
        Self {
            requires_approving_reviews: true,
            required_approving_review_count: 1,
            requires_commit_signatures: false,
            is_admin_enforced: false,
            dismisses_stale_reviews: true,
            requires_code_owner_reviews: false,
            requires_status_checks: true,
            requires_strict_status_checks: true,
            required_status_check_contexts: Vec::new(),
            restricts_review_dismissals: false,
            review_dismissal_teams: master_teams.to_vec(),
            restricts_pushes: true,
            push_teams: master_teams.to_vec(),
        }
    }

    /// Merges the template, the organization defaults and a per-pattern override.
    pub fn merged(
        master_teams: &[String],
        defaults: &ProtectionOverride,
        pattern_override: &ProtectionOverride,
    ) -> Self {
        let mut spec = Self::template(master_teams);
        spec.apply(&defaults.overlay(pattern_override));
        spec
    }

    fn apply(&mut self, o: &ProtectionOverride) {
        if let Some(v) = o.requires_approving_reviews {
            self.requires_approving_reviews = v;
        }
        if let Some(v) = o.required_approving_review_count {
            self.required_approving_review_count = v;
        }
        if let Some(v) = o.requires_commit_signatures {
            self.requires_commit_signatures = v;
        }
        if let Some(v) = o.is_admin_enforced {
            self.is_admin_enforced = v;
        }
        if let Some(v) = o.dismisses_stale_reviews {
            self.dismisses_stale_reviews = v;
        }
        if let Some(v) = o.requires_code_owner_reviews {
            self.requires_code_owner_reviews = v;
        }
        if let Some(v) = o.requires_status_checks {
            self.requires_status_checks = v;
        }
        if let Some(v) = o.requires_strict_status_checks {
            self.requires_strict_status_checks = v;
        }
        if let Some(v) = &o.required_status_check_contexts {
            self.required_status_check_contexts = v.clone();
        }
        if let Some(v) = o.restricts_review_dismissals {
            self.restricts_review_dismissals = v;
        }
        if let Some(v) = &o.review_dismissal_teams {
            self.review_dismissal_teams = v.clone();
        }
        if let Some(v) = o.restricts_pushes {
            self.restricts_pushes = v;
        }
        if let Some(v) = &o.push_teams {
            self.push_teams = v.clone();
        }
    }

    /// Appends `teams` to the push actors, keeping the existing order and skipping
    /// duplicates.
    pub fn append_push_teams<'a>(&mut self, teams: impl IntoIterator<Item = &'a String>) {
        for team in teams {
            if !self.push_teams.iter().any(|t| t.eq_ignore_ascii_case(team)) {
                self.push_teams.push(team.clone());
            }
        }
    }

    /// Appends status check contexts, skipping ones already required.
    pub fn append_status_contexts<'a>(&mut self, contexts: impl IntoIterator<Item = &'a str>) {
        for context in contexts {
            if !self.required_status_check_contexts.iter().any(|c| c == context) {
                self.required_status_check_contexts.push(context.to_string());
            }
        }
    }

    /// Converts the spec into provider settings, resolving team names to node IDs.
    ///
    /// # Errors
    /// Returns `OrganizerError::NotFound` when a referenced team has no known node ID.
    pub fn to_settings<F>(&self, node_id_of: F) -> OrganizerResult<BranchProtectionSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolve = |teams: &[String]| -> OrganizerResult<Vec<String>> {
            let mut ids: Vec<String> = Vec::with_capacity(teams.len());
            for team in teams {
                let id = node_id_of(team)
                    .ok_or_else(|| OrganizerError::not_found(format!("Team '{team}'")))?;
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            Ok(ids)
        };

        Ok(BranchProtectionSettings {
            requires_approving_reviews: self.requires_approving_reviews,
            required_approving_review_count: self.required_approving_review_count,
            requires_commit_signatures: self.requires_commit_signatures,
            is_admin_enforced: self.is_admin_enforced,
            dismisses_stale_reviews: self.dismisses_stale_reviews,
            requires_code_owner_reviews: self.requires_code_owner_reviews,
            requires_status_checks: self.requires_status_checks,
            requires_strict_status_checks: self.requires_strict_status_checks,
            required_status_check_contexts: self.required_status_check_contexts.clone(),
            restricts_review_dismissals: self.restricts_review_dismissals,
            review_dismissal_actor_ids: resolve(&self.review_dismissal_teams)?,
            restricts_pushes: self.restricts_pushes,
            push_actor_ids: resolve(&self.push_teams)?,
        })
    }
}

/// Shell-style match of a branch name against a protection pattern.
///
/// A pattern that is not a valid glob only matches itself.
pub fn pattern_matches(pattern: &str, branch: &str) -> bool {
    match Pattern::new(pattern) {
        Ok(p) => p.matches(branch),
        Err(_) => pattern == branch,
    }
}
