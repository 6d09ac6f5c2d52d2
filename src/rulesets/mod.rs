//! Repository and organization rulesets.

mod rules;

pub use rules::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::Result;
use crate::http::{encode_path_segment as seg, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RulesetTarget {
    Branch,
    Tag,
    Push,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforcement {
    Disabled,
    Active,
    Evaluate,
}

/// Who may bypass a ruleset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BypassActor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<i64>,
    /// `RepositoryRole`, `Team`, `Integration`, `OrganizationAdmin` or `DeployKey`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_type: Option<String>,
    /// `always` or `pull_request`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypass_mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesetLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesetLinks {
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<RulesetLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<RulesetLink>,
}

/// Ref names the ruleset applies to. `~DEFAULT_BRANCH` and `~ALL` are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefNameCondition {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryNameCondition {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryIdCondition {
    pub repository_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryPropertyTarget {
    pub name: String,
    pub property_values: Vec<String>,
    /// `custom` or `system`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryPropertyCondition {
    #[serde(default)]
    pub include: Vec<RepositoryPropertyTarget>,
    #[serde(default)]
    pub exclude: Vec<RepositoryPropertyTarget>,
}

/// Organization rulesets pick repositories by name, id or property; every
/// ruleset may narrow by ref name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesetConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_name: Option<RefNameCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_name: Option<RepositoryNameCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<RepositoryIdCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_property: Option<RepositoryPropertyCondition>,
}

/// A ruleset, both as sent on create/update and as returned.
///
/// Server-assigned fields (`id`, `source`, `node_id`, `_links`, timestamps)
/// are skipped when unset, so a freshly built value serializes as a valid
/// create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruleset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<RulesetTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub enforcement: Enforcement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypass_actors: Option<Vec<BypassActor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user_can_bypass: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(rename = "_links", default, skip_serializing_if = "Option::is_none")]
    pub links: Option<RulesetLinks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<RulesetConditions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<RepositoryRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Ruleset {
    pub fn new(name: impl Into<String>, enforcement: Enforcement) -> Self {
        Self {
            id: None,
            name: name.into(),
            target: None,
            source_type: None,
            source: None,
            enforcement,
            bypass_actors: None,
            current_user_can_bypass: None,
            node_id: None,
            links: None,
            conditions: None,
            rules: None,
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Serialize)]
struct IncludesParents {
    includes_parents: bool,
}

pub struct RulesetsService<'a> {
    client: &'a Client,
}

impl<'a> RulesetsService<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Every active rule that applies to a branch, whichever ruleset it came from.
    pub async fn get_rules_for_branch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Response<Vec<RepositoryRule>>> {
        let path = format!(
            "repos/{}/{}/rules/branches/{}",
            seg(owner),
            seg(repo),
            seg(branch)
        );
        self.client.get(&path).await
    }

    /// Rulesets of a repository; `include_parents` adds those inherited from the org.
    pub async fn get_all_rulesets(
        &self,
        owner: &str,
        repo: &str,
        include_parents: bool,
    ) -> Result<Response<Vec<Ruleset>>> {
        let path = format!("repos/{}/{}/rulesets", seg(owner), seg(repo));
        self.client
            .get_with(
                &path,
                &IncludesParents {
                    includes_parents: include_parents,
                },
            )
            .await
    }

    pub async fn create_ruleset(
        &self,
        owner: &str,
        repo: &str,
        ruleset: &Ruleset,
    ) -> Result<Response<Ruleset>> {
        let path = format!("repos/{}/{}/rulesets", seg(owner), seg(repo));
        self.client.post(&path, ruleset).await
    }

    pub async fn get_ruleset(
        &self,
        owner: &str,
        repo: &str,
        ruleset_id: i64,
        include_parents: bool,
    ) -> Result<Response<Ruleset>> {
        let path = format!("repos/{}/{}/rulesets/{}", seg(owner), seg(repo), ruleset_id);
        self.client
            .get_with(
                &path,
                &IncludesParents {
                    includes_parents: include_parents,
                },
            )
            .await
    }

    /// Replace a ruleset. `bypass_actors: None` leaves the existing actors alone.
    pub async fn update_ruleset(
        &self,
        owner: &str,
        repo: &str,
        ruleset_id: i64,
        ruleset: &Ruleset,
    ) -> Result<Response<Ruleset>> {
        let path = format!("repos/{}/{}/rulesets/{}", seg(owner), seg(repo), ruleset_id);
        self.client.put(&path, ruleset).await
    }

    /// Like [`update_ruleset`](Self::update_ruleset) but always sends
    /// `bypass_actors: []`, removing every bypass actor.
    pub async fn update_ruleset_clear_bypass_actors(
        &self,
        owner: &str,
        repo: &str,
        ruleset_id: i64,
        ruleset: &Ruleset,
    ) -> Result<Response<Ruleset>> {
        let mut cleared = ruleset.clone();
        cleared.bypass_actors = Some(Vec::new());
        self.update_ruleset(owner, repo, ruleset_id, &cleared).await
    }

    pub async fn delete_ruleset(
        &self,
        owner: &str,
        repo: &str,
        ruleset_id: i64,
    ) -> Result<Response<()>> {
        let path = format!("repos/{}/{}/rulesets/{}", seg(owner), seg(repo), ruleset_id);
        self.client.delete(&path).await
    }

    pub async fn get_all_organization_rulesets(&self, org: &str) -> Result<Response<Vec<Ruleset>>> {
        self.client.get(&format!("orgs/{}/rulesets", seg(org))).await
    }

    pub async fn create_organization_ruleset(
        &self,
        org: &str,
        ruleset: &Ruleset,
    ) -> Result<Response<Ruleset>> {
        self.client
            .post(&format!("orgs/{}/rulesets", seg(org)), ruleset)
            .await
    }

    pub async fn get_organization_ruleset(
        &self,
        org: &str,
        ruleset_id: i64,
    ) -> Result<Response<Ruleset>> {
        self.client
            .get(&format!("orgs/{}/rulesets/{}", seg(org), ruleset_id))
            .await
    }

    pub async fn update_organization_ruleset(
        &self,
        org: &str,
        ruleset_id: i64,
        ruleset: &Ruleset,
    ) -> Result<Response<Ruleset>> {
        self.client
            .put(&format!("orgs/{}/rulesets/{}", seg(org), ruleset_id), ruleset)
            .await
    }

    pub async fn delete_organization_ruleset(
        &self,
        org: &str,
        ruleset_id: i64,
    ) -> Result<Response<()>> {
        self.client
            .delete(&format!("orgs/{}/rulesets/{}", seg(org), ruleset_id))
            .await
    }
}
