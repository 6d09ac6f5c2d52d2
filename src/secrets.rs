//! Encrypted secrets for Actions and Dependabot. Both scopes share shapes and
//! paths, differing only in the `actions`/`dependabot` segment.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::http::{encode_path_segment as seg, Response};
use crate::pagination::ListOptions;
use crate::repos::Repository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretScope {
    Actions,
    Dependabot,
}

impl SecretScope {
    fn segment(self) -> &'static str {
        match self {
            SecretScope::Actions => "actions",
            SecretScope::Dependabot => "dependabot",
        }
    }
}

/// Key used to seal secret values before upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    /// GitHub returns this as a string for repositories and as a number for
    /// some organization endpoints.
    #[serde(deserialize_with = "string_or_number")]
    pub key_id: String,
    pub key: String,
}

fn string_or_number<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<String, D::Error> {
    struct KeyId;

    impl Visitor<'_> for KeyId {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or integer key id")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }
    }

    de.deserialize_any(KeyId)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `all`, `private` or `selected`; organization secrets only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_repositories_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secrets {
    pub total_count: i64,
    pub secrets: Vec<Secret>,
}

/// A value already sealed with the scope's [`PublicKey`]. `name` only goes
/// into the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EncryptedSecret {
    #[serde(skip)]
    pub name: String,
    pub key_id: String,
    /// Base64 of the sealed box.
    pub encrypted_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_repository_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedReposList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<i64>,
    pub repositories: Vec<Repository>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectedRepoIds {
    pub selected_repository_ids: Vec<i64>,
}

pub struct SecretsService<'a> {
    client: &'a Client,
    scope: SecretScope,
}

impl<'a> SecretsService<'a> {
    pub(crate) fn new(client: &'a Client, scope: SecretScope) -> Self {
        Self { client, scope }
    }

    pub fn scope(&self) -> SecretScope {
        self.scope
    }

    fn repo_base(&self, owner: &str, repo: &str) -> String {
        format!("repos/{}/{}/{}/secrets", seg(owner), seg(repo), self.scope.segment())
    }

    fn org_base(&self, org: &str) -> String {
        format!("orgs/{}/{}/secrets", seg(org), self.scope.segment())
    }

    fn env_base(&self, repo_id: i64, env: &str) -> Result<String> {
        if self.scope != SecretScope::Actions {
            return Err(Error::Unsupported(format!(
                "environment secrets are only available for actions, not {}",
                self.scope.segment()
            )));
        }
        Ok(format!("repositories/{}/environments/{}/secrets", repo_id, seg(env)))
    }

    pub async fn get_repo_public_key(&self, owner: &str, repo: &str) -> Result<Response<PublicKey>> {
        let path = format!("{}/public-key", self.repo_base(owner, repo));
        self.client.get(&path).await
    }

    pub async fn get_org_public_key(&self, org: &str) -> Result<Response<PublicKey>> {
        let path = format!("{}/public-key", self.org_base(org));
        self.client.get(&path).await
    }

    pub async fn get_env_public_key(&self, repo_id: i64, env: &str) -> Result<Response<PublicKey>> {
        let path = format!("{}/public-key", self.env_base(repo_id, env)?);
        self.client.get(&path).await
    }

    /// Names of the repository's own secrets; values are never returned.
    pub async fn list_repo_secrets(
        &self,
        owner: &str,
        repo: &str,
        opts: &ListOptions,
    ) -> Result<Response<Secrets>> {
        self.client.get_with(&self.repo_base(owner, repo), opts).await
    }

    /// Organization secrets shared with this repository.
    pub async fn list_repo_org_secrets(
        &self,
        owner: &str,
        repo: &str,
        opts: &ListOptions,
    ) -> Result<Response<Secrets>> {
        let path = format!(
            "repos/{}/{}/{}/organization-secrets",
            seg(owner),
            seg(repo),
            self.scope.segment()
        );
        self.client.get_with(&path, opts).await
    }

    pub async fn list_org_secrets(&self, org: &str, opts: &ListOptions) -> Result<Response<Secrets>> {
        self.client.get_with(&self.org_base(org), opts).await
    }

    pub async fn list_env_secrets(
        &self,
        repo_id: i64,
        env: &str,
        opts: &ListOptions,
    ) -> Result<Response<Secrets>> {
        let path = self.env_base(repo_id, env)?;
        self.client.get_with(&path, opts).await
    }

    pub async fn get_repo_secret(&self, owner: &str, repo: &str, name: &str) -> Result<Response<Secret>> {
        let path = format!("{}/{}", self.repo_base(owner, repo), seg(name));
        self.client.get(&path).await
    }

    pub async fn get_org_secret(&self, org: &str, name: &str) -> Result<Response<Secret>> {
        let path = format!("{}/{}", self.org_base(org), seg(name));
        self.client.get(&path).await
    }

    pub async fn get_env_secret(&self, repo_id: i64, env: &str, name: &str) -> Result<Response<Secret>> {
        let path = format!("{}/{}", self.env_base(repo_id, env)?, seg(name));
        self.client.get(&path).await
    }

    /// Answers 201 when created and 204 when replaced.
    pub async fn create_or_update_repo_secret(
        &self,
        owner: &str,
        repo: &str,
        secret: &EncryptedSecret,
    ) -> Result<Response<()>> {
        let path = format!("{}/{}", self.repo_base(owner, repo), seg(&secret.name));
        self.client.put_discard(&path, secret).await
    }

    pub async fn create_or_update_org_secret(
        &self,
        org: &str,
        secret: &EncryptedSecret,
    ) -> Result<Response<()>> {
        let path = format!("{}/{}", self.org_base(org), seg(&secret.name));
        self.client.put_discard(&path, secret).await
    }

    pub async fn create_or_update_env_secret(
        &self,
        repo_id: i64,
        env: &str,
        secret: &EncryptedSecret,
    ) -> Result<Response<()>> {
        let path = format!("{}/{}", self.env_base(repo_id, env)?, seg(&secret.name));
        self.client.put_discard(&path, secret).await
    }

    pub async fn delete_repo_secret(&self, owner: &str, repo: &str, name: &str) -> Result<Response<()>> {
        let path = format!("{}/{}", self.repo_base(owner, repo), seg(name));
        self.client.delete(&path).await
    }

    pub async fn delete_org_secret(&self, org: &str, name: &str) -> Result<Response<()>> {
        let path = format!("{}/{}", self.org_base(org), seg(name));
        self.client.delete(&path).await
    }

    pub async fn delete_env_secret(&self, repo_id: i64, env: &str, name: &str) -> Result<Response<()>> {
        let path = format!("{}/{}", self.env_base(repo_id, env)?, seg(name));
        self.client.delete(&path).await
    }

    /// Repositories that can see an organization secret with `selected` visibility.
    pub async fn list_selected_repos_for_org_secret(
        &self,
        org: &str,
        name: &str,
        opts: &ListOptions,
    ) -> Result<Response<SelectedReposList>> {
        let path = format!("{}/{}/repositories", self.org_base(org), seg(name));
        self.client.get_with(&path, opts).await
    }

    pub async fn set_selected_repos_for_org_secret(
        &self,
        org: &str,
        name: &str,
        ids: &SelectedRepoIds,
    ) -> Result<Response<()>> {
        let path = format!("{}/{}/repositories", self.org_base(org), seg(name));
        self.client.put_discard(&path, ids).await
    }

    pub async fn add_selected_repo_to_org_secret(
        &self,
        org: &str,
        name: &str,
        repo_id: i64,
    ) -> Result<Response<()>> {
        let path = format!("{}/{}/repositories/{}", self.org_base(org), seg(name), repo_id);
        self.client.put_empty(&path).await
    }

    pub async fn remove_selected_repo_from_org_secret(
        &self,
        org: &str,
        name: &str,
        repo_id: i64,
    ) -> Result<Response<()>> {
        let path = format!("{}/{}/repositories/{}", self.org_base(org), seg(name), repo_id);
        self.client.delete(&path).await
    }
}
