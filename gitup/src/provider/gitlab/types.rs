//! GitLab API data types.

use crate::catalog::RemoteProject;
use crate::provider::ProviderError;
use crate::repo::Repo;
use serde::{Deserialize, Serialize};

/// GitLab project - fields we need from the API response.
///
/// The `simple=true` listing omits `archived`, so it stays optional.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabProject {
    /// Project ID.
    pub id: u64,
    /// Project name.
    pub name: String,
    /// Full path including namespace (e.g., "group/subgroup/project").
    pub path_with_namespace: String,
    /// HTTP clone URL.
    pub http_url_to_repo: String,
    /// Whether the project is archived.
    #[serde(default)]
    pub archived: Option<bool>,
}

impl From<GitLabProject> for RemoteProject {
    fn from(project: GitLabProject) -> Self {
        Self {
            id: Some(project.id),
            name: project.name,
            full_path: project.path_with_namespace,
            url: project.http_url_to_repo,
            archived: project.archived,
        }
    }
}

impl TryFrom<GitLabProject> for Repo {
    type Error = ProviderError;

    fn try_from(project: GitLabProject) -> Result<Self, Self::Error> {
        let path = project.path_with_namespace.clone();
        RemoteProject::from(project)
            .into_repo()
            .ok_or(ProviderError::InvalidProject { path })
    }
}

/// Body of `POST /projects/:id/fork`.
#[derive(Debug, Serialize)]
pub(super) struct ForkRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_path: Option<&'a str>,
}

/// Body of `PUT /projects/:id`.
#[derive(Debug, Serialize)]
pub(super) struct RenameRequest<'a> {
    pub name: &'a str,
    pub path: &'a str,
}

/// Body of `PUT /projects/:id/transfer`.
#[derive(Debug, Serialize)]
pub(super) struct TransferRequest<'a> {
    pub namespace: &'a str,
}

/// Body of `PATCH /projects/:id/job_token_scope`.
#[derive(Debug, Serialize)]
pub(super) struct JobTokenScopeRequest {
    pub enabled: bool,
}
