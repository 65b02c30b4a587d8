//! GitLab REST v4 provider.
//!
//! Lists projects page by page (reporting `X-Total-Pages` so the fetcher can
//! fan out) and implements the fork, rename, transfer and unlink operations.

mod types;

pub use types::GitLabProject;

use self::types::{ForkRequest, JobTokenScopeRequest, RenameRequest, TransferRequest};
use crate::catalog::{PageQuery, PageSource, ProjectPage, RemoteProject};
use crate::provider::{ForkApi, ProviderError};
use crate::repo::Repo;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, info};
use url::Url;

/// Projects requested per page (GitLab's maximum).
const PER_PAGE: u32 = 100;

/// Header carrying the personal access token.
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// GitLab API client.
#[derive(Clone)]
pub struct GitLab {
    client: Client,
    api: Url,
    token: String,
}

impl std::fmt::Debug for GitLab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLab").field("api", &self.api.as_str()).finish()
    }
}

impl GitLab {
    /// Creates a client for `host`.
    ///
    /// `host` may be a bare hostname ("gitlab.com") or a URL with scheme.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the host does not form a valid URL or the
    /// HTTP client cannot be built.
    pub fn new(host: &str, token: &str) -> Result<Self, ProviderError> {
        let api = api_url(host)?;
        let client = Client::builder()
            .user_agent(concat!("gitup/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api,
            token: token.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        Ok(self.api.join(path)?)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(TOKEN_HEADER, &self.token)
    }

    async fn project_call(&self, request: RequestBuilder) -> Result<Repo, ProviderError> {
        let response = send(self.authorized(request)).await?;
        let project: GitLabProject = response.json().await?;
        Repo::try_from(project)
    }

    /// Disables CI job-token access on a freshly forked project.
    async fn disable_job_token_access(&self, id: u64) -> Result<(), ProviderError> {
        let url = self.endpoint(&format!("projects/{id}/job_token_scope"))?;
        let response = send(
            self.authorized(self.client.patch(url))
                .json(&JobTokenScopeRequest { enabled: false }),
        )
        .await?;
        info!(
            project = id,
            status = response.status().as_u16(),
            "Disabled job token access"
        );
        Ok(())
    }
}

/// Builds the `/api/v4/` base URL for a host.
fn api_url(host: &str) -> Result<Url, ProviderError> {
    let host = host.trim_end_matches('/');
    let base = if host.contains("://") {
        format!("{host}/api/v4/")
    } else {
        format!("https://{host}/api/v4/")
    };
    Ok(Url::parse(&base)?)
}

/// Reads `X-Total-Pages` and `X-Next-Page` from a listing response.
///
/// GitLab leaves `X-Total-Pages` out for very large result sets and sends an
/// empty `X-Next-Page` on the last page.
fn page_info(headers: &HeaderMap) -> (Option<u32>, Option<u32>) {
    let number = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok())
    };
    (number("x-total-pages"), number("x-next-page"))
}

/// Sends a request and maps non-success statuses to [`ProviderError::Api`].
async fn send(request: RequestBuilder) -> Result<Response, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        status: status.as_u16(),
        message,
    })
}

fn require_id(repo: &Repo) -> Result<u64, ProviderError> {
    repo.id.ok_or_else(|| ProviderError::MissingId {
        path: repo.full_path.clone(),
    })
}

#[async_trait]
impl PageSource for GitLab {
    async fn fetch_page(&self, page: u32, query: &PageQuery) -> Result<ProjectPage, ProviderError> {
        let mut url = self.endpoint("projects")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("page", &page.to_string())
                .append_pair("per_page", &PER_PAGE.to_string())
                .append_pair("simple", "true");
            if query.exclude_archived {
                pairs.append_pair("archived", "false");
            }
            if let Some(namespace) = &query.namespace {
                pairs
                    .append_pair("search_namespaces", "true")
                    .append_pair("search", namespace);
            }
        }

        debug!(page, "Listing GitLab projects");
        let response = send(self.authorized(self.client.get(url))).await?;
        let (total_pages, next_page) = page_info(response.headers());
        let projects: Vec<GitLabProject> = response.json().await?;

        Ok(ProjectPage {
            projects: projects.into_iter().map(RemoteProject::from).collect(),
            total_pages,
            next_page,
        })
    }
}

#[async_trait]
impl ForkApi for GitLab {
    async fn fork(&self, repo: &Repo, namespace: Option<&str>) -> Result<Repo, ProviderError> {
        let id = require_id(repo)?;
        let url = self.endpoint(&format!("projects/{id}/fork"))?;
        let forked = self
            .project_call(self.client.post(url).json(&ForkRequest {
                namespace_path: namespace,
            }))
            .await?;
        info!(source = id, project = ?forked.id, "Fork finished");

        if let Some(forked_id) = forked.id {
            self.disable_job_token_access(forked_id).await?;
        }
        Ok(forked)
    }

    async fn rename(&self, repo: &Repo, name: &str) -> Result<Repo, ProviderError> {
        let id = require_id(repo)?;
        let url = self.endpoint(&format!("projects/{id}"))?;
        let renamed = self
            .project_call(self.client.put(url).json(&RenameRequest { name, path: name }))
            .await?;
        info!(project = id, path = %renamed.full_path, "Rename finished");
        Ok(renamed)
    }

    async fn transfer(&self, repo: &Repo, namespace: &str) -> Result<Repo, ProviderError> {
        let id = require_id(repo)?;
        let url = self.endpoint(&format!("projects/{id}/transfer"))?;
        let moved = self
            .project_call(self.client.put(url).json(&TransferRequest { namespace }))
            .await?;
        info!(project = id, path = %moved.full_path, "Transfer finished");
        Ok(moved)
    }

    async fn delete_fork_relation(&self, repo: &Repo) -> Result<(), ProviderError> {
        let id = require_id(repo)?;
        let url = self.endpoint(&format!("projects/{id}/fork"))?;
        let response = send(self.authorized(self.client.delete(url))).await?;
        info!(
            project = id,
            status = response.status().as_u16(),
            "Deleted fork relationship"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn builds_api_url_from_bare_host() {
        let url = api_url("gitlab.example.com").unwrap();
        assert_eq!(url.as_str(), "https://gitlab.example.com/api/v4/");
    }

    #[test]
    fn keeps_explicit_scheme() {
        let url = api_url("http://localhost:8080/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/v4/");
        assert_eq!(
            url.join("projects/12/fork").unwrap().as_str(),
            "http://localhost:8080/api/v4/projects/12/fork"
        );
    }

    #[test]
    fn reads_pagination_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-total-pages", HeaderValue::from_static("7"));
        headers.insert("x-next-page", HeaderValue::from_static("2"));
        assert_eq!(page_info(&headers), (Some(7), Some(2)));

        let mut last = HeaderMap::new();
        last.insert("x-next-page", HeaderValue::from_static(""));
        assert_eq!(page_info(&last), (None, None));
    }

    #[test]
    fn write_operations_need_an_id() {
        let repo = Repo::new(None, "https://x/a/b.git", "b", "a/b").unwrap();
        assert!(matches!(
            require_id(&repo),
            Err(ProviderError::MissingId { .. })
        ));
    }
}
