//! GitHub provider (listing only).
//!
//! GitHub has no nested namespaces, so a group lookup lists the repositories
//! of the organization named by the first path segment.

use crate::catalog::{PageQuery, PageSource, ProjectPage, RemoteProject};
use crate::provider::ProviderError;
use async_trait::async_trait;
use octocrab::models::Repository;
use octocrab::{Octocrab, Page};
use tracing::debug;

/// Repositories requested per page (GitHub's maximum).
const PER_PAGE: u8 = 100;

/// GitHub API client.
#[derive(Debug, Clone)]
pub struct GitHub {
    octocrab: Octocrab,
}

impl GitHub {
    /// Creates a client authenticated with a personal access token.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the client cannot be built.
    pub fn new(token: &str) -> Result<Self, ProviderError> {
        let octocrab = Octocrab::builder()
            .personal_token(token.to_string())
            .build()?;
        Ok(Self { octocrab })
    }
}

/// Page number in the width the GitHub listing endpoints accept.
fn api_page(page: u32) -> Result<u8, ProviderError> {
    u8::try_from(page).map_err(|_| ProviderError::PageOutOfRange { page })
}

/// Converts a GitHub repository into a listing entry.
///
/// Repositories without a full name or clone URL cannot be synced and are dropped.
fn to_remote_project(repo: Repository) -> Option<RemoteProject> {
    let full_path = repo.full_name?;
    let url = repo.clone_url?.to_string();
    Some(RemoteProject {
        id: Some(repo.id.0),
        name: repo.name,
        full_path,
        url,
        archived: repo.archived,
    })
}

fn to_project_page(page: Page<Repository>, current: u32) -> ProjectPage {
    let total_pages = page.number_of_pages();
    let next_page = page.next.as_ref().map(|_| current + 1);
    ProjectPage {
        projects: page
            .items
            .into_iter()
            .filter_map(to_remote_project)
            .collect(),
        total_pages,
        next_page,
    }
}

#[async_trait]
impl PageSource for GitHub {
    async fn fetch_page(&self, page: u32, query: &PageQuery) -> Result<ProjectPage, ProviderError> {
        let org = query
            .namespace
            .as_deref()
            .map(|ns| ns.split('/').next().unwrap_or(ns));

        let wire_page = api_page(page)?;
        debug!(page, org = org.unwrap_or("*"), "Listing GitHub repositories");
        let listed = match org {
            Some(org) => {
                self.octocrab
                    .orgs(org)
                    .list_repos()
                    .per_page(PER_PAGE)
                    .page(wire_page)
                    .send()
                    .await?
            }
            None => {
                self.octocrab
                    .current()
                    .list_repos_for_authenticated_user()
                    .per_page(PER_PAGE)
                    .page(wire_page)
                    .send()
                    .await?
            }
        };

        Ok(to_project_page(listed, page))
    }
}
