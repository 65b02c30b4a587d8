//! Paginated catalog fetching.
//!
//! Page 1 is requested first. If the provider reports a total page count,
//! every remaining page is requested concurrently; if it only reports a next
//! page, a single walker follows the links. Pages are fanned in over a channel
//! and merged by one aggregation loop, bounded by a wall-clock deadline.

use super::{Catalog, CatalogError};
use crate::provider::{ProviderError, RepoList};
use crate::repo::Repo;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Default budget for a whole catalog fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// A project as listed by the provider, before aggregation.
#[derive(Debug, Clone)]
pub struct RemoteProject {
    /// Provider-assigned identifier, if any.
    pub id: Option<u64>,
    /// Display name.
    pub name: String,
    /// Namespace path plus name.
    pub full_path: String,
    /// Clone URL.
    pub url: String,
    /// Archive flag, when the listing includes it.
    pub archived: Option<bool>,
}

impl RemoteProject {
    pub(crate) fn into_repo(self) -> Option<Repo> {
        Repo::new(self.id, self.url, &self.name, self.full_path)
    }
}

/// One page of a project listing.
#[derive(Debug, Clone, Default)]
pub struct ProjectPage {
    /// Projects on this page.
    pub projects: Vec<RemoteProject>,
    /// Total number of pages, when the provider reports it.
    pub total_pages: Option<u32>,
    /// Number of the following page, `None` on the last page.
    pub next_page: Option<u32>,
}

/// Listing filters passed down to the provider.
#[derive(Debug, Clone, Default)]
pub struct PageQuery {
    /// Restrict the listing to namespaces matching this path.
    pub namespace: Option<String>,
    /// Ask the provider to leave archived projects out.
    pub exclude_archived: bool,
}

/// A provider that can list projects one page at a time.
#[async_trait]
pub trait PageSource: Send + Sync + 'static {
    /// Fetches page `page` (1-based) of the project listing.
    async fn fetch_page(&self, page: u32, query: &PageQuery) -> Result<ProjectPage, ProviderError>;
}

type PageResult = (u32, Result<ProjectPage, ProviderError>);

/// Builds a fresh [`Catalog`] from a [`PageSource`] on every call.
pub struct CatalogFetcher<S> {
    source: Arc<S>,
    filter_archived: bool,
    timeout: Duration,
}

impl<S: PageSource> CatalogFetcher<S> {
    /// Creates a fetcher with the default one minute budget.
    pub fn new(source: S, filter_archived: bool) -> Self {
        Self {
            source: Arc::new(source),
            filter_archived,
            timeout: FETCH_TIMEOUT,
        }
    }

    /// Overrides the wall-clock budget of a fetch.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The underlying provider.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetches every project visible to the caller.
    ///
    /// Listing failures are logged and yield an empty, incomplete catalog.
    pub async fn fetch_all(&self) -> Catalog {
        match self.fetch(PageQuery::default()).await {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!(error = %e, "Failed to list projects");
                let mut catalog = Catalog::new();
                catalog.mark_incomplete();
                catalog
            }
        }
    }

    /// Fetches the projects of namespaces matching `group`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the first page cannot be fetched.
    pub async fn fetch_by_group(&self, group: &str) -> Result<Catalog, ProviderError> {
        self.fetch(PageQuery {
            namespace: Some(group.to_string()),
            ..PageQuery::default()
        })
        .await
    }

    async fn fetch(&self, mut query: PageQuery) -> Result<Catalog, ProviderError> {
        query.exclude_archived = self.filter_archived;
        let span = info_span!(
            "fetch_catalog",
            namespace = query.namespace.as_deref().unwrap_or("*")
        );

        async {
            let deadline = Instant::now() + self.timeout;
            let first = tokio::time::timeout_at(deadline, self.source.fetch_page(1, &query))
                .await
                .map_err(|_| ProviderError::Timeout {
                    secs: self.timeout.as_secs(),
                })??;

            let (tx, rx) = mpsc::unbounded_channel();
            let mut requests = JoinSet::new();
            match (first.total_pages, first.next_page) {
                (Some(total), _) => {
                    debug!(total, "Fetching remaining pages concurrently");
                    for page in 2..=total {
                        let source = Arc::clone(&self.source);
                        let query = query.clone();
                        let tx = tx.clone();
                        requests.spawn(async move {
                            let result = source.fetch_page(page, &query).await;
                            let _ = tx.send((page, result));
                        });
                    }
                }
                (None, Some(next)) => {
                    debug!(next, "Following next-page links");
                    let source = Arc::clone(&self.source);
                    let query = query.clone();
                    let tx = tx.clone();
                    requests.spawn(walk_pages(source, next, query, tx));
                }
                (None, None) => {}
            }
            drop(tx);

            let done = CancellationToken::new();
            let supervisor = {
                let done = done.clone();
                tokio::spawn(async move {
                    while requests.join_next().await.is_some() {}
                    done.cancel();
                })
            };

            info!("Waiting for project pages");
            let mut catalog = Catalog::new();
            let pages = collect_pages(rx, &done, deadline, &mut catalog).await;
            supervisor.abort();

            catalog.merge_page(first.projects, self.filter_archived);
            for (_, page) in pages {
                catalog.merge_page(page.projects, self.filter_archived);
            }

            info!(
                groups = catalog.group_names().count(),
                projects = catalog.len(),
                complete = catalog.is_complete(),
                "Catalog fetched"
            );
            Ok(catalog)
        }
        .instrument(span)
        .await
    }
}

/// Follows next-page links one request at a time.
async fn walk_pages<S: PageSource>(
    source: Arc<S>,
    mut page: u32,
    query: PageQuery,
    tx: mpsc::UnboundedSender<PageResult>,
) {
    loop {
        let result = source.fetch_page(page, &query).await;
        let next = match &result {
            Ok(p) => p.next_page,
            Err(_) => None,
        };
        if tx.send((page, result)).is_err() {
            return;
        }
        match next {
            Some(n) if n > page => page = n,
            _ => return,
        }
    }
}

/// Drains delivered pages until every request finished or the deadline fires.
///
/// Pages are keyed by number so the merge follows provider page order no
/// matter which request returned first.
async fn collect_pages(
    mut rx: mpsc::UnboundedReceiver<PageResult>,
    done: &CancellationToken,
    deadline: Instant,
    catalog: &mut Catalog,
) -> BTreeMap<u32, ProjectPage> {
    let mut pages = BTreeMap::new();
    let timer = tokio::time::sleep_until(deadline);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            biased;
            Some((number, result)) = rx.recv() => accept(&mut pages, number, result, catalog),
            _ = done.cancelled() => break,
            _ = &mut timer => {
                warn!(
                    merged = pages.len() + 1,
                    "Catalog fetch deadline reached, catalog is partial"
                );
                catalog.mark_incomplete();
                break;
            }
        }
    }

    // A page can land between the receive poll and the cancellation.
    while let Ok((number, result)) = rx.try_recv() {
        accept(&mut pages, number, result, catalog);
    }

    pages
}

fn accept(
    pages: &mut BTreeMap<u32, ProjectPage>,
    number: u32,
    result: Result<ProjectPage, ProviderError>,
    catalog: &mut Catalog,
) {
    match result {
        Ok(page) => {
            debug!(page = number, projects = page.projects.len(), "Page fetched");
            pages.insert(number, page);
        }
        Err(e) => {
            warn!(page = number, error = %e, "Failed to fetch page");
            catalog.mark_incomplete();
        }
    }
}

#[async_trait]
impl<S: PageSource> RepoList for CatalogFetcher<S> {
    async fn projects(&self) -> Vec<Repo> {
        self.fetch_all().await.into_repos()
    }

    async fn projects_by_group(&self, group: &str) -> Result<Vec<Repo>, CatalogError> {
        let catalog = self.fetch_by_group(group).await?;
        let repos = catalog.projects_by_group(group)?;
        Ok(repos.into_iter().cloned().collect())
    }

    async fn project(&self, group: &str, name: &str) -> Result<Repo, CatalogError> {
        let catalog = self.fetch_by_group(group).await?;
        catalog.project(group, name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn project(full_path: &str, archived: bool) -> RemoteProject {
        RemoteProject {
            id: Some(1),
            name: full_path.rsplit('/').next().unwrap_or_default().to_string(),
            full_path: full_path.to_string(),
            url: format!("https://git.example.com/{full_path}.git"),
            archived: Some(archived),
        }
    }

    /// Serves `pages` in either total-count or next-link mode.
    struct FakePages {
        pages: Vec<Vec<RemoteProject>>,
        report_total: bool,
        delay: Option<(u32, Duration)>,
        fail: Option<u32>,
        requests: AtomicUsize,
    }

    impl FakePages {
        fn new(pages: Vec<Vec<RemoteProject>>, report_total: bool) -> Self {
            Self {
                pages,
                report_total,
                delay: None,
                fail: None,
                requests: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageSource for FakePages {
        async fn fetch_page(
            &self,
            page: u32,
            _query: &PageQuery,
        ) -> Result<ProjectPage, ProviderError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if let Some((slow, delay)) = self.delay {
                if slow == page {
                    tokio::time::sleep(delay).await;
                }
            }
            if self.fail == Some(page) {
                return Err(ProviderError::Api {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            let total = self.pages.len() as u32;
            Ok(ProjectPage {
                projects: self.pages[(page - 1) as usize].clone(),
                total_pages: self.report_total.then_some(total),
                next_page: (page < total).then_some(page + 1),
            })
        }
    }

    fn three_pages() -> Vec<Vec<RemoteProject>> {
        vec![
            vec![project("a/one", false), project("b/two", false)],
            vec![project("a/three", false), project("a/old", true)],
            vec![project("c/sub/four", false)],
        ]
    }

    #[tokio::test]
    async fn aggregates_all_pages_with_total_count() {
        let fetcher = CatalogFetcher::new(FakePages::new(three_pages(), true), false);

        let catalog = fetcher.fetch_all().await;

        assert!(catalog.is_complete());
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.group("a").unwrap().len(), 3);
        assert_eq!(catalog.group("c").unwrap()[0].full_path, "c/sub/four");
        assert_eq!(fetcher.source().requests.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn aggregates_all_pages_following_next_links() {
        let fetcher = CatalogFetcher::new(FakePages::new(three_pages(), false), true);

        let catalog = fetcher.fetch_all().await;

        assert!(catalog.is_complete());
        assert_eq!(catalog.len(), 4);
        let a: Vec<_> = catalog
            .group("a")
            .unwrap()
            .iter()
            .map(|r| r.full_path.as_str())
            .collect();
        assert_eq!(a, ["a/one", "a/three"]);
    }

    #[tokio::test]
    async fn merges_in_page_order_regardless_of_arrival() {
        let mut source = FakePages::new(three_pages(), true);
        source.delay = Some((2, Duration::from_millis(50)));
        let fetcher = CatalogFetcher::new(source, false);

        let catalog = fetcher.fetch_all().await;

        let a: Vec<_> = catalog
            .group("a")
            .unwrap()
            .iter()
            .map(|r| r.full_path.as_str())
            .collect();
        assert_eq!(a, ["a/one", "a/three", "a/old"]);
    }

    #[tokio::test]
    async fn deadline_yields_partial_catalog() {
        let mut source = FakePages::new(three_pages(), true);
        source.delay = Some((3, Duration::from_secs(5)));
        let fetcher =
            CatalogFetcher::new(source, false).with_timeout(Duration::from_millis(200));

        let catalog = fetcher.fetch_all().await;

        assert!(!catalog.is_complete());
        assert!(catalog.group("c").is_none());
        assert_eq!(catalog.group("a").unwrap().len(), 3);
    }

    #[tokio::test]
    async fn failed_page_is_skipped_and_flagged() {
        let mut source = FakePages::new(three_pages(), true);
        source.fail = Some(2);
        let fetcher = CatalogFetcher::new(source, false);

        let catalog = fetcher.fetch_all().await;

        assert!(!catalog.is_complete());
        assert_eq!(catalog.len(), 3);
    }

    #[tokio::test]
    async fn first_page_failure_surfaces_for_group_fetch() {
        let mut source = FakePages::new(three_pages(), true);
        source.fail = Some(1);
        let fetcher = CatalogFetcher::new(source, false);

        assert!(fetcher.fetch_by_group("a").await.is_err());
        assert!(fetcher.fetch_all().await.is_empty());
    }

    #[tokio::test]
    async fn repo_list_resolves_project() {
        let fetcher = CatalogFetcher::new(FakePages::new(three_pages(), true), false);

        let repo = fetcher.project("c/sub", "four").await.unwrap();
        assert_eq!(repo.full_path, "c/sub/four");

        assert!(matches!(
            fetcher.project("a", "missing").await,
            Err(CatalogError::ProjectNotFound { .. })
        ));
        assert_eq!(fetcher.projects().await.len(), 5);
    }
}
