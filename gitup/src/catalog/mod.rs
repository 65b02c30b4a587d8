//! Group-indexed repository catalog.
//!
//! A [`Catalog`] maps every root group to the repositories living under it,
//! in the order the provider listed them. It is built from scratch by
//! [`CatalogFetcher`] on every fetch and is read-only once returned.

mod error;
mod fetch;

pub use error::CatalogError;
pub use fetch::{CatalogFetcher, PageQuery, PageSource, ProjectPage, RemoteProject, FETCH_TIMEOUT};

use crate::repo::Repo;
use std::collections::BTreeMap;
use tracing::debug;

/// Repositories indexed by root group.
#[derive(Debug, Clone)]
pub struct Catalog {
    groups: BTreeMap<String, Vec<Repo>>,
    complete: bool,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Creates an empty, complete catalog.
    pub fn new() -> Self {
        Self {
            groups: BTreeMap::new(),
            complete: true,
        }
    }

    /// Appends a repository to its root group, creating the group on first insert.
    pub fn insert(&mut self, repo: Repo) {
        self.groups.entry(repo.group.clone()).or_default().push(repo);
    }

    /// Merges one page of provider projects.
    ///
    /// Archived projects are dropped when `filter_archived` is set. Projects
    /// whose path has no namespace segment are ignored.
    pub fn merge_page(&mut self, projects: Vec<RemoteProject>, filter_archived: bool) {
        for project in projects {
            if filter_archived && project.archived == Some(true) {
                continue;
            }
            let full_path = project.full_path.clone();
            match project.into_repo() {
                Some(repo) => self.insert(repo),
                None => debug!(path = %full_path, "Skipping project without namespace"),
            }
        }
    }

    /// Whether every page of the listing made it into the catalog.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub(crate) fn mark_incomplete(&mut self) {
        self.complete = false;
    }

    /// Number of repositories across all groups.
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Returns true if the catalog holds no repository.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Root group names, sorted.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Repositories of a single root group, in listing order.
    pub fn group(&self, group: &str) -> Option<&[Repo]> {
        self.groups.get(group).map(Vec::as_slice)
    }

    /// Iterates all repositories, group by group.
    pub fn repos(&self) -> impl Iterator<Item = &Repo> {
        self.groups.values().flatten()
    }

    /// Consumes the catalog into a flat list, group by group.
    pub fn into_repos(self) -> Vec<Repo> {
        self.groups.into_values().flatten().collect()
    }

    /// Looks up the repositories of a group or subgroup.
    ///
    /// A plain group name returns the whole root group. A path such as
    /// `"a/b"` resolves root group `"a"` first, then keeps repositories whose
    /// full path starts with `"a/b"`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::GroupNotFound`] if the root group is unknown or
    /// the subgroup filter leaves nothing.
    pub fn projects_by_group(&self, group: &str) -> Result<Vec<&Repo>, CatalogError> {
        let not_found = || CatalogError::GroupNotFound {
            group: group.to_string(),
        };

        let (root, sub_search) = match group.split_once('/') {
            Some((root, _)) => (root, true),
            None => (group, false),
        };

        let repos = self.groups.get(root).ok_or_else(not_found)?;
        if !sub_search {
            return Ok(repos.iter().collect());
        }

        let matched: Vec<&Repo> = repos
            .iter()
            .filter(|repo| repo.full_path.starts_with(group))
            .collect();
        if matched.is_empty() {
            return Err(not_found());
        }
        Ok(matched)
    }

    /// Resolves a single repository by its exact namespace and name.
    ///
    /// # Errors
    ///
    /// Propagates group lookup failures and returns
    /// [`CatalogError::ProjectNotFound`] if no repository in exactly `group`
    /// is named `name`.
    pub fn project(&self, group: &str, name: &str) -> Result<&Repo, CatalogError> {
        self.projects_by_group(group)?
            .into_iter()
            .find(|repo| repo.parent_path() == group && repo.name == name)
            .ok_or_else(|| CatalogError::ProjectNotFound {
                group: group.to_string(),
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(full_path: &str) -> RemoteProject {
        let name = full_path.rsplit('/').next().unwrap_or(full_path);
        RemoteProject {
            id: None,
            name: name.to_string(),
            full_path: full_path.to_string(),
            url: format!("https://git.example.com/{full_path}.git"),
            archived: None,
        }
    }

    fn catalog(paths: &[&str]) -> Catalog {
        let mut catalog = Catalog::new();
        catalog.merge_page(paths.iter().map(|p| project(p)).collect(), false);
        catalog
    }

    #[test]
    fn groups_by_root_segment_in_listing_order() {
        let catalog = catalog(&["a/x", "b/y", "a/sub/z", "a/w"]);

        let a: Vec<_> = catalog
            .group("a")
            .unwrap()
            .iter()
            .map(|r| r.full_path.as_str())
            .collect();
        assert_eq!(a, ["a/x", "a/sub/z", "a/w"]);
        assert_eq!(catalog.group("b").unwrap().len(), 1);
        assert_eq!(catalog.len(), 4);
        assert!(catalog.is_complete());
    }

    #[test]
    fn filters_archived_projects() {
        let mut archived = project("a/old");
        archived.archived = Some(true);
        let mut catalog = Catalog::new();
        catalog.merge_page(vec![archived.clone(), project("a/new")], true);
        assert_eq!(catalog.len(), 1);

        let mut unfiltered = Catalog::new();
        unfiltered.merge_page(vec![archived, project("a/new")], false);
        assert_eq!(unfiltered.len(), 2);
    }

    #[test]
    fn skips_projects_without_namespace() {
        let catalog = catalog(&["lonely", "a/x"]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.group_names().collect::<Vec<_>>(), ["a"]);
    }

    #[test]
    fn projects_by_group_returns_whole_root_group() {
        let catalog = catalog(&["a/x", "a/b/y", "c/z"]);
        assert_eq!(catalog.projects_by_group("a").unwrap().len(), 2);
    }

    #[test]
    fn projects_by_group_filters_subgroup() {
        let catalog = catalog(&["a/b/x", "a/c/y"]);

        let repos = catalog.projects_by_group("a/b").unwrap();

        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].full_path, "a/b/x");
    }

    #[test]
    fn projects_by_group_errors_on_unknown_group() {
        let catalog = catalog(&["a/b/x"]);

        assert!(matches!(
            catalog.projects_by_group("missing"),
            Err(CatalogError::GroupNotFound { .. })
        ));
        assert!(matches!(
            catalog.projects_by_group("a/nope"),
            Err(CatalogError::GroupNotFound { .. })
        ));
    }

    #[test]
    fn project_requires_exact_namespace() {
        let catalog = catalog(&["a/x", "a/b/x"]);

        assert_eq!(catalog.project("a", "x").unwrap().full_path, "a/x");
        assert_eq!(catalog.project("a/b", "x").unwrap().full_path, "a/b/x");
        assert!(matches!(
            catalog.project("a", "z"),
            Err(CatalogError::ProjectNotFound { .. })
        ));
    }
}
