//! Remote repository record.

use serde::Serialize;

/// A repository hosted on the remote provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repo {
    /// Provider-assigned identifier. Listing-only providers may not expose one.
    pub id: Option<u64>,

    /// Clone URL (http or ssh).
    pub url: String,

    /// Leaf name of the repository, whitespace-trimmed.
    pub name: String,

    /// Root namespace segment (e.g. "teamA" for "teamA/backend/svc").
    pub group: String,

    /// Full namespace path plus name, slash-separated.
    pub full_path: String,
}

impl Repo {
    /// Builds a record from a provider's full path.
    ///
    /// Returns `None` when `full_path` has no namespace segment, since every
    /// record must live under a root group.
    pub fn new(
        id: Option<u64>,
        url: impl Into<String>,
        name: &str,
        full_path: impl Into<String>,
    ) -> Option<Self> {
        let full_path = full_path.into();
        let group = root_group(&full_path)?.to_string();
        Some(Self {
            id,
            url: url.into(),
            name: name.trim().to_string(),
            group,
            full_path,
        })
    }

    /// Namespace the repository lives in (`full_path` without the leaf).
    pub fn parent_path(&self) -> &str {
        self.full_path
            .rsplit_once('/')
            .map(|(parent, _)| parent)
            .unwrap_or(&self.group)
    }
}

/// Returns the segment of `path` before the first `/`.
pub(crate) fn root_group(path: &str) -> Option<&str> {
    match path.split_once('/') {
        Some((group, rest)) if !group.is_empty() && !rest.is_empty() => Some(group),
        _ => None,
    }
}
