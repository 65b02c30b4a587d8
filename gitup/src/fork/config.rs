//! Fork request configuration.

use serde::Deserialize;

/// One fork request: repositories of `from-group` forked into `to-group`.
///
/// ```toml
/// [[fork]]
/// from-group = "teamA"
/// from-repos = ["svc", "api"]
/// to-group = "teamB"
/// to-repos = ["svc-fork", "api-fork"]
/// rm-fork-relation = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ForkConfig {
    /// Group the source repositories live in.
    pub from_group: String,

    /// Names of the source repositories.
    pub from_repos: Vec<String>,

    /// Destination group. Defaults to `from_group`.
    #[serde(default)]
    pub to_group: Option<String>,

    /// New names, parallel to `from_repos`. Empty keeps the source names.
    #[serde(default)]
    pub to_repos: Vec<String>,

    /// Remove the fork relationship once the fork is in place.
    #[serde(default)]
    pub rm_fork_relation: bool,
}

impl ForkConfig {
    /// Destination group after defaulting.
    pub fn target_group(&self) -> &str {
        self.to_group.as_deref().unwrap_or(&self.from_group)
    }

    /// New name for the `index`-th source repository, if one was given.
    pub fn target_name(&self, index: usize) -> Option<&str> {
        self.to_repos.get(index).map(String::as_str)
    }
}

/// Top-level layout of a fork request file: a list of `[[fork]]` tables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForkFile {
    /// The requests, in file order.
    #[serde(default)]
    pub fork: Vec<ForkConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kebab_case_keys() {
        let file: ForkFile = toml::from_str(
            r#"
            [[fork]]
            from-group = "teamA"
            from-repos = ["svc", "api"]
            to-group = "teamB"
            to-repos = ["svc2", "api2"]
            rm-fork-relation = true

            [[fork]]
            from-group = "teamC"
            from-repos = ["lib"]
            "#,
        )
        .unwrap();

        assert_eq!(file.fork.len(), 2);
        assert_eq!(file.fork[0].target_group(), "teamB");
        assert_eq!(file.fork[0].target_name(1), Some("api2"));
        assert!(file.fork[0].rm_fork_relation);

        let defaults = &file.fork[1];
        assert_eq!(defaults.target_group(), "teamC");
        assert_eq!(defaults.target_name(0), None);
        assert!(!defaults.rm_fork_relation);
    }
}
