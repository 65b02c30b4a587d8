//! Per-repository fork plans.

use super::config::ForkConfig;
use crate::catalog::CatalogError;
use crate::repo::Repo;
use thiserror::Error;

/// Reasons a fork request or one of its entries is not executed.
#[derive(Debug, Error)]
pub enum PlanError {
    /// `to-repos` is given but does not line up with `from-repos`.
    #[error("to-repos has {to} entries but from-repos has {from}")]
    TargetCountMismatch { from: usize, to: usize },

    /// Forking within one group needs a new name, or the fork would collide
    /// with its source.
    #[error("same group fork [{group}/{repo}] needs a target name")]
    SameGroupWithoutName { group: String, repo: String },

    /// The source repository could not be resolved.
    #[error(transparent)]
    Lookup(#[from] CatalogError),
}

/// Checks the shape of a fork request before any lookup happens.
///
/// # Errors
///
/// Returns [`PlanError::TargetCountMismatch`] if `to-repos` is non-empty and
/// its length differs from `from-repos`.
pub fn validate(config: &ForkConfig) -> Result<(), PlanError> {
    if !config.to_repos.is_empty() && config.to_repos.len() != config.from_repos.len() {
        return Err(PlanError::TargetCountMismatch {
            from: config.from_repos.len(),
            to: config.to_repos.len(),
        });
    }
    Ok(())
}

/// Everything needed to fork one repository, decided up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkPlan {
    source: Repo,
    target_group: String,
    target_name: Option<String>,
    same_group_fork: bool,
    change_name_fork: bool,
    remove_fork_relation: bool,
}

impl ForkPlan {
    /// Builds the plan for forking `source` as the `index`-th entry of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::SameGroupWithoutName`] for a same-group fork that
    /// has no target name.
    pub fn new(source: Repo, config: &ForkConfig, index: usize) -> Result<Self, PlanError> {
        let target_group = config.target_group().to_string();
        let target_name = config.target_name(index).map(str::to_string);
        let same_group_fork = target_group == config.from_group;

        if same_group_fork && target_name.is_none() {
            return Err(PlanError::SameGroupWithoutName {
                group: target_group,
                repo: source.name,
            });
        }

        let change_name_fork = target_name
            .as_deref()
            .is_some_and(|name| name != source.name);

        Ok(Self {
            source,
            target_group,
            target_name,
            same_group_fork,
            change_name_fork,
            remove_fork_relation: config.rm_fork_relation,
        })
    }

    /// Repository being forked.
    pub fn source(&self) -> &Repo {
        &self.source
    }

    /// Group the fork ends up in.
    pub fn target_group(&self) -> &str {
        &self.target_group
    }

    /// New name, if one was requested.
    pub fn target_name(&self) -> Option<&str> {
        self.target_name.as_deref()
    }

    /// Name the fork ends up with.
    pub fn final_name(&self) -> &str {
        self.target_name().unwrap_or(&self.source.name)
    }

    /// Fork lands in the source's own group.
    pub fn same_group_fork(&self) -> bool {
        self.same_group_fork
    }

    /// Fork gets a different name from its source.
    pub fn change_name_fork(&self) -> bool {
        self.change_name_fork
    }

    /// Fork relationship is removed at the end.
    pub fn remove_fork_relation(&self) -> bool {
        self.remove_fork_relation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svc() -> Repo {
        Repo::new(Some(1), "https://x/teamA/svc.git", "svc", "teamA/svc").unwrap()
    }

    fn request(to_group: Option<&str>, to_repos: &[&str]) -> ForkConfig {
        ForkConfig {
            from_group: "teamA".into(),
            from_repos: vec!["svc".into()],
            to_group: to_group.map(str::to_string),
            to_repos: to_repos.iter().map(|s| s.to_string()).collect(),
            rm_fork_relation: false,
        }
    }

    #[test]
    fn rejects_mismatched_target_count() {
        let mut config = request(Some("teamB"), &["a"]);
        config.from_repos.push("api".into());

        assert!(matches!(
            validate(&config),
            Err(PlanError::TargetCountMismatch { from: 2, to: 1 })
        ));
        config.to_repos.clear();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn same_group_fork_requires_name() {
        let config = request(None, &[]);
        assert!(matches!(
            ForkPlan::new(svc(), &config, 0),
            Err(PlanError::SameGroupWithoutName { .. })
        ));

        let config = request(Some("teamA"), &["svc-copy"]);
        let plan = ForkPlan::new(svc(), &config, 0).unwrap();
        assert!(plan.same_group_fork());
        assert!(plan.change_name_fork());
        assert_eq!(plan.final_name(), "svc-copy");
    }

    #[test]
    fn cross_group_fork_keeps_name_by_default() {
        let plan = ForkPlan::new(svc(), &request(Some("teamB"), &[]), 0).unwrap();

        assert!(!plan.same_group_fork());
        assert!(!plan.change_name_fork());
        assert_eq!(plan.target_group(), "teamB");
        assert_eq!(plan.final_name(), "svc");
    }

    #[test]
    fn same_name_is_not_a_rename() {
        let plan = ForkPlan::new(svc(), &request(Some("teamB"), &["svc"]), 0).unwrap();
        assert!(!plan.change_name_fork());
    }
}
