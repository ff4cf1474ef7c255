use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use gdmb_detect::Effort;

use crate::error::{SdkError, SdkResult};

/// Settings read from a `gdmb.toml` file.
///
/// ```toml
/// effort = 3
/// required = ["master"]
/// excluded = ["keep-me"]
/// remotes = ["origin"]
/// include = ["^feature/"]
/// parallelism = 4
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DmbConfig {
    /// How hard to look for merges (1 to 3).
    pub effort: Effort,
    /// Branches every candidate must be merged into.
    pub required: Vec<String>,
    /// Branches never deleted.
    pub excluded: Vec<String>,
    /// Remotes whose branches may be deleted.
    pub remotes: Vec<String>,
    /// Regular expressions a branch name must all match to be a candidate.
    pub include: Vec<String>,
    /// Worker threads for classification.
    pub parallelism: usize,
}

impl Default for DmbConfig {
    fn default() -> Self {
        Self {
            effort: Effort::default(),
            required: Vec::new(),
            excluded: Vec::new(),
            remotes: Vec::new(),
            include: Vec::new(),
            parallelism: 1,
        }
    }
}

impl DmbConfig {
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| SdkError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// Layer command-line values over the file.
    pub fn with_overrides(self, overrides: ConfigOverrides) -> PlanSettings {
        PlanSettings {
            effort: overrides.effort.unwrap_or(self.effort),
            required: Names {
                explicit: overrides.required,
                configured: self.required,
            },
            excluded: Names {
                explicit: overrides.excluded,
                configured: self.excluded,
            },
            remotes: Names {
                explicit: overrides.remotes,
                configured: self.remotes,
            },
            include: self.include.into_iter().chain(overrides.include).collect(),
            parallelism: overrides.parallelism.unwrap_or(self.parallelism).max(1),
        }
    }
}

/// Values given on the command line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub effort: Option<Effort>,
    pub required: Vec<String>,
    pub excluded: Vec<String>,
    pub remotes: Vec<String>,
    pub include: Vec<String>,
    pub parallelism: Option<usize>,
}

/// Branch or remote names from both sources.
///
/// Explicit names must exist. Configured names that no longer exist are
/// ignored, so a stale config file does not block a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Names {
    pub explicit: Vec<String>,
    pub configured: Vec<String>,
}

impl Names {
    pub fn configured(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            explicit: Vec::new(),
            configured: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn explicit(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            explicit: names.into_iter().map(Into::into).collect(),
            configured: Vec::new(),
        }
    }

    /// The first explicit name missing from `existing`, in the order given.
    pub(crate) fn first_unknown(&self, existing: &BTreeSet<String>) -> Option<&str> {
        self.explicit
            .iter()
            .find(|name| !existing.contains(*name))
            .map(String::as_str)
    }

    /// Configured names that exist.
    pub(crate) fn existing_configured(&self, existing: &BTreeSet<String>) -> BTreeSet<String> {
        self.configured
            .iter()
            .filter(|name| existing.contains(*name))
            .cloned()
            .collect()
    }
}

/// Everything the planner needs, after merging file and command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanSettings {
    pub effort: Effort,
    /// Explicit targets replace configured ones.
    pub required: Names,
    /// Explicit and configured exclusions are combined.
    pub excluded: Names,
    /// Explicit remotes replace configured ones.
    pub remotes: Names,
    pub include: Vec<String>,
    pub parallelism: usize,
}

impl Default for PlanSettings {
    fn default() -> Self {
        DmbConfig::default().with_overrides(ConfigOverrides::default())
    }
}

impl PlanSettings {
    pub fn with_targets(targets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            required: Names::explicit(targets),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = DmbConfig::from_toml_str("").unwrap();
        assert_eq!(config, DmbConfig::default());
        assert_eq!(config.effort, Effort::SQUASH);
        assert_eq!(config.parallelism, 1);
    }

    #[test]
    fn parses_all_keys() {
        let config = DmbConfig::from_toml_str(
            r#"
            effort = 2
            required = ["master", "develop"]
            excluded = ["keep-me"]
            remotes = ["origin"]
            include = ["^feature/"]
            parallelism = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.effort, Effort::CHERRY_PICK);
        assert_eq!(config.required, vec!["master", "develop"]);
        assert_eq!(config.excluded, vec!["keep-me"]);
        assert_eq!(config.remotes, vec!["origin"]);
        assert_eq!(config.include, vec!["^feature/"]);
        assert_eq!(config.parallelism, 4);
    }

    #[test]
    fn rejects_bad_effort_and_unknown_keys() {
        assert!(matches!(DmbConfig::from_toml_str("effort = 4"), Err(SdkError::Config(_))));
        assert!(matches!(DmbConfig::from_toml_str("efort = 2"), Err(SdkError::Config(_))));
    }

    #[test]
    fn overrides_layer_over_file() {
        let config = DmbConfig {
            effort: Effort::CHERRY_PICK,
            required: vec!["master".into()],
            excluded: vec!["keep".into()],
            include: vec!["a".into()],
            parallelism: 0,
            ..DmbConfig::default()
        };
        let settings = config.with_overrides(ConfigOverrides {
            effort: Some(Effort::ANCESTRY),
            excluded: vec!["other".into()],
            include: vec!["b".into()],
            ..ConfigOverrides::default()
        });
        assert_eq!(settings.effort, Effort::ANCESTRY);
        assert_eq!(settings.required, Names::configured(["master"]));
        assert_eq!(settings.excluded.explicit, vec!["other"]);
        assert_eq!(settings.excluded.configured, vec!["keep"]);
        assert_eq!(settings.include, vec!["a", "b"]);
        assert_eq!(settings.parallelism, 1);
    }

    #[test]
    fn toml_round_trip_through_file() {
        let config = DmbConfig {
            required: vec!["master".into()],
            remotes: vec!["origin".into()],
            ..DmbConfig::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gdmb.toml");
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();
        assert_eq!(DmbConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn name_lookup() {
        let names = Names {
            explicit: vec!["a".into(), "zz".into(), "yy".into()],
            configured: vec!["b".into(), "gone".into()],
        };
        let existing: BTreeSet<String> = ["a", "b", "c"].map(String::from).into();
        assert_eq!(names.first_unknown(&existing), Some("zz"));
        assert_eq!(names.existing_configured(&existing), BTreeSet::from(["b".to_string()]));
    }
}
