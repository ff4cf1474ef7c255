use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DetectError;
use crate::strategies::Strategy;

/// How hard to look for evidence that a branch was merged.
///
/// Each level runs every strategy of the levels below it, so a branch found
/// merged at some effort is found merged at every higher effort.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Effort(u8);

impl Effort {
    /// Ancestry only.
    pub const ANCESTRY: Self = Self(1);
    /// Ancestry, then patch-equivalent commits.
    pub const CHERRY_PICK: Self = Self(2);
    /// All of the above, then squash detection.
    pub const SQUASH: Self = Self(3);

    pub const ALL: [Self; 3] = [Self::ANCESTRY, Self::CHERRY_PICK, Self::SQUASH];

    pub fn level(self) -> u8 {
        self.0
    }

    /// Strategies enabled at this effort, cheapest first.
    pub fn strategies(self) -> impl Iterator<Item = Strategy> {
        Strategy::ALL
            .into_iter()
            .filter(move |s| s.required_effort() <= self)
    }
}

impl Default for Effort {
    fn default() -> Self {
        Self::SQUASH
    }
}

impl TryFrom<u8> for Effort {
    type Error = DetectError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            1..=3 => Ok(Self(level)),
            _ => Err(DetectError::InvalidEffort(level.to_string())),
        }
    }
}

impl From<Effort> for u8 {
    fn from(effort: Effort) -> Self {
        effort.0
    }
}

impl FromStr for Effort {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level: u8 = s
            .trim()
            .parse()
            .map_err(|_| DetectError::InvalidEffort(s.to_string()))?;
        Self::try_from(level)
    }
}

impl fmt::Display for Effort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
