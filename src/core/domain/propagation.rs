use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// How a unit of work relates to a transaction that is already ambient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Propagation {
    /// Join the ambient transaction, open one if there is none.
    #[default]
    Required,
    /// Always open a new transaction; the ambient one is left untouched.
    RequiresNew,
    /// Same as `RequiresNew`; no savepoints.
    Nested,
    /// Join the ambient transaction, fail if there is none.
    Mandatory,
    /// Run without a transaction, suspending the ambient one.
    NotSupported,
    /// Run without a transaction, fail if one is ambient.
    Never,
    /// Join the ambient transaction if any, otherwise run without one.
    Supports,
}

impl Propagation {
    pub const ALL: [Propagation; 7] = [
        Propagation::Required,
        Propagation::RequiresNew,
        Propagation::Nested,
        Propagation::Mandatory,
        Propagation::NotSupported,
        Propagation::Never,
        Propagation::Supports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Propagation::Required => "REQUIRED",
            Propagation::RequiresNew => "REQUIRES_NEW",
            Propagation::Nested => "NESTED",
            Propagation::Mandatory => "MANDATORY",
            Propagation::NotSupported => "NOT_SUPPORTED",
            Propagation::Never => "NEVER",
            Propagation::Supports => "SUPPORTS",
        }
    }
}

impl fmt::Display for Propagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Propagation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Propagation::ALL
            .into_iter()
            .find(|propagation| propagation.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown propagation: {s}"))
    }
}
