//! Attribute comparators: score two attribute values.

use std::str::FromStr;

use serde::Deserialize;

/// Deterministic, pure similarity function for one matching attribute.
/// The engine treats the returned score as opaque.
pub trait Comparator: Send + Sync {
    fn compare(&self, a: &str, b: &str) -> f64;
}

impl<F> Comparator for F
where
    F: Fn(&str, &str) -> f64 + Send + Sync,
{
    fn compare(&self, a: &str, b: &str) -> f64 {
        self(a, b)
    }
}

/// Built-in comparators, selected by name in the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ComparatorSpec {
    /// 1.0 when equal, else 0.0.
    Exact,
    /// Normalized Levenshtein similarity in [0, 1]; 0.0 if either value is empty.
    EditDistance,
    /// Jaro-Winkler similarity in [0, 1]; 0.0 if either value is empty.
    JaroWinkler,
}

impl Comparator for ComparatorSpec {
    fn compare(&self, a: &str, b: &str) -> f64 {
        match self {
            Self::Exact => {
                if a == b {
                    1.0
                } else {
                    0.0
                }
            }
            // empty on either side never matches
            Self::EditDistance | Self::JaroWinkler if a.is_empty() || b.is_empty() => 0.0,
            Self::EditDistance => strsim::normalized_levenshtein(a, b),
            Self::JaroWinkler => strsim::jaro_winkler(a, b),
        }
    }
}

impl FromStr for ComparatorSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "exact" => Ok(Self::Exact),
            "edit_distance" | "editdist" => Ok(Self::EditDistance),
            "jaro_winkler" => Ok(Self::JaroWinkler),
            other => Err(format!(
                "unknown comparator '{other}' (expected exact, edit_distance or jaro_winkler)"
            )),
        }
    }
}

impl TryFrom<String> for ComparatorSpec {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for ComparatorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::EditDistance => write!(f, "edit_distance"),
            Self::JaroWinkler => write!(f, "jaro_winkler"),
        }
    }
}
