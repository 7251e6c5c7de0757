use std::collections::HashSet;

use serde::Deserialize;

use crate::blocking::BlockingRule;
use crate::classify::{Classifier, ThresholdClassifier, Unclassified};
use crate::compare::ComparatorSpec;
use crate::encode::EncoderSpec;
use crate::error::LinkageError;
use crate::matcher::MatchingRule;
use crate::model::Party;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LinkageConfig {
    pub name: String,
    pub parties: PartiesConfig,
    #[serde(default)]
    pub schema: Option<SchemaConfig>,
    /// Empty means no blocking: every record lands in one block.
    #[serde(default)]
    pub blocking: Vec<BlockingConfig>,
    #[serde(default)]
    pub matching: Vec<MatchingConfig>,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Parties + Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PartiesConfig {
    pub a: PartyConfig,
    pub b: PartyConfig,
}

impl PartiesConfig {
    pub fn get(&self, party: Party) -> &PartyConfig {
        match party {
            Party::A => &self.a,
            Party::B => &self.b,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartyConfig {
    /// Path to the delimited file; `.gz` selects gzip decompression.
    pub file: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Attribute names, in column order after the record id.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaConfig {
    pub attributes: Vec<String>,
}

/// An attribute referenced by schema name or zero-based position.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AttributeRef {
    Position(usize),
    Name(String),
}

impl std::fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Position(p) => write!(f, "#{p}"),
            Self::Name(n) => write!(f, "{n}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Blocking + Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct BlockingConfig {
    pub attribute: AttributeRef,
    pub encoder: EncoderSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    pub attribute: AttributeRef,
    pub comparator: ComparatorSpec,
}

// ---------------------------------------------------------------------------
// Classifier + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierConfig {
    #[default]
    Unclassified,
    /// Weighted sum of scores against two thresholds.
    Threshold {
        upper: f64,
        lower: f64,
        #[serde(default)]
        weights: Option<Vec<f64>>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Candidate pair file, relative to the config file's directory.
    #[serde(default = "default_pairs_file")]
    pub pairs: String,
}

fn default_pairs_file() -> String {
    "output.csv".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pairs: default_pairs_file(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved plan
// ---------------------------------------------------------------------------

/// Config with attribute references resolved to positions and specs turned
/// into strategy objects. Built once, passed by reference to every phase.
pub struct LinkagePlan {
    pub blocking: Vec<BlockingRule>,
    pub matching: Vec<MatchingRule>,
    pub classifier: Box<dyn Classifier>,
    /// Minimum attribute count every record must have.
    pub width: usize,
}

impl LinkagePlan {
    pub fn new(
        blocking: Vec<BlockingRule>,
        matching: Vec<MatchingRule>,
        classifier: Box<dyn Classifier>,
    ) -> Self {
        let width = blocking
            .iter()
            .map(|r| r.position + 1)
            .chain(matching.iter().map(|r| r.position + 1))
            .max()
            .unwrap_or(0);
        Self {
            blocking,
            matching,
            classifier,
            width,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl LinkageConfig {
    pub fn from_toml(input: &str) -> Result<Self, LinkageError> {
        let config: LinkageConfig =
            toml::from_str(input).map_err(|e| LinkageError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LinkageError> {
        for party in [Party::A, Party::B] {
            if self.parties.get(party).file.trim().is_empty() {
                return Err(LinkageError::ConfigValidation(format!(
                    "party '{party}': file must not be empty"
                )));
            }
        }

        if let Some(ref schema) = self.schema {
            let mut seen = HashSet::new();
            for name in &schema.attributes {
                if name.trim().is_empty() {
                    return Err(LinkageError::ConfigValidation(
                        "schema attribute names must not be empty".into(),
                    ));
                }
                if !seen.insert(name.as_str()) {
                    return Err(LinkageError::ConfigValidation(format!(
                        "schema attribute '{name}' declared twice"
                    )));
                }
            }
        }

        if self.matching.is_empty() {
            return Err(LinkageError::ConfigValidation(
                "at least one matching attribute is required".into(),
            ));
        }

        for (i, b) in self.blocking.iter().enumerate() {
            self.resolve(&b.attribute)
                .map_err(|e| LinkageError::ConfigValidation(format!("blocking[{i}]: {e}")))?;
        }
        for (i, m) in self.matching.iter().enumerate() {
            self.resolve(&m.attribute)
                .map_err(|e| LinkageError::ConfigValidation(format!("matching[{i}]: {e}")))?;
        }

        if let ClassifierConfig::Threshold { upper, lower, ref weights } = self.classifier {
            if !upper.is_finite() || !lower.is_finite() {
                return Err(LinkageError::ConfigValidation(
                    "classifier thresholds must be finite".into(),
                ));
            }
            if lower > upper {
                return Err(LinkageError::ConfigValidation(format!(
                    "classifier lower threshold {lower} exceeds upper threshold {upper}"
                )));
            }
            if let Some(w) = weights {
                if w.len() != self.matching.len() {
                    return Err(LinkageError::ConfigValidation(format!(
                        "classifier has {} weight(s) for {} matching attribute(s)",
                        w.len(),
                        self.matching.len()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Display label for a party.
    pub fn label(&self, party: Party) -> String {
        self.parties
            .get(party)
            .label
            .clone()
            .unwrap_or_else(|| party.default_label().to_string())
    }

    /// Resolve an attribute reference to (position, display name).
    pub fn resolve(&self, attr: &AttributeRef) -> Result<(usize, String), String> {
        let names = self.schema.as_ref().map(|s| s.attributes.as_slice());
        match (attr, names) {
            (AttributeRef::Name(name), Some(names)) => names
                .iter()
                .position(|n| n == name)
                .map(|p| (p, name.clone()))
                .ok_or_else(|| format!("attribute '{name}' not in schema")),
            (AttributeRef::Name(name), None) => Err(format!(
                "attribute '{name}' referenced by name but no [schema] is declared"
            )),
            (AttributeRef::Position(p), Some(names)) => names
                .get(*p)
                .map(|n| (*p, n.clone()))
                .ok_or_else(|| {
                    format!("attribute position {p} out of range for schema of {}", names.len())
                }),
            (AttributeRef::Position(p), None) => Ok((*p, attr.to_string())),
        }
    }

    /// Resolve attribute references and build the strategy objects.
    pub fn plan(&self) -> Result<LinkagePlan, LinkageError> {
        let resolve = |attr: &AttributeRef| {
            self.resolve(attr).map_err(LinkageError::ConfigValidation)
        };

        let mut blocking = Vec::with_capacity(self.blocking.len());
        for b in &self.blocking {
            let (position, name) = resolve(&b.attribute)?;
            blocking.push(BlockingRule::new(name, position, b.encoder));
        }

        let mut matching = Vec::with_capacity(self.matching.len());
        for m in &self.matching {
            let (position, name) = resolve(&m.attribute)?;
            matching.push(MatchingRule::new(name, position, m.comparator));
        }

        let classifier: Box<dyn Classifier> = match self.classifier {
            ClassifierConfig::Unclassified => Box::new(Unclassified),
            ClassifierConfig::Threshold { upper, lower, ref weights } => {
                Box::new(ThresholdClassifier::new(upper, lower, weights.clone()))
            }
        };

        let mut plan = LinkagePlan::new(blocking, matching, classifier);
        if let Some(ref schema) = self.schema {
            plan.width = plan.width.max(schema.attributes.len());
        }
        Ok(plan)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
