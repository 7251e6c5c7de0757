use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::LinkageError;

// ---------------------------------------------------------------------------
// Party + Record
// ---------------------------------------------------------------------------

/// One of the two collections being linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    A,
    B,
}

impl Party {
    /// Label used when the config does not name the party.
    pub fn default_label(&self) -> &'static str {
        match self {
            Self::A => "p1",
            Self::B => "p2",
        }
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "a"),
            Self::B => write!(f, "b"),
        }
    }
}

/// A cleaned input row. `fields` excludes the identifier, so attribute
/// position 0 is the first column after the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub fields: Vec<String>,
    /// 1-based line in the source file (header is line 1).
    pub line: usize,
}

impl Record {
    pub fn new(id: impl Into<String>, fields: Vec<String>, line: usize) -> Self {
        Self {
            id: id.into(),
            fields,
            line,
        }
    }
}

/// All records of one party, keyed by id, in load order.
#[derive(Debug, Clone)]
pub struct RecordStore {
    pub party: Party,
    pub label: String,
    records: Vec<Record>,
    by_id: HashMap<String, usize>,
}

impl RecordStore {
    pub fn new(party: Party, label: impl Into<String>) -> Self {
        Self {
            party,
            label: label.into(),
            records: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    /// Build a store from in-memory records. Fails on the first duplicate id.
    pub fn from_records(
        party: Party,
        label: impl Into<String>,
        records: impl IntoIterator<Item = Record>,
    ) -> Result<Self, LinkageError> {
        let mut store = Self::new(party, label);
        for record in records {
            store.insert(record)?;
        }
        Ok(store)
    }

    pub fn insert(&mut self, record: Record) -> Result<(), LinkageError> {
        if let Some(&existing) = self.by_id.get(&record.id) {
            return Err(LinkageError::DuplicateIdentifier {
                party: self.label.clone(),
                record_id: record.id,
                line: record.line,
                first_line: self.records[existing].line,
            });
        }
        self.by_id.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.by_id.get(id).map(|&i| &self.records[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Attribute value at `position`, or `AttributeIndex` naming this party.
    pub fn value<'r>(&self, record: &'r Record, position: usize) -> Result<&'r str, LinkageError> {
        record
            .fields
            .get(position)
            .map(String::as_str)
            .ok_or_else(|| LinkageError::AttributeIndex {
                party: self.label.clone(),
                record_id: record.id.clone(),
                line: record.line,
                position,
                field_count: record.fields.len(),
            })
    }
}

// ---------------------------------------------------------------------------
// Blocking
// ---------------------------------------------------------------------------

/// Key shared by every record when no blocking attributes are configured.
pub const NO_BLOCK_KEY: &str = "no_block";

/// Block key -> record ids (load order), for one party.
#[derive(Debug, Clone, Serialize)]
pub struct BlockIndex {
    pub party: Party,
    blocks: BTreeMap<String, Vec<String>>,
}

impl BlockIndex {
    pub fn new(party: Party) -> Self {
        Self {
            party,
            blocks: BTreeMap::new(),
        }
    }

    pub(crate) fn push(&mut self, key: String, record_id: String) {
        self.blocks.entry(key).or_default().push(record_id);
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.blocks.get(key).map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.blocks.contains_key(key)
    }

    /// Block keys in lexicographic order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.blocks.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of record ids across all blocks.
    pub fn record_count(&self) -> usize {
        self.blocks.values().map(Vec::len).sum()
    }

    /// Size of the largest block, 0 when empty.
    pub fn largest_block(&self) -> usize {
        self.blocks.values().map(Vec::len).max().unwrap_or(0)
    }
}

/// Keys present in both parties' indexes, plus the union size for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct BlockOverlap {
    /// Sorted lexicographically.
    pub common: Vec<String>,
    pub union_count: usize,
}

impl BlockOverlap {
    pub fn common_count(&self) -> usize {
        self.common.len()
    }

    pub fn union_count(&self) -> usize {
        self.union_count
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CandidatePair {
    pub id_a: String,
    pub id_b: String,
}

impl CandidatePair {
    pub fn new(id_a: impl Into<String>, id_b: impl Into<String>) -> Self {
        Self {
            id_a: id_a.into(),
            id_b: id_b.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchClass {
    Match,
    NonMatch,
    PossibleMatch,
}

impl std::fmt::Display for MatchClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Match => write!(f, "match"),
            Self::NonMatch => write!(f, "non_match"),
            Self::PossibleMatch => write!(f, "possible_match"),
        }
    }
}

/// A candidate pair with its weight vector (one score per matching attribute).
#[derive(Debug, Clone, Serialize)]
pub struct ScoredPair {
    pub id_a: String,
    pub id_b: String,
    pub block_key: String,
    pub weights: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<MatchClass>,
}

/// Candidate pair -> weight vector, kept in emission order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct WeightVectors {
    pairs: Vec<ScoredPair>,
    #[serde(skip)]
    index: HashMap<CandidatePair, usize>,
}

impl WeightVectors {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, pair: ScoredPair) {
        let key = CandidatePair::new(pair.id_a.clone(), pair.id_b.clone());
        self.index.insert(key, self.pairs.len());
        self.pairs.push(pair);
    }

    pub fn get(&self, id_a: &str, id_b: &str) -> Option<&[f64]> {
        self.index
            .get(&CandidatePair::new(id_a, id_b))
            .map(|&i| self.pairs[i].weights.as_slice())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredPair> {
        self.pairs.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ScoredPair> {
        self.pairs.iter_mut()
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Both parties' loaded records.
pub struct LinkageInput {
    pub a: RecordStore,
    pub b: RecordStore,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct PhaseTimings {
    pub blocking_ms: f64,
    pub matching_ms: f64,
    pub classification_ms: f64,
    pub total_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartySummary {
    pub label: String,
    pub records: usize,
    pub blocks: usize,
    pub largest_block: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkageSummary {
    pub party_a: PartySummary,
    pub party_b: PartySummary,
    pub common_blocks: usize,
    pub union_blocks: usize,
    pub candidate_pairs: usize,
    pub cross_product: u64,
    /// Fraction of the full cross product avoided by blocking.
    pub reduction_ratio: f64,
    pub class_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkageMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub classifier: String,
    pub timings: PhaseTimings,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkageResult {
    pub meta: LinkageMeta,
    pub summary: LinkageSummary,
    pub pairs: WeightVectors,
}
