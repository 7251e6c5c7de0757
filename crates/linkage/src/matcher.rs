use std::io::Write;
use std::time::Instant;

use crate::compare::Comparator;
use crate::error::LinkageError;
use crate::model::{BlockIndex, BlockOverlap, Record, RecordStore, ScoredPair, WeightVectors};

/// One matching attribute: where to read it and how to score it.
pub struct MatchingRule {
    pub attribute: String,
    pub position: usize,
    pub comparator: Box<dyn Comparator>,
}

impl MatchingRule {
    pub fn new(
        attribute: impl Into<String>,
        position: usize,
        comparator: impl Comparator + 'static,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            position,
            comparator: Box::new(comparator),
        }
    }
}

impl std::fmt::Debug for MatchingRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchingRule")
            .field("attribute", &self.attribute)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

/// Score one record pair, one entry per rule, in rule order.
pub fn weight_vector(
    store_a: &RecordStore,
    rec_a: &Record,
    store_b: &RecordStore,
    rec_b: &Record,
    rules: &[MatchingRule],
) -> Result<Vec<f64>, LinkageError> {
    rules
        .iter()
        .map(|rule| -> Result<f64, LinkageError> {
            let va = store_a.value(rec_a, rule.position)?;
            let vb = store_b.value(rec_b, rule.position)?;
            Ok(rule.comparator.compare(va, vb))
        })
        .collect()
}

fn bucket<'i>(
    index: &'i BlockIndex,
    store: &RecordStore,
    key: &str,
) -> Result<&'i [String], LinkageError> {
    index.get(key).ok_or_else(|| {
        LinkageError::IndexMismatch(format!(
            "common block '{key}' missing from {}'s index",
            store.label
        ))
    })
}

fn indexed_record<'s>(store: &'s RecordStore, id: &str) -> Result<&'s Record, LinkageError> {
    store.get(id).ok_or_else(|| {
        LinkageError::IndexMismatch(format!(
            "indexed record '{id}' not in {}'s store",
            store.label
        ))
    })
}

/// Compare every A x B record pair within each common block.
///
/// The overlap and indexes must come from these stores; any key or id that
/// does not resolve is an `IndexMismatch`.
pub fn compare_blocks(
    overlap: &BlockOverlap,
    index_a: &BlockIndex,
    index_b: &BlockIndex,
    store_a: &RecordStore,
    store_b: &RecordStore,
    rules: &[MatchingRule],
) -> Result<WeightVectors, LinkageError> {
    let start = Instant::now();
    let mut out = WeightVectors::new();

    for key in &overlap.common {
        let ids_a = bucket(index_a, store_a, key)?;
        let ids_b = bucket(index_b, store_b, key)?;
        log::debug!("block '{key}': {} x {} pairs", ids_a.len(), ids_b.len());

        for id_a in ids_a {
            let rec_a = indexed_record(store_a, id_a)?;
            for id_b in ids_b {
                let rec_b = indexed_record(store_b, id_b)?;
                let weights = weight_vector(store_a, rec_a, store_b, rec_b, rules)?;
                out.push(ScoredPair {
                    id_a: id_a.clone(),
                    id_b: id_b.clone(),
                    block_key: key.clone(),
                    weights,
                    class: None,
                });
            }
        }
    }

    log::info!(
        "compared {} candidate pairs over {} blocks in {:.3}s",
        out.len(),
        overlap.common.len(),
        start.elapsed().as_secs_f64(),
    );
    Ok(out)
}

#[cfg(windows)]
fn line_terminator() -> csv::Terminator {
    csv::Terminator::CRLF
}

#[cfg(not(windows))]
fn line_terminator() -> csv::Terminator {
    csv::Terminator::Any(b'\n')
}

/// Shortest round-trip form; integral values keep one decimal (`1.0`).
pub fn format_score(score: f64) -> String {
    if score.is_finite() && score.fract() == 0.0 && score.abs() < 1e16 {
        format!("{score:.1}")
    } else {
        format!("{score}")
    }
}

/// Write `idA,idB,score1,...,scoreN` per pair. No header.
pub fn write_pairs<W: Write>(pairs: &WeightVectors, writer: W) -> Result<(), LinkageError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(line_terminator())
        .from_writer(writer);

    for pair in pairs.iter() {
        let mut row: Vec<String> = Vec::with_capacity(pair.weights.len() + 2);
        row.push(pair.id_a.clone());
        row.push(pair.id_b.clone());
        row.extend(pair.weights.iter().map(|&w| format_score(w)));
        wtr.write_record(&row)
            .map_err(|e| LinkageError::Output(e.to_string()))?;
    }
    wtr.flush().map_err(|e| LinkageError::Output(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking::{build_block_index, BlockingRule};
    use crate::compare::ComparatorSpec;
    use crate::encode::EncoderSpec;
    use crate::intersect::intersect_blocks;
    use crate::model::Party;

    fn store(party: Party, rows: Vec<(&str, Vec<&str>)>) -> RecordStore {
        let records = rows.into_iter().enumerate().map(|(i, (id, fields))| {
            Record::new(id, fields.into_iter().map(String::from).collect(), i + 2)
        });
        RecordStore::from_records(party, party.default_label(), records).unwrap()
    }

    fn compare(
        a: &RecordStore,
        b: &RecordStore,
        blocking: &[BlockingRule],
        matching: &[MatchingRule],
    ) -> Result<WeightVectors, LinkageError> {
        let ia = build_block_index(a, blocking).unwrap();
        let ib = build_block_index(b, blocking).unwrap();
        let overlap = intersect_blocks(&ia, &ib);
        compare_blocks(&overlap, &ia, &ib, a, b, matching)
    }

    fn name_rules() -> Vec<MatchingRule> {
        vec![
            MatchingRule::new("surname", 0, ComparatorSpec::Exact),
            MatchingRule::new("given_name", 1, ComparatorSpec::EditDistance),
        ]
    }

    #[test]
    fn cross_product_within_block() {
        let a = store(
            Party::A,
            vec![("a1", vec!["smith", "jon", "x"]), ("a2", vec!["smyth", "jon", "x"])],
        );
        let b = store(
            Party::B,
            vec![
                ("b1", vec!["smith", "john", "x"]),
                ("b2", vec!["smith", "jon", "x"]),
                ("b3", vec!["brown", "sue", "y"]),
            ],
        );
        let blocking = vec![BlockingRule::new("x", 2, EncoderSpec::Exact)];
        let out = compare(&a, &b, &blocking, &name_rules()).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out.get("a1", "b2"), Some(&[1.0, 1.0][..]));
        assert_eq!(out.get("a2", "b2").unwrap()[0], 0.0);
        assert!(out.get("a1", "b3").is_none());
        for pair in out.iter() {
            assert_eq!(pair.weights.len(), 2);
        }
    }

    #[test]
    fn emission_order_follows_blocks_then_buckets() {
        let a = store(Party::A, vec![("a1", vec!["k2"]), ("a2", vec!["k1"])]);
        let b = store(Party::B, vec![("b1", vec!["k1"]), ("b2", vec!["k2"])]);
        let blocking = vec![BlockingRule::new("k", 0, EncoderSpec::Exact)];
        let matching = vec![MatchingRule::new("k", 0, ComparatorSpec::Exact)];
        let out = compare(&a, &b, &blocking, &matching).unwrap();
        let ids: Vec<(&str, &str)> = out.iter().map(|p| (p.id_a.as_str(), p.id_b.as_str())).collect();
        assert_eq!(ids, vec![("a2", "b1"), ("a1", "b2")]);
    }

    #[test]
    fn matching_position_out_of_range_on_b() {
        let a = store(Party::A, vec![("a1", vec!["smith", "jon"])]);
        let b = store(Party::B, vec![("b1", vec!["smith"])]);
        let err = compare(&a, &b, &[], &name_rules()).unwrap_err();
        match err {
            LinkageError::AttributeIndex { party, record_id, .. } => {
                assert_eq!(party, "p2");
                assert_eq!(record_id, "b1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn format_scores() {
        assert_eq!(format_score(1.0), "1.0");
        assert_eq!(format_score(0.0), "0.0");
        assert_eq!(format_score(0.5), "0.5");
        assert_eq!(format_score(0.75), "0.75");
        assert_eq!(format_score(2.0 / 3.0), "0.6666666666666666");
        assert_eq!(format_score(f64::NAN), "NaN");
    }

    #[test]
    fn writes_one_line_per_pair() {
        let a = store(Party::A, vec![("id1", vec!["smith", "jon"])]);
        let b = store(Party::B, vec![("id9", vec!["smith", "jonathan"]), ("id8", vec!["brown", "jon"])]);
        let out = compare(&a, &b, &[], &name_rules()).unwrap();

        let mut buf = Vec::new();
        write_pairs(&out, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "id1,id9,1.0,0.375");
        assert_eq!(lines[1], "id1,id8,0.0,1.0");
    }

    #[test]
    fn quotes_ids_containing_commas() {
        let mut out = WeightVectors::new();
        out.push(ScoredPair {
            id_a: "a,1".into(),
            id_b: "b1".into(),
            block_key: "k".into(),
            weights: vec![0.5],
            class: None,
        });
        let mut buf = Vec::new();
        write_pairs(&out, &mut buf).unwrap();
        assert!(String::from_utf8(buf).unwrap().starts_with("\"a,1\",b1,0.5"));
    }

    #[test]
    fn same_id_in_both_parties() {
        let a = store(Party::A, vec![("x", vec!["smith"]), ("y", vec!["jones"])]);
        let b = store(Party::B, vec![("x", vec!["smyth"])]);
        let matching = vec![MatchingRule::new("surname", 0, ComparatorSpec::EditDistance)];
        let out = compare(&a, &b, &[], &matching).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.get("x", "x"), Some(&[0.8][..]));
        assert_eq!(out.get("y", "x"), Some(&[0.0][..]));
    }

    #[test]
    fn index_from_another_store_is_rejected() {
        let a = store(Party::A, vec![("a1", vec!["k"])]);
        let b = store(Party::B, vec![("b1", vec!["k"])]);
        let other = store(Party::A, vec![("z9", vec!["k"])]);
        let blocking = vec![BlockingRule::new("k", 0, EncoderSpec::Exact)];
        let matching = vec![MatchingRule::new("k", 0, ComparatorSpec::Exact)];

        let ia = build_block_index(&other, &blocking).unwrap();
        let ib = build_block_index(&b, &blocking).unwrap();
        let overlap = intersect_blocks(&ia, &ib);
        let err = compare_blocks(&overlap, &ia, &ib, &a, &b, &matching).unwrap_err();
        assert!(matches!(err, LinkageError::IndexMismatch(ref m) if m.contains("z9")));
    }

    #[test]
    fn overlap_key_missing_from_index_is_rejected() {
        let a = store(Party::A, vec![("a1", vec!["k"])]);
        let b = store(Party::B, vec![("b1", vec!["k"])]);
        let blocking = vec![BlockingRule::new("k", 0, EncoderSpec::Exact)];
        let matching = vec![MatchingRule::new("k", 0, ComparatorSpec::Exact)];

        let ia = build_block_index(&a, &blocking).unwrap();
        let ib = build_block_index(&b, &blocking).unwrap();
        let overlap = BlockOverlap {
            common: vec!["k".to_string(), "q".to_string()],
            union_count: 2,
        };
        let err = compare_blocks(&overlap, &ia, &ib, &a, &b, &matching).unwrap_err();
        assert!(matches!(err, LinkageError::IndexMismatch(ref m) if m.contains("'q'")));
    }
}
