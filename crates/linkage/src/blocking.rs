use std::time::Instant;

use crate::encode::Encoder;
use crate::error::LinkageError;
use crate::model::{BlockIndex, Record, RecordStore, NO_BLOCK_KEY};

/// One blocking attribute: where to read it and how to encode it.
pub struct BlockingRule {
    pub attribute: String,
    pub position: usize,
    pub encoder: Box<dyn Encoder>,
}

impl BlockingRule {
    pub fn new(attribute: impl Into<String>, position: usize, encoder: impl Encoder + 'static) -> Self {
        Self {
            attribute: attribute.into(),
            position,
            encoder: Box::new(encoder),
        }
    }
}

impl std::fmt::Debug for BlockingRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingRule")
            .field("attribute", &self.attribute)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

/// Concatenate the encoded blocking attributes of one record, in rule order.
pub fn block_key(
    store: &RecordStore,
    record: &Record,
    rules: &[BlockingRule],
) -> Result<String, LinkageError> {
    if rules.is_empty() {
        return Ok(NO_BLOCK_KEY.to_string());
    }
    let mut key = String::new();
    for rule in rules {
        let value = store.value(record, rule.position)?;
        key.push_str(&rule.encoder.encode(value));
    }
    Ok(key)
}

/// Group every record id of `store` under its block key.
pub fn build_block_index(store: &RecordStore, rules: &[BlockingRule]) -> Result<BlockIndex, LinkageError> {
    let start = Instant::now();
    let attrs: Vec<&str> = rules.iter().map(|r| r.attribute.as_str()).collect();
    log::info!("build block index for {} on attributes {:?}", store.label, attrs);

    let mut index = BlockIndex::new(store.party);
    for record in store.iter() {
        let key = block_key(store, record, rules)?;
        index.push(key, record.id.clone());
    }

    log::info!(
        "generated {} blocks for {} ({} records, largest block {}) in {:.3}s",
        index.len(),
        store.label,
        store.len(),
        index.largest_block(),
        start.elapsed().as_secs_f64(),
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::EncoderSpec;
    use crate::model::Party;

    fn store(rows: Vec<(&str, Vec<&str>)>) -> RecordStore {
        let records = rows.into_iter().enumerate().map(|(i, (id, fields))| {
            Record::new(id, fields.into_iter().map(String::from).collect(), i + 2)
        });
        RecordStore::from_records(Party::A, "p1", records).unwrap()
    }

    #[test]
    fn groups_by_prefix() {
        let s = store(vec![
            ("id1", vec!["smith", "jon", "12345"]),
            ("id2", vec!["jones", "ann", "54321"]),
            ("id3", vec!["smyth", "john", "12399"]),
        ]);
        let rules = vec![BlockingRule::new("postcode", 2, EncoderSpec::Prefix(3))];
        let index = build_block_index(&s, &rules).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("123").unwrap(), &["id1".to_string(), "id3".to_string()]);
        assert_eq!(index.get("543").unwrap(), &["id2".to_string()]);
        assert_eq!(index.record_count(), 3);
    }

    #[test]
    fn compound_key_follows_rule_order() {
        let s = store(vec![("id1", vec!["smith", "jon", "12345"])]);
        let rules = vec![
            BlockingRule::new("postcode", 2, EncoderSpec::Prefix(2)),
            BlockingRule::new("surname", 0, EncoderSpec::Soundex),
        ];
        let index = build_block_index(&s, &rules).unwrap();
        assert!(index.contains_key("12s530"));
    }

    #[test]
    fn no_rules_uses_sentinel() {
        let s = store(vec![("id1", vec!["a"]), ("id2", vec!["b"]), ("id3", vec!["c"])]);
        let index = build_block_index(&s, &[]).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(NO_BLOCK_KEY).unwrap().len(), 3);
    }

    #[test]
    fn bucket_keeps_load_order() {
        let s = store(vec![("z", vec!["x"]), ("a", vec!["x"]), ("m", vec!["x"])]);
        let rules = vec![BlockingRule::new("#0", 0, EncoderSpec::Exact)];
        let index = build_block_index(&s, &rules).unwrap();
        assert_eq!(index.get("x").unwrap(), &["z".to_string(), "a".to_string(), "m".to_string()]);
    }

    #[test]
    fn position_out_of_range() {
        let s = store(vec![("id1", vec!["smith", "jon", "12345"]), ("id2", vec!["jones"])]);
        let rules = vec![BlockingRule::new("given_name", 1, EncoderSpec::Soundex)];
        let err = build_block_index(&s, &rules).unwrap_err();
        match err {
            LinkageError::AttributeIndex {
                record_id,
                position,
                field_count,
                ..
            } => {
                assert_eq!(record_id, "id2");
                assert_eq!(position, 1);
                assert_eq!(field_count, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn custom_encoder_closure() {
        let s = store(vec![("id1", vec!["Smith"]), ("id2", vec!["SMITH"])]);
        let rules = vec![BlockingRule::new("surname", 0, |v: &str| v.to_lowercase())];
        let index = build_block_index(&s, &rules).unwrap();
        assert_eq!(index.len(), 1);
    }
}
