use crate::model::{BlockIndex, BlockOverlap};

/// Keys present in both indexes (sorted), plus the size of the key union.
pub fn intersect_blocks(a: &BlockIndex, b: &BlockIndex) -> BlockOverlap {
    // Walk the smaller index; BTreeMap keys keep the result sorted.
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let common: Vec<String> = small
        .keys()
        .filter(|k| large.contains_key(k))
        .map(str::to_string)
        .collect();
    let union_count = a.len() + b.len() - common.len();

    log::info!(
        "{} intersection blocks, {} unique blocks in total",
        common.len(),
        union_count
    );

    BlockOverlap {
        common,
        union_count,
    }
}

/// Number of candidate pairs the overlap yields: sum of |A bucket| * |B bucket|.
pub fn candidate_count(overlap: &BlockOverlap, a: &BlockIndex, b: &BlockIndex) -> u64 {
    overlap
        .common
        .iter()
        .map(|k| {
            let na = a.get(k).map_or(0, <[String]>::len) as u64;
            let nb = b.get(k).map_or(0, <[String]>::len) as u64;
            na * nb
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Party;

    fn index(party: Party, entries: &[(&str, &str)]) -> BlockIndex {
        let mut idx = BlockIndex::new(party);
        for (key, id) in entries {
            idx.push(key.to_string(), id.to_string());
        }
        idx
    }

    #[test]
    fn common_and_union() {
        let a = index(Party::A, &[("123", "id1"), ("543", "id2"), ("123", "id3")]);
        let b = index(Party::B, &[("129", "id9"), ("123", "id7"), ("000", "id8")]);
        let overlap = intersect_blocks(&a, &b);
        assert_eq!(overlap.common, vec!["123".to_string()]);
        assert_eq!(overlap.common_count(), 1);
        // 123, 543, 129, 000
        assert_eq!(overlap.union_count(), 4);
        assert_eq!(candidate_count(&overlap, &a, &b), 2);
    }

    #[test]
    fn disjoint_blocks() {
        let a = index(Party::A, &[("123", "id1"), ("543", "id2")]);
        let b = index(Party::B, &[("129", "id9"), ("000", "id8")]);
        let overlap = intersect_blocks(&a, &b);
        assert!(overlap.common.is_empty());
        assert_eq!(overlap.union_count(), 4);
        assert_eq!(candidate_count(&overlap, &a, &b), 0);
    }

    #[test]
    fn common_keys_sorted() {
        let a = index(Party::A, &[("zz", "1"), ("aa", "2"), ("mm", "3"), ("qq", "4")]);
        let b = index(Party::B, &[("mm", "9"), ("zz", "8"), ("aa", "7")]);
        let overlap = intersect_blocks(&a, &b);
        assert_eq!(overlap.common, vec!["aa", "mm", "zz"]);
        for key in &overlap.common {
            assert!(a.contains_key(key) && b.contains_key(key));
        }
    }

    #[test]
    fn empty_side() {
        let a = index(Party::A, &[("k", "1")]);
        let b = BlockIndex::new(Party::B);
        let overlap = intersect_blocks(&a, &b);
        assert_eq!(overlap.common_count(), 0);
        assert_eq!(overlap.union_count(), 1);
    }
}
