use std::collections::BTreeMap;

use crate::model::{
    BlockIndex, BlockOverlap, LinkageSummary, PartySummary, RecordStore, WeightVectors,
};

pub fn party_summary(store: &RecordStore, index: &BlockIndex) -> PartySummary {
    PartySummary {
        label: store.label.clone(),
        records: store.len(),
        blocks: index.len(),
        largest_block: index.largest_block(),
    }
}

/// Fraction of the full cross product that blocking avoided.
pub fn reduction_ratio(candidate_pairs: usize, cross_product: u64) -> f64 {
    if cross_product == 0 {
        return 0.0;
    }
    1.0 - candidate_pairs as f64 / cross_product as f64
}

/// Compute summary statistics for a finished run.
pub fn compute_summary(
    stores: (&RecordStore, &RecordStore),
    indexes: (&BlockIndex, &BlockIndex),
    overlap: &BlockOverlap,
    pairs: &WeightVectors,
    class_counts: BTreeMap<String, usize>,
) -> LinkageSummary {
    let cross_product = stores.0.len() as u64 * stores.1.len() as u64;
    LinkageSummary {
        party_a: party_summary(stores.0, indexes.0),
        party_b: party_summary(stores.1, indexes.1),
        common_blocks: overlap.common_count(),
        union_blocks: overlap.union_count(),
        candidate_pairs: pairs.len(),
        cross_product,
        reduction_ratio: reduction_ratio(pairs.len(), cross_product),
        class_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_bounds() {
        assert_eq!(reduction_ratio(0, 0), 0.0);
        assert_eq!(reduction_ratio(0, 100), 1.0);
        assert_eq!(reduction_ratio(100, 100), 0.0);
        assert!((reduction_ratio(25, 100) - 0.75).abs() < 1e-12);
    }
}
