use std::path::Path;
use std::time::Instant;

use crate::blocking::build_block_index;
use crate::classify::classify_pairs;
use crate::config::{LinkageConfig, LinkagePlan};
use crate::error::LinkageError;
use crate::intersect::intersect_blocks;
use crate::matcher::compare_blocks;
use crate::model::{
    BlockIndex, BlockOverlap, LinkageInput, LinkageMeta, LinkageResult, Party, PhaseTimings,
};
use crate::store::load_party;
use crate::summary::compute_summary;

/// Block indexes of both parties and their overlap.
#[derive(Debug, Clone)]
pub struct Blocking {
    pub index_a: BlockIndex,
    pub index_b: BlockIndex,
    pub overlap: BlockOverlap,
}

/// Blocking phase only: build both indexes and intersect them.
pub fn build_blocks(plan: &LinkagePlan, input: &LinkageInput) -> Result<Blocking, LinkageError> {
    let index_a = build_block_index(&input.a, &plan.blocking)?;
    let index_b = build_block_index(&input.b, &plan.blocking)?;
    let overlap = intersect_blocks(&index_a, &index_b);
    Ok(Blocking {
        index_a,
        index_b,
        overlap,
    })
}

/// Run linkage per config on pre-loaded records.
pub fn run(config: &LinkageConfig, input: &LinkageInput) -> Result<LinkageResult, LinkageError> {
    let plan = config.plan()?;
    run_plan(&config.name, &plan, input)
}

/// Run blocking, comparison and classification with a resolved plan.
pub fn run_plan(
    name: &str,
    plan: &LinkagePlan,
    input: &LinkageInput,
) -> Result<LinkageResult, LinkageError> {
    let start = Instant::now();
    let blocks = build_blocks(plan, input)?;
    let blocking_ms = ms_since(start);

    let start = Instant::now();
    let mut pairs = compare_blocks(
        &blocks.overlap,
        &blocks.index_a,
        &blocks.index_b,
        &input.a,
        &input.b,
        &plan.matching,
    )?;
    let matching_ms = ms_since(start);

    let start = Instant::now();
    let class_counts = classify_pairs(&mut pairs, plan.classifier.as_ref());
    let classification_ms = ms_since(start);

    let summary = compute_summary(
        (&input.a, &input.b),
        (&blocks.index_a, &blocks.index_b),
        &blocks.overlap,
        &pairs,
        class_counts,
    );

    let timings = PhaseTimings {
        blocking_ms,
        matching_ms,
        classification_ms,
        total_ms: blocking_ms + matching_ms + classification_ms,
    };
    log::info!(
        "blocking {:.1}ms, matching {:.1}ms, classification {:.1}ms, total {:.1}ms",
        timings.blocking_ms,
        timings.matching_ms,
        timings.classification_ms,
        timings.total_ms,
    );

    Ok(LinkageResult {
        meta: LinkageMeta {
            config_name: name.to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            classifier: plan.classifier.name().to_string(),
            timings,
        },
        summary,
        pairs,
    })
}

/// Load both parties. Relative file paths resolve against `base_dir`.
pub fn load_input(
    config: &LinkageConfig,
    plan: &LinkagePlan,
    base_dir: &Path,
) -> Result<LinkageInput, LinkageError> {
    let load = |party: Party| {
        let path = base_dir.join(&config.parties.get(party).file);
        load_party(party, &config.label(party), &path, plan.width)
    };
    Ok(LinkageInput {
        a: load(Party::A)?,
        b: load(Party::B)?,
    })
}

/// Load both parties per config and run the full pipeline.
pub fn run_from_config(config: &LinkageConfig, base_dir: &Path) -> Result<LinkageResult, LinkageError> {
    let plan = config.plan()?;
    let input = load_input(config, &plan, base_dir)?;
    run_plan(&config.name, &plan, &input)
}

fn ms_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
