//! `reclink run | validate | blocks`: config-driven two-party record linkage.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde::Serialize;

use reclink_linkage::engine::{build_blocks, load_input, run_plan};
use reclink_linkage::intersect::candidate_count;
use reclink_linkage::matcher::write_pairs;
use reclink_linkage::model::PartySummary;
use reclink_linkage::summary::{party_summary, reduction_ratio};
use reclink_linkage::{LinkageConfig, LinkageError, LinkageResult};

use crate::exit_codes::{link_exit_code, EXIT_ERROR, EXIT_LINK_OUTPUT, EXIT_USAGE};
use crate::CliError;

#[derive(Subcommand)]
pub enum LinkCommands {
    /// Block, compare and classify two parties from a TOML config file
    #[command(after_help = "\
Examples:
  reclink run link.toml
  reclink run link.toml --output pairs.csv
  reclink run link.toml --output - --quiet | head
  reclink run link.toml --json > result.json
  reclink run link.toml --report report.json -v")]
    Run {
        /// Path to the linkage .toml config file
        config: PathBuf,

        /// Candidate pair file (default: [output].pairs from the config; '-' for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the full JSON result to stdout
        #[arg(long)]
        json: bool,

        /// Write the full JSON result to a file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Suppress the human summary on stderr
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Validate a linkage config without loading data
    #[command(after_help = "\
Examples:
  reclink validate link.toml")]
    Validate {
        /// Path to the linkage .toml config file
        config: PathBuf,
    },

    /// Load both parties and report block statistics without comparing
    #[command(after_help = "\
Examples:
  reclink blocks link.toml
  reclink blocks link.toml --json")]
    Blocks {
        /// Path to the linkage .toml config file
        config: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_link(cmd: LinkCommands) -> Result<(), CliError> {
    match cmd {
        LinkCommands::Run { config, output, json, report, quiet } => {
            cmd_run(config, output, json, report, quiet)
        }
        LinkCommands::Validate { config } => cmd_validate(config),
        LinkCommands::Blocks { config, json } => cmd_blocks(config, json),
    }
}

fn link_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

impl From<LinkageError> for CliError {
    fn from(err: LinkageError) -> Self {
        let hint = match &err {
            LinkageError::DuplicateIdentifier { .. } => {
                Some("record ids (first column) must be unique within each party".to_string())
            }
            LinkageError::AttributeIndex { .. } => {
                Some("check [schema] and attribute positions against the file's columns".to_string())
            }
            _ => None,
        };
        CliError { code: link_exit_code(&err), message: err.to_string(), hint }
    }
}

/// Read and validate a config; returns it with the directory its paths resolve against.
fn read_config(path: &Path) -> Result<(LinkageConfig, PathBuf), CliError> {
    let config_str = std::fs::read_to_string(path).map_err(|e| {
        link_err(EXIT_USAGE, format!("cannot read config {}: {e}", path.display()))
    })?;
    let config = LinkageConfig::from_toml(&config_str)?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    log::debug!("config '{}' loaded, paths relative to {}", config.name, base_dir.display());
    Ok((config, base_dir))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| link_err(EXIT_ERROR, format!("JSON serialization error: {e}")))
}

fn cmd_run(
    config_path: PathBuf,
    output: Option<PathBuf>,
    json_output: bool,
    report: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let pairs_to_stdout = output.as_deref() == Some(Path::new("-"));
    if pairs_to_stdout && json_output {
        return Err(link_err(EXIT_USAGE, "--output - and --json both write to stdout")
            .with_hint("write the pairs or the JSON result to a file"));
    }

    let (config, base_dir) = read_config(&config_path)?;
    let plan = config.plan()?;
    let input = load_input(&config, &plan, &base_dir)?;
    let result = run_plan(&config.name, &plan, &input)?;

    // Candidate pairs
    if pairs_to_stdout {
        let stdout = io::stdout();
        write_pairs(&result.pairs, stdout.lock())?;
    } else {
        let path = output.unwrap_or_else(|| base_dir.join(&config.output.pairs));
        let file = File::create(&path).map_err(|e| {
            link_err(EXIT_LINK_OUTPUT, format!("cannot write {}: {e}", path.display()))
        })?;
        write_pairs(&result.pairs, BufWriter::new(file))?;
        if !quiet {
            eprintln!("wrote {}", path.display());
        }
    }

    // JSON result
    if json_output || report.is_some() {
        let json_str = to_json(&result)?;
        if let Some(ref path) = report {
            std::fs::write(path, &json_str).map_err(|e| {
                link_err(EXIT_LINK_OUTPUT, format!("cannot write report: {e}"))
            })?;
            if !quiet {
                eprintln!("wrote {}", path.display());
            }
        }
        if json_output {
            println!("{json_str}");
        }
    }

    if !quiet {
        print_summary(&result);
    }
    Ok(())
}

fn print_summary(result: &LinkageResult) {
    let s = &result.summary;
    eprintln!(
        "{}: {} x {} records, {} common of {} blocks, {} candidate pairs (reduction ratio {:.4})",
        result.meta.config_name,
        s.party_a.records,
        s.party_b.records,
        s.common_blocks,
        s.union_blocks,
        s.candidate_pairs,
        s.reduction_ratio,
    );
    if !s.class_counts.is_empty() {
        let counts: Vec<String> = s
            .class_counts
            .iter()
            .map(|(class, n)| format!("{n} {class}"))
            .collect();
        eprintln!("{}: {}", result.meta.classifier, counts.join(", "));
    }
    let t = &result.meta.timings;
    eprintln!(
        "time: blocking {:.1}ms, matching {:.1}ms, classification {:.1}ms, total {:.1}ms",
        t.blocking_ms, t.matching_ms, t.classification_ms, t.total_ms,
    );
}

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, _) = read_config(&config_path)?;
    let plan = config.plan()?;
    eprintln!(
        "ok: {} ({} blocking, {} matching attribute(s), classifier {})",
        config.name,
        plan.blocking.len(),
        plan.matching.len(),
        plan.classifier.name(),
    );
    Ok(())
}

#[derive(Serialize)]
struct BlockReport {
    party_a: PartySummary,
    party_b: PartySummary,
    common_blocks: usize,
    union_blocks: usize,
    candidate_pairs: u64,
    cross_product: u64,
    reduction_ratio: f64,
}

fn cmd_blocks(config_path: PathBuf, json_output: bool) -> Result<(), CliError> {
    let (config, base_dir) = read_config(&config_path)?;
    let plan = config.plan()?;
    let input = load_input(&config, &plan, &base_dir)?;
    let blocks = build_blocks(&plan, &input)?;

    let candidate_pairs = candidate_count(&blocks.overlap, &blocks.index_a, &blocks.index_b);
    let cross_product = input.a.len() as u64 * input.b.len() as u64;
    let report = BlockReport {
        party_a: party_summary(&input.a, &blocks.index_a),
        party_b: party_summary(&input.b, &blocks.index_b),
        common_blocks: blocks.overlap.common_count(),
        union_blocks: blocks.overlap.union_count(),
        candidate_pairs,
        cross_product,
        reduction_ratio: reduction_ratio(candidate_pairs as usize, cross_product),
    };

    if json_output {
        println!("{}", to_json(&report)?);
        return Ok(());
    }

    let mut out = io::stdout().lock();
    let write = |out: &mut io::StdoutLock<'_>, line: String| {
        writeln!(out, "{line}").map_err(|e| link_err(EXIT_LINK_OUTPUT, e.to_string()))
    };
    for p in [&report.party_a, &report.party_b] {
        write(
            &mut out,
            format!(
                "{}: {} records in {} blocks (largest {})",
                p.label, p.records, p.blocks, p.largest_block
            ),
        )?;
    }
    write(
        &mut out,
        format!(
            "common blocks: {}, all unique blocks: {}",
            report.common_blocks, report.union_blocks
        ),
    )?;
    write(
        &mut out,
        format!(
            "candidate pairs: {} of {} (reduction ratio {:.4})",
            report.candidate_pairs, report.cross_product, report.reduction_ratio
        ),
    )?;
    Ok(())
}
