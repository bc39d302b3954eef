//! CLI command implementations: resolve, check, index, query.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::checker::Checker;
use crate::config::Config;
use crate::error::Error;
use crate::index::{self, GuidIndex};
use crate::meta::MetaParser;
use crate::report::Report;
use crate::resolver::{CancelFlag, Resolver};
use crate::types::Guid;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Build the primary indexes for a run. Explicit roots win; otherwise
/// each seed's repository root is auto-discovered, deduplicated, and
/// seeds with no marker above them fall back to a degraded
/// directory-only index.
///
/// # Errors
///
/// Returns `Error::RootNotFound` for an explicit root that doesn't
/// exist or a seed with no usable parent directory.
fn build_indexes(
    seeds: &[PathBuf],
    roots: &[PathBuf],
    config: &Config,
    parser: &MetaParser,
) -> Result<Vec<GuidIndex>, Error> {
    let mut indexes = Vec::new();

    if !roots.is_empty() {
        for root in roots {
            indexes.push(GuidIndex::build(root, config, parser)?);
        }
        return Ok(indexes);
    }

    let mut marker_roots: BTreeSet<PathBuf> = BTreeSet::new();
    // One representative seed per markerless directory.
    let mut degraded: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
    for seed in seeds {
        match index::discover_root(seed) {
            None => {
                if let Some(parent) = seed.parent() {
                    degraded
                        .entry(parent.to_path_buf())
                        .or_insert_with(|| return seed.clone());
                }
            },
            Some(root) => {
                marker_roots.insert(root);
            },
        }
    }

    for root in &marker_roots {
        indexes.push(GuidIndex::build(root, config, parser)?);
    }
    for seed in degraded.values() {
        indexes.push(GuidIndex::build_for_seed(seed, config, parser)?);
    }
    return Ok(indexes);
}

/// Resolve the seed set and print only the issues found.
///
/// # Errors
///
/// Returns errors from config loading, index building, or resolution.
pub fn check(
    files: &[PathBuf],
    roots: &[PathBuf],
    mirror: Option<&Path>,
    json: bool,
) -> Result<ExitCode, Error> {
    let report = run_pipeline(files, roots, mirror)?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        print_markdown(&report.render_issues());
        if report.partial_index {
            eprintln!("note: index may be incomplete (no repository marker found)");
        }
    }
    return Ok(ExitCode::from(report.exit_status()));
}

/// Build and summarize the identifier index for one root.
///
/// # Errors
///
/// Returns errors from config loading or index building.
pub fn index(root: &Path, json: bool) -> Result<ExitCode, Error> {
    let config = Config::load(&PathBuf::from("."))?;
    let built = GuidIndex::build(root, &config, &MetaParser::new())?;

    if json {
        let summary = serde_json::json!({
            "duplicates": built.duplicates(),
            "root": built.root(),
            "total_identifiers": built.len(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{} identifiers under {}", built.len(), built.root().display());
        for (guid, paths) in built.duplicates() {
            println!("DUPLICATE  {guid}");
            for path in paths {
                println!("  {}", path.display());
            }
        }
    }

    if built.duplicates().is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    return Ok(ExitCode::from(1));
}

/// Print a markdown block with bold headings, readable in a plain
/// terminal.
fn print_markdown(markdown: &str) {
    for line in markdown.lines() {
        if line.starts_with('#') {
            println!("{BOLD}{line}{RESET}");
        } else {
            println!("{line}");
        }
    }
}

/// Look one identifier up across the configured roots and print the
/// owning asset path.
///
/// # Errors
///
/// Returns `Error::GuidInvalid` for a malformed identifier, plus
/// config/index errors.
pub fn query(input: &str, roots: &[PathBuf]) -> Result<ExitCode, Error> {
    let Some(guid) = Guid::parse(input) else {
        return Err(Error::GuidInvalid { input: input.to_string() });
    };

    let config = Config::load(&PathBuf::from("."))?;
    let parser = MetaParser::new();
    let roots: Vec<PathBuf> = if roots.is_empty() {
        if config.roots().is_empty() {
            vec![PathBuf::from(".")]
        } else {
            config.roots().to_vec()
        }
    } else {
        roots.to_vec()
    };

    for root in &roots {
        let built = GuidIndex::build(root, &config, &parser)?;
        if let Some(path) = built.get(&guid) {
            println!("{}", path.display());
            return Ok(ExitCode::SUCCESS);
        }
    }

    eprintln!("{guid} not found in any supplied root");
    return Ok(ExitCode::from(1));
}

/// Compute the full dependency closure of the given files and print
/// the complete report.
///
/// # Errors
///
/// Returns errors from config loading, index building, or resolution.
pub fn resolve(
    files: &[PathBuf],
    roots: &[PathBuf],
    mirror: Option<&Path>,
    json: bool,
) -> Result<ExitCode, Error> {
    let report = run_pipeline(files, roots, mirror)?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        print_markdown(&report.render());
    }
    return Ok(ExitCode::from(report.exit_status()));
}

/// Shared pipeline: load config, build indexes (and the mirror index
/// if configured), resolve the closure, classify issues, assemble the
/// report.
///
/// # Errors
///
/// Returns errors from config loading, index building, or resolution.
fn run_pipeline(
    files: &[PathBuf],
    cli_roots: &[PathBuf],
    cli_mirror: Option<&Path>,
) -> Result<Report, Error> {
    let config = Config::load(&PathBuf::from("."))?;
    let parser = MetaParser::new();

    let roots: Vec<PathBuf> = if cli_roots.is_empty() {
        config.roots().to_vec()
    } else {
        cli_roots.to_vec()
    };
    let indexes = build_indexes(files, &roots, &config, &parser)?;
    let partial = indexes.iter().any(GuidIndex::partial);

    let mirror_root: Option<PathBuf> = cli_mirror
        .map(Path::to_path_buf)
        .or_else(|| return config.mirror().map(Path::to_path_buf));
    let mirror = match &mirror_root {
        None => None,
        Some(path) => Some(GuidIndex::build(path, &config, &parser)?),
    };

    let builtins = config.builtin_table()?;
    let resolver = Resolver::new(builtins.clone());
    let index_refs: Vec<&GuidIndex> = indexes.iter().collect();
    let result = resolver.resolve(files, &index_refs, &CancelFlag::new())?;

    let checker = Checker::new(builtins);
    let issues = checker.check(&result, &index_refs, mirror.as_ref());

    return Ok(Report::build(result, issues, partial));
}
