//! One run from configured sources to the generated data files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::combs::collect_combs;
use crate::config::{Config, SourceConfig};
use crate::consolidate::{consolidate, ChanceConflict, ConsolidationReport, SkipDiagnostic};
use crate::error::{BeegraphError, Result};
use crate::extract::{ExtractorRegistry, LangTable, SourceContext};
use crate::graph::build_shortest_paths;
use crate::model::IntermediateRecordSet;
use crate::overrides::OverrideSet;
use crate::store::{format_groups, write_pretty, write_with_header, InputFingerprint, OutputHeader};

pub const SPECIES_FILE: &str = "species.json";
pub const MUTATIONS_FILE: &str = "mutations.json";
pub const COMBS_FILE: &str = "combs.json";
pub const SHORTEST_FILE: &str = "mutations_shortest.json";
pub const DIAGNOSTICS_FILE: &str = "diagnostics.json";

/// Per-invocation overrides of the configured pipeline settings.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Restrict the run to these source names (empty = all).
    pub only: Vec<String>,
    pub output_dir: Option<PathBuf>,
    pub save_intermediate: bool,
    pub intermediate_dir: Option<PathBuf>,
    /// Force the shortest-path file off.
    pub no_shortest_path: bool,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub sources_parsed: Vec<String>,
    pub sources_missing: Vec<String>,
    pub sources_failed: Vec<String>,
    pub species: usize,
    pub groups: usize,
    pub combs: usize,
    pub consolidation: ConsolidationReport,
    pub shortest_path_groups: Option<usize>,
    pub unreachable: usize,
    pub written: Vec<PathBuf>,
}

/// Run the whole pipeline.
pub fn run(config: &Config, options: &RunOptions) -> Result<RunReport> {
    let registry = ExtractorRegistry::new();
    let mut fingerprint = InputFingerprint::new();
    let mut report = RunReport::default();

    let output_dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| config.pipeline.output_dir.clone());
    let intermediate_dir = options
        .intermediate_dir
        .clone()
        .unwrap_or_else(|| config.pipeline.intermediate_dir.clone());

    let selected = config.selected_sources(&options.only);
    for name in &options.only {
        if !selected.iter().any(|s| &s.name == name) {
            log::warn!("--only {}: no such source configured", name);
        }
    }

    let mut sets = Vec::new();
    for source in selected {
        if !source.path.exists() {
            log::warn!("Source {} not found at {}, skipping", source.name, source.path.display());
            report.sources_missing.push(source.name.clone());
            continue;
        }
        match extract_source(&registry, source, &mut fingerprint) {
            Ok(set) => {
                log::info!(
                    "Parsed {}: {} species, {} mutations",
                    source.name,
                    set.entities.len(),
                    set.relations.len()
                );
                report.sources_parsed.push(source.name.clone());
                sets.push(set);
            }
            Err(e) => {
                log::error!("Failed to parse source {}: {}", source.name, e);
                report.sources_failed.push(source.name.clone());
            }
        }
    }

    if sets.is_empty() {
        return Err(BeegraphError::NoSources);
    }

    let overrides = match &config.pipeline.override_path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|e| BeegraphError::OverrideParse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            fingerprint.add(&display_file(path), &content);
            let set = OverrideSet::parse(&content, &path.display().to_string())?;
            log::info!("Loaded {} override groups from {}", set.groups().len(), path.display());
            set
        }
        None => {
            log::info!("No override file configured");
            OverrideSet::default()
        }
    };

    let header = fingerprint.header();

    if options.save_intermediate {
        for set in &sets {
            let path = intermediate_dir.join(format!("{}.json", set.source));
            write_pretty(&path, &header, set)?;
            report.written.push(path);
        }
    }

    let result = consolidate(&sets, &overrides);

    let combs = collect_combs(&result.entities, &config.pipeline.comb_marker);

    let species_path = output_dir.join(SPECIES_FILE);
    write_pretty(&species_path, &header, &result.entities)?;
    report.written.push(species_path);

    let mutations_path = output_dir.join(MUTATIONS_FILE);
    write_with_header(&mutations_path, &header, &format_groups(&result.groups)?)?;
    report.written.push(mutations_path);

    let combs_path = output_dir.join(COMBS_FILE);
    write_pretty(&combs_path, &header, &combs)?;
    report.written.push(combs_path);

    if options.save_intermediate {
        let path = intermediate_dir.join(DIAGNOSTICS_FILE);
        write_diagnostics(&path, &header, &result.skipped, &result.conflicts)?;
        report.written.push(path);
    }

    if config.pipeline.shortest_path && !options.no_shortest_path {
        let shortest = build_shortest_paths(&result.entities, &result.groups);
        let path = output_dir.join(SHORTEST_FILE);
        write_with_header(&path, &header, &format_groups(&shortest.groups)?)?;
        report.written.push(path);
        log::info!(
            "Shortest paths: {} groups, max depth {}, {} unreachable",
            shortest.groups.len(),
            shortest.max_depth(),
            shortest.unreachable.len()
        );
        report.shortest_path_groups = Some(shortest.groups.len());
        report.unreachable = shortest.unreachable.len();
    }

    report.species = result.entities.len();
    report.groups = result.groups.len();
    report.combs = combs.len();
    report.consolidation = result.report;
    Ok(report)
}

/// Extract one source (a file, or every file under a directory in path order).
fn extract_source(
    registry: &ExtractorRegistry,
    source: &SourceConfig,
    fingerprint: &mut InputFingerprint,
) -> Result<IntermediateRecordSet> {
    let lang = match &source.lang {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => {
                fingerprint.add(&display_file(path), &content);
                Some(LangTable::parse(&content))
            }
            Err(e) => {
                log::warn!("Lang file {} for {} not readable: {}", path.display(), source.name, e);
                None
            }
        },
        None => None,
    };
    let ctx = SourceContext {
        name: &source.name,
        namespace: source.namespace(),
        lang: lang.as_ref(),
    };

    let mut set = IntermediateRecordSet::new(&source.name, source.namespace());
    for path in source_files(&source.path) {
        let content = fs::read_to_string(&path)?;
        let label = display_file(&path);
        fingerprint.add(&label, &content);
        let part = registry.extract(&source.dialect, &content, &label, &ctx)?;
        merge_set(&mut set, part);
    }
    Ok(set)
}

fn source_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .map(|e| e.into_path())
        .collect()
}

fn merge_set(into: &mut IntermediateRecordSet, part: IntermediateRecordSet) {
    into.entities.extend(part.entities);
    into.relations.extend(part.relations);
    for (branch, members) in part.groupings {
        into.groupings.entry(branch).or_default().extend(members);
    }
}

#[derive(Serialize)]
struct Diagnostics<'a> {
    skipped: BTreeMap<&'a str, Vec<&'a SkipDiagnostic>>,
    conflicts: &'a [ChanceConflict],
}

/// Skipped relations grouped by source, plus chance conflicts.
fn write_diagnostics(
    path: &Path,
    header: &OutputHeader,
    skipped: &[SkipDiagnostic],
    conflicts: &[ChanceConflict],
) -> Result<()> {
    let mut by_source: BTreeMap<&str, Vec<&SkipDiagnostic>> = BTreeMap::new();
    for diag in skipped {
        by_source.entry(diag.source.as_str()).or_default().push(diag);
    }
    write_pretty(path, header, &Diagnostics { skipped: by_source, conflicts })
}

fn display_file(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
