use anyhow::Result;
use beegraph::{pipeline, Config, RunOptions};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "beegraph")]
#[command(about = "Consolidate bee species and mutations from mod sources into one data set")]
#[command(version)]
struct Args {
    /// Config file (defaults to $BEEGRAPH_CONFIG, then ./beegraph.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only process these sources (repeatable)
    #[arg(long = "only", value_name = "NAME")]
    only: Vec<String>,

    /// Directory for generated files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write each source's extracted records and the skip diagnostics
    #[arg(long)]
    save_intermediate: bool,

    /// Directory for intermediate records
    #[arg(long)]
    intermediate_dir: Option<PathBuf>,

    /// Do not write the shortest-path mutation file
    #[arg(long)]
    no_shortest_path: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration before the logger so its log_level can seed the filter
    let config = match &args.config {
        Some(path) => {
            let _ = dotenv::dotenv();
            Config::load_from(path)?
        }
        None => Config::load()?,
    };

    // RUST_LOG still wins over the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", &config.pipeline.log_level)
    ).init();

    log::info!("Starting beegraph v{}", env!("CARGO_PKG_VERSION"));
    log::info!("{} sources configured", config.sources.len());

    let options = RunOptions {
        only: args.only,
        output_dir: args.output_dir,
        save_intermediate: args.save_intermediate,
        intermediate_dir: args.intermediate_dir,
        no_shortest_path: args.no_shortest_path,
    };

    let start = Instant::now();
    let report = pipeline::run(&config, &options)?;

    log::info!("=== Run Summary ===");
    log::info!(
        "Sources: {} parsed, {} missing, {} failed",
        report.sources_parsed.len(),
        report.sources_missing.len(),
        report.sources_failed.len()
    );
    log::info!("Species: {}", report.species);
    log::info!("Mutation groups: {}", report.groups);
    log::info!("Combs: {}", report.combs);
    let c = &report.consolidation;
    log::info!(
        "Relations: {} seen, {} accepted ({} into overrides), {} skipped",
        c.relations_seen,
        c.accepted,
        c.merged_into_override,
        c.skipped()
    );
    log::info!(
        "Skipped: {} duplicate of override, {} duplicate, {} unresolved ({} covered by overrides)",
        c.duplicate_of_override,
        c.duplicate_within_run,
        c.unresolved,
        c.unresolved_covered
    );
    if c.conflicts > 0 {
        log::warn!("{} chance conflicts kept as extra requirements", c.conflicts);
    }
    if let Some(groups) = report.shortest_path_groups {
        log::info!("Shortest-path groups: {} ({} unreachable species)", groups, report.unreachable);
    }
    for path in &report.written {
        log::info!("Wrote {}", path.display());
    }
    log::info!("Done in {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}
