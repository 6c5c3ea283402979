use anyhow::{Context, Result};
use beegraph::pipeline::{MUTATIONS_FILE, SPECIES_FILE};
use beegraph::store::read_commented_json;
use beegraph::{build_shortest_paths, Config, Entity, Group};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stats")]
#[command(about = "Report counts and breeding depths for generated beegraph data")]
struct Args {
    /// Directory holding species.json and mutations.json (defaults to the configured output_dir)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// List every unreachable species
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let dir = match args.dir {
        Some(dir) => dir,
        None => Config::load()?.pipeline.output_dir,
    };

    let species_path = dir.join(SPECIES_FILE);
    let entities: BTreeMap<String, Entity> = read_commented_json(&species_path)
        .with_context(|| format!("Failed to read {}", species_path.display()))?;
    let mutations_path = dir.join(MUTATIONS_FILE);
    let groups: Vec<Group> = read_commented_json(&mutations_path)
        .with_context(|| format!("Failed to read {}", mutations_path.display()))?;

    let mutations: usize = groups.iter().map(|g| g.children.len()).sum();
    let requirements: usize = groups
        .iter()
        .flat_map(|g| g.children.values())
        .map(|e| e.requirements.len())
        .sum();

    let mut branches: BTreeMap<&str, usize> = BTreeMap::new();
    for entity in entities.values() {
        *branches
            .entry(entity.branch.as_deref().unwrap_or("(none)"))
            .or_insert(0) += 1;
    }

    let shortest = build_shortest_paths(&entities, &groups);

    println!("\n=== beegraph Data Statistics ===\n");
    println!("Data directory: {}", dir.display());
    println!("{:-<60}", "");
    println!("{:<30} {:>10}", "Species", entities.len());
    println!("{:<30} {:>10}", "Parent pairs", groups.len());
    println!("{:<30} {:>10}", "Mutations", mutations);
    println!("{:<30} {:>10}", "Conditional variants", requirements);
    println!("{:<30} {:>10}", "Base species", shortest.base.len());
    println!("{:<30} {:>10}", "Unreachable species", shortest.unreachable.len());
    println!("{:<30} {:>10}", "Max breeding depth", shortest.max_depth());
    println!("{:-<60}", "");

    println!("\nSpecies by Branch:\n");
    for (branch, count) in &branches {
        println!("  {:<28} {:>10}", branch, count);
    }

    println!("\nDepth Distribution:\n");
    for (depth, count) in shortest.depth_histogram() {
        println!("  depth {:<22} {:>10}", depth, count);
    }

    println!("\nBase Species:\n");
    for key in &shortest.base {
        let name = entities.get(key).map_or(key.as_str(), |e| e.name.as_str());
        println!("  {} ({})", name, key);
    }

    if !shortest.unreachable.is_empty() {
        println!("\nUnreachable Species:\n");
        if args.verbose {
            for key in &shortest.unreachable {
                println!("  {}", key);
            }
        } else {
            println!("  {} species (use --verbose to list)", shortest.unreachable.len());
        }
    }

    println!();
    Ok(())
}
