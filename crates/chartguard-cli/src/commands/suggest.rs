//! Suggest command - look a name up in a dataset.

use std::path::PathBuf;

use colored::Colorize;
use chartguard::validation::suggest_similar;
use chartguard::{DatasetId, DatasetRepository};

use super::{load_catalog, load_config};

pub fn run(
    name: String,
    dataset: String,
    datasets: PathBuf,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config.as_deref())?;
    let catalog = load_catalog(&datasets)?;
    let id: DatasetId = dataset.parse()?;

    let context = catalog
        .resolve(&id)?
        .ok_or_else(|| format!("Dataset {} not found in {}", id, datasets.display()))?;

    if let Some(resolved) = context.resolve(&name) {
        println!(
            "{} '{}' resolves to '{}' ({}, {})",
            "✓".green().bold(),
            name,
            resolved.name().white().bold(),
            resolved.kind().as_str(),
            resolved.type_label()
        );
        return Ok(());
    }

    let matches = suggest_similar(
        &name,
        &context,
        config.max_fuzzy_suggestions,
        config.fuzzy_cutoff,
    );

    if matches.is_empty() {
        println!(
            "{} No close matches for '{}' in {}",
            "✗".red().bold(),
            name,
            context.qualified_name()
        );
        let names: Vec<&str> = context.candidates().map(|c| c.name()).collect();
        if !names.is_empty() {
            println!("  Available: {}", names.join(", "));
        }
        return Ok(());
    }

    println!("{} '{}':", "Closest matches for".cyan().bold(), name);
    for m in matches {
        println!(
            "  {} {} ({}, {}) {:.0}%",
            "•".cyan(),
            m.name.white().bold(),
            m.kind.as_str(),
            m.type_label,
            m.score * 100.0
        );
    }
    Ok(())
}
