//! Validate command - run the pipeline over one request.

use std::io::Read;
use std::path::PathBuf;

use colored::Colorize;
use chartguard::{ValidatedRequest, ValidationError, ValidationPipeline};

use super::{load_catalog, load_config};

pub struct ValidateArgs {
    pub request: PathBuf,
    pub datasets: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub performance: bool,
    pub no_dataset_layer: bool,
}

/// Returns `Ok(false)` when the request was rejected.
pub fn run(args: ValidateArgs) -> Result<bool, Box<dyn std::error::Error>> {
    let input = read_request(&args.request)?;
    let config = load_config(args.config.as_deref())?;

    let mut pipeline = ValidationPipeline::with_config(config);
    if !args.no_dataset_layer {
        match &args.datasets {
            Some(path) => pipeline = pipeline.with_repository(load_catalog(path)?),
            None => tracing::warn!("no dataset catalog given; dataset checks follow the layer policy"),
        }
    }
    if args.performance {
        pipeline = pipeline.with_performance_heuristics();
    }

    match pipeline.validate_json(&input) {
        Ok(validated) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&validated)?);
            } else {
                print_accepted(&validated)?;
            }
            Ok(true)
        }
        Err(err) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&err)?);
            } else {
                print_rejected(&err, 0);
            }
            Ok(false)
        }
    }
}

fn read_request(path: &PathBuf) -> Result<String, Box<dyn std::error::Error>> {
    if path.as_os_str() == "-" {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input)?;
        return Ok(input);
    }
    std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read request {}: {}", path.display(), e).into())
}

fn print_accepted(validated: &ValidatedRequest) -> Result<(), serde_json::Error> {
    println!(
        "{} dataset {} ({} chart)",
        "✓ Request accepted for".green().bold(),
        validated.dataset_id.to_string().white().bold(),
        validated.config.chart_type()
    );

    for layer in &validated.skipped_layers {
        println!("  {} {} checks were skipped", "!".yellow(), layer);
    }
    for warning in &validated.warnings {
        println!("  {} {} [{}]", "!".yellow(), warning.message, warning.error_code.dimmed());
    }

    println!();
    println!("{}", "Normalized config:".cyan().bold());
    println!("{}", serde_json::to_string_pretty(&validated.config)?);
    Ok(())
}

fn print_rejected(err: &ValidationError, depth: usize) {
    let indent = "  ".repeat(depth);
    if depth == 0 {
        println!("{} {}", "✗ Request rejected:".red().bold(), err.message.white().bold());
    } else {
        println!("{}- {}", indent, err.message.white());
    }
    println!("{}  code: {} ({})", indent, err.error_code.yellow(), err.error_type);
    println!("{}  {}", indent, err.details);

    if !err.suggestions.is_empty() {
        println!("{}  {}", indent, "Suggestions:".cyan());
        for suggestion in &err.suggestions {
            println!("{}    • {}", indent, suggestion);
        }
    }

    if let Some(errors) = &err.validation_errors {
        println!();
        println!("{}  {} ({})", indent, "All problems".yellow().bold(), errors.len());
        for nested in errors {
            print_rejected(nested, depth + 1);
        }
    }
}
