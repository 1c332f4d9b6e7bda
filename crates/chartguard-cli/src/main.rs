//! Chartguard CLI - validate chart requests against dataset catalogs.

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_format, cli.verbose);

    let result = match cli.command {
        Commands::Validate {
            request,
            datasets,
            config,
            json,
            performance,
            no_dataset_layer,
        } => commands::validate::run(commands::validate::ValidateArgs {
            request,
            datasets,
            config,
            json,
            performance,
            no_dataset_layer,
        }),

        Commands::Suggest {
            name,
            dataset,
            datasets,
            config,
        } => commands::suggest::run(name, dataset, datasets, config).map(|()| true),

        Commands::Templates { json } => commands::templates::run(json).map(|()| true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
