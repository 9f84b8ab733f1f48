mod cli;
mod commands;
mod config;
mod diagnostic;
mod error;
mod logging;
mod output;

use clap::Parser;

use crate::error::CliError;
use crate::output::OutputContext;

fn main() {
    let cli = cli::Cli::parse();

    if let cli::Commands::Completions(args) = cli.command {
        exit_with(commands::completions::run(args), &OutputContext::fallback());
    }

    let settings = match config::load_config(cli.global.config.as_deref())
        .and_then(|config| config::resolve_settings(&config, &cli.global))
    {
        Ok(settings) => settings,
        Err(e) => exit_with(Err(e), &OutputContext::fallback()),
    };
    logging::init(&settings.log_filter);
    let output = OutputContext::new(&settings, cli.global.quiet);
    tracing::debug!(format = ?settings.format, "starting");

    let result = match cli.command {
        cli::Commands::Build(args) => commands::build::run(args, &settings, &output),
        cli::Commands::Decompile(args) => commands::decompile::run(args, &output),
        cli::Commands::Check(args) => commands::check::run(args, &output),
        cli::Commands::Completions(args) => commands::completions::run(args),
    };

    exit_with(result, &output);
}

fn exit_with(result: Result<(), CliError>, output: &OutputContext) -> ! {
    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            output.print_error(&e);
            std::process::exit(e.exit_code() as i32);
        }
    }
}
