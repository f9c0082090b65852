//! Mnemos Control - CLI client for the Mnemos analysis assistant

use anyhow::Result;
use clap::Parser;
use mnemosctl::cli::{Cli, Commands};
use mnemosctl::commands::{self, AppContext};
use mnemosctl::errors::{exit_code_for, EXIT_SUCCESS};
use mnemosctl::repl;
use mnemos_common::render::{color_enabled, paint};
use owo_colors::OwoColorize;

async fn run(cli: Cli) -> Result<()> {
    let ctx = AppContext::load(cli.inference_url, cli.api_url)?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => repl::start(&ctx).await,
        Commands::AnalyzeImage { path, json } => commands::analyze_image(&ctx, &path, json).await,
        Commands::AnalyzeBio { bio, json } => commands::analyze_bio(&ctx, &bio, json).await,
        Commands::Health { json } => commands::health(&ctx, json).await,
        Commands::Login { email, password } => commands::login(&ctx, &email, password).await,
        Commands::Logout => commands::logout(&ctx),
        Commands::Whoami => commands::whoami(&ctx).await,
        Commands::Config { init } => commands::config(&ctx, init),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    mnemos_common::logging::init(cli.verbose);

    let code = match run(cli).await {
        Ok(()) => EXIT_SUCCESS,
        Err(err) => {
            let color = color_enabled(&std::io::stderr());
            let label = paint(color, "error:", |t| t.bright_red().bold().to_string());
            eprintln!("{} {:#}", label, err);
            exit_code_for(&err)
        }
    };

    std::process::exit(code);
}
