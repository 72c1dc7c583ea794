use color_eyre::Result;
use clap::Parser;
use ingetin::{Config, Profile, cli::{Cli, Commands}, utils::expand_path};

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // --dev keeps a separate config from the everyday one
    let profile = if cli.dev {
        Profile::Dev
    } else {
        Profile::Prod
    };

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_path(&expand_path(path))?,
        None => Config::load_with_profile(profile)?,
    };

    // RUST_LOG still wins over the configured level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    match cli.command {
        Commands::Check { reminder, time } => {
            ingetin::cli::handle_check(reminder, time, &config)?;
        }
        Commands::Plan { file } => {
            ingetin::cli::handle_plan(file, &config)?;
        }
        Commands::Watch { file, simulate } => {
            ingetin::cli::handle_watch(file, simulate, &config)?;
        }
    }

    Ok(())
}
