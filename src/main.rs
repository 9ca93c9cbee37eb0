//! Binary entry point: resolve configuration, start logging, open the catalog
//! and hand control to the terminal UI until the user exits.
use anyhow::Context;
use clap::Parser;
use tracing::info;

use verbax::cli::Cli;
use verbax::config::AppConfig;
use verbax::{logging, open_catalog, run_app, App};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?
        .apply_cli(&cli);

    logging::init(&config.logging)?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting verbax");

    let conn = open_catalog(&config.database)?;
    let mut app = App::load(conn)?;
    run_app(&mut app)?;

    info!("verbax exited");
    Ok(())
}
