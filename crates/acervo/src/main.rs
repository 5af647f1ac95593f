#![allow(unused)]

use crate::prelude::*;
use clap::Parser;

mod error;
mod import;
mod opendata;
mod prelude;
mod refs;
mod registry;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Staged ingestion of institutional asset reports and open data into the registry"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "ACERVO_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Import assets from a PDF report or the open-data source
    Import(crate::import::App),

    /// List the registry taxonomy (categories, locations, sectors)
    Refs(crate::refs::App),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Import(sub_app) => crate::import::run(sub_app, app.global).await,
        SubCommands::Refs(sub_app) => crate::refs::run(sub_app, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
