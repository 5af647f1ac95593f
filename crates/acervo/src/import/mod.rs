use crate::prelude::{println, *};

pub mod dados;
pub mod flow;
pub mod pdf_report;

/// Import module app - root command
#[derive(Debug, clap::Parser)]
#[command(name = "import")]
#[command(about = "Staged import of assets into the registry")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Extract staging records from an institutional PDF report
    #[clap(name = "pdf")]
    Pdf(pdf_report::PdfOptions),

    /// Fetch staging records from the open-data source
    #[clap(name = "dados")]
    Dados(dados::DadosOptions),
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    if global.verbose {
        println!("Running import command...");
    }

    match app.command {
        Commands::Pdf(options) => pdf_report::run(options, global).await,
        Commands::Dados(options) => dados::run(options, global).await,
    }
}
