use colored::Colorize;

use crate::prelude::{println, *};
use crate::registry::{RegistryClient, RegistryConfig};
use acervo_core::normalize::TaxonomyEntry;

/// Refs module app - root command
#[derive(Debug, clap::Parser)]
#[command(name = "refs")]
#[command(about = "List the registry taxonomy used for normalization")]
pub struct App {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let config = RegistryConfig::from_env()?;
    let registry = RegistryClient::new(&config)?;

    if global.verbose {
        println!("Registry base URL: {}", config.base_url);
    }

    let (categorias, locais, setores) = tokio::try_join!(
        registry.list_categorias(),
        registry.list_locais(),
        registry.list_setores(),
    )?;

    if app.json {
        let payload = serde_json::json!({
            "categorias": categorias,
            "locais": locais,
            "setores": setores,
        });
        std::println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    for (titulo, entradas) in [
        ("Categorias", &categorias),
        ("Locais", &locais),
        ("Setores", &setores),
    ] {
        println!("\n{}", titulo.bold().cyan());
        display_entries(entradas);
    }

    Ok(())
}

fn display_entries(entradas: &[TaxonomyEntry]) {
    if entradas.is_empty() {
        println!("  {}", "(vazio)".bright_black());
        return;
    }
    let mut table = new_table();
    for entrada in entradas {
        table.add_row(prettytable::row![entrada.codigo, entrada.nome]);
    }
    table.printstd();
}
