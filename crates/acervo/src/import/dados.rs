use colored::Colorize;

use super::flow::{self, ReviewOptions};
use crate::prelude::{println, *};
use acervo_core::opendata::map_record;
use acervo_core::session::{Fonte, ImportSession};

#[derive(Debug, clap::Args)]
pub struct DadosOptions {
    /// Free-text filter passed to the open-data search
    #[arg(value_name = "FILTER", default_value = "")]
    pub filtro: String,

    /// Number of records to fetch
    #[arg(short, long, env = "ACERVO_DADOS_LIMIT", default_value = "50")]
    pub limit: usize,

    /// Offset into the search results
    #[arg(long, default_value = "0")]
    pub offset: usize,

    #[clap(flatten)]
    pub review: ReviewOptions,
}

pub async fn run(options: DadosOptions, global: crate::Global) -> Result<()> {
    if global.verbose {
        println!("Open-data API Base: {}", crate::opendata::get_api_base());
    }

    let mut session = ImportSession::new();
    let token = session.begin_extraction(Fonte::DadosAbertos {
        filtro: options.filtro.clone(),
    })?;

    let registros = match crate::opendata::search(&options.filtro, options.limit, options.offset)
        .await
    {
        Ok(registros) => registros,
        Err(e) => {
            session.fail_extraction(token, e.to_string())?;
            return Err(eyre!("Open-data search failed: {e}"));
        }
    };

    let records = registros.iter().map(map_record).collect();
    session.complete_extraction(token, records)?;
    if let Some(aviso) = session.aviso() {
        println!("{}", aviso.yellow());
    }

    flow::review_and_commit(&mut session, &options.review, &global).await
}
