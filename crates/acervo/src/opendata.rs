//! Client for the open-data source.

use serde::Deserialize;

use crate::error::Error;
use acervo_core::opendata::OpenDataRecord;

const DADOS_API_BASE: &str = "https://dados.gov.br/api/patrimonio";

pub fn get_api_base() -> String {
    std::env::var("ACERVO_DADOS_URL").unwrap_or_else(|_| DADOS_API_BASE.to_string())
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    registros: Vec<OpenDataRecord>,
}

/// Search open-data asset records. Pagination is supplied by the caller.
pub async fn search(filtro: &str, limit: usize, offset: usize) -> Result<Vec<OpenDataRecord>, Error> {
    let client = reqwest::Client::new();
    let url = format!("{}/bens", get_api_base());
    let resp = client
        .get(&url)
        .query(&[
            ("q", filtro.to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ])
        .send()
        .await?
        .error_for_status()?;

    let body: SearchResponse = resp.json().await?;
    Ok(body.registros)
}
