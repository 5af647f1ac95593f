//! Open-data records mapped onto the shared staging shape.
//!
//! The open-data source already delimits fields, so this adapter is a
//! direct rename/coercion pass. Numeric coercion reuses [`Valor::parse`]
//! so both ingestion paths behave identically downstream.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::Valor;
use crate::staging::{EstadoConservacao, Origem, RefPendente, StagingAsset};

/// One structured record as returned by the open-data API.
///
/// Field names follow the published dataset; amounts arrive either as JSON
/// numbers or as strings in Brazilian notation, so they are kept raw here
/// and coerced in [`map_record`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenDataRecord {
    #[serde(alias = "numero")]
    pub numero_patrimonio: Option<String>,
    #[serde(alias = "nome")]
    pub nome_bem: Option<String>,
    pub descricao: Option<String>,
    pub marca: Option<String>,
    pub modelo: Option<String>,
    pub numero_serie: Option<String>,
    pub valor_aquisicao: Option<serde_json::Value>,
    pub valor_atual: Option<serde_json::Value>,
    pub data_aquisicao: Option<String>,
    pub estado_conservacao: Option<String>,
    pub observacoes: Option<String>,
    #[serde(alias = "localizacao")]
    pub local: Option<String>,
    #[serde(alias = "classe")]
    pub categoria: Option<String>,
    #[serde(alias = "orgao")]
    pub setor: Option<String>,
}

/// Coerce an open-data amount: JSON numbers are reais, strings use the
/// same Brazilian notation as the PDF report. Anything else is absent.
fn coerce_valor(raw: &Option<serde_json::Value>) -> Option<Valor> {
    match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64().and_then(Valor::from_reais),
        Some(serde_json::Value::String(s)) => Valor::parse(s),
        _ => None,
    }
}

fn coerce_data(raw: &Option<String>) -> Option<NaiveDate> {
    let s = raw.as_deref()?.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
}

fn texto_ou_vazio(raw: &Option<String>) -> String {
    raw.as_deref().map(str::trim).unwrap_or("").to_string()
}

/// Map one open-data record into a staging asset.
///
/// Missing fields become empty/absent and are reported later by
/// validation; mapping itself never fails.
pub fn map_record(record: &OpenDataRecord) -> StagingAsset {
    let descricao = texto_ou_vazio(&record.descricao);
    let nome_bem = match record.nome_bem.as_deref().map(str::trim) {
        Some(nome) if !nome.is_empty() => nome.to_string(),
        _ => descricao.clone(),
    };

    StagingAsset {
        origem: Origem::DadosAbertos,
        numero_patrimonio: texto_ou_vazio(&record.numero_patrimonio),
        nome_bem,
        descricao,
        marca: record.marca.clone().filter(|m| !m.trim().is_empty()),
        modelo: record.modelo.clone().filter(|m| !m.trim().is_empty()),
        numero_serie: record.numero_serie.clone().filter(|n| !n.trim().is_empty()),
        valor_aquisicao: coerce_valor(&record.valor_aquisicao),
        valor_atual: coerce_valor(&record.valor_atual),
        data_aquisicao: coerce_data(&record.data_aquisicao),
        estado_conservacao: record
            .estado_conservacao
            .as_deref()
            .and_then(EstadoConservacao::from_token)
            .unwrap_or_default(),
        observacoes: record.observacoes.clone().filter(|o| !o.trim().is_empty()),
        local: RefPendente::new(texto_ou_vazio(&record.local)),
        categoria: RefPendente::new(texto_ou_vazio(&record.categoria)),
        setor: RefPendente::new(texto_ou_vazio(&record.setor)),
    }
}
