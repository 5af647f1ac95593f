//! Batch-wide resolution of free-text references to taxonomy entries.
//!
//! Records arrive with free-text location and category names. This module
//! groups the unresolved texts across the whole batch, ranks candidate
//! taxonomy entries for each group, and applies a chosen mapping to every
//! record sharing the text in one call.

use serde::{Deserialize, Serialize};

use crate::staging::StagingAsset;
use crate::validate::BatchValidation;

/// How many ranked suggestions each group carries.
const MAX_SUGESTOES: usize = 5;

/// One canonical registry entry (category, location or sector).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub codigo: String,
    pub nome: String,
}

/// Which reference a mapping applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    Local,
    Categoria,
}

/// One distinct unresolved free-text value, aggregating every record that
/// shares it. Resolving the mapping resolves all of them at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceMapping {
    pub original_text: String,
    pub resolved_code: Option<String>,
    pub qtd_itens: usize,
    pub sugestoes: Vec<TaxonomyEntry>,
}

/// Normalization progress for one staging batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizationState {
    pub locais: Vec<ReferenceMapping>,
    pub categorias: Vec<ReferenceMapping>,
}

/// Rank taxonomy entries against a free text: shortest edit distance
/// first, then alphabetical, so ties break deterministically.
fn rank_sugestoes(texto: &str, taxonomia: &[TaxonomyEntry]) -> Vec<TaxonomyEntry> {
    let alvo = texto.to_lowercase();
    let mut ranked: Vec<(usize, &TaxonomyEntry)> = taxonomia
        .iter()
        .map(|e| (strsim::levenshtein(&alvo, &e.nome.to_lowercase()), e))
        .collect();
    ranked.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.nome.cmp(&b.1.nome)));
    ranked
        .into_iter()
        .take(MAX_SUGESTOES)
        .map(|(_, e)| e.clone())
        .collect()
}

fn agrupar<'a>(
    textos: impl Iterator<Item = &'a str>,
    taxonomia: &[TaxonomyEntry],
) -> Vec<ReferenceMapping> {
    let mut grupos: Vec<ReferenceMapping> = Vec::new();
    for texto in textos {
        if texto.trim().is_empty() {
            continue;
        }
        match grupos.iter_mut().find(|g| g.original_text == texto) {
            Some(g) => g.qtd_itens += 1,
            None => grupos.push(ReferenceMapping {
                original_text: texto.to_string(),
                resolved_code: None,
                qtd_itens: 1,
                sugestoes: rank_sugestoes(texto, taxonomia),
            }),
        }
    }
    grupos
}

/// Build the normalization state for a batch: one group per distinct
/// unresolved location text and per distinct unresolved category text.
pub fn build_state(
    records: &[StagingAsset],
    locais: &[TaxonomyEntry],
    categorias: &[TaxonomyEntry],
) -> NormalizationState {
    NormalizationState {
        locais: agrupar(
            records
                .iter()
                .filter(|r| !r.local.resolvida())
                .map(|r| r.local.texto.as_str()),
            locais,
        ),
        categorias: agrupar(
            records
                .iter()
                .filter(|r| !r.categoria.resolvida())
                .map(|r| r.categoria.texto.as_str()),
            categorias,
        ),
    }
}

impl NormalizationState {
    /// Apply one mapping: every record whose reference carries exactly
    /// `original_text` gets `codigo`, and the group is marked resolved.
    /// Returns how many records were touched.
    pub fn apply_mapping(
        &mut self,
        records: &mut [StagingAsset],
        kind: MappingKind,
        original_text: &str,
        codigo: &str,
    ) -> usize {
        let grupos = match kind {
            MappingKind::Local => &mut self.locais,
            MappingKind::Categoria => &mut self.categorias,
        };
        let Some(grupo) = grupos.iter_mut().find(|g| g.original_text == original_text) else {
            return 0;
        };
        grupo.resolved_code = Some(codigo.to_string());

        let mut tocados = 0;
        for r in records.iter_mut() {
            let referencia = match kind {
                MappingKind::Local => &mut r.local,
                MappingKind::Categoria => &mut r.categoria,
            };
            if referencia.texto == original_text {
                referencia.codigo = Some(codigo.to_string());
                tocados += 1;
            }
        }
        tocados
    }

    /// Resolved groups over groups-with-problems; 1.0 when there were none.
    pub fn completion(&self) -> f64 {
        let total = self.locais.len() + self.categorias.len();
        if total == 0 {
            return 1.0;
        }
        let resolvidos = self
            .locais
            .iter()
            .chain(&self.categorias)
            .filter(|g| g.resolved_code.is_some())
            .count();
        resolvidos as f64 / total as f64
    }

    pub fn grupos_pendentes(&self) -> usize {
        self.locais
            .iter()
            .chain(&self.categorias)
            .filter(|g| g.resolved_code.is_none())
            .count()
    }
}

/// Commit eligibility: every group resolved and the current validation
/// clean of invalid/duplicate records.
pub fn pode_confirmar(state: &NormalizationState, validation: &BatchValidation) -> bool {
    state.completion() >= 1.0 && validation.sem_pendencias()
}
