//! Whole-batch validation: required fields, tag format, duplicates.
//!
//! Validation is pure over the batch plus one pre-fetched snapshot of
//! registry tags; the shell performs the single batched existence call and
//! hands the resulting set here. Recomputed on demand, never persisted.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::staging::{Origem, StagingAsset};

/// Validation verdict for a single record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordValidationResult {
    pub index: usize,
    pub valido: bool,
    pub duplicata: bool,
    pub erros: Vec<String>,
}

/// Per-record verdicts plus batch aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchValidation {
    pub resultados: Vec<RecordValidationResult>,
    pub invalidos: usize,
    pub duplicatas: usize,
    /// Distinct unresolved location/category texts still needing a
    /// canonical registry entry.
    pub relacionamentos_necessarios: usize,
}

impl BatchValidation {
    /// True when every record can go into the commit payload.
    pub fn sem_pendencias(&self) -> bool {
        self.invalidos == 0 && self.duplicatas == 0
    }
}

fn tag_de_nove_digitos(tag: &str) -> bool {
    tag.len() == 9 && tag.chars().all(|c| c.is_ascii_digit())
}

/// Validate the full staging batch against a snapshot of existing registry
/// tags. Pure and idempotent for the same batch and snapshot.
pub fn validate_batch(
    records: &[StagingAsset],
    existing_tags: &HashSet<String>,
) -> BatchValidation {
    // Tag occurrence counts for batch-internal duplicate detection.
    let mut contagem: HashMap<&str, usize> = HashMap::new();
    for r in records {
        if !r.numero_patrimonio.is_empty() {
            *contagem.entry(r.numero_patrimonio.as_str()).or_default() += 1;
        }
    }

    let mut resultados = Vec::with_capacity(records.len());
    let mut invalidos = 0;
    let mut duplicatas = 0;

    for (index, r) in records.iter().enumerate() {
        let mut erros = Vec::new();

        if r.numero_patrimonio.is_empty() {
            erros.push("número de patrimônio ausente".to_string());
        } else if r.origem == Origem::RelatorioPdf && !tag_de_nove_digitos(&r.numero_patrimonio) {
            erros.push("número de patrimônio deve ter 9 dígitos".to_string());
        }
        if r.nome_bem.trim().is_empty() {
            erros.push("nome do bem ausente".to_string());
        }
        if r.local.texto.trim().is_empty() {
            erros.push("local ausente".to_string());
        }
        if r.categoria.texto.trim().is_empty() {
            erros.push("categoria ausente".to_string());
        }
        if r.setor.texto.trim().is_empty() {
            erros.push("setor ausente".to_string());
        }

        let tag = r.numero_patrimonio.as_str();
        let duplicata = !tag.is_empty()
            && (existing_tags.contains(tag) || contagem.get(tag).copied().unwrap_or(0) > 1);

        let valido = erros.is_empty();
        if !valido {
            invalidos += 1;
        }
        if duplicata {
            duplicatas += 1;
        }

        resultados.push(RecordValidationResult {
            index,
            valido,
            duplicata,
            erros,
        });
    }

    let mut pendentes: HashSet<(&'static str, &str)> = HashSet::new();
    for r in records {
        if !r.local.resolvida() && !r.local.texto.trim().is_empty() {
            pendentes.insert(("local", r.local.texto.as_str()));
        }
        if !r.categoria.resolvida() && !r.categoria.texto.trim().is_empty() {
            pendentes.insert(("categoria", r.categoria.texto.as_str()));
        }
    }

    BatchValidation {
        resultados,
        invalidos,
        duplicatas,
        relacionamentos_necessarios: pendentes.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::{EstadoConservacao, RefPendente};

    fn asset(tag: &str, origem: Origem) -> StagingAsset {
        StagingAsset {
            origem,
            numero_patrimonio: tag.to_string(),
            nome_bem: "CADEIRA".to_string(),
            descricao: "CADEIRA FIXA".to_string(),
            marca: None,
            modelo: None,
            numero_serie: None,
            valor_aquisicao: None,
            valor_atual: None,
            data_aquisicao: None,
            estado_conservacao: EstadoConservacao::Bom,
            observacoes: None,
            local: RefPendente::new("SALA 101"),
            categoria: RefPendente::new("MOBILIÁRIO"),
            setor: RefPendente::new("ADMINISTRAÇÃO"),
        }
    }

    #[test]
    fn test_valid_batch_has_no_findings() {
        let records = vec![
            asset("000000001", Origem::RelatorioPdf),
            asset("000000002", Origem::RelatorioPdf),
        ];
        let v = validate_batch(&records, &HashSet::new());
        assert!(v.sem_pendencias());
        assert!(v.resultados.iter().all(|r| r.valido && !r.duplicata));
    }

    #[test]
    fn test_each_missing_field_appends_a_distinct_error() {
        let mut r = asset("000000001", Origem::RelatorioPdf);
        r.nome_bem.clear();
        r.local = RefPendente::new("");
        r.setor = RefPendente::new("");

        let v = validate_batch(&[r], &HashSet::new());
        assert_eq!(v.invalidos, 1);
        assert_eq!(v.resultados[0].erros.len(), 3);
    }

    #[test]
    fn test_pdf_tags_must_be_nine_digits() {
        let v = validate_batch(&[asset("12345", Origem::RelatorioPdf)], &HashSet::new());
        assert!(!v.resultados[0].valido);

        // Free-text tags are fine on the open-data path.
        let v = validate_batch(&[asset("PAT-2021-0042", Origem::DadosAbertos)], &HashSet::new());
        assert!(v.resultados[0].valido);
    }

    #[test]
    fn test_duplicate_within_batch() {
        let records = vec![
            asset("000000001", Origem::RelatorioPdf),
            asset("000000001", Origem::RelatorioPdf),
            asset("000000002", Origem::RelatorioPdf),
        ];
        let v = validate_batch(&records, &HashSet::new());
        assert!(v.resultados[0].duplicata);
        assert!(v.resultados[1].duplicata);
        assert!(!v.resultados[2].duplicata);
        assert_eq!(v.duplicatas, 2);
    }

    #[test]
    fn test_duplicate_against_registry() {
        let existing: HashSet<String> = ["000000007".to_string()].into_iter().collect();
        let v = validate_batch(&[asset("000000007", Origem::RelatorioPdf)], &existing);
        assert!(v.resultados[0].duplicata);
        // A duplicate can still be field-valid; the flags are independent.
        assert!(v.resultados[0].valido);
    }

    #[test]
    fn test_pending_relationship_count_is_per_distinct_text() {
        let mut a = asset("000000001", Origem::RelatorioPdf);
        let mut b = asset("000000002", Origem::RelatorioPdf);
        let c = asset("000000003", Origem::RelatorioPdf);
        a.local = RefPendente::new("SALA X");
        b.local = RefPendente::new("SALA X");
        let mut d = c.clone();
        d.numero_patrimonio = "000000004".to_string();
        d.local.codigo = Some("L-1".to_string());
        d.categoria.codigo = Some("C-1".to_string());

        let records = vec![a, b, c, d];
        let v = validate_batch(&records, &HashSet::new());
        // "SALA X" + "SALA 101" on the location side, "MOBILIÁRIO" on the
        // category side; the fully resolved record contributes nothing.
        assert_eq!(v.relacionamentos_necessarios, 3);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let records = vec![
            asset("000000001", Origem::RelatorioPdf),
            asset("000000001", Origem::RelatorioPdf),
        ];
        let existing = HashSet::new();
        assert_eq!(
            validate_batch(&records, &existing),
            validate_batch(&records, &existing)
        );
    }
}
