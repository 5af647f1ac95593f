//! Running header context for the line-oriented report.
//!
//! The institutional report never links an asset row to its location
//! explicitly. Instead, header lines (`ÓRGÃO:`, `UNIDADE:`, `LOCAL:`)
//! appear before the rows they govern, and each one stays in effect until
//! the next header of the same kind. The scanner folds lines through a
//! [`LocationContext`], so rows are annotated positionally.

use std::sync::OnceLock;

use regex::Regex;

const NAO_ESPECIFICADO: &str = "não especificado";

fn andar_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)º\s*ANDAR").expect("andar regex"))
}

fn bloco_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bBLOCO\s+([A-Z0-9]+)").expect("bloco regex"))
}

/// Coarse location type keywords, checked in order.
const TIPOS: &[(&str, &str)] = &[
    ("SALA DE AULA", "sala de aula"),
    ("LABORATÓRIO", "laboratório"),
    ("AUDITÓRIO", "auditório"),
    ("BIBLIOTECA", "biblioteca"),
    ("GABINETE", "gabinete"),
    ("ALMOXARIFADO", "depósito"),
    ("DEPÓSITO", "depósito"),
    ("COZINHA", "cozinha"),
    ("SECRETARIA", "secretaria"),
    ("SALA", "sala"),
];

/// Best-effort hints derived from a free-text location string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHints {
    pub andar: Option<u32>,
    pub bloco: Option<String>,
    pub tipo: String,
}

/// Derive floor, block and coarse type hints from a location string.
/// Everything degrades to an "unspecified" fallback, never an error.
pub fn derive_hints(local: &str) -> LocalHints {
    let andar = andar_re()
        .captures(local)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());

    let bloco = bloco_re()
        .captures(local)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    let upper = local.to_uppercase();
    let tipo = TIPOS
        .iter()
        .find(|(palavra, _)| upper.contains(palavra))
        .map(|(_, tipo)| (*tipo).to_string())
        .unwrap_or_else(|| NAO_ESPECIFICADO.to_string());

    LocalHints { andar, bloco, tipo }
}

/// The three running context values tracked across report lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationContext {
    pub orgao: String,
    pub unidade: String,
    pub local: String,
}

impl Default for LocationContext {
    fn default() -> Self {
        LocationContext {
            orgao: NAO_ESPECIFICADO.to_string(),
            unidade: NAO_ESPECIFICADO.to_string(),
            local: NAO_ESPECIFICADO.to_string(),
        }
    }
}

impl LocationContext {
    /// Try to consume `linha` as a header line, overwriting the matching
    /// context value. Returns `true` when the line was a header and should
    /// not be fed to the field extractor.
    pub fn absorb(&mut self, linha: &str) -> bool {
        let trimmed = linha.trim();
        for (prefixo, destino) in [
            ("ÓRGÃO", 0usize),
            ("ORGAO", 0),
            ("UNIDADE ADMINISTRATIVA", 1),
            ("UNIDADE", 1),
            ("LOCALIZAÇÃO", 2),
            ("LOCAL", 2),
        ] {
            if let Some(valor) = strip_header(trimmed, prefixo) {
                if valor.is_empty() {
                    // A bare header with no value still starts a new block.
                    return true;
                }
                match destino {
                    0 => self.orgao = valor,
                    1 => self.unidade = valor,
                    _ => self.local = valor,
                }
                return true;
            }
        }
        false
    }

    pub fn hints(&self) -> LocalHints {
        derive_hints(&self.local)
    }
}

/// Match `PREFIXO: value` (or `PREFIXO valor` with a separator) at the start
/// of a line, case-insensitive, returning the trimmed value.
fn strip_header(linha: &str, prefixo: &str) -> Option<String> {
    let upper = linha.to_uppercase();
    if !upper.starts_with(prefixo) {
        return None;
    }
    let resto = &linha[prefixo.len()..];
    let resto = resto.trim_start();
    let resto = resto
        .strip_prefix(':')
        .or_else(|| resto.strip_prefix('-'))?;
    Some(resto.trim().to_string())
}
