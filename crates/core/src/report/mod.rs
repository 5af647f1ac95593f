//! Extraction of staging assets from institutional report text.
//!
//! The entry point is [`scan_report`]: a fold over the report's physical
//! lines that threads a [`context::LocationContext`] and hands every
//! non-header line to [`line::extract_line`].

pub mod category;
pub mod context;
pub mod line;

use crate::staging::StagingAsset;
use context::LocationContext;

/// Result of scanning one report text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    pub records: Vec<StagingAsset>,
    /// Lines that were neither headers nor parseable asset rows.
    pub linhas_ignoradas: usize,
}

/// Scan the full report text, producing staging records in line order.
///
/// Header lines update the running location context; every other non-empty
/// line either yields a record or is counted as ignored. Malformed lines
/// never abort the scan.
pub fn scan_report(texto: &str) -> ScanOutcome {
    let mut ctx = LocationContext::default();
    let mut outcome = ScanOutcome::default();

    for linha in texto.lines() {
        if linha.trim().is_empty() {
            continue;
        }
        if ctx.absorb(linha) {
            continue;
        }
        match line::extract_line(linha, &ctx) {
            Some(asset) => outcome.records.push(asset),
            None => outcome.linhas_ignoradas += 1,
        }
    }

    outcome
}
