use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};

use super::flow::{self, ReviewOptions};
use crate::prelude::{println, *};
use acervo_core::report::scan_report;
use acervo_core::session::{Fonte, ImportSession};

#[derive(Debug, clap::Args)]
pub struct PdfOptions {
    /// Path to the institutional report PDF
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[clap(flatten)]
    pub review: ReviewOptions,
}

pub async fn run(options: PdfOptions, global: crate::Global) -> Result<()> {
    let mut session = ImportSession::new();

    let nome = options
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let token = session.begin_extraction(Fonte::Arquivo { nome })?;

    let doc = match pdf::ReportPdf::open(&options.file) {
        Ok(doc) => Arc::new(doc),
        Err(e) => {
            session.fail_extraction(token, e.to_string())?;
            return Err(eyre!("Could not read {}: {e}", options.file.display()));
        }
    };

    // Extract pages in parallel. Completions arrive in any order, so each
    // one is slotted by page index and the session progress advances per
    // page; the concatenation afterwards is in page order.
    let pages = doc.page_numbers().to_vec();
    let bar = ProgressBar::new(pages.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("Extracting pages {pos}/{len} {bar:30}")
            .map_err(|e| eyre!("progress template: {e}"))?,
    );
    let mut tarefas: FuturesUnordered<_> = pages
        .iter()
        .enumerate()
        .map(|(idx, &page)| {
            let doc = Arc::clone(&doc);
            tokio::task::spawn_blocking(move || (idx, doc.extract_page(page)))
        })
        .collect();

    let mut paginas: Vec<Option<String>> = vec![None; pages.len()];
    let mut concluido = 0;
    while let Some(resultado) = tarefas.next().await {
        match resultado {
            Ok((idx, Ok(pagina))) => {
                paginas[idx] = Some(pagina);
                concluido += 1;
                bar.inc(1);
                session.report_progress(token, concluido, pages.len())?;
            }
            Ok((_, Err(e))) => {
                session.fail_extraction(token, e.to_string())?;
                return Err(eyre!("Extraction failed: {e}"));
            }
            Err(e) => {
                session.fail_extraction(token, e.to_string())?;
                return Err(eyre!("Extraction task failed: {e}"));
            }
        }
    }
    bar.finish_and_clear();

    let mut texto = String::new();
    for pagina in paginas.into_iter().flatten() {
        texto.push_str(&pagina);
        texto.push('\n');
    }

    if texto.trim().is_empty() {
        let e = pdf::PdfError::NoText;
        session.fail_extraction(token, e.to_string())?;
        return Err(eyre!("Could not read {}: {e}", options.file.display()));
    }

    let outcome = scan_report(&texto);
    log::debug!(
        "scanned {} page(s): {} record(s), {} line(s) ignored",
        pages.len(),
        outcome.records.len(),
        outcome.linhas_ignoradas
    );
    if global.verbose {
        println!(
            "{} record(s) extracted, {} line(s) ignored",
            outcome.records.len(),
            outcome.linhas_ignoradas
        );
    }

    session.complete_extraction(token, outcome.records)?;
    if let Some(aviso) = session.aviso() {
        println!("{}", aviso.yellow());
    }

    flow::review_and_commit(&mut session, &options.review, &global).await
}
