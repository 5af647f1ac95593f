//! The shared review/commit pipeline driven by both ingestion adapters.
//!
//! Once a batch of staging records exists, PDF and open-data imports are
//! indistinguishable: validate against the registry, build the
//! normalization state, apply user mappings and edits, and (only with
//! `--commit`) run the single commit call.

use colored::Colorize;

use crate::prelude::{println, *};
use crate::registry::{RegistryClient, RegistryConfig};
use acervo_core::money::Valor;
use acervo_core::normalize::{build_state, pode_confirmar, MappingKind, NormalizationState};
use acervo_core::report::context::derive_hints;
use acervo_core::session::{CommitSummary, ImportSession};
use acervo_core::staging::{EstadoConservacao, FieldEdit};
use acervo_core::validate::validate_batch;

#[derive(Debug, Clone, clap::Args)]
pub struct ReviewOptions {
    /// Review-stage edit, INDEX:FIELD=VALUE (e.g. "2:marca=ACME")
    #[arg(long = "set", value_name = "EDIT")]
    pub set: Vec<String>,

    /// Resolve a location group, "ORIGINAL TEXT=CODE"
    #[arg(long = "map-local", value_name = "MAPPING")]
    pub map_local: Vec<String>,

    /// Resolve a category group, "ORIGINAL TEXT=CODE"
    #[arg(long = "map-categoria", value_name = "MAPPING")]
    pub map_categoria: Vec<String>,

    /// Perform the commit. Without it the pipeline stops after review.
    #[arg(long)]
    pub commit: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Parse a `"ORIGINAL TEXT=CODE"` mapping argument.
pub fn parse_mapping(spec: &str) -> Result<(String, String)> {
    let (texto, codigo) = spec
        .split_once('=')
        .ok_or_else(|| eyre!("Invalid mapping {spec:?}, expected \"ORIGINAL TEXT=CODE\""))?;
    let texto = texto.trim();
    let codigo = codigo.trim();
    if texto.is_empty() || codigo.is_empty() {
        return Err(eyre!(
            "Invalid mapping {spec:?}, expected \"ORIGINAL TEXT=CODE\""
        ));
    }
    Ok((texto.to_string(), codigo.to_string()))
}

/// Parse an `INDEX:FIELD=VALUE` edit argument into a typed [`FieldEdit`].
pub fn parse_edit(spec: &str) -> Result<(usize, FieldEdit)> {
    let (indice, resto) = spec
        .split_once(':')
        .ok_or_else(|| eyre!("Invalid edit {spec:?}, expected INDEX:FIELD=VALUE"))?;
    let index: usize = indice
        .trim()
        .parse()
        .map_err(|_| eyre!("Invalid record index in {spec:?}"))?;
    let (campo, valor) = resto
        .split_once('=')
        .ok_or_else(|| eyre!("Invalid edit {spec:?}, expected INDEX:FIELD=VALUE"))?;
    let valor = valor.trim();

    let opcional = |v: &str| {
        if v.is_empty() {
            None
        } else {
            Some(v.to_string())
        }
    };
    let monetario = |v: &str| -> Result<Option<Valor>> {
        if v.is_empty() {
            return Ok(None);
        }
        Valor::parse(v)
            .map(Some)
            .ok_or_else(|| eyre!("Invalid amount {v:?} in {spec:?}"))
    };

    let edit = match campo.trim().to_lowercase().as_str() {
        "numero" | "numero_patrimonio" => FieldEdit::NumeroPatrimonio(valor.to_string()),
        "nome" | "nome_bem" => FieldEdit::NomeBem(valor.to_string()),
        "descricao" => FieldEdit::Descricao(valor.to_string()),
        "marca" => FieldEdit::Marca(opcional(valor)),
        "modelo" => FieldEdit::Modelo(opcional(valor)),
        "numero_serie" => FieldEdit::NumeroSerie(opcional(valor)),
        "observacoes" => FieldEdit::Observacoes(opcional(valor)),
        "valor_aquisicao" => FieldEdit::ValorAquisicao(monetario(valor)?),
        "valor_atual" => FieldEdit::ValorAtual(monetario(valor)?),
        "data_aquisicao" => {
            if valor.is_empty() {
                FieldEdit::DataAquisicao(None)
            } else {
                let data = chrono::NaiveDate::parse_from_str(valor, "%Y-%m-%d")
                    .or_else(|_| chrono::NaiveDate::parse_from_str(valor, "%d/%m/%Y"))
                    .map_err(|_| eyre!("Invalid date {valor:?} in {spec:?}"))?;
                FieldEdit::DataAquisicao(Some(data))
            }
        }
        "estado" | "estado_conservacao" => {
            let estado = EstadoConservacao::from_token(valor)
                .ok_or_else(|| eyre!("Invalid conservation state {valor:?} in {spec:?}"))?;
            FieldEdit::EstadoConservacao(estado)
        }
        "local" => FieldEdit::LocalTexto(valor.to_string()),
        "categoria" => FieldEdit::CategoriaTexto(valor.to_string()),
        "setor" => FieldEdit::SetorTexto(valor.to_string()),
        outro => return Err(eyre!("Unknown field {outro:?} in {spec:?}")),
    };
    Ok((index, edit))
}

/// Run one registry-backed validation round, updating the session cache.
async fn run_validation(
    session: &mut ImportSession,
    registry: &RegistryClient,
) -> Result<()> {
    let token = session.begin_validation()?;
    let etiquetas: Vec<String> = session
        .records()
        .iter()
        .map(|r| r.numero_patrimonio.clone())
        .collect();

    match registry.exists_by_tag(&etiquetas).await {
        Ok(existentes) => {
            let resultado = validate_batch(session.records(), &existentes);
            session.complete_validation(token, resultado)?;
            Ok(())
        }
        Err(e) => {
            session.fail_validation(token, e.to_string())?;
            Err(eyre!("Duplicate check failed after retries: {e}"))
        }
    }
}

/// Drive the session from review to the end of the run.
pub async fn review_and_commit(
    session: &mut ImportSession,
    options: &ReviewOptions,
    global: &crate::Global,
) -> Result<()> {
    let config = RegistryConfig::from_env()?;
    let registry = RegistryClient::new(&config)?;

    for spec in &options.set {
        let (index, edit) = parse_edit(spec)?;
        session.edit_record(index, edit)?;
    }

    run_validation(session, &registry).await?;

    let locais = registry.list_locais().await?;
    let categorias = registry.list_categorias().await?;
    session.set_normalization(build_state(session.records(), &locais, &categorias))?;

    let mut mapeados = 0;
    for spec in &options.map_local {
        let (texto, codigo) = parse_mapping(spec)?;
        mapeados += session.apply_mapping(MappingKind::Local, &texto, &codigo)?;
    }
    for spec in &options.map_categoria {
        let (texto, codigo) = parse_mapping(spec)?;
        mapeados += session.apply_mapping(MappingKind::Categoria, &texto, &codigo)?;
    }
    if mapeados > 0 {
        if global.verbose {
            println!("{mapeados} record(s) resolved by mappings, revalidating");
        }
        run_validation(session, &registry).await?;
    }

    let validation = session
        .validation()
        .cloned()
        .ok_or_eyre("validation result missing after validation round")?;
    let normalization = session
        .normalization()
        .cloned()
        .ok_or_eyre("normalization state missing")?;
    let confirmavel = pode_confirmar(&normalization, &validation);

    if options.json {
        let payload = serde_json::json!({
            "records": session.records(),
            "validation": validation,
            "normalization": normalization,
            "pode_confirmar": confirmavel,
        });
        std::println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        display_review(session, &validation, &normalization, confirmavel);
    }

    if !options.commit {
        if !options.json {
            println!(
                "\n{}",
                "Dry run: pass --commit to create the ready records.".yellow()
            );
        }
        return Ok(());
    }

    let plan = session.begin_import()?;
    match registry.commit_batch(&plan.prontos).await {
        Ok(outcome) => {
            let summary = session.complete_import(&plan, outcome)?;
            display_summary(&summary, options.json)?;
            Ok(())
        }
        Err(e) => {
            session.fail_import(plan.token, e.to_string())?;
            Err(eyre!(
                "Commit failed and was not retried; the batch is back in review: {e}"
            ))
        }
    }
}

fn display_review(
    session: &ImportSession,
    validation: &acervo_core::validate::BatchValidation,
    normalization: &NormalizationState,
    confirmavel: bool,
) {
    match session.fonte() {
        Some(acervo_core::session::Fonte::Arquivo { nome }) => {
            println!("{} {}", "Origem:".bold(), nome)
        }
        Some(acervo_core::session::Fonte::DadosAbertos { filtro }) => {
            println!("{} dados abertos (filtro {filtro:?})", "Origem:".bold())
        }
        None => {}
    }

    let mut table = new_table();
    table.add_row(prettytable::row![
        "#".bold(),
        "Patrimônio".bold(),
        "Nome".bold(),
        "Local".bold(),
        "Categoria".bold(),
        "Situação".bold()
    ]);
    for resultado in &validation.resultados {
        let record = &session.records()[resultado.index];
        let situacao = if resultado.duplicata {
            "DUPLICATA".red().to_string()
        } else if !resultado.valido {
            resultado.erros.join("; ").red().to_string()
        } else {
            "OK".green().to_string()
        };
        table.add_row(prettytable::row![
            resultado.index,
            record.numero_patrimonio,
            record.nome_bem,
            record.local.texto,
            record.categoria.texto,
            situacao
        ]);
    }
    table.printstd();

    println!(
        "\n{} registro(s), {} inválido(s), {} duplicata(s), {} referência(s) pendente(s)",
        validation.resultados.len(),
        validation.invalidos,
        validation.duplicatas,
        validation.relacionamentos_necessarios
    );

    for (titulo, grupos, com_dicas) in [
        ("Locais não resolvidos", &normalization.locais, true),
        ("Categorias não resolvidas", &normalization.categorias, false),
    ] {
        let pendentes: Vec<_> = grupos.iter().filter(|g| g.resolved_code.is_none()).collect();
        if pendentes.is_empty() {
            continue;
        }
        println!("\n{}", titulo.bold());
        for grupo in pendentes {
            let sugestoes: Vec<String> = grupo
                .sugestoes
                .iter()
                .map(|s| f!("{} ({})", s.nome, s.codigo))
                .collect();
            println!(
                "  {:?}: {} item(ns); sugestões: {}",
                grupo.original_text,
                grupo.qtd_itens,
                if sugestoes.is_empty() {
                    "nenhuma".to_string()
                } else {
                    sugestoes.join(", ")
                }
            );
            if com_dicas {
                let dicas = derive_hints(&grupo.original_text);
                let mut partes = vec![f!("tipo: {}", dicas.tipo)];
                if let Some(andar) = dicas.andar {
                    partes.push(f!("{andar}º andar"));
                }
                if let Some(bloco) = &dicas.bloco {
                    partes.push(f!("bloco {bloco}"));
                }
                println!("    {}", partes.join(", ").bright_black());
            }
        }
    }

    let status = if confirmavel {
        "Batch ready to commit.".green().to_string()
    } else {
        "Batch not ready: resolve the findings above.".yellow().to_string()
    };
    println!("\n{status}");
}

fn display_summary(summary: &CommitSummary, json: bool) -> Result<()> {
    if json {
        std::println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!(
        "\n{} {} criado(s), {} setor(es), {} local(is), {} categoria(s) novos",
        "Importação concluída:".green().bold(),
        summary.outcome.criados,
        summary.outcome.setores_criados,
        summary.outcome.locais_criados,
        summary.outcome.categorias_criadas
    );
    if !summary.ignorados.is_empty() {
        println!("{}", "Ignorados:".yellow().bold());
        for ignorado in &summary.ignorados {
            println!(
                "  [{}] {}: {}",
                ignorado.index,
                ignorado.numero_patrimonio,
                ignorado.motivos.join("; ")
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mapping() {
        let (texto, codigo) = parse_mapping("SALA 1O1=L-42").unwrap();
        assert_eq!(texto, "SALA 1O1");
        assert_eq!(codigo, "L-42");

        assert!(parse_mapping("sem separador").is_err());
        assert!(parse_mapping("=L-42").is_err());
    }

    #[test]
    fn test_parse_edit_typed_fields() {
        let (index, edit) = parse_edit("2:marca=ACME").unwrap();
        assert_eq!(index, 2);
        assert_eq!(edit, FieldEdit::Marca(Some("ACME".to_string())));

        let (_, edit) = parse_edit("0:valor_atual=1.234,56").unwrap();
        assert_eq!(edit, FieldEdit::ValorAtual(Valor::parse("1.234,56")));

        let (_, edit) = parse_edit("1:estado=ruim").unwrap();
        assert_eq!(edit, FieldEdit::EstadoConservacao(EstadoConservacao::Ruim));
    }

    #[test]
    fn test_parse_edit_empty_value_clears_optional_field() {
        let (_, edit) = parse_edit("0:marca=").unwrap();
        assert_eq!(edit, FieldEdit::Marca(None));

        let (_, edit) = parse_edit("0:valor_aquisicao=").unwrap();
        assert_eq!(edit, FieldEdit::ValorAquisicao(None));
    }

    #[test]
    fn test_parse_edit_rejects_bad_input() {
        assert!(parse_edit("sem indice").is_err());
        assert!(parse_edit("x:marca=ACME").is_err());
        assert!(parse_edit("0:campo_desconhecido=1").is_err());
        assert!(parse_edit("0:valor_atual=abc").is_err());
        assert!(parse_edit("0:estado=excelente").is_err());
    }

    #[test]
    fn test_parse_edit_dates() {
        let (_, iso) = parse_edit("0:data_aquisicao=2021-03-15").unwrap();
        let (_, br) = parse_edit("0:data_aquisicao=15/03/2021").unwrap();
        assert_eq!(iso, br);
    }
}
