//! Field extraction from one physical report line.
//!
//! The institutional report is line-oriented: each asset row carries a
//! 9-digit tag, an optional 7-digit legacy tag, a description, one or two
//! `R$` amounts, a conservation state token and an optional brand. The
//! extractor is a best-effort heuristic for that one format; anything it
//! cannot make sense of yields `None` and the batch moves on.

use std::sync::OnceLock;

use regex::Regex;

use crate::money::Valor;
use crate::report::category::map_categoria;
use crate::report::context::LocationContext;
use crate::staging::{EstadoConservacao, Origem, RefPendente, StagingAsset};

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{9}\b").expect("tag regex"))
}

fn legacy_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d{7}\b").expect("legacy tag regex"))
}

fn money_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"R\$\s*([0-9.,]+)").expect("money regex"))
}

fn trailing_money_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"R\$\s*[0-9.,]+\s*$").expect("trailing money regex"))
}

fn estado_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(NOVO|BOM|REGULAR|RUIM|P[ÉE]SSIMO)\b").expect("estado regex")
    })
}

fn fragment_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s{2,}").expect("fragment split regex"))
}

/// Header/footer/boilerplate patterns rejected before any field parsing.
/// Page counters in particular can contain digit runs that would otherwise
/// look like tags.
fn boilerplate_res() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(?i)^\s*p[áa]g(ina)?\.?\s*:?\s*\d+",
            r"(?i)\bemitido\s+em\b",
            r"(?i)\brelat[óo]rio\b",
            r"(?i)^\s*(prefeitura|estado d[aeo])\b",
            r"(?i)^\s*total\s+de\s+(bens|itens)\b",
            r"(?i)^\s*patrim[ôo]nio\s+descri[çc][ãa]o\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("boilerplate regex"))
        .collect()
    })
}

const MARCA_NAO_INFORMADA: &str = "MARCA NÃO INFORMADA";

/// Parse one physical line into a staging asset, annotated with the
/// currently active location context.
///
/// Returns `None` for boilerplate, lines without a 9-digit tag, and
/// anything else the heuristics cannot place. Never panics on malformed
/// input.
pub fn extract_line(linha: &str, ctx: &LocationContext) -> Option<StagingAsset> {
    if boilerplate_res().iter().any(|re| re.is_match(linha)) {
        return None;
    }

    let tag = tag_re().find(linha)?;
    let numero_patrimonio = tag.as_str().to_string();
    let before = &linha[..tag.start()];
    let after = &linha[tag.end()..];

    // Description: the text before the tag, minus a trailing current-value
    // amount when present.
    let descricao = trailing_money_re().replace(before, "").trim().to_string();

    // All amounts in the original line, left to right. First = current
    // value; last (when there are at least two) = acquisition value.
    // Unparseable amounts become absent, never an error.
    let amounts: Vec<(usize, usize, Option<Valor>)> = money_re()
        .captures_iter(linha)
        .map(|c| {
            let m = c.get(0).expect("whole match");
            (m.start(), m.end(), Valor::parse(&c[1]))
        })
        .collect();
    let valor_atual = amounts.first().and_then(|(_, _, v)| *v);
    let valor_aquisicao = if amounts.len() >= 2 {
        amounts.last().and_then(|(_, _, v)| *v)
    } else {
        None
    };

    // A leading 7-digit legacy tag is informational only.
    let after = legacy_tag_re().replace(after, "");
    let after = after.as_ref();

    // Species/class segment: `after` up to its first amount, split on runs
    // of two or more spaces.
    let seg_fim = money_re().find(after).map(|m| m.start()).unwrap_or(after.len());
    let segmento = after[..seg_fim].trim();
    let fragmentos: Vec<&str> = fragment_split_re()
        .split(segmento)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();
    let especie = fragmentos.first().copied().unwrap_or("").to_string();
    let classe = fragmentos.get(1..).unwrap_or(&[]).join(" ");

    // The brand sits between the last post-tag amount and the state
    // token. Amounts before the tag belong to the description side and
    // are no brand boundary; without a post-tag amount there is no brand
    // segment at all, only a possible state token.
    let cauda_pos_tag = amounts
        .iter()
        .rev()
        .find(|(start, _, _)| *start >= tag.end())
        .map(|(_, end, _)| &linha[*end..]);
    let (estado_conservacao, marca) = match cauda_pos_tag {
        Some(cauda) => estado_e_marca(cauda),
        None => (estado_e_marca(after).0, None),
    };

    let nome_bem = if !especie.is_empty() {
        especie.clone()
    } else {
        descricao.clone()
    };
    let dica_categoria = if !classe.is_empty() { &classe } else { &especie };

    Some(StagingAsset {
        origem: Origem::RelatorioPdf,
        numero_patrimonio,
        nome_bem,
        descricao,
        marca,
        modelo: None,
        numero_serie: None,
        valor_aquisicao,
        valor_atual,
        data_aquisicao: None,
        estado_conservacao,
        observacoes: None,
        local: RefPendente::new(ctx.local.clone()),
        categoria: RefPendente::new(map_categoria(dica_categoria)),
        setor: RefPendente::new(ctx.unidade.clone()),
    })
}

/// Find the conservation state token in the post-amount tail and take the
/// text before it as the brand. The literal `MARCA NÃO INFORMADA` means "no
/// brand", not a brand called that.
fn estado_e_marca(cauda: &str) -> (EstadoConservacao, Option<String>) {
    let (estado, corte) = match estado_re().find(cauda) {
        Some(m) => (
            EstadoConservacao::from_token(m.as_str()).unwrap_or_default(),
            m.start(),
        ),
        None => (EstadoConservacao::default(), cauda.len()),
    };

    let bruto = cauda[..corte].trim();
    let marca = if bruto.is_empty() || bruto.to_uppercase().contains(MARCA_NAO_INFORMADA) {
        None
    } else {
        Some(bruto.to_string())
    };

    (estado, marca)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> LocationContext {
        let mut ctx = LocationContext::default();
        ctx.absorb("UNIDADE: ALMOXARIFADO CENTRAL");
        ctx.absorb("LOCAL: SALA 101");
        ctx
    }

    #[test]
    fn test_full_row() {
        let linha = "RÉGUA PARA RACK DE SOM R$ 15,43 000760130 0139853 RÉGUA  \
                     MÁQUINAS, INSTALAÇÕES E UTENSÍLIOS DE ESCRITÓRIO R$ 150,00 \
                     BOM MARCA NÃO INFORMADA";
        let asset = extract_line(linha, &ctx()).expect("asset row");

        assert_eq!(asset.numero_patrimonio, "000760130");
        assert_eq!(asset.descricao, "RÉGUA PARA RACK DE SOM");
        assert_eq!(asset.valor_atual, Valor::parse("15,43"));
        assert_eq!(asset.valor_aquisicao, Valor::parse("150,00"));
        assert_eq!(asset.estado_conservacao, EstadoConservacao::Bom);
        assert_eq!(asset.marca, None);
        assert_eq!(asset.nome_bem, "RÉGUA");
        assert_eq!(asset.categoria.texto, "MÁQUINAS E UTENSÍLIOS");
        assert_eq!(asset.local.texto, "SALA 101");
        assert_eq!(asset.setor.texto, "ALMOXARIFADO CENTRAL");
    }

    #[test]
    fn test_lines_without_tag_yield_none() {
        let ctx = ctx();
        for linha in [
            "",
            "CADEIRA GIRATÓRIA R$ 120,00",
            "apenas texto livre",
            "12345678 curto demais",
        ] {
            assert_eq!(extract_line(linha, &ctx), None, "linha: {linha:?}");
        }
    }

    #[test]
    fn test_boilerplate_rejected_even_with_digit_runs() {
        let ctx = ctx();
        assert_eq!(extract_line("Página 3 de 120  000000003", &ctx), None);
        assert_eq!(
            extract_line("RELATÓRIO DE BENS PATRIMONIAIS 000123456", &ctx),
            None
        );
        assert_eq!(
            extract_line("EMITIDO EM 01/02/2024 000123456", &ctx),
            None
        );
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let linha = "MESA DE REUNIÃO R$ 89,90 000112233  MESA  MOBILIÁRIO EM GERAL R$ 400,00 REGULAR ACME";
        let ctx = ctx();
        let a = extract_line(linha, &ctx).unwrap();
        let b = extract_line(linha, &ctx).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_amount_is_current_value_only() {
        let linha = "VENTILADOR DE PAREDE 000445566  VENTILADOR  MÁQUINAS R$ 75,50 RUIM";
        let asset = extract_line(linha, &ctx()).unwrap();
        assert_eq!(asset.valor_atual, Valor::parse("75,50"));
        assert_eq!(asset.valor_aquisicao, None);
        assert_eq!(asset.estado_conservacao, EstadoConservacao::Ruim);
    }

    #[test]
    fn test_brand_between_amount_and_state() {
        let linha = "CADEIRA FIXA R$ 10,00 000998877  CADEIRA  MOBILIÁRIO EM GERAL R$ 35,00 FLEXFORM BOM";
        let asset = extract_line(linha, &ctx()).unwrap();
        assert_eq!(asset.marca.as_deref(), Some("FLEXFORM"));
        assert_eq!(asset.estado_conservacao, EstadoConservacao::Bom);
    }

    #[test]
    fn test_missing_state_defaults_to_bom() {
        let linha = "ARMÁRIO DE AÇO R$ 20,00 000556677  ARMÁRIO  MOBILIÁRIO EM GERAL R$ 90,00";
        let asset = extract_line(linha, &ctx()).unwrap();
        assert_eq!(asset.estado_conservacao, EstadoConservacao::Bom);
        assert_eq!(asset.marca, None);
    }

    #[test]
    fn test_malformed_amount_is_absent() {
        let linha = "BEBEDOURO R$ ,,, 000334455  BEBEDOURO  ELETRODOMÉSTICOS EM GERAL R$ 200,00 BOM";
        let asset = extract_line(linha, &ctx()).unwrap();
        assert_eq!(asset.valor_atual, None);
        assert_eq!(asset.valor_aquisicao, Valor::parse("200,00"));
    }

    #[test]
    fn test_no_post_tag_amount_leaves_brand_absent() {
        // The only amount precedes the tag; the text after the tag is
        // species/class, never a brand.
        let linha = "MESA DE APOIO R$ 10,00 000000001  MESA  MOBILIÁRIO EM GERAL BOM";
        let asset = extract_line(linha, &ctx()).unwrap();
        assert_eq!(asset.marca, None);
        assert_eq!(asset.nome_bem, "MESA");
        assert_eq!(asset.estado_conservacao, EstadoConservacao::Bom);
        assert_eq!(asset.valor_atual, Valor::parse("10,00"));
        assert_eq!(asset.valor_aquisicao, None);
    }

    #[test]
    fn test_line_without_any_amount_still_parses() {
        let linha = "000000002  CADEIRA  MOBILIÁRIO EM GERAL RUIM";
        let asset = extract_line(linha, &ctx()).unwrap();
        assert_eq!(asset.marca, None);
        assert_eq!(asset.nome_bem, "CADEIRA");
        assert_eq!(asset.estado_conservacao, EstadoConservacao::Ruim);
        assert_eq!(asset.valor_atual, None);
        assert_eq!(asset.valor_aquisicao, None);
    }

    #[test]
    fn test_legacy_tag_is_discarded() {
        let linha = "PROJETOR MULTIMÍDIA R$ 300,00 000667788 1234567 PROJETOR  \
                     EQUIPAMENTOS AUDIOVISUAIS R$ 1.500,00 EPSON NOVO";
        let asset = extract_line(linha, &ctx()).unwrap();
        assert_eq!(asset.numero_patrimonio, "000667788");
        assert_eq!(asset.nome_bem, "PROJETOR");
        assert_eq!(asset.marca.as_deref(), Some("EPSON"));
        assert_eq!(asset.estado_conservacao, EstadoConservacao::Novo);
        assert_eq!(asset.valor_aquisicao, Valor::parse("1.500,00"));
    }

    #[test]
    fn test_species_falls_back_to_description() {
        let linha = "IMPRESSORA LASER R$ 50,00 000222111 R$ 900,00 BOM";
        let asset = extract_line(linha, &ctx()).unwrap();
        assert_eq!(asset.nome_bem, "IMPRESSORA LASER");
        assert_eq!(asset.descricao, "IMPRESSORA LASER");
    }
}
