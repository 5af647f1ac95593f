//! Staging records: in-memory candidate assets, editable until commit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::Valor;

/// Where a staging record came from. Decides tag-format rules downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origem {
    /// Line-oriented institutional PDF report.
    RelatorioPdf,
    /// Structured open-data API record.
    DadosAbertos,
}

/// Conservation state vocabulary used by the institutional reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstadoConservacao {
    Novo,
    #[default]
    Bom,
    Regular,
    Ruim,
    #[serde(rename = "péssimo")]
    Pessimo,
}

impl EstadoConservacao {
    /// Match a report token against the closed vocabulary, case-insensitive.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_uppercase().as_str() {
            "NOVO" => Some(Self::Novo),
            "BOM" => Some(Self::Bom),
            "REGULAR" => Some(Self::Regular),
            "RUIM" => Some(Self::Ruim),
            "PÉSSIMO" | "PESSIMO" => Some(Self::Pessimo),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Novo => "novo",
            Self::Bom => "bom",
            Self::Regular => "regular",
            Self::Ruim => "ruim",
            Self::Pessimo => "péssimo",
        }
    }
}

/// A location/category/sector reference that has not been committed yet:
/// the free text seen at extraction time plus, once normalization resolves
/// it, the canonical registry code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefPendente {
    pub texto: String,
    pub codigo: Option<String>,
}

impl RefPendente {
    pub fn new(texto: impl Into<String>) -> Self {
        RefPendente {
            texto: texto.into(),
            codigo: None,
        }
    }

    pub fn resolvida(&self) -> bool {
        self.codigo.is_some()
    }
}

/// An in-memory, not-yet-committed candidate asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingAsset {
    pub origem: Origem,
    /// Asset tag. Nine digits on the PDF path, free text on the open-data path.
    pub numero_patrimonio: String,
    pub nome_bem: String,
    pub descricao: String,
    pub marca: Option<String>,
    pub modelo: Option<String>,
    pub numero_serie: Option<String>,
    pub valor_aquisicao: Option<Valor>,
    pub valor_atual: Option<Valor>,
    pub data_aquisicao: Option<NaiveDate>,
    pub estado_conservacao: EstadoConservacao,
    pub observacoes: Option<String>,
    pub local: RefPendente,
    pub categoria: RefPendente,
    pub setor: RefPendente,
}

/// A single typed edit to one staging record.
///
/// Edits go through this command enum instead of ad-hoc field paths so the
/// session can gate them by stage and invalidate cached validation.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEdit {
    NumeroPatrimonio(String),
    NomeBem(String),
    Descricao(String),
    Marca(Option<String>),
    Modelo(Option<String>),
    NumeroSerie(Option<String>),
    ValorAquisicao(Option<Valor>),
    ValorAtual(Option<Valor>),
    DataAquisicao(Option<NaiveDate>),
    EstadoConservacao(EstadoConservacao),
    Observacoes(Option<String>),
    LocalTexto(String),
    CategoriaTexto(String),
    SetorTexto(String),
}

impl StagingAsset {
    /// Apply one edit, returning the updated snapshot.
    ///
    /// Changing the free text of a pending reference discards any code
    /// already resolved for it; the new text has to be normalized again.
    pub fn com_edicao(mut self, edit: FieldEdit) -> Self {
        match edit {
            FieldEdit::NumeroPatrimonio(v) => self.numero_patrimonio = v,
            FieldEdit::NomeBem(v) => self.nome_bem = v,
            FieldEdit::Descricao(v) => self.descricao = v,
            FieldEdit::Marca(v) => self.marca = v,
            FieldEdit::Modelo(v) => self.modelo = v,
            FieldEdit::NumeroSerie(v) => self.numero_serie = v,
            FieldEdit::ValorAquisicao(v) => self.valor_aquisicao = v,
            FieldEdit::ValorAtual(v) => self.valor_atual = v,
            FieldEdit::DataAquisicao(v) => self.data_aquisicao = v,
            FieldEdit::EstadoConservacao(v) => self.estado_conservacao = v,
            FieldEdit::Observacoes(v) => self.observacoes = v,
            FieldEdit::LocalTexto(v) => self.local = RefPendente::new(v),
            FieldEdit::CategoriaTexto(v) => self.categoria = RefPendente::new(v),
            FieldEdit::SetorTexto(v) => self.setor = RefPendente::new(v),
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_asset(tag: &str) -> StagingAsset {
        StagingAsset {
            origem: Origem::RelatorioPdf,
            numero_patrimonio: tag.to_string(),
            nome_bem: "CADEIRA".to_string(),
            descricao: "CADEIRA GIRATÓRIA".to_string(),
            marca: None,
            modelo: None,
            numero_serie: None,
            valor_aquisicao: None,
            valor_atual: None,
            data_aquisicao: None,
            estado_conservacao: EstadoConservacao::default(),
            observacoes: None,
            local: RefPendente::new("SALA 101"),
            categoria: RefPendente::new("MOBILIÁRIO"),
            setor: RefPendente::new("ADMINISTRAÇÃO"),
        }
    }

    #[test]
    fn test_estado_from_token() {
        assert_eq!(
            EstadoConservacao::from_token("bom"),
            Some(EstadoConservacao::Bom)
        );
        assert_eq!(
            EstadoConservacao::from_token("PÉSSIMO"),
            Some(EstadoConservacao::Pessimo)
        );
        assert_eq!(EstadoConservacao::from_token("ótimo"), None);
    }

    #[test]
    fn test_default_estado_is_bom() {
        assert_eq!(EstadoConservacao::default(), EstadoConservacao::Bom);
    }

    #[test]
    fn test_asset_equality_is_total() {
        // A batch snapshot must be usable where total equality is required
        // (commit plans compare whole record vectors).
        fn requer_eq<T: Eq>(_: &T) {}
        requer_eq(&sample_asset("000000001"));
    }

    #[test]
    fn test_edit_plain_field() {
        let asset = sample_asset("000000001");
        let editado = asset.com_edicao(FieldEdit::Marca(Some("ACME".to_string())));
        assert_eq!(editado.marca.as_deref(), Some("ACME"));
    }

    #[test]
    fn test_editing_reference_text_discards_resolved_code() {
        let mut asset = sample_asset("000000001");
        asset.local.codigo = Some("LOC-01".to_string());

        let editado = asset.com_edicao(FieldEdit::LocalTexto("SALA 202".to_string()));
        assert_eq!(editado.local.texto, "SALA 202");
        assert_eq!(editado.local.codigo, None);
    }
}
