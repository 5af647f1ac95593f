//! The import session: a staged, resumable, partially-reversible workflow.
//!
//! `Upload → Extracting → Review ⇄ Validating → Importing → {Completed |
//! Cancelled | Failed}`. The session is the single mutable aggregate root:
//! it owns the staging batch, the cached validation result and the
//! normalization state, and it is client-local — never partially
//! persisted.
//!
//! Long-running phases run in the shell; the session hands out a
//! [`PhaseToken`] carrying the epoch the phase started under. Every
//! transition (including reset) bumps the epoch, so an in-flight result
//! arriving after the session moved on is rejected as stale and simply
//! discarded by the caller.

use serde::Serialize;
use thiserror::Error;

use crate::normalize::{MappingKind, NormalizationState};
use crate::staging::{FieldEdit, StagingAsset};
use crate::validate::BatchValidation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    Extracting,
    Review,
    Validating,
    Importing,
    Completed,
    Cancelled,
    Failed,
}

/// What is being ingested. Only recognized inputs enter the machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fonte {
    Arquivo { nome: String },
    DadosAbertos { filtro: String },
}

impl Fonte {
    fn reconhecida(&self) -> bool {
        match self {
            Fonte::Arquivo { nome } => nome.to_lowercase().ends_with(".pdf"),
            Fonte::DadosAbertos { .. } => true,
        }
    }
}

/// Opaque handle tying an async phase completion to the epoch it started
/// under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseToken {
    epoch: u64,
}

/// Extraction progress, page-granular on the PDF path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub concluido: usize,
    pub total: usize,
}

/// A record excluded from the commit payload, with its reasons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ignorado {
    pub index: usize,
    pub numero_patrimonio: String,
    pub motivos: Vec<String>,
}

/// The commit plan: which records go to the registry and which stay
/// behind. Produced at the `Review → Importing` transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPlan {
    pub token: PhaseToken,
    pub prontos: Vec<StagingAsset>,
    pub ignorados: Vec<Ignorado>,
}

/// Counts reported by the registry after the single commit call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RegistryOutcome {
    pub criados: usize,
    pub setores_criados: usize,
    pub locais_criados: usize,
    pub categorias_criadas: usize,
}

/// Final created/skipped summary. Always produced; the commit never leaves
/// the batch in an ambiguous partially-applied state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub outcome: RegistryOutcome,
    pub ignorados: Vec<Ignorado>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("tipo de arquivo não suportado: {0}")]
    UnsupportedFile(String),

    #[error("transição inválida: {acao} a partir de {de:?}")]
    InvalidTransition { de: Stage, acao: &'static str },

    #[error("resultado obsoleto: a sessão avançou desde o início da fase")]
    Stale,

    #[error("registro {0} não existe no lote")]
    IndexOutOfRange(usize),

    #[error("importação recusada: {0}")]
    ImportRefused(&'static str),
}

/// The orchestrating state machine holding the staging batch.
#[derive(Debug)]
pub struct ImportSession {
    stage: Stage,
    epoch: u64,
    fonte: Option<Fonte>,
    records: Vec<StagingAsset>,
    validation: Option<BatchValidation>,
    normalization: Option<NormalizationState>,
    progress: Progress,
    aviso: Option<String>,
    erro: Option<String>,
}

impl Default for ImportSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportSession {
    pub fn new() -> Self {
        ImportSession {
            stage: Stage::Upload,
            epoch: 0,
            fonte: None,
            records: Vec::new(),
            validation: None,
            normalization: None,
            progress: Progress::default(),
            aviso: None,
            erro: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn fonte(&self) -> Option<&Fonte> {
        self.fonte.as_ref()
    }

    pub fn records(&self) -> &[StagingAsset] {
        &self.records
    }

    pub fn validation(&self) -> Option<&BatchValidation> {
        self.validation.as_ref()
    }

    pub fn normalization(&self) -> Option<&NormalizationState> {
        self.normalization.as_ref()
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn aviso(&self) -> Option<&str> {
        self.aviso.as_deref()
    }

    pub fn erro(&self) -> Option<&str> {
        self.erro.as_deref()
    }

    fn bump(&mut self, stage: Stage) -> PhaseToken {
        self.epoch += 1;
        self.stage = stage;
        PhaseToken { epoch: self.epoch }
    }

    fn check_token(&self, token: PhaseToken) -> Result<(), SessionError> {
        if token.epoch == self.epoch {
            Ok(())
        } else {
            Err(SessionError::Stale)
        }
    }

    fn expect_stage(&self, esperado: Stage, acao: &'static str) -> Result<(), SessionError> {
        if self.stage == esperado {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                de: self.stage,
                acao,
            })
        }
    }

    /// `Upload → Extracting`. Unrecognized inputs never enter the machine.
    pub fn begin_extraction(&mut self, fonte: Fonte) -> Result<PhaseToken, SessionError> {
        self.expect_stage(Stage::Upload, "iniciar extração")?;
        if !fonte.reconhecida() {
            let nome = match &fonte {
                Fonte::Arquivo { nome } => nome.clone(),
                Fonte::DadosAbertos { filtro } => filtro.clone(),
            };
            return Err(SessionError::UnsupportedFile(nome));
        }
        self.fonte = Some(fonte);
        self.erro = None;
        self.progress = Progress::default();
        Ok(self.bump(Stage::Extracting))
    }

    /// Report page-granular extraction progress. Stale reports are
    /// rejected so a reset mid-extraction stops consuming results.
    pub fn report_progress(
        &mut self,
        token: PhaseToken,
        concluido: usize,
        total: usize,
    ) -> Result<(), SessionError> {
        self.check_token(token)?;
        self.expect_stage(Stage::Extracting, "registrar progresso")?;
        self.progress = Progress { concluido, total };
        Ok(())
    }

    /// `Extracting → Review`. Always reached, even with zero records; an
    /// empty batch is a warning, not a refusal.
    pub fn complete_extraction(
        &mut self,
        token: PhaseToken,
        records: Vec<StagingAsset>,
    ) -> Result<(), SessionError> {
        self.check_token(token)?;
        self.expect_stage(Stage::Extracting, "concluir extração")?;
        self.aviso = if records.is_empty() {
            Some("nenhum registro detectado na extração".to_string())
        } else {
            None
        };
        self.records = records;
        self.validation = None;
        self.normalization = None;
        self.bump(Stage::Review);
        Ok(())
    }

    /// `Extracting → Upload`: extraction is session-fatal but recoverable.
    pub fn fail_extraction(
        &mut self,
        token: PhaseToken,
        mensagem: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.check_token(token)?;
        self.expect_stage(Stage::Extracting, "falhar extração")?;
        self.records.clear();
        self.fonte = None;
        self.erro = Some(mensagem.into());
        self.bump(Stage::Upload);
        Ok(())
    }

    /// `Review → Validating`. Clears any cached validation result on entry.
    pub fn begin_validation(&mut self) -> Result<PhaseToken, SessionError> {
        self.expect_stage(Stage::Review, "iniciar validação")?;
        self.validation = None;
        Ok(self.bump(Stage::Validating))
    }

    /// `Validating → Review`, replacing the cached result.
    pub fn complete_validation(
        &mut self,
        token: PhaseToken,
        resultado: BatchValidation,
    ) -> Result<(), SessionError> {
        self.check_token(token)?;
        self.expect_stage(Stage::Validating, "concluir validação")?;
        self.validation = Some(resultado);
        self.bump(Stage::Review);
        Ok(())
    }

    /// `Validating → Review` without a result (e.g. the duplicate check
    /// failed after its bounded retries).
    pub fn fail_validation(
        &mut self,
        token: PhaseToken,
        mensagem: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.check_token(token)?;
        self.expect_stage(Stage::Validating, "falhar validação")?;
        self.erro = Some(mensagem.into());
        self.bump(Stage::Review);
        Ok(())
    }

    /// Attach the normalization state built for the current batch.
    pub fn set_normalization(&mut self, state: NormalizationState) -> Result<(), SessionError> {
        self.expect_stage(Stage::Review, "anexar normalização")?;
        self.normalization = Some(state);
        Ok(())
    }

    /// Edit one record. Only legal in `Review`; any edit invalidates the
    /// cached validation result so the commit gate never sees a stale
    /// snapshot.
    pub fn edit_record(&mut self, index: usize, edit: FieldEdit) -> Result<(), SessionError> {
        self.expect_stage(Stage::Review, "editar registro")?;
        let record = self
            .records
            .get(index)
            .cloned()
            .ok_or(SessionError::IndexOutOfRange(index))?;
        self.records[index] = record.com_edicao(edit);
        self.validation = None;
        Ok(())
    }

    /// Resolve one reference mapping across the whole batch. Counts as a
    /// record mutation, so the cached validation is invalidated too.
    pub fn apply_mapping(
        &mut self,
        kind: MappingKind,
        original_text: &str,
        codigo: &str,
    ) -> Result<usize, SessionError> {
        self.expect_stage(Stage::Review, "aplicar mapeamento")?;
        let Some(state) = self.normalization.as_mut() else {
            return Ok(0);
        };
        let tocados = state.apply_mapping(&mut self.records, kind, original_text, codigo);
        if tocados > 0 {
            self.validation = None;
        }
        Ok(tocados)
    }

    /// `Review → Importing`. Requires a current (non-stale) validation
    /// result, an attached normalization state and fully resolved groups.
    /// Records flagged invalid or duplicate are excluded from the payload
    /// and reported as skipped; they are never created.
    pub fn begin_import(&mut self) -> Result<ImportPlan, SessionError> {
        self.expect_stage(Stage::Review, "iniciar importação")?;
        let validation = self
            .validation
            .as_ref()
            .ok_or(SessionError::ImportRefused("lote ainda não validado"))?;
        let norma = self
            .normalization
            .as_ref()
            .ok_or(SessionError::ImportRefused("lote ainda não normalizado"))?;
        if norma.grupos_pendentes() > 0 {
            return Err(SessionError::ImportRefused(
                "há referências de local/categoria não resolvidas",
            ));
        }

        let mut prontos = Vec::new();
        let mut ignorados = Vec::new();
        for resultado in &validation.resultados {
            let record = &self.records[resultado.index];
            if resultado.valido && !resultado.duplicata {
                prontos.push(record.clone());
            } else {
                let mut motivos = resultado.erros.clone();
                if resultado.duplicata {
                    motivos.push("número de patrimônio duplicado".to_string());
                }
                ignorados.push(Ignorado {
                    index: resultado.index,
                    numero_patrimonio: record.numero_patrimonio.clone(),
                    motivos,
                });
            }
        }

        if prontos.is_empty() {
            return Err(SessionError::ImportRefused(
                "nenhum registro apto para importação",
            ));
        }

        let token = self.bump(Stage::Importing);
        Ok(ImportPlan {
            token,
            prontos,
            ignorados,
        })
    }

    /// `Importing → Completed`: the one commit succeeded; the session is
    /// finished and its batch discarded.
    pub fn complete_import(
        &mut self,
        plan: &ImportPlan,
        outcome: RegistryOutcome,
    ) -> Result<CommitSummary, SessionError> {
        self.check_token(plan.token)?;
        self.expect_stage(Stage::Importing, "concluir importação")?;
        let summary = CommitSummary {
            outcome,
            ignorados: plan.ignorados.clone(),
        };
        self.records.clear();
        self.validation = None;
        self.normalization = None;
        self.bump(Stage::Completed);
        Ok(summary)
    }

    /// `Importing → Review`: the commit failed. Never retried here; a
    /// blind retry could create duplicates.
    pub fn fail_import(
        &mut self,
        token: PhaseToken,
        mensagem: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.check_token(token)?;
        self.expect_stage(Stage::Importing, "falhar importação")?;
        self.erro = Some(mensagem.into());
        self.bump(Stage::Review);
        Ok(())
    }

    /// `Review → Upload`: explicit step-back discarding every extracted
    /// record. Not reachable from `Importing`.
    pub fn step_back(&mut self) -> Result<(), SessionError> {
        self.expect_stage(Stage::Review, "voltar para upload")?;
        self.records.clear();
        self.validation = None;
        self.normalization = None;
        self.fonte = None;
        self.aviso = None;
        self.bump(Stage::Upload);
        Ok(())
    }

    /// Abandon the session from any state, discarding everything.
    pub fn reset(&mut self) {
        self.records.clear();
        self.validation = None;
        self.normalization = None;
        self.fonte = None;
        self.aviso = None;
        self.erro = None;
        self.progress = Progress::default();
        self.bump(Stage::Cancelled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::build_state;
    use crate::staging::{EstadoConservacao, Origem, RefPendente};
    use crate::validate::validate_batch;
    use std::collections::HashSet;

    fn asset(tag: &str) -> StagingAsset {
        StagingAsset {
            origem: Origem::RelatorioPdf,
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

    fn sessao_em_review(records: Vec<StagingAsset>) -> ImportSession {
        let mut s = ImportSession::new();
        let token = s
            .begin_extraction(Fonte::Arquivo {
                nome: "inventario.pdf".to_string(),
            })
            .unwrap();
        s.complete_extraction(token, records).unwrap();
        s
    }

    fn validar(s: &mut ImportSession) {
        let token = s.begin_validation().unwrap();
        let resultado = validate_batch(s.records(), &HashSet::new());
        s.complete_validation(token, resultado).unwrap();
    }

    /// Attach a normalization state, resolve the fixture groups and run a
    /// final validation so `begin_import` sees a ready batch.
    fn pronto_para_importar(s: &mut ImportSession) {
        let state = build_state(s.records(), &[], &[]);
        s.set_normalization(state).unwrap();
        s.apply_mapping(MappingKind::Local, "SALA 101", "L-1").unwrap();
        s.apply_mapping(MappingKind::Categoria, "MOBILIÁRIO", "C-1")
            .unwrap();
        validar(s);
    }

    #[test]
    fn test_unsupported_file_never_enters_the_machine() {
        let mut s = ImportSession::new();
        let err = s
            .begin_extraction(Fonte::Arquivo {
                nome: "planilha.xlsx".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedFile(_)));
        assert_eq!(s.stage(), Stage::Upload);
    }

    #[test]
    fn test_zero_records_still_reach_review_with_warning() {
        let s = sessao_em_review(Vec::new());
        assert_eq!(s.stage(), Stage::Review);
        assert!(s.aviso().is_some());
    }

    #[test]
    fn test_edit_clears_cached_validation() {
        let mut s = sessao_em_review(vec![asset("000000001")]);
        validar(&mut s);
        assert!(s.validation().is_some());

        s.edit_record(0, FieldEdit::Marca(Some("ACME".to_string())))
            .unwrap();
        assert!(s.validation().is_none());
    }

    #[test]
    fn test_edit_outside_review_is_refused() {
        let mut s = ImportSession::new();
        let err = s
            .edit_record(0, FieldEdit::Marca(None))
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { .. }));
    }

    #[test]
    fn test_import_refused_without_current_validation() {
        let mut s = sessao_em_review(vec![asset("000000001")]);
        assert!(matches!(
            s.begin_import(),
            Err(SessionError::ImportRefused(_))
        ));

        pronto_para_importar(&mut s);
        // An edit after validation makes the cached snapshot stale again.
        s.edit_record(0, FieldEdit::Observacoes(Some("ok".to_string())))
            .unwrap();
        assert!(matches!(
            s.begin_import(),
            Err(SessionError::ImportRefused(_))
        ));
    }

    #[test]
    fn test_import_requires_normalization_state() {
        let mut s = sessao_em_review(vec![asset("000000001")]);
        validar(&mut s);
        // Validated but never normalized: the plan must be refused.
        assert!(matches!(
            s.begin_import(),
            Err(SessionError::ImportRefused(_))
        ));
    }

    #[test]
    fn test_import_plan_splits_ready_and_skipped() {
        let mut invalido = asset("123");
        invalido.nome_bem.clear();
        let records = vec![
            asset("000000001"),
            asset("000000002"),
            asset("000000003"),
            invalido,
        ];
        let mut s = sessao_em_review(records);
        pronto_para_importar(&mut s);

        let plan = s.begin_import().unwrap();
        assert_eq!(plan.prontos.len(), 3);
        assert_eq!(plan.ignorados.len(), 1);
        assert_eq!(plan.ignorados[0].index, 3);
        assert!(!plan.ignorados[0].motivos.is_empty());

        let summary = s
            .complete_import(
                &plan,
                RegistryOutcome {
                    criados: 3,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(summary.outcome.criados, 3);
        assert_eq!(summary.ignorados.len(), 1);
        assert_eq!(s.stage(), Stage::Completed);
        assert!(s.records().is_empty());
    }

    #[test]
    fn test_import_refused_with_unresolved_groups() {
        let mut s = sessao_em_review(vec![asset("000000001")]);
        validar(&mut s);
        let state = build_state(s.records(), &[], &[]);
        s.set_normalization(state).unwrap();

        assert!(matches!(
            s.begin_import(),
            Err(SessionError::ImportRefused(_))
        ));
    }

    #[test]
    fn test_mapping_application_clears_validation() {
        let mut s = sessao_em_review(vec![asset("000000001")]);
        validar(&mut s);
        let state = build_state(s.records(), &[], &[]);
        s.set_normalization(state).unwrap();
        validar(&mut s);

        let tocados = s
            .apply_mapping(MappingKind::Local, "SALA 101", "L-1")
            .unwrap();
        assert_eq!(tocados, 1);
        assert!(s.validation().is_none());
    }

    #[test]
    fn test_commit_failure_returns_to_review_keeping_records() {
        let mut s = sessao_em_review(vec![asset("000000001")]);
        pronto_para_importar(&mut s);
        let plan = s.begin_import().unwrap();

        s.fail_import(plan.token, "falha de rede").unwrap();
        assert_eq!(s.stage(), Stage::Review);
        assert_eq!(s.records().len(), 1);
        assert!(s.erro().is_some());

        // The old plan token is dead; completing with it must not work.
        assert_eq!(
            s.complete_import(&plan, RegistryOutcome::default()),
            Err(SessionError::Stale)
        );
    }

    #[test]
    fn test_step_back_discards_records_and_is_review_only() {
        let mut s = sessao_em_review(vec![asset("000000001")]);
        s.step_back().unwrap();
        assert_eq!(s.stage(), Stage::Upload);
        assert!(s.records().is_empty());

        let mut s = sessao_em_review(vec![asset("000000001")]);
        pronto_para_importar(&mut s);
        s.begin_import().unwrap();
        assert!(matches!(
            s.step_back(),
            Err(SessionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_progress_accumulates_per_page() {
        let mut s = ImportSession::new();
        let token = s
            .begin_extraction(Fonte::Arquivo {
                nome: "inventario.pdf".to_string(),
            })
            .unwrap();

        for feito in 1..=3 {
            s.report_progress(token, feito, 3).unwrap();
            assert_eq!(
                s.progress(),
                Progress {
                    concluido: feito,
                    total: 3
                }
            );
        }
    }

    #[test]
    fn test_reset_mid_extraction_discards_partials_and_stales_tokens() {
        let mut s = ImportSession::new();
        let token = s
            .begin_extraction(Fonte::Arquivo {
                nome: "inventario.pdf".to_string(),
            })
            .unwrap();
        s.report_progress(token, 2, 5).unwrap();

        s.reset();
        assert_eq!(s.stage(), Stage::Cancelled);

        // The in-flight completion arrives late and is discarded.
        assert_eq!(
            s.complete_extraction(token, vec![asset("000000001")]),
            Err(SessionError::Stale)
        );
        assert!(s.records().is_empty());
    }

    #[test]
    fn test_fresh_session_after_failed_extraction() {
        let mut s = ImportSession::new();
        let token = s
            .begin_extraction(Fonte::Arquivo {
                nome: "digitalizado.pdf".to_string(),
            })
            .unwrap();
        s.fail_extraction(token, "PDF protegido por senha").unwrap();
        assert_eq!(s.stage(), Stage::Upload);
        assert!(s.erro().is_some());

        // The same file can be re-uploaded into a fresh, empty batch.
        let token = s
            .begin_extraction(Fonte::Arquivo {
                nome: "digitalizado.pdf".to_string(),
            })
            .unwrap();
        s.complete_extraction(token, Vec::new()).unwrap();
        assert_eq!(s.stage(), Stage::Review);
        assert!(s.records().is_empty());
    }

    #[test]
    fn test_validation_round_trip_replaces_cache() {
        let mut s = sessao_em_review(vec![asset("000000001")]);
        validar(&mut s);
        let primeira = s.validation().cloned();
        validar(&mut s);
        assert_eq!(s.validation().cloned(), primeira);
    }
}
