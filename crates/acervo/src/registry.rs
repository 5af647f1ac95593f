//! HTTP client for the asset registry API.
//!
//! The duplicate check is an idempotent read and may be retried a bounded
//! number of times. The commit call is issued exactly once: a blind retry
//! after an ambiguous failure could create assets twice.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::prelude::{eyre, Result};
use acervo_core::normalize::TaxonomyEntry;
use acervo_core::session::RegistryOutcome;
use acervo_core::staging::StagingAsset;

/// Upper bound on duplicate-check attempts.
const MAX_TENTATIVAS_CONSULTA: usize = 3;
const INTERVALO_RETENTATIVA: Duration = Duration::from_millis(500);

/// Registry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub base_url: String,
    pub email: String,
    pub api_token: String,
}

impl RegistryConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: std::env::var("ACERVO_REGISTRY_URL")
                .map_err(|_| eyre!("ACERVO_REGISTRY_URL environment variable not set"))?,
            email: std::env::var("ACERVO_REGISTRY_EMAIL")
                .map_err(|_| eyre!("ACERVO_REGISTRY_EMAIL environment variable not set"))?,
            api_token: std::env::var("ACERVO_REGISTRY_TOKEN")
                .map_err(|_| eyre!("ACERVO_REGISTRY_TOKEN environment variable not set"))?,
        })
    }
}

/// Create an authenticated HTTP client with Basic Auth headers.
fn create_authenticated_client(config: &RegistryConfig) -> Result<reqwest::Client> {
    use base64::Engine;
    use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

    let auth_string = format!("{}:{}", config.email, config.api_token);
    let auth_encoded = base64::engine::general_purpose::STANDARD.encode(&auth_string);

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Basic {auth_encoded}"))
            .map_err(|e| eyre!("Invalid authorization header: {}", e))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| eyre!("Failed to build HTTP client: {}", e))
}

#[derive(Debug, Serialize)]
struct ExistsRequest<'a> {
    etiquetas: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ExistsResponse {
    existentes: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    bens: &'a [StagingAsset],
}

pub struct RegistryClient {
    client: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        Ok(RegistryClient {
            client: create_authenticated_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// One batched existence check for the whole batch, never a call per
    /// record. Retried up to [`MAX_TENTATIVAS_CONSULTA`] times.
    pub async fn exists_by_tag(&self, etiquetas: &[String]) -> Result<HashSet<String>, Error> {
        let url = format!("{}/patrimonio/existe-etiqueta", self.base_url);

        let mut ultimo_erro = None;
        for tentativa in 1..=MAX_TENTATIVAS_CONSULTA {
            let resultado = self
                .client
                .post(&url)
                .json(&ExistsRequest { etiquetas })
                .send()
                .await;

            match resultado {
                Ok(resp) => match resp.error_for_status() {
                    Ok(resp) => {
                        let body: ExistsResponse = resp.json().await?;
                        return Ok(body.existentes.into_iter().collect());
                    }
                    Err(e) => ultimo_erro = Some(Error::from(e)),
                },
                Err(e) => ultimo_erro = Some(Error::from(e)),
            }

            log::warn!("duplicate check attempt {tentativa} failed, retrying");
            if tentativa < MAX_TENTATIVAS_CONSULTA {
                tokio::time::sleep(INTERVALO_RETENTATIVA).await;
            }
        }

        Err(ultimo_erro.unwrap_or_else(|| Error::Network("duplicate check failed".to_string())))
    }

    pub async fn list_categorias(&self) -> Result<Vec<TaxonomyEntry>, Error> {
        self.list_taxonomy("categorias").await
    }

    pub async fn list_locais(&self) -> Result<Vec<TaxonomyEntry>, Error> {
        self.list_taxonomy("locais").await
    }

    pub async fn list_setores(&self) -> Result<Vec<TaxonomyEntry>, Error> {
        self.list_taxonomy("setores").await
    }

    async fn list_taxonomy(&self, recurso: &str) -> Result<Vec<TaxonomyEntry>, Error> {
        let url = format!("{}/{recurso}", self.base_url);
        let resp = self.client.get(&url).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }

    /// The single irreversible commit call. Never retried here: on failure
    /// the session returns to review and the user decides.
    pub async fn commit_batch(&self, bens: &[StagingAsset]) -> Result<RegistryOutcome, Error> {
        let url = format!("{}/patrimonio/importar", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&CommitRequest { bens })
            .send()
            .await
            .map_err(|e| Error::CommitFailed(e.to_string()))?;
        let resp = resp
            .error_for_status()
            .map_err(|e| Error::CommitFailed(e.to_string()))?;
        resp.json()
            .await
            .map_err(|e| Error::CommitFailed(e.to_string()))
    }
}
