//! Cliente HTTP para la API FIPE
//!
//! Este módulo contiene el cliente HTTP para la tabla FIPE
//! (https://parallelum.com.br/fipe/api/v2). Cada llamada tiene timeout
//! acotado y falla sin reintentos: la política de recuperación pertenece
//! al orquestador de búsqueda, no al cliente. El cliente tampoco escribe
//! al cache, para mantener la política de cacheo centralizada.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::environment::EnvironmentConfig;
use crate::models::vehicle::VehicleClass;

/// Marca según FIPE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FipeBrand {
    pub code: String,
    pub name: String,
}

/// Modelo según FIPE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FipeModel {
    pub code: String,
    pub name: String,
}

/// Año/combustible según FIPE (ej. code "2023-1", name "2023 Gasolina")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FipeYear {
    pub code: String,
    pub name: String,
}

/// Detalle crudo de un vehículo tal como lo entrega FIPE.
/// Todos los campos son opcionales: el upstream es conocido por omitirlos.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFipeVehicle {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub model_year: Option<i32>,
    pub fuel: Option<String>,
    pub fuel_acronym: Option<String>,
    /// Precio localizado, ej. "R$ 45.000,00"
    pub price: Option<String>,
    pub code_fipe: Option<String>,
    pub reference_month: Option<String>,
    pub vehicle_type: Option<i32>,
}

/// Fallos del upstream; sin reintentos internos
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("error de red hacia FIPE: {0}")]
    Request(#[from] reqwest::Error),

    #[error("FIPE respondió HTTP {0}")]
    Status(StatusCode),

    #[error("respuesta FIPE inesperada: {0}")]
    UnexpectedPayload(String),
}

/// Operaciones contra la tabla FIPE.
/// El orquestador depende de este trait, lo que permite reemplazar el
/// cliente real por dobles en los tests.
#[async_trait]
pub trait FipeApi: Send + Sync {
    async fn fetch_brands(&self, class: VehicleClass) -> Result<Vec<FipeBrand>, UpstreamError>;

    async fn fetch_models(
        &self,
        class: VehicleClass,
        brand_id: &str,
    ) -> Result<Vec<FipeModel>, UpstreamError>;

    async fn fetch_years(
        &self,
        class: VehicleClass,
        brand_id: &str,
        model_id: &str,
    ) -> Result<Vec<FipeYear>, UpstreamError>;

    async fn fetch_detail(
        &self,
        class: VehicleClass,
        brand_id: &str,
        model_id: &str,
        year_id: &str,
    ) -> Result<RawFipeVehicle, UpstreamError>;

    async fn fetch_years_by_code(
        &self,
        class: VehicleClass,
        fipe_code: &str,
    ) -> Result<Vec<FipeYear>, UpstreamError>;

    async fn fetch_detail_by_code(
        &self,
        class: VehicleClass,
        fipe_code: &str,
        year_id: &str,
    ) -> Result<RawFipeVehicle, UpstreamError>;
}

/// Cliente HTTP real contra FIPE
pub struct FipeClient {
    client: Client,
    base_url: String,
}

impl FipeClient {
    /// Crear el cliente con timeout acotado desde la configuración
    pub fn new(config: &EnvironmentConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.fipe_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, UpstreamError> {
        debug!("🌐 GET {}", url);
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status()));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl FipeApi for FipeClient {
    async fn fetch_brands(&self, class: VehicleClass) -> Result<Vec<FipeBrand>, UpstreamError> {
        self.get_json(format!("{}/{}/brands", self.base_url, class.as_segment()))
            .await
    }

    async fn fetch_models(
        &self,
        class: VehicleClass,
        brand_id: &str,
    ) -> Result<Vec<FipeModel>, UpstreamError> {
        self.get_json(format!(
            "{}/{}/brands/{}/models",
            self.base_url,
            class.as_segment(),
            brand_id
        ))
        .await
    }

    async fn fetch_years(
        &self,
        class: VehicleClass,
        brand_id: &str,
        model_id: &str,
    ) -> Result<Vec<FipeYear>, UpstreamError> {
        self.get_json(format!(
            "{}/{}/brands/{}/models/{}/years",
            self.base_url,
            class.as_segment(),
            brand_id,
            model_id
        ))
        .await
    }

    async fn fetch_detail(
        &self,
        class: VehicleClass,
        brand_id: &str,
        model_id: &str,
        year_id: &str,
    ) -> Result<RawFipeVehicle, UpstreamError> {
        self.get_json(format!(
            "{}/{}/brands/{}/models/{}/years/{}",
            self.base_url,
            class.as_segment(),
            brand_id,
            model_id,
            year_id
        ))
        .await
    }

    async fn fetch_years_by_code(
        &self,
        class: VehicleClass,
        fipe_code: &str,
    ) -> Result<Vec<FipeYear>, UpstreamError> {
        self.get_json(format!(
            "{}/{}/{}/years",
            self.base_url,
            class.as_segment(),
            fipe_code
        ))
        .await
    }

    async fn fetch_detail_by_code(
        &self,
        class: VehicleClass,
        fipe_code: &str,
        year_id: &str,
    ) -> Result<RawFipeVehicle, UpstreamError> {
        self.get_json(format!(
            "{}/{}/{}/years/{}",
            self.base_url,
            class.as_segment(),
            fipe_code,
            year_id
        ))
        .await
    }
}
