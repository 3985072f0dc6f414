// Epicor REST v1 Client
// Business Activity Queries, OData entity sets and business-object method calls
// Basic auth with the company carried in the CallSettings header on every request

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum EpicorError {
    #[error("Epicor API error ({0}): {1}")]
    ApiError(StatusCode, String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("{service}/{method} returned no dataset")]
    MissingDataset { service: String, method: String },

    #[error("Dataset has no {0}")]
    MissingRow(String),
}

pub type Result<T> = std::result::Result<T, EpicorError>;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct EpicorConfig {
    pub server: String,
    pub instance: String,
    pub username: String,
    pub password: String,
    pub company: String,
    pub api_key: Option<String>,
    pub accept_invalid_certs: bool,
    pub timeout_secs: u64,
}

impl EpicorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.server.is_empty() {
            return Err(EpicorError::ConfigError("server is required".to_string()));
        }
        url::Url::parse(&self.server)
            .map_err(|e| EpicorError::ConfigError(format!("server '{}' is not a URL: {}", self.server, e)))?;
        if self.instance.is_empty() {
            return Err(EpicorError::ConfigError("instance is required".to_string()));
        }
        if self.username.is_empty() {
            return Err(EpicorError::ConfigError("username is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(EpicorError::ConfigError("password is required".to_string()));
        }
        if self.company.is_empty() {
            return Err(EpicorError::ConfigError("company is required".to_string()));
        }
        Ok(())
    }

    pub fn api_base(&self) -> String {
        format!(
            "{}/{}/api/v1",
            self.server.trim_end_matches('/'),
            self.instance.trim_matches('/')
        )
    }
}

// ============================================================================
// Response Shapes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ODataList<T> {
    pub value: Vec<T>,
}

/// Body returned by a business-object method call
#[derive(Debug, Default, Deserialize)]
pub struct MethodResponse {
    #[serde(rename = "returnObj", default)]
    pub return_obj: Option<Value>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl MethodResponse {
    /// The updated dataset: the `ds` out-parameter, else a dataset-shaped return value
    pub fn into_dataset(mut self) -> Option<Value> {
        self.parameters
            .remove("ds")
            .or_else(|| self.return_obj.filter(Value::is_object))
    }
}

// ============================================================================
// Epicor Client
// ============================================================================

pub struct EpicorClient {
    config: EpicorConfig,
    http_client: Client,
    call_settings: String,
}

impl EpicorClient {
    /// Create a new Epicor client
    pub fn new(config: EpicorConfig) -> Result<Self> {
        config.validate()?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .cookie_store(true)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(EpicorError::NetworkError)?;

        let call_settings = json!({
            "Company": config.company,
            "Plant": "",
            "Language": "",
            "FormatCulture": ""
        })
        .to_string();

        Ok(Self {
            config,
            http_client,
            call_settings,
        })
    }

    pub fn company(&self) -> &str {
        &self.config.company
    }

    // ========================================================================
    // Business Activity Queries
    // ========================================================================

    /// Run a BAQ and return its rows
    pub async fn get_baq_results(
        &self,
        baq_id: &str,
        parameters: &[(&str, String)],
    ) -> Result<Vec<Map<String, Value>>> {
        let url = format!("{}/BaqSvc/{}/", self.config.api_base(), baq_id);

        tracing::debug!("Calling BAQ {} with {} parameter(s)", baq_id, parameters.len());

        let response = self
            .authorized(self.http_client.get(&url))
            .query(parameters)
            .send()
            .await?;

        self.handle_list_response(response).await
    }

    // ========================================================================
    // OData Entity Sets
    // ========================================================================

    /// Query an entity set with an OData `$filter` (and optional `$select`)
    pub async fn list<T: DeserializeOwned>(
        &self,
        service: &str,
        entity_set: &str,
        filter: &str,
        select: Option<&str>,
    ) -> Result<Vec<T>> {
        let url = format!("{}/{}/{}", self.config.api_base(), service, entity_set);

        let mut query = vec![("$filter", filter.to_string())];
        if let Some(select) = select {
            query.push(("$select", select.to_string()));
        }

        tracing::debug!("GET {}/{} $filter={}", service, entity_set, filter);

        let response = self
            .authorized(self.http_client.get(&url))
            .query(&query)
            .send()
            .await?;

        self.handle_list_response(response).await
    }

    /// Create a row in an entity set
    pub async fn create(&self, service: &str, entity_set: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/{}/{}", self.config.api_base(), service, entity_set);

        tracing::debug!("POST {}/{}", service, entity_set);

        let response = self
            .authorized(self.http_client.post(&url))
            .json(body)
            .send()
            .await?;

        let text = self.success_text(response).await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    // ========================================================================
    // Business-Object Methods
    // ========================================================================

    /// Invoke a business-object method, e.g. `Erp.BO.APInvoiceSvc/Update`
    pub async fn call_method(&self, service: &str, method: &str, body: &Value) -> Result<MethodResponse> {
        let url = format!("{}/{}/{}", self.config.api_base(), service, method);

        tracing::debug!("POST {}/{}", service, method);

        let response = self
            .authorized(self.http_client.post(&url))
            .json(body)
            .send()
            .await?;

        let text = self.success_text(response).await?;
        if text.trim().is_empty() {
            return Ok(MethodResponse::default());
        }
        Ok(serde_json::from_str(&text)?)
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header("Accept", "application/json")
            .header("CallSettings", &self.call_settings);

        match &self.config.api_key {
            Some(api_key) => builder.header("x-api-key", api_key),
            None => builder,
        }
    }

    async fn handle_list_response<T: DeserializeOwned>(&self, response: Response) -> Result<Vec<T>> {
        let status = response.status();

        if !status.is_success() {
            return self.handle_error_response(response).await;
        }

        let list: ODataList<T> = response.json().await?;
        Ok(list.value)
    }

    async fn success_text(&self, response: Response) -> Result<String> {
        if !response.status().is_success() {
            return self.handle_error_response(response).await;
        }
        Ok(response.text().await?)
    }

    async fn handle_error_response<T>(&self, response: Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        let message = extract_error_message(&body);

        Err(match status {
            StatusCode::NOT_FOUND => EpicorError::NotFound(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => EpicorError::AuthError(message),
            _ => EpicorError::ApiError(status, message),
        })
    }
}

/// Epicor errors carry the business-layer message in `ErrorMessage`
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("ErrorMessage").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Quote a value for use inside an OData `$filter` literal
pub fn odata_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

// ============================================================================
// Tests
// ============================================================================
