use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::Signer;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Method, Response};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{instrument, trace};

/// REST client trait for making HTTP requests
///
/// This trait provides a unified interface for HTTP operations. The
/// implementation decides how authentication parameters are attached; callers
/// only say whether a request must be signed.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Make a GET request
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint path
    /// * `query_params` - Query parameters as key-value pairs
    /// * `authenticated` - Whether to sign the request
    ///
    /// # Returns
    /// The response body as a JSON value
    async fn get(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<Value, ExchangeError>;

    /// Make a POST request
    ///
    /// The parameters travel twice: encoded in the query string and as a flat
    /// JSON object in the body.
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint path
    /// * `params` - Request parameters as key-value pairs
    /// * `authenticated` - Whether to sign the request
    ///
    /// # Returns
    /// The response body as a JSON value
    async fn post(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<Value, ExchangeError>;
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Exchange name for logging and tracing
    pub exchange_name: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl RestClientConfig {
    /// Create a new configuration
    ///
    /// # Arguments
    /// * `base_url` - Base URL for the API
    /// * `exchange_name` - Name of the exchange
    pub fn new(base_url: String, exchange_name: String) -> Self {
        Self {
            base_url,
            exchange_name,
            timeout_seconds: 30,
            user_agent: "huobix/0.1".to_string(),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
}

impl RestClientBuilder {
    /// Create a new builder with the given configuration
    pub fn new(config: RestClientConfig) -> Self {
        Self {
            config,
            signer: None,
        }
    }

    /// Set the signer for authenticated requests
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Build the REST client
    pub fn build(self) -> Result<ReqwestRest, ExchangeError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(self.config.timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| ExchangeError::NetworkError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(ReqwestRest {
            client,
            config: self.config,
            signer: self.signer,
        })
    }
}

/// Implementation of `RestClient` using reqwest
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .field("has_signer", &self.signer.is_some())
            .finish_non_exhaustive()
    }
}

/// Percent-encode parameters into `k=v&k=v` in the given order
pub fn create_query_string<K, V>(params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    params
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                urlencoding::encode(k.as_ref()),
                urlencoding::encode(v.as_ref())
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

impl ReqwestRest {
    /// Create a new `ReqwestRest` instance with default settings
    pub fn new(
        base_url: String,
        exchange_name: String,
        signer: Option<Arc<dyn Signer>>,
    ) -> Result<Self, ExchangeError> {
        let mut builder = RestClientBuilder::new(RestClientConfig::new(base_url, exchange_name));
        if let Some(signer) = signer {
            builder = builder.with_signer(signer);
        }
        builder.build()
    }

    pub fn config(&self) -> &RestClientConfig {
        &self.config
    }

    fn build_url(&self, endpoint: &str, query_string: &str) -> String {
        if query_string.is_empty() {
            format!("{}{}", self.config.base_url, endpoint)
        } else {
            format!("{}{}?{}", self.config.base_url, endpoint, query_string)
        }
    }

    /// Attach authentication fields when required
    fn prepare_params(
        &self,
        method: &Method,
        endpoint: &str,
        params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<Vec<(String, String)>, ExchangeError> {
        if !authenticated {
            return Ok(params
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect());
        }

        let signer = self.signer.as_ref().ok_or_else(|| {
            ExchangeError::AuthError("Authentication required but no signer provided".to_string())
        })?;
        signer.sign_request(method.as_str(), endpoint, params)
    }

    /// Handle the response and extract JSON
    #[instrument(skip(self, response), fields(exchange = %self.config.exchange_name, status = %response.status()))]
    async fn handle_response(&self, response: Response) -> Result<Value, ExchangeError> {
        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            ExchangeError::NetworkError(format!("Failed to read response body: {}", e))
        })?;

        trace!("Response body: {}", response_text);

        if status.is_success() {
            serde_json::from_str(&response_text).map_err(|e| {
                ExchangeError::DeserializationError(format!("Failed to parse JSON response: {}", e))
            })
        } else {
            Err(ExchangeError::HttpStatus {
                status: status.as_u16(),
                body: response_text,
            })
        }
    }

    #[instrument(skip(self, params), fields(exchange = %self.config.exchange_name, method = %method, endpoint = %endpoint))]
    async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<Value, ExchangeError> {
        let params = self.prepare_params(&method, endpoint, params, authenticated)?;
        let url = self.build_url(endpoint, &create_query_string(&params));
        let mut request = self.client.request(method.clone(), &url);

        if method == Method::POST {
            let body: Map<String, Value> = params
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            let body_bytes = serde_json::to_vec(&body).map_err(|e| {
                ExchangeError::SerializationError(format!("Failed to serialize request body: {}", e))
            })?;
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body_bytes);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExchangeError::NetworkError(format!("Request failed: {}", e)))?;

        self.handle_response(response).await
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    #[instrument(skip(self, query_params), fields(exchange = %self.config.exchange_name, endpoint = %endpoint, param_count = query_params.len()))]
    async fn get(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<Value, ExchangeError> {
        self.make_request(Method::GET, endpoint, query_params, authenticated)
            .await
    }

    #[instrument(skip(self, params), fields(exchange = %self.config.exchange_name, endpoint = %endpoint, param_count = params.len()))]
    async fn post(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<Value, ExchangeError> {
        self.make_request(Method::POST, endpoint, params, authenticated)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_string_is_percent_encoded() {
        let params = [("Timestamp", "2024-01-01T00:00:00"), ("symbol", "btcusdt")];
        assert_eq!(
            create_query_string(&params),
            "Timestamp=2024-01-01T00%3A00%3A00&symbol=btcusdt"
        );
    }

    #[test]
    fn test_query_string_empty() {
        let params: [(&str, &str); 0] = [];
        assert_eq!(create_query_string(&params), "");
    }

    #[test]
    fn test_build_url() {
        let rest = ReqwestRest::new(
            "https://api.example.com".to_string(),
            "huobi".to_string(),
            None,
        )
        .unwrap();

        assert_eq!(
            rest.build_url("/market/depth", "symbol=btcusdt"),
            "https://api.example.com/market/depth?symbol=btcusdt"
        );
        assert_eq!(
            rest.build_url("/v1/common/symbols", ""),
            "https://api.example.com/v1/common/symbols"
        );
    }

    #[tokio::test]
    async fn test_authenticated_request_without_signer() {
        let rest = ReqwestRest::new(
            "https://api.example.com".to_string(),
            "huobi".to_string(),
            None,
        )
        .unwrap();

        let result = rest.get("/v1/account/accounts", &[], true).await;
        assert!(matches!(result, Err(ExchangeError::AuthError(_))));
    }
}
