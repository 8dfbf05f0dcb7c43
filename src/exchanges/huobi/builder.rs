use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{ReqwestRest, RestClientBuilder, RestClientConfig, WsConfig};
use crate::core::types::AccountType;
use crate::exchanges::huobi::connector::{Account, HuobiConnector, Streams};
use crate::exchanges::huobi::signer::HuobiSigner;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.huobi.pro";
pub const DEFAULT_WS_URL: &str = "wss://api.huobi.pro/ws";

/// Builder for Huobi connectors
///
/// Credentials, account id and endpoint overrides come from the
/// [`ExchangeConfig`]; transport tuning is set with the `with_*` methods.
pub struct HuobiBuilder {
    config: ExchangeConfig,
    rest_timeout: u64,
    user_agent: Option<String>,
    ws_config: WsConfig,
}

impl Default for HuobiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HuobiBuilder {
    pub fn new() -> Self {
        Self {
            config: ExchangeConfig::read_only(),
            rest_timeout: 30,
            user_agent: None,
            ws_config: WsConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExchangeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_credentials(mut self, api_key: String, secret_key: String) -> Self {
        let previous = std::mem::replace(
            &mut self.config,
            ExchangeConfig::new(api_key, secret_key),
        );
        self.config.account_id = previous.account_id;
        self.config.base_url = previous.base_url;
        self.config.ws_url = previous.ws_url;
        self
    }

    pub fn with_account_id(mut self, account_id: String) -> Self {
        self.config.account_id = Some(account_id);
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.config.base_url = Some(base_url);
        self
    }

    pub fn with_ws_url(mut self, ws_url: String) -> Self {
        self.config.ws_url = Some(ws_url);
        self
    }

    /// REST request timeout in seconds
    pub fn with_rest_timeout(mut self, timeout: u64) -> Self {
        self.rest_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = Some(user_agent);
        self
    }

    /// Interval between client `ping` frames on the market feed
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.ws_config.heartbeat_interval_ms = duration_ms(interval);
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.ws_config.max_reconnect_attempts = attempts;
        self
    }

    /// Initial reconnect delay, doubled after each failed attempt
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.ws_config.reconnect_delay_ms = duration_ms(delay);
        self
    }

    fn base_url(&self) -> String {
        self.config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    fn build_rest(&self) -> Result<ReqwestRest, ExchangeError> {
        let base_url = self.base_url();
        let mut rest_config = RestClientConfig::new(base_url.clone(), "huobi".to_string())
            .with_timeout(self.rest_timeout);
        if let Some(user_agent) = &self.user_agent {
            rest_config = rest_config.with_user_agent(user_agent.clone());
        }

        let mut rest_builder = RestClientBuilder::new(rest_config);
        if self.config.has_credentials() {
            let signer = Arc::new(HuobiSigner::new(
                self.config.api_key().to_string(),
                self.config.secret_key().to_string(),
                &base_url,
            ));
            rest_builder = rest_builder.with_signer(signer);
        }
        rest_builder.build()
    }

    fn assemble(
        &self,
        rest: ReqwestRest,
        account_id: String,
    ) -> HuobiConnector<ReqwestRest> {
        let ws_url = self
            .config
            .ws_url
            .clone()
            .unwrap_or_else(|| DEFAULT_WS_URL.to_string());
        let streams = Streams::new(ws_url, self.ws_config.clone());
        HuobiConnector::new(rest, account_id, streams)
    }

    /// Build a connector using the configured account id, if any
    pub fn build(self) -> Result<HuobiConnector<ReqwestRest>, ExchangeError> {
        let rest = self.build_rest()?;
        let account_id = self.config.account_id.clone().unwrap_or_default();
        Ok(self.assemble(rest, account_id))
    }

    /// Build a spot trading connector, looking up the spot account id
    ///
    /// A failed lookup is logged and leaves the account id empty; market data
    /// still works and account-bound calls fail with `InvalidParameters`.
    pub async fn build_spot(self) -> Result<HuobiConnector<ReqwestRest>, ExchangeError> {
        let rest = self.build_rest()?;
        let account_id = match resolve_account(&rest, AccountType::Spot).await {
            Ok(id) => id,
            Err(e) => {
                warn!("spot account lookup failed, account id left empty: {}", e);
                String::new()
            }
        };
        Ok(self.assemble(rest, account_id))
    }

    /// Build a point card connector; fails when the point account cannot be found
    pub async fn build_point(self) -> Result<HuobiConnector<ReqwestRest>, ExchangeError> {
        let rest = self.build_rest()?;
        let account_id = resolve_account(&rest, AccountType::Point).await?;
        Ok(self.assemble(rest, account_id))
    }
}

async fn resolve_account(
    rest: &ReqwestRest,
    account_type: AccountType,
) -> Result<String, ExchangeError> {
    let info = Account::new(rest, String::new())
        .get_account_info(account_type)
        .await?;
    info!(account_id = %info.id, state = %info.state, "resolved {} account", account_type);
    Ok(info.id)
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
