use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::core::traits::AccountSource;
use crate::core::types::{Account as AccountBalances, AccountInfo, AccountType};
use crate::exchanges::huobi::{conversions, rest::HuobiRest};
use async_trait::async_trait;
use tracing::instrument;

/// Account lookups and balances
#[derive(Debug)]
pub struct Account<R: RestClient> {
    rest: HuobiRest<R>,
    account_id: String,
}

impl<R: RestClient + Clone> Account<R> {
    pub fn new(rest: &R, account_id: String) -> Self {
        Self {
            rest: HuobiRest::new(rest.clone()),
            account_id,
        }
    }
}

impl<R: RestClient> Account<R> {
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// First account of the given type
    #[instrument(skip(self), fields(exchange = "huobi"))]
    pub async fn get_account_info(
        &self,
        account_type: AccountType,
    ) -> Result<AccountInfo, ExchangeError> {
        let accounts = self.rest.get_accounts().await?;
        accounts
            .into_iter()
            .find(|account| account.account_type == account_type.as_str())
            .map(|account| AccountInfo {
                id: account.id,
                account_type,
                state: account.state,
            })
            .ok_or_else(|| ExchangeError::AccountNotFound(account_type.as_str().to_string()))
    }
}

#[async_trait]
impl<R: RestClient> AccountSource for Account<R> {
    async fn get_account(&self) -> Result<AccountBalances, ExchangeError> {
        if self.account_id.is_empty() {
            return Err(ExchangeError::InvalidParameters(
                "account id is not set".to_string(),
            ));
        }
        let balance = self.rest.get_balance(&self.account_id).await?;
        conversions::convert_account(balance)
    }
}
