/// Transport kernel shared by the connector
///
/// The kernel holds only transport concerns: HTTP round trips, WebSocket
/// connection management and the pluggable pieces an exchange module supplies.
///
/// # Components
///
/// ## Transport Layer
/// - `RestClient`: HTTP client interface returning raw JSON
/// - `WsSession`: WebSocket connection management
/// - `ReconnectWs`: Automatic reconnection wrapper that replays subscriptions
///
/// ## Authentication
/// - `Signer`: turns caller parameters into the full signed parameter list
///
/// ## Message Handling
/// - `WsCodec`: Exchange-specific frame encoding/decoding
///
/// # Example
/// ```rust,no_run
/// use huobix::core::kernel::*;
/// use huobix::exchanges::huobi::signer::HuobiSigner;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let rest_config = RestClientConfig::new(
///     "https://api.huobi.pro".to_string(),
///     "huobi".to_string(),
/// );
/// let signer = Arc::new(HuobiSigner::new(
///     "access_key".to_string(),
///     "secret_key".to_string(),
///     "https://api.huobi.pro",
/// ));
/// let rest = RestClientBuilder::new(rest_config)
///     .with_signer(signer)
///     .build()?;
///
/// let accounts = rest.get("/v1/account/accounts", &[], true).await?;
/// println!("{}", accounts);
/// # Ok(())
/// # }
/// ```
pub mod codec;
pub mod rest;
pub mod signer;
pub mod ws;

pub use codec::WsCodec;
pub use rest::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use signer::{SignatureResult, Signer};
pub use ws::{ReconnectEvent, ReconnectWs, TungsteniteWs, WsConfig, WsSession};
