use crate::core::errors::ExchangeError;
use crate::core::kernel::rest::create_query_string;
use crate::core::kernel::{SignatureResult, Signer};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_METHOD: &str = "HmacSHA256";
pub const SIGNATURE_VERSION: &str = "2";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Signature version 2 signer
///
/// The payload is `METHOD\nHOST\nPATH\nPARAMS` where `PARAMS` is the
/// percent-encoded parameter list sorted by key. The base64 HMAC-SHA256 of it
/// travels as the `Signature` parameter.
pub struct HuobiSigner {
    access_key: String,
    secret_key: Secret<String>,
    host: String,
}

impl HuobiSigner {
    /// `base_url` may include the scheme; only the host part is signed
    pub fn new(access_key: String, secret_key: String, base_url: &str) -> Self {
        Self {
            access_key,
            secret_key: Secret::new(secret_key),
            host: host_of(base_url),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Sign with an explicit timestamp
    pub fn sign_request_at(
        &self,
        method: &str,
        endpoint: &str,
        params: &[(&str, &str)],
        now: DateTime<Utc>,
    ) -> SignatureResult {
        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();

        let mut signed: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        signed.push(("AccessKeyId".to_string(), self.access_key.clone()));
        signed.push(("SignatureMethod".to_string(), SIGNATURE_METHOD.to_string()));
        signed.push(("SignatureVersion".to_string(), SIGNATURE_VERSION.to_string()));
        signed.push(("Timestamp".to_string(), timestamp));
        signed.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

        let payload = canonical_payload(method, &self.host, endpoint, &signed);
        let signature = sign_payload(self.secret_key.expose_secret(), &payload)?;
        signed.push(("Signature".to_string(), signature));

        Ok(signed)
    }
}

impl std::fmt::Debug for HuobiSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuobiSigner")
            .field("access_key", &self.access_key)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl Signer for HuobiSigner {
    fn sign_request(&self, method: &str, endpoint: &str, params: &[(&str, &str)]) -> SignatureResult {
        self.sign_request_at(method, endpoint, params, Utc::now())
    }
}

/// Strip scheme and trailing slash
fn host_of(base_url: &str) -> String {
    let without_scheme = base_url
        .strip_prefix("https://")
        .or_else(|| base_url.strip_prefix("http://"))
        .unwrap_or(base_url);
    without_scheme.trim_end_matches('/').to_string()
}

/// Build the newline-separated string that gets signed
///
/// `sorted_params` must already be in key order.
pub fn canonical_payload(
    method: &str,
    host: &str,
    path: &str,
    sorted_params: &[(String, String)],
) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        method.to_uppercase(),
        host,
        path,
        create_query_string(sorted_params)
    )
}

pub fn sign_payload(secret_key: &str, payload: &str) -> Result<String, ExchangeError> {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| ExchangeError::AuthError(format!("Failed to create HMAC: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}
