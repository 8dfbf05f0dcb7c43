use crate::core::errors::ExchangeError;

/// Result type for signing operations: the complete, ordered query parameters
pub type SignatureResult = Result<Vec<(String, String)>, ExchangeError>;

/// Signer trait for request authentication
///
/// Implementations receive the caller's parameters and return the full
/// parameter list to send, including whatever authentication fields the
/// exchange requires.
pub trait Signer: Send + Sync {
    /// Sign a request
    ///
    /// # Arguments
    /// * `method` - HTTP method (GET, POST, etc.)
    /// * `endpoint` - API endpoint path
    /// * `params` - Caller-supplied query parameters
    fn sign_request(&self, method: &str, endpoint: &str, params: &[(&str, &str)])
        -> SignatureResult;
}
