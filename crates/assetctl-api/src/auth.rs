use reqwest::RequestBuilder;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Attaches credentials to an outgoing asset-service request.
///
/// The client treats signing as opaque: it hands every request builder to
/// the signer right before sending. How the credential was obtained is the
/// caller's business.
pub trait RequestSigner: Send + Sync {
    fn sign(&self, request: RequestBuilder) -> RequestBuilder;
}

/// Identity-token signer.
///
/// The asset service expects the raw token in `Authorization`, without a
/// `Bearer` scheme prefix.
#[derive(Debug)]
pub struct IdToken {
    header: HeaderValue,
}

impl IdToken {
    pub fn new(token: &SecretString) -> Result<Self, Error> {
        let mut header =
            HeaderValue::from_str(token.expose_secret()).map_err(|e| Error::InvalidToken {
                message: format!("invalid token header value: {e}"),
            })?;
        header.set_sensitive(true);
        Ok(Self { header })
    }
}

impl RequestSigner for IdToken {
    fn sign(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(AUTHORIZATION, self.header.clone())
    }
}

/// Sends requests as-is. Used against unauthenticated test servers.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unsigned;

impl RequestSigner for Unsigned {
    fn sign(&self, request: RequestBuilder) -> RequestBuilder {
        request
    }
}
