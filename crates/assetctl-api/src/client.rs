// Async HTTP client for the asset service.
//
// Endpoints live under `{base}/assets/v1/{kind}`; callers pass the path
// relative to the base URL. Every request goes through the configured
// `RequestSigner` right before it is sent.

use std::sync::Arc;

use reqwest::RequestBuilder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::RequestSigner;
use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{AssetRecord, CompleteUploadRequest, Registration};

/// Async client for the asset service's JSON endpoints.
pub struct AssetClient {
    http: reqwest::Client,
    base_url: Url,
    signer: Arc<dyn RequestSigner>,
}

impl AssetClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client with its own `reqwest::Client` from transport config.
    pub fn new(
        base_url: &str,
        signer: Arc<dyn RequestSigner>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(base_url, http, signer)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        signer: Arc<dyn RequestSigner>,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            signer,
        })
    }

    /// Force a trailing slash so relative joins append instead of replace.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, Error> {
        Ok(self.signer.sign(request).send().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.send(self.http.get(url)).await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.send(self.http.post(url).json(body)).await?;
        self.handle_response(resp).await
    }

    async fn post_no_response<B: Serialize + Sync>(
        &self,
        path: &str,
        params: &[(&str, String)],
        body: &B,
    ) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("POST {url} params={params:?}");

        let resp = self
            .send(self.http.post(url).query(params).json(body))
            .await?;
        self.handle_empty(resp).await
    }

    async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PATCH {url}");

        let resp = self.send(self.http.patch(url).json(body)).await?;
        self.handle_response(resp).await
    }

    async fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.send(self.http.delete(url)).await?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    /// The asset service's error bodies are not structured; keep them verbatim.
    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let body = resp.text().await.unwrap_or_default();
        Error::Api {
            status: status.as_u16(),
            body,
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Register a new asset and open its transfer session.
    ///
    /// `collection` is the kind's collection path (`assets/v1/document`).
    pub async fn register<B: Serialize + Sync>(
        &self,
        collection: &str,
        body: &B,
    ) -> Result<Registration, Error> {
        self.post(collection, body).await
    }

    /// Submit the ordered completion tags for a transfer session.
    pub async fn complete_upload(
        &self,
        path: &str,
        params: &[(&str, String)],
        body: &CompleteUploadRequest,
    ) -> Result<(), Error> {
        self.post_no_response(path, params, body).await
    }

    pub async fn get_record(&self, path: &str) -> Result<AssetRecord, Error> {
        self.get(path).await
    }

    /// Send a partial update. The body must carry the version stamp.
    pub async fn patch_record<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<AssetRecord, Error> {
        self.patch(path, body).await
    }

    pub async fn delete_record(&self, path: &str) -> Result<(), Error> {
        self.delete(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Unsigned;

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = AssetClient::from_reqwest(
            "https://sda.example.com/api",
            reqwest::Client::new(),
            Arc::new(Unsigned),
        )
        .unwrap();

        assert_eq!(client.base_url().as_str(), "https://sda.example.com/api/");
        assert_eq!(
            client.url("/assets/v1/document/d-1").unwrap().as_str(),
            "https://sda.example.com/api/assets/v1/document/d-1"
        );
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let result =
            AssetClient::from_reqwest("not a url", reqwest::Client::new(), Arc::new(Unsigned));
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
