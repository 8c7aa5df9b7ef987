// Object-storage part writer.
//
// Upload targets are pre-signed URLs, so requests here carry no asset-service
// credential. The storage endpoint answers each PUT with an `ETag` header,
// which is the completion tag the asset service wants back at finalize time.

use bytes::Bytes;
use reqwest::header::ETAG;
use tracing::debug;

use crate::error::Error;
use crate::transport::TransportConfig;

#[derive(Clone)]
pub struct StorageClient {
    http: reqwest::Client,
}

impl StorageClient {
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_storage_client()?,
        })
    }

    pub fn from_reqwest(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// PUT one part's bytes and return its completion tag, quotes trimmed.
    pub async fn put_part(
        &self,
        part_number: u32,
        upload_url: &str,
        body: Bytes,
    ) -> Result<String, Error> {
        debug!(part_number, len = body.len(), "PUT part");

        let resp = self.http.put(upload_url).body(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Storage {
                part_number,
                status: status.as_u16(),
                body,
            });
        }

        resp.headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_matches('"').to_owned())
            .filter(|v| !v.is_empty())
            .ok_or(Error::MissingCompletionTag { part_number })
    }
}
