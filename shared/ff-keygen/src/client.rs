//! Keygen HTTP Client

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

use crate::error::{KeygenError, Result};
use crate::types::{
    Document, ErrorDocument, License, LicenseResource, NewLicense, Validation,
    ValidationDocument,
};

/// JSON:API media type required by Keygen.
const JSON_API: &str = "application/vnd.api+json";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client bound to one Keygen account.
///
/// Administrative calls (create, lookup, suspend) need a token; key
/// validation is public and works without one.
#[derive(Debug, Clone)]
pub struct KeygenClient {
    http: reqwest::Client,
    base_url: String,
    account_id: String,
    token: Option<String>,
}

impl KeygenClient {
    pub fn new(base_url: impl Into<String>, account_id: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("fileflow-licensing/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(KeygenError::Transport)?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            account_id: account_id.into(),
            token: None,
        })
    }

    /// Attach a product or admin token for administrative calls.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/accounts/{}{path}", self.base_url, self.account_id)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.token.as_deref().ok_or(KeygenError::MissingToken)?;
        Ok(request.header(AUTHORIZATION, format!("Bearer {token}")))
    }

    /// Issue a new license for a purchase.
    #[instrument(skip(self, new), fields(order_id = %new.order_id, tier = %new.tier))]
    pub async fn create_license(&self, new: &NewLicense) -> Result<License> {
        let request = self
            .http
            .post(self.url("/licenses"))
            .header(CONTENT_TYPE, JSON_API)
            .body(new.to_document().to_string());

        let doc: Document<LicenseResource> =
            decode(send(self.authorized(request)?).await?).await?;
        debug!(license_id = %doc.data.id, "License created");
        Ok(doc.data.into())
    }

    /// Find the license issued for a storefront order, if any.
    #[instrument(skip(self))]
    pub async fn find_license_by_order(&self, order_id: &str) -> Result<Option<License>> {
        let request = self
            .http
            .get(self.url("/licenses"))
            .query(&[("metadata[orderId]", order_id), ("limit", "1")]);

        let doc: Document<Vec<LicenseResource>> =
            decode(send(self.authorized(request)?).await?).await?;
        Ok(doc.data.into_iter().next().map(License::from))
    }

    /// Suspend a license so it no longer validates.
    #[instrument(skip(self))]
    pub async fn suspend_license(&self, license_id: &str) -> Result<License> {
        let request = self
            .http
            .post(self.url(&format!("/licenses/{license_id}/actions/suspend")));

        let doc: Document<LicenseResource> =
            decode(send(self.authorized(request)?).await?).await?;
        Ok(doc.data.into())
    }

    /// Validate a key scoped to a product. Does not require a token.
    #[instrument(skip(self, key))]
    pub async fn validate_key(&self, key: &str, product_id: &str) -> Result<Validation> {
        let body = json!({
            "meta": {
                "key": key,
                "scope": { "product": product_id }
            }
        });
        let request = self
            .http
            .post(self.url("/licenses/actions/validate-key"))
            .header(CONTENT_TYPE, JSON_API)
            .body(body.to_string());

        let doc: ValidationDocument = decode(send(request).await?).await?;
        Ok(doc.into())
    }
}

async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request
        .header(ACCEPT, JSON_API)
        .send()
        .await
        .map_err(KeygenError::Transport)?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    let detail = serde_json::from_slice::<ErrorDocument>(&body)
        .ok()
        .and_then(|doc| doc.message())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });

    Err(KeygenError::Api {
        status: status.as_u16(),
        detail,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.bytes().await.map_err(KeygenError::Transport)?;
    serde_json::from_slice(&body).map_err(|e| KeygenError::Decode(e.to_string()))
}
