// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of encoded push bodies.
//!
//! The agent only needs a `post` capability. [`HttpTransport`] provides it
//! over a blocking reqwest client; tests substitute recording mocks.
//! Retries are not attempted at this layer.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::debug;

use crate::errors::Creation;

#[derive(Debug, thiserror::Error)]
pub enum ShippingError {
    #[error("failed to prepare payload: {0}")]
    Payload(String),
    #[error("failed to deliver payload ({0:?}): {1}")]
    Destination(Option<StatusCode>, String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Protobuf,
}

impl ContentType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Protobuf => "application/x-protobuf",
        }
    }
}

pub trait Transport: Send + Sync {
    /// Sends `body` to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ShippingError::Destination`] on network failure or a non-2xx response.
    fn post(
        &self,
        url: &str,
        body: Vec<u8>,
        content_type: ContentType,
    ) -> Result<(), ShippingError>;
}

/// Blocking HTTP transport. The client is created once and released when
/// the transport is dropped.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    headers: HeaderMap,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns [`Creation::HttpClient`] if the client cannot be built or the
    /// tenant id is not a valid header value.
    pub fn new(timeout: Duration, tenant_id: Option<&str>) -> Result<Self, Creation> {
        let mut headers = HeaderMap::new();
        if let Some(tenant_id) = tenant_id {
            let value = HeaderValue::from_str(tenant_id)
                .map_err(|e| Creation::HttpClient(format!("invalid tenant id: {e}")))?;
            headers.insert("X-Scope-OrgID", value);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Creation::HttpClient(e.to_string()))?;
        Ok(HttpTransport { client, headers })
    }
}

impl Transport for HttpTransport {
    fn post(
        &self,
        url: &str,
        body: Vec<u8>,
        content_type: ContentType,
    ) -> Result<(), ShippingError> {
        let resp = self
            .client
            .post(url)
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, content_type.as_str())
            .body(body)
            .send()
            .map_err(|e| ShippingError::Destination(e.status(), e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        Err(ShippingError::Destination(
            Some(status),
            resp.text().unwrap_or_default(),
        ))
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        debug!("LOKI | Releasing HTTP transport");
    }
}
