//! Inner request.

use crate::engine::headers::Headers;
use crate::engine::stream::RequestStream;
use crate::engine::url::Url;

/// Client certificate owned by the inner pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    pub fn from_der(der: Vec<u8>) -> Self {
        Self { der }
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }
}

/// A request handed to the inner engine.
///
/// Built once per exchange and never modified afterwards; only the body
/// stream is read through.
#[derive(Debug)]
pub struct InnerRequest {
    method: String,
    url: Url,
    body: RequestStream,
    headers: Headers,
    user_host_address: String,
    certificate: Option<Certificate>,
    protocol_version: String,
}

impl InnerRequest {
    pub fn new(
        method: impl Into<String>,
        url: Url,
        body: RequestStream,
        headers: Headers,
        user_host_address: impl Into<String>,
        certificate: Option<Certificate>,
        protocol_version: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            url,
            body,
            headers,
            user_host_address: user_host_address.into(),
            certificate,
            protocol_version: protocol_version.into(),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &RequestStream {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut RequestStream {
        &mut self.body
    }

    /// Remote client address.
    pub fn user_host_address(&self) -> &str {
        &self.user_host_address
    }

    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    /// Protocol label such as `HTTP/1.1`.
    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }
}
