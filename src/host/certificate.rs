//! Client certificates presented on the host connection.

use bytes::Bytes;
use thiserror::Error;

/// Errors reading or exporting a client certificate.
#[derive(Debug, Error)]
pub enum CertificateError {
    /// No certificate block was found in the PEM input.
    #[error("no certificate found in PEM input")]
    Missing,

    /// The connection holds a certificate with no encoded content.
    #[error("client certificate export produced no data")]
    Empty,

    /// The PEM input could not be read.
    #[error("failed to read PEM certificate: {0}")]
    Io(#[from] std::io::Error),
}

/// DER-encoded certificate the client presented during the TLS handshake.
///
/// The TLS-terminating layer inserts this into the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCertificate {
    der: Bytes,
}

impl ClientCertificate {
    pub fn from_der(der: impl Into<Bytes>) -> Self {
        Self { der: der.into() }
    }

    /// Read the first certificate of a PEM bundle.
    pub fn from_pem(pem: &[u8]) -> Result<Self, CertificateError> {
        let mut reader = pem;
        let cert = rustls_pemfile::certs(&mut reader)
            .next()
            .ok_or(CertificateError::Missing)??;
        Ok(Self::from_der(cert.to_vec()))
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Export the encoded certificate into a freshly allocated buffer.
    ///
    /// The result shares nothing with the connection's copy.
    pub fn export(&self) -> Result<Vec<u8>, CertificateError> {
        if self.der.is_empty() {
            return Err(CertificateError::Empty);
        }
        Ok(self.der.to_vec())
    }
}
