//! Bridge error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::engine::EngineError;
use crate::host::CertificateError;

/// Failures of a bridged exchange, or of bridge startup.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The host did not supply the client's address.
    #[error("remote address unavailable; serve with connect info enabled")]
    RemoteAddressUnavailable,

    /// The client certificate could not be exported.
    #[error("client certificate unusable: {0}")]
    Certificate(#[from] CertificateError),

    /// The inner engine failed; passed through unchanged.
    #[error(transparent)]
    Engine(EngineError),

    /// The bootstrapper could not initialise the inner engine.
    #[error("inner engine initialisation failed: {0}")]
    Bootstrap(#[source] EngineError),

    /// The inner response carries a status the host cannot send.
    #[error("inner response status {0} is not a valid HTTP status")]
    InvalidStatus(u16),

    /// An inner response header cannot be represented on the host.
    #[error("inner response header {name:?} cannot be represented on the host response")]
    InvalidHeader { name: String },
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Bridged exchange failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}
