//! Host pipeline model.
//!
//! The host owns the connection: it parses requests, holds connection
//! metadata, and writes responses. The bridge sees it only through
//! [`HostExchange`].

pub mod certificate;
pub mod exchange;
pub mod output;

pub use certificate::{CertificateError, ClientCertificate};
pub use exchange::{ConnectionInfo, ExchangeId, HostExchange, HostRequest, HostResponse};
pub use output::OutputStream;
