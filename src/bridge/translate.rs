//! Host request → inner request translation.
//!
//! # Responsibilities
//! - Copy method, scheme, path base, path and query verbatim
//! - Rebuild the URL from the Host header
//! - Copy every header with all of its values
//! - Wrap the body stream with its expected-length hint
//! - Capture remote address and (optionally) the client certificate
//!
//! # Design Decisions
//! - A missing remote address fails the exchange; nothing downstream
//!   should guess at a client identity
//! - The certificate is copied out so it outlives the connection

use axum::http::HeaderMap;
use futures_util::{stream, StreamExt, TryStreamExt};
use std::io;

use crate::bridge::controller::BridgeOptions;
use crate::bridge::url::{local_host_name, reconstruct};
use crate::bridge::BridgeError;
use crate::engine::{Certificate, Headers, InnerRequest, RequestStream};
use crate::host::HostExchange;

/// Build the inner request for `exchange`, taking its body stream.
pub fn translate(exchange: &mut HostExchange, options: &BridgeOptions) -> Result<InnerRequest, BridgeError> {
    let remote_addr = exchange
        .connection
        .remote_addr
        .ok_or(BridgeError::RemoteAddressUnavailable)?;

    let certificate = if options.enable_client_certificates {
        exchange
            .connection
            .client_certificate
            .as_ref()
            .map(|cert| cert.export().map(Certificate::from_der))
            .transpose()?
    } else {
        None
    };

    let request = &mut exchange.request;

    let host = request
        .host
        .as_deref()
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .unwrap_or_else(local_host_name);
    let url = reconstruct(
        &host,
        &request.scheme,
        &request.path_base,
        request.path(),
        request.query().unwrap_or_default(),
    );

    let headers = translate_headers(&request.headers);
    let source = match request.take_body() {
        Some(body) => body.into_data_stream().map_err(io::Error::other).boxed(),
        None => stream::empty().boxed(),
    };
    let body = RequestStream::new(source, expected_length(&headers), options.switch_policy());

    Ok(InnerRequest::new(
        request.method.as_str(),
        url,
        body,
        headers,
        remote_addr.ip().to_string(),
        certificate,
        format!("{:?}", request.version),
    ))
}

/// Copy host headers, keeping every value of multi-valued headers.
pub fn translate_headers(headers: &HeaderMap) -> Headers {
    let mut translated = Headers::new();
    for name in headers.keys() {
        let values = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect();
        translated.insert(name.as_str(), values);
    }
    translated
}

/// Body length hint from `Content-Length`; zero when absent or unparsable.
pub fn expected_length(headers: &Headers) -> u64 {
    headers
        .first("Content-Length")
        .map(str::trim)
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}
