//! The host exchange: one request/response cycle owned by the host pipeline.
//!
//! # Responsibilities
//! - Capture an axum request together with its connection metadata
//! - Carry the host response under construction
//! - Expose the host item bag (the request extensions)
//! - Convert back into an axum request (pass-through) or response (applied)

use axum::{
    body::Body,
    extract::{ConnectInfo, OriginalUri},
    http::{header, Extensions, HeaderMap, Method, Request, Response, StatusCode, Uri, Version},
};
use std::fmt;
use std::net::SocketAddr;
use uuid::Uuid;

use crate::host::certificate::ClientCertificate;
use crate::host::output::{output_channel, OutputStream};
use crate::lifecycle::AbortSignal;
use crate::principal::Principal;

/// Unique identifier for a host exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeId(Uuid);

impl ExchangeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExchangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exch-{}", self.0)
    }
}

/// Request half of the exchange.
#[derive(Debug)]
pub struct HostRequest {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub scheme: String,
    /// Host header value (or URI authority), if the client sent one.
    pub host: Option<String>,
    /// Prefix stripped by the host router before this stage.
    pub path_base: String,
    pub headers: HeaderMap,
    body: Option<Body>,
}

impl HostRequest {
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Take the raw body stream. Subsequent calls return `None`.
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }
}

/// Response half of the exchange.
#[derive(Debug)]
pub struct HostResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    body: Body,
}

impl HostResponse {
    /// Replace the response body with a stream fed by the returned writer.
    pub fn open_output(&mut self) -> OutputStream {
        let (output, body) = output_channel();
        self.body = body;
        output
    }
}

impl Default for HostResponse {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }
}

/// Transport-level facts about the connection carrying the exchange.
#[derive(Debug, Clone, Default)]
pub struct ConnectionInfo {
    pub remote_addr: Option<SocketAddr>,
    pub client_certificate: Option<ClientCertificate>,
}

/// One request/response cycle as seen by the host pipeline.
#[derive(Debug)]
pub struct HostExchange {
    id: ExchangeId,
    pub request: HostRequest,
    pub response: HostResponse,
    pub connection: ConnectionInfo,
    pub user: Option<Principal>,
    items: Extensions,
    aborted: AbortSignal,
}

impl HostExchange {
    /// Capture an axum request.
    ///
    /// `default_scheme` applies when the request URI is in origin form.
    pub fn from_request(request: Request<Body>, default_scheme: &str, aborted: AbortSignal) -> Self {
        let (parts, body) = request.into_parts();

        let scheme = parts
            .uri
            .scheme_str()
            .unwrap_or(default_scheme)
            .to_string();
        let host = parts
            .headers
            .get(header::HOST)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .or_else(|| parts.uri.authority().map(|a| a.to_string()));
        let path_base = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| path_base(original.path(), parts.uri.path()))
            .unwrap_or_default();

        let connection = ConnectionInfo {
            remote_addr: parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0),
            client_certificate: parts.extensions.get::<ClientCertificate>().cloned(),
        };
        let user = parts.extensions.get::<Principal>().cloned();

        Self {
            id: ExchangeId::new(),
            request: HostRequest {
                method: parts.method,
                uri: parts.uri,
                version: parts.version,
                scheme,
                host,
                path_base,
                headers: parts.headers,
                body: Some(body),
            },
            response: HostResponse::default(),
            connection,
            user,
            items: parts.extensions,
            aborted,
        }
    }

    pub fn id(&self) -> ExchangeId {
        self.id
    }

    /// The host item bag.
    pub fn items(&self) -> &Extensions {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut Extensions {
        &mut self.items
    }

    /// Signal raised when the host abandons this exchange.
    pub fn aborted(&self) -> &AbortSignal {
        &self.aborted
    }

    /// Rebuild an axum request for the next host stage.
    ///
    /// The body is whatever was not consumed by earlier stages.
    pub fn into_request(self) -> Request<Body> {
        let HostRequest {
            method,
            uri,
            version,
            headers,
            body,
            ..
        } = self.request;

        let mut request = Request::new(body.unwrap_or_else(Body::empty));
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.version_mut() = version;
        *request.headers_mut() = headers;
        *request.extensions_mut() = self.items;
        request
    }

    /// Produce the host response.
    pub fn into_response(self) -> Response<Body> {
        let HostResponse {
            status,
            headers,
            body,
        } = self.response;

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

/// Portion of the original path that precedes the path this stage sees.
fn path_base(original: &str, current: &str) -> String {
    if current == "/" {
        return original.trim_end_matches('/').to_string();
    }
    original
        .strip_suffix(current)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> axum::http::request::Builder {
        Request::builder().uri(uri)
    }

    #[test]
    fn test_captures_request_fields() {
        let addr: SocketAddr = "10.0.0.7:51000".parse().unwrap();
        let req = request("/users?id=3")
            .method(Method::POST)
            .header("Host", "example.com:8080")
            .header("X-Trace", "a")
            .extension(ConnectInfo(addr))
            .extension(Principal::new("alice"))
            .body(Body::from("payload"))
            .unwrap();

        let exchange = HostExchange::from_request(req, "http", AbortSignal::never());

        assert_eq!(exchange.request.method, Method::POST);
        assert_eq!(exchange.request.scheme, "http");
        assert_eq!(exchange.request.host.as_deref(), Some("example.com:8080"));
        assert_eq!(exchange.request.path(), "/users");
        assert_eq!(exchange.request.query(), Some("id=3"));
        assert_eq!(exchange.connection.remote_addr, Some(addr));
        assert_eq!(exchange.user.as_ref().map(Principal::name), Some("alice"));
        assert!(exchange.items().get::<ConnectInfo<SocketAddr>>().is_some());
    }

    #[test]
    fn test_absolute_uri_supplies_scheme_and_authority() {
        let req = request("https://example.org/a").body(Body::empty()).unwrap();
        let exchange = HostExchange::from_request(req, "http", AbortSignal::never());

        assert_eq!(exchange.request.scheme, "https");
        assert_eq!(exchange.request.host.as_deref(), Some("example.org"));
    }

    #[test]
    fn test_path_base_from_original_uri() {
        assert_eq!(path_base("/api/users", "/users"), "/api");
        assert_eq!(path_base("/api", "/"), "/api");
        assert_eq!(path_base("/api/", "/"), "/api");
        assert_eq!(path_base("/users", "/users"), "");
        assert_eq!(path_base("/other", "/users"), "");
    }

    #[test]
    fn test_into_request_preserves_items() {
        #[derive(Clone, Debug, PartialEq)]
        struct Marker(u8);

        let req = request("/x").header("X-A", "1").body(Body::empty()).unwrap();
        let mut exchange = HostExchange::from_request(req, "http", AbortSignal::never());
        exchange.items_mut().insert(Marker(7));

        let rebuilt = exchange.into_request();
        assert_eq!(rebuilt.uri().path(), "/x");
        assert_eq!(rebuilt.headers()["x-a"], "1");
        assert_eq!(rebuilt.extensions().get::<Marker>(), Some(&Marker(7)));
    }

    #[test]
    fn test_into_response_defaults() {
        let req = request("/").body(Body::empty()).unwrap();
        let exchange = HostExchange::from_request(req, "http", AbortSignal::never());
        let response = exchange.into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().is_empty());
    }
}
