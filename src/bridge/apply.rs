//! Inner response → host response application.
//!
//! # Responsibilities
//! - Decide between applying the inner response and passing through
//! - Map status, reason phrase, headers, content type and cookies
//! - Stream the inner body writer into the host response body
//! - Dispose the inner context once its body is written
//!
//! # Design Decisions
//! - Inner headers overwrite same-named host headers
//! - Cookies are appended; host-set cookies are never replaced
//! - Header conversion completes before the host response is touched
//! - Pass-through hands the undisposed context to the next host stage
//! - A failing or panicking body writer aborts the host body stream

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Response, StatusCode},
};
use std::future::Future;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use crate::bridge::BridgeError;
use crate::engine::InnerContext;
use crate::host::HostExchange;

/// Name of the synthetic header carrying the inner reason phrase.
pub const REASON_PHRASE_HEADER: &str = "ReasonPhrase";

/// Predicate choosing pass-through over applying the inner response.
pub type PassThrough = Arc<dyn Fn(&InnerContext) -> bool + Send + Sync>;

/// Inner context handed over to the next host stage.
///
/// Found in the host item bag after a pass-through; whoever takes it owns
/// its disposal.
#[derive(Clone)]
pub struct PassedThroughContext(Arc<Mutex<Option<InnerContext>>>);

impl PassedThroughContext {
    fn new(context: InnerContext) -> Self {
        Self(Arc::new(Mutex::new(Some(context))))
    }

    /// Claim the context. Later calls return `None`.
    pub fn take(&self) -> Option<InnerContext> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

/// How a bridged exchange finished.
#[derive(Debug)]
pub enum Completion {
    /// The inner response was written onto the host response.
    Applied(Response<Body>),
    /// The next host stage produced the response.
    PassedThrough(Response<Body>),
}

impl Completion {
    pub fn outcome(&self) -> &'static str {
        match self {
            Completion::Applied(_) => "applied",
            Completion::PassedThrough(_) => "pass_through",
        }
    }

    pub fn into_response(self) -> Response<Body> {
        match self {
            Completion::Applied(response) | Completion::PassedThrough(response) => response,
        }
    }
}

/// Finish an exchange from its completed inner context.
pub async fn complete<N, Fut>(
    context: InnerContext,
    mut exchange: HostExchange,
    perform_pass_through: &(dyn Fn(&InnerContext) -> bool + Send + Sync),
    next: N,
) -> Result<Completion, BridgeError>
where
    N: FnOnce(HostExchange) -> Fut,
    Fut: Future<Output = Response<Body>>,
{
    if perform_pass_through(&context) {
        tracing::debug!(
            exchange_id = %exchange.id(),
            context_id = %context.id(),
            "Passing exchange to next host stage"
        );
        exchange.items_mut().insert(PassedThroughContext::new(context));
        return Ok(Completion::PassedThrough(next(exchange).await));
    }

    apply(context, &mut exchange)?;
    Ok(Completion::Applied(exchange.into_response()))
}

/// Write the inner response onto the host response.
///
/// The body writer runs on a blocking thread and streams into the host
/// body; the context is disposed when it returns.
pub fn apply(mut context: InnerContext, exchange: &mut HostExchange) -> Result<(), BridgeError> {
    let inner = &context.response;
    let status = StatusCode::from_u16(inner.status).map_err(|_| BridgeError::InvalidStatus(inner.status))?;

    let mut headers = exchange.response.headers.clone();
    if let Some(reason) = &inner.reason_phrase {
        headers.append(
            header_name(REASON_PHRASE_HEADER)?,
            header_value(REASON_PHRASE_HEADER, reason)?,
        );
    }
    for (name, value) in inner.headers() {
        headers.insert(header_name(name)?, header_value(name, value)?);
    }
    if let Some(content_type) = inner
        .content_type
        .as_deref()
        .filter(|content_type| !content_type.trim().is_empty())
    {
        headers.insert(header::CONTENT_TYPE, header_value("Content-Type", content_type)?);
    }
    append_cookies(&mut headers, &context)?;

    exchange.response.status = status;
    exchange.response.headers = headers;

    let contents = context.response.take_contents();
    let mut output = exchange.response.open_output();
    let context_id = context.id();
    tokio::task::spawn_blocking(move || {
        let written = panic::catch_unwind(AssertUnwindSafe(|| contents(&mut output)))
            .unwrap_or_else(|_| Err(io::Error::other("response body writer panicked")));
        match written.and_then(|()| output.flush()) {
            Ok(()) => drop(output),
            Err(e) => {
                tracing::warn!(context_id = %context_id, error = %e, "Response body writer failed");
                output.abort(e);
            }
        }
        context.dispose();
    });

    Ok(())
}

fn append_cookies(headers: &mut HeaderMap, context: &InnerContext) -> Result<(), BridgeError> {
    for cookie in &context.response.cookies {
        headers.append(header::SET_COOKIE, header_value("Set-Cookie", &cookie.to_string())?);
    }
    Ok(())
}

fn header_name(name: &str) -> Result<HeaderName, BridgeError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| BridgeError::InvalidHeader {
        name: name.to_string(),
    })
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, BridgeError> {
    HeaderValue::from_str(value).map_err(|_| BridgeError::InvalidHeader {
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::association::ContextLink;
    use crate::bridge::translate::translate_headers;
    use crate::engine::{Cookie, Dispatch, Headers, InnerRequest, InnerResponse, RequestStream, Url};
    use crate::lifecycle::AbortSignal;
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn exchange() -> HostExchange {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        HostExchange::from_request(req, "http", AbortSignal::never())
    }

    fn context_for(exchange: &HostExchange, response: InnerResponse) -> InnerContext {
        let request = InnerRequest::new(
            "GET",
            Url::default(),
            RequestStream::empty(),
            Headers::new(),
            "127.0.0.1",
            None,
            "HTTP/1.1",
        );
        let mut context = Dispatch::new(request, ContextLink::new(exchange.id(), None)).into_context();
        context.response = response;
        context
    }

    /// Item that reports when the context holding it is dropped.
    struct DisposeProbe(Option<oneshot::Sender<()>>);

    impl Drop for DisposeProbe {
        fn drop(&mut self) {
            if let Some(tx) = self.0.take() {
                let _ = tx.send(());
            }
        }
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_apply_maps_response() {
        let mut exchange = exchange();
        exchange
            .response
            .headers
            .append(header::SET_COOKIE, "host=1; path=/".parse().unwrap());
        exchange
            .response
            .headers
            .insert("x-mode", "host".parse().unwrap());

        let inner = InnerResponse::new(201)
            .with_reason_phrase("Created")
            .with_header("X-Mode", "inner")
            .with_header("X-Extra", "yes")
            .with_content_type("text/plain")
            .with_cookie(Cookie::new("a", "1"))
            .with_cookie(Cookie::new("b", "2").http_only())
            .with_body("created!");
        let context = context_for(&exchange, inner);

        let completion = complete(context, exchange, &|_| false, |_: HostExchange| async {
            Response::new(Body::from("from next"))
        })
        .await
        .unwrap();
        assert_eq!(completion.outcome(), "applied");

        let response = completion.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let headers = response.headers();
        assert_eq!(headers["reasonphrase"], "Created");
        assert_eq!(headers.get_all("x-mode").iter().count(), 1);
        assert_eq!(headers["x-mode"], "inner");
        assert_eq!(headers["x-extra"], "yes");
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain");

        let cookies: Vec<_> = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies, vec!["host=1; path=/", "a=1; path=/", "b=2; path=/; HttpOnly"]);

        assert_eq!(body_text(response).await, "created!");
    }

    #[tokio::test]
    async fn test_blank_content_type_ignored() {
        let mut exchange = exchange();
        exchange
            .response
            .headers
            .insert(header::CONTENT_TYPE, "text/html".parse().unwrap());
        let context = context_for(&exchange, InnerResponse::new(200).with_content_type("  "));

        apply(context, &mut exchange).unwrap();
        assert_eq!(exchange.response.headers[header::CONTENT_TYPE], "text/html");
    }

    #[tokio::test]
    async fn test_context_disposed_after_body_written() {
        let mut exchange = exchange();
        let (tx, rx) = oneshot::channel();
        let mut context = context_for(&exchange, InnerResponse::new(200).with_body("done"));
        context.items_mut().insert("probe", DisposeProbe(Some(tx)));

        apply(context, &mut exchange).unwrap();
        assert_eq!(body_text(exchange.into_response()).await, "done");
        rx.await.expect("context was not disposed");
    }

    #[tokio::test]
    async fn test_pass_through_leaves_host_response_untouched() {
        let mut exchange = exchange();
        exchange
            .response
            .headers
            .insert("x-host", "kept".parse().unwrap());
        let context = context_for(
            &exchange,
            InnerResponse::new(500).with_header("X-Inner", "no").with_body("ignored"),
        );
        let context_id = context.id();
        let calls = Arc::new(AtomicUsize::new(0));

        let seen = calls.clone();
        let completion = complete(context, exchange, &|_| true, move |exchange: HostExchange| {
            seen.fetch_add(1, Ordering::SeqCst);
            async move {
                assert_eq!(exchange.response.status, StatusCode::OK);
                assert_eq!(exchange.response.headers.len(), 1);
                assert_eq!(exchange.response.headers["x-host"], "kept");

                let handed_over = exchange
                    .items()
                    .get::<PassedThroughContext>()
                    .and_then(PassedThroughContext::take)
                    .expect("context handed to next stage");
                assert_eq!(handed_over.id(), context_id);
                Response::new(Body::from("from next"))
            }
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(completion.outcome(), "pass_through");
        assert_eq!(body_text(completion.into_response()).await, "from next");
    }

    #[tokio::test]
    async fn test_panicking_writer_aborts_body() {
        let mut exchange = exchange();
        let (tx, rx) = oneshot::channel();
        let mut context = context_for(
            &exchange,
            InnerResponse::new(200).with_contents(|out: &mut dyn Write| {
                out.write_all(b"partial")?;
                panic!("template rendering failed");
            }),
        );
        context.items_mut().insert("probe", DisposeProbe(Some(tx)));

        apply(context, &mut exchange).unwrap();
        let body = axum::body::to_bytes(exchange.into_response().into_body(), usize::MAX).await;
        assert!(body.is_err());
        rx.await.expect("context was not disposed");
    }

    #[tokio::test]
    async fn test_translated_headers_round_trip_through_apply() {
        let mut host_headers = HeaderMap::new();
        host_headers.insert("x-request-id", "r-1".parse().unwrap());
        host_headers.insert("cache-control", "no-store".parse().unwrap());
        host_headers.append("x-multi", "first".parse().unwrap());
        host_headers.append("x-multi", "second".parse().unwrap());
        host_headers.insert(header::CONTENT_TYPE, "text/html".parse().unwrap());

        let mut inner = InnerResponse::new(200)
            .with_reason_phrase("OK")
            .with_content_type("application/json")
            .with_cookie(Cookie::new("sid", "9"));
        for (name, values) in translate_headers(&host_headers).iter() {
            for value in values {
                inner.set_header(name, value.as_str());
            }
        }

        let mut exchange = exchange();
        let context = context_for(&exchange, inner);
        apply(context, &mut exchange).unwrap();
        let applied = &exchange.response.headers;

        // Single-valued headers come back unchanged.
        assert_eq!(applied["x-request-id"], "r-1");
        assert_eq!(applied["cache-control"], "no-store");
        // Inner headers are single-valued: the last value wins.
        let multi: Vec<_> = applied
            .get_all("x-multi")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(multi, vec!["second"]);
        // Content type, reason phrase and cookies follow their own rules.
        assert_eq!(applied[header::CONTENT_TYPE], "application/json");
        assert_eq!(applied["reasonphrase"], "OK");
        assert_eq!(applied[header::SET_COOKIE], "sid=9; path=/");
        assert_eq!(applied.len(), 6);
    }

    #[tokio::test]
    async fn test_invalid_status_rejected() {
        let mut exchange = exchange();
        let context = context_for(&exchange, InnerResponse::new(42));

        let err = apply(context, &mut exchange).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidStatus(42)));
    }

    #[tokio::test]
    async fn test_invalid_header_leaves_host_response_untouched() {
        let mut exchange = exchange();
        let context = context_for(
            &exchange,
            InnerResponse::new(404)
                .with_header("X-Good", "1")
                .with_header("Bad Name", "x"),
        );

        let err = apply(context, &mut exchange).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidHeader { .. }));
        assert_eq!(exchange.response.status, StatusCode::OK);
        assert!(exchange.response.headers.is_empty());
    }
}
