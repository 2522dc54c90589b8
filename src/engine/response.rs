//! Inner response and cookies.

use std::fmt;
use std::io::{self, Write};
use std::time::Duration;

/// Deferred body writer, invoked once against the host output stream.
pub type Contents = Box<dyn FnOnce(&mut dyn Write) -> io::Result<()> + Send>;

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        })
    }
}

/// A cookie set by the inner pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub domain: Option<String>,
    pub max_age: Option<Duration>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: "/".to_string(),
            domain: None,
            max_age: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }
}

/// Renders the `Set-Cookie` header value.
impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; path={}", self.name, self.value, self.path)?;
        if let Some(domain) = &self.domain {
            write!(f, "; domain={}", domain)?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; max-age={}", max_age.as_secs())?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if let Some(same_site) = self.same_site {
            write!(f, "; SameSite={}", same_site)?;
        }
        Ok(())
    }
}

/// Response produced by the inner pipeline.
pub struct InnerResponse {
    pub status: u16,
    pub reason_phrase: Option<String>,
    headers: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub cookies: Vec<Cookie>,
    contents: Option<Contents>,
}

impl InnerResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            reason_phrase: None,
            headers: Vec::new(),
            content_type: None,
            cookies: Vec::new(),
            contents: None,
        }
    }

    pub fn with_reason_phrase(mut self, reason: impl Into<String>) -> Self {
        self.reason_phrase = Some(reason.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    pub fn with_contents<F>(mut self, contents: F) -> Self
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()> + Send + 'static,
    {
        self.contents = Some(Box::new(contents));
        self
    }

    pub fn with_body(self, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        self.with_contents(move |out| out.write_all(&body))
    }

    /// Set a header, replacing any value under the same name (case-insensitive).
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn has_contents(&self) -> bool {
        self.contents.is_some()
    }

    /// Take the body writer. An empty body is written if none was set.
    pub fn take_contents(&mut self) -> Contents {
        self.contents
            .take()
            .unwrap_or_else(|| Box::new(|_: &mut dyn Write| Ok(())))
    }
}

impl Default for InnerResponse {
    fn default() -> Self {
        Self::new(200)
    }
}

impl fmt::Debug for InnerResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InnerResponse")
            .field("status", &self.status)
            .field("reason_phrase", &self.reason_phrase)
            .field("headers", &self.headers)
            .field("content_type", &self.content_type)
            .field("cookies", &self.cookies)
            .field("has_contents", &self.contents.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_rendering() {
        assert_eq!(Cookie::new("sid", "abc").to_string(), "sid=abc; path=/");

        let cookie = Cookie {
            domain: Some("example.com".into()),
            max_age: Some(Duration::from_secs(3600)),
            same_site: Some(SameSite::Lax),
            ..Cookie::new("sid", "abc").secure().http_only()
        };
        assert_eq!(
            cookie.to_string(),
            "sid=abc; path=/; domain=example.com; max-age=3600; Secure; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn test_set_header_overwrites_case_insensitively() {
        let response = InnerResponse::new(200)
            .with_header("X-Mode", "a")
            .with_header("x-mode", "b");

        assert_eq!(response.headers().count(), 1);
        assert_eq!(response.header("X-MODE"), Some("b"));
    }

    #[test]
    fn test_contents_written_once() {
        let mut response = InnerResponse::new(200).with_body("payload");
        assert!(response.has_contents());

        let mut out = Vec::new();
        (response.take_contents())(&mut out).unwrap();
        assert_eq!(out, b"payload");

        let mut out = Vec::new();
        (response.take_contents())(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
